// intcode: integer-program virtual machine with a time-travel debugger

use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intcode::interpreter::constants::{AMPLIFIER_COUNT, DEFAULT_SNAPSHOT_LIMIT, NETWORK_SIZE};
use intcode::interpreter::engine::Machine;
use intcode::interpreter::io::{Channel, ScriptInput};
use intcode::interpreter::tracer::Tracer;
use intcode::orchestrator::{
    phase_permutations, run_feedback_loop, run_feedback_loop_threaded, run_pipeline, FeedbackConfig,
    Network, NetworkConfig, OrchestratorError,
};
use intcode::parser::parse_program;
use intcode::snapshot::render_output;
use intcode::ui::App;

#[derive(Parser, Debug)]
#[command(name = "intcode")]
#[command(about = "Run, trace and orchestrate integer-machine programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program to completion and print its output
    Run {
        #[command(flatten)]
        source: ProgramArgs,

        /// Treat output below 256 as text
        #[arg(long)]
        ascii: bool,

        /// Abort after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,
    },

    /// Record a run and browse it in the time-travel debugger
    Trace {
        #[command(flatten)]
        source: ProgramArgs,

        /// Snapshot history limit in megabytes
        #[arg(long)]
        snapshot_limit_mb: Option<usize>,
    },

    /// Chain amplifiers, optionally in a feedback loop
    Amplify {
        /// Path to the program
        file: PathBuf,

        /// Phase settings; every ordering is tried when omitted
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        phases: Vec<i64>,

        /// Connect the last amplifier back to the first
        #[arg(long)]
        feedback: bool,

        /// Run feedback amplifiers on threads instead of async tasks
        #[arg(long, requires = "feedback", conflicts_with = "timeout_secs")]
        threaded: bool,

        /// Give up on a feedback loop after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Abort a feedback amplifier after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,
    },

    /// Simulate a packet network until the monitor sees a repeat
    Network {
        /// Path to the program
        file: PathBuf,

        /// Number of nodes
        #[arg(long, default_value_t = NETWORK_SIZE)]
        nodes: usize,

        /// Stop after this many scheduling rounds
        #[arg(long)]
        max_rounds: Option<usize>,

        /// Keep going when a node faults
        #[arg(long)]
        isolate_failures: bool,
    },
}

#[derive(Args, Debug)]
struct ProgramArgs {
    /// Path to the program
    file: PathBuf,

    /// Input values, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    input: Vec<i64>,

    /// Text file fed as character codes once the input values run out
    #[arg(long)]
    script: Option<PathBuf>,
}

impl ProgramArgs {
    fn machine(&self) -> Result<Machine, Box<dyn Error>> {
        Ok(Machine::new(load_program(&self.file)?).with_input(self.input.iter().copied()))
    }

    fn script(&self) -> Result<Option<ScriptInput>, Box<dyn Error>> {
        Ok(match &self.script {
            Some(path) => Some(ScriptInput::new(&fs::read_to_string(path)?)),
            None => None,
        })
    }
}

fn load_program(path: &Path) -> Result<Vec<i64>, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    let program = parse_program(&text)?;
    info!(path = %path.display(), words = program.len(), "program loaded");
    Ok(program)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intcode=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match Cli::parse().command {
        Command::Run {
            source,
            ascii,
            max_steps,
        } => run(&source, ascii, max_steps),
        Command::Trace {
            source,
            snapshot_limit_mb,
        } => trace(&source, snapshot_limit_mb),
        Command::Amplify {
            file,
            phases,
            feedback,
            threaded,
            timeout_secs,
            max_steps,
        } => {
            let program = load_program(&file)?;
            let config = FeedbackConfig {
                timeout: timeout_secs.map(Duration::from_secs),
                step_limit: max_steps,
            };
            amplify(program, phases, feedback, threaded, &config).await
        }
        Command::Network {
            file,
            nodes,
            max_rounds,
            isolate_failures,
        } => {
            let program = load_program(&file)?;
            let config = NetworkConfig {
                nodes,
                max_rounds,
                isolate_failures,
                ..NetworkConfig::default()
            };
            let report = Network::new(&program, config).run()?;
            if let Some(first) = report.first_monitor_packet {
                println!("first monitor packet: x={} y={}", first.x, first.y);
            }
            println!("repeated monitor y: {}", report.converged_y);
            info!(
                rounds = report.rounds,
                deliveries = report.deliveries,
                dropped = report.dropped,
                "network finished"
            );
            Ok(())
        }
    }
}

fn run(source: &ProgramArgs, ascii: bool, max_steps: Option<u64>) -> Result<(), Box<dyn Error>> {
    let mut machine = source.machine()?;
    if let Some(limit) = max_steps {
        machine = machine.with_step_limit(limit);
    }

    let mut channel = match source.script()? {
        Some(script) => Channel::buffered().with_provider(script),
        None => Channel::buffered(),
    };
    machine.run(&mut channel)?;

    if ascii {
        for line in render_output(machine.output()) {
            println!("{}", line);
        }
    } else {
        for value in machine.output() {
            println!("{}", value);
        }
    }
    Ok(())
}

fn trace(source: &ProgramArgs, snapshot_limit_mb: Option<usize>) -> Result<(), Box<dyn Error>> {
    let limit = snapshot_limit_mb
        .map(|mb| mb * 1024 * 1024)
        .unwrap_or(DEFAULT_SNAPSHOT_LIMIT);
    let mut tracer = Tracer::new(source.machine()?, limit);

    let mut channel = match source.script()? {
        Some(script) => Channel::buffered().with_provider(script),
        None => Channel::buffered(),
    };

    eprintln!("Executing program...");
    match tracer.run(&mut channel) {
        Ok(()) => eprintln!("Recorded {} snapshots.", tracer.total_snapshots()),
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            eprintln!("Entering TUI with partial execution history...");
        }
    }
    tracer.rewind_to_start();

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(tracer);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_amplifiers(
    program: &[i64],
    phases: &[i64],
    feedback: bool,
    threaded: bool,
    config: &FeedbackConfig,
) -> Result<i64, OrchestratorError> {
    if !feedback {
        return run_pipeline(program, phases);
    }
    if !threaded {
        return run_feedback_loop(program, phases, config).await;
    }

    // Blocking links must stay off the runtime's worker threads
    let (program, phases, config) = (program.to_vec(), phases.to_vec(), config.clone());
    tokio::task::spawn_blocking(move || run_feedback_loop_threaded(&program, &phases, &config))
        .await
        .map_err(|e| OrchestratorError::TaskFailed {
            message: e.to_string(),
        })?
}

async fn amplify(
    program: Vec<i64>,
    phases: Vec<i64>,
    feedback: bool,
    threaded: bool,
    config: &FeedbackConfig,
) -> Result<(), Box<dyn Error>> {
    if !phases.is_empty() {
        let answer = run_amplifiers(&program, &phases, feedback, threaded, config).await?;
        println!("{}", answer);
        return Ok(());
    }

    let first = if feedback { AMPLIFIER_COUNT as i64 } else { 0 };
    let mut best: Option<(Vec<i64>, i64)> = None;
    for candidate in phase_permutations(first, AMPLIFIER_COUNT) {
        let answer = run_amplifiers(&program, &candidate, feedback, threaded, config).await?;
        if best.as_ref().map_or(true, |(_, value)| answer > *value) {
            best = Some((candidate, answer));
        }
    }

    match best {
        Some((phases, answer)) => println!("{} (phases {:?})", answer, phases),
        None => warn!("no phase orderings to try"),
    }
    Ok(())
}
