//! Cyclic feedback loop
//!
//! `N` machines are connected in a ring: the output link of machine `i` is the
//! input link of machine `(i + 1) % N`. Every link has exactly one producer and
//! one consumer, so the links are the only state the machines share.
//!
//! Machine `i` starts with its phase setting in its backlog; machine 0 also
//! gets the initial signal `0`. After that, an input request on an empty link
//! suspends that machine until its upstream neighbour produces a value. The
//! loop ends when every machine halts, and the answer is the last value
//! produced by machine `N - 1`.
//!
//! Two drivers are provided:
//! - [`run_feedback_loop`]: each machine is a tokio task that awaits its link
//!   and yields to the runtime between bursts of instructions
//! - [`run_feedback_loop_threaded`]: each machine runs on its own thread with a
//!   blocking [`LinkInput`] provider. Threads cannot be cancelled, so only the
//!   step limit bounds this driver.

use super::OrchestratorError;
use crate::interpreter::engine::{Machine, Step};
use crate::interpreter::io::{Channel, Input, LinkInput, LinkOutput};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tracing::{debug, info, trace};

/// Limits for a feedback loop run
#[derive(Debug, Clone, Default)]
pub struct FeedbackConfig {
    /// Give up if the loop has not finished within this time
    pub timeout: Option<Duration>,

    /// Per-machine instruction budget
    pub step_limit: Option<u64>,
}

/// Instructions a task runs before giving the runtime a turn
const STEPS_PER_YIELD: u32 = 1024;

type Ring = (Vec<UnboundedSender<i64>>, Vec<UnboundedReceiver<i64>>);

/// One link per machine; `senders[i]` and `receivers[i]` belong to machine `i`
fn link_ring(count: usize) -> Ring {
    let (senders, mut receivers): Ring = (0..count).map(|_| mpsc::unbounded_channel()).unzip();
    // Machine i reads the link written by machine i - 1
    receivers.rotate_right(1);
    (senders, receivers)
}

fn seeded_machine(program: &[i64], node: usize, phase: i64, config: &FeedbackConfig) -> Machine {
    let seed = std::iter::once(phase).chain((node == 0).then_some(0));
    let machine = Machine::new(program.to_vec()).with_input(seed);
    match config.step_limit {
        Some(limit) => machine.with_step_limit(limit),
        None => machine,
    }
}

fn last_output(machines: &[Machine]) -> Result<i64, OrchestratorError> {
    let node = machines.len() - 1;
    machines[node]
        .output()
        .last()
        .copied()
        .ok_or(OrchestratorError::NoOutput { node })
}

async fn drive(
    node: usize,
    mut machine: Machine,
    mut inbound: UnboundedReceiver<i64>,
    outbound: UnboundedSender<i64>,
) -> Result<Machine, OrchestratorError> {
    let mut budget = STEPS_PER_YIELD;
    loop {
        match machine.step().map_err(OrchestratorError::node(node))? {
            Step::Executed => {
                budget -= 1;
                if budget == 0 {
                    budget = STEPS_PER_YIELD;
                    tokio::task::yield_now().await;
                }
            }
            Step::Output(value) => {
                if outbound.send(value).is_err() {
                    trace!(node, value, "downstream finished, output discarded");
                }
                // Let the consumer run before producing more
                budget = STEPS_PER_YIELD;
                tokio::task::yield_now().await;
            }
            Step::NeedsInput => {
                let input = match inbound.recv().await {
                    Some(value) => Input::Value(value),
                    None => {
                        debug!(node, "upstream closed with no pending values");
                        Input::Terminate
                    }
                };
                machine.supply(input).map_err(OrchestratorError::node(node))?;
            }
            Step::Halted => {
                debug!(node, outputs = machine.output().len(), "machine halted");
                return Ok(machine);
            }
        }
    }
}

/// Run the feedback loop with one tokio task per machine
pub async fn run_feedback_loop(
    program: &[i64],
    phases: &[i64],
    config: &FeedbackConfig,
) -> Result<i64, OrchestratorError> {
    let count = phases.len();
    if count == 0 {
        return Err(OrchestratorError::Empty);
    }

    let (senders, receivers) = link_ring(count);
    let mut tasks = JoinSet::new();
    for (node, ((&phase, outbound), inbound)) in
        phases.iter().zip(senders).zip(receivers).enumerate()
    {
        let machine = seeded_machine(program, node, phase, config);
        tasks.spawn(async move { (node, drive(node, machine, inbound, outbound).await) });
    }

    let collect = async {
        let mut finished: Vec<Option<Machine>> = vec![None; count];
        while let Some(joined) = tasks.join_next().await {
            let (node, result) = joined.map_err(|e| OrchestratorError::TaskFailed {
                message: e.to_string(),
            })?;
            finished[node] = Some(result?);
        }
        Ok::<_, OrchestratorError>(finished)
    };

    let finished = match config.timeout {
        Some(after) => tokio::time::timeout(after, collect)
            .await
            .map_err(|_| OrchestratorError::TimedOut { after })??,
        None => collect.await?,
    };

    // Every task reported back, so every slot is filled
    let machines: Vec<Machine> = finished.into_iter().flatten().collect();
    let answer = last_output(&machines)?;
    info!(machines = count, answer, "feedback loop finished");
    Ok(answer)
}

/// Run the feedback loop with one thread per machine and blocking links
///
/// A blocked or spinning thread cannot be interrupted, so a config with a
/// `timeout` is rejected with [`OrchestratorError::TimeoutUnsupported`].
pub fn run_feedback_loop_threaded(
    program: &[i64],
    phases: &[i64],
    config: &FeedbackConfig,
) -> Result<i64, OrchestratorError> {
    let count = phases.len();
    if count == 0 {
        return Err(OrchestratorError::Empty);
    }
    if config.timeout.is_some() {
        return Err(OrchestratorError::TimeoutUnsupported);
    }

    let (senders, receivers) = link_ring(count);

    let results: Vec<Result<Machine, OrchestratorError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = phases
            .iter()
            .zip(senders)
            .zip(receivers)
            .enumerate()
            .map(|(node, ((&phase, outbound), inbound))| {
                let mut machine = seeded_machine(program, node, phase, config);
                scope.spawn(move || -> Result<Machine, OrchestratorError> {
                    let mut channel = Channel::buffered()
                        .with_provider(LinkInput::new(inbound))
                        .with_consumer(LinkOutput::new(outbound));
                    machine
                        .run(&mut channel)
                        .map_err(OrchestratorError::node(node))?;
                    Ok(machine)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(OrchestratorError::TaskFailed {
                        message: "machine thread panicked".to_string(),
                    })
                })
            })
            .collect()
    });

    let machines = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    let answer = last_output(&machines)?;
    info!(machines = count, answer, "threaded feedback loop finished");
    Ok(answer)
}
