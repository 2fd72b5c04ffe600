//! Main TUI application state and logic

use crate::interpreter::tracer::Tracer;
use crate::snapshot::HistoryError;
use crate::ui::panes::{
    self, program::ProgramScrollState, render_memory_pane, render_output_pane,
    render_program_pane, render_registers_pane, render_status_bar,
};
use crate::ui::theme::DEFAULT_THEME;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Paragraph,
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Delay between automatic steps while playing
const PLAY_INTERVAL: Duration = Duration::from_millis(250);

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Program,
    Memory,
    Output,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: program -> output -> memory)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Program => FocusedPane::Output,
            FocusedPane::Output => FocusedPane::Memory,
            FocusedPane::Memory => FocusedPane::Program,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Program => FocusedPane::Memory,
            FocusedPane::Output => FocusedPane::Program,
            FocusedPane::Memory => FocusedPane::Output,
        }
    }
}

/// The main application state
pub struct App {
    /// Recorded execution being browsed
    pub tracer: Tracer,

    /// Currently focused pane
    pub focused_pane: FocusedPane,

    pub program_scroll: ProgramScrollState,
    pub memory_scroll: usize,
    pub output_scroll: usize,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,
}

impl App {
    pub fn new(tracer: Tracer) -> Self {
        let status_message = match tracer.error() {
            Some(e) => format!("Stopped: {}", e),
            None => String::from("Ready!"),
        };

        App {
            tracer,
            focused_pane: FocusedPane::Program,
            program_scroll: ProgramScrollState::default(),
            memory_scroll: 0,
            output_scroll: 0,
            should_quit: false,
            status_message,
            is_playing: false,
            last_play_time: Instant::now(),
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= PLAY_INTERVAL {
                if self.tracer.step_forward().is_ok() {
                    self.output_scroll = usize::MAX;
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Poll with a timeout so auto-play keeps ticking
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let total = self.tracer.total_snapshots();
        let position = self.tracer.history_position();
        let has_error = self.tracer.error().is_some();

        let Some(snapshot) = self.tracer.current() else {
            let paragraph = Paragraph::new("(nothing recorded)")
                .block(panes::pane_block(" Program ", true))
                .style(Style::default().fg(DEFAULT_THEME.comment));
            frame.render_widget(paragraph, main_chunks[0]);
            render_status_bar(
                frame,
                main_chunks[1],
                &self.status_message,
                0,
                0,
                has_error,
                false,
            );
            return;
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(main_chunks[0]);

        // Left column: Program (top) | Output (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Registers (top) | Memory (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(10), Constraint::Min(0)])
            .split(columns[1]);

        // The final snapshot of a failed recording is where the fault happened
        let at_fault = has_error && position + 1 == total;

        render_program_pane(
            frame,
            left_rows[0],
            &snapshot.memory,
            snapshot.pc,
            at_fault,
            self.focused_pane == FocusedPane::Program,
            &mut self.program_scroll,
        );

        render_output_pane(
            frame,
            left_rows[1],
            &snapshot.output,
            self.focused_pane == FocusedPane::Output,
            &mut self.output_scroll,
        );

        render_registers_pane(frame, right_rows[0], snapshot, false);

        render_memory_pane(
            frame,
            right_rows[1],
            snapshot,
            self.focused_pane == FocusedPane::Memory,
            &mut self.memory_scroll,
        );

        render_status_bar(
            frame,
            main_chunks[1],
            &self.status_message,
            position,
            total,
            has_error,
            self.is_playing,
        );
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1);
                let stepped = (0..n)
                    .take_while(|_| self.tracer.step_forward().is_ok())
                    .count();
                self.status_message = format!("Stepped forward {} step(s)", stepped);
                self.output_scroll = usize::MAX;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Left => {
                self.is_playing = false;
                let result = self.tracer.step_backward();
                self.report_step("backward", result);
            }
            KeyCode::Right => {
                self.is_playing = false;
                let result = self.tracer.step_forward();
                self.report_step("forward", result);
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Program => {
                    // Scrolling up makes the current instruction move down visually
                    if let Some(row) = self.program_scroll.target_row {
                        self.program_scroll.target_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Memory => {
                    self.memory_scroll = self.memory_scroll.saturating_sub(1);
                }
                FocusedPane::Output => {
                    self.output_scroll = self.output_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Program => {
                    if let Some(row) = self.program_scroll.target_row {
                        self.program_scroll.target_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Memory => {
                    self.memory_scroll = self.memory_scroll.saturating_add(1);
                }
                FocusedPane::Output => {
                    self.output_scroll = self.output_scroll.saturating_add(1);
                }
            },
            KeyCode::Char(' ') => {
                self.is_playing = !self.is_playing;
                if self.is_playing {
                    self.last_play_time = Instant::now();
                    self.status_message = "Playing...".to_string();
                } else {
                    self.status_message = "Paused".to_string();
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.tracer.jump_to_end();
                self.status_message = "Jumped to end".to_string();
                self.output_scroll = usize::MAX;
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                self.tracer.rewind_to_start();
                self.status_message = "Jumped to start".to_string();
                self.output_scroll = usize::MAX;
            }
            _ => {}
        }
    }

    fn report_step(&mut self, direction: &str, result: Result<(), HistoryError>) {
        self.status_message = match result {
            Ok(()) => {
                self.output_scroll = usize::MAX;
                format!("Stepped {}", direction)
            }
            Err(e) => format!("Cannot step {}: {}", direction, e),
        };
    }
}
