// Recorded execution with time-travel navigation

use crate::interpreter::engine::{Machine, Step};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::io::Channel;
use crate::snapshot::{HistoryError, Snapshot, SnapshotManager};
use tracing::{debug, warn};

/// Runs a machine one instruction at a time, capturing a [`Snapshot`] after
/// each, then lets the caller move backward and forward through the history.
pub struct Tracer {
    machine: Machine,

    /// Snapshot manager for reverse execution
    snapshot_manager: SnapshotManager,

    /// Current position in execution history
    history_position: usize,

    /// Error that stopped recording, if any
    error: Option<RuntimeError>,

    finished: bool,
}

impl Tracer {
    pub fn new(machine: Machine, snapshot_memory_limit: usize) -> Self {
        Tracer {
            machine,
            snapshot_manager: SnapshotManager::new(snapshot_memory_limit),
            history_position: 0,
            error: None,
            finished: false,
        }
    }

    /// Execute the program to the end, recording every instruction
    ///
    /// On error the history recorded so far is kept and remains navigable.
    pub fn run(&mut self, channel: &mut Channel<'_>) -> Result<(), RuntimeError> {
        let result = self.record(channel);
        if let Err(e) = &result {
            warn!(error = %e, recorded = self.total_snapshots(), "recording stopped");
            self.error = Some(e.clone());
        }
        self.finished = true;
        result
    }

    fn record(&mut self, channel: &mut Channel<'_>) -> Result<(), RuntimeError> {
        self.take_snapshot()?;

        loop {
            match self.machine.step()? {
                Step::Executed | Step::Halted => {}
                Step::Output(value) => channel.emit(value),
                Step::NeedsInput => self.machine.answer_from(channel)?,
            }
            self.take_snapshot()?;
            if self.machine.is_halted() {
                break;
            }
        }

        debug!(snapshots = self.total_snapshots(), "recording complete");
        Ok(())
    }

    fn take_snapshot(&mut self) -> Result<(), RuntimeError> {
        let snapshot = Snapshot::capture(&self.machine, self.snapshot_manager.len());
        if !self.snapshot_manager.push(snapshot) {
            return Err(RuntimeError::SnapshotLimitExceeded {
                current: self.snapshot_manager.memory_usage(),
                limit: self.snapshot_manager.memory_limit(),
            });
        }
        Ok(())
    }

    /// Snapshot at the current history position
    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshot_manager.get(self.history_position)
    }

    pub fn step_forward(&mut self) -> Result<(), HistoryError> {
        if self.history_position + 1 >= self.snapshot_manager.len() {
            return Err(HistoryError::AtEnd);
        }
        self.history_position += 1;
        Ok(())
    }

    pub fn step_backward(&mut self) -> Result<(), HistoryError> {
        if self.history_position == 0 {
            return Err(HistoryError::AtStart);
        }
        self.history_position -= 1;
        Ok(())
    }

    pub fn rewind_to_start(&mut self) {
        self.history_position = 0;
    }

    pub fn jump_to_end(&mut self) {
        self.history_position = self.snapshot_manager.len().saturating_sub(1);
    }

    pub fn history_position(&self) -> usize {
        self.history_position
    }

    pub fn total_snapshots(&self) -> usize {
        self.snapshot_manager.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn error(&self) -> Option<&RuntimeError> {
        self.error.as_ref()
    }

    /// The live machine, positioned after the last recorded instruction
    pub fn machine(&self) -> &Machine {
        &self.machine
    }
}
