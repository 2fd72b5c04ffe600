// Snapshot management for reverse execution

use crate::interpreter::constants::ASCII_LIMIT;
use crate::interpreter::engine::{Machine, MachineState};
use crate::memory::Memory;
use thiserror::Error;

/// Render an output record as text lines
///
/// Values in `0..256` are character codes; `\n` ends a line. Any other value
/// is printed in decimal on a line of its own.
pub fn render_output(values: &[i64]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for &value in values {
        if value == i64::from(b'\n') {
            lines.push(std::mem::take(&mut current));
        } else if (0..ASCII_LIMIT).contains(&value) {
            current.push(char::from(value as u8));
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(value.to_string());
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Snapshot of machine state after one instruction
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub step_index: usize,
    pub pc: usize,
    pub relative_base: i64,
    pub state: MachineState,
    pub memory: Memory,
    pub output: Vec<i64>,
    pub inputs_consumed: usize,
    pub last_write: Option<usize>,
}

impl Snapshot {
    pub fn capture(machine: &Machine, step_index: usize) -> Self {
        Snapshot {
            step_index,
            pc: machine.pc(),
            relative_base: machine.relative_base(),
            state: machine.state(),
            memory: machine.memory().clone(),
            output: machine.output().to_vec(),
            inputs_consumed: machine.inputs_consumed(),
            last_write: machine.last_write(),
        }
    }

    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.memory.estimated_size()
            + self.output.len() * std::mem::size_of::<i64>()
    }
}

/// Attempt to move past either end of the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("already at the first step")]
    AtStart,

    #[error("already at the last recorded step")]
    AtEnd,
}

/// Manages execution history for reverse execution
#[derive(Debug)]
pub struct SnapshotManager {
    snapshots: Vec<Snapshot>,
    max_memory: usize,
    current_memory: usize,
}

impl SnapshotManager {
    pub fn new(max_memory: usize) -> Self {
        SnapshotManager {
            snapshots: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a snapshot to history. Returns `false` (and drops the snapshot)
    /// when it would exceed the memory limit.
    pub fn push(&mut self, snapshot: Snapshot) -> bool {
        let snapshot_size = snapshot.estimated_size();

        if self.current_memory + snapshot_size > self.max_memory {
            return false;
        }

        self.current_memory += snapshot_size;
        self.snapshots.push(snapshot);
        true
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}
