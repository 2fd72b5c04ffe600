//! Runtime error types for the integer machine
//!
//! This module defines [`RuntimeError`], which represents all errors that can occur
//! while a machine executes (as opposed to program text parse errors).
//!
//! All runtime errors are fatal to the machine that raised them: it cannot make
//! forward progress and nothing is retried. Callers decide whether to restart
//! from a fresh memory image.

use thiserror::Error;

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Opcode not in the dispatch table
    #[error("unknown opcode {opcode} at pc {pc}")]
    DecodeFault { opcode: i64, pc: usize },

    /// Negative address on read, write or jump
    #[error("negative address {address} at pc {pc}")]
    AddressFault { address: i64, pc: usize },

    /// Write through an immediate-mode parameter
    #[error("illegal write target: immediate-mode parameter of opcode {opcode} at pc {pc}")]
    WriteModeFault { opcode: i64, pc: usize },

    /// Parameter mode digit other than 0, 1 or 2
    #[error("unsupported parameter mode {mode} for opcode {opcode} at pc {pc}")]
    ModeFault { mode: u8, opcode: i64, pc: usize },

    /// Input requested with an empty backlog and no provider attached
    #[error("input requested at pc {pc} with an empty backlog and no provider")]
    InputUnavailable { pc: usize },

    /// The input provider itself failed
    #[error("input provider failed at pc {pc}: {message}")]
    ProviderFault { message: String, pc: usize },

    /// An input was supplied while the machine was not waiting for one
    #[error("input supplied at pc {pc} while the machine was not awaiting input")]
    NotAwaitingInput { pc: usize },

    /// The configured instruction budget ran out
    #[error("step limit of {limit} instructions exceeded at pc {pc}")]
    StepLimitExceeded { limit: u64, pc: usize },

    /// Snapshot history limit exceeded
    #[error("snapshot memory limit exceeded: {current} bytes used, limit is {limit}")]
    SnapshotLimitExceeded { current: usize, limit: usize },
}

impl RuntimeError {
    /// Program counter of the faulting instruction, when there is one
    pub fn pc(&self) -> Option<usize> {
        match self {
            RuntimeError::DecodeFault { pc, .. }
            | RuntimeError::AddressFault { pc, .. }
            | RuntimeError::WriteModeFault { pc, .. }
            | RuntimeError::ModeFault { pc, .. }
            | RuntimeError::InputUnavailable { pc }
            | RuntimeError::ProviderFault { pc, .. }
            | RuntimeError::NotAwaitingInput { pc }
            | RuntimeError::StepLimitExceeded { pc, .. } => Some(*pc),
            RuntimeError::SnapshotLimitExceeded { .. } => None,
        }
    }

    /// Short human-readable category name
    pub fn category(&self) -> &'static str {
        match self {
            RuntimeError::DecodeFault { .. } => "decode fault",
            RuntimeError::AddressFault { .. } => "address fault",
            RuntimeError::WriteModeFault { .. } => "write-mode fault",
            RuntimeError::ModeFault { .. } => "mode fault",
            RuntimeError::InputUnavailable { .. } => "input unavailable",
            RuntimeError::ProviderFault { .. } => "provider fault",
            RuntimeError::NotAwaitingInput { .. } => "protocol violation",
            RuntimeError::StepLimitExceeded { .. } => "step limit",
            RuntimeError::SnapshotLimitExceeded { .. } => "snapshot limit",
        }
    }
}
