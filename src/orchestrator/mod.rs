//! Composition of multiple machines
//!
//! Three patterns, all built only from [`Machine`](crate::interpreter::engine::Machine),
//! channels and FIFO links:
//! - [`pipeline`]: machines run strictly one after another, each feeding the next
//! - [`feedback`]: machines run as cooperative tasks around a cycle of links,
//!   blocking on empty links
//! - [`network`]: many machines polled by one scheduler, exchanging packets,
//!   with an idle monitor that restarts traffic
//!
//! [`phases`] searches phase orderings for the first two.
//!
//! # Suspension
//!
//! Only the feedback loop ever waits for a value; the network never blocks a
//! node, because a waiting node could be waiting on a peer that is itself idle.

pub mod feedback;
pub mod network;
pub mod phases;
pub mod pipeline;

use crate::interpreter::errors::RuntimeError;
use std::time::Duration;
use thiserror::Error;

pub use feedback::{run_feedback_loop, run_feedback_loop_threaded, FeedbackConfig};
pub use network::{Network, NetworkConfig, NetworkReport, Packet};
pub use phases::phase_permutations;
pub use pipeline::run_pipeline;

/// Errors raised while composing machines
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// A participant faulted
    #[error("machine {node} failed: {source}")]
    Node {
        node: usize,
        #[source]
        source: RuntimeError,
    },

    /// A machine halted without producing the value the composition needs
    #[error("machine {node} produced no output")]
    NoOutput { node: usize },

    /// A composition needs at least one machine
    #[error("no machines to run")]
    Empty,

    /// No forward progress within the configured budget
    #[error("stalled after {rounds} rounds without converging")]
    Stalled { rounds: usize },

    /// Every network node halted or failed
    #[error("every node has stopped")]
    AllNodesStopped,

    /// The feedback loop did not finish in time
    #[error("timed out after {after:?}")]
    TimedOut { after: Duration },

    /// Threads of the threaded feedback loop cannot be cancelled
    #[error("the threaded feedback loop cannot enforce a timeout; use a step limit")]
    TimeoutUnsupported,

    /// A task panicked or was cancelled
    #[error("machine task failed: {message}")]
    TaskFailed { message: String },
}

impl OrchestratorError {
    pub(crate) fn node(node: usize) -> impl FnOnce(RuntimeError) -> Self {
        move |source| OrchestratorError::Node { node, source }
    }
}
