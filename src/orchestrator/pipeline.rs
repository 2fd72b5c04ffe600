//! Linear pipeline without feedback

use super::OrchestratorError;
use crate::interpreter::engine::Machine;
use crate::interpreter::io::Channel;
use tracing::debug;

/// Run one machine per parameter, strictly in sequence
///
/// Machine `i` receives `[parameters[i], previous]` where `previous` is the
/// last output of machine `i - 1` (0 for the first). Returns the last output of
/// the final machine.
pub fn run_pipeline(program: &[i64], parameters: &[i64]) -> Result<i64, OrchestratorError> {
    if parameters.is_empty() {
        return Err(OrchestratorError::Empty);
    }

    let mut signal = 0;
    for (node, &parameter) in parameters.iter().enumerate() {
        let mut machine = Machine::new(program.to_vec()).with_input([parameter, signal]);
        machine
            .run(&mut Channel::buffered())
            .map_err(OrchestratorError::node(node))?;

        signal = *machine
            .output()
            .last()
            .ok_or(OrchestratorError::NoOutput { node })?;
        debug!(node, parameter, signal, "pipeline stage finished");
    }

    Ok(signal)
}
