// Integration tests for recorded execution and history navigation

use intcode::interpreter::engine::{Machine, MachineState};
use intcode::interpreter::errors::RuntimeError;
use intcode::interpreter::io::{Channel, ScriptInput};
use intcode::interpreter::tracer::Tracer;
use intcode::snapshot::{render_output, HistoryError};

const LIMIT: usize = 1024 * 1024 * 100; // 100MB

#[test]
fn test_records_every_instruction() {
    let mut tracer = Tracer::new(Machine::new(vec![1, 0, 0, 0, 99]), LIMIT);
    tracer.run(&mut Channel::buffered()).expect("Execution failed");

    // Initial state, after add, after halt
    assert_eq!(tracer.total_snapshots(), 3);
    assert!(tracer.is_finished());
    assert!(tracer.error().is_none());

    tracer.rewind_to_start();
    let start = tracer.current().unwrap();
    assert_eq!(start.pc, 0);
    assert_eq!(start.memory.load(0), 1);
    assert_eq!(start.last_write, None);

    tracer.step_forward().unwrap();
    let after_add = tracer.current().unwrap();
    assert_eq!(after_add.pc, 4);
    assert_eq!(after_add.memory.load(0), 2);
    assert_eq!(after_add.last_write, Some(0));

    tracer.step_forward().unwrap();
    assert_eq!(tracer.current().unwrap().state, MachineState::Halted);
    assert_eq!(tracer.step_forward(), Err(HistoryError::AtEnd));
}

#[test]
fn test_navigation_bounds() {
    let mut tracer = Tracer::new(Machine::new(vec![104, 1, 104, 2, 99]), LIMIT);
    tracer.run(&mut Channel::buffered()).unwrap();

    tracer.rewind_to_start();
    assert_eq!(tracer.step_backward(), Err(HistoryError::AtStart));
    assert_eq!(tracer.current().unwrap().output, Vec::<i64>::new());

    tracer.jump_to_end();
    assert_eq!(tracer.history_position(), tracer.total_snapshots() - 1);
    assert_eq!(tracer.current().unwrap().output, vec![1, 2]);

    tracer.step_backward().unwrap();
    assert_eq!(tracer.current().unwrap().output, vec![1, 2]);
    tracer.step_backward().unwrap();
    assert_eq!(tracer.current().unwrap().output, vec![1]);
}

#[test]
fn test_input_from_script_is_recorded() {
    let program = vec![3, 100, 4, 100, 1105, 1, 0];
    let mut tracer = Tracer::new(Machine::new(program), LIMIT);
    let mut channel = Channel::buffered().with_provider(ScriptInput::new("ok\n"));
    tracer.run(&mut channel).unwrap();

    tracer.jump_to_end();
    let last = tracer.current().unwrap();
    assert_eq!(last.inputs_consumed, 3);
    assert_eq!(render_output(&last.output), vec!["ok".to_string()]);
    assert!(tracer.machine().is_halted());
}

#[test]
fn test_error_keeps_partial_history() {
    let mut tracer = Tracer::new(Machine::new(vec![104, 7, 98]), LIMIT);
    let result = tracer.run(&mut Channel::buffered());

    assert_eq!(result, Err(RuntimeError::DecodeFault { opcode: 98, pc: 2 }));
    assert_eq!(tracer.error(), Some(&RuntimeError::DecodeFault { opcode: 98, pc: 2 }));
    assert!(tracer.is_finished());

    // Initial state and the state after the output
    assert_eq!(tracer.total_snapshots(), 2);
    tracer.jump_to_end();
    assert_eq!(tracer.current().unwrap().pc, 2);
    assert_eq!(tracer.current().unwrap().output, vec![7]);
}

#[test]
fn test_snapshot_limit() {
    let mut tracer = Tracer::new(Machine::new(vec![1105, 1, 0]), 4096);
    let result = tracer.run(&mut Channel::buffered());

    assert!(matches!(
        result,
        Err(RuntimeError::SnapshotLimitExceeded { limit: 4096, .. })
    ));
    assert!(tracer.total_snapshots() > 0);
}
