// Integration tests for pipelines, feedback loops and the packet network

use intcode::interpreter::engine::Machine;
use intcode::interpreter::errors::RuntimeError;
use intcode::orchestrator::network::{NetworkConfig, NodeStatus, Packet};
use intcode::orchestrator::{
    phase_permutations, run_feedback_loop, run_feedback_loop_threaded, run_pipeline,
    FeedbackConfig, Network, OrchestratorError,
};
use intcode::parser::parse_program;
use std::time::Duration;

const FEEDBACK_SHORT: &str =
    "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5";

const FEEDBACK_LONG: &str = "3,52,1001,52,-5,52,3,53,1,52,56,54,1007,54,5,55,1005,55,26,1001,54,\
    -5,54,1105,1,12,1,53,54,53,1008,54,0,55,1001,55,1,55,2,53,55,53,4,53,1001,56,-1,56,1005,56,6,\
    99,0,0,0,0,10";

/// Sends `(255, id, id)`, then forwards every packet it receives to the monitor
const REFLECTOR: [i64; 28] = [
    3, 100, 104, 255, 4, 100, 4, 100, 3, 101, 1008, 101, -1, 102, 1005, 102, 8, 3, 103, 104, 255,
    4, 101, 4, 103, 1105, 1, 8,
];

/// Reads its id, then polls forever without sending anything
const LISTENER: [i64; 7] = [3, 100, 3, 101, 1105, 1, 2];

fn program(text: &str) -> Vec<i64> {
    parse_program(text).expect("Parsing failed")
}

fn timed() -> FeedbackConfig {
    FeedbackConfig {
        timeout: Some(Duration::from_secs(10)),
        step_limit: Some(1_000_000),
    }
}

#[test]
fn test_pipeline_samples() {
    let first = program("3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0");
    assert_eq!(run_pipeline(&first, &[4, 3, 2, 1, 0]), Ok(43210));

    let second = program(
        "3,23,3,24,1002,24,10,24,1002,23,-1,23,101,5,23,23,1,24,23,23,4,23,99,0,0",
    );
    assert_eq!(run_pipeline(&second, &[0, 1, 2, 3, 4]), Ok(54321));

    let third = program(
        "3,31,3,32,1002,32,10,32,1001,31,-2,31,1007,31,0,33,1002,33,7,33,1,33,31,31,1,32,31,31,4,31,99,0,0,0",
    );
    assert_eq!(run_pipeline(&third, &[1, 0, 4, 3, 2]), Ok(65210));
}

#[test]
fn test_pipeline_best_ordering() {
    let first = program("3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0");
    let best = phase_permutations(0, 5)
        .iter()
        .map(|phases| run_pipeline(&first, phases).unwrap())
        .max();
    assert_eq!(best, Some(43210));
}

#[test]
fn test_pipeline_errors() {
    assert_eq!(run_pipeline(&[99], &[]), Err(OrchestratorError::Empty));
    assert_eq!(
        run_pipeline(&[3, 0, 3, 0, 99], &[1, 2]),
        Err(OrchestratorError::NoOutput { node: 0 })
    );
    assert_eq!(
        run_pipeline(&[3, 0, 3, 0, 3, 0, 99], &[7]),
        Err(OrchestratorError::Node {
            node: 0,
            source: RuntimeError::InputUnavailable { pc: 4 },
        })
    );
}

#[tokio::test]
async fn test_feedback_loop_samples() {
    let short = program(FEEDBACK_SHORT);
    assert_eq!(
        run_feedback_loop(&short, &[9, 8, 7, 6, 5], &timed()).await,
        Ok(139629729)
    );

    let long = program(FEEDBACK_LONG);
    assert_eq!(
        run_feedback_loop(&long, &[9, 7, 8, 5, 6], &timed()).await,
        Ok(18216)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_feedback_loop_on_worker_threads() {
    let short = program(FEEDBACK_SHORT);
    assert_eq!(
        run_feedback_loop(&short, &[9, 8, 7, 6, 5], &timed()).await,
        Ok(139629729)
    );
}

#[tokio::test]
async fn test_feedback_loop_reports_node_fault() {
    // Machine 2 of 3 decodes garbage after reading its phase
    let result = run_feedback_loop(&[3, 0, 98], &[1, 2, 3], &timed()).await;
    assert!(matches!(
        result,
        Err(OrchestratorError::Node {
            source: RuntimeError::DecodeFault { opcode: 98, pc: 2 },
            ..
        })
    ));

    assert_eq!(
        run_feedback_loop(&[99], &[], &FeedbackConfig::default()).await,
        Err(OrchestratorError::Empty)
    );
}

#[tokio::test]
async fn test_feedback_loop_without_output() {
    // Every machine reads its phase and halts
    let result = run_feedback_loop(&[3, 0, 99], &[5, 6], &timed()).await;
    assert_eq!(result, Err(OrchestratorError::NoOutput { node: 1 }));
}

#[tokio::test]
async fn test_spinning_feedback_loop_times_out() {
    // Never reads, never writes, never halts
    let config = FeedbackConfig {
        timeout: Some(Duration::from_millis(200)),
        step_limit: None,
    };
    let result = run_feedback_loop(&[1105, 1, 0], &[0], &config).await;
    assert_eq!(
        result,
        Err(OrchestratorError::TimedOut {
            after: Duration::from_millis(200)
        })
    );
}

fn step_bounded() -> FeedbackConfig {
    FeedbackConfig {
        timeout: None,
        step_limit: Some(1_000_000),
    }
}

#[test]
fn test_threaded_feedback_loop_samples() {
    let short = program(FEEDBACK_SHORT);
    assert_eq!(
        run_feedback_loop_threaded(&short, &[9, 8, 7, 6, 5], &step_bounded()),
        Ok(139629729)
    );

    let long = program(FEEDBACK_LONG);
    assert_eq!(
        run_feedback_loop_threaded(&long, &[9, 7, 8, 5, 6], &step_bounded()),
        Ok(18216)
    );
}

#[test]
fn test_threaded_feedback_loop_step_limit() {
    let config = FeedbackConfig {
        timeout: None,
        step_limit: Some(1_000),
    };
    assert_eq!(
        run_feedback_loop_threaded(&[1105, 1, 0], &[0], &config),
        Err(OrchestratorError::Node {
            node: 0,
            source: RuntimeError::StepLimitExceeded { limit: 1_000, pc: 0 }
        })
    );
}

#[test]
fn test_threaded_feedback_loop_rejects_timeout() {
    let short = program(FEEDBACK_SHORT);
    assert_eq!(
        run_feedback_loop_threaded(&short, &[9, 8, 7, 6, 5], &timed()),
        Err(OrchestratorError::TimeoutUnsupported)
    );
}

#[test]
fn test_network_converges_on_repeated_delivery() {
    let config = NetworkConfig {
        nodes: 5,
        max_rounds: Some(1_000),
        ..NetworkConfig::default()
    };
    let mut network = Network::new(&REFLECTOR, config);
    let report = network.run().expect("network did not converge");

    // The last packet to reach the monitor before the first idle is node 4's
    assert_eq!(report.converged_y, 4);
    assert_eq!(
        report.first_monitor_packet,
        Some(Packet {
            destination: 255,
            x: 0,
            y: 0
        })
    );
    assert_eq!(report.deliveries, 1);
    assert_eq!(report.dropped, 0);

    // Every node was told to terminate
    assert!(network
        .nodes()
        .iter()
        .all(|node| *node.status() == NodeStatus::Halted));
}

#[test]
fn test_network_default_size() {
    let mut network = Network::new(&REFLECTOR, NetworkConfig::default());
    let report = network.run().expect("network did not converge");
    assert_eq!(network.nodes().len(), 50);
    assert_eq!(report.converged_y, 49);
}

#[test]
fn test_network_stalls_without_monitor_traffic() {
    let config = NetworkConfig {
        nodes: 3,
        max_rounds: Some(10),
        ..NetworkConfig::default()
    };
    let result = Network::new(&LISTENER, config).run();
    assert_eq!(result, Err(OrchestratorError::Stalled { rounds: 10 }));
}

#[test]
fn test_network_drops_unknown_destination() {
    // Like the reflector, but first sends (77, 1, 2)
    let sender = program(
        "3,100,104,77,104,1,104,2,104,255,4,100,4,100,3,101,1008,101,-1,102,\
         1005,102,14,3,103,104,255,4,101,4,103,1105,1,14",
    );
    let machines = vec![
        Machine::new(sender),
        Machine::new(REFLECTOR.to_vec()),
        Machine::new(REFLECTOR.to_vec()),
    ];
    let report = Network::from_machines(machines, NetworkConfig::default())
        .run()
        .expect("network did not converge");

    assert_eq!(report.dropped, 1);
    assert_eq!(report.converged_y, 2);
}

#[test]
fn test_network_node_fault() {
    let machines = || {
        vec![
            Machine::new(REFLECTOR.to_vec()),
            Machine::new(vec![3, 100, 98]),
            Machine::new(LISTENER.to_vec()),
        ]
    };

    let result = Network::from_machines(machines(), NetworkConfig::default()).run();
    assert_eq!(
        result,
        Err(OrchestratorError::Node {
            node: 1,
            source: RuntimeError::DecodeFault { opcode: 98, pc: 2 },
        })
    );

    let isolating = NetworkConfig {
        isolate_failures: true,
        ..NetworkConfig::default()
    };
    let mut network = Network::from_machines(machines(), isolating);
    let report = network.run().expect("network did not converge");
    assert_eq!(report.converged_y, 0);
    assert!(matches!(
        network.nodes()[1].status(),
        NodeStatus::Failed(RuntimeError::DecodeFault { .. })
    ));
}

#[test]
fn test_network_all_nodes_stopped() {
    let config = NetworkConfig {
        nodes: 4,
        ..NetworkConfig::default()
    };
    assert_eq!(
        Network::new(&[3, 100, 99], config).run(),
        Err(OrchestratorError::AllNodesStopped)
    );

    let empty = NetworkConfig {
        nodes: 0,
        ..NetworkConfig::default()
    };
    assert_eq!(
        Network::new(&REFLECTOR, empty).run(),
        Err(OrchestratorError::Empty)
    );
}
