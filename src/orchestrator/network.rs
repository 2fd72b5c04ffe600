//! Packet network with an idle monitor
//!
//! The network is an arena of [`Node`]s indexed by their id and owned by a
//! single scheduler. Each round the scheduler resumes every live node until it
//! has answered exactly one input request:
//!
//! ```text
//! first request          → the node's own id
//! inbound queue non-empty → the next queued value
//! inbound queue empty     → Input::NoValue (the node reads -1 and carries on)
//! ```
//!
//! Output is accumulated in triples `(destination, x, y)`. A completed packet
//! is appended to the destination node's inbound queue, or, when addressed to
//! the monitor, replaces the monitor's pending packet.
//!
//! After every round the scheduler checks whether the network is idle (see
//! [`is_idle`]). If it is and the monitor holds a packet, the monitor delivers
//! it to node 0. Delivering the same `y` twice in a row means the network has
//! reached its steady state: the simulation stops and reports that `y`.

use super::OrchestratorError;
use crate::interpreter::constants::{IDLE_INPUT, MONITOR_ADDRESS, NETWORK_SIZE};
use crate::interpreter::engine::{Machine, Yield};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::io::Input;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Network configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Number of nodes, with ids `0..nodes`
    pub nodes: usize,

    /// Destination id that routes to the monitor
    pub monitor_address: i64,

    /// Value a node reads when its inbound queue is empty
    pub idle_input: i64,

    /// Give up after this many scheduling rounds
    pub max_rounds: Option<usize>,

    /// Per-node instruction budget
    pub step_limit: Option<u64>,

    /// Log and exclude a faulting node instead of aborting the network
    pub isolate_failures: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            nodes: NETWORK_SIZE,
            monitor_address: MONITOR_ADDRESS,
            idle_input: IDLE_INPUT,
            max_rounds: None,
            step_limit: None,
            isolate_failures: false,
        }
    }
}

/// A routed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub destination: i64,
    pub x: i64,
    pub y: i64,
}

/// Lifecycle of a network node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    Live,
    Halted,
    Failed(RuntimeError),
}

/// One machine in the network with its queues
#[derive(Debug, Clone)]
pub struct Node {
    pub id: usize,
    machine: Machine,
    inbound: VecDeque<i64>,
    booted: bool,
    /// Output words of the packet being built
    outgoing: Vec<i64>,
    /// Whether the last input request found the inbound queue empty
    idle: bool,
    status: NodeStatus,
}

impl Node {
    fn new(id: usize, machine: Machine) -> Self {
        Node {
            id,
            machine,
            inbound: VecDeque::new(),
            booted: false,
            outgoing: Vec::with_capacity(3),
            idle: false,
            status: NodeStatus::Live,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == NodeStatus::Live
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn status(&self) -> &NodeStatus {
        &self.status
    }

    pub fn inbound(&self) -> &VecDeque<i64> {
        &self.inbound
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Answer an input request without ever blocking
    fn poll(&mut self) -> Input {
        if !self.booted {
            self.booted = true;
            return Input::Value(self.id as i64);
        }

        match self.inbound.pop_front() {
            Some(value) => {
                self.idle = false;
                Input::Value(value)
            }
            None => {
                self.idle = true;
                Input::NoValue
            }
        }
    }

    /// Accumulate an output word; returns the packet once three words are in
    fn collect(&mut self, value: i64) -> Option<Packet> {
        self.idle = false;
        self.outgoing.push(value);
        if self.outgoing.len() < 3 {
            return None;
        }
        let packet = Packet {
            destination: self.outgoing[0],
            x: self.outgoing[1],
            y: self.outgoing[2],
        };
        self.outgoing.clear();
        Some(packet)
    }
}

/// What the monitor does when the network goes idle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorAction {
    /// Nothing pending
    Wait,
    /// Send `(x, y)` to node 0
    Deliver { x: i64, y: i64 },
    /// The same `y` would be delivered twice in a row
    Converged { y: i64 },
}

/// Holds at most one pending packet and remembers the last delivered `y`
#[derive(Debug, Clone, Default)]
pub struct Monitor {
    pending: Option<(i64, i64)>,
    last_delivered: Option<i64>,
    first_received: Option<Packet>,
    deliveries: usize,
}

impl Monitor {
    /// Store a packet, replacing any pending one
    pub fn receive(&mut self, packet: Packet) {
        self.first_received.get_or_insert(packet);
        self.pending = Some((packet.x, packet.y));
    }

    /// Decide what to do now that the network is idle
    pub fn on_idle(&mut self) -> MonitorAction {
        let Some((x, y)) = self.pending.take() else {
            return MonitorAction::Wait;
        };

        if self.last_delivered == Some(y) {
            return MonitorAction::Converged { y };
        }

        self.last_delivered = Some(y);
        self.deliveries += 1;
        MonitorAction::Deliver { x, y }
    }

    pub fn pending(&self) -> Option<(i64, i64)> {
        self.pending
    }

    pub fn first_received(&self) -> Option<Packet> {
        self.first_received
    }

    pub fn deliveries(&self) -> usize {
        self.deliveries
    }
}

/// Idle when every live node found its queue empty on its last request and
/// nothing has been queued for it since
pub fn is_idle(nodes: &[Node]) -> bool {
    nodes
        .iter()
        .filter(|node| node.is_live())
        .all(|node| node.idle && node.inbound.is_empty())
}

/// Outcome of a converged network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkReport {
    /// The `y` the monitor would have delivered twice in a row
    pub converged_y: i64,

    /// First packet ever addressed to the monitor
    pub first_monitor_packet: Option<Packet>,

    /// Scheduling rounds executed
    pub rounds: usize,

    /// Packets the monitor delivered to node 0
    pub deliveries: usize,

    /// Packets dropped for unknown or stopped destinations
    pub dropped: usize,
}

/// The node arena, monitor and scheduler
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<Node>,
    monitor: Monitor,
    config: NetworkConfig,
    rounds: usize,
    dropped: usize,
}

impl Network {
    /// Boot `config.nodes` copies of one program
    pub fn new(program: &[i64], config: NetworkConfig) -> Self {
        let machines = (0..config.nodes)
            .map(|_| Machine::new(program.to_vec()))
            .collect();
        Self::from_machines(machines, config)
    }

    /// Build a network from individually prepared machines; ids follow the
    /// order of `machines` and `config.nodes` is ignored
    pub fn from_machines(machines: Vec<Machine>, mut config: NetworkConfig) -> Self {
        config.nodes = machines.len();
        let nodes = machines
            .into_iter()
            .enumerate()
            .map(|(id, machine)| {
                let machine = machine.with_idle_input(config.idle_input);
                let machine = match config.step_limit {
                    Some(limit) => machine.with_step_limit(limit),
                    None => machine,
                };
                Node::new(id, machine)
            })
            .collect();

        Network {
            nodes,
            monitor: Monitor::default(),
            config,
            rounds: 0,
            dropped: 0,
        }
    }

    /// Run until the monitor detects convergence
    pub fn run(&mut self) -> Result<NetworkReport, OrchestratorError> {
        if self.nodes.is_empty() {
            return Err(OrchestratorError::Empty);
        }

        loop {
            self.round()?;

            if !self.nodes.iter().any(Node::is_live) {
                return Err(OrchestratorError::AllNodesStopped);
            }

            if is_idle(&self.nodes) {
                match self.monitor.on_idle() {
                    MonitorAction::Wait => {}
                    MonitorAction::Deliver { x, y } => self.deliver_to_first(x, y)?,
                    MonitorAction::Converged { y } => {
                        info!(y, rounds = self.rounds, "network converged");
                        self.shutdown();
                        return Ok(self.report(y));
                    }
                }
            }

            if let Some(max) = self.config.max_rounds {
                if self.rounds >= max {
                    return Err(OrchestratorError::Stalled {
                        rounds: self.rounds,
                    });
                }
            }
        }
    }

    /// Give every live node one turn
    fn round(&mut self) -> Result<(), OrchestratorError> {
        for id in 0..self.nodes.len() {
            if self.nodes[id].is_live() {
                self.service(id)?;
            }
        }
        self.rounds += 1;
        Ok(())
    }

    /// Answer one input request for a node, then run it up to its next
    /// request so it stays parked between rounds
    fn service(&mut self, id: usize) -> Result<(), OrchestratorError> {
        let mut answered = false;
        loop {
            let node = &mut self.nodes[id];
            let event = match node.machine.resume() {
                Ok(event) => event,
                Err(source) => return self.fail(id, source),
            };

            match event {
                Yield::Output(value) => {
                    if let Some(packet) = node.collect(value) {
                        self.route(id, packet);
                    }
                }
                Yield::NeedsInput if answered => return Ok(()),
                Yield::NeedsInput => {
                    let input = node.poll();
                    if let Err(source) = node.machine.supply(input) {
                        return self.fail(id, source);
                    }
                    answered = true;
                }
                Yield::Halted => {
                    debug!(node = id, "node halted");
                    node.status = NodeStatus::Halted;
                    return Ok(());
                }
            }
        }
    }

    fn route(&mut self, from: usize, packet: Packet) {
        if packet.destination == self.config.monitor_address {
            debug!(from, x = packet.x, y = packet.y, "packet to monitor");
            self.monitor.receive(packet);
            return;
        }

        let target = usize::try_from(packet.destination)
            .ok()
            .and_then(|id| self.nodes.get_mut(id))
            .filter(|node| node.is_live());

        match target {
            Some(node) => {
                node.inbound.push_back(packet.x);
                node.inbound.push_back(packet.y);
            }
            None => {
                warn!(
                    from,
                    destination = packet.destination,
                    "dropping packet for unknown or stopped node"
                );
                self.dropped += 1;
            }
        }
    }

    fn deliver_to_first(&mut self, x: i64, y: i64) -> Result<(), OrchestratorError> {
        match self.nodes.first_mut().filter(|node| node.is_live()) {
            Some(node) => {
                debug!(x, y, "monitor delivering to node 0");
                node.inbound.push_back(x);
                node.inbound.push_back(y);
                node.idle = false;
                Ok(())
            }
            None => Err(OrchestratorError::NoOutput { node: 0 }),
        }
    }

    fn fail(&mut self, id: usize, source: RuntimeError) -> Result<(), OrchestratorError> {
        if !self.config.isolate_failures {
            return Err(OrchestratorError::Node { node: id, source });
        }
        warn!(node = id, error = %source, "isolating failed node");
        self.nodes[id].status = NodeStatus::Failed(source);
        Ok(())
    }

    /// Tell every parked node to terminate
    fn shutdown(&mut self) {
        for node in self.nodes.iter_mut().filter(|node| node.is_live()) {
            if let Err(e) = node.machine.supply(Input::Terminate) {
                debug!(node = node.id, error = %e, "node was not waiting for input");
            }
            node.status = NodeStatus::Halted;
        }
    }

    fn report(&self, converged_y: i64) -> NetworkReport {
        NetworkReport {
            converged_y,
            first_monitor_packet: self.monitor.first_received(),
            rounds: self.rounds,
            deliveries: self.monitor.deliveries(),
            dropped: self.dropped,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_converges_on_repeat() {
        let mut monitor = Monitor::default();
        assert_eq!(monitor.on_idle(), MonitorAction::Wait);

        monitor.receive(Packet { destination: 255, x: 1, y: 7 });
        monitor.receive(Packet { destination: 255, x: 2, y: 8 });
        assert_eq!(monitor.on_idle(), MonitorAction::Deliver { x: 2, y: 8 });
        assert_eq!(monitor.pending(), None);

        monitor.receive(Packet { destination: 255, x: 3, y: 9 });
        assert_eq!(monitor.on_idle(), MonitorAction::Deliver { x: 3, y: 9 });

        monitor.receive(Packet { destination: 255, x: 4, y: 9 });
        assert_eq!(monitor.on_idle(), MonitorAction::Converged { y: 9 });

        assert_eq!(
            monitor.first_received(),
            Some(Packet { destination: 255, x: 1, y: 7 })
        );
        assert_eq!(monitor.deliveries(), 2);
    }

    #[test]
    fn test_node_poll_sequence() {
        let mut node = Node::new(4, Machine::new(vec![99]));
        assert_eq!(node.poll(), Input::Value(4));
        assert_eq!(node.poll(), Input::NoValue);
        assert!(node.is_idle());

        node.inbound.extend([10, 20]);
        assert_eq!(node.poll(), Input::Value(10));
        assert!(!node.is_idle());
        assert_eq!(node.poll(), Input::Value(20));
        assert_eq!(node.poll(), Input::NoValue);
    }

    #[test]
    fn test_node_collects_triples() {
        let mut node = Node::new(0, Machine::new(vec![99]));
        assert_eq!(node.collect(3), None);
        assert_eq!(node.collect(5), None);
        assert_eq!(
            node.collect(6),
            Some(Packet { destination: 3, x: 5, y: 6 })
        );
        assert_eq!(node.collect(1), None);
    }

    #[test]
    fn test_idle_requires_empty_queues() {
        let mut a = Node::new(0, Machine::new(vec![99]));
        let mut b = Node::new(1, Machine::new(vec![99]));
        a.idle = true;
        b.idle = true;
        assert!(is_idle(&[a.clone(), b.clone()]));

        b.inbound.push_back(1);
        assert!(!is_idle(&[a.clone(), b.clone()]));

        b.status = NodeStatus::Halted;
        assert!(is_idle(&[a, b]));
    }
}
