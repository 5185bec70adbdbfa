//! Gate-dependency DAG with precomputed routing metadata.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex as PetNodeIndex};

use crate::error::{IrError, IrResult};
use crate::qubit::LogicalQubit;

/// Index of a gate in the dependency DAG.
pub type GateId = PetNodeIndex<u32>;

/// A vertex of the gate-dependency DAG.
///
/// Gates are linked when they touch the same logical qubit with no other
/// gate on that qubit between them; a gate may execute once every
/// predecessor has been scheduled. The wire-successor links and the
/// criticality rank are filled in by [`GateDag::finalize`].
#[derive(Debug, Clone)]
pub struct GateNode {
    name: String,
    target: LogicalQubit,
    control: Option<LogicalQubit>,
    target_child: Option<GateId>,
    control_child: Option<GateId>,
    next_target_two_qubit: Option<GateId>,
    criticality: u32,
}

impl GateNode {
    /// Gate name as it appears in the latency table.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The target operand.
    #[inline]
    pub fn target(&self) -> LogicalQubit {
        self.target
    }

    /// The control operand, if this is a two-qubit gate.
    #[inline]
    pub fn control(&self) -> Option<LogicalQubit> {
        self.control
    }

    /// Number of operands (1 or 2).
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        if self.control.is_some() { 2 } else { 1 }
    }

    /// Check if this gate has two operands.
    #[inline]
    pub fn is_two_qubit(&self) -> bool {
        self.control.is_some()
    }

    /// Next gate downstream on the target operand's wire.
    #[inline]
    pub fn target_child(&self) -> Option<GateId> {
        self.target_child
    }

    /// Next gate downstream on the control operand's wire.
    #[inline]
    pub fn control_child(&self) -> Option<GateId> {
        self.control_child
    }

    /// Next gate downstream on `qubit`'s wire, whichever operand it is.
    pub fn child_on(&self, qubit: LogicalQubit) -> Option<GateId> {
        if self.target == qubit {
            self.target_child
        } else if self.control == Some(qubit) {
            self.control_child
        } else {
            None
        }
    }

    /// For a one-qubit gate, the next two-qubit gate downstream on its wire.
    #[inline]
    pub fn next_target_two_qubit(&self) -> Option<GateId> {
        self.next_target_two_qubit
    }

    /// Length of the longest downstream dependency path, in gates.
    ///
    /// Sinks have criticality 0. Used to rank gates competing for routing
    /// attention.
    #[inline]
    pub fn criticality(&self) -> u32 {
        self.criticality
    }
}

/// Dependency DAG over the gates of a logical program.
///
/// Construction is incremental: [`add_one_qubit_gate`](Self::add_one_qubit_gate)
/// and [`add_two_qubit_gate`](Self::add_two_qubit_gate) append gates in
/// program order, wiring one dependency edge per operand from the previous
/// gate on that qubit. A per-qubit wire front keeps each insertion O(1).
///
/// After the full program has been added, [`finalize`](Self::finalize)
/// computes the derived metadata (criticality and next-two-qubit links)
/// that the router's frontier analysis consumes.
#[derive(Debug, Clone, Default)]
pub struct GateDag {
    graph: DiGraph<GateNode, (), u32>,
    /// Gates touching each logical qubit, in program order.
    wires: Vec<Vec<GateId>>,
}

impl GateDag {
    /// Create an empty DAG over a program with `num_qubits` logical qubits.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            graph: DiGraph::default(),
            wires: vec![vec![]; num_qubits as usize],
        }
    }

    /// Number of logical qubits declared for the program.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.wires.len() as u32
    }

    /// Number of gates.
    #[inline]
    pub fn num_gates(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if any gate touches `qubit`.
    #[inline]
    pub fn is_qubit_used(&self, qubit: LogicalQubit) -> bool {
        self.wires
            .get(qubit.index())
            .is_some_and(|wire| !wire.is_empty())
    }

    /// Append a one-qubit gate.
    pub fn add_one_qubit_gate(
        &mut self,
        name: impl Into<String>,
        target: LogicalQubit,
    ) -> IrResult<GateId> {
        self.add_gate(name.into(), target, None)
    }

    /// Append a two-qubit gate.
    pub fn add_two_qubit_gate(
        &mut self,
        name: impl Into<String>,
        target: LogicalQubit,
        control: LogicalQubit,
    ) -> IrResult<GateId> {
        self.add_gate(name.into(), target, Some(control))
    }

    fn add_gate(
        &mut self,
        name: String,
        target: LogicalQubit,
        control: Option<LogicalQubit>,
    ) -> IrResult<GateId> {
        let num_qubits = self.num_qubits();
        for qubit in [Some(target), control].into_iter().flatten() {
            if qubit.index() >= self.wires.len() {
                return Err(IrError::QubitOutOfRange {
                    qubit,
                    num_qubits,
                    gate_name: name.clone(),
                });
            }
        }
        if control == Some(target) {
            return Err(IrError::DuplicateQubit {
                qubit: target,
                gate_name: name,
            });
        }

        let id = self.graph.add_node(GateNode {
            name,
            target,
            control,
            target_child: None,
            control_child: None,
            next_target_two_qubit: None,
            criticality: 0,
        });

        for qubit in [Some(target), control].into_iter().flatten() {
            if let Some(&prev) = self.wires[qubit.index()].last() {
                self.graph.add_edge(prev, id, ());
                let prev_gate = &mut self.graph[prev];
                if prev_gate.target == qubit {
                    prev_gate.target_child = Some(id);
                } else {
                    prev_gate.control_child = Some(id);
                }
            }
            self.wires[qubit.index()].push(id);
        }

        Ok(id)
    }

    /// Get a gate by id.
    #[inline]
    pub fn gate(&self, id: GateId) -> &GateNode {
        &self.graph[id]
    }

    /// Iterate over all gates.
    pub fn gates(&self) -> impl Iterator<Item = (GateId, &GateNode)> {
        self.graph.node_indices().map(|id| (id, &self.graph[id]))
    }

    /// Direct predecessors of a gate, one per dependency edge.
    pub fn parents(&self, id: GateId) -> impl Iterator<Item = GateId> + '_ {
        self.graph.neighbors_directed(id, Direction::Incoming)
    }

    /// Direct successors of a gate, one per dependency edge.
    pub fn children(&self, id: GateId) -> impl Iterator<Item = GateId> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    /// Number of dependency edges into a gate.
    ///
    /// Counted per edge, so a gate whose operands both follow the same
    /// predecessor needs two credits before it becomes ready.
    pub fn num_parents(&self, id: GateId) -> usize {
        self.graph.edges_directed(id, Direction::Incoming).count()
    }

    /// Gates with no predecessors: the ready set of an empty schedule.
    pub fn sources(&self) -> impl Iterator<Item = GateId> + '_ {
        self.graph
            .node_indices()
            .filter(|&id| self.num_parents(id) == 0)
    }

    /// Gates in a topological order.
    pub fn topological_order(&self) -> Vec<GateId> {
        petgraph::algo::toposort(&self.graph, None)
            .expect("gate DAG must be acyclic — wires only link forward in program order")
    }

    /// Recompute the derived routing metadata: criticality and, for each
    /// one-qubit gate, the next two-qubit gate downstream on its wire.
    ///
    /// Idempotent; call once the full program has been added.
    pub fn finalize(&mut self) {
        let order = self.topological_order();
        for &id in order.iter().rev() {
            let criticality = self
                .graph
                .neighbors_directed(id, Direction::Outgoing)
                .map(|child| self.graph[child].criticality + 1)
                .max()
                .unwrap_or(0);
            self.graph[id].criticality = criticality;
        }

        for wire in &self.wires {
            let mut latest_two_qubit = None;
            for &id in wire.iter().rev() {
                let gate = &mut self.graph[id];
                if gate.control.is_none() {
                    gate.next_target_two_qubit = latest_two_qubit;
                } else {
                    latest_two_qubit = Some(id);
                }
            }
        }
    }
}
