//! Shared read-only search context.

use alsvid_ir::{GateDag, GateId, PhysicalQubit};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::coupling::CouplingMap;
use crate::cost::CostFunc;
use crate::error::RouteResult;
use crate::filter::{Filter, Hook, NodeModifier};
use crate::latency::Latency;
use crate::node::{Node, SWAP_GATE};

/// Everything a search shares across all of its nodes: the program DAG,
/// the device, the installed strategies, and tables precomputed from them.
///
/// Built once before the search and read-only while it runs.
pub struct Environment {
    dag: GateDag,
    coupling: CouplingMap,
    latency: Box<dyn Latency>,
    cost: Box<dyn CostFunc>,
    filters: Vec<Box<dyn Filter>>,
    modifiers: Vec<Box<dyn NodeModifier>>,
    /// SWAP candidates, one per coupled pair, in coupling-edge order.
    possible_swaps: Vec<(PhysicalQubit, PhysicalQubit)>,
    /// Best-case latency per gate, indexed by gate id.
    optimistic_latency: Vec<u32>,
    /// Best-case cycles from each gate's completion to the end of its
    /// dependency cone, indexed by gate id.
    downstream_cycles: Vec<u32>,
    /// Best-case SWAP latency.
    swap_cycles: u32,
}

impl Environment {
    /// Assemble the search context.
    ///
    /// Finalizes the DAG's routing metadata and resolves the optimistic
    /// latency of every gate (and of SWAPs), so a latency table missing an
    /// entry fails here rather than mid-search.
    pub fn new(
        mut dag: GateDag,
        coupling: CouplingMap,
        latency: Box<dyn Latency>,
        cost: Box<dyn CostFunc>,
    ) -> RouteResult<Self> {
        dag.finalize();

        let mut seen = FxHashSet::default();
        let mut possible_swaps = vec![];
        for &(a, b) in coupling.edges() {
            let pair = (a.0.min(b.0), a.0.max(b.0));
            if seen.insert(pair) {
                possible_swaps.push((a, b));
            }
        }

        let swap_cycles = latency.latency(SWAP_GATE, 2, None, None)?;

        let num_gates = dag.num_gates();
        let mut optimistic_latency = vec![0u32; num_gates];
        for (id, gate) in dag.gates() {
            optimistic_latency[id.index()] =
                latency.latency(gate.name(), gate.num_qubits(), None, None)?;
        }

        let mut downstream_cycles = vec![0u32; num_gates];
        for &id in dag.topological_order().iter().rev() {
            downstream_cycles[id.index()] = dag
                .children(id)
                .map(|child| downstream_cycles[child.index()] + optimistic_latency[child.index()])
                .max()
                .unwrap_or(0);
        }

        debug!(
            gates = num_gates,
            physical_qubits = coupling.num_qubits(),
            swaps = possible_swaps.len(),
            "environment built"
        );

        Ok(Self {
            dag,
            coupling,
            latency,
            cost,
            filters: vec![],
            modifiers: vec![],
            possible_swaps,
            optimistic_latency,
            downstream_cycles,
            swap_cycles,
        })
    }

    /// Register a filter, consulted on every queue push.
    #[must_use]
    pub fn with_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Register a node modifier, run at its hook in registration order.
    #[must_use]
    pub fn with_modifier(mut self, modifier: Box<dyn NodeModifier>) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// The program's dependency DAG.
    #[inline]
    pub fn dag(&self) -> &GateDag {
        &self.dag
    }

    /// The device connectivity.
    #[inline]
    pub fn coupling(&self) -> &CouplingMap {
        &self.coupling
    }

    /// The installed latency strategy.
    #[inline]
    pub fn latency(&self) -> &dyn Latency {
        self.latency.as_ref()
    }

    /// Number of physical qubits on the device.
    #[inline]
    pub fn num_physical_qubits(&self) -> u32 {
        self.coupling.num_qubits()
    }

    /// SWAP candidates, one per coupled pair, in coupling-edge order.
    #[inline]
    pub fn possible_swaps(&self) -> &[(PhysicalQubit, PhysicalQubit)] {
        &self.possible_swaps
    }

    /// Best-case latency of a gate over all physical placements.
    #[inline]
    pub fn optimistic_latency(&self, gate: GateId) -> u32 {
        self.optimistic_latency[gate.index()]
    }

    /// Best-case cycles between a gate finishing and its dependency cone
    /// finishing.
    #[inline]
    pub fn downstream_cycles(&self, gate: GateId) -> u32 {
        self.downstream_cycles[gate.index()]
    }

    /// Best-case SWAP latency.
    #[inline]
    pub fn swap_cycles(&self) -> u32 {
        self.swap_cycles
    }

    /// True if any registered filter rejects the node.
    pub fn filter(&self, node: &Node) -> bool {
        self.filters.iter().any(|f| f.rejects(self, node))
    }

    /// Run the modifiers registered for a hook, in registration order.
    pub fn run_node_modifiers(&self, node: &mut Node, hook: Hook) {
        for modifier in &self.modifiers {
            if modifier.hook() == hook {
                modifier.modify(self, node);
            }
        }
    }

    /// Evaluate a node with the installed cost strategy (modifiers first).
    pub fn evaluate(&self, node: &mut Node) -> RouteResult<u32> {
        self.cost.cost(self, node)
    }
}
