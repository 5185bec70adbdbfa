//! Node cost strategies.

use alsvid_ir::PhysicalQubit;

use crate::env::Environment;
use crate::error::{RouteError, RouteResult};
use crate::filter::Hook;
use crate::node::Node;

/// Scores a node; lower is better. The driver and the expanders prune
/// against the best complete schedule found so far, which relies on the
/// cost never decreasing from parent to child while gates execute.
pub trait CostFunc: Send + Sync {
    /// Cost with the `BeforeCost` node modifiers applied first.
    fn cost(&self, env: &Environment, node: &mut Node) -> RouteResult<u32> {
        env.run_node_modifiers(node, Hook::BeforeCost);
        self.raw_cost(env, node)
    }

    /// The cost itself, without hooks.
    fn raw_cost(&self, env: &Environment, node: &Node) -> RouteResult<u32>;
}

/// Lower bound on the schedule's final length in cycles.
///
/// Takes the later of the busy horizon (the latest finish among scheduled
/// gates) and, per ready gate, its earliest feasible start plus the SWAP
/// work its operands still need, its best-case latency, and the best-case
/// cycles of its dependency cone. Terminal nodes therefore score their
/// exact makespan.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleCost;

impl CostFunc for CycleCost {
    #[allow(clippy::cast_sign_loss)]
    fn raw_cost(&self, env: &Environment, node: &Node) -> RouteResult<u32> {
        let mut cost = node.cycle().max(0);
        for qubit in 0..env.num_physical_qubits() {
            if let Some(gate) = node.last_gate(PhysicalQubit(qubit)) {
                cost = cost.max(gate.end_cycle());
            }
        }

        for gate in node.ready_gates() {
            let g = env.dag().gate(gate);
            let target = node
                .position_of(g.target())
                .ok_or(RouteError::UnmappedQubit(g.target()))?;

            // Children schedule one cycle after this node at the earliest.
            let mut start = node.cycle() + 1;
            if let Some(last) = node.last_gate(target) {
                start = start.max(last.end_cycle());
            }

            let mut estimate = start;
            if let Some(c) = g.control() {
                let control = node.position_of(c).ok_or(RouteError::UnmappedQubit(c))?;
                if let Some(last) = node.last_gate(control) {
                    estimate = estimate.max(last.end_cycle());
                }
                let dist = env
                    .coupling()
                    .distance(control, target)
                    .ok_or(RouteError::Disconnected(control, target))?;
                // Both endpoints can walk toward each other, so at least
                // dist/2 sequential SWAPs must finish before the gate.
                estimate += ((dist / 2) * env.swap_cycles()) as i32;
            }
            estimate += (env.optimistic_latency(gate) + env.downstream_cycles(gate)) as i32;
            cost = cost.max(estimate);
        }

        Ok(cost as u32)
    }
}
