//! Pluggable node predicates and mutators.

use crate::env::Environment;
use crate::node::Node;

/// Points in a node's life where registered modifiers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Hook {
    /// Immediately before the cost strategy evaluates a node.
    BeforeCost,
}

/// A rejection predicate consulted on every queue push.
///
/// Filters compose by OR: any filter returning true discards the node.
/// Implementations must not retain references to the node.
pub trait Filter: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &str;

    /// Return true to reject the node.
    fn rejects(&self, env: &Environment, node: &Node) -> bool;
}

/// A side-effecting hook run on nodes at defined points.
///
/// Modifiers may adjust bookkeeping fields such as `cost2` but must not
/// touch the qubit maps, and must not retain references to the node.
pub trait NodeModifier: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &str;

    /// The hook this modifier runs at.
    fn hook(&self) -> Hook;

    /// Apply the modification.
    fn modify(&self, env: &Environment, node: &mut Node);
}

/// Rejects nodes whose cost exceeds a fixed bound.
#[derive(Debug, Clone, Copy)]
pub struct CostCeiling {
    max_cost: u32,
}

impl CostCeiling {
    /// Reject nodes costing more than `max_cost` cycles.
    pub fn new(max_cost: u32) -> Self {
        Self { max_cost }
    }
}

impl Filter for CostCeiling {
    fn name(&self) -> &str {
        "cost-ceiling"
    }

    fn rejects(&self, _env: &Environment, node: &Node) -> bool {
        node.cost > self.max_cost
    }
}

/// Breaks cost ties toward the node with less work remaining, so the
/// search reaches a first complete schedule sooner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTiebreak;

impl NodeModifier for ProgressTiebreak {
    fn name(&self) -> &str {
        "progress-tiebreak"
    }

    fn hook(&self) -> Hook {
        Hook::BeforeCost
    }

    fn modify(&self, _env: &Environment, node: &mut Node) {
        node.cost2 = node.num_unscheduled();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::CouplingMap;
    use crate::cost::CycleCost;
    use crate::latency::UniformLatency;
    use alsvid_ir::{GateDag, LogicalQubit};

    fn small_env() -> Environment {
        let mut dag = GateDag::new(2);
        dag.add_two_qubit_gate("cx", LogicalQubit(0), LogicalQubit(1))
            .unwrap();
        Environment::new(
            dag,
            CouplingMap::linear(2),
            Box::new(UniformLatency::default()),
            Box::new(CycleCost),
        )
        .unwrap()
    }

    #[test]
    fn test_cost_ceiling() {
        let env = small_env();
        let ceiling = CostCeiling::new(5);
        let mut node = Node::trivial_root(&env, 0).unwrap();
        node.cost = 5;
        assert!(!ceiling.rejects(&env, &node));
        node.cost = 6;
        assert!(ceiling.rejects(&env, &node));
    }

    #[test]
    fn test_progress_tiebreak_runs_before_cost() {
        let env = small_env().with_modifier(Box::new(ProgressTiebreak));
        let mut node = Node::trivial_root(&env, 0).unwrap();
        env.evaluate(&mut node).unwrap();
        assert_eq!(node.cost2, 1);
    }

    #[test]
    fn test_filters_compose_by_or() {
        let env = small_env()
            .with_filter(Box::new(CostCeiling::new(100)))
            .with_filter(Box::new(CostCeiling::new(3)));
        let mut node = Node::trivial_root(&env, 0).unwrap();
        node.cost = 10;
        assert!(env.filter(&node));
        node.cost = 2;
        assert!(!env.filter(&node));
    }
}
