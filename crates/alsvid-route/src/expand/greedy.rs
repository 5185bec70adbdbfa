//! Top-K greedy expander.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use tracing::warn;

use crate::env::Environment;
use crate::error::RouteResult;
use crate::expand::analysis::{AnalysisOptions, analyze, build_child, skip_empty_subset};
use crate::expand::Expander;
use crate::node::Node;
use crate::queue::Queue;

/// Keeps only the K cheapest children per expansion and schedules ready
/// gates as soon as they fit. Fast; trades away optimality.
#[derive(Debug, Clone, Copy)]
pub struct GreedyTopK {
    k: usize,
}

impl GreedyTopK {
    /// Keep at most `k` children per expansion.
    pub fn new(k: usize) -> Self {
        assert!(k >= 1, "top-k expander needs k >= 1");
        Self { k }
    }
}

/// Max-heap entry: the worst child surfaces first so overfill can drop it.
struct WorstFirst(Node);

impl PartialEq for WorstFirst {
    fn eq(&self, other: &Self) -> bool {
        self.0.cost == other.0.cost && self.0.cost2 == other.0.cost2
    }
}

impl Eq for WorstFirst {}

impl Ord for WorstFirst {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .cost
            .cmp(&other.0.cost)
            .then_with(|| self.0.cost2.cmp(&other.0.cost2))
    }
}

impl PartialOrd for WorstFirst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Expander for GreedyTopK {
    fn name(&self) -> &str {
        "greedy-top-k"
    }

    fn description(&self) -> &str {
        "Keep only the K cheapest children and schedule ready gates as soon as they fit"
    }

    fn expand(&self, env: &Environment, queue: &mut dyn Queue, node: &Rc<Node>) -> RouteResult<bool> {
        if let Some(best) = queue.best_final() {
            if node.cost >= best.cost {
                return Ok(false);
            }
        }

        let frontier = analyze(
            env,
            node,
            &AnalysisOptions {
                allow_swaps: true,
                forbid_swap_undo: false,
            },
        )?;

        let mut kept: BinaryHeap<WorstFirst> = BinaryHeap::new();
        let subsets = 1u64 << frontier.candidates.len();
        for subset in 0..subsets {
            if subset == 0 && skip_empty_subset(node, &frontier) {
                continue;
            }
            if let Some(child) = build_child(env, node, &frontier, subset)? {
                kept.push(WorstFirst(child));
                if kept.len() > self.k {
                    kept.pop();
                }
            }
        }

        // Drain the survivors into the main queue. A slot lost to a filter
        // is not backfilled from the discarded children.
        while let Some(WorstFirst(child)) = kept.pop() {
            if !queue.push(env, child) {
                warn!("main queue filtered a kept child; top-k slot lost");
            }
        }

        Ok(true)
    }
}
