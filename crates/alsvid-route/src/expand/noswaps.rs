//! Mapping-only expander.

use std::rc::Rc;

use crate::env::Environment;
use crate::error::RouteResult;
use crate::expand::analysis::{AnalysisOptions, analyze, build_child, skip_empty_subset};
use crate::expand::Expander;
use crate::node::Node;
use crate::queue::Queue;

/// Explores initial mappings; once execution begins no SWAP is ever
/// inserted, so only circuits routable under some fixed layout complete.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSwaps;

impl Expander for NoSwaps {
    fn name(&self) -> &str {
        "no-swaps"
    }

    fn description(&self) -> &str {
        "Try initial mappings only; never insert a SWAP during execution"
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
                allow_swaps: node.is_mapping(),
                forbid_swap_undo: false,
            },
        )?;

        let subsets = 1u64 << frontier.candidates.len();
        for subset in 0..subsets {
            if subset == 0 && skip_empty_subset(node, &frontier) {
                continue;
            }
            if let Some(child) = build_child(env, node, &frontier, subset)? {
                queue.push(env, child);
            }
        }

        Ok(true)
    }
}
