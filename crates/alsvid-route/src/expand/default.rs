//! Exhaustive expander.

use std::rc::Rc;

use crate::env::Environment;
use crate::error::RouteResult;
use crate::expand::analysis::{AnalysisOptions, analyze, build_child, skip_empty_subset};
use crate::expand::Expander;
use crate::node::Node;
use crate::queue::Queue;

/// Pushes every viable child. Candidate SWAPs that would immediately
/// reverse the previous generation's SWAP are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExpander;

impl Expander for DefaultExpander {
    fn name(&self) -> &str {
        "default"
    }

    fn description(&self) -> &str {
        "Push every viable child; never immediately reverse a SWAP"
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
                forbid_swap_undo: true,
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
