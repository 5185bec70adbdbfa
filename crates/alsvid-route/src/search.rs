//! Best-first search driver.

use std::rc::Rc;

use tracing::{debug, info, instrument};

use crate::env::Environment;
use crate::error::RouteResult;
use crate::expand::Expander;
use crate::node::Node;
use crate::queue::{Queue, QueueStats};

/// Drives the search: pop the cheapest node, expand it, repeat until the
/// queue empties or the expansion budget runs out.
pub struct Router {
    expander: Box<dyn Expander>,
    queue: Box<dyn Queue>,
    max_expansions: Option<u64>,
    expansions: u64,
}

impl Router {
    /// Create a driver over the given strategies.
    pub fn new(expander: Box<dyn Expander>, queue: Box<dyn Queue>) -> Self {
        Self {
            expander,
            queue,
            max_expansions: None,
            expansions: 0,
        }
    }

    /// Bound the number of expansions; when exhausted, the best complete
    /// schedule found so far is returned.
    #[must_use]
    pub fn with_expansion_limit(mut self, limit: u64) -> Self {
        self.max_expansions = Some(limit);
        self
    }

    /// Expansions performed by the last run.
    pub fn expansions(&self) -> u64 {
        self.expansions
    }

    /// Queue counters from the last run.
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Search from `root`. Returns the cheapest complete schedule found,
    /// or `None` when the search space is exhausted without one.
    #[instrument(skip_all, fields(expander = self.expander.name()))]
    pub fn run(&mut self, env: &Environment, mut root: Node) -> RouteResult<Option<Rc<Node>>> {
        root.cost = env.evaluate(&mut root)?;
        self.queue.push(env, root);
        self.expansions = 0;

        while let Some(node) = self.queue.pop() {
            if node.dead.get() || node.expanded.get() {
                continue;
            }
            node.expanded.set(true);

            if node.is_terminal() {
                debug!(cost = node.cost, "complete schedule found");
                self.queue.record_final(node);
                continue;
            }
            if let Some(best) = self.queue.best_final() {
                if node.cost >= best.cost {
                    continue;
                }
            }

            self.expander.expand(env, self.queue.as_mut(), &node)?;
            self.expansions += 1;
            if self.max_expansions.is_some_and(|limit| self.expansions >= limit) {
                debug!(limit = self.max_expansions, "expansion budget exhausted");
                break;
            }
        }

        let stats = self.queue.stats();
        info!(
            expansions = self.expansions,
            pushed = stats.pushed,
            filtered = stats.filtered,
            popped = stats.popped,
            best_cost = self.queue.best_final().map(|n| n.cost),
            "search finished"
        );
        Ok(self.queue.best_final().cloned())
    }
}
