//! Alsvid routing and scheduling engine.
//!
//! Takes a logical gate DAG ([`alsvid_ir::GateDag`]) plus a hardware
//! description — a [`CouplingMap`] and a [`Latency`] strategy — and runs a
//! best-first search for a short physical schedule, inserting SWAP gates
//! wherever connectivity requires them.
//!
//! # Architecture
//!
//! ```text
//! GateDag + CouplingMap + Latency
//!        │
//!        ▼
//! ┌─────────────┐
//! │ Environment │ ◄── CostFunc, Filters, NodeModifiers
//! └─────────────┘
//!        │
//!        ▼
//!     Router ── pop ──► Expander ── children ──► Queue
//!        │
//!        ▼
//! winning Node (its stack, read bottom-up, is the schedule)
//! ```
//!
//! Every strategy surface — [`Expander`], [`Queue`], [`CostFunc`],
//! [`Latency`], [`Filter`], [`NodeModifier`] — is a trait object chosen at
//! startup, so drivers can mix and match without touching the engine.
//!
//! # Example
//!
//! ```
//! use alsvid_ir::{GateDag, LogicalQubit};
//! use alsvid_route::{
//!     CostQueue, CouplingMap, CycleCost, Environment, GreedyTopK, Node, Router, UniformLatency,
//! };
//!
//! let mut dag = GateDag::new(2);
//! dag.add_one_qubit_gate("h", LogicalQubit(0)).unwrap();
//! dag.add_two_qubit_gate("cx", LogicalQubit(0), LogicalQubit(1)).unwrap();
//!
//! let env = Environment::new(
//!     dag,
//!     CouplingMap::linear(2),
//!     Box::new(UniformLatency::default()),
//!     Box::new(CycleCost),
//! )
//! .unwrap();
//!
//! let root = Node::trivial_root(&env, 0).unwrap();
//! let mut router = Router::new(Box::new(GreedyTopK::new(8)), Box::new(CostQueue::new()));
//! let best = router.run(&env, root).unwrap().expect("routable circuit");
//!
//! assert_eq!(best.schedule().len(), 2);
//! assert_eq!(best.cost, 3);
//! ```

pub mod coupling;
pub mod cost;
pub mod env;
pub mod error;
pub mod expand;
pub mod filter;
pub mod latency;
pub mod node;
pub mod queue;
pub mod search;
pub mod stack;

pub use coupling::CouplingMap;
pub use cost::{CostFunc, CycleCost};
pub use env::Environment;
pub use error::{RouteError, RouteResult};
pub use expand::{DefaultExpander, Expander, GreedyTopK, NoSwaps};
pub use filter::{CostCeiling, Filter, Hook, NodeModifier, ProgressTiebreak};
pub use latency::{Latency, LatencyTable, UniformLatency};
pub use node::{Node, Phase, RoutedOp, SWAP_GATE, ScheduledGate};
pub use queue::{CostQueue, Queue, QueueStats};
pub use search::Router;
pub use stack::SharedStack;
