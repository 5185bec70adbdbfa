//! Alsvid gate-dependency IR.
//!
//! This crate provides the input representation for the Alsvid scheduler
//! and router: a DAG of gates over logical qubits, where an edge means
//! "must run after". It carries the precomputed metadata the router's
//! frontier analysis needs — per-wire successor links, each one-qubit
//! gate's next downstream two-qubit gate, and criticality (longest
//! downstream path).
//!
//! # Example
//!
//! ```
//! use alsvid_ir::{GateDag, LogicalQubit};
//!
//! let mut dag = GateDag::new(3);
//! dag.add_one_qubit_gate("h", LogicalQubit(0)).unwrap();
//! dag.add_two_qubit_gate("cx", LogicalQubit(0), LogicalQubit(1)).unwrap();
//! dag.add_two_qubit_gate("cx", LogicalQubit(1), LogicalQubit(2)).unwrap();
//! dag.finalize();
//!
//! assert_eq!(dag.num_gates(), 3);
//! // The H gate heads the longest dependency chain.
//! let h = dag.sources().next().unwrap();
//! assert_eq!(dag.gate(h).criticality(), 2);
//! ```

pub mod dag;
pub mod error;
pub mod qubit;

pub use dag::{GateDag, GateId, GateNode};
pub use error::{IrError, IrResult};
pub use qubit::{LogicalQubit, PhysicalQubit};
