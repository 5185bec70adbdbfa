//! Error types for the routing crate.

use alsvid_ir::{LogicalQubit, PhysicalQubit};
use thiserror::Error;

/// Errors that can occur while configuring or running a search.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RouteError {
    /// No latency entry matches a gate.
    #[error(
        "no latency entry for gate '{name}' ({num_qubits} qubits, target {target:?}, control {control:?})"
    )]
    MissingLatency {
        /// Gate name queried.
        name: String,
        /// Operand count queried.
        num_qubits: u32,
        /// Physical target, if the query was physical.
        target: Option<PhysicalQubit>,
        /// Physical control, if the query was physical.
        control: Option<PhysicalQubit>,
    },

    /// Malformed latency table text.
    #[error("latency table line {line}: {message}")]
    LatencyParse {
        /// Line the offending token starts on.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// A gate's logical qubit has no physical position.
    #[error("logical qubit {0} is not mapped to any physical qubit")]
    UnmappedQubit(LogicalQubit),

    /// A layout entry names a logical qubit outside the program.
    #[error("logical qubit {qubit} out of range for a program with {num_qubits} qubits")]
    LogicalOutOfRange {
        /// The offending qubit.
        qubit: LogicalQubit,
        /// Number of logical qubits in the program.
        num_qubits: u32,
    },

    /// A layout entry names a physical qubit outside the device.
    #[error("physical qubit {qubit} out of range for a device with {num_qubits} qubits")]
    PhysicalOutOfRange {
        /// The offending qubit.
        qubit: PhysicalQubit,
        /// Number of physical qubits on the device.
        num_qubits: u32,
    },

    /// Two layout entries claim the same physical qubit.
    #[error("physical qubit {0} assigned twice in the initial layout")]
    LayoutConflict(PhysicalQubit),

    /// A required pair of physical qubits has no coupling path.
    #[error("no coupling path between {0} and {1}")]
    Disconnected(PhysicalQubit, PhysicalQubit),
}

/// Result type for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;
