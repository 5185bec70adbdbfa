//! Error types for the IR crate.

use crate::qubit::LogicalQubit;
use thiserror::Error;

/// Errors that can occur while building a gate DAG.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Gate operand outside the program's qubit range.
    #[error("qubit {qubit} out of range for a program with {num_qubits} qubits (gate: {gate_name})")]
    QubitOutOfRange {
        /// The offending operand.
        qubit: LogicalQubit,
        /// Number of qubits declared for the program.
        num_qubits: u32,
        /// Name of the gate being added.
        gate_name: String,
    },

    /// The same qubit used as both operands of a two-qubit gate.
    #[error("duplicate qubit {qubit} in gate '{gate_name}'")]
    DuplicateQubit {
        /// The duplicated operand.
        qubit: LogicalQubit,
        /// Name of the gate being added.
        gate_name: String,
    },
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
