//! Qubit identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A qubit as named in the input program.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct LogicalQubit(pub u32);

/// A qubit position on the hardware.
///
/// The assignment of logical qubits to physical positions changes over time
/// as SWAP gates execute, so the two address spaces are kept as distinct
/// types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct PhysicalQubit(pub u32);

impl LogicalQubit {
    /// Index into per-logical-qubit tables.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl PhysicalQubit {
    /// Index into per-physical-qubit tables.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LogicalQubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

impl fmt::Display for PhysicalQubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(LogicalQubit(3).to_string(), "l3");
        assert_eq!(PhysicalQubit(0).to_string(), "p0");
    }

    #[test]
    fn test_serde_roundtrip() {
        let q = PhysicalQubit(7);
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(serde_json::from_str::<PhysicalQubit>(&json).unwrap(), q);
    }
}
