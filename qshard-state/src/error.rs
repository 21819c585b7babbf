//! Error types for amplitude store operations

use thiserror::Error;

/// Errors raised by the per-worker amplitude store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    /// Data position outside the local slice
    #[error("Data position {position} is not local to a {local_qubits}-bit slice")]
    PositionNotLocal { position: usize, local_qubits: usize },

    /// Store sizes disagree
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Basis index outside the local slice
    #[error("Basis index {index} out of range for a slice of {dimension} amplitudes")]
    IndexOutOfRange { index: usize, dimension: usize },

    /// Normalizing a vector whose norm is zero
    #[error("Cannot normalize a state with zero norm")]
    ZeroNorm,

    /// Unknown character in a Pauli string
    #[error("Invalid Pauli operator '{0}', expected one of I, X, Y, Z")]
    InvalidPauli(char),

    /// The norm is NaN or infinite
    #[error("State norm is not finite: {norm}")]
    NonFiniteNorm { norm: f64 },
}

/// Result type for amplitude store operations
pub type Result<T> = std::result::Result<T, StateError>;
