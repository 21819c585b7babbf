//! Error types for QShard core

use thiserror::Error;

/// Errors raised while validating qubit addresses, matrices and channels
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuantumError {
    /// Invalid program qubit index
    #[error("Invalid qubit index {index}: register has only {num_qubits} qubits")]
    InvalidQubit { index: usize, num_qubits: usize },

    /// Invalid data position
    #[error("Invalid data position {position}: register has only {num_qubits} positions")]
    InvalidPosition { position: usize, num_qubits: usize },

    /// The same qubit was given twice to a multi-qubit operation
    #[error("Duplicate qubit {0} in operation")]
    DuplicateQubit(usize),

    /// A gate matrix failed the U†U = I check
    #[error("Matrix is not unitary: deviation {deviation:.3e} exceeds tolerance {tolerance:.3e}")]
    NonUnitary { deviation: f64, tolerance: f64 },

    /// A Kraus set failed the Σ K†K = I check
    #[error("Kraus set is not trace preserving: deviation {deviation:.3e} exceeds tolerance {tolerance:.3e}")]
    NotTracePreserving { deviation: f64, tolerance: f64 },

    /// An operator was addressed to the wrong number of qubits
    #[error("Operation acts on {expected} qubits, but {actual} were provided")]
    ArityMismatch { expected: usize, actual: usize },

    /// A Kraus set without operators
    #[error("Kraus set must contain at least one operator")]
    EmptyKrausSet,

    /// Kraus operators of different sizes in one set
    #[error("Kraus operators in one set must all act on the same number of qubits")]
    MixedKrausArity,

    /// The qubit permutation is no longer a bijection
    #[error("Qubit permutation is not a bijection: {0}")]
    BrokenPermutation(String),

    /// Too many qubits for the index type
    #[error("Register of {num_qubits} qubits exceeds the supported maximum of {max}")]
    TooManyQubits { num_qubits: usize, max: usize },

    /// Generic parameter validation error
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl QuantumError {
    /// Create an invalid qubit error
    pub fn invalid_qubit(index: usize, num_qubits: usize) -> Self {
        Self::InvalidQubit { index, num_qubits }
    }

    /// True for errors that mean internal state is already corrupted
    pub fn is_consistency_violation(&self) -> bool {
        matches!(self, Self::BrokenPermutation(_))
    }
}
