//! Error types for the engine

use qshard_core::QuantumError;
use qshard_state::StateError;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SimulatorError>;

/// Coarse classification of a [`SimulatorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad team layout or engine settings, reported at construction
    Configuration,
    /// The caller asked for something invalid; no state was changed
    Precondition,
    /// Workers disagree or an internal invariant broke; the register is suspect
    Consistency,
    /// A peer vanished or a worker died
    Communication,
}

/// Errors that can occur while running a register or a pool
#[derive(Debug, Clone, Error)]
pub enum SimulatorError {
    /// Invalid engine or pool configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Team layout that cannot hold the register
    #[error("Invalid team of {workers} workers for {num_qubits} qubits: {reason}")]
    InvalidTeam {
        workers: usize,
        num_qubits: usize,
        reason: String,
    },

    /// Qubit, matrix or channel validation failed
    #[error(transparent)]
    Quantum(#[from] QuantumError),

    /// Amplitude store operation failed
    #[error(transparent)]
    State(#[from] StateError),

    /// Operation not allowed in the current context
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Kraus branch probabilities do not sum to one
    #[error("Channel probabilities sum to {total:.12}, outside 1 ± {tolerance:.1e}")]
    ProbabilityOutOfRange { total: f64, tolerance: f64 },

    /// Workers of one team drew different "shared" random values
    #[error("Shared random draw diverged across the team (worker {rank} drew {value:e})")]
    SharedDrawDiverged { rank: usize, value: f64 },

    /// A message arrived with an unexpected tag
    #[error("Message from worker {peer} tagged {actual}, expected {expected}")]
    TagMismatch {
        peer: usize,
        expected: &'static str,
        actual: &'static str,
    },

    /// A message arrived with an unexpected payload size
    #[error("Message from worker {peer} carried {actual} values, expected {expected}")]
    LengthMismatch {
        peer: usize,
        expected: usize,
        actual: usize,
    },

    /// The channel to a peer is closed
    #[error("Worker {peer} disconnected")]
    Disconnected { peer: usize },

    /// A worker thread panicked
    #[error("Worker {rank} panicked")]
    WorkerPanicked { rank: usize },
}

impl SimulatorError {
    /// Which class of failure this is
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimulatorError::InvalidConfig(_) | SimulatorError::InvalidTeam { .. } => {
                ErrorKind::Configuration
            }
            SimulatorError::Quantum(err) if err.is_consistency_violation() => {
                ErrorKind::Consistency
            }
            SimulatorError::Quantum(QuantumError::TooManyQubits { .. }) => {
                ErrorKind::Configuration
            }
            SimulatorError::Quantum(_) | SimulatorError::Precondition(_) => {
                ErrorKind::Precondition
            }
            SimulatorError::State(StateError::NonFiniteNorm { .. }) => ErrorKind::Consistency,
            SimulatorError::State(_) => ErrorKind::Precondition,
            SimulatorError::ProbabilityOutOfRange { .. }
            | SimulatorError::SharedDrawDiverged { .. }
            | SimulatorError::TagMismatch { .. }
            | SimulatorError::LengthMismatch { .. } => ErrorKind::Consistency,
            SimulatorError::Disconnected { .. } | SimulatorError::WorkerPanicked { .. } => {
                ErrorKind::Communication
            }
        }
    }

    pub(crate) fn team(workers: usize, num_qubits: usize, reason: impl Into<String>) -> Self {
        SimulatorError::InvalidTeam {
            workers,
            num_qubits,
            reason: reason.into(),
        }
    }
}
