//! Core types for the QShard distributed state-vector simulator
//!
//! This crate holds the pieces of the engine that never touch amplitude data:
//! - [`QubitPermutation`]: bijection between program qubits and data positions
//! - [`KrausSet`] and the standard [`noise`] channels
//! - [`RandomStream`]: seeded generators with local / state-shared / pool-shared lifetimes
//! - [`matrix`]: fixed-size 2×2 and 4×4 complex matrix helpers and validation
//!
//! # Example
//! ```
//! use qshard_core::QubitPermutation;
//!
//! let mut perm = QubitPermutation::identity(4);
//! perm.swap(0, 3);
//! assert_eq!(perm.data_position_of(0), 3);
//! assert_eq!(perm.program_qubit_at(0), 3);
//! ```

pub mod error;
pub mod matrix;
pub mod noise;
pub mod permutation;
pub mod random;

pub use error::QuantumError;
pub use matrix::{Matrix2, Matrix4};
pub use noise::{KrausMatrix, KrausOperator, KrausSet, NoiseChannel};
pub use num_complex::Complex64;
pub use permutation::{QubitPermutation, MAX_QUBITS};
pub use random::{derive_seed, entropy_seed, RandomStream, StreamKind};

/// Type alias for results in QShard core
pub type Result<T> = std::result::Result<T, QuantumError>;
