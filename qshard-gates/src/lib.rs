//! Standard gate matrices for QShard
//!
//! The engine applies arbitrary 2×2 and 4×4 unitaries; this crate supplies the
//! usual ones so drivers and tests don't have to spell them out. Two-qubit
//! matrices follow the engine's operand order: the first operand (control) is
//! the most significant bit of the 4×4 basis index.
//!
//! # Example
//!
//! ```
//! use qshard_gates::matrices::{self, CNOT, HADAMARD};
//! use qshard_core::matrix::unitarity_deviation;
//! use std::f64::consts::PI;
//!
//! assert!(unitarity_deviation(&HADAMARD) < 1e-12);
//! assert!(unitarity_deviation(&CNOT) < 1e-12);
//!
//! let rx = matrices::rx(PI / 2.0);
//! assert!(unitarity_deviation(&rx) < 1e-12);
//! ```

pub mod matrices;

pub use matrices::*;
