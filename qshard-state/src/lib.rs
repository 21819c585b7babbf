//! Per-worker amplitude storage and local kernels for QShard
//!
//! A distributed register splits its `2^N` amplitudes into equal contiguous
//! slices, one per worker. This crate holds one such slice
//! ([`AmplitudeStore`]) and the in-place kernels that update it:
//!
//! - 1- and 2-qubit matrix application on local data positions
//! - diagonal and pure-swap fast paths
//! - partner combinations used once the peer's slice has been received
//! - norms, bit probabilities and reduced density matrices
//!
//! Kernels switch to rayon once a slice reaches the configured parallel
//! threshold. Nothing here communicates; the engine crate decides which
//! kernel runs and with which partner data.
//!
//! # Example
//!
//! ```
//! use qshard_state::{kernels, AmplitudeStore};
//! use qshard_gates::HADAMARD;
//!
//! let mut store = AmplitudeStore::basis(3, 0).unwrap();
//! kernels::apply_single_qubit(store.amplitudes_mut(), &HADAMARD, 2, 14);
//! assert!((store.norm_sqr(14) - 1.0).abs() < 1e-12);
//! ```

pub mod error;
pub mod kernels;
pub mod observable;
pub mod store;

pub use error::{Result, StateError};
pub use observable::{Pauli, PauliMasks, PauliTerm};
pub use store::AmplitudeStore;
