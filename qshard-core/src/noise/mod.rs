//! Kraus channels
//!
//! A noisy operation is described by Kraus operators {K_i} with
//! Σ K_i† K_i = I. The engine applies a channel stochastically: branch `i` is
//! chosen with probability ⟨ψ|K_i†K_i|ψ⟩, then K_i is applied and the state
//! renormalized.
//!
//! Built-in channels:
//! - **Depolarizing** (one and two qubits): random Pauli errors
//! - **Amplitude damping**: energy relaxation (T1)
//! - **Phase damping**: dephasing (T2)
//! - **Bit flip / phase flip**: single Pauli mixtures
//!
//! # Usage
//!
//! ```
//! use qshard_core::noise::{AmplitudeDamping, NoiseChannel};
//!
//! let damping = AmplitudeDamping::from_t1(50.0, 0.1).unwrap();
//! let set = damping.kraus_set().unwrap();
//! assert_eq!(set.num_qubits(), 1);
//! ```

pub mod channels;
pub mod types;

pub use channels::{
    AmplitudeDamping, BitFlip, DepolarizingChannel, PhaseDamping, PhaseFlip,
    TwoQubitDepolarizing,
};
pub use types::{KrausMatrix, KrausOperator, KrausSet, NoiseChannel};
