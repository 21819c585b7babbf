//! Distributed state-vector engine for QShard
//!
//! A register of `N` qubits is split across a team of `W = 2^k` workers.
//! Each worker holds `2^(N-k)` contiguous amplitudes; the top `k` bits of a
//! data index select the worker. Gates, Kraus channels, measurements and
//! Pauli expectation values run collectively over the team, exchanging only
//! the partner slices each operation needs.
//!
//! # Features
//!
//! - **Position-aware gate kernel**: local, one-worker-bit and two-worker-bit
//!   protocols, with diagonal and SWAP fast paths
//! - **Qubit relocation**: a program-qubit permutation lets gates on worker
//!   bits move an operand local instead of gathering four slices
//! - **Stochastic channels**: Kraus branches chosen with one team-wide draw,
//!   optionally verified across workers
//! - **Worker pool**: several independent teams in one launch, one thread
//!   per worker over crossbeam channels
//!
//! # Example
//!
//! ```
//! use qshard_gates::{CNOT, HADAMARD};
//! use qshard_sim::{launch, PoolConfig};
//!
//! // a Bell pair spread over 2 workers
//! let amplitudes = launch(PoolConfig::single_team(2, 2).with_seed(42), |ctx| {
//!     let reg = ctx.register();
//!     reg.apply_1q(0, &HADAMARD)?;
//!     reg.apply_2q(0, 1, &CNOT)?;
//!     reg.gather_amplitudes()
//! })
//! .unwrap();
//!
//! let h = std::f64::consts::FRAC_1_SQRT_2;
//! assert!((amplitudes[0][0].re - h).abs() < 1e-12);
//! assert!((amplitudes[1][3].re - h).abs() < 1e-12);
//! ```

pub mod channel;
pub mod comm;
pub mod config;
pub mod error;
pub mod exchange;
pub mod measure;
pub mod pool;
pub mod register;

pub use comm::{Communicator, Transport};
pub use config::{EngineConfig, LayoutPolicy, PoolConfig, TeamSpec};
pub use error::{ErrorKind, Result, SimulatorError};
pub use pool::{launch, WorkerContext};
pub use register::Register;

pub use qshard_core::{KrausOperator, KrausSet, NoiseChannel, StreamKind};
pub use qshard_state::{Pauli, PauliTerm};
