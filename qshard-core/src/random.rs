//! Seeded random streams with explicit sharing scope
//!
//! Every stochastic decision in the engine draws from a [`RandomStream`].
//! The stream's [`StreamKind`] says which workers are expected to observe the
//! same sequence:
//!
//! - [`StreamKind::Local`]: private to one worker; the base seed is mixed with
//!   the worker's global rank so workers diverge.
//! - [`StreamKind::StateShared`]: identical on every worker of a team; the base
//!   seed is mixed with the team index so different registers diverge.
//! - [`StreamKind::PoolShared`]: identical on every worker of the pool.
//!
//! Branch selection for channels and measurements must use a state-shared
//! stream; otherwise workers of one team would pick different branches and
//! the distributed state becomes meaningless.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Sharing scope of a random stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// Diverges per worker
    Local,
    /// Identical across the workers of one team
    StateShared,
    /// Identical across the whole pool
    PoolShared,
}

impl StreamKind {
    fn domain(self) -> u64 {
        match self {
            StreamKind::Local => 0x4C4F_4341,
            StreamKind::StateShared => 0x5354_4154,
            StreamKind::PoolShared => 0x504F_4F4C,
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Local => write!(f, "local"),
            StreamKind::StateShared => write!(f, "state-shared"),
            StreamKind::PoolShared => write!(f, "pool-shared"),
        }
    }
}

/// SplitMix64 finaliser, used to mix a base seed with a salt
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derive a stream seed from a base seed and a salt (rank or team index)
///
/// Distinct salts give statistically independent streams; the same
/// `(base, salt)` pair always gives the same seed.
pub fn derive_seed(base: u64, salt: u64) -> u64 {
    splitmix64(base ^ splitmix64(salt.wrapping_add(0xD1B5_4A32_D192_ED03)))
}

/// A seeded generator with a draw counter
#[derive(Debug, Clone)]
pub struct RandomStream {
    kind: StreamKind,
    seed: u64,
    draws: u64,
    rng: StdRng,
}

impl RandomStream {
    /// Create a stream from an already-derived seed
    pub fn new(kind: StreamKind, seed: u64) -> Self {
        Self {
            kind,
            seed,
            draws: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a stream from a base seed and a rank or team index
    ///
    /// The kind is mixed in as well, so a local stream on rank 0 and the
    /// state-shared stream of team 0 never coincide.
    pub fn derived(kind: StreamKind, base: u64, salt: u64) -> Self {
        Self::new(kind, derive_seed(derive_seed(base, kind.domain()), salt))
    }

    /// Restart the sequence from `seed`; the next draw uses the new seed
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.draws = 0;
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Uniform value in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        self.draws += 1;
        self.rng.gen::<f64>()
    }

    /// Uniform 64-bit value
    pub fn next_u64(&mut self) -> u64 {
        self.draws += 1;
        self.rng.gen::<u64>()
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Seed the stream currently runs from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Values drawn since construction or the last reseed
    pub fn draws(&self) -> u64 {
        self.draws
    }
}

/// Fresh seed from operating-system entropy
pub fn entropy_seed() -> u64 {
    rand::thread_rng().gen::<u64>()
}
