//! Engine and pool configuration

use crate::error::{Result, SimulatorError};
use qshard_core::MAX_QUBITS;
use serde::{Deserialize, Serialize};

/// How a two-qubit gate whose operands both select the worker is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutPolicy {
    /// Move one operand onto a free local position first, then run the
    /// one-local/one-worker protocol. The permutation changes and stays changed.
    Relocate,
    /// Keep the permutation; gather the four involved slices with a two-stage
    /// hypercube exchange.
    Fixed,
}

/// Configuration of one distributed register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum elementwise deviation of U†U from I for a gate to be accepted
    ///
    /// Default: 1e-10
    pub unitarity_tolerance: f64,

    /// Maximum elementwise deviation of Σ K†K from I for a channel
    ///
    /// Default: 1e-10
    pub trace_tolerance: f64,

    /// Allowed distance of Σ p_i from 1 when selecting a channel branch
    ///
    /// Default: 1e-8
    pub probability_tolerance: f64,

    /// Local slices with at least 2^parallel_threshold amplitudes use rayon
    ///
    /// Default: 14
    pub parallel_threshold: usize,

    /// Largest number of amplitudes sent in one message; bigger transfers are chunked
    ///
    /// Default: 2^20
    pub max_message_amplitudes: usize,

    /// Execution strategy for gates on two worker bits
    ///
    /// Default: [`LayoutPolicy::Relocate`]
    pub layout_policy: LayoutPolicy,

    /// All-gather every shared random draw and fail on disagreement
    ///
    /// Default: true
    pub verify_shared_draws: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unitarity_tolerance: 1e-10,
            trace_tolerance: 1e-10,
            probability_tolerance: 1e-8,
            parallel_threshold: 14,
            max_message_amplitudes: 1 << 20,
            layout_policy: LayoutPolicy::Relocate,
            verify_shared_draws: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fewer safety checks, earlier parallelism
    ///
    /// - shared draws are not verified
    /// - rayon kicks in at 2^10 local amplitudes
    pub fn fast() -> Self {
        Self {
            parallel_threshold: 10,
            verify_shared_draws: false,
            ..Default::default()
        }
    }

    /// Settings for tests and debugging
    ///
    /// - tiny messages, so chunking paths are exercised
    /// - sequential kernels
    /// - fixed layout, so the permutation never moves behind the caller's back
    pub fn debug() -> Self {
        Self {
            parallel_threshold: usize::MAX,
            max_message_amplitudes: 4,
            layout_policy: LayoutPolicy::Fixed,
            ..Default::default()
        }
    }

    pub fn with_unitarity_tolerance(mut self, tolerance: f64) -> Self {
        self.unitarity_tolerance = tolerance;
        self
    }

    pub fn with_trace_tolerance(mut self, tolerance: f64) -> Self {
        self.trace_tolerance = tolerance;
        self
    }

    pub fn with_probability_tolerance(mut self, tolerance: f64) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn with_max_message_amplitudes(mut self, amplitudes: usize) -> Self {
        self.max_message_amplitudes = amplitudes;
        self
    }

    pub fn with_layout_policy(mut self, policy: LayoutPolicy) -> Self {
        self.layout_policy = policy;
        self
    }

    pub fn with_shared_draw_verification(mut self, enabled: bool) -> Self {
        self.verify_shared_draws = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("unitarity_tolerance", self.unitarity_tolerance),
            ("trace_tolerance", self.trace_tolerance),
            ("probability_tolerance", self.probability_tolerance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimulatorError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if self.max_message_amplitudes == 0 {
            return Err(SimulatorError::InvalidConfig(
                "max_message_amplitudes must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// One team of a pool: `workers` workers sharing a `num_qubits`-qubit register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSpec {
    pub workers: usize,
    pub num_qubits: usize,
}

impl TeamSpec {
    pub fn new(workers: usize, num_qubits: usize) -> Self {
        Self {
            workers,
            num_qubits,
        }
    }

    /// Check `W` is a power of two and `log2(W) <= N <= MAX_QUBITS`
    pub fn validate(&self) -> Result<()> {
        let TeamSpec {
            workers,
            num_qubits,
        } = *self;
        if workers == 0 || !workers.is_power_of_two() {
            return Err(SimulatorError::team(
                workers,
                num_qubits,
                "worker count must be a power of two",
            ));
        }
        if num_qubits > MAX_QUBITS {
            return Err(SimulatorError::team(
                workers,
                num_qubits,
                format!("at most {MAX_QUBITS} qubits are supported"),
            ));
        }
        if (workers.trailing_zeros() as usize) > num_qubits {
            return Err(SimulatorError::team(
                workers,
                num_qubits,
                "need at least log2(workers) qubits",
            ));
        }
        Ok(())
    }

    /// Number of worker-selecting bits, `log2(W)`
    pub fn worker_bits(&self) -> usize {
        self.workers.trailing_zeros() as usize
    }

    /// Number of local bits, `N - log2(W)`
    pub fn local_qubits(&self) -> usize {
        self.num_qubits - self.worker_bits()
    }
}

/// Configuration of one pool launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Teams in order; worker ranks are assigned contiguously
    pub teams: Vec<TeamSpec>,

    /// Base seed for every random stream; `None` draws one from OS entropy
    pub seed: Option<u64>,

    /// Settings applied to every register
    pub engine: EngineConfig,

    /// Expected total number of workers; when set, team sizes must add up to it
    pub pool_size: Option<usize>,
}

impl PoolConfig {
    /// A pool with a single team
    pub fn single_team(workers: usize, num_qubits: usize) -> Self {
        Self {
            teams: vec![TeamSpec::new(workers, num_qubits)],
            seed: None,
            engine: EngineConfig::default(),
            pool_size: None,
        }
    }

    /// A pool of several teams
    pub fn with_teams(teams: Vec<TeamSpec>) -> Self {
        Self {
            teams,
            seed: None,
            engine: EngineConfig::default(),
            pool_size: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_pool_size(mut self, workers: usize) -> Self {
        self.pool_size = Some(workers);
        self
    }

    /// Total number of workers over all teams
    pub fn total_workers(&self) -> usize {
        self.teams.iter().map(|t| t.workers).sum()
    }

    pub fn validate(&self) -> Result<()> {
        if self.teams.is_empty() {
            return Err(SimulatorError::InvalidConfig(
                "a pool needs at least one team".to_string(),
            ));
        }
        for team in &self.teams {
            team.validate()?;
        }
        if let Some(expected) = self.pool_size {
            let total = self.total_workers();
            if total != expected {
                return Err(SimulatorError::InvalidConfig(format!(
                    "teams cover {total} workers but the pool has {expected}"
                )));
            }
        }
        self.engine.validate()
    }

    /// Team index and rank within the team for every global rank
    pub(crate) fn assignments(&self) -> Vec<(usize, usize)> {
        self.teams
            .iter()
            .enumerate()
            .flat_map(|(team, spec)| (0..spec.workers).map(move |rank| (team, rank)))
            .collect()
    }

    /// Global ranks of the members of `team`
    pub(crate) fn members(&self, team: usize) -> Vec<usize> {
        let start: usize = self.teams[..team].iter().map(|t| t.workers).sum();
        (start..start + self.teams[team].workers).collect()
    }
}
