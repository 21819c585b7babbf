//! Worker pool: one thread per worker, grouped into teams
//!
//! [`launch`] spawns every worker of a [`PoolConfig`], hands each a
//! [`WorkerContext`] holding its part of the team register, runs the same
//! driver on all of them and collects the results in rank order.

use crate::comm::{mesh, Communicator, MeshEndpoint, Transport};
use crate::config::PoolConfig;
use crate::error::{Result, SimulatorError};
use crate::register::Register;
use qshard_core::{entropy_seed, RandomStream, StreamKind};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a worker sees while the driver runs
pub struct WorkerContext {
    register: Register,
    pool: Communicator,
    pool_random: RandomStream,
    base_seed: u64,
}

impl WorkerContext {
    /// Index of the team this worker belongs to
    pub fn team_index(&self) -> usize {
        self.register.team_index()
    }

    /// Rank of this worker across the whole pool
    pub fn global_rank(&self) -> usize {
        self.pool.rank()
    }

    /// Number of workers in the pool
    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    /// Base seed every stream of this launch derives from
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// This worker's part of its team register
    pub fn register(&mut self) -> &mut Register {
        &mut self.register
    }

    /// Collectives over every worker of the pool
    pub fn pool(&self) -> &Communicator {
        &self.pool
    }

    /// Stream shared by every worker of the pool
    pub fn pool_random(&mut self) -> &mut RandomStream {
        &mut self.pool_random
    }

    /// Reseed the pool-shared stream; every worker must pass the same seed
    pub fn reseed_pool(&mut self, seed: u64) {
        self.pool_random.reseed(seed);
    }
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("global_rank", &self.pool.rank())
            .field("register", &self.register)
            .finish()
    }
}

/// Run `driver` on every worker of the pool and collect the results
///
/// Results come back indexed by global rank. Peers of a failed worker see
/// their channels close and fail with [`SimulatorError::Disconnected`]
/// instead of blocking, so the returned error is the one of the lowest rank
/// that failed for another reason. A panicking worker is reported as
/// [`SimulatorError::WorkerPanicked`].
///
/// # Example
///
/// ```
/// use qshard_gates::HADAMARD;
/// use qshard_sim::{launch, PoolConfig};
///
/// let probabilities = launch(PoolConfig::single_team(2, 3).with_seed(1), |ctx| {
///     let reg = ctx.register();
///     reg.apply_1q(2, &HADAMARD)?;
///     reg.probability(2, 1)
/// })
/// .unwrap();
/// assert!(probabilities.iter().all(|p| (p - 0.5).abs() < 1e-12));
/// ```
pub fn launch<T, F>(config: PoolConfig, driver: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&mut WorkerContext) -> Result<T> + Sync,
{
    config.validate()?;
    let total = config.total_workers();
    info!(
        "Launching pool of {} workers in {} teams",
        total,
        config.teams.len()
    );

    let outcomes: Vec<std::thread::Result<Result<T>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = mesh(total)
            .into_iter()
            .map(|endpoint| {
                let config = &config;
                let driver = &driver;
                scope.spawn(move || run_worker(config, endpoint, driver))
            })
            .collect();
        handles.into_iter().map(|handle| handle.join()).collect()
    });

    let mut results = Vec::with_capacity(total);
    let mut errors = Vec::new();
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(err)) => {
                warn!("Worker {} failed: {}", rank, err);
                errors.push(err);
            }
            Err(_) => {
                warn!("Worker {} panicked", rank);
                errors.push(SimulatorError::WorkerPanicked { rank });
            }
        }
    }
    info!("Pool of {} workers finished", total);

    let root_cause = errors
        .iter()
        .position(|err| !matches!(err, SimulatorError::Disconnected { .. }))
        .unwrap_or(0);
    match errors.into_iter().nth(root_cause) {
        Some(err) => Err(err),
        None => Ok(results),
    }
}

fn run_worker<T, F>(config: &PoolConfig, endpoint: MeshEndpoint, driver: &F) -> Result<T>
where
    F: Fn(&mut WorkerContext) -> Result<T>,
{
    let rank = endpoint.rank();
    let transport: Arc<dyn Transport> = Arc::new(endpoint);
    let pool = Communicator::world(transport.clone());

    let base_seed = match config.seed {
        Some(seed) => seed,
        None => {
            let proposal = if rank == 0 { entropy_seed() } else { 0 };
            pool.broadcast_word(0, proposal)?
        }
    };

    let (team_index, _) = config.assignments()[rank];
    let team = Communicator::new(transport, config.members(team_index))?;
    let register = Register::new(
        config.teams[team_index],
        config.engine.clone(),
        team,
        team_index,
        base_seed,
    )?;

    let mut ctx = WorkerContext {
        register,
        pool,
        pool_random: RandomStream::derived(StreamKind::PoolShared, base_seed, 0),
        base_seed,
    };
    driver(&mut ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, TeamSpec};

    #[test]
    fn test_results_in_rank_order() {
        let ranks = launch(PoolConfig::single_team(4, 3).with_seed(2), |ctx| {
            Ok((ctx.global_rank(), ctx.register().worker_rank()))
        })
        .unwrap();
        assert_eq!(ranks, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_teams_are_independent() {
        let config = PoolConfig::with_teams(vec![TeamSpec::new(2, 2), TeamSpec::new(1, 1)])
            .with_seed(9);
        let out = launch(config, |ctx| {
            let team = ctx.team_index();
            let reg = ctx.register();
            if team == 0 {
                reg.apply_1q(1, &qshard_gates::PAULI_X)?;
            }
            Ok((team, reg.workers(), reg.probability(0, 0)?))
        })
        .unwrap();
        assert_eq!(out[0].0, 0);
        assert_eq!(out[1].1, 2);
        assert_eq!(out[2], (1, 1, 1.0));
    }

    #[test]
    fn test_pool_shared_stream_agrees() {
        let draws = launch(PoolConfig::single_team(4, 2), |ctx| {
            ctx.reseed_pool(77);
            Ok(ctx.pool_random().next_u64())
        })
        .unwrap();
        assert!(draws.iter().all(|&d| d == draws[0]));
    }

    #[test]
    fn test_entropy_seed_is_shared() {
        let seeds = launch(PoolConfig::single_team(2, 2), |ctx| Ok(ctx.base_seed())).unwrap();
        assert_eq!(seeds[0], seeds[1]);
    }

    #[test]
    fn test_worker_error_is_reported() {
        let err = launch(PoolConfig::single_team(2, 2).with_seed(1), |ctx| {
            if ctx.global_rank() == 1 {
                return Err(SimulatorError::Precondition("stop".to_string()));
            }
            ctx.register().norm_sqr()
        })
        .unwrap_err();
        assert!(matches!(err, SimulatorError::Precondition(_)));
    }

    #[test]
    fn test_panicking_worker() {
        let err = launch(
            PoolConfig::single_team(2, 1)
                .with_seed(1)
                .with_engine(EngineConfig::debug()),
            |ctx| {
                if ctx.global_rank() == 0 {
                    panic!("boom");
                }
                Ok(())
            },
        )
        .unwrap_err();
        assert!(matches!(err, SimulatorError::WorkerPanicked { rank: 0 }));
    }

    #[test]
    fn test_invalid_team_rejected_before_spawning() {
        let err = launch(PoolConfig::single_team(3, 4), |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }
}
