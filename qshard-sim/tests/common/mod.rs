//! Shared helpers: a dense single-vector reference and team launchers

#![allow(dead_code)]

use num_complex::Complex64;
use qshard_core::{Matrix2, Matrix4};
use qshard_sim::{launch, EngineConfig, PoolConfig, Register, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const EPSILON: f64 = 1e-10;

/// Apply a 2×2 matrix to qubit `q` of a full state vector
pub fn dense_1q(state: &mut [Complex64], q: usize, m: &Matrix2) {
    let bit = 1 << q;
    for i in 0..state.len() {
        if i & bit == 0 {
            let (a, b) = (state[i], state[i | bit]);
            state[i] = m[0][0] * a + m[0][1] * b;
            state[i | bit] = m[1][0] * a + m[1][1] * b;
        }
    }
}

/// Apply a 4×4 matrix to qubits (`first`, `second`), `first` most significant
pub fn dense_2q(state: &mut [Complex64], first: usize, second: usize, m: &Matrix4) {
    let (bf, bs) = (1 << first, 1 << second);
    for i in 0..state.len() {
        if i & bf == 0 && i & bs == 0 {
            let idx = [i, i | bs, i | bf, i | bf | bs];
            let v = idx.map(|j| state[j]);
            for (row, &j) in idx.iter().enumerate() {
                state[j] = (0..4).map(|k| m[row][k] * v[k]).sum();
            }
        }
    }
}

/// Reproducible normalized random state
pub fn random_state(num_qubits: usize, seed: u64) -> Vec<Complex64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let raw: Vec<Complex64> = (0..1usize << num_qubits)
        .map(|_| Complex64::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5))
        .collect();
    let norm = raw.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
    raw.into_iter().map(|a| a / norm).collect()
}

pub fn assert_states_close(actual: &[Complex64], expected: &[Complex64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).norm() <= tolerance,
            "amplitude {i}: got {a}, expected {e}"
        );
    }
}

/// Run `body` on every worker of one team and return the per-worker results
pub fn run_team<T, F>(workers: usize, num_qubits: usize, engine: EngineConfig, body: F) -> Vec<T>
where
    T: Send,
    F: Fn(&mut Register) -> Result<T> + Sync,
{
    try_team(workers, num_qubits, engine, body).expect("team run failed")
}

pub fn try_team<T, F>(
    workers: usize,
    num_qubits: usize,
    engine: EngineConfig,
    body: F,
) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&mut Register) -> Result<T> + Sync,
{
    let config = PoolConfig::single_team(workers, num_qubits)
        .with_seed(1234)
        .with_engine(engine);
    launch(config, |ctx| body(ctx.register()))
}

/// Run `body` and gather the final state in program order
pub fn final_state<F>(workers: usize, num_qubits: usize, engine: EngineConfig, body: F) -> Vec<Complex64>
where
    F: Fn(&mut Register) -> Result<()> + Sync,
{
    let states = run_team(workers, num_qubits, engine, |reg| {
        body(reg)?;
        reg.gather_amplitudes()
    });
    for other in &states[1..] {
        assert_eq!(other, &states[0], "workers disagree on the gathered state");
    }
    states.into_iter().next().unwrap_or_default()
}
