//! Reductions over the local slice: norms, bit probabilities and reduced
//! density matrices, plus the matching in-place updates

use super::{for_each_pair, use_parallel};
use num_complex::Complex64;
use qshard_core::{Matrix2, Matrix4};
use rayon::prelude::*;

/// Σ |a_i|² over the slice
pub fn norm_sqr(state: &[Complex64], parallel_threshold: usize) -> f64 {
    if use_parallel(state.len(), parallel_threshold) {
        state.par_iter().map(|a| a.norm_sqr()).sum()
    } else {
        state.iter().map(|a| a.norm_sqr()).sum()
    }
}

/// Multiply every amplitude by a real factor
pub fn scale(state: &mut [Complex64], factor: f64, parallel_threshold: usize) {
    if use_parallel(state.len(), parallel_threshold) {
        state.par_iter_mut().for_each(|a| *a *= factor);
    } else {
        state.iter_mut().for_each(|a| *a *= factor);
    }
}

/// Σ |a_i|² over amplitudes whose bit `position` equals `outcome`
pub fn probability_of_bit(
    state: &[Complex64],
    position: usize,
    outcome: usize,
    parallel_threshold: usize,
) -> f64 {
    let stride = 1usize << position;
    let half = |chunk: &[Complex64]| -> f64 {
        chunk[outcome * stride..(outcome + 1) * stride]
            .iter()
            .map(|a| a.norm_sqr())
            .sum()
    };
    if use_parallel(state.len(), parallel_threshold) {
        state.par_chunks(stride << 1).map(half).sum()
    } else {
        state.chunks(stride << 1).map(half).sum()
    }
}

/// Zero every amplitude whose bit `position` differs from `outcome`
pub fn zero_bit(state: &mut [Complex64], position: usize, outcome: usize, parallel_threshold: usize) {
    let zero = Complex64::new(0.0, 0.0);
    let parallel = use_parallel(state.len(), parallel_threshold);
    for_each_pair(state, position, parallel, |a, b| {
        if outcome == 0 {
            *b = zero;
        } else {
            *a = zero;
        }
    });
}

fn outer_accumulate<const D: usize>(rho: &mut [[Complex64; D]; D], v: &[Complex64; D]) {
    for i in 0..D {
        for j in 0..D {
            rho[i][j] += v[i] * v[j].conj();
        }
    }
}

fn add_matrices<const D: usize>(
    mut a: [[Complex64; D]; D],
    b: [[Complex64; D]; D],
) -> [[Complex64; D]; D] {
    for i in 0..D {
        for j in 0..D {
            a[i][j] += b[i][j];
        }
    }
    a
}

/// Sum `v v†` over every group of `D` amplitudes that differ only in the
/// target bits; `gather(base)` returns the group for a base index
fn reduced_density<const D: usize, G>(
    len: usize,
    mask: usize,
    parallel: bool,
    gather: G,
) -> [[Complex64; D]; D]
where
    G: Fn(usize) -> [Complex64; D] + Sync + Send,
{
    let zero = [[Complex64::new(0.0, 0.0); D]; D];
    if parallel {
        (0..len)
            .into_par_iter()
            .filter(|i| i & mask == 0)
            .fold(
                || zero,
                |mut rho, i| {
                    outer_accumulate(&mut rho, &gather(i));
                    rho
                },
            )
            .reduce(|| zero, add_matrices)
    } else {
        let mut rho = zero;
        for i in (0..len).filter(|i| i & mask == 0) {
            outer_accumulate(&mut rho, &gather(i));
        }
        rho
    }
}

/// Unnormalized reduced density matrix of one local position
///
/// `ρ[a][b] = Σ ψ(a, rest) ψ*(b, rest)` over this slice only; the team sums
/// the per-worker matrices.
pub fn reduced_density_single(
    state: &[Complex64],
    position: usize,
    parallel_threshold: usize,
) -> Matrix2 {
    let bit = 1usize << position;
    let parallel = use_parallel(state.len(), parallel_threshold);
    reduced_density(state.len(), bit, parallel, |i| [state[i], state[i | bit]])
}

/// Unnormalized reduced density matrix of two local positions
///
/// Indexed `2 * bit(first) + bit(second)`, matching the gate matrices.
pub fn reduced_density_two(
    state: &[Complex64],
    first: usize,
    second: usize,
    parallel_threshold: usize,
) -> Matrix4 {
    let f = 1usize << first;
    let s = 1usize << second;
    let parallel = use_parallel(state.len(), parallel_threshold);
    reduced_density(state.len(), f | s, parallel, |i| {
        [state[i], state[i | s], state[i | f], state[i | f | s]]
    })
}
