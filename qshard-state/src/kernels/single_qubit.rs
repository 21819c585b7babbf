//! Single-qubit matrix application

use super::{for_each_pair, use_parallel};
use num_complex::Complex64;
use qshard_core::Matrix2;
use rayon::prelude::*;

/// Apply a 2×2 matrix to local data position `position`
///
/// Amplitudes are processed in pairs `(i, i | 2^position)`:
/// ```text
/// a' = m00·a + m01·b
/// b' = m10·a + m11·b
/// ```
pub fn apply_single_qubit(
    state: &mut [Complex64],
    matrix: &Matrix2,
    position: usize,
    parallel_threshold: usize,
) {
    let [[m00, m01], [m10, m11]] = *matrix;
    let parallel = use_parallel(state.len(), parallel_threshold);
    for_each_pair(state, position, parallel, |a, b| {
        let (x, y) = (*a, *b);
        *a = m00 * x + m01 * y;
        *b = m10 * x + m11 * y;
    });
}

/// Combine this worker's slice with its partner's for a gate on a worker bit
///
/// When the target qubit selects the worker, each local index `i` pairs
/// `mine[i]` with `theirs[i]`. A worker whose bit is `c` keeps row `c` of the
/// matrix: `mine[i] = U[c][c]·mine[i] + U[c][1-c]·theirs[i]`.
pub fn apply_single_qubit_with_partner(
    mine: &mut [Complex64],
    theirs: &[Complex64],
    matrix: &Matrix2,
    worker_bit: usize,
    parallel_threshold: usize,
) {
    let own = matrix[worker_bit][worker_bit];
    let other = matrix[worker_bit][1 - worker_bit];
    if use_parallel(mine.len(), parallel_threshold) {
        mine.par_iter_mut()
            .zip(theirs.par_iter())
            .for_each(|(a, &b)| *a = own * *a + other * b);
    } else {
        for (a, &b) in mine.iter_mut().zip(theirs) {
            *a = own * *a + other * b;
        }
    }
}
