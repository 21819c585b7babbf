//! Two-qubit matrix application
//!
//! Matrices are indexed `2 * bit(first) + bit(second)`. The local kernel
//! walks quadruples ordered by `(high, low)` data position, so when `first`
//! is the lower position the operands are swapped in the matrix instead.

use super::{for_each_pair_with, for_each_quad, use_parallel};
use num_complex::Complex64;
use qshard_core::matrix::swap_operands;
use qshard_core::Matrix4;
use rayon::prelude::*;

#[inline]
fn row_dot(row: &[Complex64; 4], v: &[Complex64; 4]) -> Complex64 {
    row[0] * v[0] + row[1] * v[1] + row[2] * v[2] + row[3] * v[3]
}

/// Apply a 4×4 matrix to two distinct local data positions
pub fn apply_two_qubit(
    state: &mut [Complex64],
    matrix: &Matrix4,
    first: usize,
    second: usize,
    parallel_threshold: usize,
) {
    debug_assert_ne!(first, second);
    let (high, low, m) = if first > second {
        (first, second, *matrix)
    } else {
        (second, first, swap_operands(matrix))
    };
    let parallel = use_parallel(state.len(), parallel_threshold);
    for_each_quad(state, low, high, parallel, |x0, x1, x2, x3| {
        let v = [*x0, *x1, *x2, *x3];
        *x0 = row_dot(&m[0], &v);
        *x1 = row_dot(&m[1], &v);
        *x2 = row_dot(&m[2], &v);
        *x3 = row_dot(&m[3], &v);
    });
}

/// Two-qubit gate with one operand on a local position and one on a worker bit
///
/// `theirs` is the full slice of the partner that differs in the worker bit.
/// `worker_is_first` says whether the worker-bit operand is the matrix's
/// first operand; `worker_bit` is this worker's value of that bit. Each local
/// pair plus the partner's pair forms the 4-vector, and this worker keeps the
/// two rows whose worker bit matches its own.
pub fn apply_two_qubit_with_partner(
    mine: &mut [Complex64],
    theirs: &[Complex64],
    matrix: &Matrix4,
    local_position: usize,
    worker_is_first: bool,
    worker_bit: usize,
    parallel_threshold: usize,
) {
    // reorder to (worker, local)
    let m = if worker_is_first {
        *matrix
    } else {
        swap_operands(matrix)
    };
    let row0 = m[2 * worker_bit];
    let row1 = m[2 * worker_bit + 1];
    let parallel = use_parallel(mine.len(), parallel_threshold);
    for_each_pair_with(mine, theirs, local_position, parallel, |a, b, c, d| {
        let v = if worker_bit == 0 {
            [*a, *b, c, d]
        } else {
            [c, d, *a, *b]
        };
        *a = row_dot(&row0, &v);
        *b = row_dot(&row1, &v);
    });
}

/// Combine four gathered slices with one matrix row
///
/// Used when both operands are worker bits: `slices[k]` is the slice of the
/// worker whose operand bits form basis index `k`, and `row` is the row of the
/// matrix this worker owns. Returns the new local slice.
pub fn apply_two_qubit_gathered(
    slices: [&[Complex64]; 4],
    row: &[Complex64; 4],
    parallel_threshold: usize,
) -> Vec<Complex64> {
    let len = slices[0].len();
    let at = |i: usize| {
        row[0] * slices[0][i] + row[1] * slices[1][i] + row[2] * slices[2][i] + row[3] * slices[3][i]
    };
    if use_parallel(len, parallel_threshold) {
        (0..len).into_par_iter().map(at).collect()
    } else {
        (0..len).map(at).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qshard_gates::{controlled_ry, CNOT};

    fn sample(n: usize) -> Vec<Complex64> {
        (0..1usize << n)
            .map(|i| Complex64::new((i as f64 * 0.37).cos(), (i as f64 * 0.11).sin()))
            .collect()
    }

    /// Direct definition: out[i] = Σ_k M[row(i)][k] ψ[index(i, k)]
    fn reference(state: &[Complex64], m: &Matrix4, first: usize, second: usize) -> Vec<Complex64> {
        let mut out = vec![Complex64::new(0.0, 0.0); state.len()];
        for (i, slot) in out.iter_mut().enumerate() {
            let row = 2 * ((i >> first) & 1) + ((i >> second) & 1);
            let base = i & !((1 << first) | (1 << second));
            for k in 0..4 {
                let j = base | ((k >> 1) << first) | ((k & 1) << second);
                *slot += m[row][k] * state[j];
            }
        }
        out
    }

    fn assert_close(a: &[Complex64], b: &[Complex64]) {
        for (x, y) in a.iter().zip(b) {
            assert_relative_eq!(x.re, y.re, epsilon = 1e-12);
            assert_relative_eq!(x.im, y.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cnot_on_basis_state() {
        // |q1 q0> = |01>: control q0 set, target q1 flips -> |11>
        let mut state = vec![Complex64::new(0.0, 0.0); 4];
        state[1] = Complex64::new(1.0, 0.0);
        apply_two_qubit(&mut state, &CNOT, 0, 1, 14);
        assert_eq!(state[3], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_matches_reference_for_both_orders() {
        let m = controlled_ry(0.83);
        let init = sample(5);
        for (first, second) in [(0, 3), (3, 0), (1, 4), (4, 2)] {
            let mut state = init.clone();
            apply_two_qubit(&mut state, &m, first, second, 14);
            assert_close(&state, &reference(&init, &m, first, second));

            let mut par = init.clone();
            apply_two_qubit(&mut par, &m, first, second, 0);
            assert_close(&par, &state);
        }
    }

    #[test]
    fn test_partner_path_matches_reference() {
        // 3 qubits, position 2 is the worker bit, two workers of 4 amplitudes
        let m = controlled_ry(1.3);
        let init = sample(3);
        for (first, second) in [(2, 0), (1, 2)] {
            let expected = reference(&init, &m, first, second);
            let worker_is_first = first == 2;
            let local = if worker_is_first { second } else { first };
            let (lo, hi) = init.split_at(4);

            let mut w0 = lo.to_vec();
            let mut w1 = hi.to_vec();
            apply_two_qubit_with_partner(&mut w0, hi, &m, local, worker_is_first, 0, 14);
            apply_two_qubit_with_partner(&mut w1, lo, &m, local, worker_is_first, 1, 14);
            let joined: Vec<Complex64> = w0.into_iter().chain(w1).collect();
            assert_close(&joined, &expected);
        }
    }

    #[test]
    fn test_gathered_rows() {
        // 2 qubits on 4 workers, one amplitude each: worker r holds global index r,
        // so with operands (1, 0) basis index k is also the owning worker
        let m = controlled_ry(0.4);
        let init = sample(2);
        let expected = reference(&init, &m, 1, 0);
        let slices = [&init[0..1], &init[1..2], &init[2..3], &init[3..4]];
        for rank in 0..4 {
            let out = apply_two_qubit_gathered(slices, &m[rank], 14);
            assert_relative_eq!(out[0].re, expected[rank].re, epsilon = 1e-12);
            assert_relative_eq!(out[0].im, expected[rank].im, epsilon = 1e-12);
        }
    }
}
