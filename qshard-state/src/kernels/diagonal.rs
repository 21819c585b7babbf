//! Phase-only kernels for diagonal matrices

use super::{for_each_pair, for_each_quad, use_parallel};
use num_complex::Complex64;
use rayon::prelude::*;

/// Multiply amplitudes by `diagonal[bit(position)]`
pub fn apply_diagonal(
    state: &mut [Complex64],
    diagonal: [Complex64; 2],
    position: usize,
    parallel_threshold: usize,
) {
    let [d0, d1] = diagonal;
    let parallel = use_parallel(state.len(), parallel_threshold);
    for_each_pair(state, position, parallel, |a, b| {
        *a *= d0;
        *b *= d1;
    });
}

/// Multiply amplitudes by `diagonal[2 * bit(first) + bit(second)]`
pub fn apply_diagonal_two(
    state: &mut [Complex64],
    diagonal: [Complex64; 4],
    first: usize,
    second: usize,
    parallel_threshold: usize,
) {
    let (high, low, d) = if first > second {
        (first, second, diagonal)
    } else {
        (
            second,
            first,
            [diagonal[0], diagonal[2], diagonal[1], diagonal[3]],
        )
    };
    let parallel = use_parallel(state.len(), parallel_threshold);
    for_each_quad(state, low, high, parallel, |x0, x1, x2, x3| {
        *x0 *= d[0];
        *x1 *= d[1];
        *x2 *= d[2];
        *x3 *= d[3];
    });
}

/// Multiply the whole slice by one complex factor
///
/// This is the whole work of a diagonal gate whose operands all sit on
/// worker bits: every local amplitude shares the same operand bits.
pub fn scale_complex(state: &mut [Complex64], factor: Complex64, parallel_threshold: usize) {
    if use_parallel(state.len(), parallel_threshold) {
        state.par_iter_mut().for_each(|a| *a *= factor);
    } else {
        state.iter_mut().for_each(|a| *a *= factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{apply_single_qubit, apply_two_qubit};
    use approx::assert_relative_eq;
    use qshard_gates::{rz, rzz};

    fn sample(n: usize) -> Vec<Complex64> {
        (0..1usize << n)
            .map(|i| Complex64::new(1.0 + i as f64, -(i as f64) * 0.5))
            .collect()
    }

    #[test]
    fn test_diagonal_matches_general_kernel() {
        let m = rz(0.77);
        for position in 0..4 {
            let mut fast = sample(4);
            let mut general = fast.clone();
            apply_diagonal(&mut fast, [m[0][0], m[1][1]], position, 14);
            apply_single_qubit(&mut general, &m, position, 14);
            for (a, b) in fast.iter().zip(&general) {
                assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
                assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_two_qubit_diagonal_matches_general_kernel() {
        // asymmetric diagonal so operand order matters
        let mut m = rzz(0.5);
        m[1][1] *= Complex64::new(0.0, 1.0);
        let d = [m[0][0], m[1][1], m[2][2], m[3][3]];
        for (first, second) in [(0, 2), (2, 0), (1, 3)] {
            let mut fast = sample(4);
            let mut general = fast.clone();
            apply_diagonal_two(&mut fast, d, first, second, 14);
            apply_two_qubit(&mut general, &m, first, second, 14);
            for (a, b) in fast.iter().zip(&general) {
                assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
                assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_scale_complex() {
        let mut state = sample(3);
        scale_complex(&mut state, Complex64::new(0.0, 1.0), 0);
        assert_relative_eq!(state[0].im, 1.0);
    }
}
