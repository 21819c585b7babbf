//! Pure data movement: swapping two local positions and moving half slices

use super::{for_each_quad, use_parallel};
use num_complex::Complex64;

/// Exchange the roles of two local data positions
///
/// Equivalent to applying SWAP, but without arithmetic.
pub fn swap_positions(state: &mut [Complex64], a: usize, b: usize, parallel_threshold: usize) {
    if a == b {
        return;
    }
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    let parallel = use_parallel(state.len(), parallel_threshold);
    for_each_quad(state, low, high, parallel, |_, x01, x10, _| {
        std::mem::swap(x01, x10);
    });
}

/// Copy out the half of the slice whose bit `position` equals `bit`
///
/// The order matches [`write_half`], so the half of one worker can be written
/// straight into the complementary half of another.
pub fn copy_half(state: &[Complex64], position: usize, bit: usize) -> Vec<Complex64> {
    let stride = 1usize << position;
    let mut out = Vec::with_capacity(state.len() / 2);
    for chunk in state.chunks(stride << 1) {
        out.extend_from_slice(&chunk[bit * stride..(bit + 1) * stride]);
    }
    out
}

/// Overwrite the half of the slice whose bit `position` equals `bit`
pub fn write_half(state: &mut [Complex64], position: usize, bit: usize, data: &[Complex64]) {
    let stride = 1usize << position;
    for (chunk, src) in state.chunks_mut(stride << 1).zip(data.chunks(stride)) {
        chunk[bit * stride..(bit + 1) * stride].copy_from_slice(src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::apply_two_qubit;
    use qshard_gates::SWAP;

    fn indexed(n: usize) -> Vec<Complex64> {
        (0..n).map(|i| Complex64::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn test_swap_matches_matrix() {
        for (a, b) in [(0, 1), (0, 3), (3, 1)] {
            let mut fast = indexed(16);
            let mut general = fast.clone();
            swap_positions(&mut fast, a, b, 14);
            apply_two_qubit(&mut general, &SWAP, a, b, 14);
            assert_eq!(fast, general);
        }
    }

    #[test]
    fn test_swap_is_involution() {
        let mut state = indexed(32);
        swap_positions(&mut state, 1, 4, 0);
        swap_positions(&mut state, 1, 4, 0);
        assert_eq!(state, indexed(32));
    }

    #[test]
    fn test_half_round_trip() {
        let state = indexed(8);
        let upper = copy_half(&state, 1, 1);
        assert_eq!(
            upper.iter().map(|a| a.re as usize).collect::<Vec<_>>(),
            vec![2, 3, 6, 7]
        );

        let mut target = vec![Complex64::new(0.0, 0.0); 8];
        write_half(&mut target, 1, 0, &upper);
        assert_eq!(target[0].re, 2.0);
        assert_eq!(target[5].re, 7.0);
        assert_eq!(target[2].re, 0.0);
    }
}
