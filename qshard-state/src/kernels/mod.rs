//! In-place kernels over a local amplitude slice
//!
//! Every kernel takes a `parallel_threshold` expressed in local qubits: once
//! the slice holds at least `2^parallel_threshold` amplitudes and rayon has
//! more than one thread, the work is split with `par_chunks_mut`. When the
//! target bit is so high that there are fewer blocks than threads, the split
//! moves inside each block instead.
//!
//! Positions passed to these kernels are *data* positions below the local-bit
//! boundary; callers validate them.

pub mod diagonal;
pub mod reduce;
pub mod single_qubit;
pub mod swap;
pub mod two_qubit;

pub use diagonal::{apply_diagonal, apply_diagonal_two, scale_complex};
pub use reduce::{
    norm_sqr, probability_of_bit, reduced_density_single, reduced_density_two, scale, zero_bit,
};
pub use single_qubit::{apply_single_qubit, apply_single_qubit_with_partner};
pub use swap::{copy_half, swap_positions, write_half};
pub use two_qubit::{apply_two_qubit, apply_two_qubit_gathered, apply_two_qubit_with_partner};

use num_complex::Complex64;
use rayon::prelude::*;

/// True if a slice of `len` amplitudes should be processed in parallel
#[inline]
pub(crate) fn use_parallel(len: usize, threshold: usize) -> bool {
    threshold < usize::BITS as usize
        && len >= (1usize << threshold)
        && rayon::current_num_threads() > 1
}

/// Visit every pair `(i, i | 2^position)` with bit `position` of `i` clear
pub(crate) fn for_each_pair<F>(state: &mut [Complex64], position: usize, parallel: bool, f: F)
where
    F: Fn(&mut Complex64, &mut Complex64) + Sync + Send,
{
    let stride = 1usize << position;
    let block = stride << 1;
    let visit = |chunk: &mut [Complex64]| {
        let (lo, hi) = chunk.split_at_mut(stride);
        lo.iter_mut().zip(hi.iter_mut()).for_each(|(a, b)| f(a, b));
    };

    if !parallel {
        state.chunks_mut(block).for_each(visit);
    } else if state.len() / block >= rayon::current_num_threads() {
        state.par_chunks_mut(block).for_each(visit);
    } else {
        state.chunks_mut(block).for_each(|chunk| {
            let (lo, hi) = chunk.split_at_mut(stride);
            lo.par_iter_mut()
                .zip(hi.par_iter_mut())
                .for_each(|(a, b)| f(a, b));
        });
    }
}

/// Like [`for_each_pair`], but also hands over the matching pair of a
/// partner slice of the same size
pub(crate) fn for_each_pair_with<F>(
    mine: &mut [Complex64],
    theirs: &[Complex64],
    position: usize,
    parallel: bool,
    f: F,
) where
    F: Fn(&mut Complex64, &mut Complex64, Complex64, Complex64) + Sync + Send,
{
    let stride = 1usize << position;
    let block = stride << 1;
    let visit = |(chunk, other): (&mut [Complex64], &[Complex64])| {
        let (lo, hi) = chunk.split_at_mut(stride);
        let (olo, ohi) = other.split_at(stride);
        for ((a, b), (&c, &d)) in lo.iter_mut().zip(hi.iter_mut()).zip(olo.iter().zip(ohi)) {
            f(a, b, c, d);
        }
    };

    if !parallel {
        mine.chunks_mut(block).zip(theirs.chunks(block)).for_each(visit);
    } else if mine.len() / block >= rayon::current_num_threads() {
        mine.par_chunks_mut(block)
            .zip(theirs.par_chunks(block))
            .for_each(visit);
    } else {
        for (chunk, other) in mine.chunks_mut(block).zip(theirs.chunks(block)) {
            let (lo, hi) = chunk.split_at_mut(stride);
            let (olo, ohi) = other.split_at(stride);
            lo.par_iter_mut()
                .zip(hi.par_iter_mut())
                .zip(olo.par_iter().zip(ohi.par_iter()))
                .for_each(|((a, b), (&c, &d))| f(a, b, c, d));
        }
    }
}

/// Visit every quadruple of amplitudes differing only in bits `low` and `high`
///
/// The closure receives them ordered by `2 * bit(high) + bit(low)`.
/// Requires `low < high`.
pub(crate) fn for_each_quad<F>(
    state: &mut [Complex64],
    low: usize,
    high: usize,
    parallel: bool,
    f: F,
) where
    F: Fn(&mut Complex64, &mut Complex64, &mut Complex64, &mut Complex64) + Sync + Send,
{
    debug_assert!(low < high);
    let lo_stride = 1usize << low;
    let hi_stride = 1usize << high;
    let block = hi_stride << 1;

    let inner = |c0: &mut [Complex64], c1: &mut [Complex64]| {
        let (a00, a01) = c0.split_at_mut(lo_stride);
        let (a10, a11) = c1.split_at_mut(lo_stride);
        for (((x0, x1), x2), x3) in a00
            .iter_mut()
            .zip(a01.iter_mut())
            .zip(a10.iter_mut())
            .zip(a11.iter_mut())
        {
            f(x0, x1, x2, x3);
        }
    };
    let visit = |chunk: &mut [Complex64]| {
        let (h0, h1) = chunk.split_at_mut(hi_stride);
        h0.chunks_mut(lo_stride << 1)
            .zip(h1.chunks_mut(lo_stride << 1))
            .for_each(|(c0, c1)| inner(c0, c1));
    };

    if !parallel {
        state.chunks_mut(block).for_each(visit);
    } else if state.len() / block >= rayon::current_num_threads() {
        state.par_chunks_mut(block).for_each(visit);
    } else {
        state.chunks_mut(block).for_each(|chunk| {
            let (h0, h1) = chunk.split_at_mut(hi_stride);
            h0.par_chunks_mut(lo_stride << 1)
                .zip(h1.par_chunks_mut(lo_stride << 1))
                .for_each(|(c0, c1)| inner(c0, c1));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed(n: usize) -> Vec<Complex64> {
        (0..n).map(|i| Complex64::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn test_pairs_cover_every_index_once() {
        for parallel in [false, true] {
            let mut state = indexed(16);
            for_each_pair(&mut state, 2, parallel, |a, b| {
                assert_eq!(b.re as usize, a.re as usize | 4);
                a.im += 1.0;
                b.im += 1.0;
            });
            assert!(state.iter().all(|a| a.im == 1.0));
        }
    }

    #[test]
    fn test_quads_are_ordered_high_then_low() {
        for parallel in [false, true] {
            let mut state = indexed(32);
            for_each_quad(&mut state, 1, 3, parallel, |x0, x1, x2, x3| {
                let base = x0.re as usize;
                assert_eq!(base & 0b1010, 0);
                assert_eq!(x1.re as usize, base | 0b0010);
                assert_eq!(x2.re as usize, base | 0b1000);
                assert_eq!(x3.re as usize, base | 0b1010);
                for x in [x0, x1, x2, x3] {
                    x.im += 1.0;
                }
            });
            assert!(state.iter().all(|a| a.im == 1.0));
        }
    }

    #[test]
    fn test_pairs_with_partner() {
        let mut mine = indexed(8);
        let theirs: Vec<Complex64> = indexed(8).iter().map(|a| *a * 10.0).collect();
        for_each_pair_with(&mut mine, &theirs, 0, false, |a, b, c, d| {
            assert_eq!(c.re, a.re * 10.0);
            assert_eq!(d.re, b.re * 10.0);
        });
    }

    #[test]
    fn test_use_parallel_threshold() {
        assert!(!use_parallel(8, 4));
        assert!(!use_parallel(1 << 20, 200));
    }
}
