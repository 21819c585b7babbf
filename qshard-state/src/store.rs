//! Per-worker amplitude store
//!
//! A worker owns `2^L` consecutive amplitudes of the global vector, where `L`
//! is the number of local data positions. The store knows nothing about
//! which worker it belongs to; global placement is the register's business.

use crate::error::{Result, StateError};
use crate::kernels;
use num_complex::Complex64;
use std::fmt;

/// Contiguous local slice of the distributed amplitude vector
#[derive(Clone, PartialEq)]
pub struct AmplitudeStore {
    local_qubits: usize,
    amplitudes: Vec<Complex64>,
}

impl AmplitudeStore {
    /// All-zero slice of `2^local_qubits` amplitudes
    ///
    /// A worker that does not own the |0…0⟩ amplitude starts out all zero.
    pub fn zeros(local_qubits: usize) -> Self {
        Self {
            local_qubits,
            amplitudes: vec![Complex64::new(0.0, 0.0); 1usize << local_qubits],
        }
    }

    /// Slice holding a single unit amplitude at `index`
    pub fn basis(local_qubits: usize, index: usize) -> Result<Self> {
        let mut store = Self::zeros(local_qubits);
        store.set_basis(index)?;
        Ok(store)
    }

    /// Wrap an existing amplitude buffer
    ///
    /// # Errors
    /// Returns [`StateError::DimensionMismatch`] if the buffer is not `2^local_qubits` long.
    pub fn from_amplitudes(local_qubits: usize, amplitudes: Vec<Complex64>) -> Result<Self> {
        let expected = 1usize << local_qubits;
        if amplitudes.len() != expected {
            return Err(StateError::DimensionMismatch {
                expected,
                actual: amplitudes.len(),
            });
        }
        Ok(Self {
            local_qubits,
            amplitudes,
        })
    }

    /// Number of local data positions `L`
    #[inline]
    pub fn local_qubits(&self) -> usize {
        self.local_qubits
    }

    /// Number of amplitudes, `2^L`
    #[inline]
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    #[inline]
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    #[inline]
    pub fn amplitudes_mut(&mut self) -> &mut [Complex64] {
        &mut self.amplitudes
    }

    /// Check that `position` addresses a local bit
    pub fn check_local(&self, position: usize) -> Result<()> {
        if position < self.local_qubits {
            Ok(())
        } else {
            Err(StateError::PositionNotLocal {
                position,
                local_qubits: self.local_qubits,
            })
        }
    }

    /// Zero every amplitude
    pub fn clear(&mut self) {
        self.amplitudes.fill(Complex64::new(0.0, 0.0));
    }

    /// Zero the slice and put a unit amplitude at `index`
    pub fn set_basis(&mut self, index: usize) -> Result<()> {
        if index >= self.amplitudes.len() {
            return Err(StateError::IndexOutOfRange {
                index,
                dimension: self.amplitudes.len(),
            });
        }
        self.clear();
        self.amplitudes[index] = Complex64::new(1.0, 0.0);
        Ok(())
    }

    /// Replace the whole slice, keeping the dimension
    pub fn replace(&mut self, amplitudes: Vec<Complex64>) -> Result<()> {
        if amplitudes.len() != self.amplitudes.len() {
            return Err(StateError::DimensionMismatch {
                expected: self.amplitudes.len(),
                actual: amplitudes.len(),
            });
        }
        self.amplitudes = amplitudes;
        Ok(())
    }

    /// Swap buffers with another store of the same size
    pub fn swap_with(&mut self, other: &mut AmplitudeStore) -> Result<()> {
        if other.len() != self.len() {
            return Err(StateError::DimensionMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        std::mem::swap(&mut self.amplitudes, &mut other.amplitudes);
        Ok(())
    }

    /// Local contribution to the squared norm
    pub fn norm_sqr(&self, parallel_threshold: usize) -> f64 {
        kernels::norm_sqr(&self.amplitudes, parallel_threshold)
    }

    /// Multiply every amplitude by a real factor
    pub fn scale(&mut self, factor: f64, parallel_threshold: usize) {
        kernels::scale(&mut self.amplitudes, factor, parallel_threshold);
    }
}

impl fmt::Debug for AmplitudeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmplitudeStore")
            .field("local_qubits", &self.local_qubits)
            .field("len", &self.amplitudes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zeros() {
        let store = AmplitudeStore::zeros(3);
        assert_eq!(store.len(), 8);
        assert_eq!(store.local_qubits(), 3);
        assert_eq!(store.norm_sqr(14), 0.0);
    }

    #[test]
    fn test_basis() {
        let store = AmplitudeStore::basis(2, 3).unwrap();
        assert_eq!(store.amplitudes()[3], Complex64::new(1.0, 0.0));
        assert_relative_eq!(store.norm_sqr(14), 1.0);
        assert!(AmplitudeStore::basis(2, 4).is_err());
    }

    #[test]
    fn test_zero_local_qubits() {
        let store = AmplitudeStore::basis(0, 0).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.check_local(0).is_err());
    }

    #[test]
    fn test_from_amplitudes_dimension() {
        let err = AmplitudeStore::from_amplitudes(2, vec![Complex64::new(0.0, 0.0); 3]).unwrap_err();
        assert_eq!(
            err,
            StateError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_replace_and_scale() {
        let mut store = AmplitudeStore::zeros(1);
        store
            .replace(vec![Complex64::new(3.0, 0.0), Complex64::new(0.0, 4.0)])
            .unwrap();
        assert_relative_eq!(store.norm_sqr(14), 25.0);
        store.scale(0.2, 14);
        assert_relative_eq!(store.norm_sqr(14), 1.0, epsilon = 1e-12);
        assert!(store.replace(vec![]).is_err());
    }
}
