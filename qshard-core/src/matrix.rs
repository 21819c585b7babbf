//! Fixed-size complex matrix helpers
//!
//! Gate and Kraus matrices are small (2×2 or 4×4), so they are stored as
//! nested arrays and manipulated with const-generic helpers. Matrices are
//! row-major: `m[row][col]`.
//!
//! For 4×4 matrices addressed to `(first, second)` qubits the basis index is
//! `2 * bit(first) + bit(second)`, i.e. the first qubit is the most
//! significant bit. With `first` as control this gives the textbook CNOT:
//!
//! ```
//! use qshard_core::matrix::{controlled, is_swap, Matrix2, ONE, ZERO};
//!
//! let x: Matrix2 = [[ZERO, ONE], [ONE, ZERO]];
//! let cnot = controlled(&x);
//! assert_eq!(cnot[2][3], ONE);
//! assert_eq!(cnot[3][2], ONE);
//! assert!(!is_swap(&cnot, 1e-12));
//! ```

use crate::error::QuantumError;
use crate::Result;
use num_complex::Complex64;

/// 2×2 complex matrix (single-qubit operator)
pub type Matrix2 = [[Complex64; 2]; 2];

/// 4×4 complex matrix (two-qubit operator)
pub type Matrix4 = [[Complex64; 4]; 4];

pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);
pub const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Identity matrix of size D
pub fn identity<const D: usize>() -> [[Complex64; D]; D] {
    let mut m = [[ZERO; D]; D];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = ONE;
    }
    m
}

/// Conjugate transpose
pub fn adjoint<const D: usize>(m: &[[Complex64; D]; D]) -> [[Complex64; D]; D] {
    let mut result = [[ZERO; D]; D];
    for i in 0..D {
        for j in 0..D {
            result[i][j] = m[j][i].conj();
        }
    }
    result
}

/// Matrix product `a × b`
pub fn multiply<const D: usize>(
    a: &[[Complex64; D]; D],
    b: &[[Complex64; D]; D],
) -> [[Complex64; D]; D] {
    let mut result = [[ZERO; D]; D];
    for i in 0..D {
        for j in 0..D {
            let mut acc = ZERO;
            for k in 0..D {
                acc += a[i][k] * b[k][j];
            }
            result[i][j] = acc;
        }
    }
    result
}

/// `m† m`, used for unitarity checks and Kraus branch probabilities
pub fn gram<const D: usize>(m: &[[Complex64; D]; D]) -> [[Complex64; D]; D] {
    multiply(&adjoint(m), m)
}

/// Largest elementwise distance from the identity
///
/// Infinite if any entry is not finite.
pub fn identity_deviation<const D: usize>(m: &[[Complex64; D]; D]) -> f64 {
    let mut worst = 0.0f64;
    for i in 0..D {
        for j in 0..D {
            let expected = if i == j { ONE } else { ZERO };
            let d = (m[i][j] - expected).norm();
            if !d.is_finite() {
                return f64::INFINITY;
            }
            worst = worst.max(d);
        }
    }
    worst
}

/// True if every entry has finite real and imaginary parts
pub fn is_finite<const D: usize>(m: &[[Complex64; D]; D]) -> bool {
    m.iter().flatten().all(|z| z.is_finite())
}

/// Largest elementwise deviation of `U†U` from the identity
pub fn unitarity_deviation<const D: usize>(m: &[[Complex64; D]; D]) -> f64 {
    identity_deviation(&gram(m))
}

/// Fail with [`QuantumError::NonUnitary`] unless `U†U ≈ I`
///
/// Non-finite entries always fail.
pub fn check_unitary<const D: usize>(m: &[[Complex64; D]; D], tolerance: f64) -> Result<()> {
    let deviation = if is_finite(m) {
        unitarity_deviation(m)
    } else {
        f64::INFINITY
    };
    if deviation.is_finite() && deviation <= tolerance {
        Ok(())
    } else {
        Err(QuantumError::NonUnitary {
            deviation,
            tolerance,
        })
    }
}

/// True if every off-diagonal entry is within `tolerance` of zero
pub fn is_diagonal<const D: usize>(m: &[[Complex64; D]; D], tolerance: f64) -> bool {
    for i in 0..D {
        for j in 0..D {
            if i != j && exceeds(m[i][j].norm(), tolerance) {
                return false;
            }
        }
    }
    true
}

// NaN never counts as within tolerance
fn exceeds(distance: f64, tolerance: f64) -> bool {
    distance.is_nan() || distance > tolerance
}

/// The two-qubit SWAP permutation matrix
pub fn swap_matrix() -> Matrix4 {
    [
        [ONE, ZERO, ZERO, ZERO],
        [ZERO, ZERO, ONE, ZERO],
        [ZERO, ONE, ZERO, ZERO],
        [ZERO, ZERO, ZERO, ONE],
    ]
}

/// True if `m` is the SWAP matrix (pure relabelling, no arithmetic needed)
pub fn is_swap(m: &Matrix4, tolerance: f64) -> bool {
    let swap = swap_matrix();
    for i in 0..4 {
        for j in 0..4 {
            if exceeds((m[i][j] - swap[i][j]).norm(), tolerance) {
                return false;
            }
        }
    }
    true
}

/// Kronecker product `a ⊗ b`; `a` acts on the most significant bit
pub fn kron(a: &Matrix2, b: &Matrix2) -> Matrix4 {
    let mut result = [[ZERO; 4]; 4];
    for i in 0..2 {
        for j in 0..2 {
            for k in 0..2 {
                for l in 0..2 {
                    result[2 * i + k][2 * j + l] = a[i][j] * b[k][l];
                }
            }
        }
    }
    result
}

/// Controlled-U with the control on the most significant bit
pub fn controlled(u: &Matrix2) -> Matrix4 {
    let mut result = identity::<4>();
    result[2][2] = u[0][0];
    result[2][3] = u[0][1];
    result[3][2] = u[1][0];
    result[3][3] = u[1][1];
    result
}

/// Multiply every entry by a complex scalar
pub fn scale<const D: usize>(m: &[[Complex64; D]; D], factor: Complex64) -> [[Complex64; D]; D] {
    let mut result = *m;
    for row in result.iter_mut() {
        for entry in row.iter_mut() {
            *entry *= factor;
        }
    }
    result
}

/// Exchange the roles of the two qubits of a 4×4 operator
///
/// Equivalent to `SWAP · m · SWAP`.
pub fn swap_operands(m: &Matrix4) -> Matrix4 {
    const FLIP: [usize; 4] = [0, 2, 1, 3];
    let mut result = [[ZERO; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            result[FLIP[i]][FLIP[j]] = m[i][j];
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hadamard() -> Matrix2 {
        let h = std::f64::consts::FRAC_1_SQRT_2;
        [
            [Complex64::new(h, 0.0), Complex64::new(h, 0.0)],
            [Complex64::new(h, 0.0), Complex64::new(-h, 0.0)],
        ]
    }

    #[test]
    fn test_identity_is_unitary() {
        assert!(check_unitary(&identity::<2>(), 1e-12).is_ok());
        assert!(check_unitary(&identity::<4>(), 1e-12).is_ok());
    }

    #[test]
    fn test_hadamard_is_unitary() {
        assert!(unitarity_deviation(&hadamard()) < 1e-12);
    }

    #[test]
    fn test_non_unitary_rejected() {
        let m: Matrix2 = [[ONE, ONE], [ZERO, ONE]];
        let err = check_unitary(&m, 1e-10).unwrap_err();
        assert!(matches!(err, QuantumError::NonUnitary { .. }));
    }

    #[test]
    fn test_nan_rejected() {
        let m: Matrix2 = [[Complex64::new(f64::NAN, 0.0), ZERO], [ZERO, ONE]];
        assert!(check_unitary(&m, 1e-10).is_err());
        assert_eq!(identity_deviation(&m), f64::INFINITY);

        // a NaN off the diagonal must not pass for zero
        let off: Matrix2 = [[ONE, Complex64::new(0.0, f64::NAN)], [ZERO, ONE]];
        assert!(!is_diagonal(&off, 0.0));
        assert!(check_unitary(&off, 1e-10).is_err());

        let mut swap = swap_matrix();
        swap[0][3] = Complex64::new(f64::NAN, 0.0);
        assert!(!is_swap(&swap, 0.0));

        let inf: Matrix2 = [[Complex64::new(f64::INFINITY, 0.0), ZERO], [ZERO, ONE]];
        assert!(check_unitary(&inf, 1e-10).is_err());
    }

    #[test]
    fn test_kron_ordering() {
        let x: Matrix2 = [[ZERO, ONE], [ONE, ZERO]];
        let m = kron(&x, &identity::<2>());
        // X on the most significant bit maps |00> to |10>
        assert_eq!(m[2][0], ONE);
        assert_eq!(m[1][0], ZERO);
    }

    #[test]
    fn test_swap_operands_of_cnot() {
        let x: Matrix2 = [[ZERO, ONE], [ONE, ZERO]];
        let cnot = controlled(&x);
        let flipped = swap_operands(&cnot);
        // control now on the least significant bit: |01> <-> |11>
        assert_eq!(flipped[3][1], ONE);
        assert_eq!(flipped[1][3], ONE);
        assert_eq!(flipped[2][2], ONE);
    }

    #[test]
    fn test_is_diagonal() {
        let z: Matrix2 = [[ONE, ZERO], [ZERO, -ONE]];
        assert!(is_diagonal(&z, 1e-12));
        assert!(!is_diagonal(&hadamard(), 1e-12));
    }

    #[test]
    fn test_gram_of_scaled_identity() {
        let m = scale(&identity::<2>(), Complex64::new(0.5, 0.0));
        let g = gram(&m);
        assert_relative_eq!(g[0][0].re, 0.25, epsilon = 1e-12);
        assert_relative_eq!(g[1][1].re, 0.25, epsilon = 1e-12);
    }
}
