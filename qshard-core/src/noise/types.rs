//! Kraus operators, validated Kraus sets and the channel trait

use crate::error::QuantumError;
use crate::matrix::{gram, identity_deviation, Matrix2, Matrix4, ZERO};
use crate::Result;
use std::fmt;

/// Matrix of a single Kraus operator, sized by the number of qubits it acts on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KrausMatrix {
    /// 2×2 operator on one qubit
    One(Matrix2),
    /// 4×4 operator on two qubits, first qubit as the most significant bit
    Two(Matrix4),
}

impl KrausMatrix {
    /// Number of qubits the operator acts on
    #[inline]
    pub fn num_qubits(&self) -> usize {
        match self {
            KrausMatrix::One(_) => 1,
            KrausMatrix::Two(_) => 2,
        }
    }

    /// `K† K` in the same shape
    pub fn gram(&self) -> KrausMatrix {
        match self {
            KrausMatrix::One(m) => KrausMatrix::One(gram(m)),
            KrausMatrix::Two(m) => KrausMatrix::Two(gram(m)),
        }
    }
}

/// A Kraus operator together with its precomputed `K† K`
///
/// Branch probabilities are `⟨ψ|K†K|ψ⟩`, so the gram matrix is what the
/// channel applicator actually needs when it can evaluate probabilities from a
/// reduced density matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct KrausOperator {
    matrix: KrausMatrix,
    gram: KrausMatrix,
}

impl KrausOperator {
    pub fn new(matrix: KrausMatrix) -> Self {
        Self {
            gram: matrix.gram(),
            matrix,
        }
    }

    /// Single-qubit operator
    pub fn one(matrix: Matrix2) -> Self {
        Self::new(KrausMatrix::One(matrix))
    }

    /// Two-qubit operator
    pub fn two(matrix: Matrix4) -> Self {
        Self::new(KrausMatrix::Two(matrix))
    }

    #[inline]
    pub fn matrix(&self) -> &KrausMatrix {
        &self.matrix
    }

    /// `K† K`
    #[inline]
    pub fn gram(&self) -> &KrausMatrix {
        &self.gram
    }

    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.matrix.num_qubits()
    }
}

/// An ordered, non-empty set of Kraus operators with Σ K_i† K_i = I
///
/// The completeness relation is checked at construction against the given
/// tolerance; the measured deviation is kept so the channel applicator can
/// re-check it against its own configured tolerance.
///
/// # Example
/// ```
/// use qshard_core::matrix::{identity, scale};
/// use qshard_core::{Complex64, KrausOperator, KrausSet};
///
/// let half = Complex64::new(0.5f64.sqrt(), 0.0);
/// let k = scale(&identity::<2>(), half);
/// let set = KrausSet::new(vec![KrausOperator::one(k), KrausOperator::one(k)], 1e-10).unwrap();
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.num_qubits(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KrausSet {
    operators: Vec<KrausOperator>,
    deviation: f64,
}

impl KrausSet {
    /// Validate and build a Kraus set
    ///
    /// # Errors
    /// - [`QuantumError::EmptyKrausSet`] for an empty list
    /// - [`QuantumError::MixedKrausArity`] if operators act on different qubit counts
    /// - [`QuantumError::NotTracePreserving`] if Σ K†K deviates from I by more than `tolerance`
    pub fn new(operators: Vec<KrausOperator>, tolerance: f64) -> Result<Self> {
        let deviation = completeness_deviation(&operators)?;
        if !(deviation.is_finite() && deviation <= tolerance) {
            return Err(QuantumError::NotTracePreserving {
                deviation,
                tolerance,
            });
        }
        Ok(Self {
            operators,
            deviation,
        })
    }

    /// Build a set without the completeness check
    ///
    /// The deviation is still measured; the channel applicator rejects the set
    /// if it exceeds the register's trace tolerance.
    pub fn new_unchecked(operators: Vec<KrausOperator>) -> Result<Self> {
        let deviation = completeness_deviation(&operators)?;
        Ok(Self {
            operators,
            deviation,
        })
    }

    /// The trivial channel `{I}` on one or two qubits
    pub fn identity(num_qubits: usize) -> Result<Self> {
        let op = match num_qubits {
            1 => KrausOperator::one(crate::matrix::identity::<2>()),
            2 => KrausOperator::two(crate::matrix::identity::<4>()),
            n => {
                return Err(QuantumError::ArityMismatch {
                    expected: 2,
                    actual: n,
                })
            }
        };
        Ok(Self {
            operators: vec![op],
            deviation: 0.0,
        })
    }

    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.operators[0].num_qubits()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn operators(&self) -> &[KrausOperator] {
        &self.operators
    }

    /// Largest elementwise deviation of Σ K†K from the identity
    pub fn completeness_deviation(&self) -> f64 {
        self.deviation
    }
}

fn completeness_deviation(operators: &[KrausOperator]) -> Result<f64> {
    let first = operators.first().ok_or(QuantumError::EmptyKrausSet)?;
    match first.matrix() {
        KrausMatrix::One(_) => {
            let mut sum = [[ZERO; 2]; 2];
            for op in operators {
                let KrausMatrix::One(g) = op.gram() else {
                    return Err(QuantumError::MixedKrausArity);
                };
                accumulate(&mut sum, g);
            }
            Ok(identity_deviation(&sum))
        }
        KrausMatrix::Two(_) => {
            let mut sum = [[ZERO; 4]; 4];
            for op in operators {
                let KrausMatrix::Two(g) = op.gram() else {
                    return Err(QuantumError::MixedKrausArity);
                };
                accumulate(&mut sum, g);
            }
            Ok(identity_deviation(&sum))
        }
    }
}

fn accumulate<const D: usize>(
    sum: &mut [[num_complex::Complex64; D]; D],
    term: &[[num_complex::Complex64; D]; D],
) {
    for i in 0..D {
        for j in 0..D {
            sum[i][j] += term[i][j];
        }
    }
}

/// A named source of Kraus sets
///
/// ```ignore
/// #[derive(Debug)]
/// struct Leakage { rate: f64 }
///
/// impl NoiseChannel for Leakage {
///     fn kraus_set(&self) -> Result<KrausSet> { ... }
///     fn num_qubits(&self) -> usize { 1 }
///     fn name(&self) -> &str { "leakage" }
/// }
/// ```
pub trait NoiseChannel: Send + Sync + fmt::Debug {
    /// Validated Kraus operators for this channel
    fn kraus_set(&self) -> Result<KrausSet>;

    /// Number of qubits this channel acts on
    fn num_qubits(&self) -> usize;

    /// Short name, e.g. `"depolarizing"`
    fn name(&self) -> &str;

    fn description(&self) -> String {
        format!("{}-qubit {} channel", self.num_qubits(), self.name())
    }
}
