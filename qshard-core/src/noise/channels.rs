//! Common single- and two-qubit noise channels

use super::types::{KrausOperator, KrausSet, NoiseChannel};
use crate::error::QuantumError;
use crate::matrix::{identity, kron, scale, Matrix2, ONE, ZERO};
use crate::Result;
use num_complex::Complex64;

/// Tolerance used when the built-in channels validate their own Kraus sets
const CHANNEL_TOLERANCE: f64 = 1e-12;

const PAULI_X: Matrix2 = [[ZERO, ONE], [ONE, ZERO]];
const PAULI_Y: Matrix2 = [
    [ZERO, Complex64::new(0.0, -1.0)],
    [Complex64::new(0.0, 1.0), ZERO],
];
const PAULI_Z: Matrix2 = [[ONE, ZERO], [ZERO, Complex64::new(-1.0, 0.0)]];

fn real(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

fn check_probability(name: &str, value: f64, max: f64) -> Result<()> {
    if (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(QuantumError::ValidationError(format!(
            "{name} must be in [0, {max}], got {value}"
        )))
    }
}

fn check_times(time_name: &str, time: f64, gate_time: f64) -> Result<()> {
    if time <= 0.0 {
        return Err(QuantumError::ValidationError(format!(
            "{time_name} must be positive"
        )));
    }
    if gate_time < 0.0 {
        return Err(QuantumError::ValidationError(
            "Gate time must be non-negative".to_string(),
        ));
    }
    Ok(())
}

/// Depolarizing noise channel
///
/// With probability `p` a uniformly random Pauli error hits the qubit.
///
/// # Kraus Operators
/// ```text
/// K₀ = √(1-p) I
/// K₁ = √(p/3) X
/// K₂ = √(p/3) Y
/// K₃ = √(p/3) Z
/// ```
///
/// # Example
/// ```
/// use qshard_core::noise::{DepolarizingChannel, NoiseChannel};
///
/// let channel = DepolarizingChannel::new(0.01).unwrap();
/// assert_eq!(channel.kraus_set().unwrap().len(), 4);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DepolarizingChannel {
    error_probability: f64,
}

impl DepolarizingChannel {
    /// # Errors
    /// Returns error if probability is not in [0, 1]
    pub fn new(error_probability: f64) -> Result<Self> {
        check_probability("Error probability", error_probability, 1.0)?;
        Ok(Self { error_probability })
    }

    pub fn error_probability(&self) -> f64 {
        self.error_probability
    }
}

impl NoiseChannel for DepolarizingChannel {
    fn kraus_set(&self) -> Result<KrausSet> {
        let p = self.error_probability;
        let keep = real((1.0 - p).sqrt());
        let flip = real((p / 3.0).sqrt());
        KrausSet::new(
            vec![
                KrausOperator::one(scale(&identity::<2>(), keep)),
                KrausOperator::one(scale(&PAULI_X, flip)),
                KrausOperator::one(scale(&PAULI_Y, flip)),
                KrausOperator::one(scale(&PAULI_Z, flip)),
            ],
            CHANNEL_TOLERANCE,
        )
    }

    fn num_qubits(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "depolarizing"
    }
}

/// Two-qubit depolarizing channel
///
/// With probability `p` one of the 15 non-identity two-qubit Paulis is
/// applied, each with probability `p/15`.
#[derive(Debug, Clone, Copy)]
pub struct TwoQubitDepolarizing {
    error_probability: f64,
}

impl TwoQubitDepolarizing {
    pub fn new(error_probability: f64) -> Result<Self> {
        check_probability("Error probability", error_probability, 1.0)?;
        Ok(Self { error_probability })
    }

    pub fn error_probability(&self) -> f64 {
        self.error_probability
    }
}

impl NoiseChannel for TwoQubitDepolarizing {
    fn kraus_set(&self) -> Result<KrausSet> {
        let p = self.error_probability;
        let paulis = [identity::<2>(), PAULI_X, PAULI_Y, PAULI_Z];
        let keep = real((1.0 - p).sqrt());
        let flip = real((p / 15.0).sqrt());

        let mut operators = Vec::with_capacity(16);
        for (i, a) in paulis.iter().enumerate() {
            for (j, b) in paulis.iter().enumerate() {
                let factor = if i == 0 && j == 0 { keep } else { flip };
                operators.push(KrausOperator::two(scale(&kron(a, b), factor)));
            }
        }
        KrausSet::new(operators, CHANNEL_TOLERANCE)
    }

    fn num_qubits(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "two_qubit_depolarizing"
    }
}

/// Amplitude damping channel (T1 relaxation)
///
/// # Kraus Operators
/// ```text
/// K₀ = [[1, 0], [0, √(1-γ)]]
/// K₁ = [[0, √γ], [0, 0]]
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AmplitudeDamping {
    gamma: f64,
}

impl AmplitudeDamping {
    /// # Arguments
    /// * `gamma` - Decay probability γ ∈ [0, 1]
    pub fn new(gamma: f64) -> Result<Self> {
        check_probability("Gamma", gamma, 1.0)?;
        Ok(Self { gamma })
    }

    /// Create from T1 relaxation time and gate duration
    ///
    /// Computes γ = 1 - exp(-gate_time/T1)
    pub fn from_t1(t1: f64, gate_time: f64) -> Result<Self> {
        check_times("T1", t1, gate_time)?;
        Self::new(1.0 - (-gate_time / t1).exp())
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl NoiseChannel for AmplitudeDamping {
    fn kraus_set(&self) -> Result<KrausSet> {
        let g = self.gamma;
        KrausSet::new(
            vec![
                KrausOperator::one([[ONE, ZERO], [ZERO, real((1.0 - g).sqrt())]]),
                KrausOperator::one([[ZERO, real(g.sqrt())], [ZERO, ZERO]]),
            ],
            CHANNEL_TOLERANCE,
        )
    }

    fn num_qubits(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "amplitude_damping"
    }
}

/// Phase damping channel (pure dephasing)
///
/// # Kraus Operators
/// ```text
/// K₀ = √(1-λ) I
/// K₁ = √λ Z
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PhaseDamping {
    lambda: f64,
}

impl PhaseDamping {
    /// # Arguments
    /// * `lambda` - Dephasing probability λ ∈ [0, 0.5]
    pub fn new(lambda: f64) -> Result<Self> {
        check_probability("Lambda", lambda, 0.5)?;
        Ok(Self { lambda })
    }

    /// Computes λ = (1 - exp(-gate_time/T2))/2
    pub fn from_t2(t2: f64, gate_time: f64) -> Result<Self> {
        check_times("T2", t2, gate_time)?;
        Self::new((1.0 - (-gate_time / t2).exp()) / 2.0)
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl NoiseChannel for PhaseDamping {
    fn kraus_set(&self) -> Result<KrausSet> {
        pauli_mixture(self.lambda, &PAULI_Z)
    }

    fn num_qubits(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "phase_damping"
    }
}

/// Bit flip: X with probability `p`
#[derive(Debug, Clone, Copy)]
pub struct BitFlip {
    probability: f64,
}

impl BitFlip {
    pub fn new(probability: f64) -> Result<Self> {
        check_probability("Flip probability", probability, 1.0)?;
        Ok(Self { probability })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl NoiseChannel for BitFlip {
    fn kraus_set(&self) -> Result<KrausSet> {
        pauli_mixture(self.probability, &PAULI_X)
    }

    fn num_qubits(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "bit_flip"
    }
}

/// Phase flip: Z with probability `p`
#[derive(Debug, Clone, Copy)]
pub struct PhaseFlip {
    probability: f64,
}

impl PhaseFlip {
    pub fn new(probability: f64) -> Result<Self> {
        check_probability("Flip probability", probability, 1.0)?;
        Ok(Self { probability })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl NoiseChannel for PhaseFlip {
    fn kraus_set(&self) -> Result<KrausSet> {
        pauli_mixture(self.probability, &PAULI_Z)
    }

    fn num_qubits(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "phase_flip"
    }
}

/// `{√(1-p) I, √p P}`
fn pauli_mixture(p: f64, pauli: &Matrix2) -> Result<KrausSet> {
    KrausSet::new(
        vec![
            KrausOperator::one(scale(&identity::<2>(), real((1.0 - p).sqrt()))),
            KrausOperator::one(scale(pauli, real(p.sqrt()))),
        ],
        CHANNEL_TOLERANCE,
    )
}
