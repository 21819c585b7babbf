//! Stochastic application of Kraus channels
//!
//! A channel `{K_i}` is unravelled into one branch per call: the branch
//! probabilities `p_i = ‖K_i ψ‖²` are computed collectively, one value of
//! the state-shared stream selects a branch, and the register becomes
//! `K_i ψ / ‖K_i ψ‖`. Every member of the team selects the same branch.

use crate::error::{Result, SimulatorError};
use crate::register::Register;
use num_complex::Complex64;
use qshard_core::{KrausMatrix, KrausSet, Matrix2, Matrix4, NoiseChannel, QuantumError};
use qshard_state::kernels;
use tracing::debug;

/// `Re Tr(G ρ) = Σ_ab G[a][b] ρ[b][a]`
fn trace_product<const D: usize>(gram: &[[Complex64; D]; D], rho: &[[Complex64; D]; D]) -> f64 {
    let mut total = 0.0;
    for a in 0..D {
        for b in 0..D {
            total += (gram[a][b] * rho[b][a]).re;
        }
    }
    total
}

/// Flatten a density matrix into interleaved (re, im) pairs for a reduction
fn flatten<const D: usize>(rho: &[[Complex64; D]; D]) -> Vec<f64> {
    rho.iter()
        .flat_map(|row| row.iter().flat_map(|z| [z.re, z.im]))
        .collect()
}

fn unflatten<const D: usize>(values: &[f64]) -> [[Complex64; D]; D] {
    let mut rho = [[Complex64::new(0.0, 0.0); D]; D];
    for (i, pair) in values.chunks_exact(2).enumerate() {
        rho[i / D][i % D] = Complex64::new(pair[0], pair[1]);
    }
    rho
}

/// First branch, in order, whose cumulative probability exceeds `r · Σp`
///
/// Zero-probability branches are never returned.
pub(crate) fn select_branch(probabilities: &[f64], r: f64) -> usize {
    let total: f64 = probabilities.iter().sum();
    let target = r * total;
    let mut cumulative = 0.0;
    let mut last_possible = 0;
    for (i, &p) in probabilities.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        last_possible = i;
        cumulative += p;
        if target < cumulative {
            return i;
        }
    }
    last_possible
}

impl Register {
    fn check_channel(&self, qubits: &[usize], set: &KrausSet) -> Result<()> {
        if qubits.len() != set.num_qubits() {
            return Err(QuantumError::ArityMismatch {
                expected: set.num_qubits(),
                actual: qubits.len(),
            }
            .into());
        }
        self.check_qubits(qubits)?;
        let deviation = set.completeness_deviation();
        if !deviation.is_finite() || deviation > self.config.trace_tolerance {
            return Err(QuantumError::NotTracePreserving {
                deviation,
                tolerance: self.config.trace_tolerance,
            }
            .into());
        }
        Ok(())
    }

    fn apply_kraus_unchecked(&mut self, qubits: &[usize], matrix: &KrausMatrix) -> Result<()> {
        match matrix {
            KrausMatrix::One(m) => self.apply_1q_at(self.position(qubits[0]), m),
            KrausMatrix::Two(m) => {
                self.apply_2q_at(self.position(qubits[0]), self.position(qubits[1]), m)
            }
        }
    }

    /// `p_i = ‖K_i ψ‖²` for every operator of `set`; the state is not changed
    ///
    /// When every target is local this reduces a small density matrix
    /// and never touches the amplitudes. Otherwise each operator is applied
    /// to the live state, its norm reduced, and the state and layout restored.
    pub fn branch_probabilities(&mut self, qubits: &[usize], set: &KrausSet) -> Result<Vec<f64>> {
        self.check_channel(qubits, set)?;
        let positions: Vec<usize> = qubits.iter().map(|&q| self.position(q)).collect();
        let threshold = self.threshold();

        if positions.iter().all(|&p| self.is_local(p)) {
            let state = self.store.amplitudes();
            return match positions.as_slice() {
                [p] => {
                    let local = kernels::reduced_density_single(state, *p, threshold);
                    let rho: Matrix2 = unflatten(&self.comm.all_reduce_sum(&flatten(&local))?);
                    Ok(set
                        .operators()
                        .iter()
                        .map(|op| match op.gram() {
                            KrausMatrix::One(g) => trace_product(g, &rho),
                            KrausMatrix::Two(_) => 0.0,
                        })
                        .collect())
                }
                [first, second] => {
                    let local = kernels::reduced_density_two(state, *first, *second, threshold);
                    let rho: Matrix4 = unflatten(&self.comm.all_reduce_sum(&flatten(&local))?);
                    Ok(set
                        .operators()
                        .iter()
                        .map(|op| match op.gram() {
                            KrausMatrix::Two(g) => trace_product(g, &rho),
                            KrausMatrix::One(_) => 0.0,
                        })
                        .collect())
                }
                _ => Err(QuantumError::ArityMismatch {
                    expected: set.num_qubits(),
                    actual: qubits.len(),
                }
                .into()),
            };
        }

        let saved_store = self.store.clone();
        let saved_permutation = self.permutation.clone();
        let mut probabilities = Vec::with_capacity(set.len());
        for op in set.operators() {
            self.apply_kraus_unchecked(qubits, op.matrix())?;
            probabilities.push(self.norm_sqr()?);
            self.store = saved_store.clone();
            self.permutation = saved_permutation.clone();
        }
        Ok(probabilities)
    }

    /// Apply one randomly selected branch of `set` to `qubits`
    ///
    /// Returns the index of the applied operator.
    pub fn apply_channel(&mut self, qubits: &[usize], set: &KrausSet) -> Result<usize> {
        let probabilities = self.branch_probabilities(qubits, set)?;
        self.check_probabilities(&probabilities)?;
        let r = self.shared_draw()?;
        self.apply_branch(qubits, set, &probabilities, r)
    }

    /// Like [`Register::apply_channel`], with the selecting value supplied
    /// by the caller instead of the shared stream
    ///
    /// `r` must lie in `[0, 1)` and must be the same on every member.
    pub fn apply_channel_with(
        &mut self,
        qubits: &[usize],
        set: &KrausSet,
        r: f64,
    ) -> Result<usize> {
        if !(0.0..1.0).contains(&r) {
            return Err(SimulatorError::Precondition(format!(
                "branch selector must lie in [0, 1), got {r}"
            )));
        }
        let probabilities = self.branch_probabilities(qubits, set)?;
        self.check_probabilities(&probabilities)?;
        self.apply_branch(qubits, set, &probabilities, r)
    }

    /// Build the Kraus set of a noise model and apply it
    pub fn apply_noise<C>(&mut self, qubits: &[usize], channel: &C) -> Result<usize>
    where
        C: NoiseChannel + ?Sized,
    {
        let set = channel.kraus_set()?;
        self.apply_channel(qubits, &set)
    }

    fn check_probabilities(&self, probabilities: &[f64]) -> Result<()> {
        let total: f64 = probabilities.iter().sum();
        let tolerance = self.config.probability_tolerance;
        if !total.is_finite() || (total - 1.0).abs() > tolerance {
            return Err(SimulatorError::ProbabilityOutOfRange { total, tolerance });
        }
        Ok(())
    }

    fn apply_branch(
        &mut self,
        qubits: &[usize],
        set: &KrausSet,
        probabilities: &[f64],
        r: f64,
    ) -> Result<usize> {
        let branch = select_branch(probabilities, r);
        debug!(
            "worker {} selected Kraus branch {} of {} (p = {:.6})",
            self.global_rank(),
            branch,
            set.len(),
            probabilities[branch]
        );
        self.apply_kraus_unchecked(qubits, set.operators()[branch].matrix())?;
        self.normalize()?;
        Ok(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use approx::assert_relative_eq;
    use qshard_core::noise::{AmplitudeDamping, BitFlip, DepolarizingChannel};
    use qshard_core::KrausOperator;
    use qshard_gates::{ry, HADAMARD, PAULI_X};

    fn register(n: usize) -> Register {
        Register::single_seeded(n, EngineConfig::debug(), 5).unwrap()
    }

    #[test]
    fn test_select_branch_skips_zero_probability() {
        assert_eq!(select_branch(&[0.0, 1.0], 0.0), 1);
        assert_eq!(select_branch(&[0.5, 0.0, 0.5], 0.5), 2);
        assert_eq!(select_branch(&[0.25, 0.75], 0.1), 0);
        assert_eq!(select_branch(&[0.25, 0.75, 0.0], 0.999_999_999_999), 1);
    }

    #[test]
    fn test_identity_channel_is_noop() {
        let mut reg = register(2);
        reg.apply_1q(0, &ry(0.3)).unwrap();
        let before = reg.gather_amplitudes().unwrap();
        let set = KrausSet::identity(1).unwrap();
        assert_eq!(reg.apply_channel(&[0], &set).unwrap(), 0);
        let after = reg.gather_amplitudes().unwrap();
        for (a, b) in after.iter().zip(&before) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_branch_probabilities_amplitude_damping() {
        let mut reg = register(1);
        reg.apply_1q(0, &PAULI_X).unwrap();
        let set = AmplitudeDamping::new(0.3).unwrap().kraus_set().unwrap();
        let p = reg.branch_probabilities(&[0], &set).unwrap();
        assert_relative_eq!(p[0], 0.7, epsilon = 1e-12);
        assert_relative_eq!(p[1], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_chosen_branch_is_applied() {
        let mut reg = register(1);
        reg.apply_1q(0, &PAULI_X).unwrap();
        let set = AmplitudeDamping::new(0.3).unwrap().kraus_set().unwrap();
        // r = 0.8 lands past the first branch's 0.7
        assert_eq!(reg.apply_channel_with(&[0], &set, 0.8).unwrap(), 1);
        assert_relative_eq!(reg.probability(0, 0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(reg.norm_sqr().unwrap(), 1.0, epsilon = 1e-12);
        assert!(reg.apply_channel_with(&[0], &set, 1.0).is_err());
    }

    #[test]
    fn test_two_qubit_branch_probabilities() {
        let set = KrausSet::new(
            vec![
                KrausOperator::two(qshard_core::matrix::scale(
                    &qshard_core::matrix::identity::<4>(),
                    Complex64::new(0.6, 0.0),
                )),
                KrausOperator::two(qshard_core::matrix::scale(
                    &qshard_core::matrix::kron(&PAULI_X, &HADAMARD),
                    Complex64::new(0.8, 0.0),
                )),
            ],
            1e-12,
        )
        .unwrap();
        let mut reg = register(3);
        reg.apply_1q(0, &ry(0.9)).unwrap();
        reg.apply_1q(2, &HADAMARD).unwrap();
        let p = reg.branch_probabilities(&[2, 0], &set).unwrap();
        assert_relative_eq!(p[0], 0.36, epsilon = 1e-12);
        assert_relative_eq!(p[1], 0.64, epsilon = 1e-12);
    }

    #[test]
    fn test_channel_validation() {
        let mut reg = register(2);
        let set = BitFlip::new(0.1).unwrap().kraus_set().unwrap();
        let before = reg.gather_amplitudes().unwrap();
        assert!(reg.apply_channel(&[0, 1], &set).is_err());
        assert!(reg.apply_channel(&[2], &set).is_err());

        let lossy = KrausSet::new_unchecked(vec![KrausOperator::one(qshard_core::matrix::scale(
            &qshard_core::matrix::identity::<2>(),
            Complex64::new(0.5, 0.0),
        ))])
        .unwrap();
        assert!(reg.apply_channel(&[0], &lossy).is_err());
        assert_eq!(reg.gather_amplitudes().unwrap(), before);
    }

    #[test]
    fn test_depolarizing_keeps_norm() {
        let mut reg = register(2);
        reg.apply_1q(0, &HADAMARD).unwrap();
        let channel = DepolarizingChannel::new(0.5).unwrap();
        for _ in 0..10 {
            let branch = reg.apply_noise(&[1], &channel).unwrap();
            assert!(branch < 4);
            assert_relative_eq!(reg.norm_sqr().unwrap(), 1.0, epsilon = 1e-10);
        }
    }
}
