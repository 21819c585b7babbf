//! Measurement, normalization and Pauli expectation values

use crate::error::{Result, SimulatorError};
use crate::register::Register;
use num_complex::Complex64;
use qshard_state::{kernels, observable::masked_overlap, PauliMasks, PauliTerm, StateError};
use tracing::debug;

impl Register {
    fn check_outcome(outcome: u8) -> Result<usize> {
        match outcome {
            0 | 1 => Ok(outcome as usize),
            _ => Err(SimulatorError::Precondition(format!(
                "measurement outcome must be 0 or 1, got {outcome}"
            ))),
        }
    }

    /// This worker's share of P(qubit = outcome)
    fn local_probability(&self, position: usize, outcome: usize) -> f64 {
        if self.is_local(position) {
            kernels::probability_of_bit(self.store.amplitudes(), position, outcome, self.threshold())
        } else if self.worker_bit(position) == outcome {
            self.store.norm_sqr(self.threshold())
        } else {
            0.0
        }
    }

    /// Probability of reading `outcome` on `qubit`; the state is not changed
    pub fn probability(&self, qubit: usize, outcome: u8) -> Result<f64> {
        self.check_qubit(qubit)?;
        let outcome = Self::check_outcome(outcome)?;
        let local = self.local_probability(self.position(qubit), outcome);
        Ok(self.comm.all_reduce_sum(&[local])?[0])
    }

    /// Project `qubit` onto `outcome` without renormalizing
    pub fn collapse(&mut self, qubit: usize, outcome: u8) -> Result<()> {
        self.check_qubit(qubit)?;
        let outcome = Self::check_outcome(outcome)?;
        let position = self.position(qubit);
        if self.is_local(position) {
            let threshold = self.threshold();
            kernels::zero_bit(self.store.amplitudes_mut(), position, outcome, threshold);
        } else if self.worker_bit(position) != outcome {
            self.store.clear();
        }
        Ok(())
    }

    /// Rescale the register to unit norm
    pub fn normalize(&mut self) -> Result<()> {
        let norm_sqr = self.norm_sqr()?;
        if !norm_sqr.is_finite() {
            return Err(StateError::NonFiniteNorm { norm: norm_sqr }.into());
        }
        if norm_sqr == 0.0 {
            return Err(StateError::ZeroNorm.into());
        }
        let threshold = self.threshold();
        self.store.scale(1.0 / norm_sqr.sqrt(), threshold);
        Ok(())
    }

    /// Measure `qubit` in the computational basis
    ///
    /// The outcome comes from one draw of the state-shared stream, so every
    /// member collapses the same way. Outcomes of zero probability are never
    /// chosen.
    pub fn measure(&mut self, qubit: usize) -> Result<u8> {
        self.check_qubit(qubit)?;
        let position = self.position(qubit);
        let local = [
            self.local_probability(position, 1),
            self.store.norm_sqr(self.threshold()),
        ];
        let reduced = self.comm.all_reduce_sum(&local)?;
        let (p1, total) = (reduced[0], reduced[1]);
        if total == 0.0 {
            return Err(StateError::ZeroNorm.into());
        }

        let r = self.shared_draw()?;
        let outcome = u8::from(r * total < p1);
        debug!(
            "worker {} measured qubit {} = {} (p1 = {:.6})",
            self.global_rank(),
            qubit,
            outcome,
            p1 / total
        );
        self.collapse(qubit, outcome)?;
        self.normalize()?;
        Ok(outcome)
    }

    /// ⟨ψ|P|ψ⟩ for a weighted Pauli product, for a normalized register
    pub fn expectation(&self, term: &PauliTerm) -> Result<f64> {
        let qubits: Vec<usize> = term.factors().iter().map(|&(q, _)| q).collect();
        self.check_qubits(&qubits)?;

        let masks = PauliMasks::from_positions(
            term.factors()
                .iter()
                .map(|&(q, pauli)| (self.position(q), pauli)),
        );
        let local_mask = self.store.len() - 1;
        let flip_local = masks.flip & local_mask;
        let phase_local = masks.phase & local_mask;
        let flip_worker = masks.flip >> self.local_qubits;
        let phase_worker = masks.phase >> self.local_qubits;

        let mine = self.store.amplitudes();
        let exchanged;
        let other: &[Complex64] = if flip_worker != 0 {
            exchanged = self.comm.exchange_amplitudes(
                self.comm.rank() ^ flip_worker,
                mine,
                self.max_chunk(),
            )?;
            &exchanged
        } else {
            mine
        };

        let mut overlap = masked_overlap(mine, other, flip_local, phase_local, self.threshold());
        if (self.comm.rank() & phase_worker).count_ones() & 1 == 1 {
            overlap = -overlap;
        }
        let sum = self.comm.all_reduce_sum(&[overlap.re, overlap.im])?;
        let value = masks.y_phase() * Complex64::new(sum[0], sum[1]);
        Ok(term.coefficient() * value.re)
    }

    /// Σ_k ⟨P_k⟩ over a Pauli sum
    pub fn expectation_sum(&self, terms: &[PauliTerm]) -> Result<f64> {
        terms.iter().map(|term| self.expectation(term)).sum()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::register::Register;
    use approx::assert_relative_eq;
    use qshard_gates::{ry, CNOT, HADAMARD, PAULI_X};
    use qshard_state::{Pauli, PauliTerm};

    fn register(n: usize) -> Register {
        Register::single_seeded(n, EngineConfig::debug(), 3).unwrap()
    }

    #[test]
    fn test_probability_is_read_only() {
        let mut reg = register(2);
        reg.apply_1q(0, &ry(0.8)).unwrap();
        let before = reg.gather_amplitudes().unwrap();
        let p1 = reg.probability(0, 1).unwrap();
        assert_relative_eq!(p1, (0.4f64).sin().powi(2), epsilon = 1e-12);
        assert_relative_eq!(reg.probability(0, 0).unwrap() + p1, 1.0, epsilon = 1e-12);
        assert_eq!(reg.gather_amplitudes().unwrap(), before);
        assert!(reg.probability(0, 2).is_err());
    }

    #[test]
    fn test_measure_certain_outcome() {
        let mut reg = register(3);
        reg.apply_1q(1, &PAULI_X).unwrap();
        for _ in 0..5 {
            assert_eq!(reg.measure(1).unwrap(), 1);
            assert_eq!(reg.measure(0).unwrap(), 0);
        }
        assert_relative_eq!(reg.norm_sqr().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_measure_bell_pair_correlated() {
        for seed in 0..8 {
            let mut reg = Register::single_seeded(2, EngineConfig::default(), seed).unwrap();
            reg.apply_1q(0, &HADAMARD).unwrap();
            reg.apply_2q(0, 1, &CNOT).unwrap();
            let a = reg.measure(0).unwrap();
            assert_eq!(reg.measure(1).unwrap(), a);
        }
    }

    #[test]
    fn test_collapse_then_normalize() {
        let mut reg = register(1);
        reg.apply_1q(0, &HADAMARD).unwrap();
        reg.collapse(0, 1).unwrap();
        assert_relative_eq!(reg.norm_sqr().unwrap(), 0.5, epsilon = 1e-12);
        reg.normalize().unwrap();
        assert_relative_eq!(reg.probability(0, 1).unwrap(), 1.0, epsilon = 1e-12);

        reg.collapse(0, 0).unwrap();
        assert!(reg.normalize().is_err());
    }

    #[test]
    fn test_expectation_single_qubit() {
        let mut reg = register(2);
        reg.apply_1q(1, &ry(0.6)).unwrap();
        let z = reg.expectation(&PauliTerm::single(1.0, 1, Pauli::Z)).unwrap();
        let x = reg.expectation(&PauliTerm::single(1.0, 1, Pauli::X)).unwrap();
        let y = reg.expectation(&PauliTerm::single(1.0, 1, Pauli::Y)).unwrap();
        assert_relative_eq!(z, (0.6f64).cos(), epsilon = 1e-12);
        assert_relative_eq!(x, (0.6f64).sin(), epsilon = 1e-12);
        assert_relative_eq!(y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_expectation_bell_correlations() {
        let mut reg = register(2);
        reg.apply_1q(0, &HADAMARD).unwrap();
        reg.apply_2q(0, 1, &CNOT).unwrap();
        let terms = [
            PauliTerm::parse(1.0, "XX").unwrap(),
            PauliTerm::parse(-1.0, "YY").unwrap(),
            PauliTerm::parse(1.0, "ZZ").unwrap(),
        ];
        // ⟨XX⟩ = 1, ⟨YY⟩ = -1, ⟨ZZ⟩ = 1
        assert_relative_eq!(reg.expectation_sum(&terms).unwrap(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(
            reg.expectation(&PauliTerm::identity(0.5)).unwrap(),
            0.5,
            epsilon = 1e-12
        );
        assert!(reg
            .expectation(&PauliTerm::single(1.0, 5, Pauli::Z))
            .is_err());
    }
}
