//! One worker's view of a distributed register

use crate::comm::{mesh, Communicator, Transport};
use crate::config::{EngineConfig, TeamSpec};
use crate::error::{Result, SimulatorError};
use num_complex::Complex64;
use qshard_core::matrix::{check_unitary, is_diagonal, is_swap};
use qshard_core::{
    derive_seed, entropy_seed, Matrix2, Matrix4, QuantumError, QubitPermutation, RandomStream,
    StreamKind,
};
use qshard_state::{kernels, AmplitudeStore, StateError};
use std::sync::Arc;
use tracing::debug;

/// The slice of a `2^N` state vector held by one worker of a team
///
/// A team of `W` workers splits the data index: the lowest `L = N - log2(W)`
/// bits address the local slice, the top `log2(W)` bits select the worker.
/// Program qubits map to data positions through a [`QubitPermutation`],
/// identical on every member. Every operation that communicates is
/// collective: all members of the team must call it with the same
/// arguments, in the same order.
///
/// # Example
///
/// ```
/// use qshard_gates::{CNOT, HADAMARD};
/// use qshard_sim::{EngineConfig, Register};
///
/// let mut reg = Register::single_seeded(2, EngineConfig::default(), 7).unwrap();
/// reg.apply_1q(0, &HADAMARD).unwrap();
/// reg.apply_2q(0, 1, &CNOT).unwrap();
/// assert!((reg.probability(1, 1).unwrap() - 0.5).abs() < 1e-12);
/// ```
pub struct Register {
    pub(crate) config: EngineConfig,
    pub(crate) num_qubits: usize,
    pub(crate) local_qubits: usize,
    pub(crate) permutation: QubitPermutation,
    pub(crate) store: AmplitudeStore,
    pub(crate) comm: Communicator,
    pub(crate) team_index: usize,
    pub(crate) shared: RandomStream,
    pub(crate) local: RandomStream,
}

impl Register {
    /// Build this worker's part of a team register in state |0…0⟩
    ///
    /// `comm` spans exactly the members of the team. Random streams derive
    /// from `base_seed`: the state-shared stream from the team index, the
    /// local stream from the global rank.
    pub fn new(
        spec: TeamSpec,
        config: EngineConfig,
        comm: Communicator,
        team_index: usize,
        base_seed: u64,
    ) -> Result<Self> {
        spec.validate()?;
        config.validate()?;
        if comm.size() != spec.workers {
            return Err(SimulatorError::team(
                spec.workers,
                spec.num_qubits,
                format!("the communicator has {} members", comm.size()),
            ));
        }

        let local_qubits = spec.local_qubits();
        let store = if comm.rank() == 0 {
            AmplitudeStore::basis(local_qubits, 0)?
        } else {
            AmplitudeStore::zeros(local_qubits)
        };
        let global_rank = comm.global_rank() as u64;

        Ok(Self {
            config,
            num_qubits: spec.num_qubits,
            local_qubits,
            permutation: QubitPermutation::identity(spec.num_qubits),
            store,
            comm,
            team_index,
            shared: RandomStream::derived(StreamKind::StateShared, base_seed, team_index as u64),
            local: RandomStream::derived(StreamKind::Local, base_seed, global_rank),
        })
    }

    /// A register held entirely by the calling thread, seeded from OS entropy
    pub fn single(num_qubits: usize, config: EngineConfig) -> Result<Self> {
        Self::single_seeded(num_qubits, config, entropy_seed())
    }

    /// A register held entirely by the calling thread
    pub fn single_seeded(num_qubits: usize, config: EngineConfig, seed: u64) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(mesh(1).remove(0));
        Self::new(
            TeamSpec::new(1, num_qubits),
            config,
            Communicator::world(transport),
            0,
            seed,
        )
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of data positions addressed inside the local slice
    pub fn local_qubits(&self) -> usize {
        self.local_qubits
    }

    /// Number of workers in the team
    pub fn workers(&self) -> usize {
        self.comm.size()
    }

    /// Rank of this worker inside its team
    pub fn worker_rank(&self) -> usize {
        self.comm.rank()
    }

    /// Rank of this worker inside the pool
    pub fn global_rank(&self) -> usize {
        self.comm.global_rank()
    }

    pub fn team_index(&self) -> usize {
        self.team_index
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current program-qubit to data-position mapping
    pub fn permutation(&self) -> &QubitPermutation {
        &self.permutation
    }

    /// This worker's amplitudes, in data order
    pub fn local_amplitudes(&self) -> &[Complex64] {
        self.store.amplitudes()
    }

    /// Stream shared by every member of the team
    pub fn shared_random(&mut self) -> &mut RandomStream {
        &mut self.shared
    }

    /// Stream private to this worker
    pub fn local_random(&mut self) -> &mut RandomStream {
        &mut self.local
    }

    pub(crate) fn threshold(&self) -> usize {
        self.config.parallel_threshold
    }

    pub(crate) fn max_chunk(&self) -> usize {
        self.config.max_message_amplitudes
    }

    pub(crate) fn check_qubit(&self, qubit: usize) -> Result<()> {
        if qubit >= self.num_qubits {
            return Err(QuantumError::invalid_qubit(qubit, self.num_qubits).into());
        }
        Ok(())
    }

    pub(crate) fn check_qubits(&self, qubits: &[usize]) -> Result<()> {
        for (i, &q) in qubits.iter().enumerate() {
            self.check_qubit(q)?;
            if qubits[..i].contains(&q) {
                return Err(QuantumError::DuplicateQubit(q).into());
            }
        }
        Ok(())
    }

    /// Data position of a (validated) program qubit
    pub(crate) fn position(&self, qubit: usize) -> usize {
        self.permutation.data_position_of(qubit)
    }

    pub(crate) fn is_local(&self, position: usize) -> bool {
        position < self.local_qubits
    }

    /// This worker's value of the worker bit at data `position`
    pub(crate) fn worker_bit(&self, position: usize) -> usize {
        (self.comm.rank() >> (position - self.local_qubits)) & 1
    }

    /// Team rank that differs from this worker exactly in the bit at `position`
    pub(crate) fn partner(&self, position: usize) -> usize {
        self.comm.rank() ^ (1 << (position - self.local_qubits))
    }

    /// ‖ψ‖² summed over the team
    pub fn norm_sqr(&self) -> Result<f64> {
        let local = self.store.norm_sqr(self.threshold());
        Ok(self.comm.all_reduce_sum(&[local])?[0])
    }

    /// Total probability over all outcomes; 1 for a normalized register
    pub fn total_probability(&self) -> Result<f64> {
        self.norm_sqr()
    }

    /// Reset to |0…0⟩, keeping the current permutation
    pub fn init_zero(&mut self) -> Result<()> {
        if self.comm.rank() == 0 {
            self.store.set_basis(0)?;
        } else {
            self.store.clear();
        }
        Ok(())
    }

    /// Reset to the computational basis state `index` (program order)
    pub fn init_basis(&mut self, index: usize) -> Result<()> {
        let dimension = 1usize << self.num_qubits;
        if index >= dimension {
            return Err(StateError::IndexOutOfRange { index, dimension }.into());
        }
        let data = self.permutation.to_data_index(index);
        if data >> self.local_qubits == self.comm.rank() {
            self.store.set_basis(data & (self.store.len() - 1))?;
        } else {
            self.store.clear();
        }
        Ok(())
    }

    /// Load a full state vector given in program order
    ///
    /// Every worker passes the same vector and keeps its own slice. The
    /// vector is taken as is; it is not normalized.
    pub fn init_from_amplitudes(&mut self, amplitudes: &[Complex64]) -> Result<()> {
        let dimension = 1usize << self.num_qubits;
        if amplitudes.len() != dimension {
            return Err(StateError::DimensionMismatch {
                expected: dimension,
                actual: amplitudes.len(),
            }
            .into());
        }
        let base = self.comm.rank() << self.local_qubits;
        let slice: Vec<Complex64> = (0..self.store.len())
            .map(|j| amplitudes[self.permutation.to_program_index(base | j)])
            .collect();
        self.store.replace(slice)?;
        Ok(())
    }

    /// Assemble the full state vector in program order on every worker
    pub fn gather_amplitudes(&self) -> Result<Vec<Complex64>> {
        let slices = self
            .comm
            .all_gather_amplitudes(self.store.amplitudes(), self.max_chunk())?;
        let mut out = vec![Complex64::new(0.0, 0.0); 1usize << self.num_qubits];
        for (data, amplitude) in slices.into_iter().flatten().enumerate() {
            out[self.permutation.to_program_index(data)] = amplitude;
        }
        Ok(out)
    }

    /// Move program qubit `qubit` to data position `position`
    ///
    /// The qubit previously at `position` takes the old position of `qubit`.
    /// The quantum state is unchanged; only its layout moves.
    pub fn relocate(&mut self, qubit: usize, position: usize) -> Result<()> {
        self.check_qubit(qubit)?;
        if position >= self.num_qubits {
            return Err(QuantumError::InvalidPosition {
                position,
                num_qubits: self.num_qubits,
            }
            .into());
        }
        let from = self.position(qubit);
        self.relocate_position(from, position)
    }

    /// Swap data positions `from` and `to` together with their program qubits
    pub(crate) fn relocate_position(&mut self, from: usize, to: usize) -> Result<()> {
        if from == to {
            return Ok(());
        }
        debug!(
            "worker {} relocating data position {} to {}",
            self.global_rank(),
            from,
            to
        );
        self.move_positions(from, to)?;
        self.permutation.swap(from, to);
        self.check_layout()
    }

    /// Fail with a consistency error if the permutation is no longer a bijection
    pub(crate) fn check_layout(&self) -> Result<()> {
        self.permutation.validate()?;
        Ok(())
    }

    /// Logical SWAP: relabel two program qubits without moving any data
    pub fn swap_logical(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_qubits(&[a, b])?;
        self.permutation.swap_program(a, b);
        self.check_layout()
    }

    /// Reseed one of the register's random streams
    ///
    /// The state-shared stream takes `seed` as is on every member. The local
    /// stream mixes in the global rank so workers stay independent. The
    /// pool-shared stream belongs to the pool, not the register.
    pub fn reseed(&mut self, kind: StreamKind, seed: u64) -> Result<()> {
        match kind {
            StreamKind::StateShared => self.shared.reseed(seed),
            StreamKind::Local => self
                .local
                .reseed(derive_seed(seed, self.global_rank() as u64)),
            StreamKind::PoolShared => {
                return Err(SimulatorError::Precondition(
                    "the pool-shared stream is reseeded through the worker context".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// Next value of the state-shared stream, checked across the team
    pub(crate) fn shared_draw(&mut self) -> Result<f64> {
        let value = self.shared.next_f64();
        if self.config.verify_shared_draws && self.comm.size() > 1 {
            let bits = value.to_bits();
            let drawn = self.comm.all_gather_words(&[bits])?;
            if let Some(rank) = drawn.iter().position(|w| w[0] != bits) {
                return Err(SimulatorError::SharedDrawDiverged {
                    rank,
                    value: f64::from_bits(drawn[rank][0]),
                });
            }
        }
        Ok(value)
    }

    /// Apply a single-qubit unitary
    pub fn apply_1q(&mut self, qubit: usize, matrix: &Matrix2) -> Result<()> {
        self.check_qubit(qubit)?;
        check_unitary(matrix, self.config.unitarity_tolerance)?;
        self.apply_1q_at(self.position(qubit), matrix)
    }

    /// Apply a two-qubit unitary; `first` is the matrix's most significant operand
    pub fn apply_2q(&mut self, first: usize, second: usize, matrix: &Matrix4) -> Result<()> {
        self.check_qubits(&[first, second])?;
        check_unitary(matrix, self.config.unitarity_tolerance)?;
        self.apply_2q_at(self.position(first), self.position(second), matrix)
    }

    /// Apply `matrix` to `target` when `control` is |1⟩
    pub fn apply_controlled(&mut self, control: usize, target: usize, matrix: &Matrix2) -> Result<()> {
        self.apply_2q(control, target, &qshard_core::matrix::controlled(matrix))
    }

    /// Apply any 2×2 matrix, skipping the unitarity check
    pub fn apply_matrix_1q_unchecked(&mut self, qubit: usize, matrix: &Matrix2) -> Result<()> {
        self.check_qubit(qubit)?;
        self.apply_1q_at(self.position(qubit), matrix)
    }

    /// Apply any 4×4 matrix, skipping the unitarity check
    pub fn apply_matrix_2q_unchecked(
        &mut self,
        first: usize,
        second: usize,
        matrix: &Matrix4,
    ) -> Result<()> {
        self.check_qubits(&[first, second])?;
        self.apply_2q_at(self.position(first), self.position(second), matrix)
    }

    pub(crate) fn apply_1q_at(&mut self, position: usize, matrix: &Matrix2) -> Result<()> {
        let threshold = self.threshold();
        let diagonal = is_diagonal(matrix, 0.0);
        if self.is_local(position) {
            let state = self.store.amplitudes_mut();
            if diagonal {
                kernels::apply_diagonal(state, [matrix[0][0], matrix[1][1]], position, threshold);
            } else {
                kernels::apply_single_qubit(state, matrix, position, threshold);
            }
            Ok(())
        } else if diagonal {
            let bit = self.worker_bit(position);
            kernels::scale_complex(self.store.amplitudes_mut(), matrix[bit][bit], threshold);
            Ok(())
        } else {
            self.apply_1q_on_worker_bit(position, matrix)
        }
    }

    pub(crate) fn apply_2q_at(&mut self, first: usize, second: usize, matrix: &Matrix4) -> Result<()> {
        if is_swap(matrix, 0.0) {
            return self.move_positions(first, second);
        }
        let threshold = self.threshold();
        let diagonal = is_diagonal(matrix, 0.0);
        match (self.is_local(first), self.is_local(second)) {
            (true, true) => {
                let state = self.store.amplitudes_mut();
                if diagonal {
                    let d = [matrix[0][0], matrix[1][1], matrix[2][2], matrix[3][3]];
                    kernels::apply_diagonal_two(state, d, first, second, threshold);
                } else {
                    kernels::apply_two_qubit(state, matrix, first, second, threshold);
                }
                Ok(())
            }
            (false, true) | (true, false) if diagonal => {
                let worker_is_first = !self.is_local(first);
                let (worker, local) = if worker_is_first {
                    (first, second)
                } else {
                    (second, first)
                };
                let c = self.worker_bit(worker);
                let factor = |l: usize| {
                    let k = if worker_is_first { 2 * c + l } else { 2 * l + c };
                    matrix[k][k]
                };
                kernels::apply_diagonal(
                    self.store.amplitudes_mut(),
                    [factor(0), factor(1)],
                    local,
                    threshold,
                );
                Ok(())
            }
            (false, true) | (true, false) => self.apply_2q_one_worker_bit(first, second, matrix),
            (false, false) if diagonal => {
                let k = 2 * self.worker_bit(first) + self.worker_bit(second);
                kernels::scale_complex(self.store.amplitudes_mut(), matrix[k][k], threshold);
                Ok(())
            }
            (false, false) => self.apply_2q_two_worker_bits(first, second, matrix),
        }
    }
}

impl std::fmt::Debug for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Register")
            .field("num_qubits", &self.num_qubits)
            .field("local_qubits", &self.local_qubits)
            .field("worker_rank", &self.comm.rank())
            .field("workers", &self.comm.size())
            .field("team_index", &self.team_index)
            .field("permutation", &self.permutation.mapping())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qshard_gates::{rx, CNOT, CZ, HADAMARD, PAULI_X, SWAP};

    fn register(n: usize) -> Register {
        Register::single_seeded(n, EngineConfig::debug(), 11).unwrap()
    }

    fn ramp(n: usize) -> Vec<Complex64> {
        let raw: Vec<Complex64> = (0..1usize << n)
            .map(|i| Complex64::new(i as f64 + 1.0, (i as f64) * 0.5))
            .collect();
        let norm = raw.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
        raw.into_iter().map(|a| a / norm).collect()
    }

    #[test]
    fn test_initial_state() {
        let reg = register(3);
        assert_eq!(reg.workers(), 1);
        assert_eq!(reg.local_qubits(), 3);
        assert_eq!(reg.local_amplitudes()[0], Complex64::new(1.0, 0.0));
        assert_relative_eq!(reg.norm_sqr().unwrap(), 1.0);
    }

    #[test]
    fn test_bell_state() {
        let mut reg = register(2);
        reg.apply_1q(0, &HADAMARD).unwrap();
        reg.apply_2q(0, 1, &CNOT).unwrap();
        let amps = reg.gather_amplitudes().unwrap();
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(amps[0].re, h, epsilon = 1e-12);
        assert_relative_eq!(amps[3].re, h, epsilon = 1e-12);
        assert_relative_eq!(amps[1].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_init_basis_and_gather() {
        let mut reg = register(3);
        reg.init_basis(5).unwrap();
        let amps = reg.gather_amplitudes().unwrap();
        assert_eq!(amps[5], Complex64::new(1.0, 0.0));
        assert!(reg.init_basis(8).is_err());
    }

    #[test]
    fn test_init_from_amplitudes_roundtrip_under_permutation() {
        let mut reg = register(3);
        reg.relocate(0, 2).unwrap();
        let state = ramp(3);
        reg.init_from_amplitudes(&state).unwrap();
        assert_eq!(reg.gather_amplitudes().unwrap(), state);
        assert!(reg.init_from_amplitudes(&state[..4]).is_err());
    }

    #[test]
    fn test_relocate_preserves_state() {
        let mut reg = register(3);
        let state = ramp(3);
        reg.init_from_amplitudes(&state).unwrap();
        reg.relocate(2, 0).unwrap();
        assert_eq!(reg.permutation().data_position_of(2), 0);
        assert_eq!(reg.permutation().data_position_of(0), 2);
        let after = reg.gather_amplitudes().unwrap();
        for (a, b) in after.iter().zip(&state) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-14);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-14);
        }
        assert!(reg.relocate(0, 3).is_err());
    }

    #[test]
    fn test_layout_stays_bijective() {
        let mut reg = register(4);
        for (q, p) in [(0, 3), (2, 1), (3, 3), (1, 0)] {
            reg.relocate(q, p).unwrap();
            reg.swap_logical(q, (q + 1) % 4).unwrap();
            reg.check_layout().unwrap();
        }
        let broken: SimulatorError = QuantumError::BrokenPermutation("q0".into()).into();
        assert_eq!(broken.kind(), crate::ErrorKind::Consistency);
    }

    #[test]
    fn test_swap_logical_equals_swap_gate() {
        let state = ramp(3);
        let mut logical = register(3);
        logical.init_from_amplitudes(&state).unwrap();
        logical.swap_logical(0, 2).unwrap();

        let mut physical = register(3);
        physical.init_from_amplitudes(&state).unwrap();
        physical.apply_2q(0, 2, &SWAP).unwrap();

        assert_eq!(
            logical.gather_amplitudes().unwrap(),
            physical.gather_amplitudes().unwrap()
        );
        assert!(logical.permutation().data_position_of(0) == 2);
        assert!(physical.permutation().is_identity());
    }

    #[test]
    fn test_validation_leaves_state_untouched() {
        let mut reg = register(2);
        reg.apply_1q(0, &HADAMARD).unwrap();
        let before = reg.gather_amplitudes().unwrap();

        let not_unitary = [
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            [Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)],
        ];
        assert!(reg.apply_1q(1, &not_unitary).is_err());
        assert!(reg.apply_1q(2, &PAULI_X).is_err());
        assert!(reg.apply_2q(1, 1, &CZ).is_err());
        assert_eq!(reg.gather_amplitudes().unwrap(), before);

        // the unchecked path accepts it
        reg.apply_matrix_1q_unchecked(1, &not_unitary).unwrap();
        assert_ne!(reg.gather_amplitudes().unwrap(), before);
    }

    #[test]
    fn test_non_finite_gates_rejected() {
        let mut reg = register(2);
        reg.apply_1q(0, &HADAMARD).unwrap();
        let before = reg.gather_amplitudes().unwrap();

        let nan = Complex64::new(f64::NAN, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        let err = reg.apply_1q(0, &[[nan, zero], [zero, one]]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Precondition);

        let mut pair = qshard_core::matrix::identity::<4>();
        pair[3][3] = Complex64::new(0.0, f64::INFINITY);
        assert!(reg.apply_2q(0, 1, &pair).is_err());

        assert_eq!(reg.gather_amplitudes().unwrap(), before);
    }

    #[test]
    fn test_controlled_matches_matrix() {
        let mut a = register(2);
        let mut b = register(2);
        a.apply_1q(1, &HADAMARD).unwrap();
        b.apply_1q(1, &HADAMARD).unwrap();
        a.apply_controlled(1, 0, &rx(0.4)).unwrap();
        b.apply_2q(1, 0, &qshard_core::matrix::controlled(&rx(0.4))).unwrap();
        assert_eq!(a.gather_amplitudes().unwrap(), b.gather_amplitudes().unwrap());
    }

    #[test]
    fn test_reseed() {
        let mut reg = register(1);
        reg.reseed(StreamKind::StateShared, 99).unwrap();
        let first = reg.shared_random().next_f64();
        reg.reseed(StreamKind::StateShared, 99).unwrap();
        assert_eq!(reg.shared_random().next_f64(), first);
        assert!(reg.reseed(StreamKind::PoolShared, 1).is_err());
        reg.reseed(StreamKind::Local, 5).unwrap();
        assert_eq!(reg.local_random().seed(), derive_seed(5, 0));
    }
}
