//! Program-qubit ↔ data-position permutation
//!
//! A circuit names qubits by *program* index. The amplitude vector is indexed
//! by *data* positions: bit `p` of a global index belongs to whichever program
//! qubit currently maps to position `p`. Positions below the local-bit
//! boundary address a worker's private slice, positions at or above it select
//! the worker. Relabelling which program qubit sits at which position is free;
//! only moving amplitudes costs communication.
//!
//! Both directions of the bijection are stored so every lookup is O(1).

use crate::error::QuantumError;
use crate::Result;
use smallvec::SmallVec;

/// Largest register the index arithmetic supports
pub const MAX_QUBITS: usize = 40;

// smallvec has no `Array` impl for 40; 64 is the next inline size it supports
type Table = SmallVec<[usize; 64]>;

/// Bijection between program qubits and data positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QubitPermutation {
    /// program qubit -> data position
    data_of: Table,
    /// data position -> program qubit
    program_at: Table,
}

impl QubitPermutation {
    /// The identity mapping on `num_qubits` qubits
    pub fn identity(num_qubits: usize) -> Self {
        let table: Table = (0..num_qubits).collect();
        Self {
            data_of: table.clone(),
            program_at: table,
        }
    }

    /// Build from an explicit `program qubit -> data position` table
    ///
    /// # Errors
    /// Returns [`QuantumError::BrokenPermutation`] if the table is not a bijection
    /// on `0..mapping.len()`.
    pub fn from_mapping(mapping: &[usize]) -> Result<Self> {
        let n = mapping.len();
        if n > MAX_QUBITS {
            return Err(QuantumError::TooManyQubits {
                num_qubits: n,
                max: MAX_QUBITS,
            });
        }
        let mut program_at: Table = SmallVec::from_elem(usize::MAX, n);
        for (qubit, &position) in mapping.iter().enumerate() {
            if position >= n {
                return Err(QuantumError::BrokenPermutation(format!(
                    "program qubit {qubit} maps to position {position} outside 0..{n}"
                )));
            }
            if program_at[position] != usize::MAX {
                return Err(QuantumError::BrokenPermutation(format!(
                    "program qubits {} and {qubit} both map to position {position}",
                    program_at[position]
                )));
            }
            program_at[position] = qubit;
        }
        Ok(Self {
            data_of: mapping.iter().copied().collect(),
            program_at,
        })
    }

    /// Number of qubits covered by the mapping
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.data_of.len()
    }

    /// Data position currently holding program qubit `qubit`
    ///
    /// # Panics
    /// Panics if `qubit >= num_qubits()`; callers validate first.
    #[inline]
    pub fn data_position_of(&self, qubit: usize) -> usize {
        self.data_of[qubit]
    }

    /// Program qubit currently stored at data position `position`
    ///
    /// # Panics
    /// Panics if `position >= num_qubits()`.
    #[inline]
    pub fn program_qubit_at(&self, position: usize) -> usize {
        self.program_at[position]
    }

    /// `program qubit -> data position` table
    pub fn mapping(&self) -> &[usize] {
        &self.data_of
    }

    /// Exchange the program qubits living at two data positions
    pub fn swap(&mut self, position_a: usize, position_b: usize) {
        if position_a == position_b {
            return;
        }
        let qa = self.program_at[position_a];
        let qb = self.program_at[position_b];
        self.program_at.swap(position_a, position_b);
        self.data_of[qa] = position_b;
        self.data_of[qb] = position_a;
    }

    /// Exchange the data positions of two program qubits
    pub fn swap_program(&mut self, qubit_a: usize, qubit_b: usize) {
        let pa = self.data_of[qubit_a];
        let pb = self.data_of[qubit_b];
        self.swap(pa, pb);
    }

    /// Follow this mapping with a relabelling of data positions
    ///
    /// `relabel` is read as `old data position -> new data position`; after
    /// the call, program qubit `q` lives at `relabel(self(q))`.
    ///
    /// # Errors
    /// Fails without modifying `self` if the sizes differ.
    pub fn compose(&mut self, relabel: &QubitPermutation) -> Result<()> {
        if relabel.num_qubits() != self.num_qubits() {
            return Err(QuantumError::BrokenPermutation(format!(
                "cannot compose a {}-qubit permutation with a {}-qubit relabelling",
                self.num_qubits(),
                relabel.num_qubits()
            )));
        }
        for qubit in 0..self.data_of.len() {
            let position = relabel.data_of[self.data_of[qubit]];
            self.data_of[qubit] = position;
            self.program_at[position] = qubit;
        }
        Ok(())
    }

    /// Check that both tables describe the same bijection
    pub fn validate(&self) -> Result<()> {
        let n = self.num_qubits();
        if self.program_at.len() != n {
            return Err(QuantumError::BrokenPermutation(format!(
                "forward table has {n} entries, inverse table has {}",
                self.program_at.len()
            )));
        }
        for (qubit, &position) in self.data_of.iter().enumerate() {
            if position >= n || self.program_at[position] != qubit {
                return Err(QuantumError::BrokenPermutation(format!(
                    "program qubit {qubit} -> position {position} has no matching inverse entry"
                )));
            }
        }
        Ok(())
    }

    /// True if every program qubit sits at its own index
    pub fn is_identity(&self) -> bool {
        self.data_of.iter().enumerate().all(|(q, &p)| q == p)
    }

    /// Translate a basis index written in program-qubit order to data order
    pub fn to_data_index(&self, program_index: usize) -> usize {
        let mut data_index = 0usize;
        for (qubit, &position) in self.data_of.iter().enumerate() {
            data_index |= ((program_index >> qubit) & 1) << position;
        }
        data_index
    }

    /// Translate a basis index written in data order to program-qubit order
    pub fn to_program_index(&self, data_index: usize) -> usize {
        let mut program_index = 0usize;
        for (position, &qubit) in self.program_at.iter().enumerate() {
            program_index |= ((data_index >> position) & 1) << qubit;
        }
        program_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identity() {
        let perm = QubitPermutation::identity(5);
        assert!(perm.is_identity());
        assert!(perm.validate().is_ok());
        for q in 0..5 {
            assert_eq!(perm.data_position_of(q), q);
            assert_eq!(perm.program_qubit_at(q), q);
        }
    }

    #[test]
    fn test_swap_positions() {
        let mut perm = QubitPermutation::identity(4);
        perm.swap(1, 3);
        assert_eq!(perm.data_position_of(1), 3);
        assert_eq!(perm.data_position_of(3), 1);
        assert_eq!(perm.program_qubit_at(1), 3);
        assert!(perm.validate().is_ok());

        perm.swap(1, 3);
        assert!(perm.is_identity());
    }

    #[test]
    fn test_swap_program() {
        let mut perm = QubitPermutation::from_mapping(&[2, 0, 1]).unwrap();
        perm.swap_program(0, 1);
        assert_eq!(perm.mapping(), &[0, 2, 1]);
        assert!(perm.validate().is_ok());
    }

    #[test]
    fn test_from_mapping_rejects_duplicates() {
        let err = QubitPermutation::from_mapping(&[0, 1, 1]).unwrap_err();
        assert!(err.is_consistency_violation());
    }

    #[test]
    fn test_from_mapping_rejects_out_of_range() {
        assert!(QubitPermutation::from_mapping(&[0, 3, 1]).is_err());
    }

    #[test]
    fn test_compose() {
        let mut perm = QubitPermutation::from_mapping(&[1, 2, 0]).unwrap();
        let relabel = QubitPermutation::from_mapping(&[2, 0, 1]).unwrap();
        perm.compose(&relabel).unwrap();
        // q0: 1 -> 0, q1: 2 -> 1, q2: 0 -> 2
        assert!(perm.is_identity());
    }

    #[test]
    fn test_compose_size_mismatch() {
        let mut perm = QubitPermutation::identity(3);
        let before = perm.clone();
        assert!(perm.compose(&QubitPermutation::identity(4)).is_err());
        assert_eq!(perm, before);
    }

    #[test]
    fn test_index_translation() {
        // program qubit 0 at position 2, qubit 1 at 0, qubit 2 at 1
        let perm = QubitPermutation::from_mapping(&[2, 0, 1]).unwrap();
        assert_eq!(perm.to_data_index(0b001), 0b100);
        assert_eq!(perm.to_data_index(0b010), 0b001);
        assert_eq!(perm.to_program_index(0b100), 0b001);
    }

    #[test]
    fn test_largest_register_stays_inline() {
        let mut perm = QubitPermutation::identity(MAX_QUBITS);
        perm.swap(0, MAX_QUBITS - 1);
        assert_eq!(perm.num_qubits(), MAX_QUBITS);
        assert_eq!(perm.data_position_of(MAX_QUBITS - 1), 0);
        assert!(!perm.data_of.spilled());
        assert!(perm.validate().is_ok());
    }

    proptest! {
        #[test]
        fn prop_random_swaps_stay_bijective(
            n in 1usize..16,
            swaps in proptest::collection::vec((0usize..16, 0usize..16), 0..64),
        ) {
            let mut perm = QubitPermutation::identity(n);
            for (a, b) in swaps {
                perm.swap(a % n, b % n);
            }
            prop_assert!(perm.validate().is_ok());
        }

        #[test]
        fn prop_index_translation_roundtrips(
            n in 1usize..12,
            swaps in proptest::collection::vec((0usize..12, 0usize..12), 0..32),
            index in 0usize..4096,
        ) {
            let mut perm = QubitPermutation::identity(n);
            for (a, b) in swaps {
                perm.swap(a % n, b % n);
            }
            let index = index & ((1 << n) - 1);
            prop_assert_eq!(perm.to_program_index(perm.to_data_index(index)), index);
        }
    }
}
