//! Pauli observables for expectation values ⟨ψ|P|ψ⟩
//!
//! A Pauli string acts on a basis state as a bit flip plus a phase:
//!
//! ```text
//! P|i⟩ = i^{nY} · (-1)^{popcount(i & (Ymask | Zmask))} · |i ⊕ F⟩
//! ```
//!
//! where `F` is the set of positions carrying X or Y. So
//! `⟨ψ|P|ψ⟩ = Σ_i conj(ψ[i ⊕ F]) · phase(i) · ψ[i]`, which only needs the
//! amplitudes of the one worker that holds `i ⊕ F`.
//!
//! # Example
//! ```
//! use qshard_state::observable::{Pauli, PauliTerm};
//!
//! let term = PauliTerm::parse(0.5, "XIZ").unwrap();
//! assert_eq!(term.factors(), &[(0, Pauli::X), (2, Pauli::Z)]);
//! ```

use crate::error::{Result, StateError};
use crate::kernels::use_parallel;
use num_complex::Complex64;
use rayon::prelude::*;
use std::fmt;

/// Single-qubit Pauli operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

impl Pauli {
    pub fn from_char(c: char) -> Result<Self> {
        match c.to_ascii_uppercase() {
            'I' => Ok(Pauli::I),
            'X' => Ok(Pauli::X),
            'Y' => Ok(Pauli::Y),
            'Z' => Ok(Pauli::Z),
            other => Err(StateError::InvalidPauli(other)),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Pauli::I => 'I',
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        }
    }

    /// I and Z leave basis states in place
    pub fn is_diagonal(self) -> bool {
        matches!(self, Pauli::I | Pauli::Z)
    }
}

impl fmt::Display for Pauli {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Real coefficient times a product of Paulis on program qubits
///
/// Identity factors are dropped on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PauliTerm {
    coefficient: f64,
    factors: Vec<(usize, Pauli)>,
}

impl PauliTerm {
    pub fn new(coefficient: f64, factors: Vec<(usize, Pauli)>) -> Self {
        let factors = factors
            .into_iter()
            .filter(|&(_, p)| p != Pauli::I)
            .collect();
        Self {
            coefficient,
            factors,
        }
    }

    /// Parse a string where character `k` acts on program qubit `k`
    pub fn parse(coefficient: f64, paulis: &str) -> Result<Self> {
        let factors = paulis
            .chars()
            .enumerate()
            .map(|(qubit, c)| Pauli::from_char(c).map(|p| (qubit, p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(coefficient, factors))
    }

    /// `coefficient · P` on a single qubit
    pub fn single(coefficient: f64, qubit: usize, pauli: Pauli) -> Self {
        Self::new(coefficient, vec![(qubit, pauli)])
    }

    /// `coefficient · I`
    pub fn identity(coefficient: f64) -> Self {
        Self::new(coefficient, Vec::new())
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    /// Non-identity factors in construction order
    pub fn factors(&self) -> &[(usize, Pauli)] {
        &self.factors
    }

    pub fn is_diagonal(&self) -> bool {
        self.factors.iter().all(|&(_, p)| p.is_diagonal())
    }
}

impl fmt::Display for PauliTerm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.coefficient)?;
        for (qubit, pauli) in &self.factors {
            write!(f, " {pauli}{qubit}")?;
        }
        Ok(())
    }
}

/// Bit masks of a Pauli product over data positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauliMasks {
    /// Positions carrying X or Y
    pub flip: usize,
    /// Positions carrying Y or Z
    pub phase: usize,
    /// Number of Y factors
    pub num_y: u32,
}

impl PauliMasks {
    /// Build masks from `(data position, Pauli)` pairs
    pub fn from_positions<I>(factors: I) -> Self
    where
        I: IntoIterator<Item = (usize, Pauli)>,
    {
        let mut masks = Self::default();
        for (position, pauli) in factors {
            let bit = 1usize << position;
            match pauli {
                Pauli::I => {}
                Pauli::X => masks.flip |= bit,
                Pauli::Y => {
                    masks.flip |= bit;
                    masks.phase |= bit;
                    masks.num_y += 1;
                }
                Pauli::Z => masks.phase |= bit,
            }
        }
        masks
    }

    /// `i^{num_y}`
    pub fn y_phase(&self) -> Complex64 {
        match self.num_y % 4 {
            0 => Complex64::new(1.0, 0.0),
            1 => Complex64::new(0.0, 1.0),
            2 => Complex64::new(-1.0, 0.0),
            _ => Complex64::new(0.0, -1.0),
        }
    }
}

/// `Σ_j conj(other[j ⊕ flip]) · (-1)^{popcount(j & phase)} · mine[j]`
///
/// `flip` and `phase` are the local parts of the masks; when no worker bit is
/// flipped `other` is simply `mine`.
pub fn masked_overlap(
    mine: &[Complex64],
    other: &[Complex64],
    flip: usize,
    phase: usize,
    parallel_threshold: usize,
) -> Complex64 {
    let term = |(j, a): (usize, &Complex64)| {
        let value = other[j ^ flip].conj() * a;
        if (j & phase).count_ones() & 1 == 1 {
            -value
        } else {
            value
        }
    };
    if use_parallel(mine.len(), parallel_threshold) {
        mine.par_iter().enumerate().map(term).sum()
    } else {
        mine.iter().enumerate().map(term).sum()
    }
}
