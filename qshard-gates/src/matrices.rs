//! Constant and parameterized gate matrices

use num_complex::Complex64;
use qshard_core::matrix::{adjoint, controlled, Matrix2, Matrix4, ONE, ZERO};

const I: Complex64 = Complex64::new(0.0, 1.0);
const NEG_I: Complex64 = Complex64::new(0.0, -1.0);
const NEG_ONE: Complex64 = Complex64::new(-1.0, 0.0);
const INV_SQRT2: f64 = std::f64::consts::FRAC_1_SQRT_2;

fn unit_phase(theta: f64) -> Complex64 {
    Complex64::new(theta.cos(), theta.sin())
}

// Single-qubit gates

pub const IDENTITY: Matrix2 = [[ONE, ZERO], [ZERO, ONE]];

/// H = 1/√2 [[1, 1], [1, -1]]
pub const HADAMARD: Matrix2 = [
    [Complex64::new(INV_SQRT2, 0.0), Complex64::new(INV_SQRT2, 0.0)],
    [Complex64::new(INV_SQRT2, 0.0), Complex64::new(-INV_SQRT2, 0.0)],
];

pub const PAULI_X: Matrix2 = [[ZERO, ONE], [ONE, ZERO]];
pub const PAULI_Y: Matrix2 = [[ZERO, NEG_I], [I, ZERO]];
pub const PAULI_Z: Matrix2 = [[ONE, ZERO], [ZERO, NEG_ONE]];

/// S = diag(1, i)
pub const S_GATE: Matrix2 = [[ONE, ZERO], [ZERO, I]];
pub const S_GATE_DAGGER: Matrix2 = [[ONE, ZERO], [ZERO, NEG_I]];

/// T = diag(1, e^(iπ/4))
pub const T_GATE: Matrix2 = [
    [ONE, ZERO],
    [ZERO, Complex64::new(INV_SQRT2, INV_SQRT2)],
];
pub const T_GATE_DAGGER: Matrix2 = [
    [ONE, ZERO],
    [ZERO, Complex64::new(INV_SQRT2, -INV_SQRT2)],
];

// Two-qubit gates, control on the most significant bit

pub const CNOT: Matrix4 = [
    [ONE, ZERO, ZERO, ZERO],
    [ZERO, ONE, ZERO, ZERO],
    [ZERO, ZERO, ZERO, ONE],
    [ZERO, ZERO, ONE, ZERO],
];

pub const CZ: Matrix4 = [
    [ONE, ZERO, ZERO, ZERO],
    [ZERO, ONE, ZERO, ZERO],
    [ZERO, ZERO, ONE, ZERO],
    [ZERO, ZERO, ZERO, NEG_ONE],
];

pub const SWAP: Matrix4 = [
    [ONE, ZERO, ZERO, ZERO],
    [ZERO, ZERO, ONE, ZERO],
    [ZERO, ONE, ZERO, ZERO],
    [ZERO, ZERO, ZERO, ONE],
];

pub const ISWAP: Matrix4 = [
    [ONE, ZERO, ZERO, ZERO],
    [ZERO, ZERO, I, ZERO],
    [ZERO, I, ZERO, ZERO],
    [ZERO, ZERO, ZERO, ONE],
];

/// RX(θ) = exp(-iθX/2)
pub fn rx(theta: f64) -> Matrix2 {
    let (s, c) = (theta / 2.0).sin_cos();
    [
        [Complex64::new(c, 0.0), Complex64::new(0.0, -s)],
        [Complex64::new(0.0, -s), Complex64::new(c, 0.0)],
    ]
}

/// RY(θ) = exp(-iθY/2)
pub fn ry(theta: f64) -> Matrix2 {
    let (s, c) = (theta / 2.0).sin_cos();
    [
        [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
        [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
    ]
}

/// RZ(θ) = diag(e^(-iθ/2), e^(iθ/2))
pub fn rz(theta: f64) -> Matrix2 {
    [
        [unit_phase(-theta / 2.0), ZERO],
        [ZERO, unit_phase(theta / 2.0)],
    ]
}

/// P(θ) = diag(1, e^(iθ))
pub fn phase(theta: f64) -> Matrix2 {
    [[ONE, ZERO], [ZERO, unit_phase(theta)]]
}

/// General single-qubit rotation
///
/// U3(θ,φ,λ) = [[cos(θ/2), -e^(iλ) sin(θ/2)], [e^(iφ) sin(θ/2), e^(i(φ+λ)) cos(θ/2)]]
pub fn u3(theta: f64, phi: f64, lambda: f64) -> Matrix2 {
    let (s, c) = (theta / 2.0).sin_cos();
    [
        [Complex64::new(c, 0.0), -unit_phase(lambda) * s],
        [unit_phase(phi) * s, unit_phase(phi + lambda) * c],
    ]
}

/// Controlled phase, diag(1, 1, 1, e^(iθ))
pub fn controlled_phase(theta: f64) -> Matrix4 {
    controlled(&phase(theta))
}

/// Controlled RY, handy for building entangled test states
pub fn controlled_ry(theta: f64) -> Matrix4 {
    controlled(&ry(theta))
}

/// RZZ(θ) = exp(-iθ Z⊗Z / 2)
pub fn rzz(theta: f64) -> Matrix4 {
    let even = unit_phase(-theta / 2.0);
    let odd = unit_phase(theta / 2.0);
    [
        [even, ZERO, ZERO, ZERO],
        [ZERO, odd, ZERO, ZERO],
        [ZERO, ZERO, odd, ZERO],
        [ZERO, ZERO, ZERO, even],
    ]
}

/// RXX(θ) = exp(-iθ X⊗X / 2)
pub fn rxx(theta: f64) -> Matrix4 {
    let (s, c) = (theta / 2.0).sin_cos();
    let c = Complex64::new(c, 0.0);
    let s = Complex64::new(0.0, -s);
    [
        [c, ZERO, ZERO, s],
        [ZERO, c, s, ZERO],
        [ZERO, s, c, ZERO],
        [s, ZERO, ZERO, c],
    ]
}

/// Inverse of a unitary gate (its adjoint)
pub fn inverse<const D: usize>(m: &[[Complex64; D]; D]) -> [[Complex64; D]; D] {
    adjoint(m)
}
