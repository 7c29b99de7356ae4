//! 2x2 unitaries for single-qubit fusion.
//!
//! [`Unitary2x2::from_gate`] gives the matrix of every one-qubit catalog
//! gate with bound parameters; [`Unitary2x2::zyz_decomposition`] turns a
//! product back into Euler angles.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use num_complex::Complex64;
use tessera_ir::StandardGate;

const EPSILON: f64 = 1e-10;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A 2x2 unitary matrix in row-major order.
#[derive(Debug, Clone, Copy)]
pub struct Unitary2x2 {
    /// `[[a, b], [c, d]]` as `[a, b, c, d]`.
    pub data: [Complex64; 4],
}

impl Unitary2x2 {
    /// Create a matrix from its entries.
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// Create the identity matrix.
    pub fn identity() -> Self {
        Self::new(ONE, ZERO, ZERO, ONE)
    }

    /// `diag(1, e^{iλ})`, the `u1` gate.
    pub fn phase(lambda: f64) -> Self {
        Self::new(ONE, ZERO, ZERO, Complex64::from_polar(1.0, lambda))
    }

    /// The `u3(θ, φ, λ)` gate.
    pub fn u3(theta: f64, phi: f64, lambda: f64) -> Self {
        let (s, c) = (theta / 2.0).sin_cos();
        Self::new(
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        )
    }

    /// Rotation about X.
    pub fn rx(theta: f64) -> Self {
        let (s, c) = (theta / 2.0).sin_cos();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(0.0, -s),
            Complex64::new(0.0, -s),
            Complex64::new(c, 0.0),
        )
    }

    /// Rotation about Y.
    pub fn ry(theta: f64) -> Self {
        let (s, c) = (theta / 2.0).sin_cos();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        )
    }

    /// Rotation about Z.
    pub fn rz(theta: f64) -> Self {
        Self::new(
            Complex64::from_polar(1.0, -theta / 2.0),
            ZERO,
            ZERO,
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    fn sx() -> Self {
        let p = Complex64::new(0.5, 0.5);
        let m = Complex64::new(0.5, -0.5);
        Self::new(p, m, m, p)
    }

    /// Matrix of a one-qubit catalog gate.
    ///
    /// `None` for multi-qubit gates and for gates with unbound parameters.
    pub fn from_gate(gate: &StandardGate) -> Option<Self> {
        use StandardGate as G;
        let i = Complex64::i();
        let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
        let m = match gate {
            G::I => Self::identity(),
            G::X => Self::new(ZERO, ONE, ONE, ZERO),
            G::Y => Self::new(ZERO, -i, i, ZERO),
            G::Z => Self::phase(PI),
            G::H => Self::new(h, h, h, -h),
            G::S => Self::phase(PI / 2.0),
            G::Sdg => Self::phase(-PI / 2.0),
            G::T => Self::phase(PI / 4.0),
            G::Tdg => Self::phase(-PI / 4.0),
            G::SX => Self::sx(),
            G::SXdg => Self::sx().dagger(),
            G::U1(l) => Self::phase(l.as_f64()?),
            G::U2(p, l) => Self::u3(PI / 2.0, p.as_f64()?, l.as_f64()?),
            G::U3(t, p, l) => Self::u3(t.as_f64()?, p.as_f64()?, l.as_f64()?),
            G::Rx(t) => Self::rx(t.as_f64()?),
            G::Ry(t) => Self::ry(t.as_f64()?),
            G::Rz(t) => Self::rz(t.as_f64()?),
            _ => return None,
        };
        Some(m)
    }

    /// `self * other`.
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Conjugate transpose.
    pub fn dagger(&self) -> Self {
        let [a, b, c, d] = self.data;
        Self::new(a.conj(), c.conj(), b.conj(), d.conj())
    }

    /// Identity up to global phase.
    pub fn is_identity(&self) -> bool {
        let [a, b, c, d] = self.data;
        b.norm() < EPSILON && c.norm() < EPSILON && (a - d).norm() < EPSILON
    }

    /// Equal to `other` up to global phase.
    pub fn approx_eq_up_to_phase(&self, other: &Self, tol: f64) -> bool {
        let Some(k) = (0..4).max_by(|&x, &y| {
            other.data[x]
                .norm()
                .total_cmp(&other.data[y].norm())
        }) else {
            return false;
        };
        if other.data[k].norm() < tol {
            return false;
        }
        let ratio = self.data[k] / other.data[k];
        if (ratio.norm() - 1.0).abs() > tol {
            return false;
        }
        (0..4).all(|j| (self.data[j] - ratio * other.data[j]).norm() < tol)
    }

    /// Euler angles with `self = e^{iδ} Rz(α) Ry(β) Rz(γ)`.
    ///
    /// Returns `(α, β, γ, δ)` with `β` in `[0, π]`.
    pub fn zyz_decomposition(&self) -> (f64, f64, f64, f64) {
        let [a, b, c, d] = self.data;

        let global_phase = (a * d - b * c).arg() / 2.0;
        let unphase = Complex64::from_polar(1.0, -global_phase);
        let (a, b, c) = (a * unphase, b * unphase, c * unphase);

        // a = cos(β/2) e^{-i(α+γ)/2},  c = sin(β/2) e^{i(α-γ)/2}
        let beta = 2.0 * a.norm().clamp(0.0, 1.0).acos();

        if beta.abs() < EPSILON {
            let sum = -2.0 * a.arg();
            return (sum / 2.0, 0.0, sum / 2.0, global_phase);
        }
        if (beta - PI).abs() < EPSILON {
            let diff = -2.0 * (-b).arg();
            return (diff / 2.0, PI, -diff / 2.0, global_phase);
        }

        let sum = -2.0 * a.arg();
        let diff = 2.0 * c.arg();
        (f64::midpoint(sum, diff), beta, (sum - diff) / 2.0, global_phase)
    }

    /// Wrap an angle into `(-π, π]`; non-finite input maps to 0.
    pub fn normalize_angle(angle: f64) -> f64 {
        if !angle.is_finite() {
            return 0.0;
        }
        let a = angle.rem_euclid(2.0 * PI);
        if a > PI { a - 2.0 * PI } else { a }
    }
}

impl Default for Unitary2x2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Unitary2x2 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Unitary2x2::mul(&self, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_ir::ParameterExpression as P;

    fn m(gate: StandardGate) -> Unitary2x2 {
        Unitary2x2::from_gate(&gate).unwrap()
    }

    fn rebuild(u: &Unitary2x2) -> Unitary2x2 {
        let (alpha, beta, gamma, _) = u.zyz_decomposition();
        Unitary2x2::rz(alpha) * Unitary2x2::ry(beta) * Unitary2x2::rz(gamma)
    }

    #[test]
    fn test_involutions() {
        for g in [StandardGate::H, StandardGate::X, StandardGate::Y, StandardGate::Z] {
            assert!((m(g.clone()) * m(g)).is_identity());
        }
    }

    #[test]
    fn test_inverse_pairs() {
        assert!((m(StandardGate::S) * m(StandardGate::Sdg)).is_identity());
        assert!((m(StandardGate::T) * m(StandardGate::Tdg)).is_identity());
        assert!((m(StandardGate::SX) * m(StandardGate::SXdg)).is_identity());
        assert!((m(StandardGate::SX) * m(StandardGate::SX)).approx_eq_up_to_phase(&m(StandardGate::X), 1e-9));
    }

    #[test]
    fn test_h_is_u2() {
        let u2 = m(StandardGate::U2(P::constant(0.0), P::pi()));
        assert!(u2.approx_eq_up_to_phase(&m(StandardGate::H), 1e-9));
    }

    #[test]
    fn test_symbolic_has_no_matrix() {
        assert!(Unitary2x2::from_gate(&StandardGate::Rz(P::symbol("t"))).is_none());
        assert!(Unitary2x2::from_gate(&StandardGate::CX).is_none());
    }

    #[test]
    fn test_zyz_roundtrip() {
        let cases = [
            m(StandardGate::H),
            m(StandardGate::X),
            m(StandardGate::Y),
            m(StandardGate::T),
            m(StandardGate::SX),
            Unitary2x2::u3(0.3, -1.2, 2.5),
            Unitary2x2::rx(0.7) * Unitary2x2::ry(-0.4),
            Unitary2x2::identity(),
        ];
        for u in cases {
            assert!(rebuild(&u).approx_eq_up_to_phase(&u, 1e-9), "{u:?}");
        }
    }

    #[test]
    fn test_normalize_angle() {
        assert!((Unitary2x2::normalize_angle(2.5 * PI) - PI / 2.0).abs() < 1e-12);
        assert!((Unitary2x2::normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert_eq!(Unitary2x2::normalize_angle(f64::NAN), 0.0);
    }
}
