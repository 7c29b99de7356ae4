//! Quantum gate types and the standard gate catalog.
//!
//! Every [`StandardGate`] knows its name, arity, parameters, inverse and a
//! decomposition rule over a local qubit frame. The rules form a graph that
//! bottoms out in `u3`/`cx` (with `u3` itself expressible as `rz`/`sx`), so
//! the unroller can reach any of the usual device bases by repeated
//! substitution.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::parameter::ParameterExpression;

type P = ParameterExpression;

/// Standard gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity (wait) gate. Opaque: never decomposed.
    I,
    /// Phase gate `u1(λ)`.
    U1(P),
    /// `u2(φ, λ) = u3(π/2, φ, λ)`.
    U2(P, P),
    /// Generic single-qubit rotation `u3(θ, φ, λ)`.
    U3(P, P, P),
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,
    /// Rotation around X axis.
    Rx(P),
    /// Rotation around Y axis.
    Ry(P),
    /// Rotation around Z axis.
    Rz(P),
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// Controlled rotation around Y.
    CRy(P),
    /// Controlled rotation around Z.
    CRz(P),
    /// Controlled phase gate.
    CU1(P),
    /// Controlled `u3`.
    CU3(P, P, P),
    /// SWAP gate.
    Swap,
    /// XX interaction `exp(-i θ/2 X⊗X)`.
    RXX(P),
    /// YY interaction `exp(-i θ/2 Y⊗Y)`.
    RYY(P),
    /// ZZ interaction `exp(-i θ/2 Z⊗Z)`.
    RZZ(P),
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

/// One step of a decomposition rule: a gate and its operands in the local
/// frame of the gate being decomposed.
pub type RuleStep = (StandardGate, Vec<usize>);

fn half(p: &P) -> P {
    p.clone() / P::constant(2.0)
}

fn neg(p: &P) -> P {
    -p.clone()
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::U1(_) => "u1",
            StandardGate::U2(..) => "u2",
            StandardGate::U3(..) => "u3",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
            StandardGate::CU1(_) => "cu1",
            StandardGate::CU3(..) => "cu3",
            StandardGate::Swap => "swap",
            StandardGate::RXX(_) => "rxx",
            StandardGate::RYY(_) => "ryy",
            StandardGate::RZZ(_) => "rzz",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::CRy(_)
            | StandardGate::CRz(_)
            | StandardGate::CU1(_)
            | StandardGate::CU3(..)
            | StandardGate::Swap
            | StandardGate::RXX(_)
            | StandardGate::RYY(_)
            | StandardGate::RZZ(_) => 2,
            StandardGate::CCX | StandardGate::CSwap => 3,
            _ => 1,
        }
    }

    /// Number of angle parameters taken by the gate called `name`, or `None`
    /// if the name is not in the catalog.
    pub fn arity_of(name: &str) -> Option<(u32, usize)> {
        let shape = match name {
            "id" | "x" | "y" | "z" | "h" | "s" | "sdg" | "t" | "tdg" | "sx" | "sxdg" => (1, 0),
            "u1" | "rx" | "ry" | "rz" => (1, 1),
            "u2" => (1, 2),
            "u3" => (1, 3),
            "cx" | "cy" | "cz" | "ch" | "swap" => (2, 0),
            "cry" | "crz" | "cu1" | "rxx" | "ryy" | "rzz" => (2, 1),
            "cu3" => (2, 3),
            "ccx" | "cswap" => (3, 0),
            _ => return None,
        };
        Some(shape)
    }

    /// Look a gate up by name.
    ///
    /// Returns `Ok(None)` for names outside the catalog and
    /// [`IrError::ParameterCountMismatch`] when the parameter count is wrong.
    pub fn from_name(name: &str, params: Vec<P>) -> IrResult<Option<Self>> {
        let Some((_, expected)) = Self::arity_of(name) else {
            return Ok(None);
        };
        if params.len() != expected {
            return Err(IrError::ParameterCountMismatch {
                gate_name: name.to_string(),
                expected,
                got: params.len(),
            });
        }
        let mut it = params.into_iter();
        let mut next = || it.next().unwrap_or(P::Constant(0.0));
        let gate = match name {
            "id" => StandardGate::I,
            "u1" => StandardGate::U1(next()),
            "u2" => StandardGate::U2(next(), next()),
            "u3" => StandardGate::U3(next(), next(), next()),
            "x" => StandardGate::X,
            "y" => StandardGate::Y,
            "z" => StandardGate::Z,
            "h" => StandardGate::H,
            "s" => StandardGate::S,
            "sdg" => StandardGate::Sdg,
            "t" => StandardGate::T,
            "tdg" => StandardGate::Tdg,
            "sx" => StandardGate::SX,
            "sxdg" => StandardGate::SXdg,
            "rx" => StandardGate::Rx(next()),
            "ry" => StandardGate::Ry(next()),
            "rz" => StandardGate::Rz(next()),
            "cx" => StandardGate::CX,
            "cy" => StandardGate::CY,
            "cz" => StandardGate::CZ,
            "ch" => StandardGate::CH,
            "cry" => StandardGate::CRy(next()),
            "crz" => StandardGate::CRz(next()),
            "cu1" => StandardGate::CU1(next()),
            "cu3" => StandardGate::CU3(next(), next(), next()),
            "swap" => StandardGate::Swap,
            "rxx" => StandardGate::RXX(next()),
            "ryy" => StandardGate::RYY(next()),
            "rzz" => StandardGate::RZZ(next()),
            "ccx" => StandardGate::CCX,
            "cswap" => StandardGate::CSwap,
            _ => return Ok(None),
        };
        Ok(Some(gate))
    }

    /// Check if any parameter is still symbolic.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&P> {
        match self {
            StandardGate::U1(p)
            | StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CU1(p)
            | StandardGate::RXX(p)
            | StandardGate::RYY(p)
            | StandardGate::RZZ(p) => vec![p],
            StandardGate::U2(a, b) => vec![a, b],
            StandardGate::U3(a, b, c) | StandardGate::CU3(a, b, c) => vec![a, b, c],
            _ => vec![],
        }
    }

    /// Apply `f` to every parameter.
    #[must_use]
    pub fn map_parameters(&self, f: impl Fn(&P) -> P) -> Self {
        match self {
            StandardGate::U1(p) => StandardGate::U1(f(p)),
            StandardGate::U2(a, b) => StandardGate::U2(f(a), f(b)),
            StandardGate::U3(a, b, c) => StandardGate::U3(f(a), f(b), f(c)),
            StandardGate::Rx(p) => StandardGate::Rx(f(p)),
            StandardGate::Ry(p) => StandardGate::Ry(f(p)),
            StandardGate::Rz(p) => StandardGate::Rz(f(p)),
            StandardGate::CRy(p) => StandardGate::CRy(f(p)),
            StandardGate::CRz(p) => StandardGate::CRz(f(p)),
            StandardGate::CU1(p) => StandardGate::CU1(f(p)),
            StandardGate::CU3(a, b, c) => StandardGate::CU3(f(a), f(b), f(c)),
            StandardGate::RXX(p) => StandardGate::RXX(f(p)),
            StandardGate::RYY(p) => StandardGate::RYY(f(p)),
            StandardGate::RZZ(p) => StandardGate::RZZ(f(p)),
            other => other.clone(),
        }
    }

    /// Opaque gates pass through the unroller untouched.
    pub fn is_opaque(&self) -> bool {
        matches!(self, StandardGate::I)
    }

    /// Two-qubit gates invariant under operand exchange.
    pub fn is_symmetric(&self) -> bool {
        matches!(
            self,
            StandardGate::CZ
                | StandardGate::Swap
                | StandardGate::RXX(_)
                | StandardGate::RYY(_)
                | StandardGate::RZZ(_)
        )
    }

    /// The inverse gate.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            StandardGate::U1(l) => StandardGate::U1(neg(l)),
            StandardGate::U2(p, l) => StandardGate::U3(-P::pi_times(1.0, 2.0), neg(l), neg(p)),
            StandardGate::U3(t, p, l) => StandardGate::U3(neg(t), neg(l), neg(p)),
            StandardGate::S => StandardGate::Sdg,
            StandardGate::Sdg => StandardGate::S,
            StandardGate::T => StandardGate::Tdg,
            StandardGate::Tdg => StandardGate::T,
            StandardGate::SX => StandardGate::SXdg,
            StandardGate::SXdg => StandardGate::SX,
            StandardGate::Rx(t) => StandardGate::Rx(neg(t)),
            StandardGate::Ry(t) => StandardGate::Ry(neg(t)),
            StandardGate::Rz(t) => StandardGate::Rz(neg(t)),
            StandardGate::CRy(t) => StandardGate::CRy(neg(t)),
            StandardGate::CRz(t) => StandardGate::CRz(neg(t)),
            StandardGate::CU1(t) => StandardGate::CU1(neg(t)),
            StandardGate::CU3(t, p, l) => StandardGate::CU3(neg(t), neg(l), neg(p)),
            StandardGate::RXX(t) => StandardGate::RXX(neg(t)),
            StandardGate::RYY(t) => StandardGate::RYY(neg(t)),
            StandardGate::RZZ(t) => StandardGate::RZZ(neg(t)),
            other => other.clone(),
        }
    }

    /// Decomposition rule over the local frame `0..num_qubits`.
    ///
    /// `None` for `id` (opaque) and `cx` (primitive). Rules are exact up to
    /// global phase.
    pub fn definition(&self) -> Option<Vec<RuleStep>> {
        use StandardGate as G;
        let zero = || P::Constant(0.0);
        let pi = P::pi;
        let rule = match self {
            G::I | G::CX => return None,
            G::U1(l) => vec![(G::U3(zero(), zero(), l.clone()), vec![0])],
            G::U2(p, l) => vec![(G::U3(P::pi_times(1.0, 2.0), p.clone(), l.clone()), vec![0])],
            G::U3(t, p, l) => vec![
                (G::Rz(l.clone()), vec![0]),
                (G::SX, vec![0]),
                (G::Rz(t.clone() + pi()), vec![0]),
                (G::SX, vec![0]),
                (G::Rz(p.clone() + pi()), vec![0]),
            ],
            G::X => vec![(G::U3(pi(), zero(), pi()), vec![0])],
            G::Y => vec![(
                G::U3(pi(), P::pi_times(1.0, 2.0), P::pi_times(1.0, 2.0)),
                vec![0],
            )],
            G::Z => vec![(G::U1(pi()), vec![0])],
            G::H => vec![(G::U2(zero(), pi()), vec![0])],
            G::S => vec![(G::U1(P::pi_times(1.0, 2.0)), vec![0])],
            G::Sdg => vec![(G::U1(-P::pi_times(1.0, 2.0)), vec![0])],
            G::T => vec![(G::U1(P::pi_times(1.0, 4.0)), vec![0])],
            G::Tdg => vec![(G::U1(-P::pi_times(1.0, 4.0)), vec![0])],
            G::SX => vec![(G::Sdg, vec![0]), (G::H, vec![0]), (G::Sdg, vec![0])],
            G::SXdg => vec![(G::S, vec![0]), (G::H, vec![0]), (G::S, vec![0])],
            G::Rx(t) => vec![(
                G::U3(t.clone(), -P::pi_times(1.0, 2.0), P::pi_times(1.0, 2.0)),
                vec![0],
            )],
            G::Ry(t) => vec![(G::U3(t.clone(), zero(), zero()), vec![0])],
            G::Rz(p) => vec![(G::U1(p.clone()), vec![0])],
            G::CY => vec![(G::Sdg, vec![1]), (G::CX, vec![0, 1]), (G::S, vec![1])],
            G::CZ => vec![(G::H, vec![1]), (G::CX, vec![0, 1]), (G::H, vec![1])],
            G::CH => vec![
                (G::S, vec![1]),
                (G::H, vec![1]),
                (G::T, vec![1]),
                (G::CX, vec![0, 1]),
                (G::Tdg, vec![1]),
                (G::H, vec![1]),
                (G::Sdg, vec![1]),
            ],
            G::CRy(t) => vec![
                (G::U3(half(t), zero(), zero()), vec![1]),
                (G::CX, vec![0, 1]),
                (G::U3(neg(&half(t)), zero(), zero()), vec![1]),
                (G::CX, vec![0, 1]),
            ],
            G::CRz(l) => vec![
                (G::U1(half(l)), vec![1]),
                (G::CX, vec![0, 1]),
                (G::U1(neg(&half(l))), vec![1]),
                (G::CX, vec![0, 1]),
            ],
            G::CU1(l) => vec![
                (G::U1(half(l)), vec![0]),
                (G::CX, vec![0, 1]),
                (G::U1(neg(&half(l))), vec![1]),
                (G::CX, vec![0, 1]),
                (G::U1(half(l)), vec![1]),
            ],
            G::CU3(t, p, l) => vec![
                (G::U1(half(&(l.clone() + p.clone()))), vec![0]),
                (G::U1(half(&(l.clone() - p.clone()))), vec![1]),
                (G::CX, vec![0, 1]),
                (
                    G::U3(neg(&half(t)), zero(), neg(&half(&(p.clone() + l.clone())))),
                    vec![1],
                ),
                (G::CX, vec![0, 1]),
                (G::U3(half(t), p.clone(), zero()), vec![1]),
            ],
            G::Swap => vec![
                (G::CX, vec![0, 1]),
                (G::CX, vec![1, 0]),
                (G::CX, vec![0, 1]),
            ],
            G::RXX(t) => vec![
                (G::H, vec![0]),
                (G::H, vec![1]),
                (G::CX, vec![0, 1]),
                (G::Rz(t.clone()), vec![1]),
                (G::CX, vec![0, 1]),
                (G::H, vec![0]),
                (G::H, vec![1]),
            ],
            G::RYY(t) => vec![
                (G::Rx(P::pi_times(1.0, 2.0)), vec![0]),
                (G::Rx(P::pi_times(1.0, 2.0)), vec![1]),
                (G::CX, vec![0, 1]),
                (G::Rz(t.clone()), vec![1]),
                (G::CX, vec![0, 1]),
                (G::Rx(-P::pi_times(1.0, 2.0)), vec![0]),
                (G::Rx(-P::pi_times(1.0, 2.0)), vec![1]),
            ],
            G::RZZ(t) => vec![
                (G::CX, vec![0, 1]),
                (G::U1(t.clone()), vec![1]),
                (G::CX, vec![0, 1]),
            ],
            G::CCX => vec![
                (G::H, vec![2]),
                (G::CX, vec![1, 2]),
                (G::Tdg, vec![2]),
                (G::CX, vec![0, 2]),
                (G::T, vec![2]),
                (G::CX, vec![1, 2]),
                (G::Tdg, vec![2]),
                (G::CX, vec![0, 2]),
                (G::T, vec![1]),
                (G::T, vec![2]),
                (G::H, vec![2]),
                (G::CX, vec![0, 1]),
                (G::T, vec![0]),
                (G::Tdg, vec![1]),
                (G::CX, vec![0, 1]),
            ],
            G::CSwap => vec![
                (G::CX, vec![2, 1]),
                (G::CCX, vec![0, 1, 2]),
                (G::CX, vec![2, 1]),
            ],
        };
        Some(rule)
    }
}

/// A quantum gate, either standard or custom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A standard gate with known semantics.
    Standard(StandardGate),
    /// A custom user-defined gate.
    Custom(CustomGate),
}

impl GateKind {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Custom(g) => &g.name,
        }
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Custom(g) => g.num_qubits,
        }
    }

    /// Parameters of the gate, in declaration order.
    pub fn parameters(&self) -> Vec<&P> {
        match self {
            GateKind::Standard(g) => g.parameters(),
            GateKind::Custom(g) => g.params.iter().collect(),
        }
    }

    /// Whether the unroller must leave this gate alone.
    pub fn is_opaque(&self) -> bool {
        match self {
            GateKind::Standard(g) => g.is_opaque(),
            GateKind::Custom(g) => g.opaque,
        }
    }

    /// Decomposition rule, if the gate has one.
    pub fn definition(&self) -> Option<Vec<RuleStep>> {
        match self {
            GateKind::Standard(g) => g.definition(),
            GateKind::Custom(g) => g.definition.clone(),
        }
    }
}

/// A user-defined gate.
///
/// Without a `definition` and without `opaque` set, a custom gate can only
/// survive compilation if its name is in the target basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGate {
    /// The name of the gate.
    pub name: String,
    /// The number of qubits it operates on.
    pub num_qubits: u32,
    /// Parameters of the gate.
    pub params: Vec<P>,
    /// Optional unitary matrix (row-major, 2^n × 2^n).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<Complex64>>,
    /// Optional decomposition over standard gates in the local frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Vec<RuleStep>>,
    /// Opaque gates are never decomposed.
    #[serde(default)]
    pub opaque: bool,
}

impl CustomGate {
    /// Create a new custom gate.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            params: vec![],
            matrix: None,
            definition: None,
            opaque: false,
        }
    }

    /// Add parameters to the gate.
    #[must_use]
    pub fn with_params(mut self, params: Vec<P>) -> Self {
        self.params = params;
        self
    }

    /// Attach a unitary matrix.
    ///
    /// Fails if `matrix.len()` does not equal `(2^num_qubits)^2`.
    pub fn with_matrix(mut self, matrix: Vec<Complex64>) -> IrResult<Self> {
        let dim = 1usize << self.num_qubits;
        if matrix.len() != dim * dim {
            return Err(IrError::InvalidDag(format!(
                "matrix for '{}' has {} entries, expected {}",
                self.name,
                matrix.len(),
                dim * dim
            )));
        }
        self.matrix = Some(matrix);
        Ok(self)
    }

    /// Attach a decomposition rule.
    #[must_use]
    pub fn with_definition(mut self, rule: Vec<RuleStep>) -> Self {
        self.definition = Some(rule);
        self
    }

    /// Mark the gate opaque.
    #[must_use]
    pub fn opaque(mut self) -> Self {
        self.opaque = true;
        self
    }
}

/// Classical condition for conditional gates: the gate fires only when the
/// named register reads `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// The name of the classical register.
    pub register: String,
    /// The value to compare against.
    pub value: u64,
}

impl ClassicalCondition {
    /// Create a new classical condition.
    pub fn new(register: impl Into<String>, value: u64) -> Self {
        Self {
            register: register.into(),
            value,
        }
    }
}

/// A gate with associated metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Optional label for the gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Optional classical condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl Gate {
    /// Create a new gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            label: None,
            condition: None,
        }
    }

    /// Create a new gate from a custom gate.
    pub fn custom(gate: CustomGate) -> Self {
        Self {
            kind: GateKind::Custom(gate),
            label: None,
            condition: None,
        }
    }

    /// Resolve a gate by name: catalog gates first, anything else becomes a
    /// [`CustomGate`] of the given arity.
    pub fn by_name(name: &str, num_qubits: u32, params: Vec<P>) -> IrResult<Self> {
        match StandardGate::from_name(name, params.clone())? {
            Some(g) => Ok(Gate::standard(g)),
            None => Ok(Gate::custom(
                CustomGate::new(name, num_qubits).with_params(params),
            )),
        }
    }

    /// Add a label to the gate.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a classical condition to the gate.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }

    /// The standard gate, if this is one.
    pub fn as_standard(&self) -> Option<&StandardGate> {
        match &self.kind {
            GateKind::Standard(g) => Some(g),
            GateKind::Custom(_) => None,
        }
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

impl From<CustomGate> for Gate {
    fn from(gate: CustomGate) -> Self {
        Gate::custom(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const CATALOG: &[&str] = &[
        "id", "u1", "u2", "u3", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg", "rx",
        "ry", "rz", "cx", "cy", "cz", "ch", "cry", "crz", "cu1", "cu3", "swap", "rxx", "ryy", "rzz",
        "ccx", "cswap",
    ];

    fn build(name: &str) -> StandardGate {
        let (_, n) = StandardGate::arity_of(name).unwrap();
        let params = (0..n).map(|i| P::constant(0.1 * (i + 1) as f64)).collect();
        StandardGate::from_name(name, params).unwrap().unwrap()
    }

    #[test]
    fn test_catalog_names_round_trip() {
        for name in CATALOG {
            assert_eq!(build(name).name(), *name);
        }
        assert!(StandardGate::from_name("mystery", vec![]).unwrap().is_none());
    }

    #[test]
    fn test_parameter_count_checked() {
        let err = StandardGate::from_name("u3", vec![P::pi()]).unwrap_err();
        assert!(matches!(
            err,
            IrError::ParameterCountMismatch {
                expected: 3,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_rules_respect_local_frame() {
        for name in CATALOG {
            let gate = build(name);
            let Some(rule) = gate.definition() else {
                assert!(matches!(gate, StandardGate::I | StandardGate::CX));
                continue;
            };
            for (step, qubits) in rule {
                assert_eq!(step.num_qubits() as usize, qubits.len(), "{name}");
                assert!(qubits.iter().all(|&q| q < gate.num_qubits() as usize));
            }
        }
    }

    #[test]
    fn test_hadamard_rule_is_u2() {
        let rule = StandardGate::H.definition().unwrap();
        assert_eq!(rule.len(), 1);
        let (StandardGate::U2(phi, lambda), _) = &rule[0] else {
            panic!("expected u2");
        };
        assert_eq!(phi.as_f64(), Some(0.0));
        assert!((lambda.as_f64().unwrap() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_inverse() {
        assert_eq!(StandardGate::S.inverse(), StandardGate::Sdg);
        assert_eq!(StandardGate::CX.inverse(), StandardGate::CX);
        let StandardGate::U3(t, p, l) =
            StandardGate::U3(P::constant(0.3), P::constant(0.5), P::constant(0.7)).inverse()
        else {
            panic!("expected u3");
        };
        assert_eq!(t.as_f64(), Some(-0.3));
        assert_eq!(p.as_f64(), Some(-0.7));
        assert_eq!(l.as_f64(), Some(-0.5));
    }

    #[test]
    fn test_symmetric_and_opaque() {
        assert!(StandardGate::CZ.is_symmetric());
        assert!(StandardGate::RXX(P::pi()).is_symmetric());
        assert!(!StandardGate::CRy(P::pi()).is_symmetric());
        assert!(!StandardGate::CX.is_symmetric());
        assert!(StandardGate::I.is_opaque());
        assert!(Gate::custom(CustomGate::new("wait", 1).opaque()).kind.is_opaque());
    }

    #[test]
    fn test_unknown_name_becomes_custom() {
        let g = Gate::by_name("oracle", 2, vec![]).unwrap();
        assert!(matches!(g.kind, GateKind::Custom(_)));
        assert_eq!(g.num_qubits(), 2);
    }

    #[test]
    fn test_matrix_size_checked() {
        let bad = CustomGate::new("u", 1).with_matrix(vec![Complex64::new(1.0, 0.0); 3]);
        assert!(bad.is_err());
    }
}
