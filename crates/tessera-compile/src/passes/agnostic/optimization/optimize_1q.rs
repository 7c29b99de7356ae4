//! Single-qubit gate fusion.

use std::f64::consts::{FRAC_PI_2, PI};

use tessera_ir::{CircuitDag, Instruction, NodeIndex, ParameterExpression, QubitId, StandardGate, WireId};
use tracing::debug;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::{BasisGates, PropertySet};
use crate::unitary::Unitary2x2;

use super::EPSILON;

/// Target gate family for re-synthesized single-qubit runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneQubitBasis {
    /// `u1`, `u2` and `u3`, picking the shortest form.
    QE,
    /// `u3` only.
    U3,
    /// `rz`, `sx`.
    ZSX,
    /// `rz`, `ry`.
    ZYZ,
}

impl OneQubitBasis {
    /// The family a basis supports, preferring the `u` gates.
    pub fn from_basis(basis: &BasisGates) -> Option<Self> {
        if basis.contains("u3") {
            if basis.contains("u1") && basis.contains("u2") {
                Some(Self::QE)
            } else {
                Some(Self::U3)
            }
        } else if basis.contains("rz") && basis.contains("sx") {
            Some(Self::ZSX)
        } else if basis.contains("rz") && basis.contains("ry") {
            Some(Self::ZYZ)
        } else {
            None
        }
    }

    /// Gates for `u` in time order. Empty when `u` is the identity up to
    /// global phase.
    pub fn synthesize(self, u: &Unitary2x2) -> Vec<StandardGate> {
        if u.is_identity() {
            return vec![];
        }
        let (alpha, beta, gamma, _) = u.zyz_decomposition();
        let c = |v: f64| ParameterExpression::constant(Unitary2x2::normalize_angle(v));
        let nonzero = |v: f64| Unitary2x2::normalize_angle(v).abs() > EPSILON;

        match self {
            Self::QE if beta.abs() < EPSILON => vec![StandardGate::U1(c(alpha + gamma))],
            Self::QE if (beta - FRAC_PI_2).abs() < EPSILON => {
                vec![StandardGate::U2(c(alpha), c(gamma))]
            }
            Self::QE | Self::U3 => vec![StandardGate::U3(
                ParameterExpression::constant(beta),
                c(alpha),
                c(gamma),
            )],
            Self::ZSX if beta.abs() < EPSILON => vec![StandardGate::Rz(c(alpha + gamma))],
            Self::ZSX => {
                let mut gates = vec![];
                if nonzero(gamma) {
                    gates.push(StandardGate::Rz(c(gamma)));
                }
                gates.push(StandardGate::SX);
                if nonzero(beta + PI) {
                    gates.push(StandardGate::Rz(c(beta + PI)));
                }
                gates.push(StandardGate::SX);
                if nonzero(alpha + PI) {
                    gates.push(StandardGate::Rz(c(alpha + PI)));
                }
                gates
            }
            Self::ZYZ => [
                (gamma, StandardGate::Rz as fn(ParameterExpression) -> StandardGate),
                (beta, StandardGate::Ry),
                (alpha, StandardGate::Rz),
            ]
            .into_iter()
            .filter(|&(angle, _)| nonzero(angle))
            .map(|(angle, make)| make(c(angle)))
            .collect(),
        }
    }
}

/// Fuses maximal runs of single-qubit gates on each wire.
///
/// A run is a chain of unconditioned one-qubit catalog gates with bound
/// parameters; `id` and anything with a classical condition break it. Each
/// run's product is re-synthesized in the target family and replaces the
/// run when that is shorter, so identities disappear and gate count never
/// grows.
pub struct Optimize1qGates {
    basis: Option<OneQubitBasis>,
}

impl Optimize1qGates {
    /// Fusion into whatever family the property set's basis supports.
    pub fn new() -> Self {
        Self { basis: None }
    }

    /// Fusion into a fixed family.
    pub fn with_basis(basis: OneQubitBasis) -> Self {
        Self { basis: Some(basis) }
    }

    fn target(&self, properties: &PropertySet) -> Option<OneQubitBasis> {
        self.basis
            .or_else(|| properties.basis_gates.as_ref().and_then(OneQubitBasis::from_basis))
    }

    fn matrix_of(inst: &Instruction) -> Option<Unitary2x2> {
        let gate = inst.as_gate()?;
        if gate.condition.is_some() || inst.qubits.len() != 1 || gate.kind.is_opaque() {
            return None;
        }
        Unitary2x2::from_gate(gate.as_standard()?)
    }

    /// Runs on one wire, each with its fused matrix.
    fn runs_on(dag: &CircuitDag, qubit: QubitId) -> Vec<(Vec<NodeIndex>, Unitary2x2)> {
        let mut runs = vec![];
        let mut current: Vec<NodeIndex> = vec![];
        let mut product = Unitary2x2::identity();
        for node in dag.wire_ops(WireId::Qubit(qubit)) {
            match dag.get_instruction(node).and_then(Self::matrix_of) {
                Some(m) => {
                    product = m * product;
                    current.push(node);
                }
                None if !current.is_empty() => {
                    runs.push((std::mem::take(&mut current), product));
                    product = Unitary2x2::identity();
                }
                None => {}
            }
        }
        if !current.is_empty() {
            runs.push((current, product));
        }
        runs
    }
}

impl Default for Optimize1qGates {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for Optimize1qGates {
    fn name(&self) -> &'static str {
        "Optimize1qGates"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let Some(target) = self.target(properties) else {
            debug!("no single-qubit family in basis, skipping fusion");
            return Ok(());
        };

        let qubits: Vec<QubitId> = dag.qubits().collect();
        let mut fused = 0usize;
        for qubit in qubits {
            for (nodes, product) in Self::runs_on(dag, qubit) {
                let gates = target.synthesize(&product);
                if gates.len() >= nodes.len() {
                    continue;
                }
                let Some((&head, rest)) = nodes.split_first() else {
                    continue;
                };
                for &node in rest {
                    dag.remove_op(node)?;
                }
                dag.substitute_node(
                    head,
                    gates
                        .into_iter()
                        .map(|g| Instruction::single_qubit_gate(g, qubit)),
                )?;
                fused += 1;
            }
        }
        if fused > 0 {
            debug!(runs = fused, basis = ?target, "fused single-qubit runs");
        }
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        self.target(properties).is_some()
    }
}
