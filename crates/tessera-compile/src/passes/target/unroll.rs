//! Recursive decomposition into the target basis.

use tessera_ir::{CircuitDag, Gate, Instruction, InstructionKind, IrError, ParameterExpression};
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{BasisGates, PropertySet};

/// Default bound on decomposition depth.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Rewrites every gate outside the basis into its decomposition rule,
/// recursively, until only basis gates remain.
///
/// Opaque gates and gates already in the basis pass through. Sub-gates
/// inherit the classical condition of the gate they replace. A gate whose
/// expansion needs more than `max_depth` levels, or that reaches itself
/// again through its own rules, fails with
/// [`CompileError::UnsupportedGate`].
///
/// The DAG is rebuilt in topological order, so per-wire program order is
/// preserved and a circuit already in the basis comes out unchanged.
pub struct Unroller {
    max_depth: usize,
}

impl Unroller {
    /// Unroller with the default depth bound.
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Unroller with a custom depth bound.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Expand one instruction into `out`.
    ///
    /// `path` holds the gate names being expanded above this one; meeting a
    /// name twice means the rules cycle without reaching the basis.
    fn expand(
        &self,
        inst: Instruction,
        basis: &BasisGates,
        path: &mut Vec<String>,
        out: &mut Vec<Instruction>,
    ) -> CompileResult<()> {
        let InstructionKind::Gate(gate) = &inst.kind else {
            out.push(inst);
            return Ok(());
        };
        if basis.contains(gate.name()) || gate.kind.is_opaque() {
            out.push(inst);
            return Ok(());
        }

        let unsupported = |path: &[String]| CompileError::UnsupportedGate {
            gate: path.first().cloned().unwrap_or_else(|| gate.name().to_string()),
            depth: path.len(),
        };
        if path.len() >= self.max_depth || path.iter().any(|n| n == gate.name()) {
            return Err(unsupported(path));
        }
        let Some(rule) = gate.kind.definition() else {
            path.push(gate.name().to_string());
            return Err(unsupported(path));
        };

        path.push(gate.name().to_string());
        for (sub, locals) in rule {
            let qubits = locals
                .iter()
                .map(|&l| {
                    inst.qubits.get(l).copied().ok_or_else(|| {
                        IrError::InvalidDag(format!(
                            "rule for '{}' uses local qubit {l} of {}",
                            gate.name(),
                            inst.qubits.len()
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let mut sub_gate = Gate::standard(sub.map_parameters(ParameterExpression::simplify));
            sub_gate.condition.clone_from(&gate.condition);
            self.expand(Instruction::gate(sub_gate, qubits), basis, path, out)?;
        }
        path.pop();
        Ok(())
    }

    /// Expand a single instruction into basis instructions.
    pub fn unroll_instruction(
        &self,
        inst: &Instruction,
        basis: &BasisGates,
    ) -> CompileResult<Vec<Instruction>> {
        let mut out = vec![];
        self.expand(inst.clone(), basis, &mut vec![], &mut out)?;
        Ok(out)
    }
}

impl Default for Unroller {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for Unroller {
    fn name(&self) -> &'static str {
        "Unroller"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let basis = properties
            .basis_gates
            .as_ref()
            .ok_or(CompileError::MissingBasisGates)?;

        let mut unrolled = dag.empty_like();
        unrolled.set_basis(basis.gates().iter().cloned());
        let mut expanded = 0usize;
        for (_, inst) in dag.topological_ops() {
            let pieces = self.unroll_instruction(inst, basis)?;
            if pieces.len() != 1 || pieces[0] != *inst {
                expanded += 1;
            }
            for piece in pieces {
                unrolled.apply(piece)?;
            }
        }
        debug!(expanded, ops = unrolled.num_ops(), "unrolled to basis {basis}");

        *dag = unrolled;
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.basis_gates.is_some()
    }
}
