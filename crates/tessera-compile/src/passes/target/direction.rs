//! Two-qubit gate direction correction.

use tessera_ir::{CircuitDag, Gate, Instruction, NodeIndex, QubitId, StandardGate};
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::passes::target::Unroller;
use crate::property::{BasisGates, PropertySet};

/// Rewrites two-qubit gates whose operand order only exists reversed in the
/// coupling map.
///
/// `cx a,b` on a `b -> a` edge becomes `h a; h b; cx b,a; h a; h b`, with
/// each `h` unrolled into the target basis (`u2(0, π)` for the default
/// basis). Symmetric gates (`cz`, `swap`, `rzz`) just have their operands
/// exchanged. Any other gate on a reversed edge fails with
/// [`CompileError::UnsupportedDirection`].
pub struct DirectionMapper;

/// Hadamard on `qubit`, carrying `gate`'s condition, expressed in `basis`.
fn hadamard(
    gate: &Gate,
    qubit: QubitId,
    basis: Option<&BasisGates>,
) -> CompileResult<Vec<Instruction>> {
    let mut h = Gate::standard(StandardGate::H);
    h.condition.clone_from(&gate.condition);
    let h = Instruction::gate(h, [qubit]);
    match basis {
        Some(basis) => Unroller::new().unroll_instruction(&h, basis),
        None => Ok(vec![h]),
    }
}

fn flipped_cx(
    gate: &Gate,
    a: QubitId,
    b: QubitId,
    basis: Option<&BasisGates>,
) -> CompileResult<Vec<Instruction>> {
    let mut cx = Gate::standard(StandardGate::CX);
    cx.condition.clone_from(&gate.condition);

    let mut out = hadamard(gate, a, basis)?;
    out.extend(hadamard(gate, b, basis)?);
    out.push(Instruction::gate(cx, [b, a]));
    out.extend(hadamard(gate, a, basis)?);
    out.extend(hadamard(gate, b, basis)?);
    Ok(out)
}

impl Pass for DirectionMapper {
    fn name(&self) -> &'static str {
        "DirectionMapper"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let basis = properties.basis_gates.as_ref();

        let reversed: Vec<NodeIndex> = dag
            .topological_ops()
            .filter(|(_, inst)| inst.is_gate() && inst.qubits.len() == 2)
            .filter(|(_, inst)| !coupling.has_edge(inst.qubits[0].0, inst.qubits[1].0))
            .map(|(node, _)| node)
            .collect();

        for node in reversed {
            let Some(inst) = dag.get_instruction(node).cloned() else {
                continue;
            };
            let (a, b) = (inst.qubits[0], inst.qubits[1]);
            if !coupling.has_edge(b.0, a.0) {
                return Err(CompileError::UnsatisfiableTopology {
                    qubit1: a.0,
                    qubit2: b.0,
                });
            }
            let Some(gate) = inst.as_gate() else {
                continue;
            };
            match gate.as_standard() {
                Some(StandardGate::CX) => {
                    dag.substitute_node(node, flipped_cx(gate, a, b, basis)?)?;
                }
                Some(g) if g.is_symmetric() => {
                    if let Some(target) = dag.get_instruction_mut(node) {
                        target.qubits.swap(0, 1);
                    }
                }
                _ => {
                    return Err(CompileError::UnsupportedDirection {
                        gate: gate.name().to_string(),
                        control: a.0,
                        target: b.0,
                    });
                }
            }
            debug!(gate = gate.name(), control = a.0, target = b.0, "flipped gate direction");
        }
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some()
    }
}
