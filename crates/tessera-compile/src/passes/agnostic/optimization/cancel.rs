//! Adjacent inverse cancellation for two-qubit gates.

use tessera_ir::{CircuitDag, Instruction, NodeIndex, ParameterExpression, StandardGate, WireId};
use tracing::debug;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

use super::EPSILON;

/// Removes pairs of two-qubit gates that undo each other with nothing in
/// between on either wire.
///
/// `cx a,b; cx a,b` and `crz(t) a,b; crz(-t) a,b` cancel; symmetric gates
/// also cancel with their operands exchanged. Conditioned gates are never
/// touched. Scanning repeats until nothing changes.
pub struct CancelInverse;

impl CancelInverse {
    /// Create a new cancellation pass.
    pub fn new() -> Self {
        Self
    }

    /// The node after `node` on both of its wires, if it is the same one.
    fn shared_successor(dag: &CircuitDag, node: NodeIndex, inst: &Instruction) -> Option<NodeIndex> {
        let mut succs = inst
            .qubits
            .iter()
            .map(|&q| dag.successor_on(node, WireId::Qubit(q)));
        let first = succs.next()??;
        succs.all(|n| n == Some(first)).then_some(first)
    }

    fn find_pair(dag: &CircuitDag) -> Option<(NodeIndex, NodeIndex)> {
        dag.topological_ops()
            .filter(|(_, inst)| candidate(inst).is_some())
            .find_map(|(node, inst)| {
                let succ = Self::shared_successor(dag, node, inst)?;
                let other = dag.get_instruction(succ)?;
                cancels(inst, other).then_some((node, succ))
            })
    }
}

impl Default for CancelInverse {
    fn default() -> Self {
        Self::new()
    }
}

fn candidate(inst: &Instruction) -> Option<&StandardGate> {
    let gate = inst.as_gate()?;
    if gate.condition.is_some() || inst.qubits.len() != 2 {
        return None;
    }
    gate.as_standard()
}

fn same_parameter(a: &ParameterExpression, b: &ParameterExpression) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() < EPSILON,
        _ => a.simplify() == b.simplify(),
    }
}

fn cancels(first: &Instruction, second: &Instruction) -> bool {
    let (Some(g1), Some(g2)) = (candidate(first), candidate(second)) else {
        return false;
    };
    let inverse = g1.inverse();
    if inverse.name() != g2.name() {
        return false;
    }
    let operands_match = first.qubits == second.qubits
        || (g1.is_symmetric()
            && first.qubits[0] == second.qubits[1]
            && first.qubits[1] == second.qubits[0]);
    operands_match
        && inverse
            .parameters()
            .into_iter()
            .zip(g2.parameters())
            .all(|(a, b)| same_parameter(a, b))
}

impl Pass for CancelInverse {
    fn name(&self) -> &'static str {
        "CancelInverse"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        let mut cancelled = 0usize;
        while let Some((first, second)) = Self::find_pair(dag) {
            dag.remove_op(second)?;
            dag.remove_op(first)?;
            cancelled += 1;
        }
        if cancelled > 0 {
            debug!(pairs = cancelled, "cancelled inverse two-qubit gates");
        }
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.num_ops() > 1
    }
}
