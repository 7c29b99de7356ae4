//! Structured (JSON) and textual (OpenQASM 2.0) forms of a DAG.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::dag::CircuitDag;
use crate::error::{IrError, IrResult};
use crate::gate::{ClassicalCondition, GateKind};
use crate::instruction::{Instruction, InstructionKind};
use crate::parameter::ParameterExpression;

/// Header of the structured form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonHeader {
    /// Total qubit count.
    pub number_of_qubits: usize,
    /// Total classical bit count.
    pub number_of_clbits: usize,
    /// `[register, index]` per qubit, in flat id order.
    pub qubit_labels: Vec<(String, u32)>,
    /// `[register, size]` per classical register.
    pub clbit_labels: Vec<(String, u32)>,
}

/// Classical condition in the structured form: fire when
/// `(clbits & mask) == val`, both as hex strings over the flat bit space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonConditional {
    /// Always `"equals"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Bits of the condition register.
    pub mask: String,
    /// Expected value shifted into place.
    pub val: String,
}

/// One instruction of the structured form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonInstruction {
    /// Operation name.
    pub name: String,
    /// Flat qubit ids.
    pub qubits: Vec<u32>,
    /// Flat classical bit ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clbits: Vec<u32>,
    /// Angles: numbers when bound, expression text otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<serde_json::Value>,
    /// LaTeX rendering of each angle.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texparams: Vec<String>,
    /// Optional classical condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<JsonConditional>,
}

/// Structured form of a compiled circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonCircuit {
    /// Register layout.
    pub header: JsonHeader,
    /// Instructions in topological order.
    pub instructions: Vec<JsonInstruction>,
}

fn param_value(p: &ParameterExpression) -> serde_json::Value {
    match p.as_f64() {
        Some(v) => serde_json::json!(v),
        None => serde_json::Value::String(p.simplify().to_string()),
    }
}

/// `0x`-prefixed hex for the set bit positions, of any width.
fn hex_bits(positions: impl IntoIterator<Item = u32>) -> String {
    let mut nibbles: Vec<u8> = vec![];
    for pos in positions {
        let slot = (pos / 4) as usize;
        if nibbles.len() <= slot {
            nibbles.resize(slot + 1, 0);
        }
        nibbles[slot] |= 1 << (pos % 4);
    }
    while nibbles.len() > 1 && nibbles.last() == Some(&0) {
        nibbles.pop();
    }
    if nibbles.is_empty() {
        nibbles.push(0);
    }
    let digits: String = nibbles
        .iter()
        .rev()
        .map(|&n| char::from_digit(u32::from(n), 16).unwrap_or('0'))
        .collect();
    format!("0x{digits}")
}

fn conditional(dag: &CircuitDag, cond: &ClassicalCondition) -> IrResult<JsonConditional> {
    let bits = dag
        .creg_bits(&cond.register)
        .ok_or_else(|| IrError::MalformedCircuit {
            circuit: dag.name().to_string(),
            detail: format!("condition on undeclared register '{}'", cond.register),
        })?;
    let offset = bits.first().map_or(0, |b| b.0);
    let value_bits = (0..u64::BITS)
        .filter(|i| (cond.value >> i) & 1 == 1)
        .map(|i| offset + i);
    Ok(JsonConditional {
        kind: "equals".into(),
        mask: hex_bits(bits.iter().map(|b| b.0)),
        val: hex_bits(value_bits),
    })
}

impl JsonCircuit {
    /// Build the structured form of `dag`.
    pub fn from_dag(dag: &CircuitDag) -> IrResult<Self> {
        let header = JsonHeader {
            number_of_qubits: dag.num_qubits(),
            number_of_clbits: dag.num_clbits(),
            qubit_labels: dag
                .qubit_labels()
                .into_iter()
                .map(|q| (q.register, q.index))
                .collect(),
            clbit_labels: dag
                .cregs()
                .iter()
                .map(|r| (r.name.clone(), r.size))
                .collect(),
        };

        let mut instructions = Vec::with_capacity(dag.num_ops());
        for (_, inst) in dag.topological_ops() {
            let (params, texparams, cond) = match &inst.kind {
                InstructionKind::Gate(g) => {
                    let params = g.kind.parameters();
                    (
                        params.iter().map(|p| param_value(p)).collect(),
                        params.iter().map(|p| p.to_latex()).collect(),
                        g.condition.as_ref().map(|c| conditional(dag, c)).transpose()?,
                    )
                }
                _ => (vec![], vec![], None),
            };
            instructions.push(JsonInstruction {
                name: inst.name().to_string(),
                qubits: inst.qubits.iter().map(|q| q.0).collect(),
                clbits: inst.clbits.iter().map(|c| c.0).collect(),
                params,
                texparams,
                conditional: cond,
            });
        }

        Ok(Self {
            header,
            instructions,
        })
    }
}

fn operand_list(dag: &CircuitDag, inst: &Instruction) -> IrResult<String> {
    let refs = inst
        .qubits
        .iter()
        .map(|&q| {
            dag.qubit(q).map(|q| q.to_string()).ok_or(IrError::QubitNotFound {
                qubit: q,
                operation: inst.name().to_string(),
            })
        })
        .collect::<IrResult<Vec<_>>>()?;
    Ok(refs.join(","))
}

fn qasm_params(params: &[&ParameterExpression]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = params.iter().map(|p| p.simplify().to_string()).collect();
    format!("({})", rendered.join(","))
}

/// Render `dag` as OpenQASM 2.0 text.
///
/// Gates outside `qelib1.inc` are declared `opaque` ahead of use.
pub fn to_qasm(dag: &CircuitDag) -> IrResult<String> {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "OPENQASM 2.0;");
    let _ = writeln!(out, "include \"qelib1.inc\";");
    for reg in dag.qregs() {
        let _ = writeln!(out, "qreg {}[{}];", reg.name, reg.size);
    }
    for reg in dag.cregs() {
        let _ = writeln!(out, "creg {}[{}];", reg.name, reg.size);
    }

    let mut opaque: BTreeMap<&str, (usize, u32)> = BTreeMap::new();
    for (_, inst) in dag.topological_ops() {
        if let Some(GateKind::Custom(g)) = inst.as_gate().map(|g| &g.kind) {
            opaque.insert(&g.name, (g.params.len(), g.num_qubits));
        }
    }
    for (name, (nparams, nqubits)) in opaque {
        let params: Vec<String> = (0..nparams).map(|i| format!("p{i}")).collect();
        let args: Vec<String> = (0..nqubits).map(|i| format!("a{i}")).collect();
        let params = if params.is_empty() {
            String::new()
        } else {
            format!("({})", params.join(","))
        };
        let _ = writeln!(out, "opaque {name}{params} {};", args.join(","));
    }

    for (_, inst) in dag.topological_ops() {
        let operands = operand_list(dag, inst)?;
        match &inst.kind {
            InstructionKind::Gate(g) => {
                if let Some(cond) = &g.condition {
                    let _ = write!(out, "if({}=={}) ", cond.register, cond.value);
                }
                let _ = writeln!(
                    out,
                    "{}{} {operands};",
                    g.name(),
                    qasm_params(&g.kind.parameters())
                );
            }
            InstructionKind::Measure => {
                for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
                    let (Some(q), Some(c)) = (dag.qubit(*q), dag.clbit(*c)) else {
                        return Err(IrError::InvalidDag(format!(
                            "measure operands out of range in '{}'",
                            dag.name()
                        )));
                    };
                    let _ = writeln!(out, "measure {q} -> {c};");
                }
            }
            InstructionKind::Reset => {
                let _ = writeln!(out, "reset {operands};");
            }
            InstructionKind::Barrier => {
                let _ = writeln!(out, "barrier {operands};");
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::gate::{CustomGate, StandardGate};
    use crate::qubit::Qubit;

    #[test]
    fn test_bell_qasm() {
        let dag = CircuitDag::from_circuit(&Circuit::bell().unwrap()).unwrap();
        let qasm = to_qasm(&dag).unwrap();
        let expected = "OPENQASM 2.0;\n\
                        include \"qelib1.inc\";\n\
                        qreg q[2];\n\
                        creg c[2];\n\
                        h q[0];\n\
                        cx q[0],q[1];\n\
                        measure q[0] -> c[0];\n\
                        measure q[1] -> c[1];\n";
        assert_eq!(qasm, expected);
    }

    #[test]
    fn test_params_and_conditions_in_qasm() {
        let mut circuit = Circuit::with_size("p", 1, 2);
        circuit
            .u2(0.0, ParameterExpression::pi(), ("q", 0))
            .unwrap()
            .rz(ParameterExpression::symbol("theta"), ("q", 0))
            .unwrap()
            .x(("q", 0))
            .unwrap()
            .c_if("c", 3)
            .unwrap();
        let qasm = to_qasm(&CircuitDag::from_circuit(&circuit).unwrap()).unwrap();
        assert!(qasm.contains("u2(0.0,pi) q[0];"));
        assert!(qasm.contains("rz(theta) q[0];"));
        assert!(qasm.contains("if(c==3) x q[0];"));
    }

    #[test]
    fn test_custom_gates_declared_opaque() {
        let mut circuit = Circuit::with_size("o", 2, 0);
        circuit
            .gate(
                CustomGate::new("magic", 2),
                [Qubit::new("q", 0), Qubit::new("q", 1)],
            )
            .unwrap();
        let qasm = to_qasm(&CircuitDag::from_circuit(&circuit).unwrap()).unwrap();
        assert!(qasm.contains("opaque magic a0,a1;"));
        assert!(qasm.contains("magic q[0],q[1];"));
    }

    #[test]
    fn test_json_form() {
        let mut circuit = Circuit::new("j");
        circuit.add_qreg("q", 2).unwrap();
        circuit.add_creg("a", 1).unwrap().add_creg("b", 2).unwrap();
        circuit
            .gate(StandardGate::U1(ParameterExpression::pi()), [Qubit::new("q", 1)])
            .unwrap()
            .c_if("b", 2)
            .unwrap()
            .measure(("q", 0), ("b", 1))
            .unwrap();
        let json = JsonCircuit::from_dag(&CircuitDag::from_circuit(&circuit).unwrap()).unwrap();

        assert_eq!(json.header.number_of_qubits, 2);
        assert_eq!(json.header.number_of_clbits, 3);
        assert_eq!(json.header.clbit_labels, vec![("a".into(), 1), ("b".into(), 2)]);
        assert_eq!(json.header.qubit_labels[1], ("q".into(), 1));

        let u1 = &json.instructions[0];
        assert_eq!(u1.name, "u1");
        assert_eq!(u1.qubits, vec![1]);
        assert_eq!(u1.texparams, vec!["\\pi".to_string()]);
        let cond = u1.conditional.as_ref().unwrap();
        assert_eq!(cond.mask, "0x6");
        assert_eq!(cond.val, "0x4");

        let measure = &json.instructions[1];
        assert_eq!(measure.clbits, vec![2]);

        let text = serde_json::to_value(&json).unwrap();
        assert_eq!(text["instructions"][0]["conditional"]["type"], "equals");
    }

    #[test]
    fn test_wide_condition_masks() {
        let mut circuit = Circuit::new("wide");
        circuit.add_qreg("q", 1).unwrap();
        circuit.add_creg("a", 130).unwrap().add_creg("b", 2).unwrap();
        circuit.x(("q", 0)).unwrap().c_if("b", 1).unwrap();
        let json = JsonCircuit::from_dag(&CircuitDag::from_circuit(&circuit).unwrap()).unwrap();

        let cond = json.instructions[0].conditional.as_ref().unwrap();
        // Bits 130 and 131 of the flat space.
        assert_eq!(cond.mask, format!("0xc{}", "0".repeat(32)));
        assert_eq!(cond.val, format!("0x4{}", "0".repeat(32)));
    }

    #[test]
    fn test_hex_bits() {
        assert_eq!(hex_bits(Vec::new()), "0x0");
        assert_eq!(hex_bits([0, 1, 2, 3]), "0xf");
        assert_eq!(hex_bits([4]), "0x10");
    }

    #[test]
    fn test_unbound_params_render_as_text() {
        let mut circuit = Circuit::with_size("s", 1, 0);
        circuit
            .rx(ParameterExpression::symbol("a") * 2.0.into(), ("q", 0))
            .unwrap();
        let json = JsonCircuit::from_dag(&CircuitDag::from_circuit(&circuit).unwrap()).unwrap();
        assert_eq!(json.instructions[0].params[0], serde_json::json!("(a * 2.0)"));
    }
}
