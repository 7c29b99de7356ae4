//! Circuit model: registers plus an ordered list of operations.
//!
//! A [`Circuit`] is plain data. Operands are `(register, index)` references
//! and are only checked against the declared registers when the circuit is
//! lowered with [`CircuitDag::from_circuit`](crate::CircuitDag::from_circuit).

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{ClassicalCondition, Gate, StandardGate};
use crate::instruction::InstructionKind;
use crate::parameter::ParameterExpression;
use crate::qubit::{Clbit, Qubit, Register};

/// One operation of a circuit, in program order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// What the operation does.
    pub kind: InstructionKind,
    /// Qubit operands.
    pub qubits: Vec<Qubit>,
    /// Classical bit operands.
    pub clbits: Vec<Clbit>,
}

impl Operation {
    /// Operation name (`h`, `cx`, `measure`, ...).
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Whether this operation applies a gate (not measure/reset/barrier).
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }
}

/// A quantum circuit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Circuit {
    name: String,
    qregs: Vec<Register>,
    cregs: Vec<Register>,
    ops: Vec<Operation>,
}

type P = ParameterExpression;

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a circuit with a quantum register `q` and a classical register
    /// `c` of the given sizes. A size of zero omits the register.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        if num_qubits > 0 {
            circuit.qregs.push(Register::new("q", num_qubits));
        }
        if num_clbits > 0 {
            circuit.cregs.push(Register::new("c", num_clbits));
        }
        circuit
    }

    fn check_register_name(&self, name: &str) -> IrResult<()> {
        if self.qregs.iter().chain(&self.cregs).any(|r| r.name == name) {
            return Err(IrError::DuplicateRegister(name.to_string()));
        }
        Ok(())
    }

    /// Declare a quantum register.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> IrResult<&mut Self> {
        let name = name.into();
        self.check_register_name(&name)?;
        self.qregs.push(Register::new(name, size));
        Ok(self)
    }

    /// Declare a classical register.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> IrResult<&mut Self> {
        let name = name.into();
        self.check_register_name(&name)?;
        self.cregs.push(Register::new(name, size));
        Ok(self)
    }

    /// Append an operation.
    ///
    /// Gate arity is checked here; operand validity is checked when the
    /// circuit is lowered to a DAG.
    #[allow(clippy::cast_possible_truncation)]
    pub fn append(
        &mut self,
        kind: InstructionKind,
        qubits: Vec<Qubit>,
        clbits: Vec<Clbit>,
    ) -> IrResult<&mut Self> {
        if let InstructionKind::Gate(gate) = &kind {
            if gate.num_qubits() as usize != qubits.len() {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: gate.num_qubits(),
                    got: qubits.len() as u32,
                });
            }
        }
        if matches!(kind, InstructionKind::Measure) && qubits.len() != clbits.len() {
            return Err(IrError::MalformedCircuit {
                circuit: self.name.clone(),
                detail: format!(
                    "measure pairs {} qubits with {} classical bits",
                    qubits.len(),
                    clbits.len()
                ),
            });
        }
        self.ops.push(Operation {
            kind,
            qubits,
            clbits,
        });
        Ok(self)
    }

    fn std_gate(&mut self, gate: StandardGate, qubits: Vec<Qubit>) -> IrResult<&mut Self> {
        self.append(InstructionKind::Gate(Gate::standard(gate)), qubits, vec![])
    }

    /// Apply any gate.
    pub fn gate(
        &mut self,
        gate: impl Into<Gate>,
        qubits: impl IntoIterator<Item = Qubit>,
    ) -> IrResult<&mut Self> {
        self.append(
            InstructionKind::Gate(gate.into()),
            qubits.into_iter().collect(),
            vec![],
        )
    }

    /// Apply the identity gate.
    pub fn id(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::I, vec![q.into()])
    }

    /// Apply Hadamard gate.
    pub fn h(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::H, vec![q.into()])
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::X, vec![q.into()])
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::Y, vec![q.into()])
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::Z, vec![q.into()])
    }

    /// Apply S gate.
    pub fn s(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::S, vec![q.into()])
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::Sdg, vec![q.into()])
    }

    /// Apply T gate.
    pub fn t(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::T, vec![q.into()])
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::Tdg, vec![q.into()])
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::SX, vec![q.into()])
    }

    /// Apply `u1(λ)`.
    pub fn u1(&mut self, lambda: impl Into<P>, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::U1(lambda.into()), vec![q.into()])
    }

    /// Apply `u2(φ, λ)`.
    pub fn u2(
        &mut self,
        phi: impl Into<P>,
        lambda: impl Into<P>,
        q: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::U2(phi.into(), lambda.into()), vec![q.into()])
    }

    /// Apply `u3(θ, φ, λ)`.
    pub fn u3(
        &mut self,
        theta: impl Into<P>,
        phi: impl Into<P>,
        lambda: impl Into<P>,
        q: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(
            StandardGate::U3(theta.into(), phi.into(), lambda.into()),
            vec![q.into()],
        )
    }

    /// Apply Rx rotation.
    pub fn rx(&mut self, theta: impl Into<P>, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::Rx(theta.into()), vec![q.into()])
    }

    /// Apply Ry rotation.
    pub fn ry(&mut self, theta: impl Into<P>, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::Ry(theta.into()), vec![q.into()])
    }

    /// Apply Rz rotation.
    pub fn rz(&mut self, phi: impl Into<P>, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::Rz(phi.into()), vec![q.into()])
    }

    /// Apply CNOT.
    pub fn cx(&mut self, control: impl Into<Qubit>, target: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::CX, vec![control.into(), target.into()])
    }

    /// Apply controlled-Y.
    pub fn cy(&mut self, control: impl Into<Qubit>, target: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::CY, vec![control.into(), target.into()])
    }

    /// Apply controlled-Z.
    pub fn cz(&mut self, control: impl Into<Qubit>, target: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::CZ, vec![control.into(), target.into()])
    }

    /// Apply controlled-Hadamard.
    pub fn ch(&mut self, control: impl Into<Qubit>, target: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::CH, vec![control.into(), target.into()])
    }

    /// Apply controlled-Rz.
    pub fn crz(
        &mut self,
        lambda: impl Into<P>,
        control: impl Into<Qubit>,
        target: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(
            StandardGate::CRz(lambda.into()),
            vec![control.into(), target.into()],
        )
    }

    /// Apply controlled phase.
    pub fn cu1(
        &mut self,
        lambda: impl Into<P>,
        control: impl Into<Qubit>,
        target: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(
            StandardGate::CU1(lambda.into()),
            vec![control.into(), target.into()],
        )
    }

    /// Apply controlled `u3`.
    pub fn cu3(
        &mut self,
        theta: impl Into<P>,
        phi: impl Into<P>,
        lambda: impl Into<P>,
        control: impl Into<Qubit>,
        target: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(
            StandardGate::CU3(theta.into(), phi.into(), lambda.into()),
            vec![control.into(), target.into()],
        )
    }

    /// Apply SWAP.
    pub fn swap(&mut self, a: impl Into<Qubit>, b: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::Swap, vec![a.into(), b.into()])
    }

    /// Apply controlled Y rotation.
    pub fn cry(
        &mut self,
        theta: impl Into<P>,
        control: impl Into<Qubit>,
        target: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::CRy(theta.into()), vec![control.into(), target.into()])
    }

    pub fn rxx(
        &mut self,
        theta: impl Into<P>,
        a: impl Into<Qubit>,
        b: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::RXX(theta.into()), vec![a.into(), b.into()])
    }

    pub fn ryy(
        &mut self,
        theta: impl Into<P>,
        a: impl Into<Qubit>,
        b: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::RYY(theta.into()), vec![a.into(), b.into()])
    }

    /// Apply ZZ interaction.
    pub fn rzz(
        &mut self,
        theta: impl Into<P>,
        a: impl Into<Qubit>,
        b: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::RZZ(theta.into()), vec![a.into(), b.into()])
    }

    /// Apply Toffoli.
    pub fn ccx(
        &mut self,
        c1: impl Into<Qubit>,
        c2: impl Into<Qubit>,
        target: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::CCX, vec![c1.into(), c2.into(), target.into()])
    }

    /// Apply Fredkin.
    pub fn cswap(
        &mut self,
        control: impl Into<Qubit>,
        a: impl Into<Qubit>,
        b: impl Into<Qubit>,
    ) -> IrResult<&mut Self> {
        self.std_gate(StandardGate::CSwap, vec![control.into(), a.into(), b.into()])
    }

    /// Measure a qubit into a classical bit.
    pub fn measure(&mut self, q: impl Into<Qubit>, c: impl Into<Clbit>) -> IrResult<&mut Self> {
        self.append(InstructionKind::Measure, vec![q.into()], vec![c.into()])
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, q: impl Into<Qubit>) -> IrResult<&mut Self> {
        self.append(InstructionKind::Reset, vec![q.into()], vec![])
    }

    /// Barrier over the given qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = Qubit>) -> IrResult<&mut Self> {
        self.append(InstructionKind::Barrier, qubits.into_iter().collect(), vec![])
    }

    /// Barrier over every declared qubit.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        let qubits = self.all_qubits();
        self.barrier(qubits)
    }

    /// Condition the most recently appended gate on `register == value`.
    pub fn c_if(&mut self, register: impl Into<String>, value: u64) -> IrResult<&mut Self> {
        let register = register.into();
        if !self.cregs.iter().any(|r| r.name == register) {
            return Err(IrError::MalformedCircuit {
                circuit: self.name.clone(),
                detail: format!("condition on undeclared classical register '{register}'"),
            });
        }
        let circuit = self.name.clone();
        let gate = self
            .ops
            .last_mut()
            .and_then(|op| match &mut op.kind {
                InstructionKind::Gate(g) => Some(g),
                _ => None,
            })
            .ok_or_else(|| IrError::MalformedCircuit {
                circuit,
                detail: "c_if must follow a gate".into(),
            })?;
        gate.condition = Some(ClassicalCondition::new(register, value));
        Ok(self)
    }

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quantum register declarations, in order.
    pub fn qregs(&self) -> &[Register] {
        &self.qregs
    }

    /// Classical register declarations, in order.
    pub fn cregs(&self) -> &[Register] {
        &self.cregs
    }

    /// Operations in program order.
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    /// Total number of declared qubits.
    pub fn num_qubits(&self) -> usize {
        self.qregs.iter().map(|r| r.size as usize).sum()
    }

    /// Total number of declared classical bits.
    pub fn num_clbits(&self) -> usize {
        self.cregs.iter().map(|r| r.size as usize).sum()
    }

    /// Every declared qubit, in register declaration order.
    pub fn all_qubits(&self) -> Vec<Qubit> {
        self.qregs
            .iter()
            .flat_map(|r| (0..r.size).map(move |i| Qubit::new(r.name.clone(), i)))
            .collect()
    }

    /// Every declared classical bit, in register declaration order.
    pub fn all_clbits(&self) -> Vec<Clbit> {
        self.cregs
            .iter()
            .flat_map(|r| (0..r.size).map(move |i| Clbit::new(r.name.clone(), i)))
            .collect()
    }

    /// Replace the operation list, keeping name and registers.
    pub fn set_operations(&mut self, ops: Vec<Operation>) {
        self.ops = ops;
    }

    /// Create a Bell state circuit with measurements.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit
            .h(("q", 0))?
            .cx(("q", 0), ("q", 1))?
            .measure(("q", 0), ("c", 0))?
            .measure(("q", 1), ("c", 1))?;
        Ok(circuit)
    }

    /// Create an n-qubit GHZ circuit with measurements.
    pub fn ghz(n: u32) -> IrResult<Self> {
        let mut circuit = Self::with_size("ghz", n, n);
        circuit.h(("q", 0))?;
        for i in 1..n {
            circuit.cx(("q", i - 1), ("q", i))?;
        }
        for i in 0..n {
            circuit.measure(("q", i), ("c", i))?;
        }
        Ok(circuit)
    }
}

/// An angle as it appears in a circuit descriptor: a bare number, a symbol
/// name (`"pi"` is π), or a full expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    /// Numeric angle.
    Number(f64),
    /// Symbol name.
    Name(String),
    /// Expression tree.
    Expression(ParameterExpression),
}

impl From<ParamSpec> for ParameterExpression {
    fn from(spec: ParamSpec) -> Self {
        match spec {
            ParamSpec::Number(v) => ParameterExpression::Constant(v),
            ParamSpec::Name(name) if name == "pi" => ParameterExpression::Pi,
            ParamSpec::Name(name) => ParameterExpression::Symbol(name),
            ParamSpec::Expression(e) => e,
        }
    }
}

/// One operation in a circuit descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Gate name, or `measure`/`reset`/`barrier`.
    pub gate_name: String,
    /// Qubit operands.
    pub qubit_operands: Vec<Qubit>,
    /// Classical bit operands.
    #[serde(default)]
    pub bit_operands: Vec<Clbit>,
    /// Gate angles.
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    /// Optional classical condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

/// Serialized input form of a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitDescriptor {
    /// Circuit name.
    pub name: String,
    /// Quantum registers.
    #[serde(default)]
    pub qregs: Vec<Register>,
    /// Classical registers.
    #[serde(default)]
    pub cregs: Vec<Register>,
    /// Operations in program order.
    #[serde(default)]
    pub operations: Vec<OperationDescriptor>,
}

impl TryFrom<CircuitDescriptor> for Circuit {
    type Error = IrError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(desc: CircuitDescriptor) -> IrResult<Self> {
        let mut circuit = Circuit::new(desc.name);
        for reg in desc.qregs {
            circuit.add_qreg(reg.name, reg.size)?;
        }
        for reg in desc.cregs {
            circuit.add_creg(reg.name, reg.size)?;
        }
        for op in desc.operations {
            let kind = match op.gate_name.as_str() {
                "measure" => InstructionKind::Measure,
                "reset" => InstructionKind::Reset,
                "barrier" => InstructionKind::Barrier,
                name => {
                    let params = op.params.into_iter().map(Into::into).collect();
                    let mut gate = Gate::by_name(name, op.qubit_operands.len() as u32, params)?;
                    gate.condition = op.condition;
                    InstructionKind::Gate(gate)
                }
            };
            circuit.append(kind, op.qubit_operands, op.bit_operands)?;
        }
        Ok(circuit)
    }
}

impl From<&Circuit> for CircuitDescriptor {
    fn from(circuit: &Circuit) -> Self {
        let operations = circuit
            .ops
            .iter()
            .map(|op| {
                let (params, condition) = match &op.kind {
                    InstructionKind::Gate(g) => (
                        g.kind
                            .parameters()
                            .into_iter()
                            .map(|p| ParamSpec::Expression(p.clone()))
                            .collect(),
                        g.condition.clone(),
                    ),
                    _ => (vec![], None),
                };
                OperationDescriptor {
                    gate_name: op.name().to_string(),
                    qubit_operands: op.qubits.clone(),
                    bit_operands: op.clbits.clone(),
                    params,
                    condition,
                }
            })
            .collect();
        Self {
            name: circuit.name.clone(),
            qregs: circuit.qregs.clone(),
            cregs: circuit.cregs.clone(),
            operations,
        }
    }
}
