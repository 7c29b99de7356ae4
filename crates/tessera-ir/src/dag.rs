//! DAG-based circuit representation.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex as PetNodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::error::{IrError, IrResult};
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{Clbit, ClbitId, Qubit, QubitId, Register};

/// Node index type for the circuit DAG.
///
/// Indices stay valid across node removal.
pub type NodeIndex = PetNodeIndex<u32>;

/// A node in the circuit DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DagNode {
    /// Input node for a wire.
    In(WireId),
    /// Output node for a wire.
    Out(WireId),
    /// Operation node containing an instruction.
    Op(Instruction),
}

impl DagNode {
    /// Check if this is an operation node.
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self, DagNode::Op(_))
    }

    /// Get the instruction if this is an operation node.
    #[inline]
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }

    /// Get mutable reference to the instruction.
    #[inline]
    pub fn instruction_mut(&mut self) -> Option<&mut Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }
}

/// Identifier for a wire in the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WireId {
    /// A quantum wire.
    Qubit(QubitId),
    /// A classical wire.
    Clbit(ClbitId),
}

impl From<QubitId> for WireId {
    fn from(q: QubitId) -> Self {
        WireId::Qubit(q)
    }
}

impl From<ClbitId> for WireId {
    fn from(c: ClbitId) -> Self {
        WireId::Clbit(c)
    }
}

/// An edge in the circuit DAG representing a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DagEdge {
    /// The wire this edge represents.
    pub wire: WireId,
}

/// DAG-based circuit representation.
///
/// The circuit is represented as a directed acyclic graph where:
/// - Nodes are either input nodes, output nodes, or operation nodes
/// - Edges represent wires (quantum or classical)
/// - Each wire has exactly one input and one output node
/// - Following a wire from its input node visits its operations in program
///   order
///
/// Wires are created per register: qubit `(r, i)` gets flat id
/// `offset(r) + i`, where offsets follow declaration order. A gate carrying
/// a classical condition also occupies every bit of the condition register,
/// so it stays ordered after the measurements that feed it.
///
/// ## Performance
///
/// The DAG maintains a `wire_front` index that maps each wire to the
/// last node before the output node, so `apply()` finds its predecessors in
/// O(1) per wire.
#[derive(Debug, Clone)]
pub struct CircuitDag {
    graph: StableDiGraph<DagNode, DagEdge, u32>,
    name: String,
    qregs: Vec<Register>,
    cregs: Vec<Register>,
    qubit_inputs: FxHashMap<QubitId, NodeIndex>,
    qubit_outputs: FxHashMap<QubitId, NodeIndex>,
    clbit_inputs: FxHashMap<ClbitId, NodeIndex>,
    clbit_outputs: FxHashMap<ClbitId, NodeIndex>,
    wire_front: FxHashMap<WireId, NodeIndex>,
    /// Gate names this DAG is expressed in.
    basis: BTreeSet<String>,
}

impl CircuitDag {
    /// Create a new empty circuit DAG.
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::default(),
            name: String::new(),
            qregs: vec![],
            cregs: vec![],
            qubit_inputs: FxHashMap::default(),
            qubit_outputs: FxHashMap::default(),
            clbit_inputs: FxHashMap::default(),
            clbit_outputs: FxHashMap::default(),
            wire_front: FxHashMap::default(),
            basis: BTreeSet::new(),
        }
    }

    /// A DAG with the same name and registers but no operations.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        let mut dag = Self::new();
        dag.name.clone_from(&self.name);
        dag.basis.clone_from(&self.basis);
        for reg in &self.qregs {
            dag.push_qreg(reg.clone());
        }
        for reg in &self.cregs {
            dag.push_creg(reg.clone());
        }
        dag
    }

    /// Lower a circuit into a DAG.
    ///
    /// Any operand or condition that does not resolve against the declared
    /// registers fails with [`IrError::MalformedCircuit`].
    pub fn from_circuit(circuit: &Circuit) -> IrResult<Self> {
        let malformed = |detail: String| IrError::MalformedCircuit {
            circuit: circuit.name().to_string(),
            detail,
        };

        let mut dag = Self::new();
        dag.name = circuit.name().to_string();
        for reg in circuit.qregs() {
            dag.add_qreg(reg.clone())?;
        }
        for reg in circuit.cregs() {
            dag.add_creg(reg.clone())?;
        }

        for op in circuit.operations() {
            let qubits = op
                .qubits
                .iter()
                .map(|q| {
                    dag.qubit_id(q)
                        .ok_or_else(|| malformed(format!("'{}' uses undeclared qubit {q}", op.name())))
                })
                .collect::<IrResult<Vec<_>>>()?;
            let clbits = op
                .clbits
                .iter()
                .map(|c| {
                    dag.clbit_id(c)
                        .ok_or_else(|| malformed(format!("'{}' uses undeclared bit {c}", op.name())))
                })
                .collect::<IrResult<Vec<_>>>()?;
            let inst = Instruction {
                kind: op.kind.clone(),
                qubits,
                clbits,
            };
            dag.apply(inst).map_err(|e| match e {
                IrError::MalformedCircuit { .. } => e,
                other => malformed(other.to_string()),
            })?;
        }
        Ok(dag)
    }

    fn register_taken(&self, name: &str) -> bool {
        self.qregs.iter().chain(&self.cregs).any(|r| r.name == name)
    }

    fn add_wire(&mut self, wire: WireId) -> (NodeIndex, NodeIndex) {
        let in_node = self.graph.add_node(DagNode::In(wire));
        let out_node = self.graph.add_node(DagNode::Out(wire));
        self.graph.add_edge(in_node, out_node, DagEdge { wire });
        // Wire front: initially the input node is the predecessor of the output.
        self.wire_front.insert(wire, in_node);
        (in_node, out_node)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push_qreg(&mut self, reg: Register) {
        let offset = self.qubit_inputs.len() as u32;
        for i in 0..reg.size {
            let qubit = QubitId(offset + i);
            let (in_node, out_node) = self.add_wire(WireId::Qubit(qubit));
            self.qubit_inputs.insert(qubit, in_node);
            self.qubit_outputs.insert(qubit, out_node);
        }
        self.qregs.push(reg);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push_creg(&mut self, reg: Register) {
        let offset = self.clbit_inputs.len() as u32;
        for i in 0..reg.size {
            let clbit = ClbitId(offset + i);
            let (in_node, out_node) = self.add_wire(WireId::Clbit(clbit));
            self.clbit_inputs.insert(clbit, in_node);
            self.clbit_outputs.insert(clbit, out_node);
        }
        self.cregs.push(reg);
    }

    /// Declare a quantum register, creating one wire per qubit.
    pub fn add_qreg(&mut self, reg: Register) -> IrResult<()> {
        if self.register_taken(&reg.name) {
            return Err(IrError::DuplicateRegister(reg.name));
        }
        self.push_qreg(reg);
        Ok(())
    }

    /// Declare a classical register, creating one wire per bit.
    pub fn add_creg(&mut self, reg: Register) -> IrResult<()> {
        if self.register_taken(&reg.name) {
            return Err(IrError::DuplicateRegister(reg.name));
        }
        self.push_creg(reg);
        Ok(())
    }

    /// Flat id of a qubit reference.
    pub fn qubit_id(&self, qubit: &Qubit) -> Option<QubitId> {
        let mut offset = 0;
        for reg in &self.qregs {
            if reg.name == qubit.register {
                return (qubit.index < reg.size).then_some(QubitId(offset + qubit.index));
            }
            offset += reg.size;
        }
        None
    }

    /// Flat id of a classical bit reference.
    pub fn clbit_id(&self, clbit: &Clbit) -> Option<ClbitId> {
        let mut offset = 0;
        for reg in &self.cregs {
            if reg.name == clbit.register {
                return (clbit.index < reg.size).then_some(ClbitId(offset + clbit.index));
            }
            offset += reg.size;
        }
        None
    }

    /// Register reference of a flat qubit id.
    pub fn qubit(&self, id: QubitId) -> Option<Qubit> {
        let mut offset = 0;
        for reg in &self.qregs {
            if id.0 < offset + reg.size {
                return Some(Qubit::new(reg.name.clone(), id.0 - offset));
            }
            offset += reg.size;
        }
        None
    }

    /// Register reference of a flat classical bit id.
    pub fn clbit(&self, id: ClbitId) -> Option<Clbit> {
        let mut offset = 0;
        for reg in &self.cregs {
            if id.0 < offset + reg.size {
                return Some(Clbit::new(reg.name.clone(), id.0 - offset));
            }
            offset += reg.size;
        }
        None
    }

    /// Flat ids of every bit in a classical register.
    pub fn creg_bits(&self, name: &str) -> Option<Vec<ClbitId>> {
        let mut offset = 0;
        for reg in &self.cregs {
            if reg.name == name {
                return Some((offset..offset + reg.size).map(ClbitId).collect());
            }
            offset += reg.size;
        }
        None
    }

    /// Every wire the instruction occupies, including the bits of its
    /// condition register.
    pub fn wires_of(&self, instruction: &Instruction) -> IrResult<Vec<WireId>> {
        let mut wires: Vec<WireId> = instruction
            .qubits
            .iter()
            .map(|&q| WireId::Qubit(q))
            .chain(instruction.clbits.iter().map(|&c| WireId::Clbit(c)))
            .collect();
        if let Some(cond) = instruction.condition() {
            let bits = self.creg_bits(&cond.register).ok_or_else(|| {
                IrError::MalformedCircuit {
                    circuit: self.name.clone(),
                    detail: format!(
                        "'{}' is conditioned on undeclared register '{}'",
                        instruction.name(),
                        cond.register
                    ),
                }
            })?;
            for bit in bits {
                let wire = WireId::Clbit(bit);
                if !wires.contains(&wire) {
                    wires.push(wire);
                }
            }
        }
        Ok(wires)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn validate(&self, instruction: &Instruction) -> IrResult<()> {
        let operation = instruction.name();
        if let InstructionKind::Gate(gate) = &instruction.kind {
            let expected = gate.num_qubits();
            let got = instruction.qubits.len() as u32;
            if expected != got {
                return Err(IrError::QubitCountMismatch {
                    gate_name: operation.to_string(),
                    expected,
                    got,
                });
            }
        }

        let mut seen = FxHashSet::default();
        for &qubit in &instruction.qubits {
            if !self.qubit_inputs.contains_key(&qubit) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    operation: operation.to_string(),
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    operation: operation.to_string(),
                });
            }
        }
        if let Some(&clbit) = instruction
            .clbits
            .iter()
            .find(|c| !self.clbit_inputs.contains_key(c))
        {
            return Err(IrError::ClbitNotFound {
                clbit,
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn output_of(&self, wire: WireId) -> Option<NodeIndex> {
        match wire {
            WireId::Qubit(q) => self.qubit_outputs.get(&q).copied(),
            WireId::Clbit(c) => self.clbit_outputs.get(&c).copied(),
        }
    }

    fn input_of(&self, wire: WireId) -> Option<NodeIndex> {
        match wire {
            WireId::Qubit(q) => self.qubit_inputs.get(&q).copied(),
            WireId::Clbit(c) => self.clbit_inputs.get(&c).copied(),
        }
    }

    /// Append an instruction at the end of its wires.
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<NodeIndex> {
        self.validate(&instruction)?;
        let wires = self.wires_of(&instruction)?;
        if let InstructionKind::Gate(gate) = &instruction.kind {
            self.basis.insert(gate.name().to_string());
        }

        let op_node = self.graph.add_node(DagNode::Op(instruction));

        for wire in wires {
            let out_node = self
                .output_of(wire)
                .ok_or_else(|| IrError::InvalidDag(format!("wire {wire:?} has no output node")))?;
            let prev_node = self.wire_front[&wire];

            // Find and remove the edge from prev to output on this wire.
            let eid = self
                .graph
                .edges_directed(prev_node, Direction::Outgoing)
                .find(|e| e.weight().wire == wire && e.target() == out_node)
                .map(|e| e.id())
                .ok_or_else(|| {
                    IrError::InvalidDag(format!(
                        "Missing edge from predecessor to output for wire {wire:?}"
                    ))
                })?;
            self.graph.remove_edge(eid);
            self.graph.add_edge(prev_node, op_node, DagEdge { wire });
            self.graph.add_edge(op_node, out_node, DagEdge { wire });
            self.wire_front.insert(wire, op_node);
        }

        Ok(op_node)
    }

    /// All nodes in lexicographic topological order: among the nodes whose
    /// predecessors are done, the lowest index goes first.
    fn topological_nodes(&self) -> Vec<NodeIndex> {
        let mut pending: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut ready = BinaryHeap::new();
        for node in self.graph.node_indices() {
            let degree = self.graph.edges_directed(node, Direction::Incoming).count();
            if degree == 0 {
                ready.push(Reverse(node));
            } else {
                pending.insert(node, degree);
            }
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for edge in self.graph.edges_directed(node, Direction::Outgoing) {
                let target = edge.target();
                if let Some(degree) = pending.get_mut(&target) {
                    *degree -= 1;
                    if *degree == 0 {
                        pending.remove(&target);
                        ready.push(Reverse(target));
                    }
                }
            }
        }
        order
    }

    /// Iterate over operations in lexicographic topological order.
    pub fn topological_ops(&self) -> impl Iterator<Item = (NodeIndex, &Instruction)> {
        self.topological_nodes()
            .into_iter()
            .filter_map(|idx| self.graph[idx].instruction().map(|inst| (idx, inst)))
    }

    /// Operation nodes in index order.
    pub fn op_nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph[idx].is_op())
    }

    /// Partition operations into layers: each operation sits one layer after
    /// the latest operation it depends on. Layers are listed in order, and
    /// operations within a layer in topological order.
    pub fn layers(&self) -> Vec<Vec<NodeIndex>> {
        let mut level: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut layers: Vec<Vec<NodeIndex>> = vec![];
        for node in self.topological_nodes() {
            if !self.graph[node].is_op() {
                continue;
            }
            let depth = self
                .graph
                .edges_directed(node, Direction::Incoming)
                .filter_map(|e| level.get(&e.source()).map(|l| l + 1))
                .max()
                .unwrap_or(0);
            level.insert(node, depth);
            if layers.len() <= depth {
                layers.resize_with(depth + 1, Vec::new);
            }
            layers[depth].push(node);
        }
        layers
    }

    /// Get an instruction by node index.
    #[inline]
    pub fn get_instruction(&self, node: NodeIndex) -> Option<&Instruction> {
        self.graph.node_weight(node).and_then(|n| n.instruction())
    }

    /// Get a mutable instruction by node index.
    #[inline]
    pub fn get_instruction_mut(&mut self, node: NodeIndex) -> Option<&mut Instruction> {
        self.graph
            .node_weight_mut(node)
            .and_then(|n| n.instruction_mut())
    }

    /// The node following `node` on `wire`.
    pub fn successor_on(&self, node: NodeIndex, wire: WireId) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .find(|e| e.weight().wire == wire)
            .map(|e| e.target())
    }

    /// The node preceding `node` on `wire`.
    pub fn predecessor_on(&self, node: NodeIndex, wire: WireId) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .find(|e| e.weight().wire == wire)
            .map(|e| e.source())
    }

    /// Operations on one wire, in program order.
    pub fn wire_ops(&self, wire: WireId) -> Vec<NodeIndex> {
        let mut ops = vec![];
        let Some(mut current) = self.input_of(wire) else {
            return ops;
        };
        while let Some(next) = self.successor_on(current, wire) {
            if !self.graph[next].is_op() {
                break;
            }
            ops.push(next);
            current = next;
        }
        ops
    }

    /// Remove an operation node, reconnecting each of its wires.
    pub fn remove_op(&mut self, node: NodeIndex) -> IrResult<Instruction> {
        if !self.graph.node_weight(node).is_some_and(DagNode::is_op) {
            return Err(match self.graph.node_weight(node) {
                None => IrError::InvalidNode,
                Some(_) => IrError::InvalidDag("Cannot remove non-operation node".into()),
            });
        }

        let incoming: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.source(), e.weight().wire))
            .collect();
        let outgoing: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.target(), e.weight().wire))
            .collect();

        for (pred, wire) in &incoming {
            if self.wire_front.get(wire) == Some(&node) {
                self.wire_front.insert(*wire, *pred);
            }
        }

        let Some(DagNode::Op(instruction)) = self.graph.remove_node(node) else {
            return Err(IrError::InvalidNode);
        };

        for (pred, wire) in &incoming {
            for (succ, succ_wire) in &outgoing {
                if wire == succ_wire {
                    self.graph.add_edge(*pred, *succ, DagEdge { wire: *wire });
                }
            }
        }

        Ok(instruction)
    }

    /// Replace one operation node with a sequence of instructions, spliced
    /// in place.
    ///
    /// Every replacement instruction must stay on the wires of the node it
    /// replaces. An empty replacement removes the node.
    pub fn substitute_node(
        &mut self,
        node: NodeIndex,
        replacement: impl IntoIterator<Item = Instruction>,
    ) -> IrResult<Vec<NodeIndex>> {
        if !self.graph.node_weight(node).is_some_and(DagNode::is_op) {
            return Err(IrError::InvalidNode);
        }
        let replacement: Vec<Instruction> = replacement.into_iter().collect();

        let mut tails: FxHashMap<WireId, NodeIndex> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| (e.weight().wire, e.source()))
            .collect();
        let successors: Vec<(WireId, NodeIndex)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.weight().wire, e.target()))
            .collect();

        let mut planned = Vec::with_capacity(replacement.len());
        for inst in replacement {
            self.validate(&inst)?;
            let wires = self.wires_of(&inst)?;
            if let Some(stray) = wires.iter().find(|w| !tails.contains_key(w)) {
                return Err(IrError::InvalidDag(format!(
                    "replacement '{}' leaves the wires of the substituted node ({stray:?})",
                    inst.name()
                )));
            }
            planned.push((inst, wires));
        }

        self.graph.remove_node(node);

        let mut new_nodes = Vec::with_capacity(planned.len());
        for (inst, wires) in planned {
            if let InstructionKind::Gate(gate) = &inst.kind {
                self.basis.insert(gate.name().to_string());
            }
            let new_node = self.graph.add_node(DagNode::Op(inst));
            for wire in wires {
                let tail = tails[&wire];
                self.graph.add_edge(tail, new_node, DagEdge { wire });
                tails.insert(wire, new_node);
            }
            new_nodes.push(new_node);
        }

        for (wire, succ) in successors {
            let tail = tails[&wire];
            self.graph.add_edge(tail, succ, DagEdge { wire });
            if self.wire_front.get(&wire) == Some(&node) {
                self.wire_front.insert(wire, tail);
            }
        }

        Ok(new_nodes)
    }

    /// Circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the circuit.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Quantum registers in declaration order.
    pub fn qregs(&self) -> &[Register] {
        &self.qregs
    }

    /// Classical registers in declaration order.
    pub fn cregs(&self) -> &[Register] {
        &self.cregs
    }

    /// Gate names this DAG is expressed in.
    pub fn basis(&self) -> &BTreeSet<String> {
        &self.basis
    }

    /// Replace the recorded basis.
    pub fn set_basis(&mut self, basis: impl IntoIterator<Item = String>) {
        self.basis = basis.into_iter().collect();
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.qubit_inputs.len()
    }

    /// Get the number of classical bits.
    #[inline]
    pub fn num_clbits(&self) -> usize {
        self.clbit_inputs.len()
    }

    /// Get the number of operations.
    ///
    /// Computed as total nodes minus input and output nodes (2 per wire).
    #[inline]
    pub fn num_ops(&self) -> usize {
        let io_nodes = 2 * (self.qubit_inputs.len() + self.clbit_inputs.len());
        self.graph.node_count().saturating_sub(io_nodes)
    }

    /// Operation counts by name.
    pub fn count_ops(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (_, inst) in self.topological_ops() {
            *counts.entry(inst.name().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Calculate the circuit depth (number of layers).
    pub fn depth(&self) -> usize {
        self.layers().len()
    }

    /// Flat qubit ids in order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> {
        (0..self.qubit_inputs.len() as u32).map(QubitId)
    }

    /// Flat classical bit ids in order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn clbits(&self) -> impl Iterator<Item = ClbitId> {
        (0..self.clbit_inputs.len() as u32).map(ClbitId)
    }

    /// Register references of every qubit, in flat id order.
    pub fn qubit_labels(&self) -> Vec<Qubit> {
        self.qubits().filter_map(|q| self.qubit(q)).collect()
    }

    /// Register references of every classical bit, in flat id order.
    pub fn clbit_labels(&self) -> Vec<Clbit> {
        self.clbits().filter_map(|c| self.clbit(c)).collect()
    }

    /// Get a reference to the underlying graph.
    pub fn graph(&self) -> &StableDiGraph<DagNode, DagEdge, u32> {
        &self.graph
    }

    /// Verify the structural integrity of the DAG.
    ///
    /// Checks that:
    /// - The graph is acyclic
    /// - Every wire has an In and an Out node
    /// - Each wire forms a single path from its In to its Out node
    /// - Every operation node is reached by the topological walk
    pub fn verify_integrity(&self) -> IrResult<()> {
        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(IrError::InvalidDag("Graph contains a cycle".into()));
        }

        let wires = self
            .qubits()
            .map(WireId::Qubit)
            .chain(self.clbits().map(WireId::Clbit));
        for wire in wires {
            let (Some(in_node), Some(out_node)) = (self.input_of(wire), self.output_of(wire))
            else {
                return Err(IrError::InvalidDag(format!(
                    "Wire {wire:?} is missing its In or Out node"
                )));
            };

            let mut current = in_node;
            let mut steps = 0;
            let max_steps = self.graph.node_count();
            while current != out_node {
                current = self.successor_on(current, wire).ok_or_else(|| {
                    IrError::InvalidDag(format!(
                        "Wire {wire:?} is broken: no outgoing edge from node {current:?}"
                    ))
                })?;
                steps += 1;
                if steps > max_steps {
                    return Err(IrError::InvalidDag(format!(
                        "Wire {wire:?} has too many steps (possible infinite loop)"
                    )));
                }
            }
            if self.wire_front.get(&wire).copied() != self.predecessor_on(out_node, wire) {
                return Err(IrError::InvalidDag(format!(
                    "Wire front for {wire:?} is stale"
                )));
            }
        }

        if self.topological_nodes().len() != self.graph.node_count() {
            return Err(IrError::InvalidDag(
                "Unreachable operation node found in DAG".into(),
            ));
        }

        Ok(())
    }
}

impl Default for CircuitDag {
    fn default() -> Self {
        Self::new()
    }
}
