//! Property-based tests for the pass pipeline.

use proptest::prelude::*;
use tessera_compile::passes::{CancelInverse, OneQubitBasis, Optimize1qGates, Unroller};
use tessera_compile::unitary::Unitary2x2;
use tessera_compile::{
    BasisGates, CompileConfig, CouplingMap, Pass, PassManagerBuilder, PropertySet,
    RoutingSettings, backend, compile,
};
use tessera_ir::{Circuit, CircuitDag, QubitId};

#[derive(Debug, Clone)]
enum GateOp {
    H(u32),
    T(u32),
    Sx(u32),
    Rz(u32, f64),
    Ry(u32, f64),
    U1(u32, f64),
    U2(u32, f64, f64),
    U3(u32, f64, f64, f64),
    CX(u32, u32),
    CZ(u32, u32),
    Swap(u32, u32),
}

impl GateOp {
    fn apply(&self, circuit: &mut Circuit) {
        let _ = match *self {
            GateOp::H(q) => circuit.h(("q", q)),
            GateOp::T(q) => circuit.t(("q", q)),
            GateOp::Sx(q) => circuit.sx(("q", q)),
            GateOp::Rz(q, a) => circuit.rz(a, ("q", q)),
            GateOp::Ry(q, a) => circuit.ry(a, ("q", q)),
            GateOp::U1(q, l) => circuit.u1(l, ("q", q)),
            GateOp::U2(q, p, l) => circuit.u2(p, l, ("q", q)),
            GateOp::U3(q, t, p, l) => circuit.u3(t, p, l, ("q", q)),
            GateOp::CX(a, b) => circuit.cx(("q", a), ("q", b)),
            GateOp::CZ(a, b) => circuit.cz(("q", a), ("q", b)),
            GateOp::Swap(a, b) => circuit.swap(("q", a), ("q", b)),
        };
    }
}

fn angle() -> impl Strategy<Value = f64> {
    -3.2f64..3.2
}

fn pair(n: u32) -> impl Strategy<Value = (u32, u32)> {
    (0..n, 1..n).prop_map(move |(a, offset)| (a, (a + offset) % n))
}

fn arb_single(n: u32) -> impl Strategy<Value = GateOp> {
    prop_oneof![
        (0..n).prop_map(GateOp::H),
        (0..n).prop_map(GateOp::T),
        (0..n).prop_map(GateOp::Sx),
        (0..n, angle()).prop_map(|(q, a)| GateOp::Rz(q, a)),
        (0..n, angle()).prop_map(|(q, a)| GateOp::Ry(q, a)),
    ]
}

/// Gates drawn from the default `u1,u2,u3,cx,id` basis.
fn arb_basis_op(n: u32) -> impl Strategy<Value = GateOp> {
    prop_oneof![
        (0..n, angle()).prop_map(|(q, l)| GateOp::U1(q, l)),
        (0..n, angle(), angle()).prop_map(|(q, p, l)| GateOp::U2(q, p, l)),
        (0..n, angle(), angle(), angle()).prop_map(|(q, t, p, l)| GateOp::U3(q, t, p, l)),
        pair(n).prop_map(|(a, b)| GateOp::CX(a, b)),
    ]
}

fn arb_mixed_op(n: u32) -> impl Strategy<Value = GateOp> {
    prop_oneof![
        3 => arb_single(n),
        2 => pair(n).prop_map(|(a, b)| GateOp::CX(a, b)),
        1 => pair(n).prop_map(|(a, b)| GateOp::CZ(a, b)),
        1 => pair(n).prop_map(|(a, b)| GateOp::Swap(a, b)),
    ]
}

fn build(num_qubits: u32, ops: &[GateOp]) -> Circuit {
    let mut circuit = Circuit::with_size("prop", num_qubits, 0);
    for op in ops {
        op.apply(&mut circuit);
    }
    circuit
}

/// Per-qubit `(name, operands)` sequences; independent of how the DAG
/// breaks ties between unrelated operations.
fn wire_signature(dag: &CircuitDag) -> Vec<Vec<(String, Vec<QubitId>)>> {
    (0..dag.num_qubits() as u32)
        .map(|q| {
            dag.topological_ops()
                .filter(|(_, inst)| inst.qubits.contains(&QubitId(q)))
                .map(|(_, inst)| (inst.name().to_string(), inst.qubits.clone()))
                .collect()
        })
        .collect()
}

fn single_qubit_product(dag: &CircuitDag) -> Unitary2x2 {
    dag.topological_ops().fold(Unitary2x2::identity(), |acc, (_, inst)| {
        Unitary2x2::from_gate(inst.standard_gate().unwrap()).unwrap() * acc
    })
}

proptest! {
    #[test]
    fn unroll_leaves_basis_circuits_alone(
        (n, ops) in (2_u32..=4).prop_flat_map(|n| (Just(n), prop::collection::vec(arb_basis_op(n), 0..=25)))
    ) {
        let mut dag = CircuitDag::from_circuit(&build(n, &ops)).unwrap();
        let before = wire_signature(&dag);
        let mut props = PropertySet::new().with_basis(BasisGates::default());
        Unroller::new().run(&mut dag, &mut props).unwrap();
        prop_assert_eq!(wire_signature(&dag), before);
        prop_assert_eq!(dag.num_ops(), ops.len());
    }

    #[test]
    fn cancellation_is_idempotent(
        (n, ops) in (2_u32..=4).prop_flat_map(|n| (Just(n), prop::collection::vec(arb_mixed_op(n), 0..=30)))
    ) {
        let mut dag = CircuitDag::from_circuit(&build(n, &ops)).unwrap();
        let mut props = PropertySet::new();
        CancelInverse::new().run(&mut dag, &mut props).unwrap();
        let once = wire_signature(&dag);
        prop_assert!(dag.verify_integrity().is_ok());

        CancelInverse::new().run(&mut dag, &mut props).unwrap();
        prop_assert_eq!(wire_signature(&dag), once);
    }

    #[test]
    fn fusion_preserves_the_single_qubit_unitary(
        ops in prop::collection::vec(arb_single(1), 1..=12),
        family in prop_oneof![
            Just(OneQubitBasis::QE),
            Just(OneQubitBasis::U3),
            Just(OneQubitBasis::ZSX),
            Just(OneQubitBasis::ZYZ),
        ],
    ) {
        let mut dag = CircuitDag::from_circuit(&build(1, &ops)).unwrap();
        let expected = single_qubit_product(&dag);
        Optimize1qGates::with_basis(family)
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();

        prop_assert!(dag.num_ops() <= ops.len());
        prop_assert!(single_qubit_product(&dag).approx_eq_up_to_phase(&expected, 1e-7));
    }

    #[test]
    fn routed_gates_sit_on_directed_edges(
        (n, ops) in (2_u32..=5).prop_flat_map(|n| (Just(n), prop::collection::vec(arb_mixed_op(n), 1..=20))),
        seed in any::<u64>(),
        ring in any::<bool>(),
    ) {
        let coupling = if ring {
            CouplingMap::from_edges([(0, 1), (1, 2), (2, 3), (3, 4), (0, 4)])
        } else {
            CouplingMap::linear(5)
        };
        let basis = BasisGates::default();
        let (pm, mut props) = PassManagerBuilder::new()
            .with_target(coupling.clone(), basis.clone())
            .with_routing(RoutingSettings { trials: 4, seed })
            .build();
        let mut dag = CircuitDag::from_circuit(&build(n, &ops)).unwrap();
        pm.run(&mut dag, &mut props).unwrap();

        for (_, inst) in dag.topological_ops() {
            prop_assert!(basis.contains(inst.name()), "{} left unrolled", inst.name());
            if inst.qubits.len() == 2 {
                let (a, b) = (inst.qubits[0].0, inst.qubits[1].0);
                prop_assert!(coupling.has_edge(a, b), "{} on {},{}", inst.name(), a, b);
            }
        }
        prop_assert!(props.layout.is_some());
    }

    #[test]
    fn single_qubit_circuits_skip_routing(ops in prop::collection::vec(arb_single(1), 0..=10)) {
        let device = backend::builtin("ibmqx3").unwrap();
        let qobj = compile(&[build(1, &ops)], &device, &CompileConfig::default()).unwrap();
        let experiment = &qobj.circuits[0];
        prop_assert!(experiment.config.layout.is_none());
        prop_assert!(experiment.config.coupling_map.is_none());
        prop_assert_eq!(experiment.compiled_circuit.header.number_of_qubits, 1);
    }
}
