//! Integration tests for measurement safety across optimization passes.
//!
//! No pass may fuse, cancel or reorder gates across a measurement, and real
//! devices reject any gate on a qubit after it has been measured.

use std::f64::consts::PI;

use tessera_compile::passes::{CancelInverse, OneQubitBasis, Optimize1qGates};
use tessera_compile::{
    BasisGates, CompileConfig, CompileError, CouplingMap, Pass, PassManagerBuilder, PropertySet,
    backend, compile, compile_for,
};
use tessera_ir::{Circuit, CircuitDag, QubitId};

fn count_ops(dag: &CircuitDag, kind: &str) -> usize {
    dag.topological_ops()
        .filter(|(_, inst)| inst.name() == kind)
        .count()
}

/// Operation names touching one qubit, in topological order.
fn ops_on_qubit(dag: &CircuitDag, qubit: QubitId) -> Vec<String> {
    dag.topological_ops()
        .filter(|(_, inst)| inst.qubits.contains(&qubit))
        .map(|(_, inst)| inst.name().to_string())
        .collect()
}

fn assert_gates_around_measure(ops: &[String]) {
    let meas_idx = ops
        .iter()
        .position(|op| op == "measure")
        .expect("measurement must survive");
    assert!(meas_idx > 0, "gates must exist before the measurement: {ops:?}");
    assert!(meas_idx < ops.len() - 1, "gates must exist after the measurement: {ops:?}");
}

#[test]
fn test_h_measure_h_not_fused() {
    let mut circuit = Circuit::with_size("test", 1, 1);
    circuit
        .h(("q", 0))
        .unwrap()
        .measure(("q", 0), ("c", 0))
        .unwrap()
        .h(("q", 0))
        .unwrap();
    let mut dag = CircuitDag::from_circuit(&circuit).unwrap();
    let mut props = PropertySet::new();

    Optimize1qGates::with_basis(OneQubitBasis::ZYZ)
        .run(&mut dag, &mut props)
        .unwrap();

    assert_gates_around_measure(&ops_on_qubit(&dag, QubitId(0)));
}

#[test]
fn test_cx_measure_cx_not_cancelled() {
    let mut circuit = Circuit::with_size("test", 2, 1);
    circuit
        .cx(("q", 0), ("q", 1))
        .unwrap()
        .measure(("q", 0), ("c", 0))
        .unwrap()
        .cx(("q", 0), ("q", 1))
        .unwrap();
    let mut dag = CircuitDag::from_circuit(&circuit).unwrap();
    let mut props = PropertySet::new();

    CancelInverse::new().run(&mut dag, &mut props).unwrap();

    assert_eq!(count_ops(&dag, "cx"), 2);
    assert_eq!(count_ops(&dag, "measure"), 1);
}

#[test]
fn test_rz_measure_rz_not_merged() {
    let mut circuit = Circuit::with_size("test", 1, 1);
    circuit
        .rz(PI, ("q", 0))
        .unwrap()
        .measure(("q", 0), ("c", 0))
        .unwrap()
        .rz(-PI, ("q", 0))
        .unwrap();
    let mut dag = CircuitDag::from_circuit(&circuit).unwrap();
    let mut props = PropertySet::new().with_basis(BasisGates::rz_sx());

    Optimize1qGates::new().run(&mut dag, &mut props).unwrap();

    assert_eq!(ops_on_qubit(&dag, QubitId(0)), vec!["rz", "measure", "rz"]);
}

#[test]
fn test_measure_reset_h_not_merged_with_pre_measurement() {
    let mut circuit = Circuit::with_size("test", 1, 1);
    circuit
        .h(("q", 0))
        .unwrap()
        .measure(("q", 0), ("c", 0))
        .unwrap()
        .reset(("q", 0))
        .unwrap()
        .h(("q", 0))
        .unwrap();
    let mut dag = CircuitDag::from_circuit(&circuit).unwrap();
    let mut props = PropertySet::new().with_basis(BasisGates::default());

    Optimize1qGates::new().run(&mut dag, &mut props).unwrap();

    assert_eq!(ops_on_qubit(&dag, QubitId(0)), vec!["h", "measure", "reset", "h"]);
}

#[test]
fn test_full_pipeline_mid_circuit_measurement() {
    let mut circuit = Circuit::with_size("test", 2, 1);
    circuit
        .h(("q", 0))
        .unwrap()
        .cx(("q", 0), ("q", 1))
        .unwrap()
        .measure(("q", 0), ("c", 0))
        .unwrap()
        .h(("q", 0))
        .unwrap()
        .cx(("q", 0), ("q", 1))
        .unwrap();
    let mut dag = CircuitDag::from_circuit(&circuit).unwrap();

    let (pm, mut props) = PassManagerBuilder::new()
        .with_target(CouplingMap::from_edges([(0, 1)]), BasisGates::default())
        .build();
    pm.run(&mut dag, &mut props).unwrap();

    assert_eq!(count_ops(&dag, "measure"), 1);
    let layout = props.layout.as_ref().unwrap();
    let physical = QubitId(layout.get_physical(QubitId(0)).unwrap());
    assert_gates_around_measure(&ops_on_qubit(&dag, physical));
}

#[test]
fn test_device_rejects_gate_after_measure() {
    let mut circuit = Circuit::with_size("late_gate", 2, 2);
    circuit
        .h(("q", 0))
        .unwrap()
        .measure(("q", 0), ("c", 0))
        .unwrap()
        .x(("q", 0))
        .unwrap();
    let device = backend::builtin("ibmqx2").unwrap();

    let err = compile(&[circuit.clone()], &device, &CompileConfig::default()).unwrap_err();
    match err {
        CompileError::MeasurementOrdering { backend, circuit, qubit } => {
            assert_eq!(backend, "ibmqx2");
            assert_eq!(circuit, "late_gate");
            assert_eq!(qubit, "q[0]");
        }
        other => panic!("unexpected error {other:?}"),
    }

    // Simulators accept the same circuit.
    assert!(compile_for(&[circuit], &CompileConfig::default()).is_ok());
}

#[test]
fn test_device_measurements_are_pinned_by_barriers() {
    let device = backend::builtin("ibmqx2").unwrap();
    let qobj = compile(&[Circuit::bell().unwrap()], &device, &CompileConfig::default()).unwrap();
    let text = &qobj.circuits[0].compiled_circuit_text;

    let lines: Vec<&str> = text.lines().collect();
    let mut measured = 0;
    for (i, line) in lines.iter().enumerate() {
        let Some(rest) = line.strip_prefix("measure ") else {
            continue;
        };
        let qubit = rest.split(" -> ").next().unwrap();
        let pinned = format!("barrier {qubit};");
        assert!(
            lines[..i].contains(&pinned.as_str()),
            "{qubit} measured without a barrier:\n{text}"
        );
        measured += 1;
    }
    assert_eq!(measured, 2);
}
