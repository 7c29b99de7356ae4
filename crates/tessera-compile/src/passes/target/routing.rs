//! SWAP insertion under a randomized multi-trial search.
//!
//! The DAG is cut into layers. Each trial walks the layers with its own
//! layout and generator; whenever a two-qubit gate lands on non-adjacent
//! physical qubits, a SWAP chain along a shortest coupling path brings its
//! operands together right before it. The trial with the fewest SWAPs wins
//! (earliest trial on ties) and its circuit replaces the DAG, expressed
//! over the device register `q`.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use tessera_ir::{CircuitDag, Instruction, QubitId, Register, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{CouplingMap, Layout, PropertySet, RoutingStats};

/// Preferred name of the device register the routed circuit is expressed
/// over.
pub const DEVICE_REGISTER: &str = "q";

/// [`DEVICE_REGISTER`], or `q0`, `q1`, ... when a classical register
/// already uses that name.
pub fn device_register_name(cregs: &[Register]) -> String {
    let taken = |name: &str| cregs.iter().any(|r| r.name == name);
    if !taken(DEVICE_REGISTER) {
        return DEVICE_REGISTER.to_string();
    }
    (0..)
        .map(|i| format!("{DEVICE_REGISTER}{i}"))
        .find(|name| !taken(name))
        .unwrap_or_default()
}

/// Coupling-aware router.
///
/// Reads the coupling map, the optional initial layout and the routing
/// settings from the `PropertySet`; leaves the final layout in
/// `properties.layout` and a [`RoutingStats`] custom property.
///
/// Circuits with at most one qubit, and all-to-all coupling maps, are
/// left untouched and get no layout.
pub struct SwapMapper;

/// Result of one trial.
struct Trial {
    ops: Vec<Instruction>,
    layout: Layout,
    swaps: usize,
}

/// Generator for trial `index`, derived from the base seed only.
fn trial_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Check a requested initial layout against the circuit and device.
fn validate_layout(layout: &Layout, num_qubits: u32, device: u32) -> CompileResult<()> {
    for q in 0..num_qubits {
        match layout.get_physical(QubitId(q)) {
            Some(p) if p < device => {}
            Some(p) => {
                return Err(CompileError::Configuration(format!(
                    "initial layout places q{q} on physical qubit {p}, device has {device}"
                )));
            }
            None => {
                return Err(CompileError::Configuration(format!(
                    "initial layout does not place virtual qubit q{q}"
                )));
            }
        }
    }
    Ok(())
}

struct Router<'a> {
    coupling: &'a CouplingMap,
    layers: &'a [Vec<Instruction>],
    num_qubits: u32,
}

impl Router<'_> {
    fn starting_layout(&self, initial: Option<&Layout>, index: usize, rng: &mut StdRng) -> Layout {
        if let Some(layout) = initial {
            return layout.clone();
        }
        if index == 0 {
            return Layout::trivial(self.num_qubits);
        }
        let mut physical: Vec<u32> = (0..self.coupling.num_qubits()).collect();
        physical.shuffle(rng);
        (0..self.num_qubits).map(QubitId).zip(physical).collect()
    }

    fn place(layout: &Layout, inst: &Instruction) -> CompileResult<Instruction> {
        let mut qubits = Vec::with_capacity(inst.qubits.len());
        for &q in &inst.qubits {
            let p = layout.get_physical(q).ok_or_else(|| {
                CompileError::Configuration(format!("virtual qubit {q} has no physical position"))
            })?;
            qubits.push(QubitId(p));
        }
        Ok(Instruction {
            kind: inst.kind.clone(),
            qubits,
            clbits: inst.clbits.clone(),
        })
    }

    /// Emit SWAPs that make the operands of a two-qubit gate adjacent.
    fn bring_together(
        &self,
        layout: &mut Layout,
        a: QubitId,
        b: QubitId,
        rng: &mut StdRng,
        ops: &mut Vec<Instruction>,
    ) -> CompileResult<usize> {
        let (Some(pa), Some(pb)) = (layout.get_physical(a), layout.get_physical(b)) else {
            return Err(CompileError::Configuration(format!(
                "virtual qubits {a}/{b} have no physical position"
            )));
        };
        if self.coupling.is_connected(pa, pb) {
            return Ok(0);
        }
        let path = self
            .coupling
            .shortest_path(pa, pb)
            .ok_or(CompileError::UnsatisfiableTopology { qubit1: pa, qubit2: pb })?;

        // Operands end on path[split] and path[split + 1].
        let last = path.len() - 1;
        let split = rng.gen_range(0..last);
        let mut emit = |x: u32, y: u32, layout: &mut Layout| {
            ops.push(Instruction::two_qubit_gate(
                StandardGate::Swap,
                QubitId(x),
                QubitId(y),
            ));
            layout.swap(x, y);
        };
        for i in 0..split {
            emit(path[i], path[i + 1], &mut *layout);
        }
        for j in (split + 2..=last).rev() {
            emit(path[j], path[j - 1], &mut *layout);
        }
        Ok(last - 1)
    }

    fn run_trial(&self, initial: Option<&Layout>, index: usize, seed: u64) -> CompileResult<Trial> {
        let mut rng = trial_rng(seed, index);
        let mut layout = self.starting_layout(initial, index, &mut rng);
        let mut ops = Vec::new();
        let mut swaps = 0;

        for layer in self.layers {
            let mut pairs = Vec::new();
            for inst in layer {
                if inst.is_gate() && inst.qubits.len() == 2 {
                    pairs.push(inst);
                } else {
                    ops.push(Self::place(&layout, inst)?);
                }
            }
            pairs.shuffle(&mut rng);
            for inst in pairs {
                swaps += self.bring_together(
                    &mut layout,
                    inst.qubits[0],
                    inst.qubits[1],
                    &mut rng,
                    &mut ops,
                )?;
                ops.push(Self::place(&layout, inst)?);
            }
        }

        Ok(Trial { ops, layout, swaps })
    }
}

impl Pass for SwapMapper {
    fn name(&self) -> &'static str {
        "SwapMapper"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    #[allow(clippy::cast_possible_truncation)]
    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;

        if dag.num_qubits() > coupling.num_qubits() as usize {
            return Err(CompileError::CircuitTooLarge {
                required: dag.num_qubits(),
                available: coupling.num_qubits(),
            });
        }
        if dag.num_qubits() <= 1 || coupling.is_all_to_all() {
            debug!("routing bypassed");
            properties.layout = None;
            return Ok(());
        }
        let num_qubits = dag.num_qubits() as u32;
        if let Some(layout) = &properties.layout {
            validate_layout(layout, num_qubits, coupling.num_qubits())?;
        }

        let mut layers = Vec::new();
        for layer in dag.layers() {
            let mut insts = Vec::with_capacity(layer.len());
            for node in layer {
                let inst = dag
                    .get_instruction(node)
                    .ok_or(tessera_ir::IrError::InvalidNode)?;
                if inst.is_gate() && inst.qubits.len() > 2 {
                    return Err(CompileError::UnroutableGate {
                        gate: inst.name().to_string(),
                        num_qubits: inst.qubits.len(),
                    });
                }
                insts.push(inst.clone());
            }
            layers.push(insts);
        }

        let router = Router {
            coupling,
            layers: &layers,
            num_qubits,
        };
        let settings = properties.routing;
        let initial = properties.layout.as_ref();
        let trials = settings.trials.max(1);
        let outcomes: Vec<CompileResult<Trial>> = (0..trials)
            .into_par_iter()
            .map(|index| router.run_trial(initial, index, settings.seed))
            .collect();

        let mut best: Option<(usize, Trial)> = None;
        let mut first_error = None;
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(trial) => {
                    if best.as_ref().is_none_or(|(_, b)| trial.swaps < b.swaps) {
                        best = Some((index, trial));
                    }
                }
                Err(e) => {
                    debug!(trial = index, error = %e, "routing trial failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        let Some((selected_trial, trial)) = best else {
            return Err(first_error.unwrap_or_else(|| {
                CompileError::Configuration("no routing trial ran".into())
            }));
        };

        let mut routed = CircuitDag::new();
        routed.set_name(dag.name());
        routed.add_qreg(Register::new(
            device_register_name(dag.cregs()),
            coupling.num_qubits(),
        ))?;
        for creg in dag.cregs() {
            routed.add_creg(creg.clone())?;
        }
        routed.set_basis(dag.basis().iter().cloned());
        for inst in trial.ops {
            routed.apply(inst)?;
        }

        info!(
            swaps = trial.swaps,
            selected_trial, trials, "routed '{}' onto {} physical qubits",
            dag.name(),
            coupling.num_qubits()
        );
        *dag = routed;
        properties.layout = Some(trial.layout);
        properties.insert(RoutingStats {
            swaps: trial.swaps,
            selected_trial,
            trials,
        });
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::RoutingSettings;
    use tessera_ir::Circuit;

    fn route(circuit: &Circuit, props: &mut PropertySet) -> CompileResult<CircuitDag> {
        let mut dag = CircuitDag::from_circuit(circuit).unwrap();
        SwapMapper.run(&mut dag, props)?;
        Ok(dag)
    }

    fn assert_adjacent(dag: &CircuitDag, coupling: &CouplingMap) {
        for (_, inst) in dag.topological_ops() {
            if inst.qubits.len() == 2 && inst.is_gate() {
                let (a, b) = (inst.qubits[0].0, inst.qubits[1].0);
                assert!(coupling.is_connected(a, b), "{} on {a},{b}", inst.name());
            }
        }
    }

    #[test]
    fn test_one_swap_on_a_line() {
        let mut circuit = Circuit::with_size("line", 3, 0);
        circuit.cx(("q", 0), ("q", 2)).unwrap();
        let coupling = CouplingMap::from_edges([(0, 1), (1, 2)]);
        let mut props = PropertySet::new().with_layout(Layout::trivial(3));
        props.coupling_map = Some(coupling.clone());

        let dag = route(&circuit, &mut props).unwrap();
        assert_eq!(dag.count_ops().get("swap"), Some(&1));
        assert_eq!(props.get::<RoutingStats>().map(|s| s.swaps), Some(1));
        assert_adjacent(&dag, &coupling);
        assert_eq!(props.layout.as_ref().map(Layout::len), Some(3));
    }

    #[test]
    fn test_adjacent_gates_need_no_swaps() {
        let mut circuit = Circuit::with_size("ghz", 4, 0);
        circuit
            .h(("q", 0))
            .unwrap()
            .cx(("q", 0), ("q", 1))
            .unwrap()
            .cx(("q", 1), ("q", 2))
            .unwrap()
            .cx(("q", 2), ("q", 3))
            .unwrap();
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::linear(5));
        let dag = route(&circuit, &mut props).unwrap();

        let stats = props.get::<RoutingStats>().unwrap();
        assert_eq!(stats.swaps, 0);
        assert_eq!(stats.selected_trial, 0);
        assert_eq!(stats.trials, 20);
        assert_eq!(dag.num_qubits(), 5);
        assert_eq!(props.layout, Some(Layout::trivial(4)));
    }

    #[test]
    fn test_single_qubit_bypass() {
        let mut circuit = Circuit::with_size("one", 1, 1);
        circuit.h(("q", 0)).unwrap().measure(("q", 0), ("c", 0)).unwrap();
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::linear(3));
        let dag = route(&circuit, &mut props).unwrap();
        assert_eq!(dag.num_qubits(), 1);
        assert!(props.layout.is_none());
        assert!(props.get::<RoutingStats>().is_none());
    }

    #[test]
    fn test_all_to_all_bypass() {
        let mut circuit = Circuit::with_size("full", 3, 0);
        circuit.cx(("q", 0), ("q", 2)).unwrap();
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::full(3));
        let dag = route(&circuit, &mut props).unwrap();
        assert_eq!(dag.num_ops(), 1);
        assert!(props.layout.is_none());
    }

    #[test]
    fn test_disconnected_topology() {
        let mut circuit = Circuit::with_size("split", 4, 0);
        circuit.cx(("q", 0), ("q", 3)).unwrap();
        let mut props = PropertySet::new().with_layout(Layout::trivial(4));
        props.coupling_map = Some(CouplingMap::from_edges([(0, 1), (2, 3)]));
        assert!(matches!(
            route(&circuit, &mut props),
            Err(CompileError::UnsatisfiableTopology { qubit1: 0, qubit2: 3 })
        ));
    }

    #[test]
    fn test_circuit_too_large() {
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::linear(2));
        let circuit = Circuit::ghz(3).unwrap();
        assert!(matches!(
            route(&circuit, &mut props),
            Err(CompileError::CircuitTooLarge { required: 3, available: 2 })
        ));
    }

    #[test]
    fn test_width_checked_before_all_to_all_bypass() {
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::full(2));
        assert!(matches!(
            route(&Circuit::ghz(3).unwrap(), &mut props),
            Err(CompileError::CircuitTooLarge { required: 3, available: 2 })
        ));
    }

    #[test]
    fn test_device_register_avoids_creg_names() {
        let mut circuit = Circuit::new("clash");
        circuit.add_qreg("r", 2).unwrap().add_creg("q", 2).unwrap();
        circuit
            .cx(("r", 0), ("r", 1))
            .unwrap()
            .measure(("r", 0), ("q", 0))
            .unwrap();
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::linear(3));
        let dag = route(&circuit, &mut props).unwrap();

        assert_eq!(dag.qubit_labels()[0].register, "q0");
        assert_eq!(dag.cregs()[0].name, "q");
        assert_eq!(dag.num_qubits(), 3);
        assert_eq!(device_register_name(&[]), DEVICE_REGISTER);
    }

    #[test]
    fn test_three_qubit_gates_rejected() {
        let mut circuit = Circuit::with_size("t", 3, 0);
        circuit.ccx(("q", 0), ("q", 1), ("q", 2)).unwrap();
        let mut props = PropertySet::new();
        props.coupling_map = Some(CouplingMap::linear(3));
        assert!(matches!(
            route(&circuit, &mut props),
            Err(CompileError::UnroutableGate { num_qubits: 3, .. })
        ));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let mut circuit = Circuit::with_size("r", 5, 5);
        for (a, b) in [(0, 4), (1, 3), (2, 0), (4, 1), (3, 2), (0, 3)] {
            circuit.cx(("q", a), ("q", b)).unwrap();
        }
        for i in 0..5 {
            circuit.measure(("q", i), ("c", i)).unwrap();
        }
        let run = || {
            let mut props = PropertySet::new().with_routing(RoutingSettings { trials: 8, seed: 7 });
            props.coupling_map = Some(CouplingMap::linear(5));
            let dag = route(&circuit, &mut props).unwrap();
            assert_adjacent(&dag, &CouplingMap::linear(5));
            (tessera_ir::to_qasm(&dag).unwrap(), props.layout)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_measurements_follow_their_qubit() {
        let mut circuit = Circuit::with_size("m", 3, 3);
        circuit
            .cx(("q", 0), ("q", 2))
            .unwrap()
            .measure(("q", 0), ("c", 0))
            .unwrap()
            .measure(("q", 2), ("c", 2))
            .unwrap();
        let mut props = PropertySet::new().with_layout(Layout::trivial(3));
        props.coupling_map = Some(CouplingMap::linear(3));
        let dag = route(&circuit, &mut props).unwrap();
        let layout = props.layout.unwrap();

        for (_, inst) in dag.topological_ops().filter(|(_, i)| i.is_measure()) {
            let virt = layout.get_logical(inst.qubits[0].0).unwrap();
            assert_eq!(virt.0, inst.clbits[0].0);
        }
    }

    #[test]
    fn test_bad_initial_layout() {
        let mut circuit = Circuit::with_size("l", 2, 0);
        circuit.cx(("q", 0), ("q", 1)).unwrap();
        let mut props = PropertySet::new().with_layout(Layout::from_iter([(QubitId(0), 0)]));
        props.coupling_map = Some(CouplingMap::linear(3));
        assert!(matches!(
            route(&circuit, &mut props),
            Err(CompileError::Configuration(_))
        ));
    }
}
