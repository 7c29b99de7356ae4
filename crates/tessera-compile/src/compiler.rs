//! The batch compile driver.
//!
//! [`compile`] takes circuits, a backend descriptor and a [`CompileConfig`],
//! runs the pass pipeline on each circuit and assembles a [`Qobj`].
//! Circuits compile in parallel; the output keeps input order and the first
//! failing circuit (in input order) aborts the whole batch.

use std::collections::BTreeMap;

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use tessera_ir::{
    Circuit, CircuitDag, InstructionKind, IrError, JsonCircuit, Operation, Qubit, to_qasm,
};

use crate::backend::{self, BackendConfiguration, CouplingMapSpec, HPC_SIMULATOR, LOCAL_SIMULATOR};
use crate::error::{CompileError, CompileResult};
use crate::manager::PassManagerBuilder;
use crate::property::{BasisGates, CouplingMap, Layout, PropertySet, RoutingSettings};
use crate::qobj::{ExperimentConfig, HpcConfig, Qobj, QobjConfig, QobjExperiment};

/// Keys an `hpc` block must carry.
const HPC_KEYS: [&str; 2] = ["multi_shot_optimization", "omp_num_threads"];

/// Compile settings.
///
/// Every field has a default, so a partial JSON object is a valid config:
///
/// ```
/// use tessera_compile::CompileConfig;
///
/// let config: CompileConfig = serde_json::from_str(r#"{"shots": 512, "seed": null}"#).unwrap();
/// assert_eq!(config.shots, 512);
/// assert_eq!(config.seed, None);
/// assert_eq!(config.max_credits, 10);
/// assert_eq!(config.backend, "local_qasm_simulator");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Backend name, used by [`compile_for`] to pick a built-in descriptor.
    pub backend: String,
    /// Overrides the backend basis.
    pub basis_gates: Option<BasisGates>,
    /// Overrides the backend coupling map.
    pub coupling_map: Option<CouplingMapSpec>,
    /// Starting layout of the router, `{"q[0]": 3, ...}`.
    pub initial_layout: Option<BTreeMap<Qubit, u32>>,
    /// Repetitions per circuit.
    pub shots: u32,
    /// Credit cap.
    pub max_credits: u32,
    /// Simulator seed, copied into every experiment.
    pub seed: Option<u64>,
    /// Job id; a UUID is generated when absent.
    pub qobj_id: Option<String>,
    /// HPC simulator settings.
    pub hpc: Option<serde_json::Map<String, serde_json::Value>>,
    /// Extra entries copied into every experiment config.
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
    /// Routing trials per circuit.
    pub routing_trials: usize,
    /// Base seed of the routing search.
    pub routing_seed: u64,
}

impl Default for CompileConfig {
    fn default() -> Self {
        let routing = RoutingSettings::default();
        Self {
            backend: LOCAL_SIMULATOR.to_string(),
            basis_gates: None,
            coupling_map: None,
            initial_layout: None,
            shots: 1024,
            max_credits: 10,
            seed: Some(1),
            qobj_id: None,
            hpc: None,
            config: None,
            routing_trials: routing.trials,
            routing_seed: routing.seed,
        }
    }
}

impl CompileConfig {
    fn routing(&self) -> RoutingSettings {
        RoutingSettings {
            trials: self.routing_trials,
            seed: self.routing_seed,
        }
    }
}

/// Settings shared by every circuit of a batch once backend defaults are
/// applied.
struct Target<'a> {
    backend: &'a BackendConfiguration,
    config: &'a CompileConfig,
    basis: BasisGates,
    coupling: Option<CouplingMap>,
}

/// Settle the `hpc` block: defaulted for the HPC simulator, dropped for
/// every other backend.
fn resolve_hpc(
    backend: &str,
    hpc: Option<&serde_json::Map<String, serde_json::Value>>,
) -> CompileResult<Option<HpcConfig>> {
    if backend != HPC_SIMULATOR {
        if hpc.is_some() {
            info!(backend, "hpc settings only apply to {HPC_SIMULATOR}, ignoring them");
        }
        return Ok(None);
    }
    let Some(hpc) = hpc else {
        info!(
            "{HPC_SIMULATOR} needs hpc settings, using multi_shot_optimization = true and \
             omp_num_threads = 16"
        );
        return Ok(Some(HpcConfig::default()));
    };
    if let Some(missing) = HPC_KEYS.iter().find(|k| !hpc.contains_key(**k)) {
        return Err(CompileError::Configuration(format!(
            "unknown hpc parameter format, missing '{missing}'"
        )));
    }
    serde_json::from_value(serde_json::Value::Object(hpc.clone()))
        .map(Some)
        .map_err(|e| CompileError::Configuration(format!("invalid hpc parameters: {e}")))
}

/// Reject gates on measured qubits and pin every measurement behind a
/// barrier on its qubits.
///
/// Real devices cannot apply a gate to a qubit once it has been measured;
/// the barriers keep later passes from moving anything across a
/// measurement.
pub fn guard_measurements(circuit: &Circuit, backend: &str) -> CompileResult<Circuit> {
    let mut measured: FxHashSet<&Qubit> = FxHashSet::default();
    let mut ops = Vec::with_capacity(circuit.operations().len() * 2);
    for op in circuit.operations() {
        match &op.kind {
            InstructionKind::Measure => {
                ops.push(Operation {
                    kind: InstructionKind::Barrier,
                    qubits: op.qubits.clone(),
                    clbits: vec![],
                });
                measured.extend(&op.qubits);
            }
            InstructionKind::Gate(_) => {
                if let Some(qubit) = op.qubits.iter().find(|q| measured.contains(q)) {
                    return Err(CompileError::MeasurementOrdering {
                        backend: backend.to_string(),
                        circuit: circuit.name().to_string(),
                        qubit: qubit.to_string(),
                    });
                }
            }
            InstructionKind::Reset | InstructionKind::Barrier => {}
        }
        ops.push(op.clone());
    }
    let mut guarded = circuit.clone();
    guarded.set_operations(ops);
    Ok(guarded)
}

fn initial_layout(dag: &CircuitDag, requested: &BTreeMap<Qubit, u32>) -> CompileResult<Layout> {
    requested
        .iter()
        .map(|(qubit, &physical)| {
            dag.qubit_id(qubit).map(|id| (id, physical)).ok_or_else(|| {
                CompileError::Configuration(format!(
                    "initial layout names {qubit}, which circuit '{}' does not declare",
                    dag.name()
                ))
            })
        })
        .collect()
}

fn compile_circuit(circuit: &Circuit, target: &Target<'_>) -> CompileResult<QobjExperiment> {
    let guarded;
    let circuit = if target.backend.simulator {
        circuit
    } else {
        guarded = guard_measurements(circuit, &target.backend.name)?;
        &guarded
    };

    let coupling = if circuit.num_qubits() <= 1 {
        None
    } else {
        target.coupling.clone()
    };

    let mut dag = CircuitDag::from_circuit(circuit)?;
    let virtual_qubits = dag.qubit_labels();

    let mut properties = PropertySet::new()
        .with_basis(target.basis.clone())
        .with_routing(target.config.routing());
    properties.coupling_map = coupling;
    if let Some(requested) = &target.config.initial_layout {
        properties.layout = Some(initial_layout(&dag, requested)?);
    }

    let (pm, mut properties) = PassManagerBuilder::new()
        .with_properties(properties)
        .build();
    pm.run(&mut dag, &mut properties)?;

    let physical_qubits = dag.qubit_labels();
    let layout = match (&properties.coupling_map, &properties.layout) {
        (Some(_), Some(layout)) => Some(
            layout
                .pairs()
                .into_iter()
                .map(|(id, physical)| {
                    let virt = virtual_qubits.get(id.0 as usize).cloned().ok_or_else(|| {
                        IrError::InvalidDag(format!("layout names unknown virtual qubit {id}"))
                    })?;
                    let phys = physical_qubits.get(physical as usize).cloned().ok_or_else(
                        || IrError::InvalidDag(format!("no physical qubit {physical}")),
                    )?;
                    Ok((virt, phys))
                })
                .collect::<CompileResult<Vec<_>>>()?,
        ),
        _ => None,
    };

    debug!(circuit = circuit.name(), ops = dag.num_ops(), depth = dag.depth(), "compiled");

    Ok(QobjExperiment {
        name: circuit.name().to_string(),
        compiled_circuit: JsonCircuit::from_dag(&dag)?,
        compiled_circuit_text: to_qasm(&dag)?,
        config: ExperimentConfig {
            coupling_map: properties.coupling_map.as_ref().map(CouplingMapSpec::from),
            layout,
            basis_gates: target.basis.to_string(),
            seed: target.config.seed,
            extra: target.config.config.clone().unwrap_or_default(),
        },
    })
}

/// Compile a batch of circuits for `backend`.
#[instrument(skip_all, fields(backend = %backend.name, circuits = circuits.len()))]
pub fn compile(
    circuits: &[Circuit],
    backend: &BackendConfiguration,
    config: &CompileConfig,
) -> CompileResult<Qobj> {
    let id = config
        .qobj_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let hpc = resolve_hpc(&backend.name, config.hpc.as_ref())?;

    let basis = match &config.basis_gates {
        Some(basis) => basis.clone(),
        None => {
            info!(basis = %backend.basis_gates, "using backend basis gates");
            backend.basis_gates.clone()
        }
    };
    let coupling = match &config.coupling_map {
        Some(spec) => spec.resolve()?,
        None => {
            debug!("using backend coupling map");
            backend.coupling_map.resolve()?
        }
    };

    let target = Target {
        backend,
        config,
        basis,
        coupling,
    };
    let results: Vec<CompileResult<QobjExperiment>> = circuits
        .par_iter()
        .map(|circuit| compile_circuit(circuit, &target))
        .collect();
    let experiments = results.into_iter().collect::<CompileResult<Vec<_>>>()?;

    info!(id = %id, experiments = experiments.len(), "assembled job");

    Ok(Qobj {
        id,
        config: QobjConfig {
            max_credits: config.max_credits,
            backend: backend.name.clone(),
            shots: config.shots,
            hpc,
        },
        circuits: experiments,
    })
}

/// Compile for the built-in backend named by `config.backend`.
pub fn compile_for(circuits: &[Circuit], config: &CompileConfig) -> CompileResult<Qobj> {
    let backend = backend::builtin(&config.backend).ok_or_else(|| {
        CompileError::Configuration(format!("unknown backend '{}'", config.backend))
    })?;
    compile(circuits, &backend, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hpc_defaults_for_hpc_simulator() {
        assert_eq!(
            resolve_hpc(HPC_SIMULATOR, None).unwrap(),
            Some(HpcConfig::default())
        );
        let given = serde_json::json!({"multi_shot_optimization": false, "omp_num_threads": 4});
        let hpc = resolve_hpc(HPC_SIMULATOR, given.as_object()).unwrap().unwrap();
        assert!(!hpc.multi_shot_optimization);
        assert_eq!(hpc.omp_num_threads, 4);
    }

    #[test]
    fn test_hpc_missing_key() {
        let given = serde_json::json!({"omp_num_threads": 4});
        assert!(matches!(
            resolve_hpc(HPC_SIMULATOR, given.as_object()),
            Err(CompileError::Configuration(_))
        ));
    }

    #[test]
    fn test_hpc_dropped_elsewhere() {
        let given = serde_json::json!({"omp_num_threads": 4});
        assert_eq!(resolve_hpc("ibmqx2", given.as_object()).unwrap(), None);
    }

    #[test]
    fn test_guard_inserts_barriers() {
        let guarded = guard_measurements(&Circuit::bell().unwrap(), "ibmqx2").unwrap();
        let names: Vec<_> = guarded.operations().iter().map(Operation::name).collect();
        assert_eq!(names, vec!["h", "cx", "barrier", "measure", "barrier", "measure"]);
        assert_eq!(guarded.operations()[2].qubits, vec![Qubit::new("q", 0)]);
    }

    #[test]
    fn test_guard_allows_remeasure_and_reset() {
        let mut circuit = Circuit::with_size("m", 1, 2);
        circuit
            .measure(("q", 0), ("c", 0))
            .unwrap()
            .measure(("q", 0), ("c", 1))
            .unwrap()
            .reset(("q", 0))
            .unwrap();
        assert!(guard_measurements(&circuit, "ibmqx2").is_ok());
    }

    #[test]
    fn test_guard_rejects_gate_after_measure() {
        let mut circuit = Circuit::with_size("late", 2, 1);
        circuit
            .measure(("q", 1), ("c", 0))
            .unwrap()
            .cx(("q", 0), ("q", 1))
            .unwrap();
        match guard_measurements(&circuit, "ibmqx2") {
            Err(CompileError::MeasurementOrdering { backend, circuit, qubit }) => {
                assert_eq!(backend, "ibmqx2");
                assert_eq!(circuit, "late");
                assert_eq!(qubit, "q[1]");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_initial_layout_qubit() {
        let mut config = CompileConfig::default();
        config.initial_layout = Some(BTreeMap::from([(Qubit::new("r", 0), 0)]));
        let backend = backend::builtin("ibmqx2").unwrap();
        assert!(matches!(
            compile(&[Circuit::bell().unwrap()], &backend, &config),
            Err(CompileError::Configuration(_))
        ));
    }

    #[test]
    fn test_compile_for_unknown_backend() {
        let config = CompileConfig {
            backend: "nowhere".into(),
            ..CompileConfig::default()
        };
        assert!(matches!(
            compile_for(&[], &config),
            Err(CompileError::Configuration(_))
        ));
    }

    #[test]
    fn test_extra_config_is_flattened() {
        let config = CompileConfig {
            config: serde_json::json!({"memory": true}).as_object().cloned(),
            qobj_id: Some("job-1".into()),
            ..CompileConfig::default()
        };
        let qobj = compile_for(&[Circuit::bell().unwrap()], &config).unwrap();
        assert_eq!(qobj.id, "job-1");
        let json: serde_json::Value = serde_json::from_str(&qobj.to_json().unwrap()).unwrap();
        assert_eq!(json["circuits"][0]["config"]["memory"], serde_json::json!(true));
        assert_eq!(json["circuits"][0]["config"]["layout"], serde_json::Value::Null);
        assert!(json["config"].get("hpc").is_none());
    }
}
