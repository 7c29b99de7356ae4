//! The job description handed to an execution backend.

use serde::{Deserialize, Serialize};
use tessera_ir::{JsonCircuit, Qubit};

use crate::backend::CouplingMapSpec;
use crate::error::CompileResult;

/// A compiled batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qobj {
    /// Job id, caller-supplied or a generated UUID.
    pub id: String,
    /// Batch-wide settings.
    pub config: QobjConfig,
    /// One entry per input circuit, in input order.
    pub circuits: Vec<QobjExperiment>,
}

impl Qobj {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> CompileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Batch-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QobjConfig {
    /// Credit cap for the run.
    pub max_credits: u32,
    /// Target backend name.
    pub backend: String,
    /// Repetitions per circuit.
    pub shots: u32,
    /// Only present for the HPC simulator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpc: Option<HpcConfig>,
}

/// Settings of the HPC simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HpcConfig {
    /// Share work across shots.
    pub multi_shot_optimization: bool,
    /// OpenMP threads per job.
    pub omp_num_threads: u32,
}

impl Default for HpcConfig {
    fn default() -> Self {
        Self {
            multi_shot_optimization: true,
            omp_num_threads: 16,
        }
    }
}

/// One compiled circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QobjExperiment {
    /// Circuit name.
    pub name: String,
    /// Structured form of the final DAG.
    pub compiled_circuit: JsonCircuit,
    /// OpenQASM 2.0 text of the final DAG.
    pub compiled_circuit_text: String,
    /// Settings the circuit was compiled with.
    pub config: ExperimentConfig,
}

/// Per-circuit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Coupling map routed against, `null` when unrouted.
    pub coupling_map: Option<CouplingMapSpec>,
    /// Final `[virtual, physical]` pairs, `null` when unrouted.
    pub layout: Option<Vec<(Qubit, Qubit)>>,
    /// Basis as a comma-separated list.
    pub basis_gates: String,
    /// Simulator seed.
    pub seed: Option<u64>,
    /// Caller-supplied entries passed through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
