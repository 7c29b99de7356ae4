//! Backend capability descriptors.
//!
//! A [`BackendConfiguration`] tells the driver which basis the device
//! speaks, how its qubits are wired and whether it is a simulator (which
//! relaxes the measurement-ordering rule). The coupling map may be given as
//! an edge list, as the legacy `{control: [targets]}` mapping, or as the
//! `"all-to-all"` sentinel.
//!
//! ```
//! use tessera_compile::backend::{self, CouplingMapSpec};
//!
//! let ibmqx2 = backend::builtin("ibmqx2").unwrap();
//! assert!(!ibmqx2.simulator);
//! let coupling = ibmqx2.coupling_map.resolve().unwrap().unwrap();
//! assert!(coupling.has_edge(0, 1));
//! assert!(!coupling.has_edge(1, 0));
//!
//! let spec: CouplingMapSpec = serde_json::from_str(r#""all-to-all""#).unwrap();
//! assert!(spec.resolve().unwrap().is_none());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CompileError, CompileResult};
use crate::property::{BasisGates, CouplingMap};

/// Sentinel for a device where every qubit pair interacts.
pub const ALL_TO_ALL: &str = "all-to-all";

/// The one backend that accepts an `hpc` block.
pub const HPC_SIMULATOR: &str = "ibmqx_hpc_qasm_simulator";

/// Default local simulator name.
pub const LOCAL_SIMULATOR: &str = "local_qasm_simulator";

/// A coupling map as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CouplingMapSpec {
    /// `[[control, target], ...]`.
    Edges(Vec<(u32, u32)>),
    /// Legacy `{"control": [target, ...]}`.
    Legacy(BTreeMap<String, Vec<u32>>),
    /// A named topology; only [`ALL_TO_ALL`] is recognised.
    Named(String),
}

impl CouplingMapSpec {
    /// The all-to-all sentinel.
    pub fn all_to_all() -> Self {
        Self::Named(ALL_TO_ALL.to_string())
    }

    /// Resolve to a coupling graph. `None` means no routing constraint.
    pub fn resolve(&self) -> CompileResult<Option<CouplingMap>> {
        match self {
            Self::Edges(edges) if edges.is_empty() => Ok(None),
            Self::Edges(edges) => Ok(Some(CouplingMap::from_edges(edges.iter().copied()))),
            Self::Legacy(map) => {
                let mut parsed = BTreeMap::new();
                for (control, targets) in map {
                    let control: u32 = control.trim().parse().map_err(|_| {
                        CompileError::Configuration(format!(
                            "coupling map key '{control}' is not a qubit index"
                        ))
                    })?;
                    parsed.insert(control, targets.clone());
                }
                if parsed.is_empty() {
                    return Ok(None);
                }
                Ok(Some(CouplingMap::from_legacy(&parsed)))
            }
            Self::Named(name) if name == ALL_TO_ALL => Ok(None),
            Self::Named(name) => Err(CompileError::Configuration(format!(
                "unknown coupling map '{name}'"
            ))),
        }
    }
}

impl From<&CouplingMap> for CouplingMapSpec {
    fn from(map: &CouplingMap) -> Self {
        Self::Edges(map.edges().to_vec())
    }
}

/// What the compiler needs to know about a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfiguration {
    /// Backend name.
    pub name: String,
    /// Native gates.
    #[serde(default)]
    pub basis_gates: BasisGates,
    /// Qubit connectivity.
    pub coupling_map: CouplingMapSpec,
    /// Whether the backend is a simulator.
    pub simulator: bool,
}

impl BackendConfiguration {
    /// A simulator with no connectivity constraint.
    pub fn simulator(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            basis_gates: BasisGates::default(),
            coupling_map: CouplingMapSpec::all_to_all(),
            simulator: true,
        }
    }

    /// A hardware device with the given legacy coupling mapping.
    pub fn device(name: impl Into<String>, coupling: &[(u32, &[u32])]) -> Self {
        let map = coupling
            .iter()
            .map(|(control, targets)| (control.to_string(), targets.to_vec()))
            .collect();
        Self {
            name: name.into(),
            basis_gates: BasisGates::default(),
            coupling_map: CouplingMapSpec::Legacy(map),
            simulator: false,
        }
    }

    /// Replace the basis.
    #[must_use]
    pub fn with_basis(mut self, basis_gates: BasisGates) -> Self {
        self.basis_gates = basis_gates;
        self
    }

    /// Replace the coupling map.
    #[must_use]
    pub fn with_coupling_map(mut self, coupling_map: CouplingMapSpec) -> Self {
        self.coupling_map = coupling_map;
        self
    }
}

/// Every built-in backend.
pub fn builtins() -> Vec<BackendConfiguration> {
    vec![
        BackendConfiguration::simulator(LOCAL_SIMULATOR),
        BackendConfiguration::simulator(HPC_SIMULATOR),
        BackendConfiguration::device("ibmqx2", &[(0, &[1, 2]), (1, &[2]), (3, &[2, 4]), (4, &[2])]),
        BackendConfiguration::device(
            "ibmqx3",
            &[
                (0, &[1]),
                (1, &[2]),
                (2, &[3]),
                (3, &[14]),
                (4, &[3, 5]),
                (6, &[7, 11]),
                (7, &[10]),
                (8, &[7]),
                (9, &[8, 10]),
                (11, &[10]),
                (12, &[5, 11, 13]),
                (13, &[4, 14]),
                (15, &[0, 14]),
            ],
        ),
    ]
}

/// Look up a built-in backend by name.
pub fn builtin(name: &str) -> Option<BackendConfiguration> {
    let found = builtins().into_iter().find(|b| b.name == name);
    if found.is_none() {
        warn!(backend = name, "no built-in backend configuration");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let sim = builtin(LOCAL_SIMULATOR).unwrap();
        assert!(sim.simulator);
        assert!(sim.coupling_map.resolve().unwrap().is_none());
        assert!(builtin(HPC_SIMULATOR).unwrap().simulator);
        assert!(builtin("ibmqx9").is_none());
    }

    #[test]
    fn test_ibmqx3_coupling() {
        let qx3 = builtin("ibmqx3").unwrap();
        let coupling = qx3.coupling_map.resolve().unwrap().unwrap();
        assert_eq!(coupling.num_qubits(), 16);
        assert_eq!(coupling.edges().len(), 20);
        assert!(coupling.has_edge(15, 0));
        assert!(coupling.is_connected_graph());
    }

    #[test]
    fn test_spec_forms_from_json() {
        let edges: CouplingMapSpec = serde_json::from_str("[[0, 1], [1, 2]]").unwrap();
        assert_eq!(edges, CouplingMapSpec::Edges(vec![(0, 1), (1, 2)]));

        let legacy: CouplingMapSpec = serde_json::from_str(r#"{"0": [1], "1": [2]}"#).unwrap();
        let resolved = legacy.resolve().unwrap().unwrap();
        assert_eq!(resolved, CouplingMap::from_edges([(0, 1), (1, 2)]));

        let named: CouplingMapSpec = serde_json::from_str(r#""all-to-all""#).unwrap();
        assert_eq!(named, CouplingMapSpec::all_to_all());
    }

    #[test]
    fn test_bad_specs() {
        let bad_key = CouplingMapSpec::Legacy(BTreeMap::from([("zero".to_string(), vec![1])]));
        assert!(matches!(bad_key.resolve(), Err(CompileError::Configuration(_))));
        let bad_name = CouplingMapSpec::Named("ring".into());
        assert!(matches!(bad_name.resolve(), Err(CompileError::Configuration(_))));
        assert!(CouplingMapSpec::Edges(vec![]).resolve().unwrap().is_none());
    }

    #[test]
    fn test_backend_from_json() {
        let json = r#"{
            "name": "lab_device",
            "basis_gates": "u1,u2,u3,cx,id",
            "coupling_map": [[0, 1]],
            "simulator": false
        }"#;
        let backend: BackendConfiguration = serde_json::from_str(json).unwrap();
        assert!(backend.basis_gates.contains("cx"));
        assert_eq!(
            backend.coupling_map.resolve().unwrap(),
            Some(CouplingMap::from_edges([(0, 1)]))
        );
    }
}
