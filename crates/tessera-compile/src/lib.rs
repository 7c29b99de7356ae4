//! Tessera compilation pipeline.
//!
//! This crate turns abstract circuits into circuits a device can run: every
//! gate rewritten into the device basis, every two-qubit gate placed on a
//! coupled pair of physical qubits in a supported direction, and the result
//! tidied by peephole passes. The [`compile`] driver runs that pipeline over
//! a batch of circuits and assembles the job description ([`Qobj`]) an
//! execution backend consumes.
//!
//! # Pipeline
//!
//! ```text
//! Circuit ──► CircuitDag
//!               │
//!               ├── Unroller          (always)
//!               │
//!               ├── SwapMapper        ┐
//!               ├── Unroller          │ only with a coupling map
//!               ├── DirectionMapper   │
//!               ├── CancelInverse     │
//!               └── Optimize1qGates   ┘
//!               │
//!               ▼
//!        JsonCircuit + QASM text + final layout
//! ```
//!
//! Passes share a [`PropertySet`] holding the basis, coupling map, layout
//! and routing settings. The router leaves the final layout there.
//!
//! # Example: compiling for a device
//!
//! ```rust
//! use tessera_compile::{CompileConfig, backend, compile};
//! use tessera_ir::Circuit;
//!
//! let mut circuit = Circuit::with_size("far", 3, 0);
//! circuit.h(("q", 0))?.cx(("q", 0), ("q", 2))?;
//!
//! let device = backend::builtin("ibmqx2").unwrap();
//! let qobj = compile(&[circuit], &device, &CompileConfig::default())?;
//!
//! let experiment = &qobj.circuits[0];
//! assert!(experiment.config.layout.is_some());
//! assert!(experiment.compiled_circuit_text.starts_with("OPENQASM 2.0;"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Example: running the pipeline directly
//!
//! ```rust
//! use tessera_compile::{BasisGates, CouplingMap, PassManagerBuilder};
//! use tessera_ir::{Circuit, CircuitDag};
//!
//! let (pm, mut props) = PassManagerBuilder::new()
//!     .with_target(CouplingMap::linear(3), BasisGates::default())
//!     .build();
//!
//! let mut dag = CircuitDag::from_circuit(&Circuit::ghz(3)?)?;
//! pm.run(&mut dag, &mut props)?;
//! assert!(dag.topological_ops().all(|(_, i)| BasisGates::default().contains(i.name())
//!     || i.is_measure() || i.is_barrier()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Custom Passes
//!
//! Implement the [`Pass`] trait to add a pass to a [`PassManager`]:
//!
//! ```rust
//! use tessera_compile::{CompileResult, Pass, PassKind, PropertySet};
//! use tessera_ir::CircuitDag;
//!
//! struct CountOps;
//!
//! impl Pass for CountOps {
//!     fn name(&self) -> &str { "count_ops" }
//!     fn kind(&self) -> PassKind { PassKind::Analysis }
//!
//!     fn run(&self, dag: &mut CircuitDag, props: &mut PropertySet) -> CompileResult<()> {
//!         props.insert(dag.count_ops());
//!         Ok(())
//!     }
//! }
//! ```

pub mod backend;
pub mod compiler;
pub mod error;
pub mod manager;
pub mod pass;
pub mod property;
pub mod qobj;
pub mod unitary;

// Built-in passes
pub mod passes;

pub use backend::{BackendConfiguration, CouplingMapSpec};
pub use compiler::{CompileConfig, compile, compile_for, guard_measurements};
pub use error::{CompileError, CompileResult};
pub use manager::{PassManager, PassManagerBuilder};
pub use pass::{Pass, PassKind};
pub use property::{
    BasisGates, CouplingMap, Layout, PropertySet, RoutingSettings, RoutingStats,
};
pub use qobj::{ExperimentConfig, HpcConfig, Qobj, QobjConfig, QobjExperiment};
