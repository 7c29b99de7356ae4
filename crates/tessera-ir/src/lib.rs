//! Tessera circuit intermediate representation.
//!
//! This crate holds the data structures the compiler works on: the circuit
//! model, the standard gate catalog, parameter expressions and the
//! dependency-graph form that every compilation pass rewrites.
//!
//! # Core Components
//!
//! - **Bits**: [`Qubit`] / [`Clbit`] are `(register, index)` references;
//!   inside a DAG they are flattened to [`QubitId`] / [`ClbitId`] wires
//! - **Gates**: [`StandardGate`] for the catalog (decomposition rules and
//!   inverses included) and [`CustomGate`] for user-defined operations
//! - **Parameters**: [`ParameterExpression`] for numeric or symbolic angles
//! - **Circuit**: [`Circuit`], an ordered operation list with a builder API,
//!   and [`CircuitDescriptor`], its serialized input form
//! - **DAG**: [`CircuitDag`], one edge chain per wire between In/Out nodes
//! - **Export**: [`JsonCircuit`] and [`to_qasm`]
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use tessera_ir::{Circuit, CircuitDag};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//! circuit
//!     .h(("q", 0))?
//!     .cx(("q", 0), ("q", 1))?
//!     .measure(("q", 0), ("c", 0))?
//!     .measure(("q", 1), ("c", 1))?;
//!
//! let dag = CircuitDag::from_circuit(&circuit)?;
//! assert_eq!(dag.num_ops(), 4);
//! assert_eq!(dag.depth(), 3);
//! # Ok::<(), tessera_ir::IrError>(())
//! ```
//!
//! # Example: Parameterized Circuit
//!
//! ```rust
//! use tessera_ir::{Circuit, ParameterExpression};
//! use std::f64::consts::PI;
//!
//! let mut circuit = Circuit::with_size("variational", 1, 0);
//! let theta = ParameterExpression::symbol("theta");
//! circuit.rx(theta.clone(), ("q", 0))?;
//!
//! assert!(theta.evaluate().is_err());
//! let bound = theta.bind("theta", PI / 4.0);
//! assert!((bound.evaluate()? - PI / 4.0).abs() < 1e-12);
//! # Ok::<(), tessera_ir::IrError>(())
//! ```

pub mod circuit;
pub mod dag;
pub mod error;
pub mod export;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;

pub use circuit::{Circuit, CircuitDescriptor, Operation, OperationDescriptor, ParamSpec};
pub use dag::{CircuitDag, DagEdge, DagNode, NodeIndex, WireId};
pub use error::{IrError, IrResult};
pub use export::{JsonCircuit, JsonConditional, JsonHeader, JsonInstruction, to_qasm};
pub use gate::{ClassicalCondition, CustomGate, Gate, GateKind, RuleStep, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::ParameterExpression;
pub use qubit::{Clbit, ClbitId, Qubit, QubitId, Register};
