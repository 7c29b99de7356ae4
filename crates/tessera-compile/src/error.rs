//! Error types for the compilation crate.

use tessera_ir::IrError;
use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR layer (malformed circuit, broken DAG invariant).
    #[error("IR error: {0}")]
    Ir(#[from] IrError),

    /// No decomposition path reaches the basis within the recursion bound.
    #[error("Gate '{gate}' cannot be expressed in the target basis (gave up at depth {depth})")]
    UnsupportedGate {
        /// The gate that could not be unrolled.
        gate: String,
        /// Recursion depth reached.
        depth: usize,
    },

    /// The coupling graph offers no path between two interacting qubits.
    #[error("No coupling path between physical qubits {qubit1} and {qubit2}")]
    UnsatisfiableTopology {
        /// First physical qubit.
        qubit1: u32,
        /// Second physical qubit.
        qubit2: u32,
    },

    /// A gate follows a measurement on the same qubit on real hardware.
    #[error(
        "Backend '{backend}' does not support operations after measurement \
         (circuit '{circuit}', qubit {qubit})"
    )]
    MeasurementOrdering {
        /// Target backend name.
        backend: String,
        /// Offending circuit name.
        circuit: String,
        /// The qubit used after being measured.
        qubit: String,
    },

    /// Invalid compile configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The circuit needs more qubits than the device has.
    #[error("Circuit requires {required} qubits but target only has {available}")]
    CircuitTooLarge {
        /// Number of qubits required.
        required: usize,
        /// Number of qubits available.
        available: u32,
    },

    /// The router only places one- and two-qubit gates.
    #[error("Gate '{gate}' acts on {num_qubits} qubits; unroll it before routing")]
    UnroutableGate {
        /// Gate name.
        gate: String,
        /// Number of qubits.
        num_qubits: usize,
    },

    /// A two-qubit gate sits on an edge only in the reverse direction and
    /// has no known flip.
    #[error("Gate '{gate}' on ({control}, {target}) has no supported direction")]
    UnsupportedDirection {
        /// Gate name.
        gate: String,
        /// Control (first) physical qubit.
        control: u32,
        /// Target (second) physical qubit.
        target: u32,
    },

    /// Missing coupling map.
    #[error("Coupling map not set")]
    MissingCouplingMap,

    /// Missing basis gates.
    #[error("Basis gates not set")]
    MissingBasisGates,

    /// Descriptor (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
