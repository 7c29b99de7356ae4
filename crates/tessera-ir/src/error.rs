//! IR errors.

use thiserror::Error;

use crate::qubit::{ClbitId, QubitId};

/// Everything that can go wrong building or editing a circuit or DAG.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// An operation references an undeclared register or index, or its
    /// operands do not fit the gate.
    #[error("malformed circuit '{circuit}': {detail}")]
    MalformedCircuit {
        circuit: String,
        detail: String,
    },

    #[error("register '{0}' declared twice")]
    DuplicateRegister(String),

    /// A DAG instruction names a qubit wire the DAG does not have.
    #[error("{operation} on unknown qubit {qubit}")]
    QubitNotFound { qubit: QubitId, operation: String },

    /// A DAG instruction names a classical wire the DAG does not have.
    #[error("{operation} on unknown classical bit {clbit}")]
    ClbitNotFound { clbit: ClbitId, operation: String },

    /// The same qubit appears twice among an instruction's operands.
    #[error("{operation} uses qubit {qubit} twice")]
    DuplicateQubit { qubit: QubitId, operation: String },

    #[error("gate '{gate_name}' acts on {expected} qubits, got {got}")]
    QubitCountMismatch {
        gate_name: String,
        expected: u32,
        got: u32,
    },

    #[error("gate '{gate_name}' takes {expected} parameters, got {got}")]
    ParameterCountMismatch {
        gate_name: String,
        expected: usize,
        got: usize,
    },

    /// A symbol had no value when a number was required.
    #[error("parameter '{0}' is unbound")]
    UnboundParameter(String),

    /// Broken internal structure; a bug rather than bad input.
    #[error("invalid DAG: {0}")]
    InvalidDag(String),

    #[error("node index is not an operation of this DAG")]
    InvalidNode,

    #[error("invalid bit reference '{0}', expected `name[index]`")]
    InvalidBitReference(String),
}

/// Result alias for IR operations.
pub type IrResult<T> = Result<T, IrError>;
