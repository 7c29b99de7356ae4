//! Qubit and classical bit types.
//!
//! Circuits address bits by `(register, index)` pairs ([`Qubit`], [`Clbit`]).
//! Inside a [`CircuitDag`](crate::CircuitDag) every bit is flattened to a wire
//! id ([`QubitId`], [`ClbitId`]) assigned in register declaration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IrError;

/// Flat wire identifier for a qubit inside a DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

/// Flat wire identifier for a classical bit inside a DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}

/// A named register declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Register {
    /// Register name.
    pub name: String,
    /// Number of bits in the register.
    pub size: u32,
}

impl Register {
    /// Create a new register declaration.
    pub fn new(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// A qubit reference: register name plus index.
///
/// Serialized as the string `name[index]`, so it can be used as a JSON map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Qubit {
    /// The register this qubit belongs to.
    pub register: String,
    /// The index within the register.
    pub index: u32,
}

impl Qubit {
    /// Create a new qubit reference.
    pub fn new(register: impl Into<String>, index: u32) -> Self {
        Self {
            register: register.into(),
            index,
        }
    }
}

impl fmt::Display for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.register, self.index)
    }
}

impl FromStr for Qubit {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (register, index) = parse_bit_reference(s)?;
        Ok(Self::new(register, index))
    }
}

impl TryFrom<String> for Qubit {
    type Error = IrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Qubit> for String {
    fn from(q: Qubit) -> Self {
        q.to_string()
    }
}

impl From<(&str, u32)> for Qubit {
    fn from((register, index): (&str, u32)) -> Self {
        Self::new(register, index)
    }
}

/// A classical bit reference: register name plus index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Clbit {
    /// The register this bit belongs to.
    pub register: String,
    /// The index within the register.
    pub index: u32,
}

impl Clbit {
    /// Create a new classical bit reference.
    pub fn new(register: impl Into<String>, index: u32) -> Self {
        Self {
            register: register.into(),
            index,
        }
    }
}

impl fmt::Display for Clbit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.register, self.index)
    }
}

impl FromStr for Clbit {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (register, index) = parse_bit_reference(s)?;
        Ok(Self::new(register, index))
    }
}

impl TryFrom<String> for Clbit {
    type Error = IrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Clbit> for String {
    fn from(c: Clbit) -> Self {
        c.to_string()
    }
}

impl From<(&str, u32)> for Clbit {
    fn from((register, index): (&str, u32)) -> Self {
        Self::new(register, index)
    }
}

fn parse_bit_reference(s: &str) -> Result<(&str, u32), IrError> {
    let invalid = || IrError::InvalidBitReference(s.to_string());
    let (name, rest) = s.trim().split_once('[').ok_or_else(invalid)?;
    let index = rest.strip_suffix(']').ok_or_else(invalid)?;
    if name.is_empty() {
        return Err(invalid());
    }
    let index = index.trim().parse::<u32>().map_err(|_| invalid())?;
    Ok((name, index))
}
