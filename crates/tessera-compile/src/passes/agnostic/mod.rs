//! Target-agnostic compilation passes.
//!
//! These only rewrite local patterns in the DAG and never move an
//! operation across a measurement, reset or barrier.

pub mod optimization;

pub use optimization::{CancelInverse, OneQubitBasis, Optimize1qGates};
