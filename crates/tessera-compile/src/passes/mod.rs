//! Built-in compilation passes.
//!
//! - [`target`]: passes that need the target description (basis gates,
//!   coupling map): unrolling, routing and direction correction
//! - [`agnostic`]: peephole optimizations that only look at DAG structure

pub mod agnostic;
pub mod target;

pub use agnostic::{CancelInverse, OneQubitBasis, Optimize1qGates};
pub use target::{DirectionMapper, SwapMapper, Unroller};
