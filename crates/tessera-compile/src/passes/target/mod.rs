//! Target-specific compilation passes.
//!
//! These read the basis gates and the coupling map from the `PropertySet`
//! and produce a circuit the device can run.

pub mod direction;
pub mod routing;
pub mod unroll;

pub use direction::DirectionMapper;
pub use routing::SwapMapper;
pub use unroll::Unroller;
