//! Units and physical properties
//!
//! This module maps property names to their native units and labels, and
//! resolves the display unit requested by a caller to a scale factor.
//!
//! # Architecture
//!
//! - `system` - the `UnitSystem` trait and the default `SiUnits` implementation
//! - `registry` - `PropertyRegistry` with the built-in accelerator properties
//! - `context` - `UnitContext`, the per-plot view combining registry, unit
//!   system and requested display units

mod context;
mod registry;
mod system;

pub use context::UnitContext;
pub use registry::{Property, PropertyRegistry};
pub use system::{SiUnits, UnitSystem};
