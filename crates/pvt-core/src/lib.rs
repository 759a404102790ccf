//! pvt-core: stable foundation for the PVT property engine.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)
//! - tier (derivative request levels)
//! - component (component metadata sets)
//! - units (unit-conversion factor sets, built with uom)
//! - batch (borrowed batch views + per-object validation)

pub mod batch;
pub mod component;
pub mod error;
pub mod numeric;
pub mod tier;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use batch::{BatchState, ObjectStatus, validate_batch};
pub use component::{Component, ComponentSet, HeatPolynomial};
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use tier::DerivativeTier;
pub use units::UnitSet;
