//! pvt-visc: batched viscosity correlations for the PVT engine.
//!
//! Three interchangeable models behind one contract:
//! - Lohrenz–Bray–Clark (`lbc`)
//! - Jossi/GSS light–heavy split (`split`)
//! - Corresponding states on a methane BWRS reference (`corresponding`,
//!   with `bwrs` and `methane` as its reference-fluid pieces)
//!
//! All models are batched over M objects, extrapolate silently out of
//! range, and report nothing on iteration caps beyond a debug log line.

pub mod bwrs;
pub mod corresponding;
pub mod lbc;
pub mod methane;
pub mod model;
pub mod split;

// Re-exports for ergonomics
pub use bwrs::{BwrsDensity, MethaneBwrs};
pub use corresponding::{CsMethod, CsModel};
pub use lbc::{LBC_COEFFICIENTS, LbcModel};
pub use model::{DensityInput, ViscosityModel, ViscosityRequest, ViscosityResult};
pub use split::JossiGssModel;
