//! pvt-engine: the batched PVT evaluation façade.
//!
//! Ties one parameter cache, one cubic form and one viscosity model into a
//! single per-batch pipeline: validation -> coefficient assembly -> cubic
//! solve -> properties / viscosity / auxiliary transforms. Constructed from
//! a validated [`EngineConfig`]; per-object input problems surface as status
//! flags on the output, never as errors.

pub mod config;
pub mod engine;
pub mod scratch;

// Re-exports for ergonomics
pub use config::{EngineConfig, MethodConfig, ViscosityConfig};
pub use engine::{
    BatchInputs, EngineOutput, EvaluationRequest, PotentialKind, PvtEngine,
};
pub use scratch::Scratch;
