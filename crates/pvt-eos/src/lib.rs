//! pvt-eos: cubic equation-of-state engine for batched PVT evaluation.
//!
//! Provides:
//! - Method selection and cubic shape constants (`method`)
//! - Temperature-node coefficient tables (`table`)
//! - The immutable parameter cache (`cache`)
//! - Coefficient assembly into normalized A/B terms (`assembly`)
//! - The batched cubic root solver with branch selection (`cubic`)
//! - Fugacity / chemical potential, enthalpy, volume and density
//!   (`potential`, `enthalpy`, `volume`)
//! - Auxiliary transforms: mass conversion, Wilson K, thermal diffusion,
//!   parachor interfacial tension (`aux`, `tension`)
//!
//! Evaluation is batched over M independent objects; nothing here validates
//! per-object inputs at runtime. Construction is where all validation lives.

pub mod assembly;
pub mod aux;
pub mod cache;
pub mod cubic;
pub mod enthalpy;
pub mod error;
pub mod method;
pub mod potential;
pub mod table;
pub mod tension;
pub mod volume;

// Re-exports for ergonomics
pub use assembly::{AbTerms, AssemblyRequest, assemble, assemble_into, assemble_one};
pub use cache::{BinaryInteraction, CubicTuning, PvtCache};
pub use cubic::{CubicSolution, PhaseIdConfig, PhasePolicy, PhaseTag, solve_batch};
pub use enthalpy::{EnthalpyResult, enthalpy};
pub use error::{EosError, EosResult};
pub use method::{CubicShape, EosMethod};
pub use potential::{PotentialResult, chemical_potential, fugacity_coefficients};
pub use table::{CoefficientTable, SegmentIndex, TableNode};
pub use tension::{IftResult, TensionTerm, interfacial_tension, phase_tension_term};
pub use volume::{DensityResult, VolumeResult, density, volume};
