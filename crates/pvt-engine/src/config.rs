//! Engine configuration: typed descriptor blocks.
//!
//! Everything the old-style integer/real descriptor arrays carried is a
//! named field here, validated when the engine is built. Phase-naming
//! thresholds and viscosity tunings stay configuration rather than
//! constants; their historical derivations are empirical.

use pvt_core::{ComponentSet, UnitSet};
use pvt_eos::cache::CubicTuning;
use pvt_eos::cubic::PhaseIdConfig;
use pvt_eos::method::EosMethod;
use pvt_eos::table::CoefficientTable;
use pvt_visc::CsMethod;
use pvt_visc::lbc::LBC_COEFFICIENTS;

/// Which coefficient-assembly strategy the cache is built for.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MethodConfig {
    Ideal,
    Tabulated {
        table: CoefficientTable,
        /// Override for the cubic form the table rides on.
        roots: Option<(f64, f64)>,
    },
    Cubic {
        method: EosMethod,
        tuning: CubicTuning,
    },
}

/// Viscosity model selection with its tuning block.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ViscosityConfig {
    LohrenzBrayClark {
        coefficients: [f64; 5],
    },
    JossiGss {
        mw_cutoff: f64,
        vtune: f64,
        blend_exponent: f64,
        coefficients: [f64; 5],
    },
    CorrespondingStates {
        method: CsMethod,
        /// vterm1..vterm4 tuning multipliers.
        tuning: [f64; 4],
    },
}

impl ViscosityConfig {
    pub fn lohrenz_default() -> Self {
        ViscosityConfig::LohrenzBrayClark {
            coefficients: LBC_COEFFICIENTS,
        }
    }

    pub fn jossi_default() -> Self {
        ViscosityConfig::JossiGss {
            mw_cutoff: 250.0,
            vtune: 1.0,
            blend_exponent: 1.0,
            coefficients: LBC_COEFFICIENTS,
        }
    }

    pub fn corresponding_states_default() -> Self {
        ViscosityConfig::CorrespondingStates {
            method: CsMethod::TwoParameter,
            tuning: [1.0; 4],
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    pub components: ComponentSet,
    pub units: UnitSet,
    pub method: MethodConfig,
    pub phase_id: PhaseIdConfig,
    pub viscosity: Option<ViscosityConfig>,
    /// Fallback temperature for tabulated data and pinned copies.
    pub default_temperature: f64,
    /// Tolerance on |sum(x) - 1| in the per-batch validation.
    pub composition_tolerance: f64,
}

impl EngineConfig {
    /// Start a config with the common defaults for a closed-form cubic.
    pub fn cubic(components: ComponentSet, method: EosMethod) -> Self {
        Self {
            components,
            units: UnitSet::si(),
            method: MethodConfig::Cubic {
                method,
                tuning: CubicTuning::default(),
            },
            phase_id: PhaseIdConfig::default(),
            viscosity: Some(ViscosityConfig::lohrenz_default()),
            default_temperature: 288.15,
            composition_tolerance: 1.0e-6,
        }
    }

    pub fn ideal(components: ComponentSet) -> Self {
        Self {
            viscosity: None,
            ..Self::cubic(components, EosMethod::Ideal)
        }
        .with_method(MethodConfig::Ideal)
    }

    pub fn with_method(mut self, method: MethodConfig) -> Self {
        self.method = method;
        self
    }

    pub fn with_units(mut self, units: UnitSet) -> Self {
        self.units = units;
        self
    }

    pub fn with_viscosity(mut self, viscosity: ViscosityConfig) -> Self {
        self.viscosity = Some(viscosity);
        self
    }

    pub fn with_phase_id(mut self, phase_id: PhaseIdConfig) -> Self {
        self.phase_id = phase_id;
        self
    }
}
