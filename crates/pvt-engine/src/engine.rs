//! The engine façade: one cache, one viscosity model, batched evaluation.
//!
//! A call runs validation -> segment resolution -> coefficient assembly ->
//! cubic solve -> the requested property stages, all over the same batch of
//! objects. Per-object input problems become status flags, not errors; the
//! only `Err` paths are shape mismatches and construction problems.

use pvt_core::{BatchState, DerivativeTier, ObjectStatus, validate_batch};
use pvt_eos::assembly::{AbTerms, AssemblyRequest, assemble};
use pvt_eos::aux;
use pvt_eos::cache::PvtCache;
use pvt_eos::cubic::{CubicSolution, PhaseIdConfig, PhaseTag, solve_batch};
use pvt_eos::enthalpy::{EnthalpyResult, enthalpy};
use pvt_eos::error::{EosError, EosResult};
use pvt_eos::potential::{PotentialResult, chemical_potential, fugacity_coefficients};
use pvt_eos::tension::{IftResult, interfacial_tension, phase_tension_term};
use pvt_eos::volume::{DensityResult, VolumeResult, density, volume};
use pvt_visc::{CsModel, DensityInput, JossiGssModel, LbcModel, ViscosityModel, ViscosityRequest, ViscosityResult};
use tracing::debug;

use crate::config::{EngineConfig, MethodConfig, ViscosityConfig};
use crate::scratch::Scratch;

/// Fugacity versus full chemical potential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PotentialKind {
    Fugacity,
    ChemicalPotential,
}

/// What one batch call should produce.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationRequest {
    pub tier: DerivativeTier,
    pub potential: Option<PotentialKind>,
    pub enthalpy: bool,
    pub viscosity: bool,
    pub phase_id: bool,
    /// Composition rows are mass fractions; they are converted once per
    /// call, and viscosity composition derivatives come back on the mass
    /// basis.
    pub mass_fraction_composition: bool,
}

impl EvaluationRequest {
    /// Everything on, at the given tier.
    pub fn full(tier: DerivativeTier) -> Self {
        Self {
            tier,
            potential: Some(PotentialKind::Fugacity),
            enthalpy: true,
            viscosity: true,
            phase_id: true,
            mass_fraction_composition: false,
        }
    }
}

/// Borrowed per-call input arrays.
#[derive(Debug, Clone, Copy)]
pub struct BatchInputs<'a> {
    pub pressure: &'a [f64],
    pub temperature: &'a [f64],
    /// M x N row-major composition.
    pub composition: &'a [f64],
}

/// Grouped outputs of one batch call.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub status: Vec<ObjectStatus>,
    pub terms: AbTerms,
    pub cubic: CubicSolution,
    pub phase: Option<Vec<PhaseTag>>,
    pub volume: VolumeResult,
    pub molar_density: DensityResult,
    pub mass_density: DensityResult,
    pub potential: Option<PotentialResult>,
    pub enthalpy: Option<EnthalpyResult>,
    pub viscosity: Option<ViscosityResult>,
}

/// The façade: an immutable cache plus per-call orchestration.
#[derive(Debug, Clone)]
pub struct PvtEngine {
    cache: PvtCache,
    phase_id: PhaseIdConfig,
    viscosity: Option<ViscosityModel>,
    composition_tolerance: f64,
}

impl PvtEngine {
    pub fn new(config: EngineConfig) -> EosResult<Self> {
        let EngineConfig {
            components,
            units,
            method,
            phase_id,
            viscosity,
            default_temperature,
            composition_tolerance,
        } = config;
        if !default_temperature.is_finite() || default_temperature <= 0.0 {
            return Err(EosError::Config {
                what: "default temperature must be finite and positive",
            });
        }
        if !composition_tolerance.is_finite() || composition_tolerance < 0.0 {
            return Err(EosError::Config {
                what: "composition tolerance must be finite and non-negative",
            });
        }

        let cache = match method {
            MethodConfig::Ideal => PvtCache::ideal(components, units, default_temperature)?,
            MethodConfig::Tabulated { table, roots } => {
                PvtCache::tabulated(components, units, table, roots)?
            }
            MethodConfig::Cubic { method, tuning } => {
                PvtCache::cubic(method, components, units, tuning, default_temperature)?
            }
        };

        let viscosity = viscosity.map(|config| match config {
            ViscosityConfig::LohrenzBrayClark { coefficients } => {
                ViscosityModel::LohrenzBrayClark(LbcModel { coefficients })
            }
            ViscosityConfig::JossiGss {
                mw_cutoff,
                vtune,
                blend_exponent,
                coefficients,
            } => ViscosityModel::JossiGss(JossiGssModel {
                mw_cutoff,
                vtune,
                blend_exponent,
                lbc: LbcModel { coefficients },
            }),
            ViscosityConfig::CorrespondingStates { method, tuning } => {
                let mut model = CsModel::new(method);
                model.vterm1 = tuning[0];
                model.vterm2 = tuning[1];
                model.vterm3 = tuning[2];
                model.vterm4 = tuning[3];
                ViscosityModel::CorrespondingStates(model)
            }
        });

        debug!(
            method = ?cache.method(),
            components = cache.n_components(),
            viscosity = viscosity.is_some(),
            "built pvt engine"
        );
        Ok(Self {
            cache,
            phase_id,
            viscosity,
            composition_tolerance,
        })
    }

    pub fn cache(&self) -> &PvtCache {
        &self.cache
    }

    /// Engine copy pinned at temperature `t` for repeated isothermal work.
    pub fn at_temperature(&self, t: f64) -> Self {
        Self {
            cache: self.cache.at_temperature(t),
            ..self.clone()
        }
    }

    /// Populate the viscosity model's lazy tables; required before the
    /// engine is shared across threads for read-only evaluation.
    pub fn force_viscosity_tables(&self) {
        if let Some(model) = &self.viscosity {
            model.force_tables(self.cache.components(), self.cache.units());
        }
    }

    /// Evaluate one batch.
    pub fn evaluate(
        &self,
        inputs: BatchInputs<'_>,
        request: EvaluationRequest,
        scratch: &mut Scratch,
    ) -> EosResult<EngineOutput> {
        let n = self.cache.n_components();
        let m = inputs.pressure.len();
        scratch.prepare(m, n);
        let Scratch {
            segments,
            mole_fractions,
        } = scratch;

        if request.mass_fraction_composition {
            convert_mass_to_mole(
                self.cache.components().molecular_weights(),
                inputs.composition,
                mole_fractions,
                n,
            )?;
        } else {
            if inputs.composition.len() != m * n {
                return Err(EosError::LengthMismatch {
                    what: "composition",
                    expected: m * n,
                    got: inputs.composition.len(),
                });
            }
            mole_fractions.copy_from_slice(inputs.composition);
        }

        let batch = BatchState::new(inputs.pressure, inputs.temperature, mole_fractions, n)?;
        let status = validate_batch(&batch, self.composition_tolerance);

        let shared = self.cache.resolve_segments(inputs.temperature, segments);
        let assembly_request = AssemblyRequest {
            tier: request.tier,
            heat: request.enthalpy,
            fugacity: request.potential.is_some(),
        };
        let terms = assemble(&self.cache, &batch, segments, shared, assembly_request);

        let phase_cfg = request.phase_id.then_some(&self.phase_id);
        let mut cubic = solve_batch(self.cache.shape(), &terms, &batch, request.tier, phase_cfg);
        let phase = cubic.phase.take();

        let volume = volume(&self.cache, &cubic, &batch, segments, request.tier);
        let molar_density = density(&self.cache, &volume, &batch, request.tier, true);
        let mass_density = density(&self.cache, &volume, &batch, request.tier, false);

        let potential = request.potential.map(|kind| match kind {
            PotentialKind::Fugacity => {
                fugacity_coefficients(&self.cache, &terms, &cubic, &batch, segments, request.tier)
            }
            PotentialKind::ChemicalPotential => {
                chemical_potential(&self.cache, &terms, &cubic, &batch, segments, request.tier)
            }
        });

        let enthalpy = request
            .enthalpy
            .then(|| enthalpy(&self.cache, &terms, &cubic, &batch, segments, request.tier));

        let viscosity = match (&self.viscosity, request.viscosity) {
            (Some(model), true) => {
                let density_input = DensityInput {
                    rho: &molar_density.rho,
                    drho_dp: molar_density.drho_dp.as_deref(),
                    drho_dt: molar_density.drho_dt.as_deref(),
                    drho_dx: molar_density.drho_dx.as_deref(),
                };
                Some(model.evaluate(
                    self.cache.components(),
                    self.cache.units(),
                    &batch,
                    Some(&density_input),
                    ViscosityRequest {
                        tier: request.tier,
                        mass_fractions: request.mass_fraction_composition,
                    },
                ))
            }
            _ => None,
        };

        Ok(EngineOutput {
            status,
            terms,
            cubic,
            phase,
            volume,
            molar_density,
            mass_density,
            potential,
            enthalpy,
            viscosity,
        })
    }

    /// Ideal Wilson K-value initial guesses for the external flasher.
    pub fn wilson_k_values(
        &self,
        inputs: BatchInputs<'_>,
        stretch: bool,
    ) -> EosResult<Vec<f64>> {
        let batch = BatchState::new(
            inputs.pressure,
            inputs.temperature,
            inputs.composition,
            self.cache.n_components(),
        )?;
        Ok(aux::wilson_k_values(&self.cache, &batch, stretch))
    }

    /// Thermal-diffusion term for compositional grading; needs a
    /// composition-tier evaluation with enthalpy.
    pub fn thermal_diffusion(&self, dlnt: f64, output: &EngineOutput) -> EosResult<Vec<f64>> {
        let enthalpy = output.enthalpy.as_ref().ok_or(EosError::Config {
            what: "thermal diffusion needs an enthalpy evaluation",
        })?;
        if output.volume.dv_dx.is_none() || enthalpy.dh_dx.is_none() {
            return Err(EosError::Config {
                what: "thermal diffusion needs composition-tier derivatives",
            });
        }
        Ok(aux::thermal_diffusion(
            dlnt,
            &output.volume,
            enthalpy,
            self.cache.n_components(),
        ))
    }

    /// Convert a molar enthalpy result to per-mass in place.
    pub fn enthalpy_per_mass(
        &self,
        inputs: BatchInputs<'_>,
        result: &mut EnthalpyResult,
    ) -> EosResult<()> {
        let batch = BatchState::new(
            inputs.pressure,
            inputs.temperature,
            inputs.composition,
            self.cache.n_components(),
        )?;
        aux::mass_enthalpy(&self.cache, &batch, result);
        Ok(())
    }

    /// Interfacial tension between two evaluated phases sharing (P, T).
    pub fn interfacial_tension(
        &self,
        x_inputs: BatchInputs<'_>,
        x_output: &EngineOutput,
        y_inputs: BatchInputs<'_>,
        y_output: &EngineOutput,
        tier: DerivativeTier,
    ) -> EosResult<IftResult> {
        let n = self.cache.n_components();
        let x_batch = BatchState::new(
            x_inputs.pressure,
            x_inputs.temperature,
            x_inputs.composition,
            n,
        )?;
        let y_batch = BatchState::new(
            y_inputs.pressure,
            y_inputs.temperature,
            y_inputs.composition,
            n,
        )?;
        let x_term = phase_tension_term(&self.cache, &x_batch, &x_output.molar_density, tier);
        let y_term = phase_tension_term(&self.cache, &y_batch, &y_output.molar_density, tier);
        Ok(interfacial_tension(&self.cache, &x_term, &y_term, tier))
    }
}

/// Mass fractions -> mole fractions, row by row.
fn convert_mass_to_mole(
    mw: &[f64],
    mass: &[f64],
    mole: &mut [f64],
    n: usize,
) -> EosResult<()> {
    if mass.len() != mole.len() {
        return Err(EosError::LengthMismatch {
            what: "composition",
            expected: mole.len(),
            got: mass.len(),
        });
    }
    for (w_row, x_row) in mass.chunks_exact(n).zip(mole.chunks_exact_mut(n)) {
        let mut s = 0.0;
        for i in 0..n {
            x_row[i] = w_row[i] / mw[i];
            s += x_row[i];
        }
        for x in x_row.iter_mut() {
            *x /= s;
        }
    }
    Ok(())
}
