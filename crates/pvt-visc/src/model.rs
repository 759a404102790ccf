//! The shared batched viscosity contract.
//!
//! All three correlations take the same inputs — pressure, temperature,
//! composition (mole or mass fractions), and where needed the EOS molar
//! density — and produce viscosity with the requested derivative tiers.

use pvt_core::{BatchState, ComponentSet, DerivativeTier, UnitSet};

use crate::corresponding::CsModel;
use crate::lbc::LbcModel;
use crate::split::JossiGssModel;

/// What a viscosity call should produce.
#[derive(Debug, Clone, Copy)]
pub struct ViscosityRequest {
    pub tier: DerivativeTier,
    /// Composition rows are mass fractions; derivatives are returned on the
    /// same basis.
    pub mass_fractions: bool,
}

/// Borrowed molar density (engine units) with optional derivatives, as the
/// EOS stage produced it.
#[derive(Debug, Clone, Copy)]
pub struct DensityInput<'a> {
    pub rho: &'a [f64],
    pub drho_dp: Option<&'a [f64]>,
    pub drho_dt: Option<&'a [f64]>,
    /// M x N, mole-fraction basis.
    pub drho_dx: Option<&'a [f64]>,
}

/// Batched viscosity with requested derivatives, engine units.
#[derive(Debug, Clone)]
pub struct ViscosityResult {
    pub mu: Vec<f64>,
    pub dmu_dp: Option<Vec<f64>>,
    pub dmu_dt: Option<Vec<f64>>,
    /// M x N, same composition basis as the request.
    pub dmu_dx: Option<Vec<f64>>,
}

impl ViscosityResult {
    pub(crate) fn allocate(m: usize, n: usize, tier: DerivativeTier) -> Self {
        Self {
            mu: vec![0.0; m],
            dmu_dp: tier.pressure().then(|| vec![0.0; m]),
            dmu_dt: tier.temperature().then(|| vec![0.0; m]),
            dmu_dx: tier.composition().then(|| vec![0.0; m * n]),
        }
    }
}

/// The three interchangeable correlations.
#[derive(Debug, Clone)]
pub enum ViscosityModel {
    LohrenzBrayClark(LbcModel),
    JossiGss(JossiGssModel),
    CorrespondingStates(CsModel),
}

impl ViscosityModel {
    /// Evaluate one batch. `density` is required by the Lohrenz and
    /// Jossi/GSS models; the corresponding-states model works from
    /// (P, T, x) alone.
    pub fn evaluate(
        &self,
        components: &ComponentSet,
        units: &UnitSet,
        batch: &BatchState<'_>,
        density: Option<&DensityInput<'_>>,
        req: ViscosityRequest,
    ) -> ViscosityResult {
        let mut result = match self {
            ViscosityModel::LohrenzBrayClark(model) => {
                let density = density.expect("Lohrenz-Bray-Clark needs the EOS density");
                model.evaluate(components, units, batch, density, req.tier)
            }
            ViscosityModel::JossiGss(model) => {
                let density = density.expect("Jossi/GSS needs the EOS density");
                model.evaluate(components, units, batch, density, req.tier)
            }
            ViscosityModel::CorrespondingStates(model) => {
                model.evaluate(components, units, batch, req.tier)
            }
        };
        if req.mass_fractions {
            rebase_to_mass_fractions(components, batch, &mut result);
        }
        result
    }

    /// Force any lazily-built tables so the model becomes safe for
    /// concurrent read-only use.
    pub fn force_tables(&self, components: &ComponentSet, units: &UnitSet) {
        if let ViscosityModel::CorrespondingStates(model) = self {
            model.force_tables(components, units);
        }
    }
}

/// Rebase composition derivatives from mole- to mass-fraction basis:
/// `df/dw_j = (MW_mix / MW_j)(df/dx_j - sum_i x_i df/dx_i)`.
///
/// Callers passing mass fractions are expected to have converted the batch
/// composition rows to mole fractions before the EOS stage; the derivative
/// output is what moves basis here.
fn rebase_to_mass_fractions(
    components: &ComponentSet,
    batch: &BatchState<'_>,
    result: &mut ViscosityResult,
) {
    let Some(d_dx) = result.dmu_dx.as_mut() else {
        return;
    };
    let mw = components.molecular_weights();
    let n = batch.n_components();
    for obj in 0..batch.len() {
        let x = batch.composition_of(obj);
        let mw_mix: f64 = mw.iter().zip(x).map(|(mi, xi)| mi * xi).sum();
        let row = &mut d_dx[obj * n..(obj + 1) * n];
        let weighted: f64 = x.iter().zip(row.iter()).map(|(xi, d)| xi * d).sum();
        for j in 0..n {
            row[j] = (mw_mix / mw[j]) * (row[j] - weighted);
        }
    }
}
