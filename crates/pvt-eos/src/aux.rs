//! Stateless auxiliary transforms: mass-basis conversion, Wilson K-values,
//! thermal diffusion.

use pvt_core::BatchState;

use crate::cache::PvtCache;
use crate::enthalpy::EnthalpyResult;
use crate::volume::VolumeResult;

/// Wilson K stretch threshold: K values whose logs all sit inside this band
/// are scaled out to it so the external flasher starts from a non-trivial
/// split.
const WILSON_STRETCH_BAND: f64 = 0.05;

/// ln(10) * 7/3, the Wilson correlation constant.
const WILSON_SLOPE: f64 = 5.372_697;

/// Mass fractions of one composition row.
pub fn mole_to_mass_fractions(mw: &[f64], x: &[f64], w: &mut [f64]) {
    let mw_mix: f64 = mw.iter().zip(x).map(|(m, xi)| m * xi).sum();
    for i in 0..x.len() {
        w[i] = x[i] * mw[i] / mw_mix;
    }
}

/// Convert a per-mole batched quantity (value + optional derivatives, still
/// on the mole-fraction basis) to per-mass by dividing through the mixture
/// molecular weight, chain-ruling the composition derivatives.
pub fn per_mole_to_per_mass(
    mw: &[f64],
    batch: &BatchState<'_>,
    value: &mut [f64],
    d_dp: Option<&mut [f64]>,
    d_dt: Option<&mut [f64]>,
    d_dx: Option<&mut [f64]>,
) {
    let m = batch.len();
    let n = batch.n_components();
    let mut d_dp = d_dp;
    let mut d_dt = d_dt;
    let mut d_dx = d_dx;
    for obj in 0..m {
        let x = batch.composition_of(obj);
        let mw_mix: f64 = mw.iter().zip(x).map(|(mi, xi)| mi * xi).sum();
        let inv = 1.0 / mw_mix;
        if let Some(buf) = d_dx.as_deref_mut() {
            for j in 0..n {
                let d = buf[obj * n + j];
                buf[obj * n + j] = (d - value[obj] * mw[j] * inv) * inv;
            }
        }
        value[obj] *= inv;
        if let Some(buf) = d_dp.as_deref_mut() {
            buf[obj] *= inv;
        }
        if let Some(buf) = d_dt.as_deref_mut() {
            buf[obj] *= inv;
        }
    }
}

/// Rebase composition derivatives from mole fractions to mass fractions:
/// `df/dw_j = (MW_mix / MW_j) (df/dx_j - sum_i x_i df/dx_i)`.
pub fn composition_derivatives_to_mass_basis(
    mw: &[f64],
    batch: &BatchState<'_>,
    d_dx: &mut [f64],
) {
    let m = batch.len();
    let n = batch.n_components();
    for obj in 0..m {
        let x = batch.composition_of(obj);
        let mw_mix: f64 = mw.iter().zip(x).map(|(mi, xi)| mi * xi).sum();
        let row = &mut d_dx[obj * n..(obj + 1) * n];
        let weighted: f64 = x.iter().zip(row.iter()).map(|(xi, d)| xi * d).sum();
        for j in 0..n {
            row[j] = (mw_mix / mw[j]) * (row[j] - weighted);
        }
    }
}

/// Convert a molar enthalpy result to a per-mass enthalpy in place.
pub fn mass_enthalpy(cache: &PvtCache, batch: &BatchState<'_>, result: &mut EnthalpyResult) {
    let mw = cache.components().molecular_weights();
    per_mole_to_per_mass(
        mw,
        batch,
        &mut result.h,
        result.dh_dp.as_deref_mut(),
        result.dh_dt.as_deref_mut(),
        result.dh_dx.as_deref_mut(),
    );
}

/// Ideal Wilson K-value initial guesses, M x N.
///
/// `K_i = (Pc_i / P) exp(5.372697 (1 + omega_i) (1 - Tc_i / T))`. With
/// `stretch`, near-unity K bands are pulled apart for the external flasher.
pub fn wilson_k_values(cache: &PvtCache, batch: &BatchState<'_>, stretch: bool) -> Vec<f64> {
    let m = batch.len();
    let n = batch.n_components();
    let components = cache.components();
    let pc = components.critical_pressures();
    let tc = components.critical_temperatures();
    let mut out = vec![0.0; m * n];
    for obj in 0..m {
        let p = batch.pressure[obj];
        let t = batch.temperature[obj];
        let row = &mut out[obj * n..(obj + 1) * n];
        let mut max_ln: f64 = 0.0;
        for i in 0..n {
            let omega = components.acentric_factor(i).unwrap_or(0.0);
            let ln_k = (pc[i] / p).ln() + WILSON_SLOPE * (1.0 + omega) * (1.0 - tc[i] / t);
            row[i] = ln_k;
            max_ln = max_ln.max(ln_k.abs());
        }
        let scale = if stretch && max_ln > 0.0 && max_ln < WILSON_STRETCH_BAND {
            WILSON_STRETCH_BAND / max_ln
        } else {
            1.0
        };
        for k in row.iter_mut() {
            *k = (*k * scale).exp();
        }
    }
    out
}

/// Thermal-diffusion term for compositional grading:
/// `dlnT (dH/dx_i - H dV/dx_i / V)`, M x N.
///
/// The volume and enthalpy results must carry composition derivatives.
pub fn thermal_diffusion(
    dlnt: f64,
    volume: &VolumeResult,
    enthalpy: &EnthalpyResult,
    n: usize,
) -> Vec<f64> {
    let m = volume.v.len();
    let dv_dx = volume.dv_dx.as_ref().expect("volume composition derivatives");
    let dh_dx = enthalpy
        .dh_dx
        .as_ref()
        .expect("enthalpy composition derivatives");
    let mut out = vec![0.0; m * n];
    for obj in 0..m {
        let v = volume.v[obj];
        let h = enthalpy.h[obj];
        for i in 0..n {
            out[obj * n + i] = dlnt * (dh_dx[obj * n + i] - h * dv_dx[obj * n + i] / v);
        }
    }
    out
}
