//! Molar volume and density from the solved Z factor.
//!
//! `V = Z R T / P`, minus the mixture translation term when active. Density
//! is the reciprocal (molar) or molecular-weight-scaled (mass) volume, with
//! derivatives propagated as `d rho = -rho dV / V`.

use pvt_core::{BatchState, DerivativeTier};

use crate::cache::PvtCache;
use crate::cubic::CubicSolution;

/// Molar volume with requested derivatives.
#[derive(Debug, Clone)]
pub struct VolumeResult {
    pub v: Vec<f64>,
    pub dv_dp: Option<Vec<f64>>,
    pub dv_dt: Option<Vec<f64>>,
    /// M x N composition derivatives.
    pub dv_dx: Option<Vec<f64>>,
}

/// Mass or molar density with requested derivatives.
#[derive(Debug, Clone)]
pub struct DensityResult {
    pub rho: Vec<f64>,
    pub drho_dp: Option<Vec<f64>>,
    pub drho_dt: Option<Vec<f64>>,
    /// M x N composition derivatives.
    pub drho_dx: Option<Vec<f64>>,
}

/// Batched molar volume.
pub fn volume(
    cache: &PvtCache,
    solution: &CubicSolution,
    batch: &BatchState<'_>,
    segments: &[usize],
    tier: DerivativeTier,
) -> VolumeResult {
    let m = batch.len();
    let n = batch.n_components();
    let r = cache.gas_constant();
    let translate = cache.translates_volume();
    let mut out = VolumeResult {
        v: vec![0.0; m],
        dv_dp: tier.pressure().then(|| vec![0.0; m]),
        dv_dt: tier.temperature().then(|| vec![0.0; m]),
        dv_dx: tier.composition().then(|| vec![0.0; m * n]),
    };

    for obj in 0..m {
        let p = batch.pressure[obj];
        let t = batch.temperature[obj];
        let x = batch.composition_of(obj);
        let z = solution.z[obj];
        let rt_over_p = r * t / p;

        let mut v = z * rt_over_p;
        let seg = segments.get(obj).copied().unwrap_or(0);
        if translate {
            for i in 0..n {
                let (c_i, _) = cache.translation_c(seg, i, t);
                v -= x[i] * c_i;
            }
        }
        out.v[obj] = v;

        if let Some(buf) = out.dv_dp.as_mut() {
            let z_p = solution.dz_dp.as_ref().expect("pressure tier solved")[obj];
            buf[obj] = rt_over_p * (z_p - z / p);
        }
        if let Some(buf) = out.dv_dt.as_mut() {
            let z_t = solution.dz_dt.as_ref().expect("temperature tier solved")[obj];
            let mut d = (r / p) * (z + t * z_t);
            if translate {
                for i in 0..n {
                    let (_, dc_i) = cache.translation_c(seg, i, t);
                    d -= x[i] * dc_i;
                }
            }
            buf[obj] = d;
        }
        if let Some(buf) = out.dv_dx.as_mut() {
            let z_x = solution.dz_dx.as_ref().expect("composition tier solved");
            for j in 0..n {
                let mut d = rt_over_p * z_x[obj * n + j];
                if translate {
                    let (c_j, _) = cache.translation_c(seg, j, t);
                    d -= c_j;
                }
                buf[obj * n + j] = d;
            }
        }
    }
    out
}

/// Convert a volume result to density; `molar` selects 1/V versus MW/V.
pub fn density(
    cache: &PvtCache,
    volume: &VolumeResult,
    batch: &BatchState<'_>,
    tier: DerivativeTier,
    molar: bool,
) -> DensityResult {
    let m = batch.len();
    let n = batch.n_components();
    let mw = cache.components().molecular_weights();
    let mut out = DensityResult {
        rho: vec![0.0; m],
        drho_dp: tier.pressure().then(|| vec![0.0; m]),
        drho_dt: tier.temperature().then(|| vec![0.0; m]),
        drho_dx: tier.composition().then(|| vec![0.0; m * n]),
    };

    for obj in 0..m {
        let x = batch.composition_of(obj);
        let v = volume.v[obj];
        let numerator = if molar {
            1.0
        } else {
            x.iter().zip(mw).map(|(xi, mi)| xi * mi).sum()
        };
        let rho = numerator / v;
        out.rho[obj] = rho;

        if let Some(buf) = out.drho_dp.as_mut() {
            buf[obj] = -rho * volume.dv_dp.as_ref().expect("volume dP")[obj] / v;
        }
        if let Some(buf) = out.drho_dt.as_mut() {
            buf[obj] = -rho * volume.dv_dt.as_ref().expect("volume dT")[obj] / v;
        }
        if let Some(buf) = out.drho_dx.as_mut() {
            let dv_dx = volume.dv_dx.as_ref().expect("volume dx");
            for j in 0..n {
                let mut d = -rho * dv_dx[obj * n + j] / v;
                if !molar {
                    d += mw[j] / v;
                }
                buf[obj * n + j] = d;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{AssemblyRequest, assemble};
    use crate::cache::{CubicTuning, PvtCache};
    use crate::cubic::solve_batch;
    use crate::method::EosMethod;
    use pvt_core::{Component, ComponentSet, UnitSet};

    fn pipeline(cache: &PvtCache, p: f64, t: f64, x: &[f64]) -> (CubicSolution, Vec<usize>) {
        let ps = [p];
        let ts = [t];
        let batch = BatchState::new(&ps, &ts, x, x.len()).unwrap();
        let mut segs = vec![0usize; 1];
        let shared = cache.resolve_segments(&ts, &mut segs);
        let req = AssemblyRequest {
            tier: DerivativeTier::Temperature,
            heat: false,
            fugacity: false,
        };
        let terms = assemble(cache, &batch, &segs, shared, req);
        let sol = solve_batch(
            cache.shape(),
            &terms,
            &batch,
            DerivativeTier::Temperature,
            None,
        );
        (sol, segs)
    }

    fn methane_cache(shift: Option<f64>) -> PvtCache {
        let set = ComponentSet::new(vec![
            Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986).with_acentric(0.0115),
        ])
        .unwrap();
        PvtCache::cubic(
            EosMethod::PengRobinson,
            set,
            UnitSet::si(),
            CubicTuning {
                volume_shift: shift.map(|s| vec![s]),
                ..CubicTuning::default()
            },
            300.0,
        )
        .unwrap()
    }

    #[test]
    fn z_volume_round_trip() {
        let cache = methane_cache(None);
        let (p, t, x) = (5.0e6, 300.0, [1.0]);
        let ps = [p];
        let ts = [t];
        let batch = BatchState::new(&ps, &ts, &x, 1).unwrap();
        let (sol, segs) = pipeline(&cache, p, t, &x);
        let vol = volume(&cache, &sol, &batch, &segs, DerivativeTier::Temperature);
        // Z = P V / (R T) recovers the solved root to float precision.
        let z_back = p * vol.v[0] / (cache.gas_constant() * t);
        assert!((z_back - sol.z[0]).abs() < 1e-14);
    }

    #[test]
    fn translated_round_trip_recovers_z() {
        let shift = 3.0e-3;
        let cache = methane_cache(Some(shift));
        let (p, t, x) = (5.0e6, 300.0, [1.0]);
        let ps = [p];
        let ts = [t];
        let batch = BatchState::new(&ps, &ts, &x, 1).unwrap();
        let (sol, segs) = pipeline(&cache, p, t, &x);
        let vol = volume(&cache, &sol, &batch, &segs, DerivativeTier::Temperature);
        let z_back = p * (vol.v[0] + shift) / (cache.gas_constant() * t);
        assert!((z_back - sol.z[0]).abs() < 1e-14);
    }

    #[test]
    fn volume_derivatives_match_finite_differences() {
        let cache = methane_cache(None);
        let (p, t, x) = (5.0e6, 300.0, [1.0]);
        let eval_v = |p: f64, t: f64| {
            let ps = [p];
            let ts = [t];
            let batch = BatchState::new(&ps, &ts, &x, 1).unwrap();
            let (sol, segs) = pipeline(&cache, p, t, &x);
            volume(&cache, &sol, &batch, &segs, DerivativeTier::Temperature)
        };
        let base = eval_v(p, t);

        let dp = p * 1e-6;
        let fd_p = (eval_v(p + dp, t).v[0] - eval_v(p - dp, t).v[0]) / (2.0 * dp);
        let an_p = base.dv_dp.as_ref().unwrap()[0];
        assert!((fd_p - an_p).abs() < 1e-4 * an_p.abs());

        let dt = 1e-3;
        let fd_t = (eval_v(p, t + dt).v[0] - eval_v(p, t - dt).v[0]) / (2.0 * dt);
        let an_t = base.dv_dt.as_ref().unwrap()[0];
        assert!((fd_t - an_t).abs() < 1e-4 * an_t.abs());
    }

    #[test]
    fn mass_density_uses_molecular_weight() {
        let cache = methane_cache(None);
        let (p, t, x) = (5.0e6, 300.0, [1.0]);
        let ps = [p];
        let ts = [t];
        let batch = BatchState::new(&ps, &ts, &x, 1).unwrap();
        let (sol, segs) = pipeline(&cache, p, t, &x);
        let vol = volume(&cache, &sol, &batch, &segs, DerivativeTier::None);
        let molar = density(&cache, &vol, &batch, DerivativeTier::None, true);
        let mass = density(&cache, &vol, &batch, DerivativeTier::None, false);
        assert!((mass.rho[0] / molar.rho[0] - 16.043).abs() < 1e-10);
        // Methane at 50 bar, 300 K is a moderately dense gas.
        assert!(mass.rho[0] > 30.0 && mass.rho[0] < 50.0);
    }

    #[test]
    fn density_derivative_is_minus_rho_dv_over_v() {
        let cache = methane_cache(None);
        let (p, t, x) = (5.0e6, 300.0, [1.0]);
        let ps = [p];
        let ts = [t];
        let batch = BatchState::new(&ps, &ts, &x, 1).unwrap();
        let (sol, segs) = pipeline(&cache, p, t, &x);
        let vol = volume(&cache, &sol, &batch, &segs, DerivativeTier::Pressure);
        let rho = density(&cache, &vol, &batch, DerivativeTier::Pressure, false);
        let expected = -rho.rho[0] * vol.dv_dp.as_ref().unwrap()[0] / vol.v[0];
        assert!((rho.drho_dp.as_ref().unwrap()[0] - expected).abs() < 1e-18);
    }
}
