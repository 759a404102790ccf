//! Interfacial tension from the Macleod–Sugden parachor rule.
//!
//! Each phase contributes `sum_i parachor_i x_i rho_molar` with the molar
//! density in mol/cm^3 (the classic parachor basis); the tension is the
//! fourth power of the phase difference, clamped at zero when the "light"
//! phase is actually denser.

use pvt_core::{BatchState, DerivativeTier};

use crate::cache::PvtCache;
use crate::volume::DensityResult;

/// Parachor basis: engine molar density (1/volume unit) -> mol/cm^3.
fn parachor_density_scale(cache: &PvtCache) -> f64 {
    // 1 / (m^3/kmol) = kmol/m^3 = 1e-3 mol/cm^3.
    1.0e-3 / cache.units().volume
}

/// dyne/cm -> engine tension units.
fn tension_scale(cache: &PvtCache) -> f64 {
    1.0e-3 / cache.units().tension
}

/// Per-phase parachor term with requested derivatives.
#[derive(Debug, Clone)]
pub struct TensionTerm {
    pub term: Vec<f64>,
    pub d_dp: Option<Vec<f64>>,
    pub d_dt: Option<Vec<f64>>,
    /// M x N composition derivatives.
    pub d_dx: Option<Vec<f64>>,
}

/// Interfacial tension between two phases, plus derivatives against each
/// phase's composition.
#[derive(Debug, Clone)]
pub struct IftResult {
    pub ift: Vec<f64>,
    pub dift_dp: Option<Vec<f64>>,
    pub dift_dt: Option<Vec<f64>>,
    pub dift_dx: Option<Vec<f64>>,
    pub dift_dy: Option<Vec<f64>>,
}

/// Parachor term of one phase given its molar density result.
pub fn phase_tension_term(
    cache: &PvtCache,
    batch: &BatchState<'_>,
    rho_molar: &DensityResult,
    tier: DerivativeTier,
) -> TensionTerm {
    let m = batch.len();
    let n = batch.n_components();
    let parachor = cache.components().parachors();
    let scale = parachor_density_scale(cache);
    let mut out = TensionTerm {
        term: vec![0.0; m],
        d_dp: tier.pressure().then(|| vec![0.0; m]),
        d_dt: tier.temperature().then(|| vec![0.0; m]),
        d_dx: tier.composition().then(|| vec![0.0; m * n]),
    };

    for obj in 0..m {
        let x = batch.composition_of(obj);
        let rho = rho_molar.rho[obj] * scale;
        let px: f64 = parachor.iter().zip(x).map(|(pi, xi)| pi * xi).sum();
        out.term[obj] = px * rho;

        if let Some(buf) = out.d_dp.as_mut() {
            buf[obj] = px * rho_molar.drho_dp.as_ref().expect("density dP")[obj] * scale;
        }
        if let Some(buf) = out.d_dt.as_mut() {
            buf[obj] = px * rho_molar.drho_dt.as_ref().expect("density dT")[obj] * scale;
        }
        if let Some(buf) = out.d_dx.as_mut() {
            let drho = rho_molar.drho_dx.as_ref().expect("density dx");
            for j in 0..n {
                buf[obj * n + j] = parachor[j] * rho + px * drho[obj * n + j] * scale;
            }
        }
    }
    out
}

/// Fourth-power tension law between phase x (denser) and phase y.
pub fn interfacial_tension(
    cache: &PvtCache,
    x_term: &TensionTerm,
    y_term: &TensionTerm,
    tier: DerivativeTier,
) -> IftResult {
    let m = x_term.term.len();
    let n_x = x_term.d_dx.as_ref().map_or(0, |d| d.len() / m.max(1));
    let scale = tension_scale(cache);
    let mut out = IftResult {
        ift: vec![0.0; m],
        dift_dp: tier.pressure().then(|| vec![0.0; m]),
        dift_dt: tier.temperature().then(|| vec![0.0; m]),
        dift_dx: tier.composition().then(|| vec![0.0; m * n_x]),
        dift_dy: tier.composition().then(|| vec![0.0; m * n_x]),
    };

    for obj in 0..m {
        let delta = x_term.term[obj] - y_term.term[obj];
        if delta <= 0.0 {
            // Phase ordering inverted: report zero tension, flat derivatives.
            continue;
        }
        let cubed = delta * delta * delta;
        out.ift[obj] = cubed * delta * scale;
        let slope = 4.0 * cubed * scale;

        if let Some(buf) = out.dift_dp.as_mut() {
            buf[obj] = slope
                * (x_term.d_dp.as_ref().expect("term dP")[obj]
                    - y_term.d_dp.as_ref().expect("term dP")[obj]);
        }
        if let Some(buf) = out.dift_dt.as_mut() {
            buf[obj] = slope
                * (x_term.d_dt.as_ref().expect("term dT")[obj]
                    - y_term.d_dt.as_ref().expect("term dT")[obj]);
        }
        if let (Some(dx), Some(dy)) = (out.dift_dx.as_mut(), out.dift_dy.as_mut()) {
            let tx = x_term.d_dx.as_ref().expect("term dx");
            let ty = y_term.d_dx.as_ref().expect("term dx");
            for j in 0..n_x {
                dx[obj * n_x + j] = slope * tx[obj * n_x + j];
                dy[obj * n_x + j] = -slope * ty[obj * n_x + j];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvt_core::{Component, ComponentSet, UnitSet};

    fn cache() -> PvtCache {
        let set = ComponentSet::new(vec![
            Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986)
                .with_acentric(0.0115)
                .with_parachor(77.0),
            Component::new("nC10", 142.28, 2.103e6, 617.7, 0.6)
                .with_acentric(0.4884)
                .with_parachor(433.5),
        ])
        .unwrap();
        PvtCache::ideal(set, UnitSet::si(), 300.0).unwrap()
    }

    fn plain_density(rho: f64) -> DensityResult {
        DensityResult {
            rho: vec![rho],
            drho_dp: None,
            drho_dt: None,
            drho_dx: None,
        }
    }

    #[test]
    fn phase_term_is_parachor_weighted_density() {
        let cache = cache();
        let p = [1.0e6];
        let t = [300.0];
        let x = [0.3, 0.7];
        let batch = BatchState::new(&p, &t, &x, 2).unwrap();
        // 5 kmol/m^3 -> 5e-3 mol/cm^3.
        let term = phase_tension_term(&cache, &batch, &plain_density(5.0), DerivativeTier::None);
        let px = 0.3 * 77.0 + 0.7 * 433.5;
        assert!((term.term[0] - px * 5.0e-3).abs() < 1e-12);
    }

    #[test]
    fn fourth_power_law_and_clamp() {
        let cache = cache();
        let x_term = TensionTerm {
            term: vec![3.0, 1.0],
            d_dp: None,
            d_dt: None,
            d_dx: None,
        };
        let y_term = TensionTerm {
            term: vec![1.0, 3.0],
            d_dp: None,
            d_dt: None,
            d_dx: None,
        };
        let ift = interfacial_tension(&cache, &x_term, &y_term, DerivativeTier::None);
        // (3-1)^4 = 16 dyne/cm -> 16e-3 N/m in SI engine units.
        assert!((ift.ift[0] - 16.0e-3).abs() < 1e-12);
        // Inverted ordering clamps to zero.
        assert_eq!(ift.ift[1], 0.0);
    }

    #[test]
    fn derivative_follows_chain_rule() {
        let cache = cache();
        let x_term = TensionTerm {
            term: vec![3.0],
            d_dp: Some(vec![0.5]),
            d_dt: None,
            d_dx: None,
        };
        let y_term = TensionTerm {
            term: vec![1.0],
            d_dp: Some(vec![0.1]),
            d_dt: None,
            d_dx: None,
        };
        let ift = interfacial_tension(&cache, &x_term, &y_term, DerivativeTier::Pressure);
        let expected = 4.0 * 8.0 * 1.0e-3 * (0.5 - 0.1);
        assert!((ift.dift_dp.as_ref().unwrap()[0] - expected).abs() < 1e-12);
    }
}
