//! Jossi/GSS viscosity: light components through Lohrenz–Bray–Clark, heavy
//! components through a Shealy-type log-viscosity correlation, blended by a
//! power-law mobility ratio.
//!
//! Components are partitioned once per call by a molecular-weight cutoff.
//! The light sub-composition is renormalized and fed to the plain Lohrenz
//! model; with no heavy material present the blend weight vanishes and the
//! result is exactly the Lohrenz viscosity.

use pvt_core::numeric::TINY;
use pvt_core::{BatchState, ComponentSet, DerivativeTier, UnitSet};

use crate::lbc::LbcModel;
use crate::model::{DensityInput, ViscosityResult};

/// Shealy-type heavy correlation constants:
/// `ln mu[cP] = S0 + S1 MW + (S2 + S3 MW)/T[K] + S4 P[MPa]`.
const SHEALY: [f64; 5] = [-8.0, 0.01, 2.0e3, 5.0, 0.008];

/// Jossi/GSS configuration. The cutoff and blend exponent are empirical;
/// they are fields rather than constants because the source derivations are
/// not documented.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JossiGssModel {
    /// Light/heavy molecular-weight cutoff, kg/kmol.
    pub mw_cutoff: f64,
    /// Multiplier on the heavy correlation (the classic `vtune`).
    pub vtune: f64,
    /// Power applied to the heavy mole fraction in the mobility blend.
    pub blend_exponent: f64,
    /// Light-end Lohrenz model.
    pub lbc: LbcModel,
}

impl Default for JossiGssModel {
    fn default() -> Self {
        Self {
            mw_cutoff: 250.0,
            vtune: 1.0,
            blend_exponent: 1.0,
            lbc: LbcModel::default(),
        }
    }
}

impl JossiGssModel {
    pub fn evaluate(
        &self,
        components: &ComponentSet,
        units: &UnitSet,
        batch: &BatchState<'_>,
        density: &DensityInput<'_>,
        tier: DerivativeTier,
    ) -> ViscosityResult {
        let n = batch.n_components();
        let mw = components.molecular_weights();
        let heavy: Vec<bool> = mw.iter().map(|&w| w > self.mw_cutoff).collect();
        if !heavy.iter().any(|&h| h) {
            return self.lbc.evaluate(components, units, batch, density, tier);
        }

        let m = batch.len();
        let mut out = ViscosityResult::allocate(m, n, tier);
        let want_derivatives = tier > DerivativeTier::None;

        let mut x_light = vec![0.0; n];
        let zero_dx = vec![0.0; n];
        for obj in 0..m {
            let p = batch.pressure[obj];
            let t = batch.temperature[obj];
            let x = batch.composition_of(obj);

            let mut xh = 0.0;
            let mut mwh_num = 0.0;
            for i in 0..n {
                if heavy[i] {
                    xh += x[i];
                    mwh_num += x[i] * mw[i];
                }
            }
            let xl = (1.0 - xh).max(TINY);
            let mw_h = mwh_num / xh.max(TINY);
            for i in 0..n {
                x_light[i] = if heavy[i] { 0.0 } else { x[i] / xl };
            }

            // Light end at frozen density: a unit density sensitivity in the
            // probe exposes d mu / d rho through the pressure slot, so the
            // real P/T/x chains assemble below from the caller's density
            // derivatives.
            let ps = [p];
            let ts = [t];
            let light_batch =
                BatchState::new(&ps, &ts, &x_light, n).expect("single-object light batch");
            let rho = [density.rho[obj]];
            let unit_dp = [1.0];
            let zero_dt = [0.0];
            let probe = DensityInput {
                rho: &rho,
                drho_dp: Some(&unit_dp),
                drho_dt: Some(&zero_dt),
                drho_dx: Some(&zero_dx),
            };
            let light_tier = if want_derivatives {
                DerivativeTier::Temperature
            } else {
                DerivativeTier::None
            };
            let light =
                self.lbc
                    .evaluate(components, units, &light_batch, &probe, light_tier);
            let mu_l = light.mu[0];

            let (mu_h, dmuh_dp, dmuh_dt) = self.heavy_viscosity(units, p, t, mw_h);

            // Power-law mobility blend: ln mu = ln mu_L + w ln(mu_H / mu_L).
            let w = xh.powf(self.blend_exponent);
            let ln_ratio = (mu_h / mu_l).ln();
            let mu = mu_l * (mu_h / mu_l).powf(w);
            out.mu[obj] = mu;

            if !want_derivatives {
                continue;
            }
            let dmu_drho = light.dmu_dp.as_ref().expect("probe dP")[0];
            let dmul_dt_pure = light.dmu_dt.as_ref().expect("probe dT")[0];
            let dl = light.dmu_dx.as_ref().expect("probe dx");

            if let Some(buf) = out.dmu_dp.as_mut() {
                let dmul = dmu_drho * density.drho_dp.expect("density dP")[obj];
                buf[obj] = mu * ((1.0 - w) * dmul / mu_l + w * dmuh_dp / mu_h);
            }
            if let Some(buf) = out.dmu_dt.as_mut() {
                let dmul = dmul_dt_pure + dmu_drho * density.drho_dt.expect("density dT")[obj];
                buf[obj] = mu * ((1.0 - w) * dmul / mu_l + w * dmuh_dt / mu_h);
            }
            if let Some(buf) = out.dmu_dx.as_mut() {
                let drho_dx = density.drho_dx.expect("density dx");
                // sum_i (d mu_L / d x_light_i) x_light_i, for the heavy-j
                // renormalization chain.
                let contracted: f64 = (0..n).map(|i| dl[i] * x_light[i]).sum();
                for j in 0..n {
                    let comp_chain = if heavy[j] {
                        contracted / xl
                    } else {
                        dl[j] / xl
                    };
                    let dmul = comp_chain + dmu_drho * drho_dx[obj * n + j];
                    let mut dln = (1.0 - w) * dmul / mu_l;
                    if heavy[j] {
                        let dw = self.blend_exponent
                            * xh.max(TINY).powf(self.blend_exponent - 1.0);
                        let dmw = (mw[j] - mw_h) / xh.max(TINY);
                        let dmuh =
                            mu_h * (SHEALY[1] + SHEALY[3] / (t * units.temperature)) * dmw;
                        dln += w * dmuh / mu_h + dw * ln_ratio;
                    }
                    buf[obj * n + j] = mu * dln;
                }
            }
        }
        out
    }

    /// Heavy-end correlation in engine units plus P/T derivatives.
    fn heavy_viscosity(&self, units: &UnitSet, p: f64, t: f64, mw_h: f64) -> (f64, f64, f64) {
        let t_k = t * units.temperature;
        let p_mpa = p * units.pressure * 1.0e-6;
        let ln_mu = SHEALY[0]
            + SHEALY[1] * mw_h
            + (SHEALY[2] + SHEALY[3] * mw_h) / t_k
            + SHEALY[4] * p_mpa;
        // cP -> engine units, scaled by the tuning multiplier.
        let mu = self.vtune * ln_mu.exp() * 1.0e-3 / units.viscosity;
        let dmu_dp = mu * SHEALY[4] * units.pressure * 1.0e-6;
        let dmu_dt = mu * (-(SHEALY[2] + SHEALY[3] * mw_h) / (t_k * t_k)) * units.temperature;
        (mu, dmu_dp, dmu_dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvt_core::Component;

    fn light_heavy_set() -> ComponentSet {
        ComponentSet::new(vec![
            Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986),
            Component::new("nC4", 58.124, 3.796e6, 425.12, 0.255),
            Component::new("resin", 420.0, 1.2e6, 900.0, 1.6),
        ])
        .unwrap()
    }

    #[test]
    fn all_light_reduces_to_plain_lbc() {
        let set = light_heavy_set();
        let units = UnitSet::si();
        let model = JossiGssModel::default();
        let p = [5.0e6];
        let t = [350.0];
        // Zero heavy fraction.
        let x = [0.6, 0.4, 0.0];
        let batch = BatchState::new(&p, &t, &x, 3).unwrap();
        let rho = [1.7];
        let density = DensityInput {
            rho: &rho,
            drho_dp: None,
            drho_dt: None,
            drho_dx: None,
        };
        let split = model.evaluate(&set, &units, &batch, &density, DerivativeTier::None);
        let plain = model
            .lbc
            .evaluate(&set, &units, &batch, &density, DerivativeTier::None);
        assert_eq!(split.mu[0], plain.mu[0]);
    }

    #[test]
    fn heavy_fraction_raises_viscosity() {
        let set = light_heavy_set();
        let units = UnitSet::si();
        let model = JossiGssModel::default();
        let p = [5.0e6, 5.0e6];
        let t = [350.0, 350.0];
        let x = [0.6, 0.4, 0.0, 0.45, 0.3, 0.25];
        let batch = BatchState::new(&p, &t, &x, 3).unwrap();
        let rho = [1.7, 1.7];
        let density = DensityInput {
            rho: &rho,
            drho_dp: None,
            drho_dt: None,
            drho_dx: None,
        };
        let result = model.evaluate(&set, &units, &batch, &density, DerivativeTier::None);
        assert!(result.mu[1] > 5.0 * result.mu[0]);
    }

    #[test]
    fn vtune_scales_the_heavy_end() {
        let set = light_heavy_set();
        let units = UnitSet::si();
        let p = [5.0e6];
        let t = [350.0];
        let x = [0.45, 0.3, 0.25];
        let batch = BatchState::new(&p, &t, &x, 3).unwrap();
        let rho = [1.7];
        let density = DensityInput {
            rho: &rho,
            drho_dp: None,
            drho_dt: None,
            drho_dx: None,
        };
        let base = JossiGssModel::default().evaluate(
            &set,
            &units,
            &batch,
            &density,
            DerivativeTier::None,
        );
        let tuned = JossiGssModel {
            vtune: 2.0,
            ..JossiGssModel::default()
        }
        .evaluate(&set, &units, &batch, &density, DerivativeTier::None);
        assert!(tuned.mu[0] > base.mu[0]);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let set = light_heavy_set();
        let units = UnitSet::si();
        let model = JossiGssModel::default();
        let x0 = [0.45, 0.3, 0.25];
        let (p0, t0) = (5.0e6, 350.0);
        let r = 8_314.462_618;

        // Density is a function of (P, T) only, with zero composition
        // sensitivity, so free-composition finite differences are exact.
        let eval = |p: f64, t: f64, x: &[f64]| -> ViscosityResult {
            let ps = [p];
            let ts = [t];
            let batch = BatchState::new(&ps, &ts, x, 3).unwrap();
            let rho = [p / (r * t)];
            let dp = [rho[0] / p];
            let dt = [-rho[0] / t];
            let dx = [0.0, 0.0, 0.0];
            let density = DensityInput {
                rho: &rho,
                drho_dp: Some(&dp),
                drho_dt: Some(&dt),
                drho_dx: Some(&dx),
            };
            model.evaluate(&set, &units, &batch, &density, DerivativeTier::Temperature)
        };
        let base = eval(p0, t0, &x0);

        let dp = p0 * 1e-6;
        let fd = (eval(p0 + dp, t0, &x0).mu[0] - eval(p0 - dp, t0, &x0).mu[0]) / (2.0 * dp);
        let an = base.dmu_dp.as_ref().unwrap()[0];
        assert!(
            (fd - an).abs() < 1e-4 * an.abs().max(1e-18),
            "dP: {fd} vs {an}"
        );

        let dt = 1e-3;
        let fd = (eval(p0, t0 + dt, &x0).mu[0] - eval(p0, t0 - dt, &x0).mu[0]) / (2.0 * dt);
        let an = base.dmu_dt.as_ref().unwrap()[0];
        assert!(
            (fd - an).abs() < 1e-4 * an.abs().max(1e-18),
            "dT: {fd} vs {an}"
        );

        let h = 1e-7;
        for j in 0..3 {
            let mut plus = x0;
            plus[j] += h;
            let mut minus = x0;
            minus[j] -= h;
            let fd = (eval(p0, t0, &plus).mu[0] - eval(p0, t0, &minus).mu[0]) / (2.0 * h);
            let an = base.dmu_dx.as_ref().unwrap()[j];
            assert!(
                (fd - an).abs() < 1e-3 * an.abs().max(1e-12),
                "dx_{j}: {fd} vs {an}"
            );
        }
    }
}
