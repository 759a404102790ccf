//! Lohrenz–Bray–Clark viscosity.
//!
//! Dilute-gas part from the Stiel–Thodos correlation with Herning–Zipperer
//! mixing; the dense correction is the classic quartic in reduced density
//! `rho_r = rho sum(x_i Vc_i)`, with the five polynomial coefficients
//! caller-tunable. Correlation math runs in (K, atm, cP); conversions in and
//! out are handled here.

use pvt_core::{BatchState, ComponentSet, DerivativeTier, UnitSet};

use crate::model::{DensityInput, ViscosityResult};

const ATM: f64 = 101_325.0;

/// Default dense-term polynomial coefficients.
pub const LBC_COEFFICIENTS: [f64; 5] = [0.1023, 0.023364, 0.058533, -0.040758, 0.0093324];

/// Lohrenz–Bray–Clark with tunable dense-term coefficients.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LbcModel {
    pub coefficients: [f64; 5],
}

impl Default for LbcModel {
    fn default() -> Self {
        Self {
            coefficients: LBC_COEFFICIENTS,
        }
    }
}

/// Stiel–Thodos dilute viscosity (cP) and its d/dT (cP/K) for one
/// component.
fn stiel_thodos(tr: f64, tc_k: f64, xi: f64) -> (f64, f64) {
    if tr <= 1.5 {
        let mu = 34.0e-5 * tr.powf(0.94) / xi;
        (mu, 0.94 * mu / (tr * tc_k))
    } else {
        let base = 4.58 * tr - 1.67;
        let mu = 17.78e-5 * base.powf(0.625) / xi;
        (mu, mu * 0.625 * 4.58 / (tc_k * base))
    }
}

impl LbcModel {
    pub fn evaluate(
        &self,
        components: &ComponentSet,
        units: &UnitSet,
        batch: &BatchState<'_>,
        density: &DensityInput<'_>,
        tier: DerivativeTier,
    ) -> ViscosityResult {
        let m = batch.len();
        let n = batch.n_components();
        let mut out = ViscosityResult::allocate(m, n, tier);

        let mw = components.molecular_weights();
        let vc = components.critical_volumes();
        let tc_k: Vec<f64> = components
            .critical_temperatures()
            .iter()
            .map(|tc| tc * units.temperature)
            .collect();
        let pc_atm: Vec<f64> = components
            .critical_pressures()
            .iter()
            .map(|pc| pc * units.pressure / ATM)
            .collect();
        let xi_i: Vec<f64> = (0..n)
            .map(|i| tc_k[i].powf(1.0 / 6.0) / (mw[i].sqrt() * pc_atm[i].powf(2.0 / 3.0)))
            .collect();
        // cP -> engine viscosity units
        let out_scale = 1.0e-3 / units.viscosity;

        let mut mu_i = vec![0.0; n];
        let mut dmu_i = vec![0.0; n];
        let a = &self.coefficients;

        for obj in 0..m {
            let t_k = batch.temperature[obj] * units.temperature;
            let x = batch.composition_of(obj);
            let rho = density.rho[obj];

            let mut s1 = 0.0;
            let mut ds1 = 0.0;
            let mut s2 = 0.0;
            let mut tcm = 0.0;
            let mut pcm = 0.0;
            let mut mwm = 0.0;
            let mut vcx = 0.0;
            for i in 0..n {
                let (mu, dmu) = stiel_thodos(t_k / tc_k[i], tc_k[i], xi_i[i]);
                mu_i[i] = mu;
                dmu_i[i] = dmu;
                let root = mw[i].sqrt();
                s1 += x[i] * mu * root;
                ds1 += x[i] * dmu * root;
                s2 += x[i] * root;
                tcm += x[i] * tc_k[i];
                pcm += x[i] * pc_atm[i];
                mwm += x[i] * mw[i];
                vcx += x[i] * vc[i];
            }
            let mu_star = s1 / s2;
            let xi_mix = tcm.powf(1.0 / 6.0) / (mwm.sqrt() * pcm.powf(2.0 / 3.0));

            let rho_r = rho * vcx;
            let f = a[0] + rho_r * (a[1] + rho_r * (a[2] + rho_r * (a[3] + rho_r * a[4])));
            let fp = a[1] + rho_r * (2.0 * a[2] + rho_r * (3.0 * a[3] + rho_r * 4.0 * a[4]));
            let f3 = f * f * f;
            let dense = (f3 * f - 1.0e-4) / xi_mix;

            out.mu[obj] = (mu_star + dense) * out_scale;

            if let Some(buf) = out.dmu_dp.as_mut() {
                let drho_dp = density.drho_dp.expect("density dP")[obj];
                buf[obj] = 4.0 * f3 * fp * drho_dp * vcx / xi_mix * out_scale;
            }
            if let Some(buf) = out.dmu_dt.as_mut() {
                let drho_dt = density.drho_dt.expect("density dT")[obj];
                let dilute = units.temperature * ds1 / s2;
                buf[obj] =
                    (dilute + 4.0 * f3 * fp * drho_dt * vcx / xi_mix) * out_scale;
            }
            if let Some(buf) = out.dmu_dx.as_mut() {
                let drho_dx = density.drho_dx.expect("density dx");
                for j in 0..n {
                    let dmu_star = mw[j].sqrt() * (mu_i[j] - mu_star) / s2;
                    let dxi = xi_mix
                        * (tc_k[j] / (6.0 * tcm)
                            - mw[j] / (2.0 * mwm)
                            - 2.0 * pc_atm[j] / (3.0 * pcm));
                    let drho_r = drho_dx[obj * n + j] * vcx + rho * vc[j];
                    let d = dmu_star + 4.0 * f3 * fp * drho_r / xi_mix
                        - (f3 * f - 1.0e-4) * dxi / (xi_mix * xi_mix);
                    buf[obj * n + j] = d * out_scale;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvt_core::{Component, ComponentSet};

    fn methane_set() -> ComponentSet {
        ComponentSet::new(vec![
            Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986).with_acentric(0.0115),
        ])
        .unwrap()
    }

    fn mix_set() -> ComponentSet {
        ComponentSet::new(vec![
            Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986),
            Component::new("nC4", 58.124, 3.796e6, 425.12, 0.255),
        ])
        .unwrap()
    }

    /// Ideal-gas molar density with self-consistent derivatives, so finite
    /// differences over the whole evaluation are meaningful.
    fn ideal_density(p: f64, t: f64, n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let r = 8_314.462_618;
        let rho = p / (r * t);
        (
            vec![rho],
            vec![rho / p],
            vec![-rho / t],
            vec![0.0; n],
        )
    }

    fn input<'a>(
        rho: &'a [f64],
        dp: &'a [f64],
        dt: &'a [f64],
        dx: &'a [f64],
    ) -> DensityInput<'a> {
        DensityInput {
            rho,
            drho_dp: Some(dp),
            drho_dt: Some(dt),
            drho_dx: Some(dx),
        }
    }

    #[test]
    fn dilute_methane_matches_stiel_thodos_magnitude() {
        let set = methane_set();
        let units = UnitSet::si();
        let model = LbcModel::default();
        let p = [1.0e5];
        let t = [300.0];
        let x = [1.0];
        let batch = BatchState::new(&p, &t, &x, 1).unwrap();
        let (rho, dp, dt, dx) = ideal_density(1.0e5, 300.0, 1);
        let result = model.evaluate(
            &set,
            &units,
            &batch,
            &input(&rho, &dp, &dt, &dx),
            DerivativeTier::None,
        );
        // Methane at ambient conditions is close to 11 micropascal-seconds.
        assert!(
            result.mu[0] > 1.0e-5 && result.mu[0] < 1.25e-5,
            "mu = {}",
            result.mu[0]
        );
    }

    #[test]
    fn dense_term_increases_viscosity() {
        let set = methane_set();
        let units = UnitSet::si();
        let model = LbcModel::default();
        let p = [1.0e5, 2.0e7];
        let t = [300.0, 300.0];
        let x = [1.0, 1.0];
        let batch = BatchState::new(&p, &t, &x, 1).unwrap();
        let r = 8_314.462_618;
        let rho = [1.0e5 / (r * 300.0), 2.0e7 / (r * 300.0)];
        let density = DensityInput {
            rho: &rho,
            drho_dp: None,
            drho_dt: None,
            drho_dx: None,
        };
        let result = model.evaluate(&set, &units, &batch, &density, DerivativeTier::None);
        assert!(result.mu[1] > result.mu[0]);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let set = mix_set();
        let units = UnitSet::si();
        let model = LbcModel::default();
        let x = [0.7, 0.3];
        let (p0, t0) = (5.0e6, 350.0);

        let eval = |p: f64, t: f64, x: &[f64]| -> ViscosityResult {
            let ps = [p];
            let ts = [t];
            let batch = BatchState::new(&ps, &ts, x, 2).unwrap();
            let (rho, dp, dt, dx) = ideal_density(p, t, 2);
            model.evaluate(
                &set,
                &units,
                &batch,
                &input(&rho, &dp, &dt, &dx),
                DerivativeTier::Temperature,
            )
        };
        let base = eval(p0, t0, &x);

        let dp = p0 * 1e-6;
        let fd = (eval(p0 + dp, t0, &x).mu[0] - eval(p0 - dp, t0, &x).mu[0]) / (2.0 * dp);
        let an = base.dmu_dp.as_ref().unwrap()[0];
        assert!((fd - an).abs() < 1e-4 * an.abs().max(1e-16), "dP: {fd} vs {an}");

        let dt = 1e-3;
        let fd = (eval(p0, t0 + dt, &x).mu[0] - eval(p0, t0 - dt, &x).mu[0]) / (2.0 * dt);
        let an = base.dmu_dt.as_ref().unwrap()[0];
        assert!((fd - an).abs() < 1e-4 * an.abs().max(1e-16), "dT: {fd} vs {an}");

        let h = 1e-7;
        for j in 0..2 {
            let mut plus = x;
            plus[j] += h;
            let mut minus = x;
            minus[j] -= h;
            let fd = (eval(p0, t0, &plus).mu[0] - eval(p0, t0, &minus).mu[0]) / (2.0 * h);
            let an = base.dmu_dx.as_ref().unwrap()[j];
            assert!(
                (fd - an).abs() < 1e-4 * an.abs().max(1e-12),
                "dx_{j}: {fd} vs {an}"
            );
        }
    }

    #[test]
    fn coefficient_overrides_change_the_dense_term_only() {
        let set = methane_set();
        let units = UnitSet::si();
        let p = [1.0e7];
        let t = [300.0];
        let x = [1.0];
        let batch = BatchState::new(&p, &t, &x, 1).unwrap();
        let rho = [1.0e7 / (8_314.462_618 * 300.0)];
        let density = DensityInput {
            rho: &rho,
            drho_dp: None,
            drho_dt: None,
            drho_dx: None,
        };
        let default = LbcModel::default().evaluate(
            &set,
            &units,
            &batch,
            &density,
            DerivativeTier::None,
        );
        let tuned = LbcModel {
            coefficients: [0.1023, 0.03, 0.058533, -0.040758, 0.0093324],
        }
        .evaluate(&set, &units, &batch, &density, DerivativeTier::None);
        assert!(tuned.mu[0] != default.mu[0]);
    }
}
