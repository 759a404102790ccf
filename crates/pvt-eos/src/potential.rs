//! Fugacity coefficients and chemical potentials.
//!
//! Values follow the standard two-root cubic form
//!
//! ```text
//! ln phi_i = (Bi/B)(Z - 1) - ln(Z - B)
//!            - (A/B) kb7 (2 Ai/A - Bi/B) ln((Z + kb0 B)/(Z + kb1 B))
//! ```
//!
//! Pressure and temperature derivatives chain through the assembled ratio
//! terms. The composition Hessian is the mole-number second derivative of
//! the residual Gibbs energy, so it is symmetric by construction; only the
//! upper triangle is computed and the lower is mirrored. When volume
//! translation is active the Peneloux shift `-c_i P / RT` rides on every
//! log-fugacity.

use pvt_core::{BatchState, DerivativeTier};

use crate::assembly::AbTerms;
use crate::cache::PvtCache;
use crate::cubic::CubicSolution;

/// Log-fugacity coefficients (or chemical potentials) with requested
/// derivatives for one batch.
#[derive(Debug, Clone)]
pub struct PotentialResult {
    /// M x N values.
    pub value: Vec<f64>,
    /// M x N pressure derivatives.
    pub d_dp: Option<Vec<f64>>,
    /// M x N temperature derivatives.
    pub d_dt: Option<Vec<f64>>,
    /// M x N x N symmetric composition Hessian.
    pub hessian: Option<Vec<f64>>,
}

/// Log fugacity coefficients `ln phi_i` for every object.
pub fn fugacity_coefficients(
    cache: &PvtCache,
    terms: &AbTerms,
    solution: &CubicSolution,
    batch: &BatchState<'_>,
    segments: &[usize],
    tier: DerivativeTier,
) -> PotentialResult {
    let m = terms.m;
    let n = terms.n;
    let shape = cache.shape();
    let mut out = PotentialResult {
        value: vec![0.0; m * n],
        d_dp: tier.pressure().then(|| vec![0.0; m * n]),
        d_dt: tier.temperature().then(|| vec![0.0; m * n]),
        hessian: tier.composition().then(|| vec![0.0; m * n * n]),
    };

    for obj in 0..m {
        let a = terms.a[obj];
        let b = terms.b[obj];
        let ab = terms.a_over_b[obj];
        let z = solution.z[obj];
        let p = batch.pressure[obj];
        let t = batch.temperature[obj];

        let d0 = z + shape.kb0 * b;
        let d1 = z + shape.kb1 * b;
        let big_l = (d0 / d1).ln();
        let l_z = -shape.kb8 * b / (d0 * d1);
        let l_b = shape.kb8 * z / (d0 * d1);
        let zb = z - b;

        let ai = &terms.ai_over_a[obj * n..(obj + 1) * n];
        let bi = &terms.bi_over_b[obj * n..(obj + 1) * n];

        for i in 0..n {
            let boi = bi[i];
            let alpha_i = 2.0 * ai[i];
            let rho_i = alpha_i - boi;
            out.value[obj * n + i] = boi * (z - 1.0) - zb.ln() - shape.kb7 * ab * rho_i * big_l;
        }

        if let Some(buf) = out.d_dp.as_mut() {
            let z_p = solution.dz_dp.as_ref().expect("pressure tier solved")[obj];
            let b_p = b / p;
            let l_p = l_z * z_p + l_b * b_p;
            for i in 0..n {
                let boi = bi[i];
                let rho_i = 2.0 * ai[i] - boi;
                buf[obj * n + i] =
                    boi * z_p - (z_p - b_p) / zb - shape.kb7 * ab * rho_i * l_p;
            }
        }

        if let Some(buf) = out.d_dt.as_mut() {
            let z_t = solution.dz_dt.as_ref().expect("temperature tier solved")[obj];
            let tau_a = terms.da_dt_over_a.as_ref().expect("assembly T terms")[obj];
            let tau_b = terms.db_dt_over_b.as_ref().expect("assembly T terms")[obj];
            let tau_ai = &terms.dai_dt_over_ai.as_ref().expect("assembly T terms")
                [obj * n..(obj + 1) * n];
            let tau_bi = &terms.dbi_dt_over_bi.as_ref().expect("assembly T terms")
                [obj * n..(obj + 1) * n];
            let b_t = b * tau_b;
            let ab_t = ab * (tau_a - tau_b);
            let l_t = l_z * z_t + l_b * b_t;
            for i in 0..n {
                let boi = bi[i];
                let alpha_i = 2.0 * ai[i];
                let rho_i = alpha_i - boi;
                let boi_t = boi * (tau_bi[i] - tau_b);
                let rho_i_t = alpha_i * (tau_ai[i] - tau_a) - boi_t;
                buf[obj * n + i] = boi_t * (z - 1.0) + boi * z_t - (z_t - b_t) / zb
                    - shape.kb7 * ((ab_t * rho_i + ab * rho_i_t) * big_l + ab * rho_i * l_t);
            }
        }

        if let Some(buf) = out.hessian.as_mut() {
            let aij = terms
                .aij_over_a
                .as_ref()
                .expect("assembly pair ratios for the Hessian");
            let aij = &aij[obj * n * n..(obj + 1) * n * n];
            let dz_da = solution.dz_da[obj];
            let dz_db = solution.dz_db[obj];
            let row = &mut buf[obj * n * n..(obj + 1) * n * n];
            for j in 0..n {
                // Mole-number derivatives of the intensive A, B.
                let alpha_j = 2.0 * ai[j];
                let boj = bi[j];
                let a_j = a * (alpha_j - 2.0);
                let b_j = b * (boj - 1.0);
                let z_j = dz_da * a_j + dz_db * b_j;
                let l_j = l_z * z_j + l_b * b_j;
                let rho_j = alpha_j - boj;
                for i in 0..=j {
                    let boi = bi[i];
                    let alpha_i = 2.0 * ai[i];
                    let rho_i = alpha_i - boi;
                    let drho = 2.0 * aij[i * n + j] + alpha_i - alpha_i * alpha_j
                        - boi
                        + boi * boj;
                    let h = boi * (1.0 - boj) * (z - 1.0) + boi * z_j
                        - (z_j - b_j) / zb
                        - shape.kb7
                            * (ab * ((rho_j - 1.0) * rho_i + drho) * big_l + ab * rho_i * l_j);
                    row[i * n + j] = h;
                    row[j * n + i] = h;
                }
            }
        }

        // Peneloux shift: f_i picks up exp(-c_i P / RT).
        if cache.translates_volume() {
            let rt = cache.gas_constant() * t;
            let seg = segments.get(obj).copied().unwrap_or(0);
            for i in 0..n {
                let (c_i, dc_i) = cache.translation_c(seg, i, t);
                out.value[obj * n + i] -= c_i * p / rt;
                if let Some(buf) = out.d_dp.as_mut() {
                    buf[obj * n + i] -= c_i / rt;
                }
                if let Some(buf) = out.d_dt.as_mut() {
                    buf[obj * n + i] += c_i * p / (rt * t) - dc_i * p / rt;
                }
            }
        }
    }
    out
}

/// Full chemical potentials `mu_i = RT (ln x_i P + ln phi_i) + h_i - T s_i`.
///
/// The ideal polynomial part is added only for components carrying heat
/// data. Derivative tiers mirror [`fugacity_coefficients`]; the composition
/// Hessian gains the ideal `RT delta_ij / x_i` term.
pub fn chemical_potential(
    cache: &PvtCache,
    terms: &AbTerms,
    solution: &CubicSolution,
    batch: &BatchState<'_>,
    segments: &[usize],
    tier: DerivativeTier,
) -> PotentialResult {
    let mut out = fugacity_coefficients(cache, terms, solution, batch, segments, tier);
    let m = terms.m;
    let n = terms.n;
    let r = cache.gas_constant();
    let components = cache.components();

    for obj in 0..m {
        let p = batch.pressure[obj];
        let t = batch.temperature[obj];
        let x = batch.composition_of(obj);
        let rt = r * t;

        // Hessian first: it reads the untouched ln phi derivatives.
        if let Some(buf) = out.hessian.as_mut() {
            // d ln x_i / dn_j at unit total moles is delta_ij / x_i - 1.
            let row = &mut buf[obj * n * n..(obj + 1) * n * n];
            for v in row.iter_mut() {
                *v = rt * (*v - 1.0);
            }
            for i in 0..n {
                row[i * n + i] += rt / x[i];
            }
        }
        if let Some(buf) = out.d_dp.as_mut() {
            for i in 0..n {
                let ln_phi_p = buf[obj * n + i];
                buf[obj * n + i] = rt * (1.0 / p + ln_phi_p);
            }
        }
        if let Some(buf) = out.d_dt.as_mut() {
            for i in 0..n {
                let ln_phi_t = buf[obj * n + i];
                let ln_f = out.value[obj * n + i] + (x[i] * p).ln();
                let mut d = r * ln_f + rt * ln_phi_t;
                if let Some(poly) = components.heat(i) {
                    let (_, dh) = poly.enthalpy(t);
                    let (s, ds) = poly.entropy(t);
                    d += dh - s - t * ds;
                }
                buf[obj * n + i] = d;
            }
        }
        for i in 0..n {
            let mut mu = rt * (out.value[obj * n + i] + (x[i] * p).ln());
            if let Some(poly) = components.heat(i) {
                let (h, _) = poly.enthalpy(t);
                let (s, _) = poly.entropy(t);
                mu += h - t * s;
            }
            out.value[obj * n + i] = mu;
        }
    }
    out
}
