//! Molar enthalpy: departure term, ideal polynomial, translation correction.
//!
//! The departure enthalpy is the analytic pressure integral of
//! `(V - T dV/dT)`, which for the generalized cubic collapses to
//!
//! ```text
//! H_dep = RT [ (Z - 1) + kb7 (T dA/dT + A)/B * ln((Z + kb0 B)/(Z + kb1 B)) ]
//! ```
//!
//! Components carrying reference-state heat polynomials contribute the ideal
//! part; when volume translation is active the shift integrates to
//! `-P (c_mix - T dc_mix/dT)`.

use pvt_core::{BatchState, DerivativeTier};

use crate::assembly::AbTerms;
use crate::cache::PvtCache;
use crate::cubic::CubicSolution;

/// Molar enthalpy with requested derivatives for one batch.
#[derive(Debug, Clone)]
pub struct EnthalpyResult {
    pub h: Vec<f64>,
    pub dh_dp: Option<Vec<f64>>,
    pub dh_dt: Option<Vec<f64>>,
    /// M x N composition derivatives.
    pub dh_dx: Option<Vec<f64>>,
}

/// Batched molar enthalpy.
///
/// Requires the assembly to have run with `heat: true` (first and second
/// temperature-derivative ratios).
pub fn enthalpy(
    cache: &PvtCache,
    terms: &AbTerms,
    solution: &CubicSolution,
    batch: &BatchState<'_>,
    segments: &[usize],
    tier: DerivativeTier,
) -> EnthalpyResult {
    let m = terms.m;
    let n = terms.n;
    let shape = cache.shape();
    let r = cache.gas_constant();
    let components = cache.components();
    let mut out = EnthalpyResult {
        h: vec![0.0; m],
        dh_dp: tier.pressure().then(|| vec![0.0; m]),
        dh_dt: tier.temperature().then(|| vec![0.0; m]),
        dh_dx: tier.composition().then(|| vec![0.0; m * n]),
    };

    let tau_a_all = terms.da_dt_over_a.as_ref().expect("heat assembly terms");
    let tau_b_all = terms.db_dt_over_b.as_ref().expect("heat assembly terms");
    let sigma_a_all = terms.d2a_dt2_over_a.as_ref().expect("heat assembly terms");

    for obj in 0..m {
        let a = terms.a[obj];
        let b = terms.b[obj];
        let z = solution.z[obj];
        let p = batch.pressure[obj];
        let t = batch.temperature[obj];
        let x = batch.composition_of(obj);
        let rt = r * t;

        let tau_a = tau_a_all[obj];
        let tau_b = tau_b_all[obj];

        // Degenerate-but-valid case: ideal coefficients have no departure.
        let (dep, d_over_b, big_l, l_z, l_b) = if b == 0.0 {
            (0.0, 0.0, 0.0, 0.0, 0.0)
        } else {
            let d0 = z + shape.kb0 * b;
            let d1 = z + shape.kb1 * b;
            let big_l = (d0 / d1).ln();
            let l_z = -shape.kb8 * b / (d0 * d1);
            let l_b = shape.kb8 * z / (d0 * d1);
            let d_over_b = a * (1.0 + t * tau_a) / b;
            (
                rt * (z - 1.0 + shape.kb7 * d_over_b * big_l),
                d_over_b,
                big_l,
                l_z,
                l_b,
            )
        };

        let mut h = dep;
        for i in 0..n {
            if let Some(poly) = components.heat(i) {
                h += x[i] * poly.enthalpy(t).0;
            }
        }

        if let Some(buf) = out.dh_dp.as_mut() {
            let z_p = solution.dz_dp.as_ref().expect("pressure tier solved")[obj];
            // D/B is pressure-free; only Z and B move the log term.
            let l_p = l_z * z_p + l_b * b / p;
            buf[obj] = rt * (z_p + shape.kb7 * d_over_b * l_p);
        }

        if let Some(buf) = out.dh_dt.as_mut() {
            let z_t = solution.dz_dt.as_ref().expect("temperature tier solved")[obj];
            let sigma_a = sigma_a_all[obj];
            let mut d = r * (z - 1.0) + rt * z_t;
            if b != 0.0 {
                // D = A (1 + T tau_A); dD/dT = A (2 tau_A + T sigma_A).
                let ratio_dd = if 1.0 + t * tau_a != 0.0 {
                    (2.0 * tau_a + t * sigma_a) / (1.0 + t * tau_a)
                } else {
                    0.0
                };
                let dob_t = d_over_b * (ratio_dd - tau_b);
                let l_t = l_z * z_t + l_b * b * tau_b;
                d += r * shape.kb7 * d_over_b * big_l
                    + rt * shape.kb7 * (dob_t * big_l + d_over_b * l_t);
            }
            for i in 0..n {
                if let Some(poly) = components.heat(i) {
                    d += x[i] * poly.enthalpy(t).1;
                }
            }
            buf[obj] = d;
        }

        if let Some(buf) = out.dh_dx.as_mut() {
            let tau_ai = &terms.dai_dt_over_ai.as_ref().expect("heat assembly terms")
                [obj * n..(obj + 1) * n];
            for j in 0..n {
                let z_xj = solution.dz_dx.as_ref().expect("composition tier solved")
                    [obj * n + j];
                let mut d = rt * z_xj;
                if b != 0.0 {
                    let aoj = terms.ai_over_a[obj * n + j];
                    let boj = terms.bi_over_b[obj * n + j];
                    // dD/dx_j = 2 A aoj (1 + T tau_Aj)
                    let ratio_dxj = if 1.0 + t * tau_a != 0.0 {
                        2.0 * aoj * (1.0 + t * tau_ai[j]) / (1.0 + t * tau_a)
                    } else {
                        0.0
                    };
                    let dob_xj = d_over_b * (ratio_dxj - boj);
                    let l_xj = l_z * z_xj + l_b * b * boj;
                    d += rt * shape.kb7 * (dob_xj * big_l + d_over_b * l_xj);
                }
                if let Some(poly) = components.heat(j) {
                    d += poly.enthalpy(t).0;
                }
                buf[obj * n + j] = d;
            }
        }

        // Volume translation integrates to -P (c - T dc/dT); its own
        // temperature derivative vanishes for linear-in-T shifts.
        if cache.translates_volume() {
            let seg = segments.get(obj).copied().unwrap_or(0);
            let mut c_mix = 0.0;
            let mut dc_mix = 0.0;
            for i in 0..n {
                let (c_i, dc_i) = cache.translation_c(seg, i, t);
                c_mix += x[i] * c_i;
                dc_mix += x[i] * dc_i;
            }
            h -= p * (c_mix - t * dc_mix);
            if let Some(buf) = out.dh_dp.as_mut() {
                buf[obj] -= c_mix - t * dc_mix;
            }
            if let Some(buf) = out.dh_dx.as_mut() {
                for j in 0..n {
                    let (c_j, dc_j) = cache.translation_c(seg, j, t);
                    buf[obj * n + j] -= p * (c_j - t * dc_j);
                }
            }
        }
        out.h[obj] = h;
    }
    out
}
