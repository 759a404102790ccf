//! Coefficient assembly: cached data + (P, T, x) -> normalized A/B terms.
//!
//! All four method strategies produce the same normalized outputs, so the
//! cubic solver and the property stages never see method-specific data. The
//! ratios (`Ai/A`, `dA/dT / A`, ...) are valid only within the call that
//! produced them.
//!
//! Temperature-derivative ratios fold the pressure/temperature prefactors in:
//! with `A = a_hat(T) P / (R T)^2` the cached tables only have to supply
//! `a_hat` and its plain temperature derivatives.

use pvt_core::{BatchState, DerivativeTier};

use crate::cache::{MethodData, PvtCache};
use crate::table::SegmentIndex;

/// What a batch call needs from the assembly stage.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyRequest {
    pub tier: DerivativeTier,
    /// Enthalpy requested: first and second temperature-derivative ratios.
    pub heat: bool,
    /// Fugacity requested: pair ratios for the composition Hessian.
    pub fugacity: bool,
}

impl AssemblyRequest {
    fn wants_t_derivatives(&self) -> bool {
        self.heat || self.tier.temperature()
    }

    fn wants_pair_ratios(&self) -> bool {
        self.fugacity && self.tier.composition()
    }
}

/// Normalized A/B terms for one batch of M objects over N components.
#[derive(Debug, Clone)]
pub struct AbTerms {
    pub m: usize,
    pub n: usize,
    /// A = a P / (R T)^2, per object.
    pub a: Vec<f64>,
    /// B = b P / (R T), per object.
    pub b: Vec<f64>,
    pub a_over_b: Vec<f64>,
    /// (sum_j x_j A_ij) / A, M x N.
    pub ai_over_a: Vec<f64>,
    /// B_i / B, M x N.
    pub bi_over_b: Vec<f64>,
    /// A_ij / A, M x N x N; present only when the fugacity Hessian needs it.
    pub aij_over_a: Option<Vec<f64>>,
    /// (dA/dT) / A, per object.
    pub da_dt_over_a: Option<Vec<f64>>,
    /// (dB/dT) / B, per object.
    pub db_dt_over_b: Option<Vec<f64>>,
    /// (dA_i/dT) / A_i, M x N.
    pub dai_dt_over_ai: Option<Vec<f64>>,
    /// (dB_i/dT) / B_i, M x N.
    pub dbi_dt_over_bi: Option<Vec<f64>>,
    /// (d2A/dT2) / A, per object; enthalpy only.
    pub d2a_dt2_over_a: Option<Vec<f64>>,
    /// (d2B/dT2) / B, per object; enthalpy only.
    pub d2b_dt2_over_b: Option<Vec<f64>>,
}

impl AbTerms {
    pub fn allocate(m: usize, n: usize, req: AssemblyRequest) -> Self {
        let t = req.wants_t_derivatives();
        Self {
            m,
            n,
            a: vec![0.0; m],
            b: vec![0.0; m],
            a_over_b: vec![0.0; m],
            ai_over_a: vec![0.0; m * n],
            bi_over_b: vec![0.0; m * n],
            aij_over_a: req.wants_pair_ratios().then(|| vec![0.0; m * n * n]),
            da_dt_over_a: t.then(|| vec![0.0; m]),
            db_dt_over_b: t.then(|| vec![0.0; m]),
            dai_dt_over_ai: t.then(|| vec![0.0; m * n]),
            dbi_dt_over_bi: t.then(|| vec![0.0; m * n]),
            d2a_dt2_over_a: req.heat.then(|| vec![0.0; m]),
            d2b_dt2_over_b: req.heat.then(|| vec![0.0; m]),
        }
    }
}

/// Assemble normalized terms for a whole batch.
///
/// `segments` must have been resolved by the cache for `batch`'s
/// temperatures; `shared_segment` enables the single-lookup fast path for
/// tabulated coefficients.
pub fn assemble(
    cache: &PvtCache,
    batch: &BatchState<'_>,
    segments: &[SegmentIndex],
    shared_segment: bool,
    req: AssemblyRequest,
) -> AbTerms {
    let mut out = AbTerms::allocate(batch.len(), batch.n_components(), req);
    assemble_into(cache, batch, segments, shared_segment, req, &mut out);
    out
}

/// Assemble a single object without batch bookkeeping.
pub fn assemble_one(
    cache: &PvtCache,
    pressure: f64,
    temperature: f64,
    composition: &[f64],
    req: AssemblyRequest,
) -> AbTerms {
    let p = [pressure];
    let t = [temperature];
    let batch = BatchState::new(&p, &t, composition, composition.len())
        .expect("single-object batch shapes are consistent");
    let mut segments = [0usize];
    let shared = cache.resolve_segments(&t, &mut segments);
    assemble(cache, &batch, &segments, shared, req)
}

pub fn assemble_into(
    cache: &PvtCache,
    batch: &BatchState<'_>,
    segments: &[SegmentIndex],
    shared_segment: bool,
    req: AssemblyRequest,
    out: &mut AbTerms,
) {
    let m = batch.len();
    let n = batch.n_components();
    debug_assert_eq!(out.m, m);
    debug_assert_eq!(out.n, n);

    if matches!(cache.data, MethodData::Ideal) {
        // Everything stays zero.
        return;
    }

    let r = cache.gas_constant();
    // Unnormalized per-component accumulators, reused across objects.
    let mut ai = vec![0.0; n];
    let mut dai = vec![0.0; n];
    let mut d2ai = vec![0.0; n];
    let mut bi = vec![0.0; n];
    let mut dbi = vec![0.0; n];

    // Hoisted segment for the all-objects-share-one-segment fast path.
    let seg0 = if shared_segment {
        segments.first().copied().unwrap_or(0)
    } else {
        0
    };

    for obj in 0..m {
        let p = batch.pressure[obj];
        let t = batch.temperature[obj];
        let x = batch.composition_of(obj);
        let seg = if shared_segment { seg0 } else { segments[obj] };

        ai.fill(0.0);
        dai.fill(0.0);
        d2ai.fill(0.0);
        let aij_row = out
            .aij_over_a
            .as_mut()
            .map(|buf| &mut buf[obj * n * n..(obj + 1) * n * n]);

        match &cache.data {
            MethodData::Ideal => unreachable!("handled above"),
            MethodData::Tabulated(table) => {
                let mut aij_row = aij_row;
                for i in 0..n {
                    for j in 0..n {
                        let (v, dv) = table.a_pair_at(seg, i, j, t);
                        ai[i] += x[j] * v;
                        dai[i] += x[j] * dv;
                        if let Some(row) = aij_row.as_deref_mut() {
                            row[i * n + j] = v;
                        }
                    }
                    let (bv, dbv) = table.b_at(seg, i, t);
                    bi[i] = bv;
                    dbi[i] = dbv;
                }
            }
            MethodData::RedlichKwong(rk) => {
                let mut aij_row = aij_row;
                let sqrt_t = t.sqrt();
                let inv_sqrt_t = 1.0 / sqrt_t;
                for i in 0..n {
                    for j in 0..n {
                        let idx = i * n + j;
                        let s = rk.sqrt_ac[i] * rk.sqrt_ac[j];
                        let k0 = rk.k0.as_ref().map_or(0.0, |k| k[idx]);
                        let k1 = rk.k1.as_ref().map_or(0.0, |k| k[idx]);
                        // a_hat = c / sqrt(T) + d sqrt(T)
                        let c = s * (1.0 - k0);
                        let d = -s * k1;
                        let v = (c / t + d) * sqrt_t;
                        let dv = (-0.5 * c / t + 0.5 * d) * inv_sqrt_t;
                        let d2v = (0.75 * c / t - 0.25 * d) * inv_sqrt_t / t;
                        ai[i] += x[j] * v;
                        dai[i] += x[j] * dv;
                        d2ai[i] += x[j] * d2v;
                        if let Some(row) = aij_row.as_deref_mut() {
                            row[idx] = v;
                        }
                    }
                    bi[i] = rk.b[i];
                    dbi[i] = 0.0;
                }
            }
            MethodData::Cubic(data) => {
                let mut aij_row = aij_row;
                let sqrt_t = t.sqrt();
                for i in 0..n {
                    for j in 0..n {
                        let idx = i * n + j;
                        let a0 = data.a0[idx];
                        let a_s = data.a_s[idx];
                        let a_t = data.a_t[idx];
                        let mut v = a0 + a_s * sqrt_t + a_t * t;
                        let mut dv = 0.5 * a_s / sqrt_t + a_t;
                        let mut d2v = -0.25 * a_s / (t * sqrt_t);
                        if let (Some(ar), Some(al)) = (data.a_r.as_ref(), data.a_l.as_ref()) {
                            let a_r = ar[idx];
                            let a_l = al[idx];
                            v += a_r * t * sqrt_t + a_l * t * t;
                            dv += 1.5 * a_r * sqrt_t + 2.0 * a_l * t;
                            d2v += 0.75 * a_r / sqrt_t + 2.0 * a_l;
                        }
                        ai[i] += x[j] * v;
                        dai[i] += x[j] * dv;
                        d2ai[i] += x[j] * d2v;
                        if let Some(row) = aij_row.as_deref_mut() {
                            row[idx] = v;
                        }
                    }
                    bi[i] = data.b[i];
                    dbi[i] = 0.0;
                }
            }
        }

        let mut a_hat = 0.0;
        let mut da_hat = 0.0;
        let mut d2a_hat = 0.0;
        let mut b_hat = 0.0;
        let mut db_hat = 0.0;
        for i in 0..n {
            a_hat += x[i] * ai[i];
            da_hat += x[i] * dai[i];
            d2a_hat += x[i] * d2ai[i];
            b_hat += x[i] * bi[i];
            db_hat += x[i] * dbi[i];
        }

        // Apply the P/(RT) prefactors.
        let rt = r * t;
        out.a[obj] = a_hat * p / (rt * rt);
        out.b[obj] = b_hat * p / rt;
        out.a_over_b[obj] = if b_hat != 0.0 { a_hat / (b_hat * rt) } else { 0.0 };

        if req.wants_t_derivatives() {
            let ra1 = if a_hat != 0.0 { da_hat / a_hat } else { 0.0 };
            let rb1 = if b_hat != 0.0 { db_hat / b_hat } else { 0.0 };
            if let Some(buf) = out.da_dt_over_a.as_mut() {
                buf[obj] = ra1 - 2.0 / t;
            }
            if let Some(buf) = out.db_dt_over_b.as_mut() {
                buf[obj] = rb1 - 1.0 / t;
            }
            if let Some(buf) = out.dai_dt_over_ai.as_mut() {
                for i in 0..n {
                    let ratio = if ai[i] != 0.0 { dai[i] / ai[i] } else { 0.0 };
                    buf[obj * n + i] = ratio - 2.0 / t;
                }
            }
            if let Some(buf) = out.dbi_dt_over_bi.as_mut() {
                for i in 0..n {
                    let ratio = if bi[i] != 0.0 { dbi[i] / bi[i] } else { 0.0 };
                    buf[obj * n + i] = ratio - 1.0 / t;
                }
            }
            if req.heat {
                // b_hat is at most linear in T, so its own curvature is zero
                // and only the 1/RT prefactor curves B.
                let ra2 = if a_hat != 0.0 { d2a_hat / a_hat } else { 0.0 };
                if let Some(buf) = out.d2a_dt2_over_a.as_mut() {
                    buf[obj] = ra2 - 4.0 * ra1 / t + 6.0 / (t * t);
                }
                if let Some(buf) = out.d2b_dt2_over_b.as_mut() {
                    buf[obj] = -2.0 * rb1 / t + 2.0 / (t * t);
                }
            }
        }

        // Normalize the per-component and pair terms.
        let inv_ahat = if a_hat != 0.0 { 1.0 / a_hat } else { 0.0 };
        let inv_bhat = if b_hat != 0.0 { 1.0 / b_hat } else { 0.0 };
        for i in 0..n {
            out.ai_over_a[obj * n + i] = ai[i] * inv_ahat;
            out.bi_over_b[obj * n + i] = bi[i] * inv_bhat;
        }
        if let Some(buf) = out.aij_over_a.as_mut() {
            for v in &mut buf[obj * n * n..(obj + 1) * n * n] {
                *v *= inv_ahat;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BinaryInteraction, CubicTuning, PvtCache};
    use crate::method::EosMethod;
    use pvt_core::{Component, ComponentSet, UnitSet};

    fn pr_cache() -> PvtCache {
        let set = ComponentSet::new(vec![
            Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986).with_acentric(0.0115),
            Component::new("nC4", 58.124, 3.796e6, 425.12, 0.255).with_acentric(0.2002),
        ])
        .unwrap();
        PvtCache::cubic(
            EosMethod::PengRobinson,
            set,
            UnitSet::si(),
            CubicTuning {
                binary: BinaryInteraction::Constant(vec![0.0, 0.013, 0.013, 0.0]),
                ..CubicTuning::default()
            },
            300.0,
        )
        .unwrap()
    }

    fn full_request() -> AssemblyRequest {
        AssemblyRequest {
            tier: DerivativeTier::Temperature,
            heat: true,
            fugacity: true,
        }
    }

    #[test]
    fn ideal_terms_are_zero() {
        let set =
            ComponentSet::new(vec![Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986)]).unwrap();
        let cache = PvtCache::ideal(set, UnitSet::si(), 300.0).unwrap();
        let terms = assemble_one(&cache, 1.0e7, 350.0, &[1.0], full_request());
        assert_eq!(terms.a[0], 0.0);
        assert_eq!(terms.b[0], 0.0);
        assert_eq!(terms.a_over_b[0], 0.0);
    }

    #[test]
    fn pure_methane_pr_reduced_terms() {
        // For a pure component, A = Omega_a alpha P_r / T_r^2 and
        // B = Omega_b P_r / T_r.
        let set = ComponentSet::new(vec![
            Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986).with_acentric(0.0115),
        ])
        .unwrap();
        let cache = PvtCache::cubic(
            EosMethod::PengRobinson,
            set,
            UnitSet::si(),
            CubicTuning::default(),
            300.0,
        )
        .unwrap();
        let (p, t) = (2.0e6, 250.0);
        let terms = assemble_one(&cache, p, t, &[1.0], full_request());

        let (tc, pc, omega) = (190.56, 4.599e6, 0.0115);
        let m = 0.37464 + omega * (1.54226 - 0.26992 * omega);
        let alpha = {
            let root = 1.0 + m * (1.0 - (t / tc).sqrt());
            root * root
        };
        let expect_a = 0.45724 * alpha * (p / pc) / (t / tc) / (t / tc);
        let expect_b = 0.07780 * (p / pc) / (t / tc);
        assert!((terms.a[0] - expect_a).abs() < 1e-3 * expect_a);
        assert!((terms.b[0] - expect_b).abs() < 1e-3 * expect_b);
        assert!((terms.a_over_b[0] - terms.a[0] / terms.b[0]).abs() < 1e-10);
    }

    #[test]
    fn ratios_are_consistent_with_composition() {
        let cache = pr_cache();
        let x = [0.3, 0.7];
        let terms = assemble_one(&cache, 5.0e6, 350.0, &x, full_request());
        // sum_i x_i (A_i / A) = 1 and sum_i x_i (B_i / B) = 1
        let sa: f64 = (0..2).map(|i| x[i] * terms.ai_over_a[i]).sum();
        let sb: f64 = (0..2).map(|i| x[i] * terms.bi_over_b[i]).sum();
        assert!((sa - 1.0).abs() < 1e-12);
        assert!((sb - 1.0).abs() < 1e-12);
        // pair ratios contract back to the component ratios
        let aij = terms.aij_over_a.as_ref().unwrap();
        for i in 0..2 {
            let contracted: f64 = (0..2).map(|j| x[j] * aij[i * 2 + j]).sum();
            assert!((contracted - terms.ai_over_a[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn temperature_derivative_ratio_matches_finite_difference() {
        let cache = pr_cache();
        let x = [0.5, 0.5];
        let (p, t) = (5.0e6, 350.0);
        let terms = assemble_one(&cache, p, t, &x, full_request());
        let dt = 1e-3;
        let plus = assemble_one(&cache, p, t + dt, &x, full_request());
        let minus = assemble_one(&cache, p, t - dt, &x, full_request());

        let fd = (plus.a[0] - minus.a[0]) / (2.0 * dt) / terms.a[0];
        let analytic = terms.da_dt_over_a.as_ref().unwrap()[0];
        assert!((fd - analytic).abs() < 1e-5 * analytic.abs());

        let fd2 = (plus.a[0] - 2.0 * terms.a[0] + minus.a[0]) / (dt * dt) / terms.a[0];
        let analytic2 = terms.d2a_dt2_over_a.as_ref().unwrap()[0];
        assert!((fd2 - analytic2).abs() < 1e-3 * analytic2.abs().max(1e-12));

        let fd_b = (plus.b[0] - minus.b[0]) / (2.0 * dt) / terms.b[0];
        let analytic_b = terms.db_dt_over_b.as_ref().unwrap()[0];
        assert!((fd_b - analytic_b).abs() < 1e-5 * analytic_b.abs());
    }

    #[test]
    fn redlich_kwong_temperature_scaling() {
        // Pure-component RK: A ~ T^-2.5 within the prefactors, so
        // (dA/dT)/A = -2.5 / T exactly.
        let set = ComponentSet::new(vec![Component::new("C1", 16.043, 4.599e6, 190.56, 0.0986)])
            .unwrap();
        let cache = PvtCache::cubic(
            EosMethod::RedlichKwong,
            set,
            UnitSet::si(),
            CubicTuning::default(),
            300.0,
        )
        .unwrap();
        let t = 320.0;
        let terms = assemble_one(&cache, 3.0e6, t, &[1.0], full_request());
        let analytic = terms.da_dt_over_a.as_ref().unwrap()[0];
        assert!((analytic - (-2.5 / t)).abs() < 1e-12);
    }

    #[test]
    fn shared_and_per_object_segment_paths_agree() {
        use crate::table::{CoefficientTable, TableNode};
        let set = ComponentSet::new(vec![
            Component::new("A", 20.0, 3.0e6, 300.0, 0.1),
            Component::new("B", 40.0, 2.0e6, 400.0, 0.2),
        ])
        .unwrap();
        let table = CoefficientTable::new(
            2,
            vec![
                TableNode {
                    temperature: 300.0,
                    a_pair: vec![0.4, 0.3, 0.3, 0.8],
                    b: vec![2e-5, 4e-5],
                    c: vec![0.0, 0.0],
                },
                TableNode {
                    temperature: 400.0,
                    a_pair: vec![0.3, 0.2, 0.2, 0.6],
                    b: vec![2.5e-5, 4.5e-5],
                    c: vec![0.0, 0.0],
                },
            ],
        )
        .unwrap();
        let cache = PvtCache::tabulated(set, UnitSet::si(), table, None).unwrap();

        let p = [1.0e6, 1.0e6];
        let t = [350.0, 350.0];
        let x = [0.5, 0.5, 0.5, 0.5];
        let batch = BatchState::new(&p, &t, &x, 2).unwrap();
        let mut segs = [0usize; 2];
        let shared = cache.resolve_segments(&t, &mut segs);
        assert!(shared);

        let fast = assemble(&cache, &batch, &segs, true, full_request());
        let slow = assemble(&cache, &batch, &segs, false, full_request());
        assert_eq!(fast.a, slow.a);
        assert_eq!(fast.b, slow.b);
    }
}
