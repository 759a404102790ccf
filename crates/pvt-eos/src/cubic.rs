//! Batched cubic root solver with physical-branch selection.
//!
//! Solves `Z^3 + s Z^2 + t Z + u = 0` per object, where (s, t, u) come from
//! the assembled A/B terms and the cubic shape constants. The solver is
//! deliberately branch-light and never reports failure: degenerate A/B
//! silently propagate NaN, which the once-per-batch validation already
//! flagged.
//!
//! Root finding works on the depressed cubic `W^3 + 3Q W + 2R = 0`
//! (`Z = W - s/3`). With one real root a Newton iteration seeded outside the
//! root is used instead of the closed-form cube root, which cancels badly
//! near repeated roots. With three real roots the extreme pair is taken from
//! the trigonometric solution plus a quadratic deflation, and the physical
//! branch is picked by a free-energy comparison.

use pvt_core::{BatchState, DerivativeTier};
use tracing::trace;

use crate::assembly::AbTerms;
use crate::method::CubicShape;

const NEWTON_TOL: f64 = 1e-10;
const NEWTON_MAX_ITER: usize = 20;

/// How single-phase mixtures are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhasePolicy {
    ForceGas,
    ForceOil,
    /// Gas when `Z - B` exceeds the configured critical value.
    ZMinusB,
    /// Free-energy test where it applies, otherwise `A/B` against the
    /// configured critical ratio.
    #[default]
    FugacityAOverB,
}

/// Phase-naming thresholds; tunable because their derivation is empirical.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseIdConfig {
    pub policy: PhasePolicy,
    pub crit_z_minus_b: f64,
    pub crit_a_over_b: f64,
}

impl Default for PhaseIdConfig {
    fn default() -> Self {
        Self {
            policy: PhasePolicy::FugacityAOverB,
            crit_z_minus_b: 0.25,
            crit_a_over_b: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhaseTag {
    Gas,
    Oil,
}

/// Z factors and requested derivatives for one batch.
#[derive(Debug, Clone)]
pub struct CubicSolution {
    pub z: Vec<f64>,
    /// dZ/dA at constant B, per object (always produced; the property
    /// stages chain through it).
    pub dz_da: Vec<f64>,
    /// dZ/dB at constant A, per object.
    pub dz_db: Vec<f64>,
    pub dz_dp: Option<Vec<f64>>,
    pub dz_dt: Option<Vec<f64>>,
    /// M x N composition derivatives.
    pub dz_dx: Option<Vec<f64>>,
    pub phase: Option<Vec<PhaseTag>>,
}

/// Solve the cubic for every object of a batch.
pub fn solve_batch(
    shape: &CubicShape,
    terms: &AbTerms,
    batch: &BatchState<'_>,
    tier: DerivativeTier,
    phase_id: Option<&PhaseIdConfig>,
) -> CubicSolution {
    let m = terms.m;
    let n = terms.n;
    let mut out = CubicSolution {
        z: vec![0.0; m],
        dz_da: vec![0.0; m],
        dz_db: vec![0.0; m],
        dz_dp: tier.pressure().then(|| vec![0.0; m]),
        dz_dt: tier.temperature().then(|| vec![0.0; m]),
        dz_dx: tier.composition().then(|| vec![0.0; m * n]),
        phase: phase_id.map(|_| vec![PhaseTag::Gas; m]),
    };

    for obj in 0..m {
        let a = terms.a[obj];
        let b = terms.b[obj];
        let ab = terms.a_over_b[obj];
        let (cs, ct, cu) = shape.cubic_coefficients(a, b);

        let (z, chose_high, tested) = physical_root(shape, cs, ct, cu, a, b, ab);
        out.z[obj] = z;

        // Implicit differentiation of the cubic at the polished root.
        let fp = (3.0 * z + 2.0 * cs) * z + ct;
        let f_a = z - b;
        let f_b = shape.kb6 * z * z + (2.0 * shape.kb4 * b - shape.kb5 * (2.0 * b + 1.0)) * z
            - (a + shape.kb4 * (2.0 + 3.0 * b) * b);
        let dz_da = -f_a / fp;
        let dz_db = -f_b / fp;
        out.dz_da[obj] = dz_da;
        out.dz_db[obj] = dz_db;

        if let Some(buf) = out.dz_dp.as_mut() {
            buf[obj] = (dz_da * a + dz_db * b) / batch.pressure[obj];
        }
        if let Some(buf) = out.dz_dt.as_mut() {
            let da_dt = terms.da_dt_over_a.as_ref().expect("assembly provides dA/dT")[obj] * a;
            let db_dt = terms.db_dt_over_b.as_ref().expect("assembly provides dB/dT")[obj] * b;
            buf[obj] = dz_da * da_dt + dz_db * db_dt;
        }
        if let Some(buf) = out.dz_dx.as_mut() {
            for i in 0..n {
                let da_dx = 2.0 * a * terms.ai_over_a[obj * n + i];
                let db_dx = b * terms.bi_over_b[obj * n + i];
                buf[obj * n + i] = dz_da * da_dx + dz_db * db_dx;
            }
        }

        if let Some(cfg) = phase_id {
            let tag = match cfg.policy {
                PhasePolicy::ForceGas => PhaseTag::Gas,
                PhasePolicy::ForceOil => PhaseTag::Oil,
                PhasePolicy::ZMinusB => {
                    if z - b > cfg.crit_z_minus_b {
                        PhaseTag::Gas
                    } else {
                        PhaseTag::Oil
                    }
                }
                PhasePolicy::FugacityAOverB => {
                    if tested {
                        if chose_high { PhaseTag::Gas } else { PhaseTag::Oil }
                    } else if ab < cfg.crit_a_over_b {
                        PhaseTag::Gas
                    } else {
                        PhaseTag::Oil
                    }
                }
            };
            out.phase.as_mut().expect("allocated with phase_id")[obj] = tag;
        }
    }
    out
}

/// Find the physically relevant root of one cubic.
///
/// Returns `(z, chose_high, free_energy_tested)`.
fn physical_root(
    shape: &CubicShape,
    cs: f64,
    ct: f64,
    cu: f64,
    a: f64,
    b: f64,
    ab: f64,
) -> (f64, bool, bool) {
    if a == 0.0 && b == 0.0 {
        // Ideal coefficients: the cubic collapses to Z^2 (Z - 1).
        return (1.0, true, false);
    }

    // Depress: Z = W - cs/3, W^3 + 3 Q W + 2 R = 0.
    let q = ct / 3.0 - cs * cs / 9.0;
    let r = cs * (2.0 * cs * cs / 9.0 - ct) / 6.0 + cu / 2.0;
    let g = r * r + q * q * q;

    let (mut z, chose_high, tested) = if g >= 0.0 {
        // One real root: Newton from a seed past it, sign taken from R.
        let mut w = -r.signum() * (3.0 * q.abs().max(r.abs())).sqrt();
        let mut iterations = NEWTON_MAX_ITER;
        for it in 0..NEWTON_MAX_ITER {
            let f = w * (w * w + 3.0 * q) + 2.0 * r;
            if f == 0.0 {
                // Exactly on the root (triple-root inputs land here).
                iterations = it;
                break;
            }
            let step = f / (3.0 * (w * w + q));
            w -= step;
            if step.abs() < NEWTON_TOL {
                iterations = it;
                break;
            }
        }
        if iterations == NEWTON_MAX_ITER {
            trace!(q, r, "depressed-cubic newton hit its iteration cap");
        }
        (w - cs / 3.0, true, false)
    } else {
        // Three real roots: largest from the trigonometric form, smallest
        // from the deflated quadratic.
        let sq = (-q).sqrt();
        let phi = (-r / (sq * sq * sq)).clamp(-1.0, 1.0).acos() / 3.0;
        let z_hi = 2.0 * sq * phi.cos() - cs / 3.0;
        let beta = cs + z_hi;
        let gamma = ct + beta * z_hi;
        let disc = (beta * beta - 4.0 * gamma).max(0.0);
        let z_lo = 0.5 * (-beta - disc.sqrt());

        // Free-energy tie-break, only in the window where both roots are
        // candidates; z_lo must clear B for its log terms to exist.
        if ab > 2.0 && b <= shape.kb3 && z_lo > b {
            let span = z_hi - z_lo;
            let repulsive = ((z_hi - b) / (z_lo - b)).ln();
            let attractive = ((z_hi + shape.kb0 * b) / (z_hi + shape.kb1 * b)).ln()
                - ((z_lo + shape.kb0 * b) / (z_lo + shape.kb1 * b)).ln();
            let delta = span - repulsive - ab * shape.kb7 * attractive;
            if delta > 0.0 {
                (z_lo, false, true)
            } else {
                (z_hi, true, true)
            }
        } else {
            (z_hi, true, false)
        }
    };

    // One trailing Newton correction on the full cubic scrubs the rounding
    // left by either branch.
    let f = ((z + cs) * z + ct) * z + cu;
    if f != 0.0 {
        let fp = (3.0 * z + 2.0 * cs) * z + ct;
        z -= f / fp;
    }

    (z, chose_high, tested)
}
