//! Equation-of-state method selection and cubic shape constants.
//!
//! Every supported cubic can be written
//!
//! ```text
//! P = RT/(v - b) - a / ((v + kb0 b)(v + kb1 b))
//! ```
//!
//! so one pair of roots `(kb0, kb1)` fixes the whole functional form. The
//! remaining shape constants are derived once at construction: the critical
//! point of the cubic is a triple root in Z, which pins the critical `B` and
//! the critical `A/B` ratio, found by a short Newton solve.

use crate::error::{EosError, EosResult};

/// Supported equation-of-state methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EosMethod {
    /// Z = 1 everywhere; all coefficients resolve to zero.
    Ideal,
    /// Coefficients interpolated from a caller-supplied temperature table.
    Tabulated,
    RedlichKwong,
    SoaveRedlichKwong,
    PengRobinson,
    /// Peng–Robinson with the high-acentric correction above omega = 0.49.
    PengRobinsonCorrected,
}

impl EosMethod {
    /// The two method-defining roots of the volume polynomial denominator.
    pub fn default_roots(self) -> (f64, f64) {
        match self {
            // Tabulated data historically rides on the RK form.
            EosMethod::Ideal | EosMethod::Tabulated | EosMethod::RedlichKwong => (1.0, 0.0),
            EosMethod::SoaveRedlichKwong => (1.0, 0.0),
            EosMethod::PengRobinson | EosMethod::PengRobinsonCorrected => {
                (1.0 + std::f64::consts::SQRT_2, 1.0 - std::f64::consts::SQRT_2)
            }
        }
    }

    /// Whether the alpha correlation (and thus the acentric factor) is used.
    pub fn uses_acentric(self) -> bool {
        matches!(
            self,
            EosMethod::SoaveRedlichKwong
                | EosMethod::PengRobinson
                | EosMethod::PengRobinsonCorrected
        )
    }
}

/// The ten scalars defining one cubic form, derived once per cache.
///
/// `kb0`, `kb1` are the defining roots; `kb2`/`kb3` are the critical `A/B`
/// and critical `B` of that form; the rest are combinations the kernels
/// reuse every call.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubicShape {
    pub kb0: f64,
    pub kb1: f64,
    /// Critical A/B ratio of this form.
    pub kb2: f64,
    /// Critical B of this form.
    pub kb3: f64,
    /// kb0 * kb1
    pub kb4: f64,
    /// kb0 + kb1
    pub kb5: f64,
    /// kb0 + kb1 - 1
    pub kb6: f64,
    /// 1 / (kb0 - kb1), the scale of the fugacity log term
    pub kb7: f64,
    /// kb0 - kb1
    pub kb8: f64,
    /// Critical Z of this form.
    pub kb9: f64,
}

impl CubicShape {
    /// Derive the full constant set from the two defining roots.
    ///
    /// Requires `kb0 > kb1`: every supported method satisfies this, and it
    /// keeps the log term `ln((Z + kb0 B)/(Z + kb1 B))/(kb0 - kb1)` well
    /// defined.
    pub fn from_roots(kb0: f64, kb1: f64) -> EosResult<Self> {
        if !kb0.is_finite() || !kb1.is_finite() {
            return Err(EosError::Config {
                what: "non-finite cubic roots",
            });
        }
        if kb0 <= kb1 {
            return Err(EosError::Config {
                what: "cubic roots must satisfy kb0 > kb1",
            });
        }
        let w = kb0 * kb1;
        let u = kb0 + kb1;
        let (bc, ac) = critical_constants(u, w)?;
        let zc = (1.0 - (u - 1.0) * bc) / 3.0;
        Ok(Self {
            kb0,
            kb1,
            kb2: ac / bc,
            kb3: bc,
            kb4: w,
            kb5: u,
            kb6: u - 1.0,
            kb7: 1.0 / (kb0 - kb1),
            kb8: kb0 - kb1,
            kb9: zc,
        })
    }

    pub fn for_method(method: EosMethod) -> Self {
        let (kb0, kb1) = method.default_roots();
        // Default roots always satisfy kb0 > kb1.
        Self::from_roots(kb0, kb1).expect("default roots are valid")
    }

    /// Coefficients (s, t, u) of `Z^3 + s Z^2 + t Z + u = 0` for given A, B.
    pub fn cubic_coefficients(&self, a: f64, b: f64) -> (f64, f64, f64) {
        let s = self.kb6 * b - 1.0;
        let t = a + self.kb4 * b * b - self.kb5 * b * (b + 1.0);
        let u = -(a * b + self.kb4 * b * b * (1.0 + b));
        (s, t, u)
    }
}

/// Solve for the critical (B, A) of the cubic form with root sum `u` and
/// product `w`.
///
/// At the critical point the cubic in Z has a triple root `Zc`, giving
/// `Zc = (1 - (u-1) B)/3`, `3 Zc^2 = A + w B^2 - u B (B+1)` and
/// `Zc^3 = A B + w B^2 (1+B)`. Eliminating A leaves one equation in B,
/// solved here by Newton from a seed near the known covolume constants.
fn critical_constants(u: f64, w: f64) -> EosResult<(f64, f64)> {
    let zc = |b: f64| (1.0 - (u - 1.0) * b) / 3.0;
    let a_of = |b: f64, z: f64| 3.0 * z * z - w * b * b + u * b * (b + 1.0);
    let g = |b: f64| {
        let z = zc(b);
        z * z * z - b * a_of(b, z) - w * b * b * (1.0 + b)
    };

    let dzdb = -(u - 1.0) / 3.0;
    let mut b = 0.1;
    let mut converged = false;
    for _ in 0..50 {
        let z = zc(b);
        let a = a_of(b, z);
        let da_db = 6.0 * z * dzdb - 2.0 * w * b + u * (2.0 * b + 1.0);
        let dg = 3.0 * z * z * dzdb - a - b * da_db - w * (2.0 * b + 3.0 * b * b);
        let step = g(b) / dg;
        b -= step;
        if step.abs() < 1e-14 {
            converged = true;
            break;
        }
    }
    if !converged || !b.is_finite() || b <= 0.0 {
        return Err(EosError::Config {
            what: "critical-constant solve did not converge for the given cubic roots",
        });
    }
    let z = zc(b);
    Ok((b, a_of(b, z)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redlich_kwong_critical_constants() {
        let shape = CubicShape::for_method(EosMethod::RedlichKwong);
        // Omega_b = 0.08664, Omega_a / Omega_b = 4.93396, Zc = 1/3
        assert!((shape.kb3 - 0.08664).abs() < 1e-4);
        assert!((shape.kb2 - 4.934).abs() < 1e-2);
        assert!((shape.kb9 - 1.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn peng_robinson_critical_constants() {
        let shape = CubicShape::for_method(EosMethod::PengRobinson);
        // Omega_b = 0.07780, Omega_a = 0.45724, Zc = 0.3074
        assert!((shape.kb3 - 0.07780).abs() < 1e-4);
        assert!((shape.kb2 * shape.kb3 - 0.45724).abs() < 1e-4);
        assert!((shape.kb9 - 0.30740).abs() < 1e-4);
    }

    #[test]
    fn van_der_waals_roots_recover_one_eighth() {
        // kb0 = kb1 = 0 is rejected (degenerate log term), but the classic
        // constants are still reachable in the limit via distinct tiny roots.
        let shape = CubicShape::from_roots(1e-9, -1e-9).unwrap();
        assert!((shape.kb3 - 0.125).abs() < 1e-6);
        assert!((shape.kb9 - 0.375).abs() < 1e-6);
    }

    #[test]
    fn degenerate_roots_are_rejected() {
        assert!(CubicShape::from_roots(1.0, 1.0).is_err());
        assert!(CubicShape::from_roots(0.0, 1.0).is_err());
        assert!(CubicShape::from_roots(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn cubic_coefficients_match_peng_robinson_textbook_form() {
        let shape = CubicShape::for_method(EosMethod::PengRobinson);
        let (a, b) = (0.5, 0.1);
        let (s, t, u) = shape.cubic_coefficients(a, b);
        // PR: Z^3 - (1-B) Z^2 + (A - 3B^2 - 2B) Z - (AB - B^2 - B^3) = 0
        assert!((s - (b - 1.0)).abs() < 1e-12);
        assert!((t - (a - 3.0 * b * b - 2.0 * b)).abs() < 1e-12);
        assert!((u - -(a * b - b * b - b * b * b)).abs() < 1e-12);
    }
}
