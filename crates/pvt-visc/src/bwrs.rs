//! BWRS reference equation of state for methane.
//!
//! Starling's eleven-constant form, instantiated once for methane from the
//! Han–Starling generalized coefficient table. Used only to supply the
//! methane reference density (and its P/T sensitivities) to the
//! corresponding-states viscosity model.
//!
//! The density solve is a guarded scalar Newton iteration: saturation-side
//! seeding below the critical temperature, positivity clamping, a hard cap
//! of 100 iterations and a 1e-7 reduced-density step target. Hitting the cap
//! is not an error; the last iterate is returned as-is.

use tracing::debug;

pub const METHANE_TC: f64 = 190.564; // K
pub const METHANE_PC: f64 = 4.599e6; // Pa
pub const METHANE_MW: f64 = 16.043; // kg/kmol
/// Critical molar density, kmol/m^3 (162.66 kg/m^3).
pub const METHANE_RHO_C: f64 = 10.139;
const METHANE_OMEGA: f64 = 0.0115;

const R: f64 = 8_314.462_618; // J/(kmol K)

pub const MAX_ITERATIONS: usize = 100;
pub const DENSITY_TOL: f64 = 1.0e-7;

/// Han–Starling generalized parameter pairs (A_j, B_j), in the reduction
/// order B0, A0, C0, gamma, b, a, alpha, c, D0, d, E0.
const HAN_STARLING: [(f64, f64); 11] = [
    (0.443690, 0.115449),
    (1.28438, -0.920731),
    (0.356306, 1.70871),
    (0.544979, -0.270896),
    (0.528629, 0.349261),
    (0.484011, 0.754130),
    (0.0705233, -0.044448),
    (0.504087, 1.32245),
    (0.0307452, 0.179433),
    (0.0732828, 0.463492),
    (0.006450, -0.022143),
];

/// Methane BWRS coefficients, built once at model construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MethaneBwrs {
    b0: f64,
    a0: f64,
    c0: f64,
    gamma: f64,
    b: f64,
    a: f64,
    alpha: f64,
    c: f64,
    d0: f64,
    d: f64,
    e0: f64,
}

/// Outcome of one density solve.
#[derive(Debug, Clone, Copy)]
pub struct BwrsDensity {
    /// kmol/m^3; the last iterate when not converged.
    pub rho: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl Default for MethaneBwrs {
    fn default() -> Self {
        Self::new()
    }
}

impl MethaneBwrs {
    pub fn new() -> Self {
        let tc = METHANE_TC;
        let rc = METHANE_RHO_C;
        let w = METHANE_OMEGA;
        let g = |j: usize| HAN_STARLING[j].0 + HAN_STARLING[j].1 * w;
        Self {
            b0: g(0) / rc,
            a0: g(1) * R * tc / rc,
            c0: g(2) * R * tc.powi(3) / rc,
            gamma: g(3) / (rc * rc),
            b: g(4) / (rc * rc),
            a: g(5) * R * tc / (rc * rc),
            alpha: g(6) / rc.powi(3),
            c: g(7) * R * tc.powi(3) / (rc * rc),
            d0: g(8) * R * tc.powi(4) / rc,
            d: g(9) * R * tc * tc / (rc * rc),
            e0: (HAN_STARLING[10].0 + HAN_STARLING[10].1 * w * (-3.8 * w).exp()) * R * tc.powi(5)
                / rc,
        }
    }

    /// Pressure (Pa) and its density/temperature partials at
    /// (rho [kmol/m^3], T [K]).
    pub fn pressure(&self, rho: f64, t: f64) -> (f64, f64, f64) {
        let t2 = t * t;
        let b2 = self.b0 * R * t - self.a0 - self.c0 / t2 + self.d0 / (t2 * t)
            - self.e0 / (t2 * t2);
        let b3 = self.b * R * t - self.a - self.d / t;
        let b6 = self.alpha * (self.a + self.d / t);

        let r2 = rho * rho;
        let r3 = r2 * rho;
        let g = self.gamma * r2;
        let eg = (-g).exp();
        let p = rho * R * t
            + b2 * r2
            + b3 * r3
            + b6 * r3 * r3
            + (self.c / t2) * r3 * (1.0 + g) * eg;

        let dp_drho = R * t
            + 2.0 * b2 * rho
            + 3.0 * b3 * r2
            + 6.0 * b6 * r2 * r3
            + (self.c / t2) * eg * (3.0 * r2 + 3.0 * self.gamma * r2 * r2 - 2.0 * g * g * r2);

        let db2 = self.b0 * R + 2.0 * self.c0 / (t2 * t) - 3.0 * self.d0 / (t2 * t2)
            + 4.0 * self.e0 / (t2 * t2 * t);
        let db3 = self.b * R + self.d / t2;
        let db6 = -self.alpha * self.d / t2;
        let dp_dt = rho * R
            + db2 * r2
            + db3 * r3
            + db6 * r3 * r3
            - 2.0 * (self.c / (t2 * t)) * r3 * (1.0 + g) * eg;

        (p, dp_drho, dp_dt)
    }

    /// Rough methane saturation pressure (Pa), Antoine form; only used to
    /// pick the Newton seed side below the critical temperature.
    pub fn saturation_pressure(t: f64) -> f64 {
        let t = t.max(1.0);
        1.0e5 * 10f64.powf(3.9895 - 443.028 / (t - 0.49))
    }

    /// Solve P(rho, T) = p for the density on the physical branch.
    ///
    /// Finite positive inputs always produce a finite (if inaccurate)
    /// density; there is no failure path.
    pub fn density(&self, p: f64, t: f64) -> BwrsDensity {
        let liquid_side = t < METHANE_TC && p > Self::saturation_pressure(t);
        let mut rho = if liquid_side {
            2.5 * METHANE_RHO_C
        } else {
            (p / (R * t)).min(2.5 * METHANE_RHO_C)
        };

        let mut converged = false;
        let mut iterations = MAX_ITERATIONS;
        for it in 0..MAX_ITERATIONS {
            let (pv, dp_drho, _) = self.pressure(rho, t);
            if dp_drho <= 0.0 {
                // Inside the spinodal: walk back toward the seeded branch.
                rho = if liquid_side { rho * 1.1 } else { rho * 0.9 };
                continue;
            }
            let step = (pv - p) / dp_drho;
            let mut next = rho - step;
            if next <= 0.0 {
                next = 0.5 * rho;
            }
            let moved = (next - rho).abs();
            rho = next;
            if moved / METHANE_RHO_C < DENSITY_TOL {
                converged = true;
                iterations = it + 1;
                break;
            }
        }
        if !converged {
            debug!(p, t, rho, "bwrs density solve hit its iteration cap");
        }
        BwrsDensity {
            rho,
            iterations,
            converged,
        }
    }

    /// Density plus its P/T sensitivities from the implicit function
    /// theorem at the solved point.
    pub fn density_with_derivatives(&self, p: f64, t: f64) -> (BwrsDensity, f64, f64) {
        let solved = self.density(p, t);
        let (_, dp_drho, dp_dt) = self.pressure(solved.rho, t);
        (solved, 1.0 / dp_drho, -dp_dt / dp_drho)
    }
}
