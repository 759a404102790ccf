//! Corresponding-states viscosity on a methane reference fluid.
//!
//! The mixture is mapped to a methane state through Pedersen-style
//! critical-property mixing rules and a shape-factor correction
//! `alpha/alpha0` driven by the reduced methane density at the scaled state.
//! The methane density comes from the BWRS reference EOS; its viscosity from
//! the reference correlation in [`crate::methane`].
//!
//! Derivatives are propagated with a small forward-mode value type carrying
//! one pressure slot, one temperature slot and N composition slots; the two
//! implicit BWRS solves enter through the implicit function theorem.

use std::ops::{Add, Div, Mul, Sub};
use std::sync::OnceLock;

use pvt_core::{BatchState, ComponentSet, DerivativeTier, UnitSet};
use tracing::debug;

use crate::bwrs::{METHANE_MW, METHANE_PC, METHANE_RHO_C, METHANE_TC, MethaneBwrs};
use crate::methane;
use crate::model::ViscosityResult;

/// Pedersen mixture molecular-weight correlation coefficient.
const MW_MIX_COEFF: f64 = 1.304e-4;
const MW_MIX_EXP: f64 = 2.303;

/// Shape-factor correlation coefficients.
const ALPHA_COEFF: f64 = 7.378e-3;
const ALPHA_RHO_EXP: f64 = 1.847;
const ALPHA_MW_EXP: f64 = 0.5173;

/// Corresponding-states model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CsMethod {
    /// Classic two-parameter mapping, no heavy-oil excess.
    #[default]
    TwoParameter,
    /// Heavy-oil extension, shape factor driven by the weight-average
    /// molecular weight.
    HeavyOilJip,
    /// Heavy-oil extension on the standard mixture molecular weight.
    HeavyOil,
}

/// Lazily-built per-pair mixing terms (the shape-factor table).
#[derive(Debug, Clone)]
struct ShapeTable {
    /// eta_ij = ((Tci/Pci)^(1/3) + (Tcj/Pcj)^(1/3))^3, N x N.
    eta: Vec<f64>,
    /// eta_ij sqrt(Tci Tcj), N x N.
    eta_tt: Vec<f64>,
}

/// Corresponding-states viscosity model.
#[derive(Debug, Clone)]
pub struct CsModel {
    pub method: CsMethod,
    /// Final viscosity multiplier.
    pub vterm1: f64,
    /// Multiplier on the mixture molecular-weight correlation.
    pub vterm2: f64,
    /// Multiplier on the shape-factor correlation coefficient.
    pub vterm3: f64,
    /// Multiplier on the heavy-oil excess term.
    pub vterm4: f64,
    bwrs: MethaneBwrs,
    tables: OnceLock<ShapeTable>,
}

impl Default for CsModel {
    fn default() -> Self {
        Self::new(CsMethod::TwoParameter)
    }
}

impl CsModel {
    pub fn new(method: CsMethod) -> Self {
        Self {
            method,
            vterm1: 1.0,
            vterm2: 1.0,
            vterm3: 1.0,
            vterm4: 1.0,
            bwrs: MethaneBwrs::new(),
            tables: OnceLock::new(),
        }
    }

    /// Build the lazy mixing tables now. Must run before the model is shared
    /// across threads for read-only evaluation.
    pub fn force_tables(&self, components: &ComponentSet, units: &UnitSet) {
        let _ = self.tables(components, units);
    }

    fn tables(&self, components: &ComponentSet, units: &UnitSet) -> &ShapeTable {
        self.tables.get_or_init(|| {
            let n = components.len();
            let tc: Vec<f64> = components
                .critical_temperatures()
                .iter()
                .map(|t| t * units.temperature)
                .collect();
            let pc: Vec<f64> = components
                .critical_pressures()
                .iter()
                .map(|p| p * units.pressure)
                .collect();
            let third: Vec<f64> = (0..n).map(|i| (tc[i] / pc[i]).cbrt()).collect();
            let mut eta = vec![0.0; n * n];
            let mut eta_tt = vec![0.0; n * n];
            for i in 0..n {
                for j in 0..n {
                    let s = third[i] + third[j];
                    eta[i * n + j] = s * s * s;
                    eta_tt[i * n + j] = eta[i * n + j] * (tc[i] * tc[j]).sqrt();
                }
            }
            debug!(components = n, "built corresponding-states mixing tables");
            ShapeTable { eta, eta_tt }
        })
    }

    pub fn evaluate(
        &self,
        components: &ComponentSet,
        units: &UnitSet,
        batch: &BatchState<'_>,
        tier: DerivativeTier,
    ) -> ViscosityResult {
        let m = batch.len();
        let n = batch.n_components();
        let mut out = ViscosityResult::allocate(m, n, tier);
        let table = self.tables(components, units);
        let mw = components.molecular_weights();
        let nx = if tier.composition() { n } else { 0 };

        for obj in 0..m {
            let x = batch.composition_of(obj);

            // Pseudo-critical mixing sums; pressure/temperature free, so
            // only composition slots are live.
            let mut num = Var::constant(0.0, nx);
            let mut den = Var::constant(0.0, nx);
            for i in 0..n {
                for j in 0..n {
                    num.v += x[i] * x[j] * table.eta_tt[i * n + j];
                    den.v += x[i] * x[j] * table.eta[i * n + j];
                }
            }
            for j in 0..nx {
                let mut dn = 0.0;
                let mut dd = 0.0;
                for i in 0..n {
                    dn += 2.0 * x[i] * table.eta_tt[i * n + j];
                    dd += 2.0 * x[i] * table.eta[i * n + j];
                }
                num.dx[j] = dn;
                den.dx[j] = dd;
            }
            let tc_mix = num.clone() / den.clone();
            let pc_mix = num.clone().scale(8.0) / (den.clone() * den.clone());

            // Number and weight average molecular weights.
            let mut mwn = Var::constant(0.0, nx);
            let mut mw2 = Var::constant(0.0, nx);
            for i in 0..n {
                mwn.v += x[i] * mw[i];
                mw2.v += x[i] * mw[i] * mw[i];
            }
            for j in 0..nx {
                mwn.dx[j] = mw[j];
                mw2.dx[j] = mw[j] * mw[j];
            }
            let mww = mw2 / mwn.clone();
            let mw_mix = (mww.clone().powf(MW_MIX_EXP) - mwn.clone().powf(MW_MIX_EXP))
                .scale(MW_MIX_COEFF * self.vterm2)
                + mwn.clone();

            // Engine P and T as seed variables (partials are the engine->SI
            // factors, so the outputs differentiate against engine units).
            let mut p_pa = Var::constant(batch.pressure[obj] * units.pressure, nx);
            p_pa.dp = units.pressure;
            let mut t_k = Var::constant(batch.temperature[obj] * units.temperature, nx);
            t_k.dt = units.temperature;

            // Reduced methane density at the plainly-scaled state.
            let t_scaled = t_k.clone() * Var::constant(METHANE_TC, nx) / tc_mix.clone();
            let p_scaled = p_pa.clone() * Var::constant(METHANE_PC, nx) / pc_mix.clone();
            let rho_r = self.implicit_density(&p_scaled, &t_scaled).scale(1.0 / METHANE_RHO_C);

            // Shape factors.
            let alpha_coeff = ALPHA_COEFF * self.vterm3;
            let mw_alpha = match self.method {
                CsMethod::HeavyOilJip => mww.clone(),
                _ => mw_mix.clone(),
            };
            let rho_pow = rho_r.powf(ALPHA_RHO_EXP);
            let alpha_mix = (rho_pow.clone() * mw_alpha.powf(ALPHA_MW_EXP)).scale(alpha_coeff)
                + Var::constant(1.0, nx);
            let alpha0 = rho_pow
                .scale(alpha_coeff * METHANE_MW.powf(ALPHA_MW_EXP))
                + Var::constant(1.0, nx);
            let ratio = alpha0.clone() / alpha_mix.clone();

            // Corrected reference state and its methane density.
            let t0 = t_k * Var::constant(METHANE_TC, nx) / tc_mix.clone() * ratio.clone();
            let p0 = p_pa * Var::constant(METHANE_PC, nx) / pc_mix.clone() * ratio;
            let rho0 = self.implicit_density(&p0, &t0);
            // kmol/m^3 -> g/cm^3
            let rho0_gcc = rho0.scale(METHANE_MW * 1.0e-3);

            let heavy = match self.method {
                CsMethod::TwoParameter => None,
                CsMethod::HeavyOilJip | CsMethod::HeavyOil => Some(self.vterm4),
            };
            let (mu_ref, dmu_dt0, dmu_drho0) = methane::viscosity(t0.v, rho0_gcc.v, heavy);
            let mu0 = t0.chain2(&rho0_gcc, mu_ref, dmu_dt0, dmu_drho0);

            // Corresponding-states scaling back to the mixture.
            let prefactor = tc_mix.scale(1.0 / METHANE_TC).powf(-1.0 / 6.0)
                * pc_mix.scale(1.0 / METHANE_PC).powf(2.0 / 3.0)
                * mw_mix.scale(1.0 / METHANE_MW).powf(0.5)
                * (alpha_mix / alpha0);
            // microP -> Pa s -> engine units.
            let mu = (prefactor * mu0).scale(self.vterm1 * 1.0e-7 / units.viscosity);

            out.mu[obj] = mu.v;
            if let Some(buf) = out.dmu_dp.as_mut() {
                buf[obj] = mu.dp;
            }
            if let Some(buf) = out.dmu_dt.as_mut() {
                buf[obj] = mu.dt;
            }
            if let Some(buf) = out.dmu_dx.as_mut() {
                buf[obj * n..(obj + 1) * n].copy_from_slice(&mu.dx);
            }
        }
        out
    }

    /// BWRS density as a forward-mode value via the implicit function
    /// theorem at the solved point.
    fn implicit_density(&self, p: &Var, t: &Var) -> Var {
        let (solved, drho_dp, drho_dt) = self.bwrs.density_with_derivatives(p.v, t.v);
        let mut rho = Var::constant(solved.rho, p.dx.len());
        rho.dp = drho_dp * p.dp + drho_dt * t.dp;
        rho.dt = drho_dp * p.dt + drho_dt * t.dt;
        for j in 0..rho.dx.len() {
            rho.dx[j] = drho_dp * p.dx[j] + drho_dt * t.dx[j];
        }
        rho
    }
}

impl PartialEq for CsModel {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
            && self.vterm1 == other.vterm1
            && self.vterm2 == other.vterm2
            && self.vterm3 == other.vterm3
            && self.vterm4 == other.vterm4
    }
}

/// Forward-mode scalar with pressure, temperature and composition slots.
#[derive(Debug, Clone)]
struct Var {
    v: f64,
    dp: f64,
    dt: f64,
    dx: Vec<f64>,
}

impl Var {
    fn constant(v: f64, nx: usize) -> Self {
        Self {
            v,
            dp: 0.0,
            dt: 0.0,
            dx: vec![0.0; nx],
        }
    }

    /// Chain rule through a scalar function: value f, slope df.
    fn chain(mut self, f: f64, df: f64) -> Self {
        self.v = f;
        self.dp *= df;
        self.dt *= df;
        for d in &mut self.dx {
            *d *= df;
        }
        self
    }

    /// Chain rule through a two-argument function f(self, other).
    fn chain2(&self, other: &Var, f: f64, df_dself: f64, df_dother: f64) -> Self {
        let mut out = Var::constant(f, self.dx.len());
        out.dp = df_dself * self.dp + df_dother * other.dp;
        out.dt = df_dself * self.dt + df_dother * other.dt;
        for j in 0..out.dx.len() {
            out.dx[j] = df_dself * self.dx[j] + df_dother * other.dx[j];
        }
        out
    }

    fn scale(self, k: f64) -> Self {
        let f = self.v * k;
        self.chain(f, k)
    }

    fn powf(self, e: f64) -> Self {
        let f = self.v.powf(e);
        let df = e * self.v.powf(e - 1.0);
        self.chain(f, df)
    }
}

impl Add for Var {
    type Output = Var;
    fn add(mut self, rhs: Var) -> Var {
        self.v += rhs.v;
        self.dp += rhs.dp;
        self.dt += rhs.dt;
        for (a, b) in self.dx.iter_mut().zip(&rhs.dx) {
            *a += b;
        }
        self
    }
}

impl Sub for Var {
    type Output = Var;
    fn sub(mut self, rhs: Var) -> Var {
        self.v -= rhs.v;
        self.dp -= rhs.dp;
        self.dt -= rhs.dt;
        for (a, b) in self.dx.iter_mut().zip(&rhs.dx) {
            *a -= b;
        }
        self
    }
}

impl Mul for Var {
    type Output = Var;
    fn mul(mut self, rhs: Var) -> Var {
        let (u, w) = (self.v, rhs.v);
        self.v = u * w;
        self.dp = self.dp * w + rhs.dp * u;
        self.dt = self.dt * w + rhs.dt * u;
        for (a, b) in self.dx.iter_mut().zip(&rhs.dx) {
            *a = *a * w + b * u;
        }
        self
    }
}

impl Div for Var {
    type Output = Var;
    fn div(mut self, rhs: Var) -> Var {
        let (u, w) = (self.v, rhs.v);
        self.v = u / w;
        self.dp = (self.dp * w - rhs.dp * u) / (w * w);
        self.dt = (self.dt * w - rhs.dt * u) / (w * w);
        for (a, b) in self.dx.iter_mut().zip(&rhs.dx) {
            *a = (*a * w - b * u) / (w * w);
        }
        self
    }
}
