//! The parameter cache: derived per-component and per-pair coefficients.
//!
//! Built once from validated descriptor blocks, immutable afterwards. The
//! generic-cubic methods pre-split the pair terms `sqrt(a_i a_j) (1 - k_ij)`
//! by temperature power (constant, sqrt(T), T, and additionally T^1.5, T^2
//! when the binary interaction terms are linear in temperature) so the
//! assembly loops reduce to a handful of fused multiply-adds per pair.

use pvt_core::{ComponentSet, UnitSet};
use tracing::debug;

use crate::error::{EosError, EosResult};
use crate::method::{CubicShape, EosMethod};
use crate::table::{CoefficientTable, SegmentIndex};

/// Binary interaction coefficients, row-major N x N, symmetric.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryInteraction {
    #[default]
    None,
    Constant(Vec<f64>),
    LinearInT { k0: Vec<f64>, k1: Vec<f64> },
}

/// Optional tuning for the closed-form cubic methods.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubicTuning {
    /// Per-component Omega_a override; method critical value when absent.
    pub omega_a: Option<Vec<f64>>,
    /// Per-component Omega_b override; method critical value when absent.
    pub omega_b: Option<Vec<f64>>,
    /// Per-component volume-translation term, engine volume units.
    pub volume_shift: Option<Vec<f64>>,
    /// Temperature slope of the volume-translation term.
    pub volume_shift_slope: Option<Vec<f64>>,
    pub binary: BinaryInteraction,
}

/// Cached closed-form Redlich–Kwong data.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RkData {
    /// sqrt of a_c,i = Omega_a R^2 Tc^2.5 / Pc, so pair terms are products
    pub(crate) sqrt_ac: Vec<f64>,
    /// b_i = Omega_b R Tc / Pc
    pub(crate) b: Vec<f64>,
    pub(crate) c: Vec<f64>,
    pub(crate) dc_dt: Vec<f64>,
    pub(crate) k0: Option<Vec<f64>>,
    pub(crate) k1: Option<Vec<f64>>,
}

/// Cached generic-cubic (SRK/PR family) pair data, split by temperature
/// power: `a_pair(T) = a0 + as sqrt(T) + at T [+ ar T^1.5 + al T^2]`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CubicData {
    pub(crate) a0: Vec<f64>,
    pub(crate) a_s: Vec<f64>,
    pub(crate) a_t: Vec<f64>,
    pub(crate) a_r: Option<Vec<f64>>,
    pub(crate) a_l: Option<Vec<f64>>,
    pub(crate) b: Vec<f64>,
    pub(crate) c: Vec<f64>,
    pub(crate) dc_dt: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MethodData {
    Ideal,
    Tabulated(CoefficientTable),
    RedlichKwong(RkData),
    Cubic(CubicData),
}

/// Immutable cache of everything the batch kernels read.
#[derive(Debug, Clone)]
pub struct PvtCache {
    method: EosMethod,
    shape: CubicShape,
    components: ComponentSet,
    units: UnitSet,
    gas_constant: f64,
    translate: bool,
    default_temperature: f64,
    pub(crate) data: MethodData,
}

impl PvtCache {
    /// Ideal-gas cache: every coefficient resolves to zero.
    pub fn ideal(
        components: ComponentSet,
        units: UnitSet,
        default_temperature: f64,
    ) -> EosResult<Self> {
        let shape = CubicShape::for_method(EosMethod::Ideal);
        Ok(Self {
            method: EosMethod::Ideal,
            gas_constant: units.gas_constant(),
            shape,
            components,
            units,
            translate: false,
            default_temperature,
            data: MethodData::Ideal,
        })
    }

    /// Cache over an application-supplied coefficient table.
    ///
    /// `roots` overrides the cubic form the table rides on (Redlich–Kwong
    /// when absent).
    pub fn tabulated(
        components: ComponentSet,
        units: UnitSet,
        table: CoefficientTable,
        roots: Option<(f64, f64)>,
    ) -> EosResult<Self> {
        if table.n_components() != components.len() {
            return Err(EosError::LengthMismatch {
                what: "coefficient table width",
                expected: components.len(),
                got: table.n_components(),
            });
        }
        let shape = match roots {
            Some((kb0, kb1)) => CubicShape::from_roots(kb0, kb1)?,
            None => CubicShape::for_method(EosMethod::Tabulated),
        };
        let translate = table.has_translation();
        let default_temperature = table.default_temperature();
        debug!(
            nodes = table.n_nodes(),
            components = components.len(),
            translate,
            "built tabulated pvt cache"
        );
        Ok(Self {
            method: EosMethod::Tabulated,
            gas_constant: units.gas_constant(),
            shape,
            components,
            units,
            translate,
            default_temperature,
            data: MethodData::Tabulated(table),
        })
    }

    /// Cache for the closed-form cubic methods (RK, SRK, PR, corrected PR).
    pub fn cubic(
        method: EosMethod,
        components: ComponentSet,
        units: UnitSet,
        tuning: CubicTuning,
        default_temperature: f64,
    ) -> EosResult<Self> {
        if matches!(method, EosMethod::Ideal | EosMethod::Tabulated) {
            return Err(EosError::Config {
                what: "cubic constructor requires a closed-form method",
            });
        }
        let n = components.len();
        let shape = CubicShape::for_method(method);
        let omega_a = resolve_omegas(tuning.omega_a.as_deref(), shape.kb2 * shape.kb3, n)?;
        let omega_b = resolve_omegas(tuning.omega_b.as_deref(), shape.kb3, n)?;
        let (k0, k1) = resolve_binaries(&tuning.binary, n)?;
        let c = resolve_shift(tuning.volume_shift.as_deref(), n)?;
        let dc_dt = resolve_shift(tuning.volume_shift_slope.as_deref(), n)?;
        let translate = c.iter().chain(&dc_dt).any(|&v| v != 0.0);

        let r = units.gas_constant();
        let pc = components.critical_pressures();
        let tc = components.critical_temperatures();

        let data = if method == EosMethod::RedlichKwong {
            let sqrt_ac: Vec<f64> = (0..n)
                .map(|i| (omega_a[i] * r * r * tc[i].powf(2.5) / pc[i]).sqrt())
                .collect();
            let b = (0..n).map(|i| omega_b[i] * r * tc[i] / pc[i]).collect();
            MethodData::RedlichKwong(RkData {
                sqrt_ac,
                b,
                c,
                dc_dt,
                k0,
                k1,
            })
        } else {
            // SRK / PR / corrected PR: alpha_i(T) = (e_i + f_i sqrt(T))^2
            let mut e = vec![0.0; n];
            let mut f = vec![0.0; n];
            let mut sqrt_ac = vec![0.0; n];
            for i in 0..n {
                let omega = components
                    .acentric_factor(i)
                    .ok_or(EosError::MissingComponentData {
                        index: i,
                        what: "acentric factor",
                    })?;
                let m = alpha_slope(method, omega);
                e[i] = 1.0 + m;
                f[i] = -m / tc[i].sqrt();
                sqrt_ac[i] = (omega_a[i] * r * r * tc[i] * tc[i] / pc[i]).sqrt();
            }
            let linear_binaries = k1.is_some();
            let mut a0 = vec![0.0; n * n];
            let mut a_s = vec![0.0; n * n];
            let mut a_t = vec![0.0; n * n];
            let mut a_r = linear_binaries.then(|| vec![0.0; n * n]);
            let mut a_l = linear_binaries.then(|| vec![0.0; n * n]);
            for i in 0..n {
                for j in 0..n {
                    let idx = i * n + j;
                    let s = sqrt_ac[i] * sqrt_ac[j];
                    let k0ij = k0.as_ref().map_or(0.0, |k| k[idx]);
                    let k1ij = k1.as_ref().map_or(0.0, |k| k[idx]);
                    let ee = e[i] * e[j];
                    let ef = e[i] * f[j] + e[j] * f[i];
                    let ff = f[i] * f[j];
                    a0[idx] = s * ee * (1.0 - k0ij);
                    a_s[idx] = s * ef * (1.0 - k0ij);
                    a_t[idx] = s * (ff * (1.0 - k0ij) - ee * k1ij);
                    if let (Some(ar), Some(al)) = (a_r.as_mut(), a_l.as_mut()) {
                        ar[idx] = -s * ef * k1ij;
                        al[idx] = -s * ff * k1ij;
                    }
                }
            }
            let b = (0..n).map(|i| omega_b[i] * r * tc[i] / pc[i]).collect();
            MethodData::Cubic(CubicData {
                a0,
                a_s,
                a_t,
                a_r,
                a_l,
                b,
                c,
                dc_dt,
            })
        };
        debug!(?method, components = n, translate, "built cubic pvt cache");
        Ok(Self {
            method,
            gas_constant: r,
            shape,
            components,
            units,
            translate,
            default_temperature,
            data,
        })
    }

    /// Copy of this cache pinned at temperature `t`, with the temperature
    /// dependence of tabulated coefficients folded away. Closed-form methods
    /// keep their analytic temperature dependence; only the default
    /// temperature moves.
    pub fn at_temperature(&self, t: f64) -> Self {
        let mut copy = self.clone();
        copy.default_temperature = t;
        if let MethodData::Tabulated(table) = &self.data {
            copy.data = MethodData::Tabulated(table.at_temperature(t));
        }
        copy
    }

    pub fn method(&self) -> EosMethod {
        self.method
    }

    pub fn shape(&self) -> &CubicShape {
        &self.shape
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn units(&self) -> &UnitSet {
        &self.units
    }

    /// Gas constant in engine units.
    pub fn gas_constant(&self) -> f64 {
        self.gas_constant
    }

    /// Gravity constant and gas constant, for compositional grading.
    pub fn gravity_and_gas_constant(&self) -> (f64, f64) {
        (self.units.gravity(), self.gas_constant)
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Whether volume translation is active (any cached C term nonzero).
    pub fn translates_volume(&self) -> bool {
        self.translate
    }

    pub fn default_temperature(&self) -> f64 {
        self.default_temperature
    }

    /// Per-object temperature-table segments; the returned flag is true when
    /// all objects share one segment. Methods without tables trivially share.
    pub fn resolve_segments(&self, temperatures: &[f64], out: &mut [SegmentIndex]) -> bool {
        match &self.data {
            MethodData::Tabulated(table) => table.resolve_segments(temperatures, out),
            _ => {
                out.fill(0);
                true
            }
        }
    }

    /// Volume-translation C term and temperature slope for one component.
    pub(crate) fn translation_c(&self, seg: SegmentIndex, i: usize, t: f64) -> (f64, f64) {
        match &self.data {
            MethodData::Ideal => (0.0, 0.0),
            MethodData::Tabulated(table) => table.c_at(seg, i, t),
            MethodData::RedlichKwong(rk) => (rk.c[i] + rk.dc_dt[i] * t, rk.dc_dt[i]),
            MethodData::Cubic(data) => (data.c[i] + data.dc_dt[i] * t, data.dc_dt[i]),
        }
    }
}

fn alpha_slope(method: EosMethod, omega: f64) -> f64 {
    match method {
        EosMethod::SoaveRedlichKwong => 0.480 + omega * (1.574 - 0.176 * omega),
        EosMethod::PengRobinson => 0.37464 + omega * (1.54226 - 0.26992 * omega),
        EosMethod::PengRobinsonCorrected => {
            if omega > 0.49 {
                0.379642 + omega * (1.48503 + omega * (-0.164423 + 0.016666 * omega))
            } else {
                0.37464 + omega * (1.54226 - 0.26992 * omega)
            }
        }
        _ => 0.0,
    }
}

fn resolve_omegas(user: Option<&[f64]>, default: f64, n: usize) -> EosResult<Vec<f64>> {
    match user {
        None => Ok(vec![default; n]),
        Some(values) => {
            if values.len() != n {
                return Err(EosError::LengthMismatch {
                    what: "omega override",
                    expected: n,
                    got: values.len(),
                });
            }
            if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
                return Err(EosError::Config {
                    what: "omega overrides must be finite and positive",
                });
            }
            Ok(values.to_vec())
        }
    }
}

fn resolve_shift(user: Option<&[f64]>, n: usize) -> EosResult<Vec<f64>> {
    match user {
        None => Ok(vec![0.0; n]),
        Some(values) => {
            if values.len() != n {
                return Err(EosError::LengthMismatch {
                    what: "volume shift",
                    expected: n,
                    got: values.len(),
                });
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(EosError::Config {
                    what: "volume shift terms must be finite",
                });
            }
            Ok(values.to_vec())
        }
    }
}

fn check_binary_matrix(k: &[f64], n: usize, what: &'static str) -> EosResult<()> {
    if k.len() != n * n {
        return Err(EosError::LengthMismatch {
            what,
            expected: n * n,
            got: k.len(),
        });
    }
    if k.iter().any(|v| !v.is_finite()) {
        return Err(EosError::Config {
            what: "binary interaction terms must be finite",
        });
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if (k[i * n + j] - k[j * n + i]).abs() > 1e-12 {
                return Err(EosError::Config {
                    what: "binary interaction matrix must be symmetric",
                });
            }
        }
    }
    Ok(())
}

type BinaryPair = (Option<Vec<f64>>, Option<Vec<f64>>);

fn resolve_binaries(binary: &BinaryInteraction, n: usize) -> EosResult<BinaryPair> {
    match binary {
        BinaryInteraction::None => Ok((None, None)),
        BinaryInteraction::Constant(k0) => {
            check_binary_matrix(k0, n, "binary interaction")?;
            Ok((Some(k0.clone()), None))
        }
        BinaryInteraction::LinearInT { k0, k1 } => {
            check_binary_matrix(k0, n, "binary interaction")?;
            check_binary_matrix(k1, n, "binary interaction slope")?;
            Ok((Some(k0.clone()), Some(k1.clone())))
        }
    }
}
