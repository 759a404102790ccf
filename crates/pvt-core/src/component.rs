//! Component metadata sets.
//!
//! A [`ComponentSet`] owns the per-component constants every downstream stage
//! reads: molecular weight, critical properties, parachor, and the optional
//! acentric factor / reference-enthalpy polynomial. The set is fixed for the
//! lifetime of a parameter cache; kernels read it through packed slices.

use crate::error::{CoreError, CoreResult};

/// Reference-state enthalpy polynomial, Passut–Danner form.
///
/// `h(T) = c[0] T + c[1] T^2 + c[2] T^3 + c[3] T^4 + c[4] T^5` and the
/// matching entropy `s(T) = c[0] ln T + 2 c[1] T + 3/2 c[2] T^2 +
/// 4/3 c[3] T^3 + 5/4 c[4] T^4 + c[5]`, with `c[5]` the entropy constant.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeatPolynomial {
    pub c: [f64; 6],
}

impl HeatPolynomial {
    /// Enthalpy and its first temperature derivative at `t`.
    pub fn enthalpy(&self, t: f64) -> (f64, f64) {
        let c = &self.c;
        let h = t * (c[0] + t * (c[1] + t * (c[2] + t * (c[3] + t * c[4]))));
        let dh = c[0] + t * (2.0 * c[1] + t * (3.0 * c[2] + t * (4.0 * c[3] + t * 5.0 * c[4])));
        (h, dh)
    }

    /// Entropy and its first temperature derivative at `t`.
    pub fn entropy(&self, t: f64) -> (f64, f64) {
        let c = &self.c;
        let s = c[0] * t.ln()
            + 2.0 * c[1] * t
            + 1.5 * c[2] * t * t
            + (4.0 / 3.0) * c[3] * t.powi(3)
            + 1.25 * c[4] * t.powi(4)
            + c[5];
        let ds = c[0] / t + 2.0 * c[1] + 3.0 * c[2] * t + 4.0 * c[3] * t * t + 5.0 * c[4] * t.powi(3);
        (s, ds)
    }
}

/// One mixture component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    pub name: String,
    /// kg/kmol
    pub molecular_weight: f64,
    /// Engine pressure units
    pub critical_pressure: f64,
    /// Engine temperature units
    pub critical_temperature: f64,
    /// Engine molar-volume units
    pub critical_volume: f64,
    /// Macleod–Sugden parachor
    pub parachor: f64,
    /// Required by the SRK/PR family, unused by tabulated/ideal methods
    pub acentric_factor: Option<f64>,
    /// Reference-state heat polynomial; absent means no ideal enthalpy part
    pub heat: Option<HeatPolynomial>,
    /// Salt components participate in brine molecular weight only
    pub is_salt: bool,
}

impl Component {
    /// Minimal constructor for the common case.
    pub fn new(name: impl Into<String>, mw: f64, pc: f64, tc: f64, vc: f64) -> Self {
        Self {
            name: name.into(),
            molecular_weight: mw,
            critical_pressure: pc,
            critical_temperature: tc,
            critical_volume: vc,
            parachor: 0.0,
            acentric_factor: None,
            heat: None,
            is_salt: false,
        }
    }

    pub fn with_acentric(mut self, omega: f64) -> Self {
        self.acentric_factor = Some(omega);
        self
    }

    pub fn with_parachor(mut self, parachor: f64) -> Self {
        self.parachor = parachor;
        self
    }

    pub fn with_heat(mut self, heat: HeatPolynomial) -> Self {
        self.heat = Some(heat);
        self
    }
}

/// Fixed set of N components, stored structure-of-arrays for the kernels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentSet {
    names: Vec<String>,
    molecular_weight: Vec<f64>,
    critical_pressure: Vec<f64>,
    critical_temperature: Vec<f64>,
    critical_volume: Vec<f64>,
    parachor: Vec<f64>,
    acentric_factor: Vec<Option<f64>>,
    heat: Vec<Option<HeatPolynomial>>,
    is_salt: Vec<bool>,
    /// Molecular weights of salts; a negative entry is interpreted as a
    /// salinity in ppm instead of a molecular weight.
    salt_molecular_weight: Vec<f64>,
}

impl ComponentSet {
    /// Validate and pack a component list.
    ///
    /// Every molecular weight and critical property must be finite and
    /// strictly positive; parachors must be finite and non-negative.
    pub fn new(components: Vec<Component>) -> CoreResult<Self> {
        if components.is_empty() {
            return Err(CoreError::InvalidArg {
                what: "empty component set",
            });
        }
        for c in &components {
            for (v, what) in [
                (c.molecular_weight, "molecular weight"),
                (c.critical_pressure, "critical pressure"),
                (c.critical_temperature, "critical temperature"),
                (c.critical_volume, "critical volume"),
            ] {
                if !v.is_finite() {
                    return Err(CoreError::NonFinite { what, value: v });
                }
                if v <= 0.0 {
                    return Err(CoreError::NonPhysical { what });
                }
            }
            if !c.parachor.is_finite() || c.parachor < 0.0 {
                return Err(CoreError::NonPhysical { what: "parachor" });
            }
            if let Some(w) = c.acentric_factor {
                if !w.is_finite() {
                    return Err(CoreError::NonFinite {
                        what: "acentric factor",
                        value: w,
                    });
                }
            }
        }

        let n = components.len();
        let mut set = Self {
            names: Vec::with_capacity(n),
            molecular_weight: Vec::with_capacity(n),
            critical_pressure: Vec::with_capacity(n),
            critical_temperature: Vec::with_capacity(n),
            critical_volume: Vec::with_capacity(n),
            parachor: Vec::with_capacity(n),
            acentric_factor: Vec::with_capacity(n),
            heat: Vec::with_capacity(n),
            is_salt: Vec::with_capacity(n),
            salt_molecular_weight: Vec::new(),
        };
        for c in components {
            set.names.push(c.name);
            set.molecular_weight.push(c.molecular_weight);
            set.critical_pressure.push(c.critical_pressure);
            set.critical_temperature.push(c.critical_temperature);
            set.critical_volume.push(c.critical_volume);
            set.parachor.push(c.parachor);
            set.acentric_factor.push(c.acentric_factor);
            set.heat.push(c.heat);
            set.is_salt.push(c.is_salt);
        }
        Ok(set)
    }

    /// Attach salt molecular weights (negative entry = salinity in ppm).
    pub fn with_salt_molecular_weights(mut self, salts: Vec<f64>) -> Self {
        self.salt_molecular_weight = salts;
        self
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    pub fn molecular_weights(&self) -> &[f64] {
        &self.molecular_weight
    }

    pub fn critical_pressures(&self) -> &[f64] {
        &self.critical_pressure
    }

    pub fn critical_temperatures(&self) -> &[f64] {
        &self.critical_temperature
    }

    pub fn critical_volumes(&self) -> &[f64] {
        &self.critical_volume
    }

    pub fn parachors(&self) -> &[f64] {
        &self.parachor
    }

    pub fn acentric_factor(&self, i: usize) -> Option<f64> {
        self.acentric_factor[i]
    }

    pub fn heat(&self, i: usize) -> Option<&HeatPolynomial> {
        self.heat[i].as_ref()
    }

    pub fn has_heat_data(&self) -> bool {
        self.heat.iter().any(|h| h.is_some())
    }

    pub fn is_salt(&self, i: usize) -> bool {
        self.is_salt[i]
    }

    pub fn salt_molecular_weights(&self) -> &[f64] {
        &self.salt_molecular_weight
    }

    /// Salinity in ppm encoded in the salt block, if any entry uses the
    /// negative-value convention.
    pub fn encoded_salinity(&self) -> Option<f64> {
        self.salt_molecular_weight
            .iter()
            .find(|&&mw| mw < 0.0)
            .map(|mw| -mw)
    }

    /// Effective brine molecular weight for the aqueous-phase collaborator,
    /// kg/kmol. With a salinity (ppm by mass) the dissolved salt raises the
    /// apparent weight of pure water; explicit salt molecular weights are
    /// handled by the caller through [`Self::salt_molecular_weights`].
    pub fn brine_molecular_weight(&self, salinity_ppm: f64) -> f64 {
        const WATER_MW: f64 = 18.015_34;
        WATER_MW / (1.0 - 1.0e-6 * salinity_ppm).max(1.0e-6)
    }

    /// Mixture molar mass of a composition over this set, kg/kmol.
    pub fn mixture_molecular_weight(&self, x: &[f64]) -> f64 {
        self.molecular_weight
            .iter()
            .zip(x)
            .map(|(mw, xi)| mw * xi)
            .sum()
    }
}
