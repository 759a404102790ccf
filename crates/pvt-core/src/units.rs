//! Unit-conversion factor sets.
//!
//! The engine works in whatever units the caller constructed it with; each
//! factor converts one engine-unit value to SI. The named constructors build
//! the common systems from `uom` so the factors stay traceable to real unit
//! definitions instead of loose literals.

use uom::si::f64::{Pressure, ThermodynamicTemperature};
use uom::si::pressure::{pascal, pound_force_per_square_inch};
use uom::si::thermodynamic_temperature::{degree_rankine, kelvin};

/// Universal gas constant in SI, J/(kmol K). kmol basis to match the
/// kg/kmol molecular weights carried by [`crate::ComponentSet`].
pub const GAS_CONSTANT_SI: f64 = 8_314.462_618;

/// Standard gravity, m/s^2.
pub const GRAVITY_SI: f64 = 9.806_65;

/// Multiplicative factors taking engine-unit values to SI.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitSet {
    /// engine pressure -> Pa
    pub pressure: f64,
    /// engine temperature -> K (scale only; absolute temperatures assumed)
    pub temperature: f64,
    /// engine molar volume -> m^3/kmol
    pub volume: f64,
    /// engine viscosity -> Pa s
    pub viscosity: f64,
    /// engine density -> kg/m^3
    pub density: f64,
    /// engine molar enthalpy -> J/kmol
    pub enthalpy: f64,
    /// engine interfacial tension -> N/m
    pub tension: f64,
}

impl UnitSet {
    /// Straight SI: every factor is one.
    pub fn si() -> Self {
        Self {
            pressure: 1.0,
            temperature: 1.0,
            volume: 1.0,
            viscosity: 1.0,
            density: 1.0,
            enthalpy: 1.0,
            tension: 1.0,
        }
    }

    /// Oil-field units: psia, degrees Rankine, ft^3/lb-mol, centipoise,
    /// lb/ft^3, BTU/lb-mol, dyne/cm.
    pub fn field() -> Self {
        let psi_to_pa = Pressure::new::<pound_force_per_square_inch>(1.0).get::<pascal>();
        let rankine_to_k =
            ThermodynamicTemperature::new::<degree_rankine>(1.0).get::<kelvin>();
        Self {
            pressure: psi_to_pa,
            temperature: rankine_to_k,
            // ft^3/lb-mol -> m^3/kmol
            volume: 0.028_316_846_592 / 0.453_592_37,
            // cp -> Pa s
            viscosity: 1.0e-3,
            // lb/ft^3 -> kg/m^3
            density: 0.453_592_37 / 0.028_316_846_592,
            // BTU/lb-mol -> J/kmol
            enthalpy: 1_055.055_852_62 / 0.453_592_37,
            // dyne/cm -> N/m
            tension: 1.0e-3,
        }
    }

    /// Gas constant expressed in engine units, so that `P V = Z R T` holds
    /// with engine-unit pressure, molar volume and temperature.
    pub fn gas_constant(&self) -> f64 {
        GAS_CONSTANT_SI * self.temperature / (self.pressure * self.volume)
    }

    /// Standard gravity in engine units (pressure per density per length in
    /// SI collapses to the plain SI constant when all factors are one).
    pub fn gravity(&self) -> f64 {
        GRAVITY_SI * self.density / self.pressure
    }
}

impl Default for UnitSet {
    fn default() -> Self {
        Self::si()
    }
}
