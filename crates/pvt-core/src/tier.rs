//! Derivative request levels.
//!
//! Every batched routine receives one tier and skips the work the caller did
//! not ask for. The tiers are cumulative: requesting pressure derivatives
//! implies composition derivatives, and temperature implies both.

/// How many derivative families a batch call should produce.
///
/// Ordered so that `tier >= DerivativeTier::Pressure` reads as "pressure
/// derivatives (and everything below) are wanted". Each routine consults the
/// tier once, outside its per-object loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DerivativeTier {
    /// Values only.
    #[default]
    None,
    /// Values plus composition derivatives.
    Composition,
    /// Values plus composition and pressure derivatives.
    Pressure,
    /// Values plus composition, pressure and temperature derivatives.
    Temperature,
}

impl DerivativeTier {
    pub fn composition(self) -> bool {
        self >= DerivativeTier::Composition
    }

    pub fn pressure(self) -> bool {
        self >= DerivativeTier::Pressure
    }

    pub fn temperature(self) -> bool {
        self >= DerivativeTier::Temperature
    }
}
