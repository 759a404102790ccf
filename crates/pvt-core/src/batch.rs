//! Borrowed batch views and per-object validation.
//!
//! A batch call evaluates M independent objects, each a (P, T, composition)
//! triple. The kernels themselves never validate; preconditions are checked
//! once per batch here and reported as per-object status flags, so degenerate
//! objects propagate NaN through branch-free inner loops instead of aborting
//! the whole call.

use crate::error::{CoreError, CoreResult};

/// Borrowed state for one batch of M objects over N components.
///
/// `composition` is row-major: object `i` occupies
/// `composition[i * n .. (i + 1) * n]`.
#[derive(Debug, Clone, Copy)]
pub struct BatchState<'a> {
    pub pressure: &'a [f64],
    pub temperature: &'a [f64],
    pub composition: &'a [f64],
    n_components: usize,
}

impl<'a> BatchState<'a> {
    pub fn new(
        pressure: &'a [f64],
        temperature: &'a [f64],
        composition: &'a [f64],
        n_components: usize,
    ) -> CoreResult<Self> {
        let m = pressure.len();
        if temperature.len() != m {
            return Err(CoreError::LengthMismatch {
                what: "temperature",
                expected: m,
                got: temperature.len(),
            });
        }
        if n_components == 0 {
            return Err(CoreError::InvalidArg {
                what: "zero components",
            });
        }
        if composition.len() != m * n_components {
            return Err(CoreError::LengthMismatch {
                what: "composition",
                expected: m * n_components,
                got: composition.len(),
            });
        }
        Ok(Self {
            pressure,
            temperature,
            composition,
            n_components,
        })
    }

    /// Number of objects M.
    pub fn len(&self) -> usize {
        self.pressure.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressure.is_empty()
    }

    /// Number of components N.
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Composition row of one object.
    pub fn composition_of(&self, object: usize) -> &'a [f64] {
        let n = self.n_components;
        &self.composition[object * n..(object + 1) * n]
    }
}

/// Outcome of the once-per-batch precondition check for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectStatus {
    #[default]
    Ok,
    NonFiniteInput,
    NonPositivePressure,
    NonPositiveTemperature,
    UnnormalizedComposition,
}

impl ObjectStatus {
    pub fn is_ok(self) -> bool {
        self == ObjectStatus::Ok
    }
}

/// Check P > 0, T > 0, finiteness and composition normalization for every
/// object; returns one status per object. `composition_tol` bounds
/// `|sum(x) - 1|`.
pub fn validate_batch(batch: &BatchState<'_>, composition_tol: f64) -> Vec<ObjectStatus> {
    let mut statuses = vec![ObjectStatus::Ok; batch.len()];
    for (i, status) in statuses.iter_mut().enumerate() {
        let p = batch.pressure[i];
        let t = batch.temperature[i];
        let x = batch.composition_of(i);
        if !p.is_finite() || !t.is_finite() || x.iter().any(|v| !v.is_finite()) {
            *status = ObjectStatus::NonFiniteInput;
        } else if p <= 0.0 {
            *status = ObjectStatus::NonPositivePressure;
        } else if t <= 0.0 {
            *status = ObjectStatus::NonPositiveTemperature;
        } else {
            let sum: f64 = x.iter().sum();
            if (sum - 1.0).abs() > composition_tol {
                *status = ObjectStatus::UnnormalizedComposition;
            }
        }
    }
    statuses
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalized_compositions_validate(fracs in prop::collection::vec(1e-6_f64..1.0, 1..6)) {
            let sum: f64 = fracs.iter().sum();
            let x: Vec<f64> = fracs.iter().map(|f| f / sum).collect();
            let p = [1.0e5];
            let t = [300.0];
            let batch = BatchState::new(&p, &t, &x, x.len()).unwrap();
            prop_assert_eq!(validate_batch(&batch, 1e-9)[0], ObjectStatus::Ok);
        }
    }
}
