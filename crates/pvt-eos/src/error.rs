//! Equation-of-state configuration errors.
//!
//! Batch evaluation itself never errors: degenerate per-object inputs
//! propagate NaN and are reported through the per-object status flags.
//! Everything that can go wrong at construction time is typed here.

use pvt_core::CoreError;
use thiserror::Error;

pub type EosResult<T> = Result<T, EosError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EosError {
    #[error("Invalid configuration: {what}")]
    Config { what: &'static str },

    #[error("Component {index} is missing {what} required by the selected method")]
    MissingComponentData { index: usize, what: &'static str },

    #[error("Coefficient table: {what}")]
    Table { what: &'static str },

    #[error("Length mismatch for {what} (expected {expected}, got {got})")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}
