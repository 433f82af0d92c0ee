//! Error types for the ARQ environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error, PartialEq)]
pub enum EnvError {
    /// A probability knob was set outside `[0, 1]` (or to NaN).
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    /// A propagation delay range that is empty, negative or not finite.
    #[error("Invalid delay range [{min}, {max})")]
    InvalidDelay { min: f64, max: f64 },
}

impl EnvError {
    /// Creates a probability error.
    pub fn probability(name: &'static str, value: f64) -> Self {
        Self::InvalidProbability { name, value }
    }

    /// Checks that `value` is a usable probability.
    pub fn check_probability(name: &'static str, value: f64) -> Result<f64, Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(Self::probability(name, value))
        }
    }
}
