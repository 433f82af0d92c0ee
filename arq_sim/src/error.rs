//! Error types for the simulation harness.

use arq_core::ArqError;
use arq_env::EnvError;
use thiserror::Error;

/// Rejected simulation parameters. Reported before any simulation state
/// exists.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A value that must be strictly positive
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    /// A value whose derived range does not fit in an `f64`
    #[error("{name} {value} is out of range")]
    OutOfRange { name: &'static str, value: f64 },

    /// Channel parameters
    #[error(transparent)]
    Channel(#[from] EnvError),

    /// Protocol parameters
    #[error(transparent)]
    Protocol(#[from] ArqError),
}

impl ConfigError {
    /// Checks that `value` is finite and greater than zero.
    pub fn check_positive(name: &'static str, value: f64) -> Result<f64, Self> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(Self::NotPositive { name, value })
        }
    }
}

/// Errors that stop a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Protocol failure: {0}")]
    Protocol(#[from] ArqError),

    #[error("Environment failure: {0}")]
    Env(#[from] EnvError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_positive() {
        assert_eq!(ConfigError::check_positive("interval", 2.5), Ok(2.5));
        assert!(ConfigError::check_positive("interval", 0.0).is_err());
        assert!(ConfigError::check_positive("interval", f64::INFINITY).is_err());
    }

    #[test]
    fn test_messages_name_the_parameter() {
        let err = ConfigError::check_positive("timeout", -1.0).unwrap_err();
        assert_eq!(err.to_string(), "timeout must be positive, got -1");
    }
}
