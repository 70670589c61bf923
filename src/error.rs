// src/error.rs
use thiserror::Error;

/// Error type for the jump-sde library
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JumpError {
    /// Invalid parameter values
    #[error("Invalid parameter '{parameter}' = {value}: {constraint}")]
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Option type other than call or put
    #[error("Invalid option type '{0}': must be 'call' or 'put'")]
    InvalidOptionType(String),

    /// Invalid configuration
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// Numerical instability or non-finite results
    #[error("Numerical instability in {method}: {reason}")]
    NumericalInstability { method: String, reason: String },

    /// Optimizer could not be set up or run
    #[error("Calibration failed: {reason}")]
    CalibrationError { reason: String },

    /// Every calibration run failed to converge
    #[error("No successful calibration runs out of {runs}; cannot compute average parameters")]
    NoSuccessfulCalibration { runs: usize },

    /// Missing or unreadable market data
    #[error("Market data error ({origin}): {reason}")]
    DataError { origin: String, reason: String },
}

/// Result type alias for jump-sde operations
pub type JumpResult<T> = Result<T, JumpError>;

/// Validation utilities
pub mod validation {
    use super::{JumpError, JumpResult};

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> JumpResult<()> {
        // NaN fails the comparison and is rejected here too
        if !(value > 0.0) {
            Err(JumpError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> JumpResult<()> {
        if !(value >= 0.0) {
            Err(JumpError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is within a closed range
    pub fn validate_range(name: &str, value: f64, min: f64, max: f64) -> JumpResult<()> {
        if !(value >= min && value <= max) {
            Err(JumpError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: format!("must be in range [{}, {}]", min, max),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> JumpResult<()> {
        if !value.is_finite() {
            Err(JumpError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate a simulation path count
    pub fn validate_paths(field: &str, paths: usize) -> JumpResult<()> {
        if paths == 0 {
            Err(JumpError::InvalidConfiguration {
                field: field.to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else if paths > 1_000_000_000 {
            Err(JumpError::InvalidConfiguration {
                field: field.to_string(),
                reason: "exceeds maximum allowed (1 billion)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate a time step count
    pub fn validate_steps(field: &str, steps: usize) -> JumpResult<()> {
        if steps == 0 {
            Err(JumpError::InvalidConfiguration {
                field: field.to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else if steps > 100_000 {
            Err(JumpError::InvalidConfiguration {
                field: field.to_string(),
                reason: "exceeds maximum allowed (100,000)".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive("sigma", 0.2).is_ok());
        assert!(validate_positive("sigma", 0.0).is_err());
        assert!(validate_positive("sigma", -0.1).is_err());
        assert!(validate_positive("sigma", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("mu_j", 0.5, -0.5, 0.5).is_ok());
        assert!(validate_range("mu_j", -0.5, -0.5, 0.5).is_ok());
        assert!(validate_range("mu_j", 0.51, -0.5, 0.5).is_err());
        assert!(validate_range("mu_j", f64::NAN, -0.5, 0.5).is_err());
    }

    #[test]
    fn test_validate_finite() {
        assert!(validate_finite("value", 1.0).is_ok());
        assert!(validate_finite("value", f64::NAN).is_err());
        assert!(validate_finite("value", f64::INFINITY).is_err());
        assert!(validate_finite("value", f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_validate_counts() {
        assert!(validate_paths("num_paths", 1).is_ok());
        assert!(validate_paths("num_paths", 0).is_err());
        assert!(validate_steps("num_steps", 252).is_ok());
        assert!(validate_steps("num_steps", 0).is_err());
        assert!(validate_steps("num_steps", 100_001).is_err());
    }

    #[test]
    fn test_error_display() {
        let error = JumpError::InvalidParameters {
            parameter: "sigma".to_string(),
            value: -0.1,
            constraint: "must be positive".to_string(),
        };

        let display = format!("{}", error);
        assert!(display.contains("sigma"));
        assert!(display.contains("-0.1"));
        assert!(display.contains("positive"));
    }

    #[test]
    fn test_no_successful_calibration_display() {
        let error = JumpError::NoSuccessfulCalibration { runs: 3 };
        let display = error.to_string();
        assert!(display.contains("No successful calibration"));
        assert!(display.contains('3'));
    }
}
