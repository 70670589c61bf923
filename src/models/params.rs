// src/models/params.rs
//! Merton jump-diffusion parameter sets.
//!
//! Calibration works in daily units (one simulation step per trading day);
//! the analytic pricers work in annual units. [`ModelParameters::annualize`]
//! is the only place the two meet.

use crate::error::{validation::*, JumpResult};
use crate::math_utils::TRADING_DAYS;
use serde::{Deserialize, Serialize};

/// Number of calibrated coordinates, in the order `[sigma, lambda, mu_j, sigma_j]`
pub const PARAM_COUNT: usize = 4;

/// Daily jump-diffusion parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub sigma: f64,   // Diffusion volatility
    pub lambda: f64,  // Jump intensity
    pub mu_j: f64,    // Mean of log-jump size
    pub sigma_j: f64, // Std dev of log-jump size
}

impl ModelParameters {
    pub fn new(sigma: f64, lambda: f64, mu_j: f64, sigma_j: f64) -> Self {
        Self {
            sigma,
            lambda,
            mu_j,
            sigma_j,
        }
    }

    pub fn validate(&self) -> JumpResult<()> {
        validate_positive("sigma", self.sigma)?;
        validate_non_negative("lambda", self.lambda)?;
        validate_finite("mu_j", self.mu_j)?;
        validate_positive("sigma_j", self.sigma_j)?;
        Ok(())
    }

    /// Jump compensator `m = E[e^J] - 1 = exp(mu_j + sigma_j²/2) - 1`
    pub fn jump_compensator(&self) -> f64 {
        jump_compensator(self.mu_j, self.sigma_j)
    }

    pub fn to_array(&self) -> [f64; PARAM_COUNT] {
        [self.sigma, self.lambda, self.mu_j, self.sigma_j]
    }

    /// Build from an optimizer vector. Panics if `x` is shorter than [`PARAM_COUNT`].
    pub fn from_slice(x: &[f64]) -> Self {
        Self::new(x[0], x[1], x[2], x[3])
    }

    /// Convert daily parameters to annual ones together with a daily rate
    pub fn annualize(&self, r_daily: f64) -> AnnualizedParameters {
        let sqrt_days = TRADING_DAYS.sqrt();
        AnnualizedParameters {
            r: r_daily * TRADING_DAYS,
            sigma: self.sigma * sqrt_days,
            lambda: self.lambda * TRADING_DAYS,
            mu_j: self.mu_j * TRADING_DAYS,
            sigma_j: self.sigma_j * sqrt_days,
        }
    }
}

/// Annualized rate and jump-diffusion parameters used by the analytic pricers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnualizedParameters {
    pub r: f64,
    pub sigma: f64,
    pub lambda: f64,
    pub mu_j: f64,
    pub sigma_j: f64,
}

impl AnnualizedParameters {
    pub fn jump_compensator(&self) -> f64 {
        jump_compensator(self.mu_j, self.sigma_j)
    }
}

pub fn jump_compensator(mu_j: f64, sigma_j: f64) -> f64 {
    (mu_j + 0.5 * sigma_j * sigma_j).exp() - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_order() {
        let p = ModelParameters::new(0.02, 0.05, -0.01, 0.03);
        assert_eq!(p.to_array(), [0.02, 0.05, -0.01, 0.03]);
        assert_eq!(ModelParameters::from_slice(&p.to_array()), p);
    }

    #[test]
    fn test_validate() {
        assert!(ModelParameters::new(0.02, 0.0, 0.0, 0.01).validate().is_ok());
        assert!(ModelParameters::new(0.0, 0.1, 0.0, 0.01).validate().is_err());
        assert!(ModelParameters::new(0.02, -0.1, 0.0, 0.01).validate().is_err());
        assert!(ModelParameters::new(0.02, 0.1, 0.0, 0.0).validate().is_err());
        assert!(ModelParameters::new(0.02, 0.1, f64::NAN, 0.01).validate().is_err());
    }

    #[test]
    fn test_compensator_vanishes_without_jump_size() {
        assert_relative_eq!(jump_compensator(0.0, 0.0), 0.0);
        let m = jump_compensator(0.1, 0.2);
        assert_relative_eq!(m, (0.1f64 + 0.02).exp() - 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_annualize() {
        let p = ModelParameters::new(0.01, 0.02, 0.001, 0.03);
        let a = p.annualize(0.0002);
        assert_relative_eq!(a.r, 0.0504, epsilon = 1e-12);
        assert_relative_eq!(a.sigma, 0.01 * 252f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(a.lambda, 5.04, epsilon = 1e-12);
        assert_relative_eq!(a.mu_j, 0.252, epsilon = 1e-12);
        assert_relative_eq!(a.sigma_j, 0.03 * 252f64.sqrt(), epsilon = 1e-12);
    }
}
