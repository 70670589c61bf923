// src/math_utils.rs
use statrs::distribution::{Discrete, Poisson};
use statrs::function::erf;
use std::f64::consts::SQRT_2;

/// Trading days per year used for all daily/annual conversions
pub const TRADING_DAYS: f64 = 252.0;

/// Standard normal CDF Φ(x)
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf::erf(x / SQRT_2))
}

/// Poisson probability mass `P(N = k)` for `N ~ Poisson(rate)`.
///
/// A rate of exactly zero is a point mass at zero jumps. Negative or
/// non-finite rates have no mass anywhere and return NaN.
pub fn poisson_pmf(k: u64, rate: f64) -> f64 {
    if rate == 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    match Poisson::new(rate) {
        Ok(p) => p.pmf(k),
        Err(_) => f64::NAN,
    }
}

pub struct Timer {
    start_time: std::time::Instant,
}

impl Timer {
    pub fn new() -> Timer {
        Timer {
            start_time: std::time::Instant::now(),
        }
    }

    pub fn start(&mut self) {
        self.start_time = std::time::Instant::now();
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use statrs::distribution::{ContinuousCDF, Normal};

    #[test]
    fn test_norm_cdf_matches_statrs() {
        let standard = Normal::new(0.0, 1.0).unwrap();
        for &x in &[-3.0, -1.0, 0.0, 0.5, 2.0] {
            assert_relative_eq!(norm_cdf(x), standard.cdf(x), epsilon = 1e-12);
        }
        assert_relative_eq!(norm_cdf(0.0), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_poisson_pmf_zero_rate_is_point_mass() {
        assert_eq!(poisson_pmf(0, 0.0), 1.0);
        assert_eq!(poisson_pmf(1, 0.0), 0.0);
        assert_eq!(poisson_pmf(9, 0.0), 0.0);
    }

    #[test]
    fn test_poisson_pmf_values() {
        // P(N=2) for rate 1.5 = e^-1.5 * 1.5^2 / 2
        let expected = (-1.5f64).exp() * 1.5 * 1.5 / 2.0;
        assert_relative_eq!(poisson_pmf(2, 1.5), expected, epsilon = 1e-12);
        assert!(poisson_pmf(0, -1.0).is_nan());
    }
}
