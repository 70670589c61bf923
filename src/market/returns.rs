// src/market/returns.rs
//! Return statistics of a historical price series.
//!
//! ```text
//! r_t      = ln(P_{t+1} / P_t)
//! jump_t   = |r_t| > k · std(r)
//! σ̂        = std(r)
//! λ̂        = #jumps / len(r)
//! μ̂_J, σ̂_J = mean, std of r restricted to flagged returns
//! ```
//! All standard deviations are sample (n - 1) estimates.

use crate::calibration::calibrator::PARAMETER_BOUNDS;
use crate::error::{JumpError, JumpResult};
use crate::models::params::ModelParameters;
use statrs::statistics::{Data, OrderStatistics, Statistics};
use tracing::warn;

/// Default jump threshold in standard deviations
pub const DEFAULT_JUMP_THRESHOLD: f64 = 2.0;

/// `ln(P_{t+1} / P_t)` for consecutive prices; empty for fewer than two prices
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// Flags returns whose magnitude exceeds `threshold_sigmas` sample standard deviations
pub fn identify_jumps(returns: &[f64], threshold_sigmas: f64) -> Vec<bool> {
    let sigma = returns.std_dev();
    let threshold = threshold_sigmas * sigma;
    returns.iter().map(|r| r.abs() > threshold).collect()
}

/// Keep values inside the `[lower_quantile, upper_quantile]` range, in order
pub fn filter_extremes(
    values: &[f64],
    lower_quantile: f64,
    upper_quantile: f64,
) -> JumpResult<Vec<f64>> {
    if values.is_empty() {
        return Ok(Vec::new());
    }
    if !(0.0..=1.0).contains(&lower_quantile)
        || !(0.0..=1.0).contains(&upper_quantile)
        || lower_quantile > upper_quantile
    {
        return Err(JumpError::InvalidConfiguration {
            field: "quantiles".to_string(),
            reason: format!("invalid quantile range [{lower_quantile}, {upper_quantile}]"),
        });
    }

    let mut data = Data::new(values.to_vec());
    let lower = data.quantile(lower_quantile);
    let upper = data.quantile(upper_quantile);
    Ok(values
        .iter()
        .copied()
        .filter(|v| *v >= lower && *v <= upper)
        .collect())
}

/// Moment-based starting point for the calibration search
///
/// With fewer than two flagged returns the jump moments are undefined; the
/// mean then falls back to zero and the jump volatility to the diffusion
/// volatility. Every coordinate is finally clamped into the search bounds.
pub fn initial_guess(returns: &[f64], threshold_sigmas: f64) -> JumpResult<ModelParameters> {
    if returns.len() < 2 {
        return Err(JumpError::DataError {
            origin: "log returns".to_string(),
            reason: format!("need at least 2 returns, got {}", returns.len()),
        });
    }

    let jumps = identify_jumps(returns, threshold_sigmas);
    let flagged: Vec<f64> = returns
        .iter()
        .zip(&jumps)
        .filter(|(_, is_jump)| **is_jump)
        .map(|(r, _)| *r)
        .collect();

    let sigma = returns.std_dev();
    let lambda = flagged.len() as f64 / returns.len() as f64;

    let (mu_j, sigma_j) = match flagged.len() {
        0 => {
            warn!("no jumps flagged; jump moments fall back to (0, sigma)");
            (0.0, sigma)
        }
        1 => {
            warn!("single jump flagged; jump volatility falls back to sigma");
            (flagged[0], sigma)
        }
        _ => ((&flagged).mean(), (&flagged).std_dev()),
    };

    let raw = [sigma, lambda, mu_j, sigma_j];
    let mut clamped = [0.0; 4];
    for (i, (value, (lo, hi))) in raw.iter().zip(PARAMETER_BOUNDS).enumerate() {
        clamped[i] = if value.is_finite() { value.clamp(lo, hi) } else { lo };
    }
    Ok(ModelParameters::from_slice(&clamped))
}
