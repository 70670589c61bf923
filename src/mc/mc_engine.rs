// src/mc/mc_engine.rs
use crate::error::{validation::*, JumpError, JumpResult};
use crate::math_utils::TRADING_DAYS;
use crate::mc::payoffs::Payoff;
use crate::models::merton::PathSimulator;
use crate::models::option::{OptionSpec, OptionType};
use crate::models::params::ModelParameters;
use crate::rng::RngFactory;
use rayon::prelude::*;
use tracing::debug;

/// Paths simulated per parallel batch; bounds the per-thread path matrix size
pub const DEFAULT_BATCH_PATHS: usize = 2_048;

#[derive(Clone, Debug)]
pub struct McConfig {
    pub paths: usize,
    pub r_daily: f64,
    pub r_annual: f64,
    pub params: ModelParameters,
    pub option: OptionSpec,
    pub seed: u64,
    pub batch_paths: usize,
}

impl McConfig {
    /// Validate the Monte Carlo configuration
    pub fn validate(&self) -> JumpResult<()> {
        validate_paths("paths", self.paths)?;
        validate_paths("batch_paths", self.batch_paths)?;
        validate_finite("r_daily", self.r_daily)?;
        validate_finite("r_annual", self.r_annual)?;
        self.params.validate()?;
        self.option.validate()?;
        Ok(())
    }

    /// One simulation step per trading day: `floor(252 · T)`
    ///
    /// Maturities under one trading day give zero steps, so `S_T` is the spot.
    pub fn steps(&self) -> usize {
        trading_steps(self.option.maturity_years)
    }
}

impl Default for McConfig {
    fn default() -> Self {
        McConfig {
            paths: 100_000,
            r_daily: 0.0002,
            r_annual: 0.0002 * TRADING_DAYS,
            params: ModelParameters::new(0.01, 0.05, 0.0, 0.02),
            option: OptionSpec::new(100.0, 100.0, 1.0, OptionType::Call),
            seed: 12345,
            batch_paths: DEFAULT_BATCH_PATHS,
        }
    }
}

/// Monte Carlo price with its sampling error
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonteCarloEstimate {
    pub price: f64,
    pub standard_error: f64,
    pub paths: usize,
    pub steps: usize,
}

pub fn trading_steps(maturity_years: f64) -> usize {
    (TRADING_DAYS * maturity_years).floor() as usize
}

/// Monte Carlo pricing for European options under Merton jump-diffusion
///
/// # Math Framework
///
/// Simulates daily jump-diffusion paths (`dt = 1` trading day, drift
/// `r_daily`) from the spot for `floor(252·T)` steps and discounts the
/// mean terminal payoff at the annual rate:
/// ```text
/// V = e^(-r_annual·T) · (1/n) Σ payoff(S_T^(i))
/// ```
///
/// # Parallelism
///
/// Paths are split into batches of [`McConfig::batch_paths`]; batch `b`
/// draws from substream `b` of the seed, so the estimate does not depend on
/// the number of rayon threads.
///
/// # Errors
///
/// Returns `JumpError` for:
/// - Invalid configuration parameters
/// - Non-finite price or variance estimates
pub fn mc_price_option_merton(cfg: &McConfig) -> JumpResult<MonteCarloEstimate> {
    cfg.validate()?;
    price_batched(
        &cfg.option,
        cfg.r_daily,
        cfg.r_annual,
        &cfg.params,
        cfg.paths,
        cfg.batch_paths,
        &RngFactory::new(cfg.seed),
    )
}

/// Monte Carlo price with explicit inputs and random source
pub fn monte_carlo_price(
    option: &OptionSpec,
    r_daily: f64,
    r_annual: f64,
    params: &ModelParameters,
    num_simulations: usize,
    rng_factory: &RngFactory,
) -> JumpResult<MonteCarloEstimate> {
    let cfg = McConfig {
        paths: num_simulations,
        r_daily,
        r_annual,
        params: *params,
        option: *option,
        seed: rng_factory.base_seed(),
        batch_paths: DEFAULT_BATCH_PATHS,
    };
    cfg.validate()?;
    price_batched(
        option,
        r_daily,
        r_annual,
        params,
        num_simulations,
        DEFAULT_BATCH_PATHS,
        rng_factory,
    )
}

fn price_batched(
    option: &OptionSpec,
    r_daily: f64,
    r_annual: f64,
    params: &ModelParameters,
    n: usize,
    batch_paths: usize,
    rng_factory: &RngFactory,
) -> JumpResult<MonteCarloEstimate> {
    let steps = trading_steps(option.maturity_years);
    let simulator = PathSimulator::new(option.spot, r_daily, *params);
    let payoff = Payoff::from_spec(option);
    let batches = (n + batch_paths - 1) / batch_paths;

    debug!(paths = n, steps, batches, "Monte Carlo pricing");

    let partials: Vec<(f64, f64)> = (0..batches)
        .into_par_iter()
        .map(|b| {
            let batch_len = batch_paths.min(n - b * batch_paths);
            let mut rng = rng_factory.substream(b as u64);
            let paths = simulator.simulate(steps, batch_len, &mut rng);
            payoff.accumulate(paths.terminal_prices())
        })
        .collect();
    let (sum_payoff, sum_payoff_sq) = partials
        .iter()
        .fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));

    let discount = (-r_annual * option.maturity_years).exp();
    let mean_payoff = sum_payoff / n as f64;
    let mean_payoff_sq = sum_payoff_sq / n as f64;

    let price = discount * mean_payoff;
    let mut variance_of_estimate = if n > 1 {
        (mean_payoff_sq - mean_payoff * mean_payoff) * discount.powi(2) / (n as f64 - 1.0)
    } else {
        0.0
    };

    // Handle numerical precision issues that can cause negative variance
    if variance_of_estimate < 0.0 {
        if variance_of_estimate > -1e-10 {
            variance_of_estimate = 0.0;
        } else {
            return Err(JumpError::NumericalInstability {
                method: "Monte Carlo".to_string(),
                reason: format!(
                    "Variance estimate became significantly negative: {}",
                    variance_of_estimate
                ),
            });
        }
    }

    if !price.is_finite() {
        return Err(JumpError::NumericalInstability {
            method: "Monte Carlo".to_string(),
            reason: format!("Price estimate is not finite: {}", price),
        });
    }

    if !variance_of_estimate.is_finite() {
        return Err(JumpError::NumericalInstability {
            method: "Monte Carlo".to_string(),
            reason: format!("Variance estimate is not finite: {}", variance_of_estimate),
        });
    }

    Ok(MonteCarloEstimate {
        price,
        standard_error: variance_of_estimate.sqrt(),
        paths: n,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_follow_trading_calendar() {
        assert_eq!(trading_steps(1.0), 252);
        assert_eq!(trading_steps(0.5), 126);
        assert_eq!(trading_steps(0.001), 0);
    }

    #[test]
    fn test_sub_day_maturity_prices_discounted_intrinsic() {
        let cfg = McConfig {
            paths: 500,
            option: OptionSpec::new(100.0, 90.0, 0.002, OptionType::Call),
            ..Default::default()
        };
        let est = mc_price_option_merton(&cfg).expect("Valid configuration");
        assert_eq!(est.steps, 0);
        let expected = (-cfg.r_annual * 0.002f64).exp() * 10.0;
        assert!((est.price - expected).abs() < 1e-12, "{} vs {}", est.price, expected);
        assert_eq!(est.standard_error, 0.0);
    }

    #[test]
    fn test_long_maturity_is_not_capped() {
        let cfg = McConfig {
            paths: 1,
            option: OptionSpec::new(100.0, 100.0, 400.0, OptionType::Put),
            ..Default::default()
        };
        assert_eq!(cfg.steps(), 100_800);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_reproducible_and_consistent_across_batching() {
        let base = McConfig {
            paths: 3_000,
            seed: 99,
            batch_paths: 3_000,
            ..Default::default()
        };
        let single = mc_price_option_merton(&base).expect("Valid configuration");
        let again = mc_price_option_merton(&base).expect("Valid configuration");
        assert_eq!(single, again);

        let batched = mc_price_option_merton(&McConfig {
            batch_paths: 1_000,
            ..base
        })
        .expect("Valid configuration");
        // Different batching draws different streams but estimates the same value
        let tolerance = 4.0 * (single.standard_error + batched.standard_error);
        assert!((single.price - batched.price).abs() < tolerance);
    }

    #[test]
    fn test_deep_itm_put_is_discounted_intrinsic() {
        let cfg = McConfig {
            paths: 2_000,
            params: ModelParameters::new(0.001, 0.0, 0.0, 0.01),
            option: OptionSpec::new(100.0, 200.0, 1.0, OptionType::Put),
            ..Default::default()
        };
        let est = mc_price_option_merton(&cfg).expect("Valid configuration");
        let forward = 100.0 * (cfg.r_daily * 252.0).exp();
        let expected = (-cfg.r_annual).exp() * (200.0 - forward);
        assert!((est.price - expected).abs() < 0.5, "{} vs {}", est.price, expected);
        assert_eq!(est.steps, 252);
    }
}
