// src/pipeline.rs
//! End-to-end run: prices -> calibration -> option prices.
//!
//! The model is calibrated from the first price of the series and the option
//! is priced at the last one. Calibration and pricing draw from separate
//! child streams of the configured seed.

use crate::analytics::bs_analytic::black_scholes_spec;
use crate::analytics::jump_adjusted::black_scholes_with_jumps;
use crate::calibration::calibrator::{
    aggregate_runs, AggregateCalibration, CalibrationProblem, CalibrationResult, Calibrator,
};
use crate::calibration::optimizer::{DifferentialEvolution, GlobalMinimizer};
use crate::config::{EngineConfig, PricingConfig, PricingMethods};
use crate::error::{JumpError, JumpResult};
use crate::market::loader::PriceSeries;
use crate::market::returns::initial_guess;
use crate::mc::mc_engine::{monte_carlo_price, MonteCarloEstimate};
use crate::models::option::{OptionSpec, OptionType};
use crate::models::params::{AnnualizedParameters, ModelParameters};
use crate::rng::RngFactory;
use tracing::{info, warn};

const CALIBRATION_STREAM: u64 = 0;
const PRICING_STREAM: u64 = 1;

/// Contract to price at the end of the series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingRequest {
    pub strike: f64,
    pub maturity_years: f64,
    pub option_type: OptionType,
}

/// One price per requested method
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PricingResult {
    pub black_scholes: Option<f64>,
    pub jump_adjusted: Option<f64>,
    pub monte_carlo: Option<MonteCarloEstimate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Moment estimate; `None` when the series is too short to compute it
    pub initial_guess: Option<ModelParameters>,
    pub runs: Vec<CalibrationResult>,
    pub calibration: AggregateCalibration,
    pub annualized: AnnualizedParameters,
    pub option: OptionSpec,
    pub prices: PricingResult,
}

/// Price `spec` with every method in `pricing.methods`
///
/// `params` are daily; the analytic methods use their annualized form.
pub fn price_all(
    spec: &OptionSpec,
    params: &ModelParameters,
    r_daily: f64,
    pricing: &PricingConfig,
    rng_factory: &RngFactory,
) -> JumpResult<PricingResult> {
    spec.validate()?;
    params.validate()?;
    let annual = params.annualize(r_daily);
    let mut result = PricingResult::default();

    if pricing.methods.contains(PricingMethods::BLACK_SCHOLES) {
        let price = black_scholes_spec(spec, annual.r, annual.sigma);
        info!(price, "Black-Scholes");
        result.black_scholes = Some(price);
    }
    if pricing.methods.contains(PricingMethods::JUMP_ADJUSTED) {
        let price =
            black_scholes_with_jumps(spec, &annual, pricing.jump_repetitions, &rng_factory.child(0))?;
        info!(price, repetitions = pricing.jump_repetitions, "jump-adjusted Black-Scholes");
        result.jump_adjusted = Some(price);
    }
    if pricing.methods.contains(PricingMethods::MONTE_CARLO) {
        let estimate = monte_carlo_price(
            spec,
            r_daily,
            annual.r,
            params,
            pricing.mc_paths,
            &rng_factory.child(1),
        )?;
        info!(
            price = estimate.price,
            standard_error = estimate.standard_error,
            paths = estimate.paths,
            "Monte Carlo"
        );
        result.monte_carlo = Some(estimate);
    }
    Ok(result)
}

/// Calibrate with differential evolution and price the request
pub fn run_pipeline(
    series: &PriceSeries,
    request: &PricingRequest,
    config: &EngineConfig,
) -> JumpResult<PipelineReport> {
    let calibrator = Calibrator::new(DifferentialEvolution::new(config.optimizer));
    run_pipeline_with(&calibrator, series, request, config)
}

pub fn run_pipeline_with<M: GlobalMinimizer>(
    calibrator: &Calibrator<M>,
    series: &PriceSeries,
    request: &PricingRequest,
    config: &EngineConfig,
) -> JumpResult<PipelineReport> {
    config.validate()?;
    let (s0, spot) = match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => (first, last),
        _ => {
            return Err(JumpError::DataError {
                origin: "price series".to_string(),
                reason: format!("need at least 2 prices, got {}", series.len()),
            })
        }
    };
    let option = OptionSpec::new(spot, request.strike, request.maturity_years, request.option_type);
    option.validate()?;

    let returns = series.log_returns();
    let guess = match initial_guess(&returns, config.calibration.jump_threshold_sigmas) {
        Ok(guess) => {
            info!(
                sigma = guess.sigma,
                lambda = guess.lambda,
                mu_j = guess.mu_j,
                sigma_j = guess.sigma_j,
                "initial guess"
            );
            Some(guess)
        }
        Err(err) if config.calibration.use_initial_guess => return Err(err),
        Err(err) => {
            warn!(error = %err, "initial guess unavailable; calibrating without it");
            None
        }
    };

    let r_daily = config.calibration.risk_free_daily;
    let mut problem = CalibrationProblem::new(returns, s0, r_daily, config.calibration.num_paths);
    if config.calibration.use_initial_guess {
        if let Some(guess) = guess {
            problem = problem.with_initial_guess(guess);
        }
    }

    let factory = RngFactory::new(config.seed);
    let runs = calibrator.calibrate_multiple(
        &problem,
        config.calibration.num_runs,
        &factory.child(CALIBRATION_STREAM),
    )?;
    let calibration = aggregate_runs(&runs)?;
    let p = calibration.parameters;
    info!(
        sigma = p.sigma,
        lambda = p.lambda,
        mu_j = p.mu_j,
        sigma_j = p.sigma_j,
        mse = calibration.mean_objective,
        successful = calibration.successful_runs,
        runs = calibration.total_runs,
        "average calibrated parameters"
    );

    let annualized = p.annualize(r_daily);
    let prices = price_all(
        &option,
        &p,
        r_daily,
        &config.pricing,
        &factory.child(PRICING_STREAM),
    )?;

    Ok(PipelineReport {
        initial_guess: guess,
        runs,
        calibration,
        annualized,
        option,
        prices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_all_respects_method_selection() {
        let spec = OptionSpec::new(100.0, 100.0, 0.5, OptionType::Call);
        let params = ModelParameters::new(0.0125, 0.01, 0.0, 0.01);
        let pricing = PricingConfig {
            mc_paths: 1_000,
            jump_repetitions: 50,
            methods: PricingMethods::BLACK_SCHOLES | PricingMethods::JUMP_ADJUSTED,
        };
        let result = price_all(&spec, &params, 0.0002, &pricing, &RngFactory::new(1)).unwrap();
        assert!(result.black_scholes.is_some());
        assert!(result.jump_adjusted.is_some());
        assert!(result.monte_carlo.is_none());
    }

    #[test]
    fn test_price_all_rejects_invalid_parameters() {
        let spec = OptionSpec::new(100.0, 100.0, 0.5, OptionType::Put);
        let params = ModelParameters::new(0.0, 0.01, 0.0, 0.01);
        let pricing = PricingConfig::default();
        assert!(price_all(&spec, &params, 0.0002, &pricing, &RngFactory::new(1)).is_err());
    }
}
