// src/calibration/calibrator.rs
//! Calibration of daily Merton parameters to a historical return series.
//!
//! # Objective
//!
//! For a candidate θ = (σ, λ, μ_J, σ_J) the simulated expected log-return path
//! is the cross-path mean of simulated log returns at every step:
//! ```text
//! ȓ_t(θ) = (1/M) Σ_i ln(S_{i,t+1} / S_{i,t})
//! MSE(θ) = (1/L) Σ_{t<L} (ȓ_t(θ) - r_t^hist)²      L = min(len ȓ, len r^hist)
//! ```
//! A non-finite ȓ (or an empty comparison) scores `+∞`, which rejects the
//! candidate without stopping the search.
//!
//! # Multi-run averaging
//!
//! Runs are independent global searches on distinct random streams. Only
//! converged runs enter the coordinate-wise mean.

use crate::calibration::optimizer::{
    BoxConstraints, DifferentialEvolution, GlobalMinimizer, TerminationReason,
};
use crate::error::{validation::*, JumpError, JumpResult};
use crate::models::merton::PathSimulator;
use crate::models::params::{ModelParameters, PARAM_COUNT};
use crate::rng::RngFactory;
use ndarray::s;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Search box in `[sigma, lambda, mu_j, sigma_j]` order
pub const PARAMETER_BOUNDS: [(f64, f64); PARAM_COUNT] =
    [(0.01, 2.0), (0.01, 1.0), (-0.5, 0.5), (0.01, 1.0)];

pub fn parameter_bounds() -> BoxConstraints {
    BoxConstraints {
        lower: PARAMETER_BOUNDS.iter().map(|b| b.0).collect(),
        upper: PARAMETER_BOUNDS.iter().map(|b| b.1).collect(),
    }
}

/// Mean squared error between simulated expected and historical log returns
#[allow(clippy::too_many_arguments)]
pub fn objective<R: Rng + ?Sized>(
    params: &ModelParameters,
    historical_log_returns: &[f64],
    s0: f64,
    r: f64,
    num_steps: usize,
    num_paths: usize,
    rng: &mut R,
) -> f64 {
    let paths = PathSimulator::new(s0, r, *params).simulate(num_steps, num_paths, rng);
    let expected = match paths.mean_log_returns() {
        Some(mean) => mean,
        None => return f64::INFINITY,
    };

    let len = expected.len().min(historical_log_returns.len());
    if len == 0 {
        return f64::INFINITY;
    }
    let expected = expected.slice(s![..len]);
    if expected.iter().any(|v| !v.is_finite()) {
        return f64::INFINITY;
    }

    expected
        .iter()
        .zip(&historical_log_returns[..len])
        .map(|(e, h)| (e - h).powi(2))
        .sum::<f64>()
        / len as f64
}

/// Inputs of one calibration
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationProblem {
    pub historical_log_returns: Vec<f64>,
    pub s0: f64,
    /// Daily risk-free rate
    pub r: f64,
    pub num_steps: usize,
    pub num_paths: usize,
    pub initial_guess: Option<ModelParameters>,
}

impl CalibrationProblem {
    /// One simulated step per historical return
    pub fn new(historical_log_returns: Vec<f64>, s0: f64, r: f64, num_paths: usize) -> Self {
        let num_steps = historical_log_returns.len();
        Self {
            historical_log_returns,
            s0,
            r,
            num_steps,
            num_paths,
            initial_guess: None,
        }
    }

    pub fn with_initial_guess(mut self, guess: ModelParameters) -> Self {
        self.initial_guess = Some(guess);
        self
    }

    pub fn validate(&self) -> JumpResult<()> {
        if self.historical_log_returns.is_empty() {
            return Err(JumpError::CalibrationError {
                reason: "no historical log returns to calibrate against".to_string(),
            });
        }
        if let Some(idx) = self.historical_log_returns.iter().position(|v| !v.is_finite()) {
            return Err(JumpError::CalibrationError {
                reason: format!("historical log return at index {idx} is not finite"),
            });
        }
        validate_positive("s0", self.s0)?;
        validate_finite("s0", self.s0)?;
        validate_finite("r", self.r)?;
        validate_steps("num_steps", self.num_steps)?;
        validate_paths("num_paths", self.num_paths)?;
        Ok(())
    }
}

/// Outcome of a single optimizer run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub parameters: ModelParameters,
    pub objective_value: f64,
    pub converged: bool,
    pub generations: usize,
    pub evaluations: usize,
    pub reason: TerminationReason,
}

/// Coordinate-wise mean over the converged runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateCalibration {
    pub parameters: ModelParameters,
    pub mean_objective: f64,
    pub successful_runs: usize,
    pub total_runs: usize,
}

/// Drives a [`GlobalMinimizer`] over [`PARAMETER_BOUNDS`]
#[derive(Debug, Clone)]
pub struct Calibrator<M: GlobalMinimizer = DifferentialEvolution> {
    minimizer: M,
    bounds: BoxConstraints,
}

impl Default for Calibrator<DifferentialEvolution> {
    fn default() -> Self {
        Self::new(DifferentialEvolution::default())
    }
}

impl<M: GlobalMinimizer> Calibrator<M> {
    pub fn new(minimizer: M) -> Self {
        Self {
            minimizer,
            bounds: parameter_bounds(),
        }
    }

    pub fn minimizer(&self) -> &M {
        &self.minimizer
    }

    pub fn bounds(&self) -> &BoxConstraints {
        &self.bounds
    }

    pub fn calibrate(
        &self,
        problem: &CalibrationProblem,
        rng_factory: &RngFactory,
    ) -> JumpResult<CalibrationResult> {
        problem.validate()?;
        let x0 = problem.initial_guess.map(|g| g.to_array());

        let outcome = self.minimizer.minimize(
            &self.bounds,
            x0.as_ref().map(|x| &x[..]),
            rng_factory,
            |x, rng| {
                objective(
                    &ModelParameters::from_slice(x),
                    &problem.historical_log_returns,
                    problem.s0,
                    problem.r,
                    problem.num_steps,
                    problem.num_paths,
                    rng,
                )
            },
        )?;

        if outcome.x.len() != PARAM_COUNT {
            return Err(JumpError::CalibrationError {
                reason: format!(
                    "optimizer returned {} coordinates, expected {PARAM_COUNT}",
                    outcome.x.len()
                ),
            });
        }

        Ok(CalibrationResult {
            parameters: ModelParameters::from_slice(&outcome.x),
            objective_value: outcome.objective,
            converged: outcome.converged,
            generations: outcome.generations,
            evaluations: outcome.evaluations,
            reason: outcome.reason,
        })
    }

    /// `num_runs` independent calibrations; run `i` uses child stream `i`
    pub fn calibrate_multiple(
        &self,
        problem: &CalibrationProblem,
        num_runs: usize,
        rng_factory: &RngFactory,
    ) -> JumpResult<Vec<CalibrationResult>> {
        if num_runs == 0 {
            return Err(JumpError::InvalidConfiguration {
                field: "num_runs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        let mut results = Vec::with_capacity(num_runs);
        for run in 0..num_runs {
            info!(run = run + 1, num_runs, "starting calibration run");
            let result = self.calibrate(problem, &rng_factory.child(run as u64))?;
            if result.converged {
                info!(
                    run = run + 1,
                    objective = result.objective_value,
                    generations = result.generations,
                    "calibration run converged"
                );
            } else {
                warn!(
                    run = run + 1,
                    generations = result.generations,
                    "calibration run did not converge; excluded from the average"
                );
            }
            results.push(result);
        }
        Ok(results)
    }
}

/// Average the converged runs
///
/// # Errors
///
/// [`JumpError::NoSuccessfulCalibration`] when no run converged.
pub fn aggregate_runs(results: &[CalibrationResult]) -> JumpResult<AggregateCalibration> {
    let successful: Vec<&CalibrationResult> = results.iter().filter(|r| r.converged).collect();
    if successful.is_empty() {
        return Err(JumpError::NoSuccessfulCalibration {
            runs: results.len(),
        });
    }

    let n = successful.len() as f64;
    let mut mean = [0.0; PARAM_COUNT];
    for result in &successful {
        for (acc, v) in mean.iter_mut().zip(result.parameters.to_array()) {
            *acc += v;
        }
    }
    mean.iter_mut().for_each(|v| *v /= n);
    let mean_objective = successful.iter().map(|r| r.objective_value).sum::<f64>() / n;

    Ok(AggregateCalibration {
        parameters: ModelParameters::from_slice(&mean),
        mean_objective,
        successful_runs: successful.len(),
        total_runs: results.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::optimizer::DifferentialEvolutionOptions;
    use crate::rng::seed_rng_from_u64;

    fn run(sigma: f64, objective_value: f64, converged: bool) -> CalibrationResult {
        CalibrationResult {
            parameters: ModelParameters::new(sigma, 0.1, 0.0, 0.05),
            objective_value,
            converged,
            generations: 10,
            evaluations: 100,
            reason: if converged {
                TerminationReason::Converged
            } else {
                TerminationReason::MaxIterations
            },
        }
    }

    #[test]
    fn test_bounds_match_parameter_order() {
        let b = parameter_bounds();
        assert_eq!(b.lower, vec![0.01, 0.01, -0.5, 0.01]);
        assert_eq!(b.upper, vec![2.0, 1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_objective_is_non_negative() {
        let hist = vec![0.001, -0.002, 0.0005, 0.003, -0.001];
        let params = ModelParameters::new(0.02, 0.1, 0.0, 0.03);
        let mut rng = seed_rng_from_u64(4);
        let mse = objective(&params, &hist, 100.0, 0.0002, hist.len(), 50, &mut rng);
        assert!(mse.is_finite());
        assert!(mse >= 0.0);
    }

    #[test]
    fn test_objective_truncates_to_shorter_series() {
        let params = ModelParameters::new(0.02, 0.1, 0.0, 0.03);
        let hist = vec![0.0; 3];
        let mut a = seed_rng_from_u64(8);
        let mut b = seed_rng_from_u64(8);
        // Historical values past the simulated horizon are ignored
        let short = objective(&params, &hist, 100.0, 0.0, 3, 20, &mut a);
        let long_hist = vec![0.0; 10];
        let same = objective(&params, &long_hist, 100.0, 0.0, 3, 20, &mut b);
        assert_eq!(short, same);
    }

    #[test]
    fn test_objective_sentinel() {
        let hist = vec![0.0; 5];
        let mut rng = seed_rng_from_u64(1);
        let nan_sigma = ModelParameters::new(f64::NAN, 0.1, 0.0, 0.0);
        assert_eq!(
            objective(&nan_sigma, &hist, 100.0, 0.0, 5, 10, &mut rng),
            f64::INFINITY
        );
        let ok = ModelParameters::new(0.02, 0.1, 0.0, 0.03);
        assert_eq!(objective(&ok, &[], 100.0, 0.0, 5, 10, &mut rng), f64::INFINITY);
        assert_eq!(objective(&ok, &hist, 100.0, 0.0, 0, 10, &mut rng), f64::INFINITY);
    }

    #[test]
    fn test_aggregate_uses_only_converged_runs() {
        let results = [run(0.1, 1.0, true), run(0.9, 5.0, false), run(0.3, 3.0, true)];
        let agg = aggregate_runs(&results).expect("two runs converged");
        assert!((agg.parameters.sigma - 0.2).abs() < 1e-15);
        assert!((agg.mean_objective - 2.0).abs() < 1e-15);
        assert_eq!(agg.successful_runs, 2);
        assert_eq!(agg.total_runs, 3);
    }

    #[test]
    fn test_aggregate_without_success_signals_no_result() {
        let results = [run(0.1, 1.0, false), run(0.2, 1.0, false)];
        assert_eq!(
            aggregate_runs(&results),
            Err(JumpError::NoSuccessfulCalibration { runs: 2 })
        );
        assert!(aggregate_runs(&[]).is_err());
    }

    #[test]
    fn test_problem_validation() {
        let p = CalibrationProblem::new(vec![], 100.0, 0.0002, 1);
        assert!(p.validate().is_err());
        let p = CalibrationProblem::new(vec![0.01, f64::NAN], 100.0, 0.0002, 1);
        assert!(p.validate().is_err());
        let p = CalibrationProblem::new(vec![0.01, -0.02], 100.0, 0.0002, 0);
        assert!(p.validate().is_err());
        let p = CalibrationProblem::new(vec![0.01, -0.02], 100.0, 0.0002, 1);
        assert!(p.validate().is_ok());
        assert_eq!(p.num_steps, 2);
    }

    #[test]
    fn test_short_run_stays_in_bounds() {
        let calibrator = Calibrator::new(DifferentialEvolution::new(DifferentialEvolutionOptions {
            population_multiplier: 3,
            max_generations: 5,
            workers: Some(2),
            ..Default::default()
        }));
        let hist: Vec<f64> = (0..15).map(|i| 0.002 * ((i % 3) as f64 - 1.0)).collect();
        let problem = CalibrationProblem::new(hist, 100.0, 0.0002, 10);
        let result = calibrator
            .calibrate(&problem, &RngFactory::new(11))
            .expect("valid problem");

        assert!(calibrator.bounds().contains(&result.parameters.to_array()));
        assert!(result.objective_value.is_finite());
        assert_eq!(result.evaluations, 12 * (result.generations + 1));
    }
}
