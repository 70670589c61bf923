// tests/integration_test.rs
use jump_sde::calibration::calibrator::Calibrator;
use jump_sde::calibration::optimizer::{
    BoxConstraints, GlobalMinimizer, OptimisationResult, TerminationReason,
};
use jump_sde::config::{EngineConfig, PricingMethods};
use jump_sde::error::{JumpError, JumpResult};
use jump_sde::market::loader::{read_csv_prices, PriceSeries};
use jump_sde::models::merton::PathSimulator;
use jump_sde::models::option::OptionType;
use jump_sde::models::params::ModelParameters;
use jump_sde::output::{summary_rows, write_summary};
use jump_sde::pipeline::{run_pipeline, run_pipeline_with, PricingRequest};
use jump_sde::rng::{seed_rng_from_u64, RngFactory};
use rand::rngs::StdRng;

/// Always returns the same point, flagged with a fixed convergence outcome
struct FixedPoint {
    x: Vec<f64>,
    converged: bool,
}

impl GlobalMinimizer for FixedPoint {
    fn minimize<F>(
        &self,
        _bounds: &BoxConstraints,
        _initial: Option<&[f64]>,
        rng_factory: &RngFactory,
        objective: F,
    ) -> JumpResult<OptimisationResult>
    where
        F: Fn(&[f64], &mut StdRng) -> f64 + Sync,
    {
        let value = objective(&self.x, &mut rng_factory.substream(0));
        Ok(OptimisationResult {
            x: self.x.clone(),
            objective: value,
            generations: 1,
            evaluations: 1,
            converged: self.converged,
            reason: TerminationReason::Converged,
        })
    }
}

fn synthetic_series(days: usize) -> PriceSeries {
    let params = ModelParameters::new(0.012, 0.02, -0.01, 0.02);
    let mut rng = seed_rng_from_u64(31);
    let path = PathSimulator::new(60.0, 0.0002, params).simulate(days, 1, &mut rng);
    PriceSeries::from_prices(path.values().row(0).to_vec()).expect("positive prices")
}

fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.calibration.num_paths = 20;
    config.calibration.num_runs = 2;
    config.optimizer.population_multiplier = 5;
    config.optimizer.max_generations = 400;
    config.optimizer.tolerance = 1.0;
    config.optimizer.workers = Some(2);
    config.pricing.mc_paths = 5_000;
    config.pricing.jump_repetitions = 200;
    config
}

#[test]
fn test_pipeline_with_fixed_calibration() {
    let series = synthetic_series(60);
    let request = PricingRequest {
        strike: 60.0,
        maturity_years: 0.5,
        option_type: OptionType::Call,
    };
    let calibrator = Calibrator::new(FixedPoint {
        x: vec![0.012, 0.02, -0.01, 0.02],
        converged: true,
    });

    let report = run_pipeline_with(&calibrator, &series, &request, &fast_config())
        .expect("pipeline succeeds");

    assert_eq!(report.runs.len(), 2);
    assert_eq!(report.calibration.parameters, ModelParameters::new(0.012, 0.02, -0.01, 0.02));
    assert_eq!(report.option.spot, series.last().unwrap());

    let bs = report.prices.black_scholes.expect("requested");
    let jumps = report.prices.jump_adjusted.expect("requested");
    let mc = report.prices.monte_carlo.expect("requested");
    println!("BS {:.4}, jump-adjusted {:.4}, MC {:.4} ± {:.4}", bs, jumps, mc.price, mc.standard_error);
    assert!(bs > 0.0 && bs.is_finite());
    assert!(jumps >= 0.0 && jumps.is_finite());
    assert!(mc.price > 0.0 && mc.price.is_finite());
    assert_eq!(mc.steps, 126);

    let keys: Vec<String> = summary_rows(&report).into_iter().map(|(k, _)| k).collect();
    assert!(keys.contains(&"black_scholes".to_string()));
    assert!(keys.contains(&"monte_carlo_std_error".to_string()));
}

#[test]
fn test_pipeline_stops_without_successful_run() {
    let series = synthetic_series(30);
    let request = PricingRequest {
        strike: 60.0,
        maturity_years: 0.5,
        option_type: OptionType::Put,
    };
    let calibrator = Calibrator::new(FixedPoint {
        x: vec![0.012, 0.02, -0.01, 0.02],
        converged: false,
    });

    let err = run_pipeline_with(&calibrator, &series, &request, &fast_config()).unwrap_err();
    assert_eq!(err, JumpError::NoSuccessfulCalibration { runs: 2 });
}

#[test]
fn test_pipeline_end_to_end_from_csv() {
    let series = synthetic_series(60);
    let mut csv = String::from("Date,Adj Close\n");
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for (i, p) in series.prices.iter().enumerate() {
        let date = start + chrono::Duration::days(i as i64);
        csv.push_str(&format!("{},{}\n", date.format("%Y-%m-%d"), p));
    }
    let loaded = read_csv_prices(csv.as_bytes(), "Adj Close", "generated").expect("valid csv");
    assert_eq!(loaded.len(), series.len());

    let mut config = fast_config();
    config.pricing.methods = PricingMethods::BLACK_SCHOLES | PricingMethods::MONTE_CARLO;
    let request = PricingRequest {
        strike: 58.0,
        maturity_years: 0.25,
        option_type: OptionType::Put,
    };

    let report = run_pipeline(&loaded, &request, &config).expect("pipeline succeeds");
    println!("{:?}", report.calibration);

    assert!(report.calibration.successful_runs >= 1);
    assert!(report.prices.jump_adjusted.is_none());
    assert!(report.prices.black_scholes.is_some());
    assert!(report.prices.monte_carlo.is_some());

    let mut buf = Vec::new();
    write_summary(&mut buf, &report).expect("in-memory write");
    let text = String::from_utf8(buf).expect("utf8");
    assert!(text.starts_with("key,value\n"));
    assert!(text.contains("monte_carlo,"));
}

#[test]
fn test_pipeline_rejects_invalid_request() {
    let series = synthetic_series(20);
    let request = PricingRequest {
        strike: -1.0,
        maturity_years: 0.5,
        option_type: OptionType::Call,
    };
    assert!(run_pipeline(&series, &request, &fast_config()).is_err());
}

#[test]
fn test_pipeline_on_two_prices_calibrates_without_guess() {
    let series = PriceSeries::from_prices(vec![100.0, 101.0]).expect("positive prices");
    let request = PricingRequest {
        strike: 100.0,
        maturity_years: 0.25,
        option_type: OptionType::Call,
    };
    let calibrator = Calibrator::new(FixedPoint {
        x: vec![0.012, 0.02, -0.01, 0.02],
        converged: true,
    });

    let report = run_pipeline_with(&calibrator, &series, &request, &fast_config())
        .expect("a single return still calibrates");
    assert!(report.initial_guess.is_none());
    assert_eq!(report.calibration.successful_runs, 2);
    assert_eq!(report.option.spot, 101.0);
    assert!(report.prices.black_scholes.expect("requested") > 0.0);

    let mut seeded = fast_config();
    seeded.calibration.use_initial_guess = true;
    let err = run_pipeline_with(&calibrator, &series, &request, &seeded).unwrap_err();
    assert!(matches!(err, JumpError::DataError { .. }));
}
