// scripts/calibrate.rs
//! `jump-calibrate`: calibrate a Merton jump-diffusion model to a CSV price
//! history and price a European option with the calibrated parameters.
//!
//! ```text
//! jump-calibrate --prices ko.csv --strike 60 --maturity 0.5 --option-type call
//! RUST_LOG=debug jump-calibrate --prices ko.csv --config engine.toml ...
//! ```

use clap::Parser;
use jump_sde::config::EngineConfig;
use jump_sde::market::loader::{load_csv_prices, DEFAULT_PRICE_COLUMN};
use jump_sde::math_utils::Timer;
use jump_sde::models::merton::PathSimulator;
use jump_sde::models::option::OptionType;
use jump_sde::output::{write_summary_to_csv, write_terminal_distribution_to_csv};
use jump_sde::pipeline::{run_pipeline, PipelineReport, PricingRequest};
use jump_sde::rng::RngFactory;
use jump_sde::JumpResult;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Merton jump-diffusion calibration and option pricing
#[derive(Parser, Debug)]
#[command(name = "jump-calibrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV file with a header row
    #[arg(short, long)]
    prices: PathBuf,

    /// Price column to read
    #[arg(long, default_value = DEFAULT_PRICE_COLUMN)]
    column: String,

    /// TOML engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short = 'k', long)]
    strike: f64,

    /// Time to maturity in years
    #[arg(short = 't', long)]
    maturity: f64,

    /// call or put
    #[arg(short = 'o', long)]
    option_type: OptionType,

    /// Overrides the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write a key,value summary CSV
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Write terminal prices of paths simulated with the calibrated parameters
    #[arg(long)]
    paths_out: Option<PathBuf>,

    /// Paths simulated for --paths-out
    #[arg(long, default_value = "1000")]
    num_sim_paths: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> JumpResult<()> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let series = load_csv_prices(&cli.prices, &cli.column)?;
    info!(rows = series.len(), path = %cli.prices.display(), "loaded prices");

    let request = PricingRequest {
        strike: cli.strike,
        maturity_years: cli.maturity,
        option_type: cli.option_type,
    };

    let mut timer = Timer::new();
    timer.start();
    let report = run_pipeline(&series, &request, &config)?;
    info!(elapsed_ms = timer.elapsed_ms(), "pipeline finished");

    print_report(&report);

    if let Some(path) = &cli.summary {
        write_summary_to_csv(path, &report)?;
        info!(path = %path.display(), "wrote summary");
    }

    if let Some(path) = &cli.paths_out {
        let s0 = series.first().unwrap_or(report.option.spot);
        let steps = series.len() - 1;
        let mut rng = RngFactory::new(config.seed).child(2).substream(0);
        let paths = PathSimulator::new(s0, config.calibration.risk_free_daily, report.calibration.parameters)
            .simulate(steps, cli.num_sim_paths, &mut rng);
        write_terminal_distribution_to_csv(path, paths.terminal_prices())?;
        info!(path = %path.display(), paths = cli.num_sim_paths, "wrote terminal distribution");
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    match &report.initial_guess {
        Some(g) => {
            println!("Initial guesses:");
            println!("  sigma   : {:.6}", g.sigma);
            println!("  lambda  : {:.6}", g.lambda);
            println!("  mu_J    : {:.6}", g.mu_j);
            println!("  sigma_J : {:.6}", g.sigma_j);
        }
        None => println!("Initial guesses: unavailable (series too short)"),
    }

    let agg = &report.calibration;
    println!(
        "\nAverage calibrated parameters ({} of {} runs, MSE {:.6e}):",
        agg.successful_runs, agg.total_runs, agg.mean_objective
    );
    println!("  sigma   : {:.6}", agg.parameters.sigma);
    println!("  lambda  : {:.6}", agg.parameters.lambda);
    println!("  mu_J    : {:.6}", agg.parameters.mu_j);
    println!("  sigma_J : {:.6}", agg.parameters.sigma_j);

    let o = &report.option;
    println!(
        "\n{} S={:.4} K={:.4} T={:.4}",
        o.option_type, o.spot, o.strike, o.maturity_years
    );
    if let Some(p) = report.prices.black_scholes {
        println!("  Black-Scholes          : {:.4}", p);
    }
    if let Some(p) = report.prices.jump_adjusted {
        println!("  Black-Scholes w/ jumps : {:.4}", p);
    }
    if let Some(est) = &report.prices.monte_carlo {
        println!(
            "  Monte Carlo            : {:.4} ± {:.4}",
            est.price, est.standard_error
        );
    }
}
