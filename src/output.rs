// src/output.rs
use crate::error::{JumpError, JumpResult};
use crate::pipeline::PipelineReport;
use ndarray::ArrayView1;
use std::io;
use std::path::Path;

fn write_error(origin: &str, e: impl std::fmt::Display) -> JumpError {
    JumpError::DataError {
        origin: origin.to_string(),
        reason: e.to_string(),
    }
}

/// `path_id,s_t` rows for a terminal-price distribution
pub fn write_terminal_distribution<W: io::Write>(
    writer: W,
    terminal: ArrayView1<'_, f64>,
) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["path_id", "s_t"])?;
    for (i, s_t) in terminal.iter().enumerate() {
        wtr.write_record([i.to_string(), s_t.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_terminal_distribution_to_csv<P: AsRef<Path>>(
    path: P,
    terminal: ArrayView1<'_, f64>,
) -> JumpResult<()> {
    let origin = path.as_ref().display().to_string();
    let file = std::fs::File::create(path.as_ref()).map_err(|e| write_error(&origin, e))?;
    write_terminal_distribution(file, terminal).map_err(|e| write_error(&origin, e))
}

/// `key,value` rows: calibrated parameters and one row per computed price
pub fn summary_rows(report: &PipelineReport) -> Vec<(String, String)> {
    let agg = &report.calibration;
    let annual = &report.annualized;
    let mut rows = vec![
        ("successful_runs".to_string(), agg.successful_runs.to_string()),
        ("total_runs".to_string(), agg.total_runs.to_string()),
        ("mean_objective".to_string(), agg.mean_objective.to_string()),
        ("sigma".to_string(), agg.parameters.sigma.to_string()),
        ("lambda".to_string(), agg.parameters.lambda.to_string()),
        ("mu_j".to_string(), agg.parameters.mu_j.to_string()),
        ("sigma_j".to_string(), agg.parameters.sigma_j.to_string()),
        ("r_annual".to_string(), annual.r.to_string()),
        ("sigma_annual".to_string(), annual.sigma.to_string()),
        ("lambda_annual".to_string(), annual.lambda.to_string()),
        ("mu_j_annual".to_string(), annual.mu_j.to_string()),
        ("sigma_j_annual".to_string(), annual.sigma_j.to_string()),
        ("spot".to_string(), report.option.spot.to_string()),
        ("strike".to_string(), report.option.strike.to_string()),
        ("maturity_years".to_string(), report.option.maturity_years.to_string()),
        ("option_type".to_string(), report.option.option_type.to_string()),
    ];
    let prices = &report.prices;
    if let Some(p) = prices.black_scholes {
        rows.push(("black_scholes".to_string(), p.to_string()));
    }
    if let Some(p) = prices.jump_adjusted {
        rows.push(("jump_adjusted".to_string(), p.to_string()));
    }
    if let Some(est) = &prices.monte_carlo {
        rows.push(("monte_carlo".to_string(), est.price.to_string()));
        rows.push(("monte_carlo_std_error".to_string(), est.standard_error.to_string()));
    }
    rows
}

pub fn write_summary<W: io::Write>(writer: W, report: &PipelineReport) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["key", "value"])?;
    for (key, value) in summary_rows(report) {
        wtr.write_record([key, value])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_summary_to_csv<P: AsRef<Path>>(path: P, report: &PipelineReport) -> JumpResult<()> {
    let origin = path.as_ref().display().to_string();
    let file = std::fs::File::create(path.as_ref()).map_err(|e| write_error(&origin, e))?;
    write_summary(file, report).map_err(|e| write_error(&origin, e))
}
