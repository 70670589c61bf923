// src/config.rs
//! Engine configuration, loadable from TOML.
//!
//! ```toml
//! seed = 7
//!
//! [calibration]
//! num_runs = 5
//! num_paths = 20
//!
//! [optimizer]
//! max_generations = 500
//! workers = 4
//!
//! [pricing]
//! mc_paths = 50000
//! methods = "BLACK_SCHOLES | MONTE_CARLO"
//! ```
//! Missing sections and fields keep their defaults.

use crate::calibration::optimizer::DifferentialEvolutionOptions;
use crate::error::{validation::*, JumpError, JumpResult};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::path::Path;

bitflags! {
    /// Pricing methods run after calibration
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PricingMethods: u32 {
        const BLACK_SCHOLES = 1 << 0;
        const JUMP_ADJUSTED = 1 << 1;
        const MONTE_CARLO   = 1 << 2;
    }
}

impl Default for PricingMethods {
    fn default() -> Self {
        PricingMethods::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Daily continuously compounded risk-free rate
    pub risk_free_daily: f64,
    /// Simulated paths per objective evaluation
    pub num_paths: usize,
    /// Independent calibration runs to average
    pub num_runs: usize,
    pub jump_threshold_sigmas: f64,
    /// Seed the search with the moment-based guess
    pub use_initial_guess: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            risk_free_daily: 0.0002,
            num_paths: 1,
            num_runs: 1,
            jump_threshold_sigmas: 2.0,
            use_initial_guess: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub mc_paths: usize,
    /// Outer repetitions of the jump-adjusted estimator
    pub jump_repetitions: usize,
    pub methods: PricingMethods,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            mc_paths: 100_000,
            jump_repetitions: 1_000,
            methods: PricingMethods::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: u64,
    pub calibration: CalibrationConfig,
    pub optimizer: DifferentialEvolutionOptions,
    pub pricing: PricingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            calibration: CalibrationConfig::default(),
            optimizer: DifferentialEvolutionOptions::default(),
            pricing: PricingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> JumpResult<()> {
        let c = &self.calibration;
        validate_finite("calibration.risk_free_daily", c.risk_free_daily)?;
        validate_paths("calibration.num_paths", c.num_paths)?;
        if c.num_runs == 0 {
            return Err(JumpError::InvalidConfiguration {
                field: "calibration.num_runs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        validate_positive("calibration.jump_threshold_sigmas", c.jump_threshold_sigmas)?;

        self.optimizer.validate()?;

        let p = &self.pricing;
        if p.methods.contains(PricingMethods::MONTE_CARLO) {
            validate_paths("pricing.mc_paths", p.mc_paths)?;
        }
        if p.methods.contains(PricingMethods::JUMP_ADJUSTED) {
            validate_paths("pricing.jump_repetitions", p.jump_repetitions)?;
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> JumpResult<Self> {
        let config: EngineConfig =
            toml::from_str(text).map_err(|e| JumpError::InvalidConfiguration {
                field: "toml".to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> JumpResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| JumpError::DataError {
            origin: path.as_ref().display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> JumpResult<String> {
        toml::to_string(self).map_err(|e| JumpError::InvalidConfiguration {
            field: "toml".to_string(),
            reason: e.to_string(),
        })
    }
}
