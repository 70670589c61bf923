// src/analytics/jump_adjusted.rs
//! Jump-adjusted Black-Scholes pricing (Merton 1976 style)
//!
//! # Mathematical Foundation
//!
//! Conditional on `n` jumps before expiry, the Merton model is lognormal and
//! prices with Black-Scholes under an adjusted rate and volatility:
//! ```text
//! m   = exp(μ_J + σ_J²/2) - 1
//! r_n = r - λm + n·ln(1 + m)/T
//! σ_n = √(σ² + n·σ_J²/T)
//! λ'  = λ(1 + m)
//! V   = Σ_n  e^(-λ'T)(λ'T)ⁿ/n! · BS(S, K, T, r_n, σ_n)
//! ```
//!
//! # Estimators
//!
//! - [`black_scholes_with_jumps`]: Monte Carlo over random jump counts. Each
//!   outer repetition draws ten scenarios `(n ~ Poisson(λT), Z ~ N(0,1))` and
//!   accumulates the Poisson-weighted conditional price. The result is the
//!   mean over all drawn scenarios.
//! - [`merton_series_price`]: deterministic truncated sum over `n = 0..=N`.
//!
//! # Numerical Safety
//!
//! `r_n·T` is clamped to `[-700, 700]` before exponentiation and `d₁`, `d₂`
//! to `[-10, 10]` before the normal CDF.

use crate::analytics::bs_analytic::{d1_d2, price_from_d};
use crate::error::{validation::*, JumpError, JumpResult};
use crate::math_utils::poisson_pmf;
use crate::models::option::OptionSpec;
use crate::models::params::AnnualizedParameters;
use crate::rng::{self, RngFactory};
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use rayon::prelude::*;
use tracing::debug;

/// Jump-count scenarios drawn per outer repetition
pub const JUMP_HYPOTHESES: usize = 10;

const EXPONENT_CLAMP: f64 = 700.0;
const D_CLAMP: f64 = 10.0;

/// Adjusted rate and volatility conditional on a realised jump count
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpScenario {
    pub n_jumps: u64,
    pub z: f64,
    pub m: f64,
    pub r_n: f64,
    pub sigma_n: f64,
    pub lambda_n: f64,
}

impl JumpScenario {
    pub fn conditional(params: &AnnualizedParameters, t: f64, n_jumps: u64, z: f64) -> Self {
        let m = params.jump_compensator();
        let n = n_jumps as f64;
        JumpScenario {
            n_jumps,
            z,
            m,
            r_n: params.r - params.lambda * m + n * (1.0 + m).ln() / t,
            sigma_n: (params.sigma * params.sigma + n * params.sigma_j * params.sigma_j / t).sqrt(),
            lambda_n: params.lambda * (1.0 + m),
        }
    }

    /// Draw a jump count `n ~ Poisson(λT)` and a shock `Z ~ N(0,1)`
    pub fn draw<R: Rng + ?Sized>(params: &AnnualizedParameters, t: f64, rng: &mut R) -> Self {
        let rate = params.lambda * t;
        let n_jumps = if rate > 0.0 {
            Poisson::new(rate).map_or(0, |p| p.sample(rng) as u64)
        } else {
            0
        };
        let z = rng::get_normal_draw(rng);
        Self::conditional(params, t, n_jumps, z)
    }

    /// Poisson mass of this jump count under the jump-adjusted intensity `λ'T`
    pub fn poisson_weight(&self, t: f64) -> f64 {
        poisson_pmf(self.n_jumps, self.lambda_n * t)
    }

    /// Black-Scholes price under `(r_n, σ_n)` with clamped exponent and `d`s
    pub fn conditional_price(&self, spec: &OptionSpec) -> f64 {
        let t = spec.maturity_years;
        let safe_r_n_t = (self.r_n * t).clamp(-EXPONENT_CLAMP, EXPONENT_CLAMP);
        let discount = (-safe_r_n_t).exp();

        let (d1, d2) = d1_d2(spec.spot, spec.strike, self.r_n, self.sigma_n, t);
        price_from_d(
            spec.spot,
            spec.strike,
            discount,
            d1.clamp(-D_CLAMP, D_CLAMP),
            d2.clamp(-D_CLAMP, D_CLAMP),
            spec.option_type,
        )
    }

    /// Terminal price `S_T` given this scenario's jump count and shock
    pub fn terminal_price(&self, s0: f64, t: f64) -> f64 {
        s0 * (self.r_n * t - 0.5 * self.sigma_n * self.sigma_n * t
            + self.sigma_n * t.sqrt() * self.z)
            .exp()
    }
}

fn validate_inputs(spec: &OptionSpec, params: &AnnualizedParameters) -> JumpResult<()> {
    spec.validate()?;
    validate_finite("r_annual", params.r)?;
    validate_positive("sigma_annual", params.sigma)?;
    validate_non_negative("lambda_annual", params.lambda)?;
    validate_finite("lambda_annual", params.lambda)?;
    validate_finite("mu_j_annual", params.mu_j)?;
    validate_positive("sigma_j_annual", params.sigma_j)?;
    validate_finite("sigma_j_annual", params.sigma_j)?;
    Ok(())
}

/// Jump-adjusted Black-Scholes price by Monte Carlo over jump scenarios
///
/// Outer repetitions run in parallel; repetition `i` draws from substream
/// `i`, and partial sums are combined in repetition order, so the price is
/// identical for any thread count.
pub fn black_scholes_with_jumps(
    spec: &OptionSpec,
    params: &AnnualizedParameters,
    num_simulations: usize,
    rng_factory: &RngFactory,
) -> JumpResult<f64> {
    validate_inputs(spec, params)?;
    validate_paths("num_simulations", num_simulations)?;
    let t = spec.maturity_years;

    let partials: Vec<f64> = (0..num_simulations)
        .into_par_iter()
        .map(|rep| {
            let mut rng = rng_factory.substream(rep as u64);
            (0..JUMP_HYPOTHESES)
                .map(|_| {
                    let scenario = JumpScenario::draw(params, t, &mut rng);
                    scenario.poisson_weight(t) * scenario.conditional_price(spec)
                })
                .sum::<f64>()
        })
        .collect();

    let price = partials.iter().sum::<f64>() / (num_simulations * JUMP_HYPOTHESES) as f64;
    debug!(num_simulations, price, "jump-adjusted Black-Scholes");

    if !price.is_finite() {
        return Err(JumpError::NumericalInstability {
            method: "jump-adjusted Black-Scholes".to_string(),
            reason: format!("Price estimate is not finite: {}", price),
        });
    }
    Ok(price)
}

/// Deterministic Merton series truncated after `max_jumps` jumps
pub fn merton_series_price(
    spec: &OptionSpec,
    params: &AnnualizedParameters,
    max_jumps: u64,
) -> JumpResult<f64> {
    validate_inputs(spec, params)?;
    let t = spec.maturity_years;

    let price = (0..=max_jumps)
        .map(|n| {
            let scenario = JumpScenario::conditional(params, t, n, 0.0);
            scenario.poisson_weight(t) * scenario.conditional_price(spec)
        })
        .sum::<f64>();

    if !price.is_finite() {
        return Err(JumpError::NumericalInstability {
            method: "Merton series".to_string(),
            reason: format!("Price is not finite: {}", price),
        });
    }
    Ok(price)
}
