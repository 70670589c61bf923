// src/analytics/bs_analytic.rs
//! Analytical Black-Scholes formulas for European options
//!
//! # Mathematical Foundation
//!
//! Under the Black-Scholes model, the underlying asset follows:
//! ```text
//! dS_t = r S_t dt + σ S_t dW_t
//! ```
//!
//! The risk-neutral pricing formula gives:
//! ```text
//! V(S,t) = e^(-r(T-t)) * E^Q[payoff(S_T) | S_t = S]
//! ```
//!
//! For European options this has a closed form in the cumulative normal
//! distribution Φ(x). All inputs are annual: `r` and `sigma` per year, `t` in
//! years.

use crate::math_utils::norm_cdf;
use crate::models::option::{OptionSpec, OptionType};

/// Black-Scholes `d₁` and `d₂`
///
/// ```text
/// d₁ = [ln(S/K) + (r + σ²/2)T] / (σ√T)
/// d₂ = d₁ - σ√T
/// ```
pub fn d1_d2(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> (f64, f64) {
    let sigma_sqrt_t = sigma * t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / sigma_sqrt_t;
    (d1, d1 - sigma_sqrt_t)
}

/// Price from precomputed `d₁`, `d₂` and discount factor `e^(-rT)`
///
/// ```text
/// C = S*Φ(d₁) - K*D*Φ(d₂)
/// P = K*D*Φ(-d₂) - S*Φ(-d₁)
/// ```
pub fn price_from_d(
    s: f64,
    k: f64,
    discount: f64,
    d1: f64,
    d2: f64,
    option_type: OptionType,
) -> f64 {
    match option_type {
        OptionType::Call => s * norm_cdf(d1) - k * discount * norm_cdf(d2),
        OptionType::Put => k * discount * norm_cdf(-d2) - s * norm_cdf(-d1),
    }
}

/// Black-Scholes European option price
///
/// # Parameters
/// - `s`: Current stock price
/// - `k`: Strike price
/// - `t`: Time to expiration in years
/// - `r_annual`: Continuously compounded risk-free rate
/// - `sigma_annual`: Volatility
/// - `option_type`: Call or put
pub fn black_scholes(
    s: f64,
    k: f64,
    t: f64,
    r_annual: f64,
    sigma_annual: f64,
    option_type: OptionType,
) -> f64 {
    let (d1, d2) = d1_d2(s, k, r_annual, sigma_annual, t);
    price_from_d(s, k, (-r_annual * t).exp(), d1, d2, option_type)
}

/// Black-Scholes price of an [`OptionSpec`]
pub fn black_scholes_spec(spec: &OptionSpec, r_annual: f64, sigma_annual: f64) -> f64 {
    black_scholes(
        spec.spot,
        spec.strike,
        spec.maturity_years,
        r_annual,
        sigma_annual,
        spec.option_type,
    )
}

pub fn bs_call_price(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    black_scholes(s, k, t, r, sigma, OptionType::Call)
}

pub fn bs_put_price(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> f64 {
    black_scholes(s, k, t, r, sigma, OptionType::Put)
}
