//! Option Payoff Functions
//!
//! # Mathematical Definitions
//!
//! - **Call**: max(S_T - K, 0) - right to buy at strike K
//! - **Put**: max(K - S_T, 0) - right to sell at strike K
//!
//! Only the terminal column of a simulated [`PricePath`](crate::models::merton::PricePath)
//! is read by these payoffs.

use crate::models::option::{OptionSpec, OptionType};
use ndarray::ArrayView1;

/// European payoff on the terminal price
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Payoff {
    /// European call option: max(S_T - K, 0)
    EuropeanCall { k: f64 },

    /// European put option: max(K - S_T, 0)
    EuropeanPut { k: f64 },
}

impl Payoff {
    pub fn european(option_type: OptionType, k: f64) -> Self {
        match option_type {
            OptionType::Call => Payoff::EuropeanCall { k },
            OptionType::Put => Payoff::EuropeanPut { k },
        }
    }

    pub fn from_spec(spec: &OptionSpec) -> Self {
        Self::european(spec.option_type, spec.strike)
    }

    /// Payoff at a single terminal price
    pub fn calculate(&self, s_t: f64) -> f64 {
        match self {
            Payoff::EuropeanCall { k } => (s_t - k).max(0.0),
            Payoff::EuropeanPut { k } => (k - s_t).max(0.0),
        }
    }

    /// Sum and sum of squares of payoffs over a batch of terminal prices
    pub fn accumulate(&self, terminal: ArrayView1<'_, f64>) -> (f64, f64) {
        terminal.iter().fold((0.0, 0.0), |(sum, sum_sq), &s_t| {
            let payoff = self.calculate(s_t);
            (sum + payoff, sum_sq + payoff * payoff)
        })
    }
}
