// src/models/option.rs
use crate::error::{validation::*, JumpError, JumpResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl FromStr for OptionType {
    type Err = JumpError;

    /// Accepts `call` or `put`, ignoring case and surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(OptionType::Call),
            "put" => Ok(OptionType::Put),
            _ => Err(JumpError::InvalidOptionType(s.to_string())),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

/// European vanilla option contract
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub spot: f64,
    pub strike: f64,
    pub maturity_years: f64,
    pub option_type: OptionType,
}

impl OptionSpec {
    pub fn new(spot: f64, strike: f64, maturity_years: f64, option_type: OptionType) -> Self {
        Self {
            spot,
            strike,
            maturity_years,
            option_type,
        }
    }

    pub fn validate(&self) -> JumpResult<()> {
        validate_positive("spot", self.spot)?;
        validate_positive("strike", self.strike)?;
        validate_positive("maturity_years", self.maturity_years)?;
        validate_finite("maturity_years", self.maturity_years)?;
        Ok(())
    }
}
