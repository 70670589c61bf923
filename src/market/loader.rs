// src/market/loader.rs
//! Historical price series from CSV.
//!
//! The file needs a header row. Prices are read from a named column (Yahoo
//! style `Adj Close` by default); a `Date` column, when present, is parsed as
//! `%Y-%m-%d`. Rows whose price cell is empty or `null` are skipped.

use crate::error::{JumpError, JumpResult};
use crate::market::returns::log_returns;
use chrono::NaiveDate;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_PRICE_COLUMN: &str = "Adj Close";
const DATE_COLUMN: &str = "Date";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub dates: Option<Vec<NaiveDate>>,
    pub prices: Vec<f64>,
}

impl PriceSeries {
    /// Series without dates; every price must be positive and finite
    pub fn from_prices(prices: Vec<f64>) -> JumpResult<Self> {
        let series = Self {
            dates: None,
            prices,
        };
        series.validate("prices")?;
        Ok(series)
    }

    fn validate(&self, origin: &str) -> JumpResult<()> {
        if self.prices.len() < 2 {
            return Err(JumpError::DataError {
                origin: origin.to_string(),
                reason: format!("need at least 2 prices, got {}", self.prices.len()),
            });
        }
        if let Some(idx) = self.prices.iter().position(|p| !(p.is_finite() && *p > 0.0)) {
            return Err(JumpError::DataError {
                origin: origin.to_string(),
                reason: format!("price at row {idx} is not positive and finite: {}", self.prices[idx]),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.prices.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.prices.last().copied()
    }

    pub fn log_returns(&self) -> Vec<f64> {
        log_returns(&self.prices)
    }
}

/// Load a price series from a CSV file
pub fn load_csv_prices<P: AsRef<Path>>(path: P, column: &str) -> JumpResult<PriceSeries> {
    let origin = path.as_ref().display().to_string();
    let file = std::fs::File::open(path.as_ref()).map_err(|e| JumpError::DataError {
        origin: origin.clone(),
        reason: e.to_string(),
    })?;
    read_csv_prices(file, column, &origin)
}

/// Read a price series from any CSV source
pub fn read_csv_prices<R: io::Read>(reader: R, column: &str, origin: &str) -> JumpResult<PriceSeries> {
    let data_error = |reason: String| JumpError::DataError {
        origin: origin.to_string(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().map_err(|e| data_error(e.to_string()))?.clone();

    let price_idx = headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| data_error(format!("missing price column '{column}'")))?;
    let date_idx = headers.iter().position(|h| h == DATE_COLUMN);

    let mut prices = Vec::new();
    let mut dates = date_idx.map(|_| Vec::new());
    let mut skipped = 0usize;

    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| data_error(e.to_string()))?;
        let cell = record.get(price_idx).unwrap_or("");
        if cell.is_empty() || cell.eq_ignore_ascii_case("null") {
            skipped += 1;
            continue;
        }
        let price: f64 = cell
            .parse()
            .map_err(|_| data_error(format!("row {}: cannot parse price '{cell}'", row + 1)))?;

        if let (Some(idx), Some(dates)) = (date_idx, dates.as_mut()) {
            let text = record.get(idx).unwrap_or("");
            let date = NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map_err(|e| data_error(format!("row {}: bad date '{text}': {e}", row + 1)))?;
            dates.push(date);
        }
        prices.push(price);
    }

    if skipped > 0 {
        warn!(origin, skipped, "skipped rows without a price");
    }
    debug!(origin, rows = prices.len(), column, "loaded price series");

    let series = PriceSeries { dates, prices };
    series.validate(origin)?;
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,Open,Close,Adj Close
2024-01-02,100.0,101.0,100.5
2024-01-03,101.0,102.0,101.5
2024-01-04,null,null,null
2024-01-05,102.0,103.0,102.5
";

    #[test]
    fn test_reads_named_column_and_dates() {
        let series = read_csv_prices(SAMPLE.as_bytes(), DEFAULT_PRICE_COLUMN, "sample").unwrap();
        assert_eq!(series.prices, vec![100.5, 101.5, 102.5]);
        let dates = series.dates.as_ref().expect("Date column present");
        assert_eq!(dates[2], NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(series.first(), Some(100.5));
        assert_eq!(series.last(), Some(102.5));
        assert_eq!(series.log_returns().len(), 2);
    }

    #[test]
    fn test_other_column_without_dates() {
        let csv = "Close\n10\n11\n12\n";
        let series = read_csv_prices(csv.as_bytes(), "Close", "inline").unwrap();
        assert!(series.dates.is_none());
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_missing_column_is_data_error() {
        let err = read_csv_prices(SAMPLE.as_bytes(), "Price", "sample").unwrap_err();
        assert!(matches!(err, JumpError::DataError { .. }));
    }

    #[test]
    fn test_bad_values_are_data_errors() {
        assert!(read_csv_prices("Close\n10\nabc\n".as_bytes(), "Close", "x").is_err());
        assert!(read_csv_prices("Close\n10\n-1\n".as_bytes(), "Close", "x").is_err());
        assert!(read_csv_prices("Close\n10\n".as_bytes(), "Close", "x").is_err());
        assert!(read_csv_prices("Date,Close\n01/02/2024,10\n2024-01-03,11\n".as_bytes(), "Close", "x").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_csv_prices("/nonexistent/prices.csv", "Close").unwrap_err();
        assert!(matches!(err, JumpError::DataError { .. }));
    }

    #[test]
    fn test_from_prices_validates() {
        assert!(PriceSeries::from_prices(vec![1.0, 2.0]).is_ok());
        assert!(PriceSeries::from_prices(vec![1.0, f64::NAN]).is_err());
    }
}
