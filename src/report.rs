//! Summary of a finished carry series, for logs and CLI output.

use chrono::NaiveDate;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::fmt;

use crate::carry::{CarrySeries, HorizonCalibration};

#[derive(Debug, Clone, Serialize)]
pub struct CarrySummary {
    pub symbol: String,
    pub rows: usize,
    /// Rows past warm-up
    pub forecast_rows: usize,
    pub first_forecast_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub latest_forecast: Option<f64>,
    pub mean_forecast: f64,
    pub std_forecast: f64,
    pub min_forecast: f64,
    pub max_forecast: f64,
    pub long_rows: usize,
    pub short_rows: usize,
    pub fdm: f64,
    pub calibrations: Vec<HorizonCalibration>,
}

impl CarrySummary {
    pub fn from_series(series: &CarrySeries) -> Self {
        let defined: Vec<(NaiveDate, f64)> = series
            .final_forecasts()
            .filter(|(_, f)| f.is_finite())
            .collect();
        let values: Vec<f64> = defined.iter().map(|(_, f)| *f).collect();

        Self {
            symbol: series.symbol().to_string(),
            rows: series.len(),
            forecast_rows: values.len(),
            first_forecast_date: defined.first().map(|(d, _)| *d),
            last_date: series.latest().map(|r| r.date),
            latest_forecast: series
                .latest()
                .map(|r| r.capped_combined_forecast)
                .filter(|f| f.is_finite()),
            mean_forecast: Statistics::mean(&values),
            std_forecast: Statistics::std_dev(&values),
            min_forecast: Statistics::min(&values),
            max_forecast: Statistics::max(&values),
            long_rows: values.iter().filter(|f| **f > 0.0).count(),
            short_rows: values.iter().filter(|f| **f < 0.0).count(),
            fdm: series.fdm(),
            calibrations: series.calibrations().to_vec(),
        }
    }
}

impl fmt::Display for CarrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Carry Signal: {} ===", self.symbol)?;
        writeln!(
            f,
            "Rows: {} ({} with forecast, first {})",
            self.rows,
            self.forecast_rows,
            self.first_forecast_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        )?;
        match (self.last_date, self.latest_forecast) {
            (Some(d), Some(v)) => writeln!(f, "Latest: {} → {:+.3}", d, v)?,
            (Some(d), None) => writeln!(f, "Latest: {} → undefined", d)?,
            _ => {}
        }
        writeln!(
            f,
            "Forecast: mean {:+.3}  std {:.3}  min {:+.3}  max {:+.3}  long/short {}/{}",
            self.mean_forecast,
            self.std_forecast,
            self.min_forecast,
            self.max_forecast,
            self.long_rows,
            self.short_rows
        )?;
        writeln!(f, "FDM: {:.4}", self.fdm)?;
        for c in &self.calibrations {
            writeln!(
                f,
                "  {:>4}d  scalar {:>10.4}  mean|ewma| {:.6}  rows {}",
                c.horizon, c.forecast_scalar, c.mean_abs_ewma, c.defined_rows
            )?;
        }
        Ok(())
    }
}
