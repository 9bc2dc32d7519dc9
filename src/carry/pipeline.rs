//! Carry pipeline orchestrator
//!
//! Runs the five stages in order over one in-memory series and hands back
//! a read-only [`CarrySeries`]:
//!
//! expiry diff → blended vol → risk-adjusted carry → horizon forecasts → combination
//!
//! Every call starts from its own input; scalars and the multiplier live
//! only inside the returned series.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::carry::combiner::{combine, CorrelationMatrix};
use crate::carry::error::CarryError;
use crate::carry::expiry::expiry_diff_column;
use crate::carry::forecast::{horizon_forecasts, HorizonCalibration};
use crate::carry::risk_adjusted::carry_columns;
use crate::carry::volatility::blended_daily_std;
use crate::config::SignalConfig;
use crate::models::{CarryRow, HorizonForecastRow, PriceSeriesRow};

/// Finished carry computation for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct CarrySeries {
    symbol: String,
    calibrations: Vec<HorizonCalibration>,
    fdm: f64,
    correlation: CorrelationMatrix,
    rows: Vec<CarryRow>,
}

impl CarrySeries {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn rows(&self) -> &[CarryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Forecast scalar per horizon, in configured order
    pub fn calibrations(&self) -> &[HorizonCalibration] {
        &self.calibrations
    }

    pub fn forecast_scalar(&self, horizon: usize) -> Option<f64> {
        self.calibrations
            .iter()
            .find(|c| c.horizon == horizon)
            .map(|c| c.forecast_scalar)
    }

    /// Forecast diversification multiplier
    pub fn fdm(&self) -> f64 {
        self.fdm
    }

    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    /// Most recent row
    pub fn latest(&self) -> Option<&CarryRow> {
        self.rows.last()
    }

    /// The signal of record, one value per row
    pub fn final_forecasts(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.rows.iter().map(|r| (r.date, r.capped_combined_forecast))
    }
}

/// Batch carry signal computation
#[derive(Debug, Clone, Default)]
pub struct CarryPipeline {
    config: SignalConfig,
}

impl CarryPipeline {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Compute every carry column for `rows`.
    pub fn run(&self, symbol: &str, rows: &[PriceSeriesRow]) -> Result<CarrySeries, CarryError> {
        self.config.validate()?;
        validate_input(rows)?;

        debug!(symbol, rows = rows.len(), "carry pipeline start");

        let front_prices: Vec<f64> = rows.iter().map(|r| r.front_price).collect();
        let further_prices: Vec<f64> = rows.iter().map(|r| r.further_price).collect();

        let expiry_diff = expiry_diff_column(rows)?;
        debug!(symbol, "expiry diff computed");

        let daily_std = blended_daily_std(&front_prices, &self.config.volatility);
        let vol_rows = daily_std.iter().filter(|v| v.is_finite()).count();
        debug!(symbol, defined_rows = vol_rows, "blended volatility computed");

        let carry = carry_columns(
            &front_prices,
            &further_prices,
            &expiry_diff,
            &daily_std,
            self.config.annualization_factor,
        );

        let horizons = horizon_forecasts(
            &carry.risk_adj_annualized_raw_carry,
            &self.config.forecast,
            self.config.parallel_horizons,
        )?;

        let combined = combine(&horizons, self.config.forecast.forecast_cap)?;

        let out_rows: Vec<CarryRow> = rows
            .iter()
            .enumerate()
            .map(|(i, input)| CarryRow {
                date: input.date,
                front_price: input.front_price,
                further_price: input.further_price,
                front_expiration: input.front_expiration,
                further_expiration: input.further_expiration,
                raw_carry: carry.raw_carry[i],
                expiry_diff: expiry_diff[i],
                daily_std_returns: daily_std[i],
                annualized_raw_carry: carry.annualized_raw_carry[i],
                risk_adj_annualized_raw_carry: carry.risk_adj_annualized_raw_carry[i],
                horizons: horizons
                    .iter()
                    .map(|h| HorizonForecastRow {
                        horizon: h.horizon(),
                        ewma_carry: h.ewma_carry[i],
                        scaled_forecast: h.scaled_forecast[i],
                        capped_forecast: h.capped_forecast[i],
                    })
                    .collect(),
                raw_combined_forecast: combined.raw_combined_forecast[i],
                scaled_combined_forecast: combined.scaled_combined_forecast[i],
                capped_combined_forecast: combined.capped_combined_forecast[i],
            })
            .collect();

        let series = CarrySeries {
            symbol: symbol.to_string(),
            calibrations: horizons.iter().map(|h| h.calibration).collect(),
            fdm: combined.fdm,
            correlation: combined.correlation,
            rows: out_rows,
        };

        info!(
            symbol,
            rows = series.len(),
            forecast_rows = series.rows.iter().filter(|r| r.has_forecast()).count(),
            fdm = series.fdm,
            "📈 Carry signal computed"
        );

        Ok(series)
    }
}

fn validate_input(rows: &[PriceSeriesRow]) -> Result<(), CarryError> {
    if rows.is_empty() {
        return Err(CarryError::EmptySeries);
    }
    for (index, pair) in rows.windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(CarryError::UnorderedDates {
                index: index + 1,
                previous: pair[0].date,
                current: pair[1].date,
            });
        }
    }
    Ok(())
}
