use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::carry::error::ExpiryFault;

/// A futures expiration encoded as `YYYYMM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpiryCode {
    year: u16,
    month: u8,
}

impl ExpiryCode {
    /// Decode a `YYYYMM` integer. Day-of-month is never part of the code.
    pub fn parse(code: i64) -> Result<Self, ExpiryFault> {
        if !(100_001..=999_912).contains(&code) {
            return Err(ExpiryFault::Undecodable { code });
        }
        let year = code / 100;
        let month = code % 100;
        if !(1..=12).contains(&month) {
            return Err(ExpiryFault::Undecodable { code });
        }
        Ok(Self {
            year: year as u16,
            month: month as u8,
        })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// Signed number of whole months from `self` to `later`.
    pub fn months_until(&self, later: &ExpiryCode) -> i32 {
        (later.year as i32 - self.year as i32) * 12 + (later.month as i32 - self.month as i32)
    }
}

impl fmt::Display for ExpiryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

/// `null` reads back as `NaN`, mirroring how undefined values are written.
fn nullable_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// One trading date of front/further contract data, as handed over by a
/// [`crate::source::PriceSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeriesRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub front_price: f64,
    /// `YYYYMM`
    pub front_expiration: i64,
    pub further_price: f64,
    /// `YYYYMM`
    pub further_expiration: i64,
}

/// Per-horizon output columns for a single row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonForecastRow {
    /// EWMA span in days
    pub horizon: usize,
    #[serde(deserialize_with = "nullable_f64")]
    pub ewma_carry: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub scaled_forecast: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub capped_forecast: f64,
}

/// A fully computed carry row. Undefined values (warm-up, zero volatility)
/// are `NaN` and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarryRow {
    pub date: NaiveDate,
    pub front_price: f64,
    pub further_price: f64,
    pub front_expiration: i64,
    pub further_expiration: i64,
    #[serde(deserialize_with = "nullable_f64")]
    pub raw_carry: f64,
    /// Years between front and further expiry
    #[serde(deserialize_with = "nullable_f64")]
    pub expiry_diff: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub daily_std_returns: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub annualized_raw_carry: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub risk_adj_annualized_raw_carry: f64,
    pub horizons: Vec<HorizonForecastRow>,
    #[serde(deserialize_with = "nullable_f64")]
    pub raw_combined_forecast: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub scaled_combined_forecast: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub capped_combined_forecast: f64,
}

impl CarryRow {
    pub fn horizon(&self, horizon: usize) -> Option<&HorizonForecastRow> {
        self.horizons.iter().find(|h| h.horizon == horizon)
    }

    /// True once the final forecast is past warm-up.
    pub fn has_forecast(&self) -> bool {
        self.capped_combined_forecast.is_finite()
    }
}
