//! Expiry differencer: `YYYYMM` expiration pairs to fractional years.

use crate::carry::error::{CarryError, ExpiryFault};
use crate::models::{ExpiryCode, PriceSeriesRow};

/// Years between the front and further expirations, month resolution.
pub fn expiry_diff_years(front: i64, further: i64) -> Result<f64, ExpiryFault> {
    let front = ExpiryCode::parse(front)?;
    let further = ExpiryCode::parse(further)?;
    let months = front.months_until(&further);
    if months <= 0 {
        return Err(ExpiryFault::NotAfterFront { months });
    }
    Ok(months as f64 / 12.0)
}

/// Column of expiry differences. The first bad row aborts the series.
pub fn expiry_diff_column(rows: &[PriceSeriesRow]) -> Result<Vec<f64>, CarryError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            expiry_diff_years(row.front_expiration, row.further_expiration).map_err(|fault| {
                CarryError::MalformedExpiry {
                    index,
                    date: row.date,
                    front_expiration: row.front_expiration,
                    further_expiration: row.further_expiration,
                    fault,
                }
            })
        })
        .collect()
}
