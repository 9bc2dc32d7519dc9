//! Risk-adjusted carry: raw spread, annualized by time-to-roll, divided by
//! annualized price volatility.

/// Row-wise carry columns.
#[derive(Debug, Clone, Default)]
pub struct CarryColumns {
    pub raw_carry: Vec<f64>,
    pub annualized_raw_carry: Vec<f64>,
    pub risk_adj_annualized_raw_carry: Vec<f64>,
}

/// `numerator / denominator`, `NaN` when the denominator is zero or either
/// side is undefined.
#[inline]
pub fn checked_div(numerator: f64, denominator: f64) -> f64 {
    if !numerator.is_finite() || !denominator.is_finite() || denominator == 0.0 {
        return f64::NAN;
    }
    let q = numerator / denominator;
    if q.is_finite() {
        q
    } else {
        f64::NAN
    }
}

/// Build the carry columns. All input slices have one entry per row.
pub fn carry_columns(
    front_prices: &[f64],
    further_prices: &[f64],
    expiry_diff: &[f64],
    daily_std: &[f64],
    annualization_factor: f64,
) -> CarryColumns {
    let n = front_prices.len();
    let mut cols = CarryColumns {
        raw_carry: Vec::with_capacity(n),
        annualized_raw_carry: Vec::with_capacity(n),
        risk_adj_annualized_raw_carry: Vec::with_capacity(n),
    };

    for i in 0..n {
        let raw = front_prices[i] - further_prices[i];
        let annualized = checked_div(raw, expiry_diff[i]);
        let price_vol = daily_std[i] * annualization_factor * front_prices[i];
        cols.raw_carry.push(raw);
        cols.annualized_raw_carry.push(annualized);
        cols.risk_adj_annualized_raw_carry.push(checked_div(annualized, price_vol));
    }

    cols
}
