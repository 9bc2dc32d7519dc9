//! Forecast combiner
//!
//! Equal-weight average of the capped horizon forecasts, scaled by the
//! forecast diversification multiplier
//!
//! `fdm = 1 / sqrt(w · ρ · wᵗ)`
//!
//! where `ρ` is the Pearson correlation of the uncapped EWMA carry series and
//! `w = 1/n` per horizon.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::carry::error::CarryError;
use crate::carry::forecast::{clip, HorizonForecast};

/// Pearson correlation over rows where both series are defined.
///
/// `NaN` with fewer than two overlapping rows or a constant series.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        f64::NAN
    } else {
        cov / denominator
    }
}

/// Correlation matrix labelled by horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    horizons: Vec<usize>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Pairwise correlations. Only the upper triangle is computed; the lower
    /// triangle mirrors it and the diagonal is exactly 1.
    pub fn from_series(horizons: Vec<usize>, series: &[&[f64]]) -> Self {
        let n = series.len();
        let mut values = vec![vec![1.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let rho = pearson(series[i], series[j]);
                values[i][j] = rho;
                values[j][i] = rho;
            }
        }
        Self { horizons, values }
    }

    pub fn horizons(&self) -> &[usize] {
        &self.horizons
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Largest off-diagonal correlation, ignoring undefined entries.
    pub fn max_off_diagonal(&self) -> Option<f64> {
        let n = self.size();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| self.values[i][j])
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
    }

    fn to_matrix(&self) -> DMatrix<f64> {
        let n = self.size();
        DMatrix::from_fn(n, n, |i, j| self.values[i][j])
    }

    /// `w · ρ · wᵗ` for equal weights.
    pub fn equal_weight_quadratic_form(&self) -> f64 {
        let n = self.size();
        if n == 0 {
            return f64::NAN;
        }
        let w = DVector::from_element(n, 1.0 / n as f64);
        w.dot(&(self.to_matrix() * &w))
    }
}

/// Diversification multiplier. Fails when `w·ρ·wᵗ` is not positive.
pub fn diversification_multiplier(correlation: &CorrelationMatrix) -> Result<f64, CarryError> {
    let quadratic_form = correlation.equal_weight_quadratic_form();
    // NaN also lands here
    if !(quadratic_form > 0.0) {
        return Err(CarryError::IllConditionedCorrelation {
            quadratic_form,
            horizons: correlation.horizons().to_vec(),
        });
    }
    Ok(1.0 / quadratic_form.sqrt())
}

/// Combined forecast columns plus the series-level multiplier
#[derive(Debug, Clone)]
pub struct CombinedForecast {
    pub correlation: CorrelationMatrix,
    pub fdm: f64,
    pub raw_combined_forecast: Vec<f64>,
    pub scaled_combined_forecast: Vec<f64>,
    pub capped_combined_forecast: Vec<f64>,
}

/// Average, diversify and cap the horizon forecasts.
pub fn combine(horizons: &[HorizonForecast], cap: f64) -> Result<CombinedForecast, CarryError> {
    let labels: Vec<usize> = horizons.iter().map(|h| h.horizon()).collect();
    let ewmas: Vec<&[f64]> = horizons.iter().map(|h| h.ewma_carry.as_slice()).collect();
    let correlation = CorrelationMatrix::from_series(labels, &ewmas);
    let fdm = diversification_multiplier(&correlation)?;

    let rows = horizons.first().map_or(0, |h| h.capped_forecast.len());
    let count = horizons.len() as f64;

    let raw_combined_forecast: Vec<f64> = (0..rows)
        .map(|i| horizons.iter().map(|h| h.capped_forecast[i]).sum::<f64>() / count)
        .collect();
    let scaled_combined_forecast: Vec<f64> =
        raw_combined_forecast.iter().map(|v| fdm * v).collect();
    let capped_combined_forecast = scaled_combined_forecast
        .iter()
        .map(|&v| clip(v, cap))
        .collect();

    debug!(fdm, horizons = ?correlation.horizons(), "forecasts combined");

    Ok(CombinedForecast {
        correlation,
        fdm,
        raw_combined_forecast,
        scaled_combined_forecast,
        capped_combined_forecast,
    })
}
