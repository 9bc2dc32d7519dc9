//! Multi-horizon forecast generator
//!
//! For each EWMA span `h`:
//! 1. `ewma_carry[h]`: exponentially weighted mean of risk-adjusted carry
//! 2. `forecast_scalar[h] = target / mean(|ewma_carry[h]|)`, one value per series
//! 3. `capped_forecast[h] = clip(forecast_scalar[h] * ewma_carry[h], -cap, cap)`
//!
//! Horizons share no state and may run on the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::carry::error::CarryError;
use crate::config::ForecastConfig;

/// Calibration result of one horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonCalibration {
    pub horizon: usize,
    pub forecast_scalar: f64,
    pub mean_abs_ewma: f64,
    /// Rows with a defined EWMA value
    pub defined_rows: usize,
}

/// All columns produced for one horizon
#[derive(Debug, Clone)]
pub struct HorizonForecast {
    pub calibration: HorizonCalibration,
    pub ewma_carry: Vec<f64>,
    pub scaled_forecast: Vec<f64>,
    pub capped_forecast: Vec<f64>,
}

impl HorizonForecast {
    pub fn horizon(&self) -> usize {
        self.calibration.horizon
    }
}

/// Exponentially weighted mean with span-to-decay `α = 2 / (span + 1)`.
///
/// Uses bias-adjusted weights `(1-α)^k` where `k` counts rows back from the
/// current one. Undefined inputs add nothing but still age earlier weights.
/// Output is `NaN` until the first defined input.
pub fn ewma(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut out = Vec::with_capacity(values.len());
    let mut weighted = f64::NAN;
    let mut old_wt = 1.0;

    for &x in values {
        let observed = x.is_finite();
        if weighted.is_nan() {
            if observed {
                weighted = x;
            }
        } else {
            old_wt *= decay;
            if observed {
                if weighted != x {
                    weighted = (old_wt * weighted + x) / (old_wt + 1.0);
                }
                old_wt += 1.0;
            }
        }
        out.push(weighted);
    }

    out
}

/// Clip to `[-cap, cap]`. Values inside the band, and `NaN`, pass through.
#[inline]
pub fn clip(value: f64, cap: f64) -> f64 {
    value.clamp(-cap, cap)
}

/// One scalar calibrating the mean absolute EWMA of a horizon to `target`.
pub fn forecast_scalar(
    horizon: usize,
    ewma_carry: &[f64],
    target: f64,
) -> Result<HorizonCalibration, CarryError> {
    let (sum, defined_rows) = ewma_carry
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v.abs(), n + 1));

    let mean_abs_ewma = if defined_rows == 0 {
        f64::NAN
    } else {
        sum / defined_rows as f64
    };

    let forecast_scalar = target / mean_abs_ewma;
    if !(mean_abs_ewma.is_finite() && mean_abs_ewma > 0.0 && forecast_scalar.is_finite()) {
        return Err(CarryError::DegenerateScale {
            horizon,
            mean_abs_ewma,
            defined_rows,
        });
    }

    Ok(HorizonCalibration {
        horizon,
        forecast_scalar,
        mean_abs_ewma,
        defined_rows,
    })
}

/// Smooth, calibrate, scale and cap one horizon.
pub fn horizon_forecast(
    risk_adj_carry: &[f64],
    horizon: usize,
    config: &ForecastConfig,
) -> Result<HorizonForecast, CarryError> {
    let ewma_carry = ewma(risk_adj_carry, horizon);
    let calibration = forecast_scalar(horizon, &ewma_carry, config.target_abs_forecast)?;

    let scaled_forecast: Vec<f64> = ewma_carry
        .iter()
        .map(|v| calibration.forecast_scalar * v)
        .collect();
    let capped_forecast = scaled_forecast
        .iter()
        .map(|&v| clip(v, config.forecast_cap))
        .collect();

    debug!(
        horizon,
        forecast_scalar = calibration.forecast_scalar,
        defined_rows = calibration.defined_rows,
        "horizon calibrated"
    );

    Ok(HorizonForecast {
        calibration,
        ewma_carry,
        scaled_forecast,
        capped_forecast,
    })
}

/// Every configured horizon, in configured order.
pub fn horizon_forecasts(
    risk_adj_carry: &[f64],
    config: &ForecastConfig,
    parallel: bool,
) -> Result<Vec<HorizonForecast>, CarryError> {
    if parallel {
        config
            .horizons
            .par_iter()
            .map(|&h| horizon_forecast(risk_adj_carry, h, config))
            .collect()
    } else {
        config
            .horizons
            .iter()
            .map(|&h| horizon_forecast(risk_adj_carry, h, config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ewma_two_points() {
        // span 3 -> alpha 0.5: (2 + 0.5 * 1) / 1.5
        let out = ewma(&[1.0, 2.0], 3);
        assert_eq!(out[0], 1.0);
        assert!((out[1] - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ewma_skips_leading_nan() {
        let out = ewma(&[f64::NAN, f64::NAN, 4.0, 4.0], 5);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_eq!(out[2], 4.0);
        assert_eq!(out[3], 4.0);
    }

    #[test]
    fn test_ewma_gap_ages_weights() {
        let out = ewma(&[1.0, f64::NAN, 3.0], 3);
        assert_eq!(out[1], 1.0);
        // weights 0.25 for the first value, 1 for the last
        assert!((out[2] - 2.6).abs() < 1e-12);
    }

    #[test]
    fn test_clip_identity_inside_band() {
        for v in [-20.0, -19.999, -3.5, 0.0, 7.25, 20.0] {
            assert_eq!(clip(v, 20.0), v);
        }
        assert_eq!(clip(25.0, 20.0), 20.0);
        assert_eq!(clip(-1e9, 20.0), -20.0);
        assert!(clip(f64::NAN, 20.0).is_nan());
    }

    #[test]
    fn test_forecast_scalar_targets_mean_abs() {
        let cal = forecast_scalar(5, &[f64::NAN, 1.0, -3.0, 2.0], 10.0).unwrap();
        assert_eq!(cal.defined_rows, 3);
        assert!((cal.mean_abs_ewma - 2.0).abs() < 1e-12);
        assert!((cal.forecast_scalar - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_forecast_scalar_all_zero_is_degenerate() {
        let err = forecast_scalar(60, &[0.0, 0.0, 0.0], 10.0).unwrap_err();
        assert!(matches!(err, CarryError::DegenerateScale { horizon: 60, .. }));
    }

    #[test]
    fn test_forecast_scalar_all_undefined_is_degenerate() {
        let err = forecast_scalar(5, &[f64::NAN; 4], 10.0).unwrap_err();
        match err {
            CarryError::DegenerateScale { defined_rows, .. } => assert_eq!(defined_rows, 0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scaled_mean_abs_hits_target() {
        let carry: Vec<f64> = (0..200).map(|i| ((i as f64) * 0.1).sin() + 0.3).collect();
        let config = ForecastConfig::default();
        let hf = horizon_forecast(&carry, 20, &config).unwrap();
        let mean_abs = hf.scaled_forecast.iter().map(|v| v.abs()).sum::<f64>() / 200.0;
        assert!((mean_abs - 10.0).abs() < 1e-9);
        assert!(hf.capped_forecast.iter().all(|v| v.abs() <= 20.0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let carry: Vec<f64> = (0..300)
            .map(|i| if i < 10 { f64::NAN } else { ((i as f64) * 0.05).cos() })
            .collect();
        let config = ForecastConfig::default();
        let seq = horizon_forecasts(&carry, &config, false).unwrap();
        let par = horizon_forecasts(&carry, &config, true).unwrap();
        assert_eq!(seq.len(), par.len());
        for (a, b) in seq.iter().zip(par.iter()) {
            assert_eq!(a.horizon(), b.horizon());
            assert_eq!(a.calibration, b.calibration);
            for (x, y) in a.capped_forecast.iter().zip(b.capped_forecast.iter()) {
                assert!((x.is_nan() && y.is_nan()) || x == y);
            }
        }
        let order: Vec<usize> = par.iter().map(|h| h.horizon()).collect();
        assert_eq!(order, vec![5, 20, 60, 120]);
    }
}
