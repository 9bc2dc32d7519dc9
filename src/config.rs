//! Carry signal configuration
//!
//! Signal parameters and data-source settings, loaded from TOML. Nothing in
//! the computation core reads the environment; the binary loads an
//! [`AppConfig`] and hands the pieces to the source and the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::carry::error::CarryError;

/// Top-level configuration file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub signal: SignalConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

impl AppConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from environment or default path
    pub fn from_env() -> Self {
        let path = std::env::var("CARRY_CONFIG_PATH")
            .unwrap_or_else(|_| "carry_config.toml".to_string());

        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default carry config ({}): {}", path, e);
            Self::default()
        })
    }
}

// =============================================================================
// SIGNAL
// =============================================================================

/// Parameters of the carry computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    #[serde(default)]
    pub volatility: VolatilityConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Daily to annual volatility (sqrt of 256 trading days)
    #[serde(default = "default_annualization_factor")]
    pub annualization_factor: f64,

    /// Compute horizons on the rayon pool
    #[serde(default)]
    pub parallel_horizons: bool,
}

fn default_annualization_factor() -> f64 {
    16.0
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            volatility: VolatilityConfig::default(),
            forecast: ForecastConfig::default(),
            annualization_factor: default_annualization_factor(),
            parallel_horizons: false,
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), CarryError> {
        self.volatility.validate()?;
        self.forecast.validate()?;
        if !(self.annualization_factor.is_finite() && self.annualization_factor > 0.0) {
            return Err(CarryError::InvalidConfig(format!(
                "annualization_factor must be positive, got {}",
                self.annualization_factor
            )));
        }
        Ok(())
    }
}

/// Blended short/long rolling volatility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityConfig {
    #[serde(default = "default_short_window")]
    pub short_window: usize,

    /// 10 years of 256 trading days
    #[serde(default = "default_long_window")]
    pub long_window: usize,

    #[serde(default = "default_short_weight")]
    pub short_weight: f64,

    #[serde(default = "default_long_weight")]
    pub long_weight: f64,
}

fn default_short_window() -> usize {
    30
}

fn default_long_window() -> usize {
    2560
}

fn default_short_weight() -> f64 {
    0.7
}

fn default_long_weight() -> f64 {
    0.3
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            short_window: default_short_window(),
            long_window: default_long_window(),
            short_weight: default_short_weight(),
            long_weight: default_long_weight(),
        }
    }
}

impl VolatilityConfig {
    fn validate(&self) -> Result<(), CarryError> {
        // Sample std needs at least two observations.
        if self.short_window < 2 || self.long_window < 2 {
            return Err(CarryError::InvalidConfig(format!(
                "volatility windows must be >= 2, got short={} long={}",
                self.short_window, self.long_window
            )));
        }
        for (name, w) in [
            ("short_weight", self.short_weight),
            ("long_weight", self.long_weight),
        ] {
            if !(w.is_finite() && w >= 0.0) {
                return Err(CarryError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, w
                )));
            }
        }
        Ok(())
    }
}

/// Per-horizon calibration and capping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// EWMA spans in days
    #[serde(default = "default_horizons")]
    pub horizons: Vec<usize>,

    /// Average absolute forecast after scaling
    #[serde(default = "default_target_abs_forecast")]
    pub target_abs_forecast: f64,

    /// Forecasts are clipped to `[-cap, cap]`
    #[serde(default = "default_forecast_cap")]
    pub forecast_cap: f64,
}

fn default_horizons() -> Vec<usize> {
    vec![5, 20, 60, 120]
}

fn default_target_abs_forecast() -> f64 {
    10.0
}

fn default_forecast_cap() -> f64 {
    20.0
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizons: default_horizons(),
            target_abs_forecast: default_target_abs_forecast(),
            forecast_cap: default_forecast_cap(),
        }
    }
}

impl ForecastConfig {
    fn validate(&self) -> Result<(), CarryError> {
        if self.horizons.is_empty() {
            return Err(CarryError::InvalidConfig("no forecast horizons".to_string()));
        }
        let mut seen = HashSet::new();
        for &h in &self.horizons {
            if h == 0 {
                return Err(CarryError::InvalidConfig("horizon span must be > 0".to_string()));
            }
            if !seen.insert(h) {
                return Err(CarryError::InvalidConfig(format!("duplicate horizon {}", h)));
            }
        }
        if !(self.target_abs_forecast.is_finite() && self.target_abs_forecast > 0.0) {
            return Err(CarryError::InvalidConfig(format!(
                "target_abs_forecast must be positive, got {}",
                self.target_abs_forecast
            )));
        }
        if !(self.forecast_cap.is_finite() && self.forecast_cap > 0.0) {
            return Err(CarryError::InvalidConfig(format!(
                "forecast_cap must be positive, got {}",
                self.forecast_cap
            )));
        }
        Ok(())
    }
}

// =============================================================================
// SOURCE
// =============================================================================

/// Where raw front/further rows come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// SQLite database holding one table per symbol
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Table name, `{symbol}` is substituted
    #[serde(default = "default_table_template")]
    pub table_template: String,

    /// JSON array of raw rows, used instead of the database when set
    #[serde(default)]
    pub json_path: Option<PathBuf>,
}

fn default_table_template() -> String {
    "{symbol}_Data_Carry".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            table_template: default_table_template(),
            json_path: None,
        }
    }
}

impl SourceConfig {
    pub fn table_name(&self, symbol: &str) -> String {
        self.table_template.replace("{symbol}", symbol)
    }
}
