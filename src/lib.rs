//! Carry Signal Library
//!
//! Risk-adjusted, multi-horizon carry forecasts for futures term structures.
//! `source` fetches and cleans front/further rows, `carry` turns them into a
//! bounded forecast, `report` summarizes the result.

pub mod carry;
pub mod config;
pub mod models;
pub mod report;
pub mod source;

pub use carry::{CarryError, CarryPipeline, CarrySeries};
pub use config::{AppConfig, SignalConfig, SourceConfig};
pub use models::{CarryRow, PriceSeriesRow};
