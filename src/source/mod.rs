//! Upstream price data
//!
//! Fetches raw front/further rows for a symbol and returns them cleaned,
//! ordered, and accompanied by a [`CleaningReport`]. Connection details
//! come from [`SourceConfig`] at construction time.

pub mod cleaning;
pub mod json_file;
pub mod sqlite;

use anyhow::{bail, Result};

use crate::config::SourceConfig;

pub use cleaning::{
    clean_records, CleaningReport, DropReason, DroppedRow, RawPriceRecord, SourceBatch,
};
pub use json_file::JsonFilePriceSource;
pub use sqlite::SqlitePriceSource;

/// Supplier of clean price series
pub trait PriceSource: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str) -> Result<SourceBatch>;
}

/// Pick a backend from configuration. A JSON path wins over a database.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn PriceSource>> {
    if let Some(path) = &config.json_path {
        return Ok(Box::new(JsonFilePriceSource::new(path.clone())));
    }
    if config.db_path.is_some() {
        return Ok(Box::new(SqlitePriceSource::new(config)?));
    }
    bail!("No price source configured: set source.db_path or source.json_path")
}
