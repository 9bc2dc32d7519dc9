use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

use crate::source::cleaning::{clean_records, RawPriceRecord, SourceBatch};
use crate::source::PriceSource;

/// Price source reading a JSON array of raw records. Records for other
/// symbols are skipped; records without a symbol are kept so cleaning
/// reports them.
pub struct JsonFilePriceSource {
    path: PathBuf,
}

impl JsonFilePriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PriceSource for JsonFilePriceSource {
    fn name(&self) -> &str {
        "json"
    }

    fn fetch(&self, symbol: &str) -> Result<SourceBatch> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let records: Vec<RawPriceRecord> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;

        let total = records.len();
        let records: Vec<RawPriceRecord> = records
            .into_iter()
            .filter(|r| r.symbol.as_deref().map_or(true, |s| s == symbol))
            .collect();

        debug!(symbol, total, matched = records.len(), "Loaded JSON price records");
        Ok(clean_records(symbol, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_filters_symbol_and_reports_nulls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"symbol": "RB", "date": "2024-01-02", "front_price": 2.1, "front_expiration": 202401, "further_price": 2.0, "further_expiration": 202402}},
                {{"symbol": "CL", "date": "2024-01-02", "front_price": 71.0, "front_expiration": 202402, "further_price": 70.5, "further_expiration": 202403}},
                {{"symbol": "RB", "date": "2024-01-03", "front_price": null, "front_expiration": 202401, "further_price": 2.0, "further_expiration": 202402}},
                {{"date": "2024-01-04", "front_price": 2.2, "front_expiration": 202401, "further_price": 2.1, "further_expiration": 202402}}
            ]"#
        )
        .unwrap();

        let batch = JsonFilePriceSource::new(file.path()).fetch("RB").unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.report.rows_read, 3);
        assert_eq!(batch.report.dropped.len(), 2);
    }

    #[test]
    fn test_invalid_json_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(JsonFilePriceSource::new(file.path()).fetch("RB").is_err());
    }
}
