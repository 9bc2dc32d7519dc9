//! Row cleaning shared by every price source.
//!
//! Raw rows may carry nulls, unparseable dates, non-finite prices and
//! duplicate dates. Cleaning drops them, sorts by date, and records each
//! drop in a [`CleaningReport`] the caller can inspect or log.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

use crate::models::PriceSeriesRow;

/// A row as stored upstream, every field nullable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRecord {
    pub symbol: Option<String>,
    pub date: Option<String>,
    pub front_price: Option<f64>,
    pub front_expiration: Option<i64>,
    pub further_price: Option<f64>,
    pub further_expiration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingField(String),
    NonFinitePrice(String),
    UnparseableDate(String),
    DuplicateDate,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing {}", field),
            Self::NonFinitePrice(field) => write!(f, "non-finite {}", field),
            Self::UnparseableDate(raw) => write!(f, "unparseable date '{}'", raw),
            Self::DuplicateDate => write!(f, "duplicate date"),
        }
    }
}

/// One dropped upstream row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRow {
    /// Position in the upstream result set
    pub index: usize,
    pub date: Option<String>,
    pub reason: DropReason,
}

/// What cleaning did to a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub symbol: String,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped: Vec<DroppedRow>,
}

impl CleaningReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }

    pub fn count(&self, predicate: impl Fn(&DropReason) -> bool) -> usize {
        self.dropped.iter().filter(|d| predicate(&d.reason)).count()
    }

    /// Emit the report through `tracing`, one warning per dropped row.
    pub fn log(&self) {
        if self.is_clean() {
            info!(
                symbol = %self.symbol,
                rows = self.rows_kept,
                "Source rows clean"
            );
            return;
        }
        warn!(
            symbol = %self.symbol,
            read = self.rows_read,
            kept = self.rows_kept,
            dropped = self.dropped.len(),
            "⚠️ Dropped rows during cleaning"
        );
        for d in &self.dropped {
            warn!(
                symbol = %self.symbol,
                index = d.index,
                date = d.date.as_deref().unwrap_or("-"),
                reason = %d.reason,
                "dropped row"
            );
        }
    }
}

/// Clean rows plus the report describing what was removed
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub rows: Vec<PriceSeriesRow>,
    pub report: CleaningReport,
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time of day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn to_row(record: &RawPriceRecord) -> Result<PriceSeriesRow, DropReason> {
    let missing = |field: &str| DropReason::MissingField(field.to_string());

    let symbol = record.symbol.clone().ok_or_else(|| missing("symbol"))?;
    let raw_date = record.date.as_deref().ok_or_else(|| missing("date"))?;
    let front_price = record.front_price.ok_or_else(|| missing("front_price"))?;
    let front_expiration = record
        .front_expiration
        .ok_or_else(|| missing("front_expiration"))?;
    let further_price = record.further_price.ok_or_else(|| missing("further_price"))?;
    let further_expiration = record
        .further_expiration
        .ok_or_else(|| missing("further_expiration"))?;

    if !front_price.is_finite() {
        return Err(DropReason::NonFinitePrice("front_price".to_string()));
    }
    if !further_price.is_finite() {
        return Err(DropReason::NonFinitePrice("further_price".to_string()));
    }

    let date =
        parse_date(raw_date).ok_or_else(|| DropReason::UnparseableDate(raw_date.to_string()))?;

    Ok(PriceSeriesRow {
        symbol,
        date,
        front_price,
        front_expiration,
        further_price,
        further_expiration,
    })
}

/// Drop incomplete rows, sort ascending by date, keep the first row seen
/// for each date.
pub fn clean_records(symbol: &str, records: Vec<RawPriceRecord>) -> SourceBatch {
    let mut report = CleaningReport {
        symbol: symbol.to_string(),
        rows_read: records.len(),
        ..CleaningReport::default()
    };

    let mut parsed: Vec<(usize, PriceSeriesRow)> = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match to_row(record) {
            Ok(row) => parsed.push((index, row)),
            Err(reason) => report.dropped.push(DroppedRow {
                index,
                date: record.date.clone(),
                reason,
            }),
        }
    }

    // Stable: among equal dates the earliest upstream row stays first.
    parsed.sort_by_key(|(_, row)| row.date);

    let mut seen = HashSet::with_capacity(parsed.len());
    let mut rows = Vec::with_capacity(parsed.len());
    for (index, row) in parsed {
        if seen.insert(row.date) {
            rows.push(row);
        } else {
            report.dropped.push(DroppedRow {
                index,
                date: Some(row.date.to_string()),
                reason: DropReason::DuplicateDate,
            });
        }
    }

    report.dropped.sort_by_key(|d| d.index);
    report.rows_kept = rows.len();

    SourceBatch { rows, report }
}
