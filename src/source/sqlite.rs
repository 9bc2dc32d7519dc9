//! SQLite-backed price source
//!
//! One table per symbol (default `"{symbol}_Data_Carry"`) with columns
//! `symbol, date, front_price, front_expiration, further_price,
//! further_expiration`. The database is opened read-only.

use anyhow::{bail, Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::PathBuf;
use tracing::debug;

use crate::config::SourceConfig;
use crate::source::cleaning::{clean_records, RawPriceRecord, SourceBatch};
use crate::source::PriceSource;

pub struct SqlitePriceSource {
    db_path: PathBuf,
    config: SourceConfig,
}

impl SqlitePriceSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let db_path = config
            .db_path
            .clone()
            .context("source.db_path is not configured")?;
        Ok(Self {
            db_path,
            config: config.clone(),
        })
    }

    fn table_name(&self, symbol: &str) -> Result<String> {
        // Table names cannot be bound as parameters.
        if symbol.is_empty()
            || !symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            bail!("Invalid symbol for table lookup: {:?}", symbol);
        }
        Ok(self.config.table_name(symbol))
    }

    fn open(&self) -> Result<Connection> {
        Connection::open_with_flags(&self.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open database at {}", self.db_path.display()))
    }
}

impl PriceSource for SqlitePriceSource {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn fetch(&self, symbol: &str) -> Result<SourceBatch> {
        let table = self.table_name(symbol)?;
        let conn = self.open()?;

        let sql = format!(
            "SELECT symbol, date, front_price, front_expiration, further_price, further_expiration \
             FROM \"{}\"",
            table
        );
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("Failed to query table {}", table))?;

        let records = stmt
            .query_map([], read_record)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read rows from {}", table))?;

        debug!(symbol, table = %table, rows = records.len(), "Fetched raw rows");
        Ok(clean_records(symbol, records))
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<RawPriceRecord> {
    Ok(RawPriceRecord {
        symbol: opt_text(row, 0)?,
        date: opt_text(row, 1)?,
        front_price: opt_f64(row, 2)?,
        front_expiration: opt_i64(row, 3)?,
        further_price: opt_f64(row, 4)?,
        further_expiration: opt_i64(row, 5)?,
    })
}

fn opt_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Blob(_) => None,
    })
}

fn opt_f64(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Real(f) => Some(f),
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok().and_then(|s| s.trim().parse().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

/// Expirations are sometimes stored as REAL or TEXT.
fn opt_i64(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok().and_then(|s| s.trim().parse().ok()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn fixture(rows: &[(&str, Option<f64>, f64)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("carry.db")).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE "RB_Data_Carry" (
                symbol TEXT,
                date TEXT,
                front_price REAL,
                front_expiration INTEGER,
                further_price REAL,
                further_expiration INTEGER
            );
            "#,
        )
        .unwrap();
        for (date, front, further) in rows {
            conn.execute(
                r#"INSERT INTO "RB_Data_Carry" VALUES ('RB', ?1, ?2, 202401, ?3, 202402)"#,
                params![date, front, further],
            )
            .unwrap();
        }
        dir
    }

    fn source(dir: &tempfile::TempDir) -> SqlitePriceSource {
        SqlitePriceSource::new(&SourceConfig {
            db_path: Some(dir.path().join("carry.db")),
            ..SourceConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_fetch_cleans_rows() {
        let dir = fixture(&[
            ("2024-01-03", Some(2.2), 2.1),
            ("2024-01-02", Some(2.1), 2.0),
            ("2024-01-04", None, 2.2),
        ]);
        let batch = source(&dir).fetch("RB").unwrap();

        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.rows[0].date.to_string(), "2024-01-02");
        assert_eq!(batch.rows[0].front_expiration, 202401);
        assert_eq!(batch.report.rows_read, 3);
        assert_eq!(batch.report.dropped.len(), 1);
    }

    #[test]
    fn test_missing_table_errors() {
        let dir = fixture(&[]);
        assert!(source(&dir).fetch("CL").is_err());
    }

    #[test]
    fn test_rejects_injection_symbol() {
        let dir = fixture(&[]);
        assert!(source(&dir).fetch("RB\"; DROP TABLE x; --").is_err());
    }

    #[test]
    fn test_custom_table_template() {
        let dir = fixture(&[("2024-01-02", Some(2.1), 2.0)]);
        let conn = Connection::open(dir.path().join("carry.db")).unwrap();
        conn.execute_batch(r#"ALTER TABLE "RB_Data_Carry" RENAME TO "carry_RB""#).unwrap();

        let source = SqlitePriceSource::new(&SourceConfig {
            db_path: Some(dir.path().join("carry.db")),
            table_template: "carry_{symbol}".to_string(),
            ..SourceConfig::default()
        })
        .unwrap();
        assert_eq!(source.table_name("RB").unwrap(), "carry_RB");
        assert_eq!(source.fetch("RB").unwrap().rows.len(), 1);
    }

    #[test]
    fn test_requires_db_path() {
        assert!(SqlitePriceSource::new(&SourceConfig::default()).is_err());
    }
}
