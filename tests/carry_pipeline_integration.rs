//! Integration tests: SQLite source → cleaning → carry pipeline → JSON.
//!
//! Fixtures are generated into a temporary directory; nothing is read from
//! the repository.

use chrono::{Duration, NaiveDate};
use rusqlite::{params, Connection};
use std::path::PathBuf;

use carry_signal::config::{SignalConfig, SourceConfig, VolatilityConfig};
use carry_signal::report::CarrySummary;
use carry_signal::source::{self, DropReason, PriceSource, SqlitePriceSource};
use carry_signal::{AppConfig, CarryError, CarryPipeline};

/// Front drifts upward with a one-day oscillation and trades 2.0 over the
/// further contract.
fn create_fixture(dir: &tempfile::TempDir, symbol: &str, n: usize) -> PathBuf {
    let db_path = dir.path().join("carry.db");
    let mut conn = Connection::open(&db_path).expect("Failed to create fixture database");

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE "{}_Data_Carry" (
            symbol TEXT,
            date TEXT,
            front_price REAL,
            front_expiration INTEGER,
            further_price REAL,
            further_expiration INTEGER
        );
        "#,
        symbol
    ))
    .expect("Failed to create carry table");

    let start = NaiveDate::from_ymd_opt(2012, 1, 2).unwrap();
    let tx = conn.transaction().unwrap();
    {
        let mut stmt = tx
            .prepare(&format!(
                r#"INSERT INTO "{}_Data_Carry" VALUES (?1, ?2, ?3, 202401, ?4, 202404)"#,
                symbol
            ))
            .unwrap();
        for i in 0..n {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            let front = 100.0 + 0.01 * i as f64 + 0.5 * sign;
            let date = (start + Duration::days(i as i64)).to_string();
            stmt.execute(params![symbol, date, front, front - 2.0]).unwrap();
        }
    }
    tx.commit().unwrap();
    db_path
}

fn source_config(db_path: PathBuf) -> SourceConfig {
    SourceConfig {
        db_path: Some(db_path),
        ..SourceConfig::default()
    }
}

#[test]
fn test_sqlite_to_forecast_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = create_fixture(&dir, "RB", 3000);

    let source = SqlitePriceSource::new(&source_config(db_path)).unwrap();
    let batch = source.fetch("RB").unwrap();
    assert!(batch.report.is_clean());
    assert_eq!(batch.rows.len(), 3000);

    let series = CarryPipeline::default().run("RB", &batch.rows).unwrap();
    assert_eq!(series.len(), 3000);
    assert!(series.fdm() >= 1.0 - 1e-9);

    let summary = CarrySummary::from_series(&series);
    assert_eq!(summary.forecast_rows, 440);
    assert!(summary.min_forecast >= -20.0);
    assert!(summary.max_forecast <= 20.0);
    assert!(summary.latest_forecast.unwrap() > 0.0);
}

#[test]
fn test_dirty_rows_are_reported_not_printed() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = create_fixture(&dir, "CL", 80);
    {
        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            r#"INSERT INTO "CL_Data_Carry" VALUES ('CL', '2012-01-05', 101.0, 202401, 99.0, 202404)"#,
            [],
        )
        .unwrap();
        conn.execute(
            r#"INSERT INTO "CL_Data_Carry" VALUES ('CL', '2013-06-01', NULL, 202401, 99.0, 202404)"#,
            [],
        )
        .unwrap();
    }

    let config = AppConfig {
        source: source_config(db_path),
        signal: SignalConfig {
            volatility: VolatilityConfig {
                short_window: 5,
                long_window: 20,
                ..VolatilityConfig::default()
            },
            ..SignalConfig::default()
        },
    };

    let source = source::from_config(&config.source).unwrap();
    let batch = source.fetch("CL").unwrap();

    assert_eq!(batch.report.rows_read, 82);
    assert_eq!(batch.report.rows_kept, 80);
    assert_eq!(batch.report.count(|r| *r == DropReason::DuplicateDate), 1);
    assert_eq!(
        batch
            .report
            .count(|r| matches!(r, DropReason::MissingField(f) if f == "front_price")),
        1
    );

    let series = CarryPipeline::new(config.signal).run("CL", &batch.rows).unwrap();
    assert_eq!(series.len(), 80);
}

#[test]
fn test_series_serializes_undefined_as_null() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = create_fixture(&dir, "NG", 60);
    let batch = SqlitePriceSource::new(&source_config(db_path))
        .unwrap()
        .fetch("NG")
        .unwrap();

    let config = SignalConfig {
        volatility: VolatilityConfig {
            short_window: 5,
            long_window: 20,
            ..VolatilityConfig::default()
        },
        ..SignalConfig::default()
    };
    let series = CarryPipeline::new(config).run("NG", &batch.rows).unwrap();
    let json: serde_json::Value = serde_json::to_value(&series).unwrap();

    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 60);
    assert!(rows[0]["daily_std_returns"].is_null());
    assert!(rows[0]["capped_combined_forecast"].is_null());
    assert!(rows[59]["capped_combined_forecast"].is_number());
    assert_eq!(rows[59]["horizons"].as_array().unwrap().len(), 4);
    assert!(json["fdm"].is_number());
    assert_eq!(json["correlation"]["horizons"], serde_json::json!([5, 20, 60, 120]));
}

#[test]
fn test_malformed_expiry_surfaces_from_stored_data() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = create_fixture(&dir, "HO", 40);
    {
        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            r#"UPDATE "HO_Data_Carry" SET further_expiration = 202313 WHERE date = '2012-01-10'"#,
            [],
        )
        .unwrap();
    }

    let batch = SqlitePriceSource::new(&source_config(db_path))
        .unwrap()
        .fetch("HO")
        .unwrap();
    let err = CarryPipeline::default().run("HO", &batch.rows).unwrap_err();
    match err {
        CarryError::MalformedExpiry {
            index,
            further_expiration,
            ..
        } => {
            assert_eq!(index, 8);
            assert_eq!(further_expiration, 202313);
        }
        other => panic!("expected malformed expiry, got {}", other),
    }
}
