//! Test helpers shared by unit and integration tests.

use std::sync::Once;

use chrono::{DateTime, Utc};
use sqlpoll_config::shared::SourceConfig;

use crate::source::TableSource;
use crate::types::{RawRow, SqlValue};

static TRACING_INIT: Once = Once::new();

/// Initializes tracing output for tests, honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_test_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A valid source configuration pointing at a local test database.
pub fn test_source_config(table_name: &str, poll_interval_secs: f64) -> SourceConfig {
    SourceConfig {
        db_uri: "postgres://localhost/sqlpoll_tests".to_string(),
        table_name: table_name.to_string(),
        poll_interval_secs,
        max_read_timeouts: SourceConfig::DEFAULT_MAX_READ_TIMEOUTS,
        connect_timeout_secs: SourceConfig::DEFAULT_CONNECT_TIMEOUT_SECS,
    }
}

/// A representative row for `source` carrying an explicit source timestamp.
///
/// Starts from the source's own synthetic row so every other column holds a
/// valid value, then pins the watermark column.
pub fn row_at<S: TableSource>(source: &S, timestamp: DateTime<Utc>) -> RawRow {
    let mut row = source.simulated_row();
    row.insert("time", SqlValue::Timestamp(timestamp));
    row
}
