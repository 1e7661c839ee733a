//! Append-only SQLite store for metric samples.
//!
//! Every column is `TEXT` so numbers and the `N/A` sentinel share one type.
//! The database file is opened and closed around each operation; no
//! connection is held between cycles.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection, Row};
use tracing::{debug, error, info};

use super::model::MetricSample;

/// Error type for storage operations.
#[derive(Debug)]
pub enum StoreError {
    /// Table name is not a plain SQL identifier.
    InvalidTableName(String),
    /// Connection, DDL or DML failure.
    Database(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InvalidTableName(name) => write!(f, "invalid table name '{}'", name),
            StoreError::Database(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            StoreError::InvalidTableName(_) => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

/// Returns `true` if `name` can be used as an unquoted SQL identifier.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Append-only table of `MetricSample` rows.
#[derive(Debug, Clone)]
pub struct MetricStore {
    path: PathBuf,
    table: String,
    insert_sql: String,
}

impl MetricStore {
    /// Creates a store for `table` inside the SQLite file at `path`.
    ///
    /// Nothing is opened until the first operation.
    pub fn new(path: impl Into<PathBuf>, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        if !is_valid_table_name(&table) {
            return Err(StoreError::InvalidTableName(table));
        }

        let insert_sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            table,
            MetricSample::COLUMNS.join(", "),
            vec!["?"; MetricSample::COLUMNS.len()].join(", ")
        );

        Ok(Self {
            path: path.into(),
            table,
            insert_sql,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn connect(&self) -> Result<SqliteConnection, sqlx::Error> {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            .connect()
            .await
    }

    /// Creates the table if it does not exist. Safe to call repeatedly.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let columns = MetricSample::COLUMNS
            .iter()
            .map(|c| format!("\"{}\" TEXT", c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("CREATE TABLE IF NOT EXISTS \"{}\" ({})", self.table, columns);

        let mut conn = self.connect().await?;
        sqlx::query(&sql).execute(&mut conn).await?;
        conn.close().await?;

        debug!(path = %self.path.display(), table = %self.table, "schema ensured");
        Ok(())
    }

    /// Inserts one row. Returns `false` (after logging) if the write failed;
    /// the sample is dropped and the caller carries on.
    pub async fn append(&self, sample: &MetricSample) -> bool {
        match self.insert(sample).await {
            Ok(()) => {
                info!("[{}] data pushed to database", sample.timestamp);
                true
            }
            Err(e) => {
                error!(
                    path = %self.path.display(),
                    "failed to push data to database: {}", e
                );
                false
            }
        }
    }

    async fn insert(&self, sample: &MetricSample) -> Result<(), StoreError> {
        let mut query = sqlx::query(&self.insert_sql);
        for value in sample.to_row() {
            query = query.bind(value);
        }

        let mut conn = self.connect().await?;
        query.execute(&mut conn).await?;
        conn.close().await?;
        Ok(())
    }

    /// Returns the most recently appended row as column → stored text.
    pub async fn latest(&self) -> Result<Option<HashMap<String, String>>, StoreError> {
        let sql = format!(
            "SELECT {} FROM \"{}\" ORDER BY rowid DESC LIMIT 1",
            MetricSample::COLUMNS.join(", "),
            self.table
        );

        let mut conn = self.connect().await?;
        let row = sqlx::query(&sql).fetch_optional(&mut conn).await?;
        conn.close().await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut values = HashMap::with_capacity(MetricSample::COLUMNS.len());
        for (idx, column) in MetricSample::COLUMNS.iter().enumerate() {
            let value: String = row.try_get(idx)?;
            values.insert(column.to_string(), value);
        }
        Ok(Some(values))
    }

    /// Number of rows stored so far.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", self.table);

        let mut conn = self.connect().await?;
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&mut conn).await?;
        conn.close().await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::model::Metric;
    use tempfile::TempDir;

    fn sample(timestamp: &str) -> MetricSample {
        MetricSample {
            timestamp: timestamp.to_string(),
            cpu_usage_percent: Metric::new(12.5),
            cpu_temp_c: Metric::new(45.0),
            gpu_usage_percent: Metric::new(3.1),
            gpu_temp_c: Metric::unavailable(),
            ram_usage_percent: Metric::new(63.27),
            disk_usage_percent: Metric::new(71.0),
            service_statuses: "sshd: active | nginx: inactive".to_string(),
            device_statuses: "router: Offline".to_string(),
            network_latency_ms: Metric::unavailable(),
            download_mbps: Metric::unavailable(),
            upload_mbps: Metric::unavailable(),
        }
    }

    fn store_in(dir: &TempDir) -> MetricStore {
        MetricStore::new(dir.path().join("health_monitor.db"), "metrics").unwrap()
    }

    #[test]
    fn test_table_name_validation() {
        assert!(is_valid_table_name("metrics"));
        assert!(is_valid_table_name("_metrics_v2"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("2metrics"));
        assert!(!is_valid_table_name("metrics; DROP TABLE x"));
        assert!(matches!(
            MetricStore::new("x.db", "bad name"),
            Err(StoreError::InvalidTableName(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();

        let mut conn = store.connect().await.unwrap();
        let rows = sqlx::query("PRAGMA table_info(\"metrics\")")
            .fetch_all(&mut conn)
            .await
            .unwrap();
        let columns: Vec<(String, String)> = rows
            .iter()
            .map(|r| (r.get::<String, _>("name"), r.get::<String, _>("type")))
            .collect();

        assert_eq!(columns.len(), 12);
        for ((name, ty), expected) in columns.iter().zip(MetricSample::COLUMNS) {
            assert_eq!(name, expected);
            assert_eq!(ty, "TEXT");
        }
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.ensure_schema().await.unwrap();

        let written = sample("2024-05-01 12:00:00");
        assert!(store.append(&written).await);

        let row = store.latest().await.unwrap().unwrap();
        for (column, value) in MetricSample::COLUMNS.iter().zip(written.to_row()) {
            assert_eq!(row[*column], value, "column {}", column);
        }
        assert_eq!(row["cpu_temp_c"], "45.0");
        assert_eq!(row["gpu_temp_c"], "N/A");
        assert_eq!(row["ram_usage_percent"], "63.27");
    }

    #[tokio::test]
    async fn test_append_only_keeps_every_row() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.ensure_schema().await.unwrap();

        assert!(store.append(&sample("2024-05-01 12:00:00")).await);
        assert!(store.append(&sample("2024-05-01 12:00:00")).await);
        assert!(store.append(&sample("2024-05-01 12:02:00")).await);

        assert_eq!(store.count().await.unwrap(), 3);
        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest["timestamp"], "2024-05-01 12:02:00");
    }

    #[tokio::test]
    async fn test_append_failure_does_not_raise() {
        let dir = TempDir::new().unwrap();
        let store = MetricStore::new(dir.path().join("missing/dir/db.sqlite"), "metrics").unwrap();

        assert!(store.ensure_schema().await.is_err());
        assert!(!store.append(&sample("2024-05-01 12:00:00")).await);
        // The next attempt is made independently and fails the same way.
        assert!(!store.append(&sample("2024-05-01 12:02:00")).await);
    }

    #[tokio::test]
    async fn test_append_without_schema_fails_softly() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(!store.append(&sample("2024-05-01 12:00:00")).await);
        store.ensure_schema().await.unwrap();
        assert!(store.append(&sample("2024-05-01 12:02:00")).await);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_latest_on_empty_table() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.ensure_schema().await.unwrap();

        assert!(store.latest().await.unwrap().is_none());
    }
}
