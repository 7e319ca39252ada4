//! Storage gateway for sensor metadata.
//!
//! `SensorStore` is the backend-agnostic contract the service layer talks to.
//! SQLite and PostgreSQL implementations live in their own modules; both own a
//! single `sensor_metadata` table with a unique `name` column.

use crate::models::sensor::SensorMetadata;
use async_trait::async_trait;
use thiserror::Error;

pub mod postgres;
pub mod seed;
pub mod sqlite;

pub use postgres::PostgresSensorStore;
pub use sqlite::SqliteSensorStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sensor `{0}` not found")]
    NotFound(String),
    #[error("sensor `{0}` already exists")]
    Conflict(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for sensor metadata records.
///
/// Implementations are shared across request handlers behind an `Arc`, so they
/// must be `Send + Sync`. None of the operations take a lock or a version:
/// concurrent writers to the same row race and the last one wins.
#[async_trait]
pub trait SensorStore: Send + Sync {
    /// Short backend label used in logs.
    fn backend(&self) -> &'static str;

    /// Insert a new record. The backend assigns `id` and returns the stored row.
    ///
    /// Fails with `Conflict` when `name` is already taken.
    async fn create(&self, record: SensorMetadata) -> StoreResult<SensorMetadata>;

    /// Exact, case-sensitive lookup on the stored name.
    async fn get_by_name(&self, name: &str) -> StoreResult<SensorMetadata>;

    /// Overwrite every mutable column of the row identified by `record.id`.
    ///
    /// Fails with `NotFound` if the row is gone and `Conflict` if the new name
    /// belongs to another row.
    async fn update(&self, record: SensorMetadata) -> StoreResult<SensorMetadata>;

    /// Round-trip a trivial query to check the connection pool.
    async fn ping(&self) -> StoreResult<()>;
}

/// Split an embedded SQL script into executable statements.
///
/// Comment-only fragments are dropped so a trailing comment never reaches the
/// driver as an empty statement.
pub(crate) fn schema_statements(script: &str) -> Vec<&str> {
    script
        .split(';')
        .map(str::trim)
        .filter(|stmt| {
            stmt.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            })
        })
        .collect()
}

/// Map a write error, turning unique-constraint violations into `Conflict`.
pub(crate) fn map_write_error(err: sqlx::Error, name: &str) -> StoreError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(name.to_string())
        }
        other => StoreError::Sqlx(other),
    }
}

/// Map a lookup error, turning a missing row into `NotFound`.
pub(crate) fn map_read_error(err: sqlx::Error, name: &str) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound(name.to_string()),
        other => StoreError::Sqlx(other),
    }
}
