//! SQLite-backed `SensorStore`.
//!
//! Tags are kept as a JSON array in a TEXT column and ids are generated here
//! before the insert, since SQLite has no UUID default.

use super::{
    SensorStore, StoreError, StoreResult, map_read_error, map_write_error, schema_statements,
};
use crate::models::sensor::{Location, SensorMetadata};
use async_trait::async_trait;
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    types::Json,
};
use std::{str::FromStr, sync::Arc};
use tracing::debug;
use uuid::Uuid;

const SQLITE_SCHEMA: &str = include_str!("../../migrations/sqlite/0001_init.sql");

const SELECT_COLUMNS: &str =
    "id, name, description, latitude, longitude, tags, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteSensorStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteSensorStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Open (creating if missing) the database at `url`.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// A private in-memory database with the schema already applied.
    ///
    /// The pool is pinned to one connection that never expires, because every
    /// SQLite `:memory:` connection is its own database.
    #[cfg(test)]
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(Arc::new(pool));
        store.init_schema().await?;
        Ok(store)
    }

    /// Create the `sensor_metadata` table if it does not exist yet.
    pub async fn init_schema(&self) -> StoreResult<()> {
        for stmt in schema_statements(SQLITE_SCHEMA) {
            debug!(statement = stmt, "applying sqlite schema");
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SensorStore for SqliteSensorStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn create(&self, record: SensorMetadata) -> StoreResult<SensorMetadata> {
        let row = sqlx::query(&format!(
            "INSERT INTO sensor_metadata (
                id, name, description, latitude, longitude, tags, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.location.latitude)
        .bind(record.location.longitude)
        .bind(Json(&record.tags))
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| map_write_error(err, &record.name))?;

        row_to_sensor(&row)
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<SensorMetadata> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM sensor_metadata WHERE name = ?"
        ))
        .bind(name)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| map_read_error(err, name))?;

        row_to_sensor(&row)
    }

    async fn update(&self, record: SensorMetadata) -> StoreResult<SensorMetadata> {
        let row = sqlx::query(&format!(
            "UPDATE sensor_metadata
             SET name = ?, description = ?, latitude = ?, longitude = ?, tags = ?, updated_at = ?
             WHERE id = ?
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.location.latitude)
        .bind(record.location.longitude)
        .bind(Json(&record.tags))
        .bind(record.updated_at)
        .bind(record.id)
        .fetch_optional(&*self.db)
        .await
        .map_err(|err| map_write_error(err, &record.name))?;

        match row {
            Some(row) => row_to_sensor(&row),
            None => Err(StoreError::NotFound(record.name)),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}

fn row_to_sensor(row: &SqliteRow) -> StoreResult<SensorMetadata> {
    let tags: Json<Vec<String>> = row.try_get("tags")?;
    Ok(SensorMetadata {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        location: Location::new(row.try_get("latitude")?, row.try_get("longitude")?),
        tags: tags.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
