//! PostgreSQL-backed `SensorStore`.

use super::{
    SensorStore, StoreError, StoreResult, map_read_error, map_write_error, schema_statements,
};
use crate::{
    config::{PostgresParams, SslMode},
    models::sensor::{Location, SensorMetadata},
};
use async_trait::async_trait;
use sqlx::{
    PgPool, Row,
    postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode},
};
use std::{str::FromStr, sync::Arc};
use tracing::{debug, info};

const POSTGRES_SCHEMA: &str = include_str!("../../migrations/postgres/0001_init.sql");

const SELECT_COLUMNS: &str =
    "id, name, description, latitude, longitude, tags, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresSensorStore {
    pool: Arc<PgPool>,
    schema: Option<String>,
}

impl PostgresSensorStore {
    /// Connect using a full `postgres://` URL.
    pub async fn from_url(
        url: &str,
        schema: Option<String>,
        max_connections: u32,
    ) -> StoreResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, schema, max_connections).await
    }

    /// Connect using discrete host/user/password/database parameters.
    pub async fn from_params(params: &PostgresParams, max_connections: u32) -> StoreResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.db_name);

        if let Some(user) = params.user.as_deref() {
            opts = opts.username(user);
        }
        if let Some(pass) = params.password.as_deref() {
            opts = opts.password(pass);
        }
        if let Some(mode) = params.ssl_mode {
            opts = opts.ssl_mode(match mode {
                SslMode::Disable => PgSslMode::Disable,
                SslMode::Prefer => PgSslMode::Prefer,
                SslMode::Require => PgSslMode::Require,
            });
        }

        info!(
            host = %params.host,
            port = params.port,
            database = %params.db_name,
            username = params.user.as_deref().unwrap_or("<none>"),
            ssl_mode = ?params.ssl_mode,
            "connecting to postgres"
        );

        Self::connect(opts, params.schema_name.clone(), max_connections).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        schema: Option<String>,
        max_connections: u32,
    ) -> StoreResult<Self> {
        if let Some(schema) = schema.as_deref() {
            opts = opts.options([("search_path", search_path(schema))]);
        }
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
            schema,
        })
    }

    /// Create the schema (if configured), the `uuid-ossp` extension and the
    /// `sensor_metadata` table.
    pub async fn init_schema(&self) -> StoreResult<()> {
        if let Some(schema) = self.schema.as_deref() {
            let stmt = format!(
                "CREATE SCHEMA IF NOT EXISTS \"{}\"",
                schema.replace('"', "\"\"")
            );
            sqlx::query(&stmt).execute(&*self.pool).await?;
        }
        for stmt in schema_statements(POSTGRES_SCHEMA) {
            debug!(statement = stmt, "applying postgres schema");
            sqlx::query(stmt).execute(&*self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SensorStore for PostgresSensorStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, record: SensorMetadata) -> StoreResult<SensorMetadata> {
        let row = sqlx::query(&format!(
            "INSERT INTO sensor_metadata (
                name, description, latitude, longitude, tags, created_at, updated_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.location.latitude)
        .bind(record.location.longitude)
        .bind(&record.tags)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|err| map_write_error(err, &record.name))?;

        row_to_sensor(&row)
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<SensorMetadata> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM sensor_metadata WHERE name = $1"
        ))
        .bind(name)
        .fetch_one(&*self.pool)
        .await
        .map_err(|err| map_read_error(err, name))?;

        row_to_sensor(&row)
    }

    async fn update(&self, record: SensorMetadata) -> StoreResult<SensorMetadata> {
        let row = sqlx::query(&format!(
            "UPDATE sensor_metadata
             SET name = $1, description = $2, latitude = $3, longitude = $4,
                 tags = $5, updated_at = $6
             WHERE id = $7
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.location.latitude)
        .bind(record.location.longitude)
        .bind(&record.tags)
        .bind(record.updated_at)
        .bind(record.id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|err| map_write_error(err, &record.name))?;

        match row {
            Some(row) => row_to_sensor(&row),
            None => Err(StoreError::NotFound(record.name)),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&*self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_sensor(row: &PgRow) -> StoreResult<SensorMetadata> {
    Ok(SensorMetadata {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        location: Location::new(row.try_get("latitude")?, row.try_get("longitude")?),
        tags: row.try_get("tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// `public` stays on the path: `uuid-ossp` may already be installed there.
fn search_path(schema: &str) -> String {
    if schema == "public" {
        schema.to_string()
    } else {
        format!("{schema},public")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_keeps_public_as_fallback() {
        assert_eq!(search_path("sensors"), "sensors,public");
        assert_eq!(search_path("public"), "public");
    }
}
