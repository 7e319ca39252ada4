//! src/services/sensor_service.rs
//!
//! SensorService - validation and merge rules on top of a `SensorStore`.
//! Handlers decode request bodies through [`parse_body`] and hand typed
//! payloads to the service; the service never sees HTTP types.

use crate::{
    models::sensor::{NewSensor, SensorMetadata, SensorPatch},
    store::{SensorStore, StoreError},
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("sensor `{0}` not found")]
    NotFound(String),
    #[error("sensor `{0}` already exists")]
    Conflict(String),
    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for SensorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => SensorError::NotFound(name),
            StoreError::Conflict(name) => SensorError::Conflict(name),
            other => SensorError::Storage(other),
        }
    }
}

pub type SensorResult<T> = Result<T, SensorError>;

/// Decode a JSON request body, reporting any syntax or shape error as
/// `InvalidInput`.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> SensorResult<T> {
    serde_json::from_slice(body).map_err(|err| SensorError::InvalidInput(err.to_string()))
}

/// SensorService provides the three sensor operations:
/// - Create a record after validating name and location
/// - Get a record by (lower-cased) name
/// - Patch a record by name, merging supplied fields over the stored ones
///
/// It holds no state besides the store handle and is cheap to clone.
#[derive(Clone)]
pub struct SensorService {
    store: Arc<dyn SensorStore>,
}

impl SensorService {
    pub fn new(store: Arc<dyn SensorStore>) -> Self {
        Self { store }
    }

    /// Backend connectivity check used by the readiness endpoint.
    pub async fn ping(&self) -> SensorResult<()> {
        self.store.ping().await.map_err(SensorError::Storage)
    }

    /// Validate and insert a new sensor.
    ///
    /// Rejects an empty name or a zero location before touching storage.
    /// Both timestamps are stamped with the same instant.
    pub async fn create(&self, payload: NewSensor) -> SensorResult<SensorMetadata> {
        if payload.name.is_empty() || payload.location.is_zero() {
            return Err(SensorError::InvalidInput(
                "sensor name and location are required".into(),
            ));
        }

        let record = payload.into_record(Utc::now());
        let stored = self.store.create(record).await?;
        info!(id = %stored.id, name = %stored.name, "created sensor metadata");
        Ok(stored)
    }

    /// Fetch a sensor by name. The name is lower-cased before the lookup.
    pub async fn get(&self, name: &str) -> SensorResult<SensorMetadata> {
        let name = name.to_lowercase();
        debug!(name = %name, backend = self.store.backend(), "fetching sensor metadata");
        Ok(self.store.get_by_name(&name).await?)
    }

    /// Merge `patch` onto the stored record for `name` and write it back.
    ///
    /// A missing record at the fetch step is `NotFound`. If the row vanishes
    /// between the read and the write, that surfaces as a storage failure:
    /// the two steps are not transactional and the last writer wins.
    pub async fn update(&self, name: &str, patch: SensorPatch) -> SensorResult<SensorMetadata> {
        let mut record = self.get(name).await?;
        patch.apply(&mut record, Utc::now());

        let stored = self.store.update(record).await.map_err(|err| match err {
            StoreError::NotFound(_) => SensorError::Storage(err),
            other => SensorError::from(other),
        })?;
        info!(id = %stored.id, name = %stored.name, "updated sensor metadata");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::sensor::Location, store::SqliteSensorStore};
    use std::time::Duration;

    async fn service() -> SensorService {
        let store = SqliteSensorStore::in_memory().await.unwrap();
        SensorService::new(Arc::new(store))
    }

    fn new_sensor(name: &str) -> NewSensor {
        NewSensor {
            name: name.into(),
            description: "desc".into(),
            location: Location::new(1.0, 2.0),
            tags: Some(vec!["t".into()]),
        }
    }

    #[tokio::test]
    async fn create_rejects_empty_name_and_zero_location() {
        let svc = service().await;

        let mut no_name = new_sensor("");
        no_name.location = Location::new(1.0, 1.0);
        assert!(matches!(
            svc.create(no_name).await,
            Err(SensorError::InvalidInput(_))
        ));

        let mut no_location = new_sensor("sensor");
        no_location.location = Location::default();
        assert!(matches!(
            svc.create(no_location).await,
            Err(SensorError::InvalidInput(_))
        ));

        assert!(matches!(
            svc.get("sensor").await,
            Err(SensorError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn created_sensor_is_reachable_by_any_case() {
        let svc = service().await;
        let created = svc.create(new_sensor("Proximity")).await.unwrap();

        assert_eq!(created.created_at, created.updated_at);
        let fetched = svc.get("PROXIMITY").await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.name, "proximity");
    }

    #[tokio::test]
    async fn duplicate_create_is_a_conflict() {
        let svc = service().await;
        svc.create(new_sensor("dup")).await.unwrap();
        assert!(matches!(
            svc.create(new_sensor("dup")).await,
            Err(SensorError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn update_with_tags_only_keeps_other_fields() {
        let svc = service().await;
        let created = svc.create(new_sensor("humidity")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let patch = parse_body::<SensorPatch>(br#"{"tags":["x"]}"#).unwrap();
        let updated = svc.update("Humidity", patch).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "humidity");
        assert_eq!(updated.location, created.location);
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.tags, vec!["x".to_string()]);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn update_keeping_name_does_not_conflict_with_itself() {
        let svc = service().await;
        svc.create(new_sensor("light")).await.unwrap();

        let patch = parse_body::<SensorPatch>(br#"{"name":"light"}"#).unwrap();
        let updated = svc.update("light", patch).await.unwrap();
        assert_eq!(updated.name, "light");
    }

    #[tokio::test]
    async fn update_can_rename() {
        let svc = service().await;
        svc.create(new_sensor("old")).await.unwrap();

        let patch = parse_body::<SensorPatch>(br#"{"name":"New"}"#).unwrap();
        svc.update("old", patch).await.unwrap();

        assert!(svc.get("new").await.is_ok());
        assert!(matches!(svc.get("old").await, Err(SensorError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_of_missing_sensor_is_not_found() {
        let svc = service().await;
        let err = svc
            .update("nobody", SensorPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SensorError::NotFound(name) if name == "nobody"));
    }

    #[test]
    fn parse_body_reports_malformed_json_as_invalid_input() {
        let err = parse_body::<NewSensor>(br#"{"invalid": "data""#).unwrap_err();
        assert!(matches!(err, SensorError::InvalidInput(_)));
    }
}
