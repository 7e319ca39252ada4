//! Represents a physical sensor and the payloads used to create or patch one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// GPS position of a sensor.
///
/// The zero pair `{0, 0}` doubles as "no location supplied", so it is never
/// accepted as a real position.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Location {
    #[serde(default, deserialize_with = "null_as_default")]
    pub latitude: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub longitude: f64,
}

/// Read an explicit `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both coordinates are zero.
    pub fn is_zero(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// A stored sensor metadata record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SensorMetadata {
    /// Backend-assigned identifier. `Uuid::nil()` until the record is stored.
    pub id: Uuid,

    /// Unique, lower-cased lookup key.
    pub name: String,

    pub description: String,

    pub location: Location,

    /// Free-form tags, insertion order preserved.
    pub tags: Vec<String>,

    /// Set once when the record is created.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every successful write.
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /sensor-metadata`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct NewSensor {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub location: Location,

    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl NewSensor {
    /// Build a record ready for insertion, stamping both timestamps with `now`.
    pub fn into_record(self, now: DateTime<Utc>) -> SensorMetadata {
        SensorMetadata {
            id: Uuid::nil(),
            name: self.name.to_lowercase(),
            description: self.description,
            location: self.location,
            tags: self.tags.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request body for `PUT /sensor-metadata/{name}`.
///
/// Absent (or `null`) fields leave the stored value untouched. An empty name
/// or a zero location can never be a valid value, so they count as absent
/// too. Tags are the one field where an empty value is meaningful: `[]`
/// clears them.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct SensorPatch {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub location: Option<Location>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl SensorPatch {
    /// Overlay the supplied fields onto `record` and refresh `updated_at`.
    pub fn apply(self, record: &mut SensorMetadata, now: DateTime<Utc>) {
        if let Some(name) = self.name.filter(|n| !n.is_empty()) {
            record.name = name.to_lowercase();
        }
        if let Some(location) = self.location.filter(|l| !l.is_zero()) {
            record.location = location;
        }
        if let Some(tags) = self.tags {
            record.tags = tags;
        }
        record.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stored(now: DateTime<Utc>) -> SensorMetadata {
        SensorMetadata {
            id: Uuid::new_v4(),
            name: "pressure".into(),
            description: "barometric".into(),
            location: Location::new(40.47202, -80.01342),
            tags: vec!["tag3".into(), "tag4".into()],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn new_sensor_lowercases_name_and_stamps_both_timestamps() {
        let now = Utc::now();
        let payload: NewSensor = serde_json::from_str(
            r#"{"name":"Proximity","location":{"latitude":1,"longitude":2}}"#,
        )
        .unwrap();

        let record = payload.into_record(now);
        assert_eq!(record.name, "proximity");
        assert_eq!(record.description, "");
        assert!(record.tags.is_empty());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn new_sensor_reads_null_fields_as_defaults() {
        let payload: NewSensor = serde_json::from_str(
            r#"{"name":null,"description":null,"location":{"latitude":null,"longitude":-76.8}}"#,
        )
        .unwrap();

        assert_eq!(payload.name, "");
        assert_eq!(payload.description, "");
        assert_eq!(payload.location, Location::new(0.0, -76.8));
    }

    #[test]
    fn patch_with_only_tags_keeps_name_and_location() {
        let now = Utc::now();
        let mut record = stored(now);
        let patch: SensorPatch = serde_json::from_str(r#"{"tags":["x"]}"#).unwrap();

        let later = now + Duration::seconds(5);
        patch.apply(&mut record, later);

        assert_eq!(record.name, "pressure");
        assert_eq!(record.location, Location::new(40.47202, -80.01342));
        assert_eq!(record.tags, vec!["x".to_string()]);
        assert_eq!(record.updated_at, later);
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn patch_ignores_empty_name_and_zero_location() {
        let now = Utc::now();
        let mut record = stored(now);
        let patch: SensorPatch = serde_json::from_str(
            r#"{"name":"","location":{"latitude":0,"longitude":0},"tags":null}"#,
        )
        .unwrap();

        patch.apply(&mut record, now);

        assert_eq!(record.name, "pressure");
        assert_eq!(record.location, Location::new(40.47202, -80.01342));
        assert_eq!(record.tags.len(), 2);
    }

    #[test]
    fn patch_with_empty_tag_list_clears_tags() {
        let now = Utc::now();
        let mut record = stored(now);
        let patch: SensorPatch = serde_json::from_str(r#"{"tags":[]}"#).unwrap();

        patch.apply(&mut record, now);
        assert!(record.tags.is_empty());
    }
}
