//! Demo sensors inserted at startup when seeding is enabled.

use super::{SensorStore, StoreError, StoreResult};
use crate::models::sensor::{Location, NewSensor};
use chrono::Utc;
use tracing::info;

fn demo_sensors() -> Vec<NewSensor> {
    vec![
        NewSensor {
            name: "proximity".into(),
            description: "It is a long established fact that a reader will be distracted by the readable content of a page when looking at its layout.".into(),
            location: Location::new(40.25437, -76.87133),
            tags: Some(vec!["tag1".into(), "tag2".into()]),
        },
        NewSensor {
            name: "pressure".into(),
            description: "The point of using Lorem Ipsum is that it has a more-or-less normal distribution of letters, as opposed to using 'Content here, content here', making it look like readable English.".into(),
            location: Location::new(40.47202, -80.01342),
            tags: Some(vec!["tag3".into(), "tag4".into()]),
        },
        NewSensor {
            name: "capacitive".into(),
            description: "Many desktop publishing packages and web page editors now use Lorem Ipsum as their default model text, and a search for 'lorem ipsum' will uncover many web sites still in their infancy. Various versions have evolved over the years, sometimes by accident, sometimes on purpose (injected humour and the like).".into(),
            location: Location::new(39.9518, -75.16845),
            tags: Some(vec!["tag6".into(), "tag7".into()]),
        },
    ]
}

/// Insert the demo sensors, skipping any whose name is already taken.
///
/// Returns how many records were inserted.
pub async fn seed_demo_sensors(store: &dyn SensorStore) -> StoreResult<usize> {
    let mut inserted = 0;
    for sensor in demo_sensors() {
        let record = sensor.into_record(Utc::now());
        match store.create(record).await {
            Ok(stored) => {
                info!(id = %stored.id, name = %stored.name, "seeded sensor");
                inserted += 1;
            }
            Err(StoreError::Conflict(name)) => {
                info!(name = %name, "seed sensor already present, skipping");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(inserted)
}
