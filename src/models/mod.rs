//! Core data models for the sensor metadata service.
//!
//! `SensorMetadata` is the only persisted entity. The request payloads that
//! create or patch it live next to it so the merge rules stay in one place.

pub mod sensor;
