// src/models/mod.rs

//! Domain models for the results client.
//!
//! Records are immutable values built once from parsed [`Fields`] by
//! explicit `from_fields` builders.

mod config;
mod event;
mod fields;
mod race;

// Re-export all public types
pub use config::{CacheConfig, ClientConfig, Config, LoggingConfig};
pub use event::{Event, EventDetails};
pub use fields::{Fields, FieldsExt};
pub use race::{CompleteEventData, Discipline, RaceCategory, RaceEntry, RaceResult, Rider};
