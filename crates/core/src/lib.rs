//! Core domain types and shared logic for the hangar flight ingestion
//! pipeline.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Flight keys and the lookup record derived from them
//! - Poll state threaded between orchestrator invocations
//! - Artifact categories and per-category counts
//! - Parsed GPS and OO readings
//! - Configuration

pub mod config;
pub mod counts;
pub mod error;
pub mod flight;
pub mod poll;
pub mod reading;

pub use counts::{FileKind, FileTypeCounts};
pub use error::{Error, Result};
pub use flight::{FlightKey, FlightLookupRecord};
pub use poll::PollState;
pub use reading::{GpsReading, OoReading, gps_span_seconds, signed_coordinate};
