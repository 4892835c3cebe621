//! # hardhat-types
//!
//! Core types for smart hard hat monitoring. This crate defines the data model
//! shared by the monitoring engine, its storage adapters and any UI layer that
//! binds to it: monitored personnel, the sensors a hard hat carries, the
//! notifications emitted on threshold transitions and the periodic realtime
//! records persisted while a recording session is active.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature to persist or transmit them
//! - **Stable wire keys**: Sensor names serialize to the camelCase keys the gear emits
//! - **Versioned blobs**: Persisted state carries a [`SchemaVersion`] for format evolution
//!
//! ## Features
//!
//! - `serde`: JSON/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use hardhat_types::{RealtimeRecord, SensorType};
//!
//! let record = RealtimeRecord::builder()
//!     .timestamp_ms(1703160000000)
//!     .value(SensorType::HeartRate, 88.0)
//!     .value(SensorType::BodyTemperature, 36.9)
//!     .build();
//!
//! // Sensors without a reading are kept, as `None`
//! assert_eq!(record.values.len(), SensorType::ALL.len());
//! assert_eq!(record.get(SensorType::SmokeSensor), None);
//! ```

mod notification;
mod person;
mod record;
mod sensor;
mod version;

pub use notification::*;
pub use person::*;
pub use record::*;
pub use sensor::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to persisted notification or
/// flag blobs. Loaders discard blobs whose major version differs.
pub const SCHEMA_VERSION: u32 = 1;

/// Get current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
