//! # hardhat-adapters
//!
//! Filesystem-backed storage collaborators for the hardhat monitoring engine.
//!
//! ## Stores
//!
//! - [`FileLocalStore`] - device-local key/value blobs (notification log and
//!   flags), one file per key
//! - [`JsonRecordStore`] - durable per-person records with `notifications` and
//!   `realtime` sub-collections as newline-delimited JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hardhat_adapters::{FileLocalStore, JsonRecordStore};
//! use hardhat_sdk::MonitoringSessionManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let local = FileLocalStore::open("data/local")?;
//!     let records = JsonRecordStore::open("data/records").await?;
//!
//!     let manager = MonitoringSessionManager::builder()
//!         .local_store(Arc::new(local))
//!         .record_store(Arc::new(records))
//!         .build()?;
//!
//!     println!("Restored {} notifications", manager.notifications().len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod local;
pub mod records;

pub use error::AdapterError;
pub use local::FileLocalStore;
pub use records::JsonRecordStore;
