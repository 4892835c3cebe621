//! # hardhat-watch
//!
//! A headless runner and small library for monitoring firefighters wearing
//! sensor-equipped smart hard hats.
//!
//! The binary wires the [`hardhat_sdk`] engine to the outside world: it loads
//! the roster and configuration, reads sensor samples from a file or a TCP
//! gateway, stores recordings through [`hardhat_adapters`] and prints alerts
//! as they happen.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   samples   ┌──────────────────────────┐   toasts   ┌────────┐
//! │    source    │────────────▶│ MonitoringSessionManager │───────────▶│ stdout │
//! │ Stream|Chan. │             │     (hardhat-sdk)        │            └────────┘
//! └──────────────┘             └────────────┬─────────────┘
//!                                           │ every interval
//!                                           ▼
//!                              ┌──────────────────────────┐
//!                              │ FileLocalStore +         │
//!                              │ JsonRecordStore          │
//!                              │ (hardhat-adapters)       │
//!                              └──────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`SampleSource`] trait with stream and channel implementations
//! - **[`settings`]**: engine configuration from TOML plus `HARDHAT_*` environment variables
//! - **[`roster`]**: the JSON personnel list
//! - **[`runner`]**: the ingest loop and the final flush on exit
//!
//! ## Usage
//!
//! ```bash
//! # Replay a capture and record everyone on the roster
//! hardhat-watch --roster crew.json --file capture.ndjson --record
//!
//! # Follow a live gateway
//! hardhat-watch --roster crew.json --connect 10.0.0.5:7000 --config hardhat.toml
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::io::Cursor;
//! use hardhat_sdk::{MonitoringSessionManager, Person};
//! use hardhat_watch::{runner, StreamSource};
//!
//! # tokio_test::block_on(async {
//! let manager = MonitoringSessionManager::builder().build().unwrap();
//! manager.add_person(Person::new("HH-01", "Ana Reyes", "Nozzle"));
//!
//! let data = "{\"gearId\":\"HH-01\",\"sensor\":\"smokeSensor\",\"value\":420}\n";
//! let mut source = StreamSource::spawn(Cursor::new(data), "example");
//! let stats = runner::drive(&manager, &mut source).await;
//! assert_eq!(stats.notifications, 1);
//! # });
//! ```

pub mod duration;
pub mod roster;
pub mod runner;
pub mod settings;
pub mod source;

pub use roster::load_roster;
pub use runner::{drive, flush_recordings, DriveStats};
pub use settings::load_config;
pub use source::{ChannelSource, Sample, SampleSource, StreamSource};
