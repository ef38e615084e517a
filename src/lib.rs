//! aquastat - rolling water-consumption accounting and leak detection
//!
//! This library ingests a stream of instantaneous flow-rate and volume-delta
//! readings from a push-based water meter and derives:
//! - rolling consumption totals over six accounting periods
//!   (hour/day/week/month/year/lifetime) with local-calendar reset boundaries
//! - cost figures under a configured tariff
//! - average/peak/minimum flow and consumption statistics from four bounded
//!   sliding-window buffers
//! - a two-state hysteresis leak classification with one-shot events
//!
//! All state persists across restarts, including catch-up handling of
//! period boundaries crossed while the process was not running.
//!
//! # Examples
//!
//! ```no_run
//! use aquastat::{
//!     service::MeterService,
//!     store::SnapshotStore,
//!     transport::OfflineMeter,
//! };
//! use aquastat_core::types::EngineConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> aquastat::Result<()> {
//!     let transport = Arc::new(OfflineMeter);
//!     let store = SnapshotStore::new(SnapshotStore::default_path());
//!     let service = MeterService::start(transport, EngineConfig::default(), store).await?;
//!
//!     let (ticks_tx, ticks_rx) = tokio::sync::mpsc::channel(16);
//!     drop(ticks_tx); // a real transport would notify here on every push
//!     service.run(tokio_stream::wrappers::ReceiverStream::new(ticks_rx)).await?;
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod cli;
pub mod engine;
pub mod leak;
pub mod service;
pub mod store;
pub mod transport;
pub mod window;

// Re-export commonly used types
pub use aquastat_core::{AquastatError, EngineConfig, Period, Result, TimezoneConfig, WaterTariff};
pub use engine::{AccountingEngine, BufferCounts, FlowStatistics};
pub use leak::{LeakEvent, LeakEventKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
