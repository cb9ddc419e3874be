//! Telemetry Pipeline Library
//!
//! Turns loosely-structured tabular sensor feeds into typed, canonical
//! records and keeps a live view of them up to date.
//!
//! # Architecture
//!
//! - [`mapping`] resolves whatever headers a batch carries onto the fixed
//!   canonical schema through an alias table
//! - [`normalizer`] projects each raw row through that mapping and coerces
//!   values to their canonical types
//! - [`poller`] fetches batches on an interval, replaces the record history
//!   and publishes derived views to render targets
//!
//! The library does NOT draw anything. Dashboards implement
//! [`RenderTarget`] and register it with the poller.
//!
//! # Example Usage
//!
//! ```no_run
//! use telemetry_core::{HttpRowSource, Poller, PollerConfig};
//!
//! # async fn run() -> telemetry_core::Result<()> {
//! let config = PollerConfig::new().with_interval_ms(5000);
//! let source = HttpRowSource::new(config.request_timeout())?;
//! let mut poller = Poller::new(source, config);
//!
//! // One cycle right now, then keep polling
//! poller.fetch_once("https://example.com/rows.json").await?;
//! poller.start_polling("https://example.com/rows.json");
//!
//! if let Some(latest) = poller.latest() {
//!     println!("pH {:?} at {}", latest.ph, latest.timestamp);
//! }
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod config;
pub mod history;
pub mod mapping;
pub mod normalizer;
pub mod poller;
pub mod render;
pub mod source;
pub mod types;

// Re-export main types for convenience
pub use config::PollerConfig;
pub use history::{Publication, RecordHistory, TrendSeries};
pub use mapping::{resolve_mapping, AliasTable, FieldMapping};
pub use normalizer::{normalize, normalize_at};
pub use poller::{CycleOutcome, Poller, PollerState};
pub use render::RenderTarget;
pub use source::{parse_batch, HttpRowSource, RowSource};
pub use types::{CanonicalField, CanonicalRecord, RawRow, Result, TelemetryError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
