//! # Trueno-Metrics: Experiment Metric Pipeline
//!
//! Turns flat experiment logs (`experiment_id, metric_name, step, value`)
//! into indexed time series that can be joined across experiments per
//! metric, cached, downsampled for display and exported back to CSV.
//!
//! ## Pipeline
//!
//! ```text
//! ingest (CSV / Arrow / Parquet)
//!     └─> RawRecord* ──normalize──> Dataset
//!                                     ├─> join (ResultCache) ──> JoinRow* ──> downsample ──> chart
//!                                     └─> export_csv
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use trueno_metrics::downsample::Downsample;
//! use trueno_metrics::experiment::{normalize, RawRecord};
//! use trueno_metrics::join::ResultCache;
//!
//! let dataset = normalize(&[
//!     RawRecord::new("exp1", "loss", 0.0, 1.0),
//!     RawRecord::new("exp1", "loss", 1.0, 0.5),
//!     RawRecord::new("exp2", "loss", 1.0, 0.4),
//! ]);
//!
//! let cache = ResultCache::default();
//! let rows = cache.get_or_build(&dataset, &["exp1", "exp2"], "loss");
//! assert_eq!(rows.len(), 2);
//!
//! let display = rows.downsample(1_000);
//! assert_eq!(display.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod downsample;
pub mod error;
pub mod experiment;
pub mod export;
pub mod ingest;
pub mod join;
pub mod schedule;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use session::{Session, SessionBuilder, SessionConfig};
