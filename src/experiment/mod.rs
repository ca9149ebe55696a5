//! Experiment log model and normalization
//!
//! ## Schema Overview
//!
//! ```text
//! RawRecord (N) ──normalize──> Dataset
//!                                ├── experiments: sorted ids
//!                                ├── metrics: sorted names
//!                                └── series[experiment][metric]: Series (step-ordered)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trueno_metrics::experiment::{Normalizer, RawRecord};
//!
//! let records = vec![
//!     RawRecord::new("exp1", "loss", 0.0, 1.0),
//!     RawRecord::new("exp1", "loss", 1.0, 0.5),
//! ];
//!
//! let dataset = Normalizer::new(1_000).normalize(&records);
//! assert_eq!(dataset.series("exp1", "loss").unwrap().len(), 2);
//! ```

mod dataset;
mod normalize;
mod raw_record;
mod series;

pub use dataset::Dataset;
pub use normalize::{normalize, Normalizer, DEFAULT_CHUNK_SIZE};
pub use raw_record::RawRecord;
pub use series::{cmp_steps, Point, Series};
