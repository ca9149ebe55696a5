//! Normalizer - raw records → indexed [`Dataset`]
//!
//! Records are consumed in bounded chunks. The synchronous path simply
//! walks the chunks; the async path (feature `tokio`) yields to the runtime
//! between chunks so a host event loop stays responsive on large logs.
//! Chunking never changes the output.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use super::{Dataset, Point, RawRecord, Series};

/// Default number of records consumed per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1_000;

/// Normalize raw records with the default chunk size.
///
/// ## Example
///
/// ```rust
/// use trueno_metrics::experiment::{normalize, RawRecord};
///
/// let dataset = normalize(&[
///     RawRecord::new("exp1", "loss", 0.0, 1.0),
///     RawRecord::new("exp1", "loss", 1.0, 0.5),
///     RawRecord::new("exp2", "loss", 1.0, 0.4),
/// ]);
///
/// assert_eq!(dataset.experiments(), ["exp1", "exp2"]);
/// assert_eq!(dataset.metrics(), ["loss"]);
/// ```
#[must_use]
pub fn normalize(records: &[RawRecord]) -> Dataset {
    Normalizer::default().normalize(records)
}

/// Chunked record normalizer.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    chunk_size: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Normalizer {
    /// Create a normalizer consuming `chunk_size` records per chunk.
    ///
    /// A zero chunk size is treated as one.
    #[must_use]
    pub const fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: if chunk_size == 0 { 1 } else { chunk_size },
        }
    }

    /// Records consumed per chunk.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Build a dataset from records.
    #[must_use]
    pub fn normalize(&self, records: &[RawRecord]) -> Dataset {
        let mut acc = Accumulator::default();
        for (index, chunk) in records.chunks(self.chunk_size).enumerate() {
            acc.consume(chunk);
            debug!(chunk = index, records = chunk.len(), "normalized chunk");
        }
        acc.finish()
    }

    /// Build a dataset from records, yielding to the runtime between chunks.
    ///
    /// Output is identical to [`Normalizer::normalize`].
    #[cfg(feature = "tokio")]
    pub async fn normalize_async(&self, records: &[RawRecord]) -> Dataset {
        let mut acc = Accumulator::default();
        for (index, chunk) in records.chunks(self.chunk_size).enumerate() {
            acc.consume(chunk);
            debug!(chunk = index, records = chunk.len(), "normalized chunk");
            tokio::task::yield_now().await;
        }
        acc.finish()
    }
}

/// Series accumulated in logged order, keyed experiment → metric.
#[derive(Default)]
struct Accumulator {
    series: FxHashMap<String, FxHashMap<String, Vec<Point>>>,
    records: usize,
}

impl Accumulator {
    fn consume(&mut self, chunk: &[RawRecord]) {
        for record in chunk {
            self.series
                .entry(record.experiment_id().to_string())
                .or_default()
                .entry(record.metric_name().to_string())
                .or_default()
                .push(Point::new(record.step(), record.value()));
        }
        self.records += chunk.len();
    }

    fn finish(self) -> Dataset {
        let records = self.records;
        let series: BTreeMap<String, BTreeMap<String, Series>> = self
            .series
            .into_iter()
            .map(|(experiment, by_metric)| {
                let by_metric = by_metric
                    .into_iter()
                    .map(|(metric, points)| (metric, Series::from_logged(points)))
                    .collect();
                (experiment, by_metric)
            })
            .collect();

        let dataset = Dataset::from_series(series);
        info!(
            records,
            experiments = dataset.experiments().len(),
            metrics = dataset.metrics().len(),
            "normalized dataset"
        );
        dataset
    }
}
