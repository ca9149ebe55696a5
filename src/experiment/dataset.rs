//! Dataset - indexed, immutable view of a loaded experiment log
//!
//! Built once per load by the [`Normalizer`](super::Normalizer) and never
//! mutated afterwards. A new load produces a new `Dataset`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Series;

/// Indexed experiment metrics.
///
/// ## Invariants
///
/// - `experiments` and `metrics` are sorted and unique
/// - `experiments`/`metrics` are exactly the ids/names appearing as keys
///   of `series`
/// - an `(experiment, metric)` entry exists only if at least one record
///   produced it, so no series is ever empty
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    experiments: Vec<String>,
    metrics: Vec<String>,
    series: BTreeMap<String, BTreeMap<String, Series>>,
}

impl Dataset {
    /// Create an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a dataset from per-experiment series maps.
    ///
    /// `experiments` and `metrics` are derived from the map keys.
    #[must_use]
    pub(crate) fn from_series(series: BTreeMap<String, BTreeMap<String, Series>>) -> Self {
        let experiments: Vec<String> = series.keys().cloned().collect();
        let mut metrics: Vec<String> = series
            .values()
            .flat_map(|by_metric| by_metric.keys().cloned())
            .collect();
        metrics.sort();
        metrics.dedup();

        Self {
            experiments,
            metrics,
            series,
        }
    }

    /// Check if the dataset holds no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Sorted, unique experiment IDs.
    #[must_use]
    pub fn experiments(&self) -> &[String] {
        &self.experiments
    }

    /// Sorted, unique metric names.
    #[must_use]
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Get the series for an experiment and metric.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use trueno_metrics::experiment::{normalize, RawRecord};
    ///
    /// let dataset = normalize(&[
    ///     RawRecord::new("exp1", "loss", 1.0, 0.5),
    ///     RawRecord::new("exp1", "loss", 0.0, 1.0),
    /// ]);
    ///
    /// let loss = dataset.series("exp1", "loss").unwrap();
    /// assert_eq!(loss.len(), 2);
    /// assert!(dataset.series("exp1", "accuracy").is_none());
    /// ```
    #[must_use]
    pub fn series(&self, experiment_id: &str, metric_name: &str) -> Option<&Series> {
        self.series
            .get(experiment_id)
            .and_then(|by_metric| by_metric.get(metric_name))
    }

    /// Metric names logged by one experiment, sorted.
    pub fn metrics_for(&self, experiment_id: &str) -> impl Iterator<Item = &str> {
        self.series
            .get(experiment_id)
            .into_iter()
            .flat_map(|by_metric| by_metric.keys().map(String::as_str))
    }

    /// Metrics logged by *every* given experiment, in dataset metric order.
    ///
    /// Empty when `experiment_ids` is empty.
    #[must_use]
    pub fn common_metrics<S: AsRef<str>>(&self, experiment_ids: &[S]) -> Vec<String> {
        if experiment_ids.is_empty() {
            return Vec::new();
        }

        self.metrics
            .iter()
            .filter(|metric| {
                experiment_ids
                    .iter()
                    .all(|id| self.series(id.as_ref(), metric).is_some())
            })
            .cloned()
            .collect()
    }

    /// Total number of points across every series.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.series
            .values()
            .flat_map(BTreeMap::values)
            .map(Series::len)
            .sum()
    }

    /// Number of `(experiment, metric)` series.
    #[must_use]
    pub fn series_count(&self) -> usize {
        self.series.values().map(BTreeMap::len).sum()
    }
}
