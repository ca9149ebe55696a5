//! Summary statistics over joined chart rows
//!
//! Min / max / mean of every experiment column across a row sequence. NaN
//! cells are skipped here, the one place the pipeline filters them. The
//! zero-filled cells produced for missing steps are ordinary values and
//! are counted.

use arrow::array::Float64Array;
use arrow::compute::{max, min, sum};
use serde::Serialize;

use crate::join::JoinRow;

/// Min / max / mean of the numeric cells in a chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartStats {
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Arithmetic mean
    pub avg: f64,
    /// Number of cells aggregated
    pub count: usize,
}

impl ChartStats {
    /// Aggregate the given experiment columns over `rows`.
    ///
    /// Returns `None` when there are no rows or no non-NaN cells.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trueno_metrics::experiment::{normalize, RawRecord};
    /// use trueno_metrics::join::build_join;
    /// use trueno_metrics::stats::ChartStats;
    ///
    /// let dataset = normalize(&[
    ///     RawRecord::new("exp1", "loss", 0.0, 1.0),
    ///     RawRecord::new("exp1", "loss", 1.0, 0.5),
    /// ]);
    /// let rows = build_join(&dataset, &["exp1"], "loss");
    ///
    /// let stats = ChartStats::compute(&rows, &["exp1"]).unwrap();
    /// assert_eq!(stats.min, 0.5);
    /// assert_eq!(stats.max, 1.0);
    /// assert_eq!(stats.avg, 0.75);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute<S: AsRef<str>>(rows: &[JoinRow], experiment_ids: &[S]) -> Option<Self> {
        let cells: Float64Array = experiment_ids
            .iter()
            .flat_map(|id| rows.iter().filter_map(move |row| row.value(id.as_ref())))
            .filter(|value| !value.is_nan())
            .map(Some)
            .collect();

        let count = cells.len();
        if count == 0 {
            return None;
        }

        Some(Self {
            min: min(&cells)?,
            max: max(&cells)?,
            avg: sum(&cells)? / count as f64,
            count,
        })
    }
}
