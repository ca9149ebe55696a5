//! Cross-experiment join
//!
//! Builds, for one metric, a step-ordered table with one column per
//! requested experiment. Every step logged by at least one of the requested
//! experiments yields exactly one row; experiments without a point at that
//! step read as `0.0`.
//!
//! ## Example
//!
//! ```rust
//! use trueno_metrics::experiment::{normalize, RawRecord};
//! use trueno_metrics::join::build_join;
//!
//! let dataset = normalize(&[
//!     RawRecord::new("exp1", "loss", 0.0, 1.0),
//!     RawRecord::new("exp1", "loss", 1.0, 0.5),
//!     RawRecord::new("exp2", "loss", 1.0, 0.4),
//! ]);
//!
//! let rows = build_join(&dataset, &["exp1", "exp2"], "loss");
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0].label(), "Step 0");
//! assert_eq!(rows[0].value("exp2"), Some(0.0));
//! assert_eq!(rows[1].value("exp2"), Some(0.4));
//! ```

pub mod cache;

pub use cache::{CacheKey, ResultCache, DEFAULT_CACHE_CAPACITY};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::experiment::{cmp_steps, Dataset};
use crate::export::format_number;

/// Value reported for an experiment with no point at a row's step
pub const MISSING_VALUE: f64 = 0.0;

/// One step of the cross-experiment table.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRow {
    step: f64,
    label: String,
    values: Vec<(String, f64)>,
}

impl JoinRow {
    fn new(step: f64, values: Vec<(String, f64)>) -> Self {
        Self {
            step,
            label: step_label(step),
            values,
        }
    }

    /// Numeric step (the sort key).
    #[must_use]
    pub const fn step(&self) -> f64 {
        self.step
    }

    /// Display label derived from the step, e.g. `"Step 10"`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Value for an experiment column, `None` if the experiment is not a column.
    #[must_use]
    pub fn value(&self, experiment_id: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(id, _)| id == experiment_id)
            .map(|&(_, value)| value)
    }

    /// Columns in requested order.
    #[must_use]
    pub fn values(&self) -> &[(String, f64)] {
        &self.values
    }
}

/// Chart form: `{"name": "Step 0", "exp1": 1.0, "exp2": 0.0}`.
impl Serialize for JoinRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("name", &self.label)?;
        for (experiment, value) in &self.values {
            map.serialize_entry(experiment, value)?;
        }
        map.end()
    }
}

/// Row label for a step.
#[must_use]
pub fn step_label(step: f64) -> String {
    format!("Step {}", format_number(step))
}

/// Hash key for a step: `-0.0` folds onto `0.0` and every NaN onto one key.
fn step_key(step: f64) -> u64 {
    if step.is_nan() {
        f64::NAN.to_bits()
    } else if step == 0.0 {
        0.0_f64.to_bits()
    } else {
        step.to_bits()
    }
}

/// Join one metric across experiments.
///
/// Columns follow the order of `experiment_ids` (repeated ids collapse onto
/// their first occurrence). Unknown experiments and metrics behave as empty
/// series. When an experiment logged a step more than once, the last point
/// in series order supplies the value.
#[must_use]
pub fn build_join<S: AsRef<str>>(
    dataset: &Dataset,
    experiment_ids: &[S],
    metric_name: &str,
) -> Vec<JoinRow> {
    let mut seen = FxHashSet::default();
    let columns: Vec<&str> = experiment_ids
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| seen.insert(*id))
        .collect();

    let lookups: Vec<FxHashMap<u64, f64>> = columns
        .iter()
        .map(|id| {
            dataset
                .series(id, metric_name)
                .map(|series| {
                    series
                        .iter()
                        .map(|point| (step_key(point.step), point.value))
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    let mut steps: Vec<f64> = lookups
        .iter()
        .flat_map(FxHashMap::keys)
        .copied()
        .collect::<FxHashSet<u64>>()
        .into_iter()
        .map(f64::from_bits)
        .collect();
    steps.sort_by(|a, b| cmp_steps(*a, *b));

    steps
        .into_iter()
        .map(|step| {
            let key = step_key(step);
            let values = columns
                .iter()
                .zip(&lookups)
                .map(|(id, lookup)| {
                    let value = lookup.get(&key).copied().unwrap_or(MISSING_VALUE);
                    ((*id).to_string(), value)
                })
                .collect();
            JoinRow::new(step, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{normalize, RawRecord};

    fn dataset() -> Dataset {
        normalize(&[
            RawRecord::new("exp1", "loss", 0.0, 1.0),
            RawRecord::new("exp1", "loss", 1.0, 0.5),
            RawRecord::new("exp2", "loss", 1.0, 0.4),
            RawRecord::new("exp2", "acc", 5.0, 0.9),
        ])
    }

    #[test]
    fn test_join_zero_fills_missing_steps() {
        let rows = build_join(&dataset(), &["exp1", "exp2"], "loss");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label(), "Step 0");
        assert_eq!(rows[0].value("exp1"), Some(1.0));
        assert_eq!(rows[0].value("exp2"), Some(0.0));
        assert_eq!(rows[1].label(), "Step 1");
        assert_eq!(rows[1].value("exp1"), Some(0.5));
        assert_eq!(rows[1].value("exp2"), Some(0.4));
    }

    #[test]
    fn test_join_no_experiments() {
        assert!(build_join::<&str>(&dataset(), &[], "loss").is_empty());
    }

    #[test]
    fn test_join_unknown_metric() {
        assert!(build_join(&dataset(), &["exp1"], "missing").is_empty());
    }

    #[test]
    fn test_join_unknown_experiment_is_zero_column() {
        let rows = build_join(&dataset(), &["exp1", "ghost"], "loss");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.value("ghost") == Some(0.0)));
    }

    #[test]
    fn test_join_column_order_follows_request() {
        let rows = build_join(&dataset(), &["exp2", "exp1"], "loss");
        let columns: Vec<&str> = rows[0].values().iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(columns, vec!["exp2", "exp1"]);
    }

    #[test]
    fn test_join_repeated_ids_collapse() {
        let rows = build_join(&dataset(), &["exp1", "exp1"], "loss");
        assert_eq!(rows[0].values().len(), 1);
    }

    #[test]
    fn test_join_sorts_steps_numerically() {
        let dataset = normalize(&[
            RawRecord::new("a", "m", 10.0, 1.0),
            RawRecord::new("b", "m", 9.0, 2.0),
            RawRecord::new("a", "m", 100.0, 3.0),
        ]);
        let rows = build_join(&dataset, &["a", "b"], "m");
        let labels: Vec<&str> = rows.iter().map(JoinRow::label).collect();
        assert_eq!(labels, vec!["Step 9", "Step 10", "Step 100"]);
    }

    #[test]
    fn test_join_duplicate_step_last_wins() {
        let dataset = normalize(&[
            RawRecord::new("a", "m", 1.0, 1.0),
            RawRecord::new("a", "m", 1.0, 2.0),
        ]);
        let rows = build_join(&dataset, &["a"], "m");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value("a"), Some(2.0));
    }

    #[test]
    fn test_join_negative_zero_shares_row() {
        let dataset = normalize(&[
            RawRecord::new("a", "m", -0.0, 1.0),
            RawRecord::new("b", "m", 0.0, 2.0),
        ]);
        let rows = build_join(&dataset, &["a", "b"], "m");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label(), "Step 0");
    }

    #[test]
    fn test_join_nan_steps_share_last_row() {
        let dataset = normalize(&[
            RawRecord::new("a", "m", f64::NAN, 1.0),
            RawRecord::new("b", "m", f64::NAN, 2.0),
            RawRecord::new("a", "m", 3.0, 3.0),
        ]);
        let rows = build_join(&dataset, &["a", "b"], "m");
        assert_eq!(rows.len(), 2);
        assert!(rows[1].step().is_nan());
        assert_eq!(rows[1].label(), "Step NaN");
        assert_eq!(rows[1].value("b"), Some(2.0));
    }

    #[test]
    fn test_step_label_extreme_magnitudes() {
        assert_eq!(step_label(1e21), "Step 1e+21");
        assert_eq!(step_label(1e-7), "Step 1e-7");
        assert_eq!(step_label(-0.0), "Step 0");
    }

    #[test]
    fn test_join_row_serializes_as_chart_point() {
        let rows = build_join(&dataset(), &["exp1", "exp2"], "loss");
        let json = serde_json::to_string(&rows[1]).unwrap();
        assert_eq!(json, r#"{"name":"Step 1","exp1":0.5,"exp2":0.4}"#);
    }
}
