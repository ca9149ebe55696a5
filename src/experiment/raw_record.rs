//! Raw Record - one flat experiment-log row

use serde::{Deserialize, Serialize};

/// Raw Record represents a single logged metric observation.
///
/// Produced by an ingest adapter (CSV, Arrow, Parquet) or built directly.
/// `step` and `value` may be NaN when the source cell could not be
/// coerced to a number; NaN is carried through the pipeline untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRecord {
    experiment_id: String,
    metric_name: String,
    step: f64,
    value: f64,
}

impl RawRecord {
    /// Create a new raw record.
    ///
    /// # Arguments
    ///
    /// * `experiment_id` - ID of the experiment (run) that logged the value
    /// * `metric_name` - Metric name (e.g., "loss", "accuracy")
    /// * `step` - Training step or epoch number
    /// * `value` - Metric value
    #[must_use]
    pub fn new(
        experiment_id: impl Into<String>,
        metric_name: impl Into<String>,
        step: f64,
        value: f64,
    ) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            metric_name: metric_name.into(),
            step,
            value,
        }
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the metric name.
    #[must_use]
    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    /// Get the step.
    #[must_use]
    pub const fn step(&self) -> f64 {
        self.step
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_new() {
        let record = RawRecord::new("exp1", "loss", 0.0, 0.5);
        assert_eq!(record.experiment_id(), "exp1");
        assert_eq!(record.metric_name(), "loss");
        assert!(record.step().abs() < f64::EPSILON);
        assert!((record.value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_raw_record_keeps_nan() {
        let record = RawRecord::new("exp1", "loss", f64::NAN, f64::NAN);
        assert!(record.step().is_nan());
        assert!(record.value().is_nan());
    }

    #[test]
    fn test_raw_record_serialization() {
        let record = RawRecord::new("exp1", "acc", 3.0, 0.75);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"experiment_id\":\"exp1\""));
        let back: RawRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
