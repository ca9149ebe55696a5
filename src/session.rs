//! Session - the reactive chart pipeline around one loaded dataset
//!
//! ```text
//! load ──> Normalizer ──> Arc<Dataset> ──┬──> ResultCache(join) ──> ChartData ──> downsample
//!                                        └──> export_csv
//! ```
//!
//! Experiment selection changes are debounced before the join runs; the
//! rebuilt chart data is debounced again before it is published. Metric
//! selection changes trigger a rebuild on the next [`Session::tick`].
//! Loading a new dataset clears the join cache.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::downsample::{Downsample, DEFAULT_MAX_POINTS};
use crate::experiment::{Dataset, Normalizer, RawRecord, DEFAULT_CHUNK_SIZE};
use crate::export::export_csv;
use crate::ingest::{self, Coercion, IngestOptions};
use crate::join::{JoinRow, ResultCache, DEFAULT_CACHE_CAPACITY};
use crate::schedule::{Debouncer, DEFAULT_PUBLISH_DEBOUNCE, DEFAULT_SELECTION_DEBOUNCE};
use crate::stats::ChartStats;
use crate::{Error, Result};

/// Session configuration.
///
/// Every field has a default, so partial JSON is accepted:
///
/// ```rust
/// use trueno_metrics::session::SessionConfig;
///
/// let config = SessionConfig::from_json(r#"{"cache_capacity": 10}"#)?;
/// assert_eq!(config.cache_capacity, 10);
/// assert_eq!(config.chunk_size, 1_000);
/// # Ok::<(), trueno_metrics::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Records normalized per chunk
    pub chunk_size: usize,
    /// Maximum cached join results
    pub cache_capacity: usize,
    /// Quiet period before a selection change rebuilds chart data (ms)
    pub selection_debounce_ms: u64,
    /// Quiet period before rebuilt chart data is published (ms)
    pub publish_debounce_ms: u64,
    /// Row cap for charted series
    pub max_display_points: usize,
    /// Numeric coercion policy for file loads
    pub coercion: Coercion,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            selection_debounce_ms: duration_ms(DEFAULT_SELECTION_DEBOUNCE),
            publish_debounce_ms: duration_ms(DEFAULT_PUBLISH_DEBOUNCE),
            max_display_points: DEFAULT_MAX_POINTS,
            coercion: Coercion::Permissive,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

impl SessionConfig {
    /// Parse a configuration from JSON.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or the values are invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if a size is zero
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("chunk_size", self.chunk_size),
            ("cache_capacity", self.cache_capacity),
            ("max_display_points", self.max_display_points),
        ] {
            if value == 0 {
                return Err(Error::InvalidInput(format!("{name} must be greater than 0")));
            }
        }
        Ok(())
    }
}

/// Session builder
#[derive(Debug, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Start from an existing configuration
    #[must_use]
    pub const fn from_config(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Set records normalized per chunk
    #[must_use]
    pub const fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Set maximum cached join results
    #[must_use]
    pub const fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Set the selection debounce window
    #[must_use]
    pub const fn selection_debounce(mut self, delay: Duration) -> Self {
        self.config.selection_debounce_ms = duration_ms(delay);
        self
    }

    /// Set the publish debounce window
    #[must_use]
    pub const fn publish_debounce(mut self, delay: Duration) -> Self {
        self.config.publish_debounce_ms = duration_ms(delay);
        self
    }

    /// Set the row cap for charted series
    #[must_use]
    pub const fn max_display_points(mut self, max_points: usize) -> Self {
        self.config.max_display_points = max_points;
        self
    }

    /// Set the numeric coercion policy for file loads
    #[must_use]
    pub const fn coercion(mut self, coercion: Coercion) -> Self {
        self.config.coercion = coercion;
        self
    }

    /// Build the session
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn build(self) -> Result<Session> {
        self.config.validate()?;
        Ok(Session::with_config(self.config))
    }
}

/// Joined rows per selected metric, in metric selection order.
#[derive(Debug, Clone, Default)]
pub struct ChartData {
    entries: Vec<(String, Arc<[JoinRow]>)>,
}

impl ChartData {
    /// Rows for a metric.
    #[must_use]
    pub fn get(&self, metric_name: &str) -> Option<&Arc<[JoinRow]>> {
        self.entries
            .iter()
            .find(|(metric, _)| metric == metric_name)
            .map(|(_, rows)| rows)
    }

    /// Charted metrics, in order.
    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(metric, _)| metric.as_str())
    }

    /// Iterate over `(metric, rows)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<[JoinRow]>)> {
        self.entries.iter().map(|(metric, rows)| (metric.as_str(), rows))
    }

    /// Number of charted metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is charted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One loaded dataset plus the selection and chart state derived from it.
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use trueno_metrics::experiment::RawRecord;
/// use trueno_metrics::session::Session;
///
/// # fn main() -> trueno_metrics::Result<()> {
/// let mut session = Session::builder().build()?;
/// session.load(&[
///     RawRecord::new("exp1", "loss", 0.0, 1.0),
///     RawRecord::new("exp2", "loss", 1.0, 0.4),
/// ]);
///
/// let start = Instant::now();
/// session.select_experiments(vec!["exp1".into(), "exp2".into()], start);
/// assert_eq!(session.selected_metrics(), ["loss"]);
///
/// session.tick(start + Duration::from_millis(500)); // rebuild
/// session.tick(start + Duration::from_millis(700)); // publish
/// assert!(session.is_data_ready());
/// assert_eq!(session.chart_rows("loss").len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    normalizer: Normalizer,
    dataset: Option<Arc<Dataset>>,
    loaded_at: Option<DateTime<Utc>>,
    cache: ResultCache,
    selected_experiments: Vec<String>,
    selected_metrics: Vec<String>,
    debounced_experiments: Vec<String>,
    metrics_changed: bool,
    selection: Debouncer<Vec<String>>,
    publish: Debouncer<ChartData>,
    published: ChartData,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_config(SessionConfig::default())
    }
}

impl Session {
    /// Create a new session builder
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    fn with_config(config: SessionConfig) -> Self {
        Self {
            normalizer: Normalizer::new(config.chunk_size),
            dataset: None,
            loaded_at: None,
            cache: ResultCache::new(config.cache_capacity),
            selected_experiments: Vec::new(),
            selected_metrics: Vec::new(),
            debounced_experiments: Vec::new(),
            metrics_changed: false,
            selection: Debouncer::new(Duration::from_millis(config.selection_debounce_ms)),
            publish: Debouncer::new(Duration::from_millis(config.publish_debounce_ms)),
            published: ChartData::default(),
            config,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the dataset with one normalized from `records`.
    ///
    /// Clears the join cache, both selections and all chart state.
    pub fn load(&mut self, records: &[RawRecord]) {
        let dataset = self.normalizer.normalize(records);
        self.install(dataset);
    }

    /// Like [`Session::load`], yielding to the runtime between chunks.
    #[cfg(feature = "tokio")]
    pub async fn load_async(&mut self, records: &[RawRecord]) {
        let dataset = self.normalizer.normalize_async(records).await;
        self.install(dataset);
    }

    /// Load CSV text with a header row.
    ///
    /// On error the current dataset is left untouched.
    ///
    /// # Errors
    /// Returns error if the CSV is rejected by [`ingest::read_csv`]
    pub fn load_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let records = ingest::read_csv(reader, &self.ingest_options())?;
        self.load(&records);
        Ok(())
    }

    /// Load a `.csv` or `.parquet` file.
    ///
    /// On error the current dataset is left untouched.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is rejected by ingest
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let options = self.ingest_options();
        let is_parquet = path.extension().is_some_and(|ext| ext == "parquet");
        let records = if is_parquet {
            ingest::read_parquet(path, &options)?
        } else {
            ingest::read_csv_path(path, &options)?
        };
        self.load(&records);
        Ok(())
    }

    fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            coercion: self.config.coercion,
        }
    }

    fn install(&mut self, dataset: Dataset) {
        self.cache.clear();
        self.clear_selection_state();
        info!(
            experiments = dataset.experiments().len(),
            metrics = dataset.metrics().len(),
            points = dataset.point_count(),
            "dataset loaded, join cache cleared"
        );
        self.dataset = Some(Arc::new(dataset));
        self.loaded_at = Some(Utc::now());
    }

    fn clear_selection_state(&mut self) {
        self.selected_experiments.clear();
        self.selected_metrics.clear();
        self.debounced_experiments.clear();
        self.metrics_changed = false;
        self.selection.cancel();
        self.publish.cancel();
        self.published = ChartData::default();
    }

    /// Drop the dataset and everything derived from it.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.clear_selection_state();
        self.dataset = None;
        self.loaded_at = None;
        info!("session reset");
    }

    /// Current dataset.
    #[must_use]
    pub const fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    /// When the current dataset was loaded.
    #[must_use]
    pub const fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Join result cache for the current dataset.
    #[must_use]
    pub const fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Experiments as last selected (not yet debounced).
    #[must_use]
    pub fn selected_experiments(&self) -> &[String] {
        &self.selected_experiments
    }

    /// Experiments the published chart data was built for.
    #[must_use]
    pub fn debounced_experiments(&self) -> &[String] {
        &self.debounced_experiments
    }

    /// Selected metrics, in selection order.
    #[must_use]
    pub fn selected_metrics(&self) -> &[String] {
        &self.selected_metrics
    }

    /// Select experiments at time `now`.
    ///
    /// Metrics shared by every selected experiment become the metric
    /// selection (left as is when `experiment_ids` is empty). The chart
    /// rebuild waits for the selection debounce window.
    pub fn select_experiments(&mut self, experiment_ids: Vec<String>, now: Instant) {
        if let Some(dataset) = &self.dataset {
            if !experiment_ids.is_empty() {
                self.selected_metrics = dataset.common_metrics(experiment_ids.as_slice());
                self.metrics_changed = true;
            }
        }
        debug!(experiments = experiment_ids.len(), "experiment selection scheduled");
        self.selected_experiments.clone_from(&experiment_ids);
        self.selection.schedule(experiment_ids, now);
    }

    /// Replace the metric selection.
    pub fn set_selected_metrics(&mut self, metric_names: Vec<String>) {
        self.selected_metrics = metric_names;
        self.metrics_changed = true;
    }

    /// Remove a selected metric, or append it if not selected.
    pub fn toggle_metric(&mut self, metric_name: &str) {
        if let Some(index) = self.selected_metrics.iter().position(|m| m == metric_name) {
            self.selected_metrics.remove(index);
        } else {
            self.selected_metrics.push(metric_name.to_string());
        }
        self.metrics_changed = true;
    }

    /// Advance debouncers to `now`.
    ///
    /// Rebuilds chart data when the debounced experiment selection fires or
    /// the metric selection changed, and schedules it for publication.
    /// Returns `true` when new chart data was published.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut rebuild = std::mem::take(&mut self.metrics_changed);
        if let Some(experiments) = self.selection.poll(now) {
            self.debounced_experiments = experiments;
            rebuild = true;
        }

        if rebuild {
            let chart_data = self.build_chart_data();
            debug!(metrics = chart_data.len(), "chart data rebuilt");
            self.publish.schedule(chart_data, now);
        }

        match self.publish.poll(now) {
            Some(chart_data) => {
                self.published = chart_data;
                true
            }
            None => false,
        }
    }

    fn build_chart_data(&self) -> ChartData {
        let Some(dataset) = &self.dataset else {
            return ChartData::default();
        };
        if self.debounced_experiments.is_empty() {
            return ChartData::default();
        }

        let entries = self
            .selected_metrics
            .iter()
            .map(|metric| {
                let rows = self
                    .cache
                    .get_or_build(dataset, self.debounced_experiments.as_slice(), metric);
                (metric.clone(), rows)
            })
            .collect();
        ChartData { entries }
    }

    /// Last published chart data.
    #[must_use]
    pub const fn chart_data(&self) -> &ChartData {
        &self.published
    }

    /// Check if there is something to chart.
    #[must_use]
    pub fn is_data_ready(&self) -> bool {
        self.dataset.is_some()
            && !self.debounced_experiments.is_empty()
            && !self.selected_metrics.is_empty()
            && !self.published.is_empty()
    }

    /// Published rows for a metric, downsampled to the configured cap.
    #[must_use]
    pub fn chart_rows(&self, metric_name: &str) -> Vec<JoinRow> {
        self.chart_rows_with_cap(metric_name, self.config.max_display_points)
    }

    /// Published rows for a metric, downsampled to `max_points`.
    #[must_use]
    pub fn chart_rows_with_cap(&self, metric_name: &str, max_points: usize) -> Vec<JoinRow> {
        self.published
            .get(metric_name)
            .map(|rows| rows.downsample(max_points))
            .unwrap_or_default()
    }

    /// Statistics over the published rows of a metric.
    #[must_use]
    pub fn chart_stats(&self, metric_name: &str) -> Option<ChartStats> {
        let rows = self.published.get(metric_name)?;
        ChartStats::compute(rows, self.debounced_experiments.as_slice())
    }

    /// CSV export of the current selection.
    ///
    /// `None` when no dataset is loaded or no experiment is selected.
    #[must_use]
    pub fn export_csv(&self) -> Option<String> {
        let dataset = self.dataset.as_ref()?;
        if self.selected_experiments.is_empty() {
            return None;
        }
        Some(export_csv(
            dataset,
            self.selected_experiments.as_slice(),
            self.selected_metrics.as_slice(),
        ))
    }
}
