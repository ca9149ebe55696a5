//! Pipeline Tests: normalize → join → cache → downsample → export
//!
//! Exercises the public API end to end on small hand-written logs.

use std::sync::Arc;

use trueno_metrics::downsample::Downsample;
use trueno_metrics::experiment::{normalize, Normalizer, RawRecord};
use trueno_metrics::export::{export_all_csv, export_csv, EXPORT_HEADER};
use trueno_metrics::ingest::{read_csv, IngestOptions};
use trueno_metrics::join::{build_join, CacheKey, ResultCache};

fn scenario() -> Vec<RawRecord> {
    vec![
        RawRecord::new("exp1", "loss", 0.0, 1.0),
        RawRecord::new("exp1", "loss", 1.0, 0.5),
        RawRecord::new("exp2", "loss", 1.0, 0.4),
    ]
}

// =============================================================================
// Normalizer
// =============================================================================

#[test]
fn test_scenario_dataset() {
    let dataset = normalize(&scenario());
    assert_eq!(dataset.experiments(), ["exp1", "exp2"]);
    assert_eq!(dataset.metrics(), ["loss"]);
    assert_eq!(dataset.series("exp1", "loss").unwrap().len(), 2);
    assert_eq!(dataset.series("exp2", "loss").unwrap().len(), 1);
}

#[test]
fn test_series_exist_only_when_logged() {
    let dataset = normalize(&[
        RawRecord::new("exp1", "loss", 0.0, 1.0),
        RawRecord::new("exp2", "acc", 0.0, 0.5),
    ]);
    assert!(dataset.series("exp1", "acc").is_none());
    assert!(dataset.series("exp2", "loss").is_none());
    assert_eq!(dataset.series_count(), 2);
}

#[test]
fn test_large_log_chunked() {
    #[allow(clippy::cast_precision_loss)]
    let records: Vec<RawRecord> = (0..25_000)
        .rev()
        .map(|i| RawRecord::new(format!("exp{}", i % 5), "loss", f64::from(i / 5), i as f64))
        .collect();

    let dataset = Normalizer::new(1_000).normalize(&records);
    assert_eq!(dataset.experiments().len(), 5);
    assert_eq!(dataset.point_count(), 25_000);
    assert_eq!(dataset, Normalizer::new(7).normalize(&records));

    let series = dataset.series("exp0", "loss").unwrap();
    assert!(series
        .points()
        .windows(2)
        .all(|pair| pair[0].step <= pair[1].step));
}

// =============================================================================
// Join Builder
// =============================================================================

#[test]
fn test_scenario_join() {
    let dataset = normalize(&scenario());
    let rows = build_join(&dataset, &["exp1", "exp2"], "loss");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].step(), 0.0);
    assert_eq!(rows[0].value("exp1"), Some(1.0));
    assert_eq!(rows[0].value("exp2"), Some(0.0));
    assert_eq!(rows[1].step(), 1.0);
    assert_eq!(rows[1].value("exp1"), Some(0.5));
    assert_eq!(rows[1].value("exp2"), Some(0.4));
}

#[test]
fn test_join_chart_json() {
    let dataset = normalize(&scenario());
    let rows = build_join(&dataset, &["exp1", "exp2"], "loss");
    let json = serde_json::to_value(&rows).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"name": "Step 0", "exp1": 1.0, "exp2": 0.0},
            {"name": "Step 1", "exp1": 0.5, "exp2": 0.4},
        ])
    );
}

// =============================================================================
// Result Cache
// =============================================================================

#[test]
fn test_cache_evicts_first_inserted_at_101() {
    let dataset = normalize(&scenario());
    let cache = ResultCache::default();

    for i in 0..101 {
        cache.get_or_build(&dataset, &["exp1"], &format!("metric_{i}"));
    }

    assert_eq!(cache.len(), 100);
    assert!(!cache.contains(&CacheKey::new("metric_0", &["exp1"])));
    assert!(cache.contains(&CacheKey::new("metric_1", &["exp1"])));
    assert!(cache.contains(&CacheKey::new("metric_100", &["exp1"])));
}

#[test]
fn test_cache_eviction_is_fifo_not_lru() {
    let dataset = normalize(&scenario());
    let cache = ResultCache::default();

    for i in 0..100 {
        cache.get_or_build(&dataset, &["exp1"], &format!("metric_{i}"));
    }
    // Touch the oldest entry; it must still be the eviction candidate.
    let first = CacheKey::new("metric_0", &["exp1"]);
    assert!(cache.get(&first).is_some());
    cache.get_or_build(&dataset, &["exp1"], "metric_0");

    cache.get_or_build(&dataset, &["exp1"], "metric_100");
    assert!(!cache.contains(&first));
    assert!(cache.contains(&CacheKey::new("metric_100", &["exp1"])));
}

#[test]
fn test_cache_key_is_order_insensitive() {
    let dataset = normalize(&scenario());
    let cache = ResultCache::default();

    let forward = cache.get_or_build(&dataset, &["exp1", "exp2"], "loss");
    let backward = cache.get_or_build(&dataset, &["exp2", "exp1"], "loss");
    assert!(Arc::ptr_eq(&forward, &backward));
}

// =============================================================================
// Downsampler + Exporter
// =============================================================================

#[test]
fn test_downsample_joined_rows() {
    let records: Vec<RawRecord> = (0..5_000)
        .map(|i| RawRecord::new("exp1", "loss", f64::from(i), f64::from(i) * 0.5))
        .collect();
    let dataset = normalize(&records);
    let rows = build_join(&dataset, &["exp1"], "loss");

    let display = rows.downsample(1_000);
    assert!(display.len() <= 1_001);
    assert_eq!(display.first(), rows.first());
    assert_eq!(display.last(), rows.last());
}

#[test]
fn test_export_reimport_round_trip() {
    let dataset = normalize(&[
        RawRecord::new("exp1", "loss", 2.0, 0.123_456_789),
        RawRecord::new("exp1", "loss", 0.0, 1.0e-9),
        RawRecord::new("exp2", "acc", 1.5, -3.25),
        RawRecord::new("exp2", "loss", 0.0, f64::INFINITY),
    ]);

    let csv = export_all_csv(&dataset);
    let records = read_csv(csv.as_bytes(), &IngestOptions::strict()).unwrap();
    assert_eq!(normalize(&records), dataset);
}

#[test]
fn test_export_subset_order() {
    let dataset = normalize(&scenario());
    let csv = export_csv(&dataset, &["exp2", "exp1"], &["loss"]);
    assert_eq!(
        csv,
        format!("{EXPORT_HEADER}\nexp2,loss,1,0.4\nexp1,loss,0,1\nexp1,loss,1,0.5")
    );
}
