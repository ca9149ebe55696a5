//! Experiment Dashboard Example
//!
//! Walks the full pipeline the way a dashboard front end drives it:
//! load a CSV log, select experiments, let the debounce windows settle,
//! read downsampled chart rows and stats, then export the selection.
//!
//! Run with: RUST_LOG=debug cargo run --example experiment_dashboard

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trueno_metrics::export::DEFAULT_EXPORT_FILE_NAME;
use trueno_metrics::Session;
use tracing_subscriber::EnvFilter;

/// Simulated training log: three runs with different learning rates
fn simulated_log() -> String {
    let mut rng = StdRng::seed_from_u64(7);
    let mut csv = String::from("experiment_id,metric_name,step,value\n");
    for (run, lr) in [("baseline", 0.001), ("high-lr", 0.01), ("low-lr", 0.0001)] {
        for step in (0..5_000).step_by(2) {
            let t = f64::from(step);
            let noise: f64 = rng.gen_range(-0.02..0.02);
            let loss = 2.5 * (-t * lr * 0.5).exp() + 0.1 + noise;
            let accuracy = 1.0 - loss / 3.0;
            writeln!(csv, "{run},loss,{step},{loss}").ok();
            writeln!(csv, "{run},accuracy,{step},{accuracy}").ok();
        }
        // The high-lr run also logs a diverging gradient norm.
        if run == "high-lr" {
            for step in 0..100 {
                writeln!(csv, "{run},grad_norm,{step},{}", f64::from(step).powf(1.5)).ok();
            }
        }
    }
    csv
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Trueno-Metrics Experiment Dashboard ===\n");

    // -------------------------------------------------------------------------
    // 1. Load
    // -------------------------------------------------------------------------
    let mut session = Session::builder().max_display_points(500).build()?;
    session.load_csv(simulated_log().as_bytes())?;

    let dataset = session
        .dataset()
        .ok_or_else(|| anyhow::anyhow!("no dataset after load"))?;
    println!("1. Loaded {} points", dataset.point_count());
    println!("   Experiments: {:?}", dataset.experiments());
    println!("   Metrics:     {:?}", dataset.metrics());

    // -------------------------------------------------------------------------
    // 2. Rapid selection changes collapse into one rebuild
    // -------------------------------------------------------------------------
    println!("\n2. Selecting experiments...");
    let start = Instant::now();
    session.select_experiments(vec!["baseline".into()], start);
    session.select_experiments(
        vec!["baseline".into(), "high-lr".into(), "low-lr".into()],
        start + Duration::from_millis(150),
    );
    println!("   Auto-selected metrics: {:?}", session.selected_metrics());

    let mut now = start;
    while !session.is_data_ready() {
        now += Duration::from_millis(50);
        session.tick(now);
    }
    println!(
        "   Chart data published after {} ms ({} cached joins)",
        (now - start).as_millis(),
        session.cache().len()
    );

    // -------------------------------------------------------------------------
    // 3. Chart rows and stats
    // -------------------------------------------------------------------------
    println!("\n3. Charts:");
    for metric in session.selected_metrics().to_vec() {
        let full = session.chart_data().get(&metric).map_or(0, |rows| rows.len());
        let rows = session.chart_rows(&metric);
        println!("   {metric}: {full} rows -> {} displayed", rows.len());
        if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
            println!("     first: {}", serde_json::to_string(first)?);
            println!("     last:  {}", serde_json::to_string(last)?);
        }
        if let Some(stats) = session.chart_stats(&metric) {
            println!(
                "     min {:.4}  max {:.4}  avg {:.4}",
                stats.min, stats.max, stats.avg
            );
        }
    }

    // -------------------------------------------------------------------------
    // 4. Export
    // -------------------------------------------------------------------------
    if let Some(csv) = session.export_csv() {
        let path = std::env::temp_dir().join(DEFAULT_EXPORT_FILE_NAME);
        std::fs::write(&path, &csv)?;
        println!(
            "\n4. Exported {} rows to {}",
            csv.lines().count() - 1,
            path.display()
        );
    }

    println!("\n=== Done ===");
    Ok(())
}
