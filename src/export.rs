//! CSV export of a dataset selection
//!
//! Output is the ingest format: header `experiment_id,metric_name,step,value`
//! then one line per point, experiments outermost, metrics inner, points in
//! stored step order. Fields are written verbatim; ids or names containing
//! commas, quotes or newlines are not escaped and will not re-import cleanly.

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use crate::experiment::Dataset;
use crate::Result;

/// Header line of exported CSV
pub const EXPORT_HEADER: &str = "experiment_id,metric_name,step,value";

/// File name used when exporting without an explicit target
pub const DEFAULT_EXPORT_FILE_NAME: &str = "experiment_metrics_export.csv";

/// Render a number the way exported CSV and step labels expect.
///
/// Shortest round-trip form, `NaN`, `Infinity`, `-Infinity`; negative zero
/// renders as `0`. Magnitudes of at least `1e21` or below `1e-6` use
/// exponent notation with a signed exponent (`1e+21`, `1.5e-7`), everything
/// else plain decimals.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else if value.abs() >= 1e21 || value.abs() < 1e-6 {
        let text = format!("{value:e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        }
    } else {
        value.to_string()
    }
}

/// Export the selected experiments and metrics as CSV text.
///
/// Missing `(experiment, metric)` combinations contribute no lines. Lines
/// are separated by `\n` with no trailing newline.
///
/// # Examples
///
/// ```rust
/// use trueno_metrics::experiment::{normalize, RawRecord};
/// use trueno_metrics::export::export_csv;
///
/// let dataset = normalize(&[
///     RawRecord::new("exp1", "loss", 1.0, 0.5),
///     RawRecord::new("exp1", "loss", 0.0, 1.0),
/// ]);
///
/// let csv = export_csv(&dataset, &["exp1"], &["loss"]);
/// assert_eq!(csv, "experiment_id,metric_name,step,value\nexp1,loss,0,1\nexp1,loss,1,0.5");
/// ```
#[must_use]
pub fn export_csv<E: AsRef<str>, M: AsRef<str>>(
    dataset: &Dataset,
    experiment_ids: &[E],
    metric_names: &[M],
) -> String {
    let mut csv = String::from(EXPORT_HEADER);
    for experiment in experiment_ids.iter().map(AsRef::as_ref) {
        for metric in metric_names.iter().map(AsRef::as_ref) {
            let Some(series) = dataset.series(experiment, metric) else {
                continue;
            };
            for point in series {
                // Writing to a String cannot fail.
                let _ = write!(
                    csv,
                    "\n{experiment},{metric},{},{}",
                    format_number(point.step),
                    format_number(point.value)
                );
            }
        }
    }
    csv
}

/// Export every experiment and metric of a dataset.
#[must_use]
pub fn export_all_csv(dataset: &Dataset) -> String {
    export_csv(dataset, dataset.experiments(), dataset.metrics())
}

/// Write the CSV export to a file.
///
/// # Errors
/// Returns error if the file cannot be created or written
pub fn write_csv_file<E: AsRef<str>, M: AsRef<str>, P: AsRef<Path>>(
    path: P,
    dataset: &Dataset,
    experiment_ids: &[E],
    metric_names: &[M],
) -> Result<()> {
    let csv = export_csv(dataset, experiment_ids, metric_names);
    std::fs::write(path.as_ref(), &csv)?;
    info!(path = %path.as_ref().display(), bytes = csv.len(), "exported CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{normalize, RawRecord};

    fn dataset() -> Dataset {
        normalize(&[
            RawRecord::new("exp1", "loss", 0.0, 1.0),
            RawRecord::new("exp1", "acc", 0.0, 0.25),
            RawRecord::new("exp2", "loss", 1.0, 0.4),
        ])
    }

    #[test]
    fn test_header_only_when_nothing_selected() {
        assert_eq!(export_csv::<&str, &str>(&dataset(), &[], &[]), EXPORT_HEADER);
    }

    #[test]
    fn test_selection_order_drives_row_order() {
        let csv = export_csv(&dataset(), &["exp2", "exp1"], &["loss", "acc"]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                EXPORT_HEADER,
                "exp2,loss,1,0.4",
                "exp1,loss,0,1",
                "exp1,acc,0,0.25",
            ]
        );
    }

    #[test]
    fn test_missing_combination_skipped() {
        let csv = export_csv(&dataset(), &["exp2"], &["acc"]);
        assert_eq!(csv, EXPORT_HEADER);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_format_number_exponent_range() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e22), "-2.5e+22");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(0.000_001), "0.000001");
    }

    #[test]
    fn test_exponent_values_reimport() {
        let dataset = normalize(&[RawRecord::new("e", "m", 1e21, 1e-7)]);
        let csv = export_all_csv(&dataset);
        assert_eq!(csv, format!("{EXPORT_HEADER}\ne,m,1e+21,1e-7"));
        let records =
            crate::ingest::read_csv(csv.as_bytes(), &crate::ingest::IngestOptions::strict())
                .unwrap();
        assert_eq!(normalize(&records), dataset);
    }

    #[test]
    fn test_nan_values_exported_verbatim() {
        let dataset = normalize(&[RawRecord::new("e", "m", 0.0, f64::NAN)]);
        assert_eq!(export_all_csv(&dataset), format!("{EXPORT_HEADER}\ne,m,0,NaN"));
    }
}
