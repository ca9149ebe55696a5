//! Ingest adapters: CSV text, Arrow batches, Parquet files → [`RawRecord`]s
//!
//! This is the boundary in front of the pipeline and the only place input is
//! rejected. Required columns are located by header name:
//! `experiment_id`, `metric_name`, `step`, `value` (extra columns ignored).
//!
//! Numeric cells follow a [`Coercion`] policy. The permissive default turns
//! unparseable cells into NaN, which then flows through normalization, joins
//! and export untouched; the strict policy rejects the load instead.

mod columnar;

pub use columnar::{read_parquet, records_from_batch};

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::experiment::RawRecord;
use crate::{Error, Result};

/// Column holding the experiment ID
pub const EXPERIMENT_ID_COLUMN: &str = "experiment_id";
/// Column holding the metric name
pub const METRIC_NAME_COLUMN: &str = "metric_name";
/// Column holding the step
pub const STEP_COLUMN: &str = "step";
/// Column holding the value
pub const VALUE_COLUMN: &str = "value";

/// Required input columns, in export order
pub const REQUIRED_COLUMNS: [&str; 4] = [
    EXPERIMENT_ID_COLUMN,
    METRIC_NAME_COLUMN,
    STEP_COLUMN,
    VALUE_COLUMN,
];

/// Policy for numeric cells that do not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercion {
    /// Replace with NaN and keep the record
    #[default]
    Permissive,
    /// Reject the whole input with [`Error::Coercion`]
    Strict,
}

/// Ingest options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Numeric coercion policy
    pub coercion: Coercion,
}

impl IngestOptions {
    /// Options rejecting unparseable numeric cells.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            coercion: Coercion::Strict,
        }
    }
}

fn missing_columns_error() -> Error {
    Error::Format(format!(
        "input must contain columns: {}",
        REQUIRED_COLUMNS.join(", ")
    ))
}

/// Parse a numeric cell.
///
/// Follows the number grammar of browser CSV tooling: surrounding whitespace
/// is ignored, an empty cell reads as `0`, unsigned `0x`/`0o`/`0b` integer
/// literals are accepted, and the only spelled-out values are the exporter's
/// `NaN`, `Infinity`, `+Infinity` and `-Infinity` (case-sensitive). Rust-only
/// spellings such as `inf`, `nan` or `infinity` are not numbers.
/// Returns `None` when the text is not a number.
///
/// # Examples
///
/// ```rust
/// use trueno_metrics::ingest::coerce_number;
///
/// assert_eq!(coerce_number(" 42 "), Some(42.0));
/// assert_eq!(coerce_number(""), Some(0.0));
/// assert_eq!(coerce_number("-Infinity"), Some(f64::NEG_INFINITY));
/// assert!(coerce_number("NaN").unwrap().is_nan());
/// assert_eq!(coerce_number("0x10"), Some(16.0));
/// assert_eq!(coerce_number("1e+21"), Some(1e21));
/// assert_eq!(coerce_number("inf"), None);
/// assert_eq!(coerce_number("abc"), None);
/// ```
#[must_use]
pub fn coerce_number(raw: &str) -> Option<f64> {
    let text = raw.trim();
    match text {
        "" => Some(0.0),
        "NaN" => Some(f64::NAN),
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => radix_literal(text).or_else(|| decimal_literal(text)),
    }
}

/// `0x1F`, `0o17`, `0b101`: unsigned, at least one digit.
#[allow(clippy::cast_precision_loss)]
fn radix_literal(text: &str) -> Option<f64> {
    let (radix, digits) = match text.get(..2)? {
        "0x" | "0X" => (16, &text[2..]),
        "0o" | "0O" => (8, &text[2..]),
        "0b" | "0B" => (2, &text[2..]),
        _ => return None,
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    u128::from_str_radix(digits, radix).ok().map(|n| n as f64)
}

fn decimal_literal(text: &str) -> Option<f64> {
    let plain = text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if plain {
        text.parse().ok()
    } else {
        None
    }
}

/// Apply the coercion policy to one cell, counting NaN substitutions.
pub(crate) struct CellCoercer {
    coercion: Coercion,
    coerced: usize,
}

impl CellCoercer {
    pub(crate) const fn new(options: &IngestOptions) -> Self {
        Self {
            coercion: options.coercion,
            coerced: 0,
        }
    }

    pub(crate) fn coerce(
        &mut self,
        parsed: Option<f64>,
        row: usize,
        column: &str,
        raw: &str,
    ) -> Result<f64> {
        match (parsed, self.coercion) {
            (Some(value), _) => Ok(value),
            (None, Coercion::Permissive) => {
                self.coerced += 1;
                Ok(f64::NAN)
            }
            (None, Coercion::Strict) => Err(Error::Coercion {
                row,
                column: column.to_string(),
                raw: raw.to_string(),
            }),
        }
    }

    pub(crate) fn report(&self, source: &str) {
        if self.coerced > 0 {
            warn!(source, cells = self.coerced, "non-numeric cells coerced to NaN");
        }
    }
}

/// Read records from CSV text with a header row.
///
/// Blank lines are skipped.
///
/// # Errors
/// - [`Error::Format`] if a required column is missing
/// - [`Error::Csv`] if the CSV is malformed (e.g. ragged rows)
/// - [`Error::Coercion`] for a non-numeric cell under [`Coercion::Strict`]
///
/// # Examples
///
/// ```rust
/// use trueno_metrics::ingest::{read_csv, IngestOptions};
///
/// let text = "experiment_id,metric_name,step,value\nexp1,loss,0,1.0\n";
/// let records = read_csv(text.as_bytes(), &IngestOptions::default())?;
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].metric_name(), "loss");
/// # Ok::<(), trueno_metrics::Error>(())
/// ```
pub fn read_csv<R: Read>(reader: R, options: &IngestOptions) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|header| header == name);
    let (Some(experiment_idx), Some(metric_idx), Some(step_idx), Some(value_idx)) = (
        position(EXPERIMENT_ID_COLUMN),
        position(METRIC_NAME_COLUMN),
        position(STEP_COLUMN),
        position(VALUE_COLUMN),
    ) else {
        return Err(missing_columns_error());
    };

    let mut coercer = CellCoercer::new(options);
    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let cell = |idx: usize| record.get(idx).unwrap_or_default();

        let raw_step = cell(step_idx);
        let raw_value = cell(value_idx);
        let step = coercer.coerce(coerce_number(raw_step), row, STEP_COLUMN, raw_step)?;
        let value = coercer.coerce(coerce_number(raw_value), row, VALUE_COLUMN, raw_value)?;

        records.push(RawRecord::new(
            cell(experiment_idx),
            cell(metric_idx),
            step,
            value,
        ));
    }

    coercer.report("csv");
    info!(records = records.len(), "read CSV");
    Ok(records)
}

/// Read records from a `.csv` file.
///
/// # Errors
/// - [`Error::Format`] if the path does not end in `.csv`
/// - [`Error::Io`] if the file cannot be opened
/// - anything [`read_csv`] returns
pub fn read_csv_path<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let is_csv = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".csv"));
    if !is_csv {
        debug!(path = %path.display(), "rejected non-CSV path");
        return Err(Error::Format("Please upload a CSV file".to_string()));
    }

    let file = std::fs::File::open(path)?;
    read_csv(std::io::BufReader::new(file), options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "experiment_id,metric_name,step,value";

    #[test]
    fn test_read_csv_basic() {
        let text = format!("{HEADER}\nexp1,loss,0,1.0\nexp1,loss,1,0.5\nexp2,loss,1,0.4\n");
        let records = read_csv(text.as_bytes(), &IngestOptions::default()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2], RawRecord::new("exp2", "loss", 1.0, 0.4));
    }

    #[test]
    fn test_columns_selected_by_name() {
        let text = "value,extra,step,metric_name,experiment_id\n0.5,x,3,acc,exp9\n";
        let records = read_csv(text.as_bytes(), &IngestOptions::default()).unwrap();
        assert_eq!(records, vec![RawRecord::new("exp9", "acc", 3.0, 0.5)]);
    }

    #[test]
    fn test_missing_column_is_format_error() {
        let text = "experiment_id,metric_name,step\nexp1,loss,0\n";
        let err = read_csv(text.as_bytes(), &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(err.to_string().contains("experiment_id, metric_name, step, value"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let text = format!("{HEADER}\n\nexp1,loss,0,1\n\n");
        let records = read_csv(text.as_bytes(), &IngestOptions::default()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_ragged_row_is_csv_error() {
        let text = format!("{HEADER}\nexp1,loss,0\n");
        let err = read_csv(text.as_bytes(), &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }

    #[test]
    fn test_permissive_coercion_yields_nan() {
        let text = format!("{HEADER}\nexp1,loss,abc,oops\n");
        let records = read_csv(text.as_bytes(), &IngestOptions::default()).unwrap();
        assert!(records[0].step().is_nan());
        assert!(records[0].value().is_nan());
    }

    #[test]
    fn test_strict_coercion_rejects() {
        let text = format!("{HEADER}\nexp1,loss,0,1\nexp1,loss,1,oops\n");
        let err = read_csv(text.as_bytes(), &IngestOptions::strict()).unwrap_err();
        match err {
            Error::Coercion { row, column, raw } => {
                assert_eq!(row, 1);
                assert_eq!(column, "value");
                assert_eq!(raw, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_strict_accepts_exported_spellings() {
        let text = format!("{HEADER}\ne,m,0,NaN\ne,m,1,Infinity\n");
        let records = read_csv(text.as_bytes(), &IngestOptions::strict()).unwrap();
        assert!(records[0].value().is_nan());
        assert_eq!(records[1].value(), f64::INFINITY);
    }

    #[test]
    fn test_read_csv_path_rejects_extension() {
        let err = read_csv_path("metrics.txt", &IngestOptions::default()).unwrap_err();
        match err {
            Error::Format(message) => assert_eq!(message, "Please upload a CSV file"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_coerce_number_radix_literals() {
        assert_eq!(coerce_number("0x10"), Some(16.0));
        assert_eq!(coerce_number("0XfF"), Some(255.0));
        assert_eq!(coerce_number("0o17"), Some(15.0));
        assert_eq!(coerce_number("0b101"), Some(5.0));
        assert_eq!(coerce_number("0x"), None);
        assert_eq!(coerce_number("-0x10"), None);
        assert_eq!(coerce_number("0x+1"), None);
        assert_eq!(coerce_number("0xg"), None);
    }

    #[test]
    fn test_coerce_number_rejects_rust_only_spellings() {
        for text in ["inf", "-inf", "infinity", "nan", "NAN", "INFINITY", "1_000"] {
            assert_eq!(coerce_number(text), None, "{text}");
        }
        assert!(coerce_number("NaN").unwrap().is_nan());
    }

    #[test]
    fn test_coerce_number_decimal_forms() {
        assert_eq!(coerce_number("1e+21"), Some(1e21));
        assert_eq!(coerce_number("1e-7"), Some(1e-7));
        assert_eq!(coerce_number(".5"), Some(0.5));
        assert_eq!(coerce_number("+3"), Some(3.0));
        assert_eq!(coerce_number("1e"), None);
    }

    #[test]
    fn test_read_csv_path_missing_file() {
        let err = read_csv_path("/nonexistent/metrics.csv", &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_coercion_config_names() {
        let strict: Coercion = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(strict, Coercion::Strict);
        assert_eq!(Coercion::default(), Coercion::Permissive);
    }
}
