//! Arrow / Parquet ingest
//!
//! Columns are located by name and cast to the pipeline's types with the
//! Arrow cast kernels: ids to `Utf8`, step/value to `Float64`. Null ids read
//! as empty strings; null or uncastable numerics go through the coercion
//! policy.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{debug, info};

use super::{
    missing_columns_error, CellCoercer, IngestOptions, EXPERIMENT_ID_COLUMN, METRIC_NAME_COLUMN,
    STEP_COLUMN, VALUE_COLUMN,
};
use crate::experiment::RawRecord;
use crate::Result;

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .schema()
        .index_of(name)
        .map(|index| batch.column(index))
        .map_err(|_| missing_columns_error())
}

fn utf8_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let casted = cast(column(batch, name)?, &DataType::Utf8)?;
    Ok(casted.as_string::<i32>().clone())
}

fn float_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let casted = cast(column(batch, name)?, &DataType::Float64)?;
    Ok(casted.as_primitive::<Float64Type>().clone())
}

fn text_at(array: &StringArray, row: usize) -> &str {
    if array.is_null(row) {
        ""
    } else {
        array.value(row)
    }
}

fn number_at(array: &Float64Array, row: usize) -> Option<f64> {
    (!array.is_null(row)).then(|| array.value(row))
}

fn batch_records(
    batch: &RecordBatch,
    row_offset: usize,
    coercer: &mut CellCoercer,
) -> Result<Vec<RawRecord>> {
    let experiments = utf8_column(batch, EXPERIMENT_ID_COLUMN)?;
    let metrics = utf8_column(batch, METRIC_NAME_COLUMN)?;
    let steps = float_column(batch, STEP_COLUMN)?;
    let values = float_column(batch, VALUE_COLUMN)?;

    (0..batch.num_rows())
        .map(|row| {
            let global_row = row_offset + row;
            let step = coercer.coerce(number_at(&steps, row), global_row, STEP_COLUMN, "null")?;
            let value = coercer.coerce(number_at(&values, row), global_row, VALUE_COLUMN, "null")?;
            Ok(RawRecord::new(
                text_at(&experiments, row),
                text_at(&metrics, row),
                step,
                value,
            ))
        })
        .collect()
}

/// Convert an Arrow record batch to raw records, in row order.
///
/// # Errors
/// - [`Error::Format`](crate::Error::Format) if a required column is missing
/// - [`Error::Arrow`](crate::Error::Arrow) if a column cannot be cast
/// - [`Error::Coercion`](crate::Error::Coercion) for a null/uncastable
///   numeric cell under strict coercion
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use arrow::array::{Float64Array, Int64Array, RecordBatch, StringArray};
/// use arrow::datatypes::{DataType, Field, Schema};
/// use trueno_metrics::ingest::{records_from_batch, IngestOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Arc::new(Schema::new(vec![
///     Field::new("experiment_id", DataType::Utf8, false),
///     Field::new("metric_name", DataType::Utf8, false),
///     Field::new("step", DataType::Int64, false),
///     Field::new("value", DataType::Float64, false),
/// ]));
/// let batch = RecordBatch::try_new(
///     schema,
///     vec![
///         Arc::new(StringArray::from(vec!["exp1", "exp1"])),
///         Arc::new(StringArray::from(vec!["loss", "loss"])),
///         Arc::new(Int64Array::from(vec![0, 1])),
///         Arc::new(Float64Array::from(vec![1.0, 0.5])),
///     ],
/// )?;
///
/// let records = records_from_batch(&batch, &IngestOptions::default())?;
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[1].step(), 1.0);
/// # Ok(())
/// # }
/// ```
pub fn records_from_batch(batch: &RecordBatch, options: &IngestOptions) -> Result<Vec<RawRecord>> {
    let mut coercer = CellCoercer::new(options);
    let records = batch_records(batch, 0, &mut coercer)?;
    coercer.report("arrow");
    Ok(records)
}

/// Read every record batch of a Parquet file, in file order.
///
/// # Errors
/// - [`Error::Io`](crate::Error::Io) if the file cannot be opened
/// - [`Error::Parquet`](crate::Error::Parquet) if it is not valid Parquet
/// - anything [`records_from_batch`] returns
pub fn read_parquet<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<Vec<RawRecord>> {
    let file = File::open(path.as_ref())?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut coercer = CellCoercer::new(options);
    let mut records = Vec::new();
    for (index, batch) in reader.enumerate() {
        let batch = batch?;
        debug!(batch = index, rows = batch.num_rows(), "read Parquet batch");
        let offset = records.len();
        records.extend(batch_records(&batch, offset, &mut coercer)?);
    }

    coercer.report("parquet");
    info!(path = %path.as_ref().display(), records = records.len(), "read Parquet");
    Ok(records)
}
