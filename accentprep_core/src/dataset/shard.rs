//! Reading `input_values` vectors out of parquet shards.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::DataType;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::DatasetError;

pub const INPUT_VALUES_COLUMN: &str = "input_values";

/// Load every row's `input_values` from one shard, in row order.
pub fn read_input_values(path: &Path) -> Result<Vec<Vec<f32>>, DatasetError> {
    let fail = |message: String| DatasetError::Parquet {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|source| DatasetError::Cache {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| fail(format!("reading parquet metadata: {e}")))?;

    let root = builder
        .schema()
        .index_of(INPUT_VALUES_COLUMN)
        .map_err(|_| fail(format!("missing '{INPUT_VALUES_COLUMN}' column")))?;
    let mask = ProjectionMask::roots(builder.parquet_schema(), [root]);
    let reader = builder
        .with_projection(mask)
        .build()
        .map_err(|e| fail(format!("building parquet reader: {e}")))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| fail(format!("reading record batch: {e}")))?;
        let column = batch
            .column_by_name(INPUT_VALUES_COLUMN)
            .ok_or_else(|| fail(format!("batch lacks '{INPUT_VALUES_COLUMN}'")))?;

        for row in 0..batch.num_rows() {
            let values = extract_f32_list(column, row)
                .map_err(|message| fail(format!("row {}: {message}", rows.len())))?;
            rows.push(values);
        }
    }

    Ok(rows)
}

/// Pull a `Vec<f32>` out of a List or LargeList column.
fn extract_f32_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f32>, String> {
    if col.is_null(row) {
        return Err("null value in list column".to_string());
    }

    let values = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .ok_or("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .ok_or("expected LargeListArray")?
            .value(row),
        other => return Err(format!("expected List or LargeList column, got {other:?}")),
    };

    if let Some(arr) = values.as_any().downcast_ref::<Float32Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    } else if let Some(arr) = values.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN) as f32).collect())
    } else {
        Err(format!(
            "list inner type is {:?}, expected Float32 or Float64",
            values.data_type()
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use arrow::array::{ArrayRef, Int64Array, RecordBatch};
    use arrow::datatypes::{Float32Type, Float64Type};
    use parquet::arrow::ArrowWriter;

    /// Write a shard with an `input_values` list column and an unrelated label column.
    pub(crate) fn write_shard(path: &Path, rows: &[Vec<f32>]) {
        let list = ListArray::from_iter_primitive::<Float32Type, _, _>(
            rows.iter().map(|r| Some(r.iter().copied().map(Some).collect::<Vec<_>>())),
        );
        let labels = Int64Array::from_iter_values(0..rows.len() as i64);
        let batch = RecordBatch::try_from_iter(vec![
            ("labels", Arc::new(labels) as ArrayRef),
            (INPUT_VALUES_COLUMN, Arc::new(list) as ArrayRef),
        ])
        .unwrap();

        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn reads_float32_lists_in_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0000.parquet");
        write_shard(&path, &[vec![0.5, -0.5], vec![], vec![1.0, 2.0, 3.0]]);

        let rows = read_input_values(&path).unwrap();
        assert_eq!(rows, vec![vec![0.5, -0.5], vec![], vec![1.0, 2.0, 3.0]]);
    }

    #[test]
    fn widens_float64_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f64.parquet");
        let list = ListArray::from_iter_primitive::<Float64Type, _, _>(vec![Some(vec![
            Some(0.25f64),
            Some(-1.0),
        ])]);
        let batch =
            RecordBatch::try_from_iter(vec![(INPUT_VALUES_COLUMN, Arc::new(list) as ArrayRef)])
                .unwrap();
        let mut writer =
            ArrowWriter::try_new(File::create(&path).unwrap(), batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        assert_eq!(read_input_values(&path).unwrap(), vec![vec![0.25, -1.0]]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.parquet");
        let labels = Int64Array::from_iter_values(0..3);
        let batch =
            RecordBatch::try_from_iter(vec![("labels", Arc::new(labels) as ArrayRef)]).unwrap();
        let mut writer =
            ArrowWriter::try_new(File::create(&path).unwrap(), batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let err = read_input_values(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Parquet { .. }));
    }
}
