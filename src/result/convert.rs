//! Format conversions for [`QueryResult`]: JSON, Arrow and Parquet.
//!
//! The Arrow `RecordBatch` is the tabular ("dataframe") view of a result. Each
//! column's Arrow type is inferred from its non-null values; columns mixing
//! integers and floats widen to `Float64`, and any other mix (or a decimal
//! column, to keep its digits exact) falls back to `Utf8`.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryBuilder, BooleanBuilder, Date32Builder, Float64Builder, Int64Builder,
    StringBuilder, Time64MicrosecondBuilder, TimestampMicrosecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::{Datelike, Timelike};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::{QueryResult, QueryResultCol};
use crate::error::{ComparatorError, Result};
use crate::value::Value;

/// Days from 0001-01-01 (day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Boolean,
    Int64,
    Float64,
    Utf8,
    Date32,
    Timestamp,
    Time64,
    Binary,
}

impl ColumnKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Boolean),
            Value::Int(_) => Some(Self::Int64),
            Value::Float(_) => Some(Self::Float64),
            Value::Decimal(_) | Value::Text(_) => Some(Self::Utf8),
            Value::Date(_) => Some(Self::Date32),
            Value::DateTime(_) => Some(Self::Timestamp),
            Value::Time(_) => Some(Self::Time64),
            Value::Bytes(_) => Some(Self::Binary),
        }
    }

    fn infer(column: &QueryResultCol<'_>) -> Self {
        column
            .iter()
            .filter_map(Self::of)
            .reduce(|acc, kind| match (acc, kind) {
                (a, b) if a == b => a,
                (Self::Int64, Self::Float64) | (Self::Float64, Self::Int64) => Self::Float64,
                _ => Self::Utf8,
            })
            .unwrap_or(Self::Utf8)
    }

    fn data_type(self) -> DataType {
        match self {
            Self::Boolean => DataType::Boolean,
            Self::Int64 => DataType::Int64,
            Self::Float64 => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
            Self::Date32 => DataType::Date32,
            Self::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
            Self::Time64 => DataType::Time64(TimeUnit::Microsecond),
            Self::Binary => DataType::Binary,
        }
    }
}

fn build_array(kind: ColumnKind, column: &QueryResultCol<'_>) -> ArrayRef {
    let len = column.len();
    match kind {
        ColumnKind::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(len);
            for value in column.iter() {
                builder.append_option(match value {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                });
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Int64 => {
            let mut builder = Int64Builder::with_capacity(len);
            for value in column.iter() {
                builder.append_option(value.as_i64());
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Float64 => {
            let mut builder = Float64Builder::with_capacity(len);
            for value in column.iter() {
                builder.append_option(value.as_f64());
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Utf8 => {
            let mut builder = StringBuilder::with_capacity(len, len * 16);
            for value in column.iter() {
                if value.is_null() {
                    builder.append_null();
                } else {
                    builder.append_value(value.to_string());
                }
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Date32 => {
            let mut builder = Date32Builder::with_capacity(len);
            for value in column.iter() {
                builder.append_option(match value {
                    Value::Date(d) => Some(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
                    _ => None,
                });
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Timestamp => {
            let mut builder = TimestampMicrosecondBuilder::with_capacity(len);
            for value in column.iter() {
                builder.append_option(match value {
                    Value::DateTime(dt) => Some(dt.and_utc().timestamp_micros()),
                    _ => None,
                });
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Time64 => {
            let mut builder = Time64MicrosecondBuilder::with_capacity(len);
            for value in column.iter() {
                builder.append_option(match value {
                    Value::Time(t) => Some(
                        i64::from(t.num_seconds_from_midnight()) * 1_000_000
                            + i64::from(t.nanosecond() % 1_000_000_000) / 1_000,
                    ),
                    _ => None,
                });
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Binary => {
            let mut builder = BinaryBuilder::with_capacity(len, len * 16);
            for value in column.iter() {
                match value {
                    Value::Bytes(b) => builder.append_value(b),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
    }
}

impl QueryResult {
    /// Serialize the rows as a JSON array of objects.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json_value()?)?)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        let mut rows = Vec::with_capacity(self.len());
        for row in self.iter() {
            let mut obj = serde_json::Map::with_capacity(row.len());
            for (key, value) in row.items() {
                obj.insert(key.to_string(), value.to_json()?);
            }
            rows.push(serde_json::Value::Object(obj));
        }
        Ok(serde_json::Value::Array(rows))
    }

    /// The result as an Arrow record batch with one nullable field per column.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.keys.len());
        let mut arrays = Vec::with_capacity(self.keys.len());

        for column in self.columns() {
            let kind = ColumnKind::infer(&column);
            fields.push(Field::new(column.key(), kind.data_type(), true));
            arrays.push(build_array(kind, &column));
        }

        let schema = Arc::new(Schema::new(fields));
        let options = RecordBatchOptions::new().with_row_count(Some(self.len()));
        Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
    }

    /// Write the result to a Parquet file.
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        if self.keys.is_empty() {
            return Err(ComparatorError::EmptyResult);
        }

        let batch = self.to_record_batch()?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(Default::default()))
            .build();

        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Date32Array, Float64Array, Int64Array, StringArray};
    use chrono::NaiveDate;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::TempDir;

    fn results() -> QueryResult {
        QueryResult::from_records(vec![
            vec![
                ("a", Value::Int(1)),
                ("b", Value::Decimal("2".into())),
                ("c", Value::Date(NaiveDate::from_ymd_opt(2018, 8, 1).unwrap())),
            ],
            vec![
                ("a", Value::Int(4)),
                ("b", Value::Decimal("5".into())),
                ("c", Value::Date(NaiveDate::from_ymd_opt(2018, 9, 1).unwrap())),
            ],
            vec![
                ("a", Value::Int(7)),
                ("b", Value::Decimal("8".into())),
                (
                    "c",
                    Value::DateTime(
                        NaiveDate::from_ymd_opt(2018, 10, 1)
                            .unwrap()
                            .and_hms_opt(0, 0, 0)
                            .unwrap(),
                    ),
                ),
            ],
        ])
        .unwrap()
    }

    #[test]
    fn test_to_json_encodes_dates_and_decimals() {
        let expected = r#"[{"a":1,"b":2.0,"c":"2018-08-01"},{"a":4,"b":5.0,"c":"2018-09-01"},{"a":7,"b":8.0,"c":"2018-10-01T00:00:00"}]"#;
        assert_eq!(results().to_json().unwrap(), expected);
    }

    #[test]
    fn test_to_json_rejects_bytes() {
        let qr = QueryResult::from_records(vec![vec![("blob", Value::Bytes(vec![1, 2]))]]).unwrap();
        assert!(matches!(
            qr.to_json(),
            Err(ComparatorError::Unserializable { .. })
        ));
    }

    #[test]
    fn test_record_batch_shape_and_types() {
        let batch = results().to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 3);

        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        // date + datetime mix falls back to text
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);

        let a = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(a.value(2), 7);
        let c = batch.column(2).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(c.value(2), "2018-10-01T00:00:00");
    }

    #[test]
    fn test_record_batch_widens_and_keeps_nulls() {
        let qr = QueryResult::from_records(vec![
            vec![("x", Value::Int(1)), ("d", Value::Null)],
            vec![("x", Value::Float(2.5)), ("d", Value::Date(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()))],
        ])
        .unwrap();
        let batch = qr.to_record_batch().unwrap();

        let x = batch.column(0).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(x.value(0), 1.0);
        assert_eq!(x.value(1), 2.5);

        let d = batch.column(1).as_any().downcast_ref::<Date32Array>().unwrap();
        assert!(d.is_null(0));
        assert_eq!(d.value(1), 1);
    }

    #[test]
    fn test_empty_record_batch() {
        let batch = QueryResult::new().to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 0);
    }

    #[test]
    fn test_write_parquet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.parquet");
        results().write_parquet(&path).unwrap();

        let file = File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let rows: usize = reader.map(|batch| batch.unwrap().num_rows()).sum();
        assert_eq!(rows, 3);

        let err = QueryResult::new().write_parquet(&path).unwrap_err();
        assert!(matches!(err, ComparatorError::EmptyResult));
    }
}
