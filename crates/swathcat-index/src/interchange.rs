//! Apache Parquet export of an [`Index`] for interchange with other tools.
//! This is additive only: SQLite remains the sole incremental on-disk
//! format, Parquet is write-only here.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Int64Array, StringArray, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use swathcat_core::error::{CatalogError, CatalogResult};
use swathcat_core::wkb;
use swathcat_granule::Granule;

use crate::index::Index;

/// Writes `index` to `path` as a single-file Parquet table, one row per
/// granule, using the same column set the SQLite schema uses, with
/// geometry stored as an uncompressed WKB byte column.
pub fn write_parquet(index: &Index, path: &Path) -> CatalogResult<()> {
    let batch = to_record_batch(index.rows())?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .map_err(|e| CatalogError::StorageError(e.to_string()))?;
    writer.write(&batch).map_err(|e| CatalogError::StorageError(e.to_string()))?;
    writer.close().map_err(|e| CatalogError::StorageError(e.to_string()))?;
    Ok(())
}

fn to_record_batch(rows: &[Granule]) -> CatalogResult<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("filename", DataType::Utf8, false),
        Field::new("local_path", DataType::Utf8, true),
        Field::new("remote_path", DataType::Utf8, true),
        Field::new("start_time", DataType::Timestamp(TimeUnit::Nanosecond, None), false),
        Field::new("end_time", DataType::Timestamp(TimeUnit::Nanosecond, None), false),
        Field::new("primary_index_name", DataType::Utf8, true),
        Field::new("primary_index_start", DataType::Int64, true),
        Field::new("primary_index_end", DataType::Int64, true),
        Field::new("secondary_index_name", DataType::Utf8, true),
        Field::new("secondary_index_start", DataType::Int64, true),
        Field::new("secondary_index_end", DataType::Int64, true),
        Field::new("geometry", DataType::Binary, true),
    ]));

    let filename: StringArray = rows.iter().map(|g| Some(g.file_record.filename.clone())).collect();
    let local_path: StringArray = rows
        .iter()
        .map(|g| g.file_record.local_path.as_ref().map(|p| p.to_string_lossy().into_owned()))
        .collect();
    let remote_path: StringArray = rows.iter().map(|g| g.file_record.remote_path.clone()).collect();
    let start_time: TimestampNanosecondArray =
        rows.iter().map(|g| Some(g.time_range.start.timestamp_nanos_opt().unwrap_or_default())).collect();
    let end_time: TimestampNanosecondArray =
        rows.iter().map(|g| Some(g.time_range.end.timestamp_nanos_opt().unwrap_or_default())).collect();
    let primary_index_name: StringArray = rows.iter().map(|g| Some(g.primary_index_name.clone())).collect();
    let primary_index_start: Int64Array = rows.iter().map(|g| Some(g.primary_index.start)).collect();
    let primary_index_end: Int64Array = rows.iter().map(|g| Some(g.primary_index.end)).collect();
    let secondary_index_name: StringArray = rows.iter().map(|g| g.secondary_index_name.clone()).collect();
    let secondary_index_start: Int64Array = rows.iter().map(|g| g.secondary_index.map(|r| r.start)).collect();
    let secondary_index_end: Int64Array = rows.iter().map(|g| g.secondary_index.map(|r| r.end)).collect();
    let geometry = {
        let encoded: CatalogResult<Vec<Vec<u8>>> = rows.iter().map(|g| wkb::to_wkb(&g.geometry)).collect();
        let encoded = encoded?;
        arrow::array::BinaryArray::from(encoded.iter().map(|v| Some(v.as_slice())).collect::<Vec<_>>())
    };

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(filename),
            Arc::new(local_path),
            Arc::new(remote_path),
            Arc::new(start_time),
            Arc::new(end_time),
            Arc::new(primary_index_name),
            Arc::new(primary_index_start),
            Arc::new(primary_index_end),
            Arc::new(secondary_index_name),
            Arc::new(secondary_index_start),
            Arc::new(secondary_index_end),
            Arc::new(geometry),
        ],
    )
    .map_err(|e| CatalogError::StorageError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use swathcat_core::{Geometry, TimeRange};
    use swathcat_granule::FileRecord;

    #[test]
    fn writes_parquet_file_for_nonempty_index() {
        let mut index = Index::empty("test.product");
        let fr = FileRecord::new("test.product", "a.nc");
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let granule = Granule::new(
            fr,
            TimeRange::new(start, start + chrono::Duration::hours(1)),
            Geometry::Point { lon: 1.0, lat: 2.0 },
        );
        index.insert(granule);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        write_parquet(&index, &path).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
