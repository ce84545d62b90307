//! SQLite-backed persistent storage for an [`Index`](crate::index::Index):
//! one table per product, in a single database file per catalog.
//!
//! `sqlx` is the host workspace's SQLite crate of choice (it already backs
//! the downloader service's state database), but its API is inherently
//! async. The rest of this engine is deliberately synchronous, so each
//! `IndexDatabase` owns a private current-thread Tokio runtime used only to
//! drive `sqlx` calls to completion before returning — nothing above this
//! module ever awaits anything.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use fs4::FileExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::instrument;

use swathcat_core::error::{CatalogError, CatalogResult};
use swathcat_core::{wkb, TimeRange};
use swathcat_granule::{FileRecord, Granule, IndexRange};

/// How long a new connection will wait for the SQLite write lock before
/// giving up, matching the "long-timeout connection" requirement so
/// readers can ride out writer contention.
const BUSY_TIMEOUT: Duration = Duration::from_secs(6000);

/// Persistent, per-product SQLite storage backing an [`Index`](crate::index::Index).
pub struct IndexDatabase {
    db_path: PathBuf,
    lock_path: PathBuf,
    runtime: tokio::runtime::Runtime,
    pool: SqlitePool,
}

impl IndexDatabase {
    /// Opens (creating if absent) the SQLite file at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>) -> CatalogResult<Self> {
        let db_path = db_path.into();
        let lock_path = sidecar_lock_path(&db_path);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CatalogError::StorageError(e.to_string()))?;

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);
        let pool = runtime
            .block_on(SqlitePoolOptions::new().max_connections(4).connect_with(options))
            .map_err(|e| CatalogError::StorageError(e.to_string()))?;

        Ok(IndexDatabase { db_path, lock_path, runtime, pool })
    }

    /// Creates the table for `product_name` if it does not already exist.
    /// Table names are taken directly from the product name (product names
    /// are validated elsewhere to be identifier-safe).
    #[instrument(skip(self))]
    pub fn ensure_table(&self, product_name: &str) -> CatalogResult<()> {
        let ddl = schema_sql(product_name);
        self.runtime
            .block_on(sqlx::query(&ddl).execute(&self.pool))
            .map_err(|e| CatalogError::StorageError(e.to_string()))?;
        Ok(())
    }

    /// Appends `rows` to `product_name`'s table under the sidecar file
    /// lock, using `INSERT OR IGNORE` so repeated saves of the same rows
    /// are idempotent.
    #[instrument(skip(self, rows), fields(product = %product_name, rows = rows.len()))]
    pub fn save(&self, product_name: &str, rows: &[Granule]) -> CatalogResult<()> {
        self.ensure_table(product_name)?;
        let _guard = self.lock_exclusive()?;

        self.runtime.block_on(async {
            let mut tx = self.pool.begin().await.map_err(|e| CatalogError::StorageError(e.to_string()))?;
            let table = quote_ident(product_name);
            for row in rows {
                let key = row_key(row);
                let geometry = compress_geometry(row)?;
                sqlx::query(&format!(
                    "INSERT OR IGNORE INTO {table} (
                        key, start_time, end_time, local_path, remote_path, provider_id, filename,
                        primary_index_name, primary_index_start, primary_index_end,
                        secondary_index_name, secondary_index_start, secondary_index_end,
                        geometry
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ))
                .bind(key)
                .bind(row.time_range.start.to_rfc3339())
                .bind(row.time_range.end.to_rfc3339())
                .bind(row.file_record.local_path.as_ref().map(|p| p.to_string_lossy().into_owned()))
                .bind(row.file_record.remote_path.clone())
                .bind(row.file_record.provider_id.clone())
                .bind(row.file_record.filename.clone())
                .bind(row.primary_index_name.clone())
                .bind(row.primary_index.start)
                .bind(row.primary_index.end)
                .bind(row.secondary_index_name.clone())
                .bind(row.secondary_index.map(|r| r.start))
                .bind(row.secondary_index.map(|r| r.end))
                .bind(geometry)
                .execute(&mut *tx)
                .await
                .map_err(|e| CatalogError::StorageError(e.to_string()))?;
            }
            tx.commit().await.map_err(|e| CatalogError::StorageError(e.to_string()))?;
            Ok::<_, CatalogError>(())
        })
    }

    /// Loads every row for `product_name`, optionally restricted to
    /// `time_range` via a parameterized predicate pushed down to SQLite.
    #[instrument(skip(self))]
    pub fn load(&self, product_name: &str, time_range: Option<&TimeRange>) -> CatalogResult<Vec<Granule>> {
        self.ensure_table(product_name)?;
        let table = quote_ident(product_name);
        let sql = match time_range {
            Some(_) => format!(
                "SELECT * FROM {table} WHERE NOT (start_time > ? OR end_time < ?) ORDER BY start_time"
            ),
            None => format!("SELECT * FROM {table} ORDER BY start_time"),
        };

        let rows = self.runtime.block_on(async {
            let mut query = sqlx::query(&sql);
            if let Some(tr) = time_range {
                query = query.bind(tr.end.to_rfc3339()).bind(tr.start.to_rfc3339());
            }
            query.fetch_all(&self.pool).await.map_err(|e| CatalogError::StorageError(e.to_string()))
        })?;

        rows.iter().map(|row| row_to_granule(product_name, row)).collect()
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock_exclusive(&self) -> CatalogResult<std::fs::File> {
        let file = OpenOptions::new().create(true).write(true).open(&self.lock_path)?;
        FileExt::lock_exclusive(&file).map_err(|e| CatalogError::StorageError(e.to_string()))?;
        Ok(file)
    }
}

fn sidecar_lock_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    db_path.with_file_name(name)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn row_key(g: &Granule) -> String {
    format!(
        "{}_{:06}_{:06}",
        g.file_record.filename,
        g.primary_index.start,
        g.secondary_index.map(|r| r.start).unwrap_or(-1)
    )
}

fn compress_geometry(g: &Granule) -> CatalogResult<Vec<u8>> {
    let raw = wkb::to_wkb(&g.geometry)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    encoder.finish().map_err(CatalogError::Io)
}

/// Geometry is deserialized by first attempting a raw WKB parse; only if
/// that fails do we assume the bytes are zlib-compressed, matching rows
/// written by older, uncompressed versions of this store.
fn decompress_geometry(bytes: &[u8]) -> CatalogResult<swathcat_core::Geometry> {
    if let Ok(geom) = wkb::from_wkb(bytes) {
        return Ok(geom);
    }
    let mut decoder = ZlibDecoder::new(bytes);
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw)?;
    wkb::from_wkb(&raw)
}

fn row_to_granule(product_name: &str, row: &sqlx::sqlite::SqliteRow) -> CatalogResult<Granule> {
    let filename: String = row.try_get("filename").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let local_path: Option<String> =
        row.try_get("local_path").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let remote_path: Option<String> =
        row.try_get("remote_path").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let provider_id: Option<String> =
        row.try_get("provider_id").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let start_time: String =
        row.try_get("start_time").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let end_time: String = row.try_get("end_time").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let primary_index_name: String =
        row.try_get("primary_index_name").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let primary_start: i64 =
        row.try_get("primary_index_start").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let primary_end: i64 =
        row.try_get("primary_index_end").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let secondary_index_name: Option<String> =
        row.try_get("secondary_index_name").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let secondary_start: Option<i64> =
        row.try_get("secondary_index_start").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let secondary_end: Option<i64> =
        row.try_get("secondary_index_end").map_err(|e| CatalogError::StorageError(e.to_string()))?;
    let geometry_bytes: Vec<u8> =
        row.try_get("geometry").map_err(|e| CatalogError::StorageError(e.to_string()))?;

    let mut file_record = FileRecord::new(product_name, filename);
    if let Some(p) = local_path {
        file_record = file_record.with_local_path(p);
    }
    if let Some(p) = remote_path {
        file_record = file_record.with_remote_path(p);
    }
    if let Some(p) = provider_id {
        file_record = file_record.with_provider_id(p);
    }

    let time_range = TimeRange::from_rfc3339(&start_time, &end_time)?;
    let geometry = decompress_geometry(&geometry_bytes)?;

    let mut granule = Granule::new(file_record, time_range, geometry)
        .with_primary_index(primary_index_name, IndexRange::new(primary_start, primary_end));
    if let (Some(name), Some(start), Some(end)) = (secondary_index_name, secondary_start, secondary_end) {
        granule = granule.with_secondary_index(name, IndexRange::new(start, end));
    }
    Ok(granule)
}

fn schema_sql(product_name: &str) -> String {
    let table = quote_ident(product_name);
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            key TEXT PRIMARY KEY,
            start_time DATETIME NOT NULL,
            end_time DATETIME NOT NULL,
            local_path TEXT,
            remote_path TEXT,
            provider_id TEXT,
            filename TEXT NOT NULL,
            primary_index_name TEXT,
            primary_index_start INTEGER,
            primary_index_end INTEGER,
            secondary_index_name TEXT,
            secondary_index_start INTEGER,
            secondary_index_end INTEGER,
            geometry BLOB
        )"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use swathcat_core::Geometry;

    fn granule(filename: &str, hour: u32) -> Granule {
        let fr = FileRecord::new("test.product", filename);
        let start = Utc.with_ymd_and_hms(2020, 1, 1, hour, 0, 0).unwrap();
        let end = start + chrono::Duration::hours(1);
        Granule::new(fr, TimeRange::new(start, end), Geometry::Point { lon: 1.0, lat: 2.0 })
    }

    #[test]
    fn save_then_load_round_trips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = IndexDatabase::open(dir.path().join("catalog.sqlite")).unwrap();
        let rows = vec![granule("a.nc", 0), granule("b.nc", 1)];
        db.save("test.product", &rows).unwrap();

        let loaded = db.load("test.product", None).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].file_record.filename, "a.nc");
    }

    #[test]
    fn save_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = IndexDatabase::open(dir.path().join("catalog.sqlite")).unwrap();
        let rows = vec![granule("a.nc", 0)];
        db.save("test.product", &rows).unwrap();
        db.save("test.product", &rows).unwrap();

        let loaded = db.load("test.product", None).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn load_filters_by_time_range() {
        let dir = tempfile::tempdir().unwrap();
        let db = IndexDatabase::open(dir.path().join("catalog.sqlite")).unwrap();
        db.save("test.product", &[granule("a.nc", 0), granule("b.nc", 10)]).unwrap();

        let query = TimeRange::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 1, 0, 59).unwrap(),
        );
        let loaded = db.load("test.product", Some(&query)).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].file_record.filename, "a.nc");
    }
}
