//! A fully-working example product, illustrating the `Product` contract
//! end to end: filename parsing, coverage extraction, and opening.
//!
//! Grounded on `pansat.products.example.ExampleProduct`: filenames of the
//! form `data_file_<start>_<end>_<lon_min>_<lat_min>_<lon_max>_<lat_max>.<suffix>`
//! encode their own coverage, so no file needs to be opened to index one.

use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use swathcat_core::error::{CatalogError, CatalogResult};
use swathcat_core::{Geometry, TimeRange};
use swathcat_granule::FileRecord;

use crate::product::{Dataset, Product};

static FILENAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^data_file_(?P<start>\d{14})_(?P<end>\d{14})_(?P<lon_min>[+-]\d{2}\.\d{2})_(?P<lat_min>[+-]\d{2}\.\d{2})_(?P<lon_max>[+-]\d{2}\.\d{2})_(?P<lat_max>[+-]\d{2}\.\d{2})\.",
    )
    .expect("example product filename pattern is valid")
});

/// A raw file opened by [`ExampleProduct::open`]: its bytes, since this
/// crate does not implement a real file-format reader.
pub struct ExampleDataset(pub Arc<[u8]>);

/// The example product: every coverage detail lives in the filename, so
/// `open` is the only operation that ever touches the file itself.
pub struct ExampleProduct {
    name: String,
    suffix: String,
    cache: Mutex<HashMap<PathBuf, Arc<[u8]>>>,
}

impl ExampleProduct {
    pub fn new(name: impl Into<String>, suffix: impl Into<String>) -> Self {
        ExampleProduct { name: format!("example.{}", name.into()), suffix: suffix.into(), cache: Mutex::new(HashMap::new()) }
    }

    fn parse(&self, record: &FileRecord) -> CatalogResult<regex::Captures<'_>> {
        FILENAME_PATTERN
            .captures(&record.filename)
            .filter(|_| record.filename.ends_with(&self.suffix))
            .ok_or_else(|| CatalogError::FormatError(record.filename.clone()))
    }
}

impl Product for ExampleProduct {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, record: &FileRecord) -> bool {
        self.parse(record).is_ok()
    }

    fn get_temporal_coverage(&self, record: &FileRecord) -> CatalogResult<TimeRange> {
        let caps = self.parse(record)?;
        let parse_one = |field: &str| -> CatalogResult<_> {
            NaiveDateTime::parse_from_str(&caps[field], "%Y%m%d%H%M%S")
                .map(|naive| Utc.from_utc_datetime(&naive))
                .map_err(|e| CatalogError::FormatError(format!("{}: {e}", record.filename)))
        };
        Ok(TimeRange::new(parse_one("start")?, parse_one("end")?))
    }

    fn get_spatial_coverage(&self, record: &FileRecord) -> CatalogResult<Geometry> {
        let caps = self.parse(record)?;
        let parse_f64 = |field: &str| -> CatalogResult<f64> {
            caps[field].parse().map_err(|_| CatalogError::FormatError(record.filename.clone()))
        };
        Ok(Geometry::LonLatRect {
            lon_min: parse_f64("lon_min")?,
            lat_min: parse_f64("lat_min")?,
            lon_max: parse_f64("lon_max")?,
            lat_max: parse_f64("lat_max")?,
        })
    }

    /// Reads the file's bytes, caching by path so a second call within the
    /// same process does not reopen the file (the resolution the design
    /// notes settled on for the "double-opening datasets" question).
    fn open(&self, record: &FileRecord) -> CatalogResult<Dataset> {
        let path = record
            .local_path
            .clone()
            .ok_or_else(|| CatalogError::MissingInformation(format!("{} has no local path", record.filename)))?;

        if let Some(cached) = self.cache.lock().expect("example product cache lock poisoned").get(&path) {
            return Ok(Box::new(ExampleDataset(cached.clone())) as Box<dyn Any + Send>);
        }

        let bytes: Arc<[u8]> = std::fs::read(&path)?.into();
        self.cache.lock().expect("example product cache lock poisoned").insert(path, bytes.clone());
        Ok(Box::new(ExampleDataset(bytes)) as Box<dyn Any + Send>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str) -> FileRecord {
        FileRecord::new("example.hdf5_product", filename)
    }

    #[test]
    fn matches_the_documented_filename_convention() {
        let product = ExampleProduct::new("hdf5_product", "h5");
        let r = record("data_file_20200101000000_20200101010000_+000.00_-05.00_+010.00_+005.00.h5");
        assert!(product.matches(&r));
        assert!(!product.matches(&record("not_a_match.h5")));
    }

    #[test]
    fn extracts_temporal_and_spatial_coverage_from_the_filename() {
        let product = ExampleProduct::new("hdf5_product", "h5");
        let r = record("data_file_20200101000000_20200101010000_+000.00_-05.00_+010.00_+005.00.h5");
        let coverage = product.get_temporal_coverage(&r).unwrap();
        assert_eq!(coverage.duration(), chrono::Duration::hours(1));

        let geometry = product.get_spatial_coverage(&r).unwrap();
        assert_eq!(geometry, Geometry::LonLatRect { lon_min: 0.0, lat_min: -5.0, lon_max: 10.0, lat_max: 5.0 });
    }

    #[test]
    fn open_caches_bytes_by_path_across_calls() {
        let product = ExampleProduct::new("hdf5_product", "h5");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_file_20200101000000_20200101010000_+000.00_-05.00_+010.00_+005.00.h5");
        std::fs::write(&path, b"example bytes").unwrap();

        let record = FileRecord::from_local_path("example.hdf5_product", &path);
        let first = product.open(&record).unwrap();
        let second = product.open(&record).unwrap();

        let first = first.downcast_ref::<ExampleDataset>().unwrap();
        let second = second.downcast_ref::<ExampleDataset>().unwrap();
        assert!(Arc::ptr_eq(&first.0, &second.0));
    }
}
