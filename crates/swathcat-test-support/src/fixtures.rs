//! Fixture builders for common catalog-engine test objects.

use chrono::{DateTime, TimeZone, Utc};

use swathcat_core::error::CatalogResult;
use swathcat_core::{Geometry, TimeRange};
use swathcat_granule::{FileRecord, Granule};

/// A fixed reference time used across tests that need a stable instant:
/// 2024-01-15T12:00:00Z.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// Common bounding boxes, as `(lon_min, lat_min, lon_max, lat_max)`.
pub mod bbox {
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);
    pub const CONUS: (f64, f64, f64, f64) = (-130.0, 20.0, -60.0, 55.0);
    pub const SMALL_TILE: (f64, f64, f64, f64) = (-100.0, 40.0, -99.0, 41.0);
    pub const CROSSES_ANTIMERIDIAN: (f64, f64, f64, f64) = (160.0, -50.0, -140.0, 50.0);
}

/// A small rectangle `size` degrees wide, anchored at `(lon, lat)`.
pub fn rect_geometry(lon: f64, lat: f64, size: f64) -> Geometry {
    Geometry::LonLatRect { lon_min: lon, lat_min: lat, lon_max: lon + size, lat_max: lat + size }
}

/// A granule covering the given time range and a one-degree rect at
/// `(lon, lat)`, for `product_name`/`filename`.
pub fn granule(product_name: &str, filename: &str, time_range: TimeRange, lon: f64, lat: f64) -> Granule {
    let record = FileRecord::new(product_name, filename);
    Granule::new(record, time_range, rect_geometry(lon, lat, 1.0))
}

/// A granule spanning a single instant at `reference_time()`.
pub fn instant_granule(product_name: &str, filename: &str, lon: f64, lat: f64) -> Granule {
    granule(product_name, filename, TimeRange::instant(reference_time()), lon, lat)
}

/// A minimal [`swathcat_catalog::GranuleSource`] that always yields one
/// fixed granule per file, regardless of content. Useful wherever a test
/// needs a `GranuleSource` but does not care about real extraction.
pub struct FixedGranuleSource {
    pub product_name: String,
    pub time_range: TimeRange,
    pub geometry: Geometry,
}

impl FixedGranuleSource {
    pub fn new(product_name: impl Into<String>, time_range: TimeRange, geometry: Geometry) -> Self {
        FixedGranuleSource { product_name: product_name.into(), time_range, geometry }
    }
}

impl swathcat_catalog::GranuleSource for FixedGranuleSource {
    fn product_name(&self) -> &str {
        &self.product_name
    }

    fn matches(&self, _record: &FileRecord) -> bool {
        true
    }

    fn get_granules(&self, record: &FileRecord) -> CatalogResult<Vec<Granule>> {
        Ok(vec![Granule::new(record.clone(), self.time_range, self.geometry.clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_granule_uses_the_reference_time() {
        let g = instant_granule("test.product", "a.nc", 0.0, 0.0);
        assert_eq!(g.time_range.start, reference_time());
    }

    #[test]
    fn fixed_granule_source_always_matches() {
        use swathcat_catalog::GranuleSource;
        let source = FixedGranuleSource::new(
            "test.product",
            TimeRange::instant(reference_time()),
            rect_geometry(0.0, 0.0, 1.0),
        );
        let record = FileRecord::new("test.product", "a.nc");
        assert!(source.matches(&record));
        assert_eq!(source.get_granules(&record).unwrap().len(), 1);
    }
}
