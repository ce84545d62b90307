//! Declarative product loading: builds a [`Product`] implementation from a
//! TOML description of a filename pattern and its coverage, so a new
//! product can be registered without writing Rust.

use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;

use swathcat_core::error::{CatalogError, CatalogResult};
use swathcat_core::{Geometry, TimeRange};
use swathcat_granule::FileRecord;

use crate::product::{Dataset, Product};

/// The on-disk description of one declarative product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDescription {
    pub name: String,
    /// A regex with named capture groups among `year`, `month`, `day`,
    /// `hour`, `minute`, `second`, applied to the filename (not the full
    /// path) to recover the file's start time.
    pub filename_pattern: String,
    /// Length of the file's coverage, starting at the parsed time.
    pub duration_minutes: i64,
    pub spatial_coverage: SpatialCoverage,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SpatialCoverage {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

/// A [`Product`] whose matching and coverage extraction are driven
/// entirely by a [`ProductDescription`] rather than hand-written Rust.
pub struct ConfigParserProduct {
    description: ProductDescription,
    pattern: Regex,
}

impl ConfigParserProduct {
    pub fn from_description(description: ProductDescription) -> CatalogResult<Self> {
        let pattern = Regex::new(&description.filename_pattern)
            .map_err(|e| CatalogError::ConfigError(format!("invalid filename_pattern: {e}")))?;
        Ok(ConfigParserProduct { description, pattern })
    }

    /// Parses a single product description out of a TOML document with a
    /// `[product]` table (plus a nested `[product.spatial_coverage]`).
    pub fn from_toml(text: &str) -> CatalogResult<Self> {
        #[derive(Deserialize)]
        struct Document {
            product: ProductDescription,
        }
        let doc: Document =
            toml::from_str(text).map_err(|e| CatalogError::ConfigError(e.to_string()))?;
        Self::from_description(doc.product)
    }

    fn parse_start_time(&self, filename: &str) -> CatalogResult<chrono::DateTime<Utc>> {
        let captures = self.pattern.captures(filename).ok_or_else(|| {
            CatalogError::FormatError(format!(
                "{filename} does not match pattern for product {}",
                self.description.name
            ))
        })?;
        let field = |name: &str, default: u32| -> CatalogResult<u32> {
            match captures.name(name) {
                Some(m) => m.as_str().parse().map_err(|_| {
                    CatalogError::FormatError(format!("non-numeric {name} in {filename}"))
                }),
                None => Ok(default),
            }
        };
        let year: i32 = match captures.name("year") {
            Some(m) => m.as_str().parse().map_err(|_| {
                CatalogError::FormatError(format!("non-numeric year in {filename}"))
            })?,
            None => {
                return Err(CatalogError::FormatError(format!(
                    "filename pattern for {} has no `year` capture group",
                    self.description.name
                )))
            }
        };
        let month = field("month", 1)?;
        let day = field("day", 1)?;
        let hour = field("hour", 0)?;
        let minute = field("minute", 0)?;
        let second = field("second", 0)?;

        let naive = NaiveDateTime::parse_from_str(
            &format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"),
            "%Y-%m-%d %H:%M:%S",
        )
        .map_err(|e| CatalogError::FormatError(format!("invalid date/time in {filename}: {e}")))?;

        Ok(Utc.from_utc_datetime(&naive))
    }
}

impl Product for ConfigParserProduct {
    fn name(&self) -> &str {
        &self.description.name
    }

    fn matches(&self, record: &FileRecord) -> bool {
        self.pattern.is_match(&record.filename)
    }

    fn get_temporal_coverage(&self, record: &FileRecord) -> CatalogResult<TimeRange> {
        let start = self.parse_start_time(&record.filename)?;
        let end = start + Duration::minutes(self.description.duration_minutes);
        Ok(TimeRange::new(start, end))
    }

    fn get_spatial_coverage(&self, _record: &FileRecord) -> CatalogResult<Geometry> {
        let c = self.description.spatial_coverage;
        Ok(Geometry::LonLatRect { lon_min: c.lon_min, lat_min: c.lat_min, lon_max: c.lon_max, lat_max: c.lat_max })
    }

    fn open(&self, record: &FileRecord) -> CatalogResult<Dataset> {
        Err(CatalogError::MissingInformation(format!(
            "{} is a declarative, coverage-only product and has no reader for {}",
            self.description.name, record.filename
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE_TOML: &str = r#"
        [product]
        name = "configparser.example.v1"
        filename_pattern = '^example_(?P<year>\d{4})(?P<month>\d{2})(?P<day>\d{2})_(?P<hour>\d{2})(?P<minute>\d{2})\.dat$'
        duration_minutes = 60

        [product.spatial_coverage]
        lon_min = -10.0
        lat_min = -10.0
        lon_max = 10.0
        lat_max = 10.0
    "#;

    #[test]
    fn matches_filenames_conforming_to_pattern() {
        let product = ConfigParserProduct::from_toml(EXAMPLE_TOML).unwrap();
        let record = FileRecord::new("configparser.example.v1", "example_20200101_0000.dat");
        assert!(product.matches(&record));
    }

    #[test]
    fn extracts_temporal_coverage_from_filename() {
        let product = ConfigParserProduct::from_toml(EXAMPLE_TOML).unwrap();
        let record = FileRecord::new("configparser.example.v1", "example_20200101_0130.dat");
        let coverage = product.get_temporal_coverage(&record).unwrap();
        assert_eq!(coverage.duration(), Duration::minutes(60));
    }

    #[test]
    fn rejects_filename_not_matching_pattern() {
        let product = ConfigParserProduct::from_toml(EXAMPLE_TOML).unwrap();
        let record = FileRecord::new("configparser.example.v1", "not-a-match.dat");
        assert!(matches!(
            product.get_temporal_coverage(&record),
            Err(CatalogError::FormatError(_))
        ));
    }
}
