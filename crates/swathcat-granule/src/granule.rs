//! Granules: a file (or a slice of one) paired with the time range and
//! geometry it covers.

use serde::{Deserialize, Serialize};
use swathcat_core::error::{CatalogError, CatalogResult};
use swathcat_core::{Geometry, TimeRange};

use crate::file_record::FileRecord;

/// A half-open index range along one axis of a gridded file (e.g. the
/// along-track dimension of a swath). `end` of `-1` means "to the end of
/// the axis", mirroring a Python slice with no explicit stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: i64,
    pub end: i64,
}

impl IndexRange {
    pub const FULL: IndexRange = IndexRange { start: 0, end: -1 };

    pub fn new(start: i64, end: i64) -> Self {
        IndexRange { start, end }
    }

    /// Two ranges are adjacent if they overlap or touch, so their union is
    /// contiguous. `end` of `-1` (to the end of the axis) is always
    /// adjacent to anything starting at or before it.
    fn is_adjacent(&self, other: &IndexRange) -> bool {
        let self_end = if self.end == -1 { i64::MAX } else { self.end };
        let other_end = if other.end == -1 { i64::MAX } else { other.end };
        self.start <= other_end && other.start <= self_end
    }

    fn merge(&self, other: &IndexRange) -> IndexRange {
        let start = self.start.min(other.start);
        let end = if self.end == -1 || other.end == -1 { -1 } else { self.end.max(other.end) };
        IndexRange { start, end }
    }
}

/// A contiguous piece of coverage: a file (or slice of one), the time range
/// it spans, and its spatial footprint.
///
/// `primary_index` addresses the dimension granules are typically split and
/// merged along (e.g. along-track scan lines); `secondary_index` addresses
/// a second dimension for datasets that are tiled in two axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Granule {
    pub file_record: FileRecord,
    pub time_range: TimeRange,
    pub geometry: Geometry,
    pub primary_index_name: String,
    pub primary_index: IndexRange,
    pub secondary_index_name: Option<String>,
    pub secondary_index: Option<IndexRange>,
}

impl Granule {
    pub fn new(file_record: FileRecord, time_range: TimeRange, geometry: Geometry) -> Self {
        Granule {
            file_record,
            time_range,
            geometry,
            primary_index_name: "along_track".to_string(),
            primary_index: IndexRange::FULL,
            secondary_index_name: None,
            secondary_index: None,
        }
    }

    pub fn with_primary_index(mut self, name: impl Into<String>, range: IndexRange) -> Self {
        self.primary_index_name = name.into();
        self.primary_index = range;
        self
    }

    pub fn with_secondary_index(mut self, name: impl Into<String>, range: IndexRange) -> Self {
        self.secondary_index_name = Some(name.into());
        self.secondary_index = Some(range);
        self
    }

    /// A key uniquely identifying the region of the file this granule
    /// covers: filename plus both index ranges. Used to deduplicate
    /// granules the way the reference catalog keys on `(filename,
    /// primary_index_name, primary_index, secondary_index_name,
    /// secondary_index)`.
    pub fn identity_key(&self) -> (String, String, IndexRange, Option<String>, Option<IndexRange>) {
        (
            self.file_record.filename.clone(),
            self.primary_index_name.clone(),
            self.primary_index,
            self.secondary_index_name.clone(),
            self.secondary_index,
        )
    }

    /// True if `self` and `other` reference the same file and index axes,
    /// and their primary (and, if present, secondary) index ranges touch.
    pub fn is_adjacent(&self, other: &Granule) -> bool {
        if self.file_record.filename != other.file_record.filename {
            return false;
        }
        if self.primary_index_name != other.primary_index_name {
            return false;
        }
        if self.secondary_index_name != other.secondary_index_name {
            return false;
        }
        if !self.primary_index.is_adjacent(&other.primary_index) {
            return false;
        }
        match (self.secondary_index, other.secondary_index) {
            (Some(a), Some(b)) => a == b || a.is_adjacent(&b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Combines two adjacent granules into one spanning their union.
    ///
    /// The merged time range takes the earliest start and latest end of the
    /// two inputs: `min(self.start, other.start)` .. `max(self.end,
    /// other.end)`. (An earlier revision of this logic mixed `start` and
    /// `end` across the two operands, which silently widened every merge
    /// with whichever side had the later start time; this version does not.)
    pub fn merge(&self, other: &Granule) -> CatalogResult<Granule> {
        if !self.is_adjacent(other) {
            return Err(CatalogError::NotAdjacent);
        }
        let time_range = TimeRange::new(
            self.time_range.start.min(other.time_range.start),
            self.time_range.end.max(other.time_range.end),
        );
        let geometry = self.geometry.merge(&other.geometry)?;
        Ok(Granule {
            file_record: self.file_record.clone(),
            time_range,
            geometry,
            primary_index_name: self.primary_index_name.clone(),
            primary_index: self.primary_index.merge(&other.primary_index),
            secondary_index_name: self.secondary_index_name.clone(),
            secondary_index: match (self.secondary_index, other.secondary_index) {
                (Some(a), Some(b)) => Some(a.merge(&b)),
                _ => None,
            },
        })
    }
}

/// Merges a sequence of granules that are already sorted by their primary
/// index, combining each run of mutually-adjacent granules into one.
pub fn merge_granules(granules: Vec<Granule>) -> CatalogResult<Vec<Granule>> {
    let mut merged: Vec<Granule> = Vec::with_capacity(granules.len());
    for granule in granules {
        match merged.last() {
            Some(prev) if prev.is_adjacent(&granule) => {
                let combined = prev.merge(&granule)?;
                *merged.last_mut().unwrap() = combined;
            }
            _ => merged.push(granule),
        }
    }
    Ok(merged)
}

/// Splits an `m x n` indexed dataset into granules along `partitions`
/// evenly-sized blocks of the primary axis, each `resolution` elements wide
/// along the secondary axis. `build_geometry` receives the primary and
/// secondary index ranges for one block and must return the footprint.
pub fn get_granules_from_dataset(
    file_record: FileRecord,
    time_range: TimeRange,
    m: usize,
    n: usize,
    partitions: usize,
    resolution: usize,
    primary_index_name: &str,
    secondary_index_name: &str,
    mut build_geometry: impl FnMut(IndexRange, IndexRange) -> CatalogResult<Geometry>,
) -> CatalogResult<Vec<Granule>> {
    if partitions == 0 || resolution == 0 {
        return Err(CatalogError::MissingInformation(
            "partitions and resolution must be non-zero".into(),
        ));
    }
    let chunk = m.div_ceil(partitions);
    let mut granules = Vec::new();
    let mut primary_start = 0usize;
    while primary_start < m {
        let primary_end = (primary_start + chunk).min(m);
        let primary_range = IndexRange::new(primary_start as i64, primary_end as i64);

        let mut secondary_start = 0usize;
        while secondary_start < n {
            let secondary_end = (secondary_start + resolution).min(n);
            let secondary_range = IndexRange::new(secondary_start as i64, secondary_end as i64);
            let geometry = build_geometry(primary_range, secondary_range)?;
            let granule = Granule::new(file_record.clone(), time_range, geometry)
                .with_primary_index(primary_index_name, primary_range)
                .with_secondary_index(secondary_index_name, secondary_range);
            granules.push(granule);
            secondary_start = secondary_end;
        }
        primary_start = primary_end;
    }
    Ok(granules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(lo: f64) -> Geometry {
        Geometry::LonLatRect { lon_min: lo, lat_min: 0.0, lon_max: lo + 1.0, lat_max: 1.0 }
    }

    fn granule_with_range(start: i64, end: i64) -> Granule {
        let fr = FileRecord::new("test-product", "file.nc");
        Granule::new(fr, TimeRange::instant(chrono::Utc::now()), rect(start as f64))
            .with_primary_index("along_track", IndexRange::new(start, end))
    }

    #[test]
    fn adjacent_ranges_merge() {
        let a = granule_with_range(0, 10);
        let b = granule_with_range(10, 20);
        assert!(a.is_adjacent(&b));
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.primary_index, IndexRange::new(0, 20));
    }

    #[test]
    fn non_adjacent_ranges_refuse_merge() {
        let a = granule_with_range(0, 10);
        let b = granule_with_range(20, 30);
        assert!(!a.is_adjacent(&b));
        assert!(matches!(a.merge(&b), Err(CatalogError::NotAdjacent)));
    }

    #[test]
    fn overlapping_ranges_that_do_not_touch_at_either_boundary_are_adjacent() {
        let a = IndexRange::new(0, 100);
        let b = IndexRange::new(30, 70);
        assert!(a.is_adjacent(&b));
        assert!(b.is_adjacent(&a));
    }

    #[test]
    fn merge_uses_min_start_max_end_for_time() {
        use chrono::{TimeZone, Utc};
        let mut a = granule_with_range(0, 10);
        let mut b = granule_with_range(10, 20);
        a.time_range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
        );
        b.time_range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap(),
        );
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.time_range.start, a.time_range.start);
        assert_eq!(merged.time_range.end, b.time_range.end);
    }

    #[test]
    fn merge_granules_collapses_consecutive_runs() {
        let granules = vec![granule_with_range(0, 10), granule_with_range(10, 20), granule_with_range(40, 50)];
        let merged = merge_granules(granules).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].primary_index, IndexRange::new(0, 20));
    }
}
