//! The in-memory, per-product table of granules.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{instrument, warn};

use swathcat_core::error::CatalogResult;
use swathcat_core::{Geometry, TimeRange};
use swathcat_granule::{FileRecord, Granule};

/// Deduplication/ordering key for one row: `(filename, primary_start,
/// secondary_start)`.
pub type RowKey = (String, i64, i64);

fn row_key(g: &Granule) -> RowKey {
    (
        g.file_record.filename.clone(),
        g.primary_index.start,
        g.secondary_index.map(|r| r.start).unwrap_or(-1),
    )
}

/// An in-memory table of granules for a single product, sorted by
/// `start_time` and deduplicated by [`RowKey`].
#[derive(Debug, Clone)]
pub struct Index {
    product_name: String,
    rows: Vec<Granule>,
}

impl Index {
    /// An empty index for `product_name`.
    pub fn empty(product_name: impl Into<String>) -> Self {
        Index { product_name: product_name.into(), rows: Vec::new() }
    }

    /// Builds an index by invoking `get_granules` on each file, optionally
    /// in parallel across a `rayon` pool of `n_workers` threads (falling
    /// back to the global pool, and to sequential execution if
    /// `n_workers == Some(1)`). A file whose extraction fails is logged and
    /// skipped rather than aborting the whole build.
    #[instrument(skip(files, get_granules), fields(product = %product_name.as_ref()))]
    pub fn build(
        product_name: impl AsRef<str>,
        files: &[FileRecord],
        n_workers: Option<usize>,
        get_granules: impl Fn(&FileRecord) -> CatalogResult<Vec<Granule>> + Sync,
    ) -> CatalogResult<Index> {
        let extract = |file: &FileRecord| match get_granules(file) {
            Ok(granules) => granules,
            Err(err) => {
                warn!(file = %file.filename, error = %err, "skipping file during index build");
                Vec::new()
            }
        };

        let rows: Vec<Granule> = match n_workers {
            Some(1) => files.iter().flat_map(extract).collect(),
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| swathcat_core::error::CatalogError::StorageError(e.to_string()))?;
                pool.install(|| files.par_iter().flat_map(extract).collect())
            }
            None => files.par_iter().flat_map(extract).collect(),
        };

        let mut index = Index::empty(product_name.as_ref());
        index.insert_all(rows);
        Ok(index)
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Granule] {
        &self.rows
    }

    /// Inserts `granule`, overwriting any existing row with the same key
    /// (INSERT OR IGNORE semantics are applied one level up, at the
    /// persistence layer; in memory, a later write is allowed to replace an
    /// earlier one with the same key since both describe the same extent).
    pub fn insert(&mut self, granule: Granule) {
        let key = row_key(&granule);
        match self.rows.binary_search_by(|r| r.time_range.start.cmp(&granule.time_range.start)) {
            Ok(pos) | Err(pos) => {
                if let Some(existing) = self.rows.iter().position(|r| row_key(r) == key) {
                    self.rows[existing] = granule;
                } else {
                    self.rows.insert(pos, granule);
                }
            }
        }
    }

    fn insert_all(&mut self, granules: Vec<Granule>) {
        let mut seen: BTreeMap<RowKey, Granule> = BTreeMap::new();
        for g in self.rows.drain(..).chain(granules) {
            seen.insert(row_key(&g), g);
        }
        let mut rows: Vec<Granule> = seen.into_values().collect();
        rows.sort_by(|a, b| {
            a.time_range.start.cmp(&b.time_range.start).then_with(|| a.file_record.filename.cmp(&b.file_record.filename))
        });
        self.rows = rows;
    }

    /// Returns all granules whose time range overlaps `time_range` (if
    /// given) and whose geometry intersects `roi` (if given). With both
    /// `None`, returns every row in the index's own order.
    pub fn find(&self, time_range: Option<&TimeRange>, roi: Option<&Geometry>) -> Vec<&Granule> {
        self.rows
            .iter()
            .filter(|g| time_range.map_or(true, |tr| tr.covers(&g.time_range)))
            .filter(|g| roi.map_or(true, |roi| g.geometry.intersects(roi)))
            .collect()
    }

    /// The envelope `(min(start_time), max(end_time))` across all rows, or
    /// `None` if the index is empty.
    pub fn time_range(&self) -> Option<TimeRange> {
        let start = self.rows.iter().map(|g| g.time_range.start).min()?;
        let end = self.rows.iter().map(|g| g.time_range.end).max()?;
        Some(TimeRange::new(start, end))
    }

    /// Combines two indices for the same product: concatenate, dedup by
    /// key (later wins), sort by `start_time`.
    pub fn merge(&self, other: &Index) -> CatalogResult<Index> {
        debug_assert_eq!(self.product_name, other.product_name, "merging indices for different products");
        let mut combined = Index::empty(self.product_name.clone());
        combined.insert_all(self.rows.iter().chain(other.rows.iter()).cloned().collect());
        Ok(combined)
    }

    /// In-place form of [`Index::merge`].
    pub fn merge_in_place(&mut self, other: &Index) {
        let incoming = other.rows.clone();
        self.insert_all(incoming);
    }
}

impl std::ops::Add<&Index> for Index {
    type Output = Index;
    fn add(self, other: &Index) -> Index {
        self.merge(other).expect("adding indices for different products")
    }
}

impl std::ops::AddAssign<&Index> for Index {
    fn add_assign(&mut self, other: &Index) {
        self.merge_in_place(other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn granule(filename: &str, start_hour: u32) -> Granule {
        let fr = FileRecord::new("test.product", filename);
        let start = Utc.with_ymd_and_hms(2020, 1, 1, start_hour, 0, 0).unwrap();
        let end = start + chrono::Duration::hours(1);
        Granule::new(fr, TimeRange::new(start, end), Geometry::Point { lon: 0.0, lat: 0.0 })
    }

    #[test]
    fn find_with_no_filters_returns_all_rows_in_order() {
        let mut index = Index::empty("test.product");
        index.insert(granule("c.nc", 2));
        index.insert(granule("a.nc", 0));
        index.insert(granule("b.nc", 1));
        let found = index.find(None, None);
        assert_eq!(found.len(), 3);
        assert!(found[0].time_range.start <= found[1].time_range.start);
        assert!(found[1].time_range.start <= found[2].time_range.start);
    }

    #[test]
    fn insert_deduplicates_by_key() {
        let mut index = Index::empty("test.product");
        index.insert(granule("a.nc", 0));
        index.insert(granule("a.nc", 0));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn merge_concatenates_and_dedups() {
        let mut a = Index::empty("test.product");
        a.insert(granule("a.nc", 0));
        let mut b = Index::empty("test.product");
        b.insert(granule("a.nc", 0));
        b.insert(granule("b.nc", 1));
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn time_range_is_envelope_of_rows() {
        let mut index = Index::empty("test.product");
        index.insert(granule("a.nc", 0));
        index.insert(granule("b.nc", 5));
        let tr = index.time_range().unwrap();
        assert_eq!(tr.start, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(tr.end, Utc.with_ymd_and_hms(2020, 1, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn empty_index_has_no_time_range() {
        let index = Index::empty("test.product");
        assert!(index.time_range().is_none());
    }

    #[test]
    fn find_filters_by_time_range() {
        let mut index = Index::empty("test.product");
        index.insert(granule("a.nc", 0));
        index.insert(granule("b.nc", 10));
        let query = TimeRange::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 1, 0, 59).unwrap(),
        );
        let found = index.find(Some(&query), None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_record.filename, "a.nc");
    }

    #[test]
    fn find_filters_by_roi() {
        let mut index = Index::empty("test.product");
        let fr = FileRecord::new("test.product", "a.nc");
        let g = Granule::new(
            fr,
            TimeRange::instant(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            Geometry::LonLatRect { lon_min: 0.0, lat_min: -5.0, lon_max: 10.0, lat_max: 5.0 },
        );
        index.insert(g);
        let roi = Geometry::LonLatRect { lon_min: 20.0, lat_min: -5.0, lon_max: 30.0, lat_max: 5.0 };
        assert!(index.find(None, Some(&roi)).is_empty());
    }
}
