//! The product contract: filename matching, coverage extraction, dataset
//! opening, and granule decomposition.

use std::any::Any;
use std::sync::Arc;

use tracing::instrument;

use swathcat_catalog::GranuleSource;
use swathcat_core::error::CatalogResult;
use swathcat_core::{Geometry, TimeRange};
use swathcat_granule::{FileRecord, Granule};
use swathcat_provider::Provider;
use swathcat_registry::Registry;

/// An opened data file. File-format reading is out of scope for this
/// crate; a `Dataset` is an opaque handle a product implementation can
/// downcast back to its own concrete reader type.
pub type Dataset = Box<dyn Any + Send>;

/// A named class of data files sharing filename conventions, coverage
/// semantics, and a reader.
pub trait Product: Send + Sync {
    /// Globally unique identifier of the form `domain.family.instance`.
    fn name(&self) -> &str;

    /// True if `record`'s filename matches this product's convention.
    fn matches(&self, record: &FileRecord) -> bool;

    /// Extracts temporal coverage, preferring filename parsing; may open
    /// the file only when that is insufficient.
    fn get_temporal_coverage(&self, record: &FileRecord) -> CatalogResult<TimeRange>;

    /// Extracts spatial coverage.
    fn get_spatial_coverage(&self, record: &FileRecord) -> CatalogResult<Geometry>;

    /// Opens `record` as a dataset.
    fn open(&self, record: &FileRecord) -> CatalogResult<Dataset>;

    /// True for products whose files decompose into more than one granule
    /// (e.g. a swath split along-track). The default single-granule
    /// behavior of [`Product::get_granules`] is correct for every other
    /// product.
    fn is_granule_product(&self) -> bool {
        false
    }

    /// Decomposes `record` into one or more granules. The default
    /// implementation returns a single granule covering the whole file;
    /// granule products override this.
    fn get_granules(&self, record: &FileRecord) -> CatalogResult<Vec<Granule>> {
        let time_range = self.get_temporal_coverage(record)?;
        let geometry = self.get_spatial_coverage(record)?;
        Ok(vec![Granule::new(record.clone(), time_range, geometry)])
    }

    /// Opens the dataset restricted to one granule's slice. The default
    /// delegates to [`Product::open`], which is correct for non-granule
    /// products and for granule products whose granules span the whole
    /// file along every other dimension.
    fn open_granule(&self, granule: &Granule) -> CatalogResult<Dataset> {
        self.open(&granule.file_record)
    }

    /// Finds the first provider in `providers` that can supply this
    /// product, mirroring how the configured provider set is scanned.
    fn find_provider(&self, providers: &[Arc<dyn Provider>]) -> Option<Arc<dyn Provider>> {
        providers.iter().find(|p| p.provides(self.name())).cloned()
    }
}

/// Adapts any `Product` into the narrower [`GranuleSource`] contract the
/// catalog layer depends on, so a concrete product can be handed directly
/// to `Catalog`/`Registry` methods.
pub struct ProductGranuleSource<'a>(pub &'a dyn Product);

impl GranuleSource for ProductGranuleSource<'_> {
    fn product_name(&self) -> &str {
        self.0.name()
    }

    fn matches(&self, record: &FileRecord) -> bool {
        self.0.matches(record)
    }

    fn get_granules(&self, record: &FileRecord) -> CatalogResult<Vec<Granule>> {
        self.0.get_granules(record)
    }
}

/// Downloads every file `provider` can find for this product within
/// `time_range`/`roi`, returning the materialized records. Used by
/// [`get`] for the part of a query a registry could not satisfy locally.
#[instrument(skip(product, provider), fields(product = %product.name()))]
pub fn download(
    product: &dyn Product,
    provider: &dyn Provider,
    time_range: Option<&TimeRange>,
    roi: Option<&Geometry>,
) -> CatalogResult<Vec<FileRecord>> {
    let found = provider.find_files(product.name(), time_range, roi)?;
    found.into_iter().map(|rec| rec.download(provider, None)).collect()
}

/// Implements `spec.md` §4.11's download orchestration:
///
/// 1. Ask the active registry for local hits.
/// 2. Records the registry returned are already local (or are the
///    registry's own lookup-only stand-in for local data) and are returned
///    as-is.
/// 3. For coverage the registry could not satisfy, consult `provider`,
///    download the missing files, and register the result in the nearest
///    data dir in the registry's parent chain, which propagates the
///    addition up any transparent ancestors.
#[instrument(skip(product, registry, provider), fields(product = %product.name()))]
pub fn get(
    product: &dyn Product,
    registry: &Registry,
    provider: Option<&dyn Provider>,
    time_range: Option<&TimeRange>,
    roi: Option<&Geometry>,
) -> CatalogResult<Vec<FileRecord>> {
    let mut local = registry.find_files(product.name(), time_range, roi)?;

    let Some(provider) = provider else {
        return Ok(local);
    };

    let remote = provider.find_files(product.name(), time_range, roi)?;
    let already_have: std::collections::HashSet<&str> = local.iter().map(|r| r.filename.as_str()).collect();
    let missing: Vec<FileRecord> = remote.into_iter().filter(|r| !already_have.contains(r.filename.as_str())).collect();

    if missing.is_empty() {
        return Ok(local);
    }

    let data_dir_path = registry.get_active_data_dir();
    let mut downloaded = Vec::with_capacity(missing.len());
    let source = ProductGranuleSource(product);
    for record in missing {
        let materialized = record.download(provider, data_dir_path.as_deref())?;
        registry.add(&materialized, &source)?;
        downloaded.push(materialized);
    }

    local.extend(downloaded);
    Ok(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct StubProduct;

    impl Product for StubProduct {
        fn name(&self) -> &str {
            "test.product"
        }
        fn matches(&self, record: &FileRecord) -> bool {
            record.filename.ends_with(".dat")
        }
        fn get_temporal_coverage(&self, _record: &FileRecord) -> CatalogResult<TimeRange> {
            Ok(TimeRange::instant(Utc::now()))
        }
        fn get_spatial_coverage(&self, _record: &FileRecord) -> CatalogResult<Geometry> {
            Ok(Geometry::Point { lon: 0.0, lat: 0.0 })
        }
        fn open(&self, _record: &FileRecord) -> CatalogResult<Dataset> {
            Ok(Box::new(()))
        }
    }

    struct NullProvider;
    impl Provider for NullProvider {
        fn id(&self) -> &str {
            "null"
        }
        fn provides(&self, product_name: &str) -> bool {
            product_name == "test.product"
        }
        fn find_files(
            &self,
            _product_name: &str,
            _time_range: Option<&TimeRange>,
            _roi: Option<&Geometry>,
        ) -> CatalogResult<Vec<FileRecord>> {
            Ok(Vec::new())
        }
        fn download(&self, record: &FileRecord, _destination: Option<&std::path::Path>) -> CatalogResult<FileRecord> {
            Ok(record.clone())
        }
    }

    #[test]
    fn find_provider_returns_first_match() {
        let product = StubProduct;
        let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(NullProvider)];
        assert!(product.find_provider(&providers).is_some());
    }

    #[test]
    fn get_returns_local_hits_when_registry_satisfies_query() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::data_dir("r", dir.path(), false, None).unwrap();
        let product = StubProduct;

        let record = FileRecord::new("test.product", "a.dat").with_local_path(dir.path().join("a.dat"));
        std::fs::write(record.local_path.clone().unwrap(), b"x").unwrap();
        let source = ProductGranuleSource(&product);
        registry.add(&record, &source).unwrap();

        let found = get(&product, &registry, None, None, None).unwrap();
        assert_eq!(found.len(), 1);
    }
}
