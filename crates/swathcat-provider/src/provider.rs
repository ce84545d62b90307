//! The provider contract: a source products can be discovered in and
//! downloaded from.

use std::path::Path;

use swathcat_core::error::CatalogResult;
use swathcat_core::{Geometry, TimeRange};
use swathcat_granule::{FileRecord, RemoteSource};

/// A source of product files, queried by product name rather than a
/// `Product` reference: providers live in a crate that the product crate
/// depends on, not the other way around, so identity is the only thing a
/// provider needs to know about a product.
pub trait Provider: Send + Sync {
    /// A short, stable identifier for this provider (used by `FileRecord`
    /// to remember where a downloaded file came from).
    fn id(&self) -> &str;

    /// True if this provider can supply files for `product_name`.
    fn provides(&self, product_name: &str) -> bool;

    /// Lists files available for `product_name`, optionally narrowed by
    /// time range and region of interest.
    fn find_files(
        &self,
        product_name: &str,
        time_range: Option<&TimeRange>,
        roi: Option<&Geometry>,
    ) -> CatalogResult<Vec<FileRecord>>;

    /// Materializes `record` locally, optionally at an explicit
    /// `destination` directory, returning a new record with `local_path`
    /// set. Implementations must be idempotent: downloading an
    /// already-local record again is permitted to overwrite but must not
    /// error.
    fn download(&self, record: &FileRecord, destination: Option<&Path>) -> CatalogResult<FileRecord>;
}

/// A narrower, read-only view of [`Provider`] used by [`crate`]-external
/// callers (the registry hierarchy) that only ever look things up and never
/// initiate network I/O through this interface. Every `Provider` can be
/// used as a `LookupProvider` for free.
pub trait LookupProvider: Send + Sync {
    fn provides(&self, product_name: &str) -> bool;

    fn find_files(
        &self,
        product_name: &str,
        time_range: Option<&TimeRange>,
        roi: Option<&Geometry>,
    ) -> CatalogResult<Vec<FileRecord>>;
}

/// Lets `FileRecord::download` delegate to any `Provider`, including a
/// `&dyn Provider` trait object (`?Sized` covers both).
impl<T: Provider + ?Sized> RemoteSource for T {
    fn download(&self, record: &FileRecord, destination: Option<&Path>) -> CatalogResult<FileRecord> {
        Provider::download(self, record, destination)
    }
}

impl<T: Provider> LookupProvider for T {
    fn provides(&self, product_name: &str) -> bool {
        Provider::provides(self, product_name)
    }

    fn find_files(
        &self,
        product_name: &str,
        time_range: Option<&TimeRange>,
        roi: Option<&Geometry>,
    ) -> CatalogResult<Vec<FileRecord>> {
        Provider::find_files(self, product_name, time_range, roi)
    }
}
