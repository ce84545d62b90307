//! The registry hierarchy: a [`Catalog`] that also answers provider
//! queries, optionally delegating to a parent and optionally owning a
//! storage root for downloaded files.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{instrument, warn};

use swathcat_catalog::{Catalog, GranuleSource};
use swathcat_core::error::{CatalogError, CatalogResult};
use swathcat_core::{Geometry, TimeRange};
use swathcat_granule::{FileRecord, Granule};
use swathcat_index::Index;
use swathcat_provider::LookupProvider;

/// Traversal guard against an accidentally-cyclic parent chain. The parent
/// chain is built bottom-up through `Arc`, which cannot itself form a cycle
/// without interior `Weak`/`RefCell` trickery this crate does not use, but
/// every recursive walk still honors this cap defensively.
const MAX_PARENT_DEPTH: usize = 64;

/// Name of the hidden sub-directory a [`Registry::data_dir`] places its
/// SQLite catalog in, inside its storage root.
const CATALOG_DIR_NAME: &str = ".swathcat_catalog";

/// A layered catalog/provider. Registries that are not data directories
/// have no storage root of their own and exist purely to compose with a
/// parent (e.g. a read-only reference index layered under a writable local
/// one).
pub struct Registry {
    name: String,
    db_path: PathBuf,
    transparent: bool,
    parent: Option<Arc<Registry>>,
    storage_root: Option<PathBuf>,
    catalog: Mutex<Catalog>,
}

impl Registry {
    /// A plain registry backed by a SQLite catalog at `db_path`, with no
    /// storage root of its own.
    pub fn new(
        name: impl Into<String>,
        db_path: impl Into<PathBuf>,
        transparent: bool,
        parent: Option<Arc<Registry>>,
    ) -> CatalogResult<Arc<Registry>> {
        let db_path = db_path.into();
        check_depth(parent.as_deref())?;
        Ok(Arc::new(Registry {
            name: name.into(),
            catalog: Mutex::new(Catalog::with_database(&db_path)?),
            db_path,
            transparent,
            parent,
            storage_root: None,
        }))
    }

    /// A registry whose `storage_root` is an actual directory files are
    /// downloaded into. Its catalog lives in a hidden `.swathcat_catalog`
    /// sub-directory of `storage_root`, which must already exist.
    pub fn data_dir(
        name: impl Into<String>,
        storage_root: impl Into<PathBuf>,
        transparent: bool,
        parent: Option<Arc<Registry>>,
    ) -> CatalogResult<Arc<Registry>> {
        let storage_root = storage_root.into();
        if !storage_root.is_dir() {
            return Err(CatalogError::ConfigError(format!(
                "data dir storage root {} does not exist",
                storage_root.display()
            )));
        }
        check_depth(parent.as_deref())?;

        let catalog_dir = storage_root.join(CATALOG_DIR_NAME);
        std::fs::create_dir_all(&catalog_dir)?;
        let db_path = catalog_dir.join("index.sqlite");

        Ok(Arc::new(Registry {
            name: name.into(),
            catalog: Mutex::new(Catalog::with_database(&db_path)?),
            db_path,
            transparent,
            parent,
            storage_root: Some(storage_root),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_data_dir(&self) -> bool {
        self.storage_root.is_some()
    }

    pub fn storage_root(&self) -> Option<&Path> {
        self.storage_root.as_deref()
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn parent(&self) -> Option<&Arc<Registry>> {
        self.parent.as_ref()
    }

    /// True if `product_name` has local coverage in this registry or,
    /// transparently, in an ancestor.
    pub fn provides(&self, product_name: &str) -> bool {
        self.has_local_index(product_name)
            || (self.transparent && self.parent.as_ref().is_some_and(|p| p.provides(product_name)))
    }

    fn has_local_index(&self, product_name: &str) -> bool {
        let catalog = self.catalog.lock().expect("registry catalog mutex poisoned");
        catalog.product_names().any(|n| n == product_name)
    }

    /// Collects files for `product_name`: parent results first (if
    /// transparent), unioned with this registry's own index, deduplicated
    /// by local path (files with no local path are deduplicated by
    /// filename instead).
    #[instrument(skip(self), fields(registry = %self.name))]
    pub fn find_files(
        &self,
        product_name: &str,
        time_range: Option<&TimeRange>,
        roi: Option<&Geometry>,
    ) -> CatalogResult<Vec<FileRecord>> {
        let mut records = Vec::new();
        if self.transparent {
            if let Some(parent) = &self.parent {
                records.extend(parent.find_files(product_name, time_range, roi)?);
            }
        }

        let local_index = self.catalog.lock().expect("registry catalog mutex poisoned").get_index(
            product_name,
            time_range,
        )?;
        for g in local_index.find(time_range, roi) {
            records.push(g.file_record.clone());
        }

        let mut seen = std::collections::HashSet::new();
        records.retain(|r| {
            let key = r.local_path.as_ref().map(|p| p.to_string_lossy().into_owned()).unwrap_or_else(|| r.filename.clone());
            seen.insert(key)
        });
        Ok(records)
    }

    /// Registries are lookup-only providers: acquiring data is the
    /// responsibility of whatever `Provider` a `Product` finds, never of a
    /// registry. Always returns `record` unchanged.
    pub fn download(&self, record: &FileRecord) -> FileRecord {
        record.clone()
    }

    /// Indexes `record` into this registry's catalog, then propagates to
    /// the parent if this registry is transparent.
    pub fn add(&self, record: &FileRecord, source: &dyn GranuleSource) -> CatalogResult<()> {
        self.catalog.lock().expect("registry catalog mutex poisoned").add(record, source)?;
        if self.transparent {
            if let Some(parent) = &self.parent {
                parent.add(record, source)?;
            }
        }
        Ok(())
    }

    /// Inserts pre-computed granules directly, used when a record's
    /// coverage has already been extracted (e.g. by a provider download)
    /// and does not need to be recomputed.
    pub fn add_granules(&self, product_name: &str, granules: &[Granule]) -> CatalogResult<()> {
        struct Precomputed<'a> {
            product_name: &'a str,
            granules: Vec<Granule>,
        }
        impl GranuleSource for Precomputed<'_> {
            fn product_name(&self) -> &str {
                self.product_name
            }
            fn matches(&self, _record: &FileRecord) -> bool {
                true
            }
            fn get_granules(&self, _record: &FileRecord) -> CatalogResult<Vec<Granule>> {
                Ok(self.granules.clone())
            }
        }
        if granules.is_empty() {
            return Ok(());
        }
        let source = Precomputed { product_name, granules: granules.to_vec() };
        self.add(&granules[0].file_record.clone(), &source)
    }

    /// Resolves the local path for `record`: if this registry's index has
    /// an entry whose path still exists on disk, returns it; if it has an
    /// entry whose path is stale, warns and falls back to the parent; if
    /// it has no entry at all, silently falls back to the parent.
    pub fn get_local_path(&self, record: &FileRecord) -> Option<PathBuf> {
        let local_index = self
            .catalog
            .lock()
            .expect("registry catalog mutex poisoned")
            .get_index(&record.product_name, None)
            .ok()?;

        let found = local_index
            .rows()
            .iter()
            .find(|g| g.file_record.filename == record.filename)
            .and_then(|g| g.file_record.local_path.clone());

        match found {
            Some(path) if path.exists() => Some(path),
            Some(stale) => {
                warn!(registry = %self.name, path = %stale.display(), "indexed local path no longer exists, falling back to parent");
                self.parent.as_ref().and_then(|p| p.get_local_path(record))
            }
            None => self.parent.as_ref().and_then(|p| p.get_local_path(record)),
        }
    }

    /// Walks root-ward for the nearest registry that owns a storage root
    /// (a data dir). Plain registries delegate to their parent; a data dir
    /// returns its own storage root.
    pub fn get_active_data_dir(&self) -> Option<PathBuf> {
        if let Some(root) = &self.storage_root {
            return Some(root.clone());
        }
        self.parent.as_ref().and_then(|p| p.get_active_data_dir())
    }

    /// Combines this registry's index for `product_name` with its parent's
    /// (recursively), regardless of `transparent` — reading is always
    /// allowed to see the whole chain's coverage via this explicit call.
    pub fn get_index(&self, product_name: &str, time_range: Option<&TimeRange>) -> CatalogResult<Index> {
        let mut index = self.catalog.lock().expect("registry catalog mutex poisoned").get_index(
            product_name,
            time_range,
        )?;
        if let Some(parent) = &self.parent {
            let parent_index = parent.get_index(product_name, time_range)?;
            index.merge_in_place(&parent_index);
        }
        Ok(index)
    }
}

impl LookupProvider for Registry {
    fn provides(&self, product_name: &str) -> bool {
        Registry::provides(self, product_name)
    }

    fn find_files(
        &self,
        product_name: &str,
        time_range: Option<&TimeRange>,
        roi: Option<&Geometry>,
    ) -> CatalogResult<Vec<FileRecord>> {
        Registry::find_files(self, product_name, time_range, roi)
    }
}

fn check_depth(parent: Option<&Registry>) -> CatalogResult<()> {
    let mut depth = 0;
    let mut current = parent;
    while let Some(r) = current {
        depth += 1;
        if depth > MAX_PARENT_DEPTH {
            return Err(CatalogError::ConfigError(format!(
                "registry parent chain exceeds the maximum depth of {MAX_PARENT_DEPTH}"
            )));
        }
        current = r.parent.as_deref();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct StubSource {
        name: &'static str,
    }

    impl GranuleSource for StubSource {
        fn product_name(&self) -> &str {
            self.name
        }
        fn matches(&self, _record: &FileRecord) -> bool {
            true
        }
        fn get_granules(&self, record: &FileRecord) -> CatalogResult<Vec<Granule>> {
            Ok(vec![Granule::new(
                record.clone(),
                TimeRange::instant(Utc::now()),
                Geometry::Point { lon: 0.0, lat: 0.0 },
            )])
        }
    }

    #[test]
    fn child_transparent_registry_sees_parent_records() {
        let parent_dir = tempfile::tempdir().unwrap();
        let child_dir = tempfile::tempdir().unwrap();
        let parent = Registry::data_dir("parent", parent_dir.path(), false, None).unwrap();

        let r1 = FileRecord::new("test.product", "r1.dat").with_local_path(parent_dir.path().join("r1.dat"));
        std::fs::write(r1.local_path.clone().unwrap(), b"x").unwrap();
        parent.add(&r1, &StubSource { name: "test.product" }).unwrap();

        let child = Registry::data_dir("child", child_dir.path(), true, Some(parent)).unwrap();
        let r2 = FileRecord::new("test.product", "r2.dat").with_local_path(child_dir.path().join("r2.dat"));
        std::fs::write(r2.local_path.clone().unwrap(), b"x").unwrap();
        child.add(&r2, &StubSource { name: "test.product" }).unwrap();

        let found = child.find_files("test.product", None, None).unwrap();
        let filenames: Vec<&str> = found.iter().map(|r| r.filename.as_str()).collect();
        assert!(filenames.contains(&"r1.dat"));
        assert!(filenames.contains(&"r2.dat"));
    }

    #[test]
    fn get_local_path_resolves_via_parent() {
        let parent_dir = tempfile::tempdir().unwrap();
        let child_dir = tempfile::tempdir().unwrap();
        let parent = Registry::data_dir("parent", parent_dir.path(), false, None).unwrap();

        let r1 = FileRecord::new("test.product", "r1.dat").with_local_path(parent_dir.path().join("r1.dat"));
        std::fs::write(r1.local_path.clone().unwrap(), b"x").unwrap();
        parent.add(&r1, &StubSource { name: "test.product" }).unwrap();

        let child = Registry::data_dir("child", child_dir.path(), true, Some(parent)).unwrap();
        let resolved = child.get_local_path(&r1);
        assert_eq!(resolved, r1.local_path);
    }

    #[test]
    fn registry_download_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::data_dir("r", dir.path(), false, None).unwrap();
        let record = FileRecord::new("test.product", "a.dat");
        let returned = registry.download(&record);
        assert_eq!(returned, record);
    }

    #[test]
    fn get_active_data_dir_delegates_through_plain_registries() {
        let parent_dir = tempfile::tempdir().unwrap();
        let parent = Registry::data_dir("parent", parent_dir.path(), false, None).unwrap();

        let plain_db = tempfile::NamedTempFile::new().unwrap();
        let plain = Registry::new("plain", plain_db.path(), true, Some(parent.clone())).unwrap();

        assert_eq!(plain.get_active_data_dir(), Some(parent_dir.path().to_path_buf()));
    }
}
