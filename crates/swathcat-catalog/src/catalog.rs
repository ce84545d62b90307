//! Aggregates one [`Index`] per product, with optional SQLite backing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::instrument;
use walkdir::WalkDir;

use swathcat_core::error::CatalogResult;
use swathcat_core::TimeRange;
use swathcat_granule::{FileRecord, Granule};
use swathcat_index::{Index, IndexDatabase};

/// Something that can recognize its own files and decompose them into
/// granules. Implemented by the product crate's `Product` trait; kept as a
/// narrow local contract here so the catalog layer does not need to depend
/// on the product crate (the product crate depends on the registry, which
/// depends on the catalog — not the other way around).
pub trait GranuleSource {
    fn product_name(&self) -> &str;
    fn matches(&self, record: &FileRecord) -> bool;
    fn get_granules(&self, record: &FileRecord) -> CatalogResult<Vec<Granule>>;
}

/// A mapping `product_name -> Index`, optionally backed by a SQLite file.
pub struct Catalog {
    indices: HashMap<String, Index>,
    db: Option<IndexDatabase>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog { indices: HashMap::new(), db: None }
    }

    /// A catalog whose writes are appended to a SQLite database at
    /// `db_path`.
    pub fn with_database(db_path: impl Into<PathBuf>) -> CatalogResult<Self> {
        Ok(Catalog { indices: HashMap::new(), db: Some(IndexDatabase::open(db_path)?) })
    }

    pub fn has_database(&self) -> bool {
        self.db.is_some()
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db.as_ref().map(|db| db.db_path())
    }

    /// Indexes `record` via `source` and merges the resulting granule(s)
    /// into that product's `Index`. If a database is configured, the delta
    /// is appended immediately.
    #[instrument(skip(self, source), fields(product = %source.product_name()))]
    pub fn add(&mut self, record: &FileRecord, source: &dyn GranuleSource) -> CatalogResult<()> {
        let granules = source.get_granules(record)?;
        let product_name = source.product_name().to_string();

        let mut delta = Index::empty(product_name.clone());
        for g in &granules {
            delta.insert(g.clone());
        }

        self.indices
            .entry(product_name.clone())
            .or_insert_with(|| Index::empty(product_name.clone()))
            .merge_in_place(&delta);

        if let Some(db) = &self.db {
            db.save(&product_name, &granules)?;
        }
        Ok(())
    }

    /// Returns the `Index` for `product_name`, preferring the on-disk copy
    /// when a database is configured (so concurrently-written rows from
    /// other processes are visible), else the in-memory one.
    pub fn get_index(&self, product_name: &str, time_range: Option<&TimeRange>) -> CatalogResult<Index> {
        if let Some(db) = &self.db {
            let rows = db.load(product_name, time_range)?;
            let mut index = Index::empty(product_name);
            for row in rows {
                index.insert(row);
            }
            return Ok(index);
        }
        Ok(self
            .indices
            .get(product_name)
            .cloned()
            .unwrap_or_else(|| Index::empty(product_name)))
    }

    pub fn product_names(&self) -> impl Iterator<Item = &str> {
        self.indices.keys().map(|s| s.as_str())
    }

    /// Recursively scans `root`, partitions matching files by which of
    /// `sources` recognizes them, and builds one `Index` per product.
    #[instrument(skip(root, sources))]
    pub fn from_existing_files(
        root: &Path,
        sources: &[&dyn GranuleSource],
    ) -> CatalogResult<Catalog> {
        let mut files_by_product: HashMap<String, Vec<FileRecord>> = HashMap::new();

        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            for source in sources {
                let record = FileRecord::from_local_path(source.product_name(), entry.path());
                if source.matches(&record) {
                    files_by_product.entry(source.product_name().to_string()).or_default().push(record);
                    break;
                }
            }
        }

        let mut catalog = Catalog::new();
        for source in sources {
            let files = files_by_product.remove(source.product_name()).unwrap_or_default();
            let mut index = Index::empty(source.product_name());
            for file in &files {
                match source.get_granules(file) {
                    Ok(granules) => {
                        for g in granules {
                            index.insert(g);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(file = %file.filename, error = %err, "skipping unreadable file");
                    }
                }
            }
            catalog.indices.insert(source.product_name().to_string(), index);
        }
        Ok(catalog)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new()
    }
}
