//! Identifies a single file, locally and/or on a remote data source.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use swathcat_core::error::{CatalogError, CatalogResult};

/// A reference to one file, tracked independently of whether it has been
/// downloaded yet.
///
/// `local_path` and `remote_path` are both optional: a file that has only
/// been discovered on a provider has a `remote_path` and no `local_path`
/// until it is downloaded, while a file found by scanning an existing data
/// directory has a `local_path` and no known remote origin. `provider_id`
/// names the provider that found `remote_path`, when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    pub product_name: String,
    pub local_path: Option<PathBuf>,
    pub remote_path: Option<String>,
    pub provider_id: Option<String>,
}

impl FileRecord {
    pub fn new(product_name: impl Into<String>, filename: impl Into<String>) -> Self {
        FileRecord {
            filename: filename.into(),
            product_name: product_name.into(),
            local_path: None,
            remote_path: None,
            provider_id: None,
        }
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_remote_path(mut self, path: impl Into<String>) -> Self {
        self.remote_path = Some(path.into());
        self
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    /// Builds a record from a local file already on disk, using the file
    /// name portion of `path` as [`FileRecord::filename`].
    pub fn from_local_path(product_name: impl Into<String>, path: &Path) -> Self {
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        FileRecord::new(product_name, filename).with_local_path(path)
    }

    pub fn is_local(&self) -> bool {
        self.local_path.as_ref().is_some_and(|p| p.exists())
    }

    /// Materializes this record locally via `source`, returning a new
    /// record with `local_path` set. Fails with `CatalogError::
    /// NoRemoteSource` if either `remote_path` or `provider_id` is
    /// missing; otherwise delegates to `source`.
    pub fn download<S: RemoteSource + ?Sized>(
        &self,
        source: &S,
        destination: Option<&Path>,
    ) -> CatalogResult<FileRecord> {
        if self.remote_path.is_none() || self.provider_id.is_none() {
            return Err(CatalogError::NoRemoteSource);
        }
        source.download(self, destination)
    }
}

/// A source [`FileRecord::download`] can delegate retrieval to. This trait
/// lives here, rather than on the provider this crate's downstream
/// `swathcat-provider` crate defines, since `swathcat-granule` sits below
/// `swathcat-provider` in the dependency chain; `swathcat-provider`
/// implements it for every `Provider`.
pub trait RemoteSource {
    fn download(&self, record: &FileRecord, destination: Option<&Path>) -> CatalogResult<FileRecord>;
}
