//! A filesystem-backed provider used by tests and documentation, mirroring
//! the reference implementation's bundled example provider: files already
//! live in a local directory and "downloading" is a plain copy.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::instrument;

use swathcat_core::error::{CatalogError, CatalogResult};
use swathcat_core::{Geometry, TimeRange};
use swathcat_granule::FileRecord;

use crate::provider::Provider;

/// Serves files out of a single local directory for one product name,
/// matched by filename glob (`*` only — no full regex, since coverage
/// parsing is a product concern, not a provider one).
pub struct ExampleProvider {
    id: String,
    product_name: String,
    root: PathBuf,
    pattern: String,
}

impl ExampleProvider {
    pub fn new(
        id: impl Into<String>,
        product_name: impl Into<String>,
        root: impl Into<PathBuf>,
        pattern: impl Into<String>,
    ) -> Self {
        ExampleProvider {
            id: id.into(),
            product_name: product_name.into(),
            root: root.into(),
            pattern: pattern.into(),
        }
    }

    fn matches_pattern(&self, filename: &str) -> bool {
        match self.pattern.split_once('*') {
            Some((prefix, suffix)) => filename.starts_with(prefix) && filename.ends_with(suffix),
            None => filename == self.pattern,
        }
    }
}

impl Provider for ExampleProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn provides(&self, product_name: &str) -> bool {
        product_name == self.product_name
    }

    #[instrument(skip(self), fields(provider = %self.id))]
    fn find_files(
        &self,
        product_name: &str,
        _time_range: Option<&TimeRange>,
        _roi: Option<&Geometry>,
    ) -> CatalogResult<Vec<FileRecord>> {
        if product_name != self.product_name {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !self.matches_pattern(&filename) {
                continue;
            }
            let record = FileRecord::new(product_name, filename.clone())
                .with_remote_path(entry.path().to_string_lossy().into_owned())
                .with_provider_id(&self.id);
            records.push(record);
        }
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(records)
    }

    #[instrument(skip(self, destination), fields(provider = %self.id, file = %record.filename))]
    fn download(&self, record: &FileRecord, destination: Option<&Path>) -> CatalogResult<FileRecord> {
        let source = record
            .remote_path
            .as_ref()
            .ok_or(CatalogError::NoRemoteSource)?;
        let dest_dir = destination.unwrap_or(&self.root);
        let dest_path = dest_dir.join(&record.filename);
        if Path::new(source) != dest_path {
            fs::copy(source, &dest_path)?;
        }
        Ok(record.clone().with_local_path(dest_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_matching_files_in_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("example_001.dat"), b"payload").unwrap();
        fs::write(dir.path().join("other.txt"), b"ignored").unwrap();

        let provider = ExampleProvider::new("example", "test.example.v1", dir.path(), "example_*.dat");
        let found = provider.find_files("test.example.v1", None, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].filename, "example_001.dat");
    }

    #[test]
    fn download_copies_into_destination() {
        let source_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        fs::write(source_dir.path().join("example_001.dat"), b"payload").unwrap();

        let provider =
            ExampleProvider::new("example", "test.example.v1", source_dir.path(), "example_*.dat");
        let record = &provider.find_files("test.example.v1", None, None).unwrap()[0];
        let downloaded = provider.download(record, Some(dest_dir.path())).unwrap();

        assert!(downloaded.local_path.unwrap().exists());
    }
}
