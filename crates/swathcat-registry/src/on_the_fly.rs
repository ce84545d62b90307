//! A [`Registry`] data dir whose storage root is a process-lifetime
//! temporary directory: never promoted to a parent, and deleted on
//! cleanup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use swathcat_core::error::CatalogResult;

use crate::registry::Registry;

/// Wraps a [`Registry::data_dir`] rooted in a freshly created temporary
/// directory. `transparent` is always `false`: an on-the-fly directory is
/// opaque, so data added to it is never pushed further up a parent chain,
/// even though it can still read through to its parent for lookups.
pub struct OnTheFlyDataDir {
    registry: Arc<Registry>,
    temp_dir: Option<TempDir>,
}

impl OnTheFlyDataDir {
    pub fn new(name: impl Into<String>, parent: Option<Arc<Registry>>) -> CatalogResult<Self> {
        let temp_dir = TempDir::new()?;
        let registry = Registry::data_dir(name, temp_dir.path(), false, parent)?;
        Ok(OnTheFlyDataDir { registry, temp_dir: Some(temp_dir) })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(|t| t.path())
    }

    /// Deletes the temporary storage root. Idempotent: calling this twice,
    /// or dropping after calling it, is a no-op the second time.
    pub fn cleanup(&mut self) -> CatalogResult<()> {
        if let Some(dir) = self.temp_dir.take() {
            dir.close()?;
        }
        Ok(())
    }

    /// Path the on-the-fly storage root used to live at, for assertions
    /// that it no longer exists after [`OnTheFlyDataDir::cleanup`].
    pub fn storage_path(&self) -> PathBuf {
        self.registry.storage_root().expect("data dir always has a storage root").to_path_buf()
    }
}

impl Drop for OnTheFlyDataDir {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_removes_the_temporary_directory() {
        let mut on_the_fly = OnTheFlyDataDir::new("scratch", None).unwrap();
        let path = on_the_fly.storage_path();
        assert!(path.exists());

        on_the_fly.cleanup().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_also_cleans_up() {
        let path;
        {
            let on_the_fly = OnTheFlyDataDir::new("scratch", None).unwrap();
            path = on_the_fly.storage_path();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
