//! Path helpers for locating test data and scratch directories.

use std::path::PathBuf;

/// Returns the workspace root directory, walking up from this crate's
/// manifest directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns the path to a given crate's `testdata/` directory.
pub fn crate_testdata_dir(crate_name: &str) -> PathBuf {
    workspace_root().join("crates").join(crate_name).join("testdata")
}

/// Searches for a named test data file: `TEST_DATA_DIR` env var first, then
/// each crate's `testdata/`, then the workspace-level `testdata/`.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(dir).join(name));
    }
    let root = workspace_root();
    candidates.extend([
        root.join("crates/swathcat-index/testdata").join(name),
        root.join("crates/swathcat-granule/testdata").join(name),
        root.join("testdata").join(name),
    ]);
    candidates.into_iter().find(|p| p.exists())
}

/// Creates a temporary directory for test output, cleaned up on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("failed to create temporary test directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_root_contains_the_root_manifest() {
        let root = workspace_root();
        assert!(root.join("Cargo.toml").exists(), "expected Cargo.toml in {root:?}");
    }

    #[test]
    fn temp_test_dir_exists() {
        let dir = temp_test_dir();
        assert!(dir.path().exists());
    }
}
