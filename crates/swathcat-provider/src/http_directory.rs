//! A provider that lists an HTTP(S) directory index (an Apache/nginx
//! autoindex page) and downloads files over plain blocking HTTP, showing
//! that a provider can perform real network I/O without an async runtime.

use std::fs::File;
use std::io::copy;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use tracing::instrument;

use swathcat_core::error::{CatalogError, CatalogResult};
use swathcat_core::{Geometry, TimeRange};
use swathcat_granule::FileRecord;

use crate::provider::Provider;

/// Lists and downloads files from a directory listing served by a static
/// HTTP file server. Only the minimal `href="..."` anchor extraction
/// needed for a directory-index page is implemented; real file-format
/// parsing is out of scope.
pub struct HttpDirectoryProvider {
    id: String,
    product_name: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpDirectoryProvider {
    pub fn new(id: impl Into<String>, product_name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(StdDuration::from_secs(60))
            .build()
            .expect("building a blocking HTTP client with static config cannot fail");
        HttpDirectoryProvider { id: id.into(), product_name: product_name.into(), base_url: base_url.into(), client }
    }

    fn list_href_targets(&self, html: &str) -> Vec<String> {
        let mut targets = Vec::new();
        let mut rest = html;
        while let Some(start) = rest.find("href=\"") {
            rest = &rest[start + "href=\"".len()..];
            if let Some(end) = rest.find('"') {
                let href = &rest[..end];
                if !href.starts_with('?') && !href.starts_with('/') && href != "../" {
                    targets.push(href.to_string());
                }
                rest = &rest[end..];
            } else {
                break;
            }
        }
        targets
    }
}

impl Provider for HttpDirectoryProvider {
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
        let response = self
            .client
            .get(&self.base_url)
            .send()
            .map_err(|e| CatalogError::CommunicationError(e.to_string()))?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(CatalogError::AuthError(format!(
                "{} rejected the request with status {}",
                self.base_url,
                response.status()
            )));
        }
        let body = response
            .error_for_status()
            .map_err(|e| CatalogError::CommunicationError(e.to_string()))?
            .text()
            .map_err(|e| CatalogError::CommunicationError(e.to_string()))?;

        let records = self
            .list_href_targets(&body)
            .into_iter()
            .map(|filename| {
                let remote_path = format!("{}/{}", self.base_url.trim_end_matches('/'), filename);
                FileRecord::new(product_name, filename)
                    .with_remote_path(remote_path)
                    .with_provider_id(&self.id)
            })
            .collect();
        Ok(records)
    }

    #[instrument(skip(self, destination), fields(provider = %self.id, file = %record.filename))]
    fn download(&self, record: &FileRecord, destination: Option<&Path>) -> CatalogResult<FileRecord> {
        let remote = record.remote_path.as_ref().ok_or(CatalogError::NoRemoteSource)?;
        let mut response = self
            .client
            .get(remote)
            .send()
            .map_err(|e| CatalogError::CommunicationError(e.to_string()))?
            .error_for_status()
            .map_err(|e| CatalogError::CommunicationError(e.to_string()))?;

        let dest_dir: PathBuf = destination.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
        std::fs::create_dir_all(&dest_dir)?;
        let dest_path = dest_dir.join(&record.filename);
        let mut file = File::create(&dest_path)?;
        copy(&mut response, &mut file).map_err(|e| CatalogError::CommunicationError(e.to_string()))?;

        Ok(record.clone().with_local_path(dest_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_anchors_ignoring_parent_link() {
        let provider = HttpDirectoryProvider::new("http", "test.http.v1", "https://example.test/data");
        let html = r#"
            <a href="../">Parent</a>
            <a href="file_001.dat">file_001.dat</a>
            <a href="file_002.dat?v=2">file_002.dat?v=2</a>
        "#;
        let targets = provider.list_href_targets(html);
        assert_eq!(targets, vec!["file_001.dat", "file_002.dat?v=2"]);
    }
}
