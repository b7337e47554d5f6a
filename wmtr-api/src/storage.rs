//! Image store adapter
//!
//! Persists uploaded meter photographs under the service data folder and
//! hands back the durable URL the rest of the pipeline (and the client)
//! refers to them by. A failed write is fatal for the whole ingestion
//! attempt; there is nothing to recognize or record without the image.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;
use wmtr_common::{Error, Result};

/// Subdirectory of the data folder holding uploaded photographs
const IMAGE_DIR: &str = "meter-images";

/// Filesystem-backed image store producing publicly resolvable URLs
#[derive(Debug, Clone)]
pub struct ImageStore {
    media_root: PathBuf,
    public_base_url: String,
}

impl ImageStore {
    /// `public_base_url` is prefixed onto `/media/...` paths served by the
    /// router's static file layer.
    pub fn new(data_root: PathBuf, public_base_url: String) -> Self {
        Self {
            media_root: data_root.join(IMAGE_DIR),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Persist an uploaded image and return its durable URL.
    ///
    /// Storage keys are `owner/<epoch_millis>-<suffix>-<name>`; the random
    /// suffix keeps same-millisecond uploads of the same file name by one
    /// owner from colliding.
    pub async fn store(&self, owner_id: &str, bytes: &[u8], original_name: &str) -> Result<String> {
        let suffix = Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &suffix[..8],
            sanitize_file_name(original_name)
        );

        let owner_dir = self.media_root.join(owner_id);
        tokio::fs::create_dir_all(&owner_dir)
            .await
            .map_err(|e| Error::Storage(format!("Cannot create image directory: {}", e)))?;

        let path = owner_dir.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::Storage(format!("Cannot write image {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), size = bytes.len(), "Stored meter image");

        let url = format!("{}/media/{}/{}", self.public_base_url, owner_id, file_name);
        info!(owner = %owner_id, url = %url, "Image stored");

        Ok(url)
    }

    /// Directory the router serves as `/media`
    pub fn media_root(&self) -> PathBuf {
        self.media_root.clone()
    }
}

/// Strip path separators and other hostile characters from client-supplied
/// file names before they touch the filesystem.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_strips_path_separators() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("meter 1.jpg"), "meter_1.jpg");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[tokio::test]
    async fn test_store_writes_file_and_builds_url() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), "http://localhost:5780/".into());

        let url = store.store("user-1", b"jpegdata", "meter.jpg").await.unwrap();

        assert!(url.starts_with("http://localhost:5780/media/user-1/"));
        assert!(url.ends_with("-meter.jpg"));

        // The file behind the URL must exist under the media root
        let rel = url.strip_prefix("http://localhost:5780/media/").unwrap();
        assert!(dir.path().join("meter-images").join(rel).exists());
    }

    #[tokio::test]
    async fn test_same_millisecond_same_name_uploads_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), "http://localhost".into());

        // Back to back, no delay: both writes must survive under
        // distinct URLs even within one millisecond
        let a = store.store("u", b"one", "m.jpg").await.unwrap();
        let b = store.store("u", b"two", "m.jpg").await.unwrap();

        assert_ne!(a, b);
        for url in [&a, &b] {
            let rel = url.strip_prefix("http://localhost/media/").unwrap();
            assert!(dir.path().join("meter-images").join(rel).exists());
        }
    }
}
