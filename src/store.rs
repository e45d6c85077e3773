//! File/object store contract consumed by the pipeline.
//!
//! The host owns persistent storage; the pipeline only needs to enumerate
//! paths, fetch bytes, and upload bytes. Stores backed by object storage can
//! additionally expose a bucket + key reference per path so the API fetches
//! the object itself instead of receiving inline bytes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::api::RemoteObject;
use crate::error::StoreError;

/// Extensions the pipeline accepts as image inputs.
const SUPPORTED_IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Whether a path looks like a supported image format.
pub fn is_supported_image(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| SUPPORTED_IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Read/write access to an ordered collection of binary objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Enumerate all paths in the store, in a stable order.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Fetch the raw bytes at a path.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Upload bytes to a path, replacing any existing object.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Bucket + key reference for a path, when the store is backed by
    /// object storage the API can read directly. `None` means bytes must be
    /// fetched and sent inline.
    fn remote_location(&self, _path: &str) -> Option<RemoteObject> {
        None
    }
}

/// Store over a local directory, used for local runs and tests.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::Io {
                path: self.root.display().to_string(),
                source: e,
            })?;

        let mut paths = vec![];
        while let Some(entry) = entries.next_entry().await.map_err(|e| StoreError::Io {
            path: self.root.display().to_string(),
            source: e,
        })? {
            if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                paths.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        paths.sort();
        Ok(paths)
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let full = self.resolve(path);
        tokio::fs::read(&full).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(path.to_string())
            } else {
                StoreError::Io {
                    path: path.to_string(),
                    source: e,
                }
            }
        })
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io {
                    path: path.to_string(),
                    source: e,
                })?;
        }
        tokio::fs::write(&full, bytes).await.map_err(|e| StoreError::Io {
            path: path.to_string(),
            source: e,
        })
    }
}
