//! Storage adapter
//!
//! Moves single objects down into a local file and whole local directories up under a
//! key prefix. References look like `scheme://bucket/key/path`.

mod object;
mod uri;

pub use object::{BucketResolver, GcsBuckets, LocalBuckets, ObjectStorage};
pub use uri::StorageUri;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage URI: {0}")]
    InvalidUri(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Download the object named by `uri` into `local_path`, creating parent directories.
    async fn fetch(&self, uri: &str, local_path: &Path) -> StorageResult<PathBuf>;

    /// Upload every file under `local_dir` beneath the key prefix named by `uri`.
    ///
    /// Returns the number of files uploaded. A failure part way through leaves the
    /// files uploaded so far in place.
    async fn store(&self, local_dir: &Path, uri: &str) -> StorageResult<usize>;
}
