use super::{Storage, StorageError, StorageResult, StorageUri};
use crate::auth::Credentials;
use async_trait::async_trait;
use futures::StreamExt;
use object_store::buffered::BufWriter;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// Bytes buffered per upload before switching to a multipart upload.
const UPLOAD_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Resolves a bucket name to an object store rooted at that bucket.
pub trait BucketResolver: Send + Sync {
    fn bucket(&self, name: &str) -> StorageResult<Arc<dyn ObjectStore>>;
}

/// Google Cloud Storage buckets, authenticated with the bootstrap credentials.
pub struct GcsBuckets {
    credentials: Credentials,
}

impl GcsBuckets {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl BucketResolver for GcsBuckets {
    fn bucket(&self, name: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        let builder = self
            .credentials
            .apply(GoogleCloudStorageBuilder::from_env())
            .with_bucket_name(name);

        let store = builder
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Arc::new(store))
    }
}

/// Buckets backed by directories under a local root, for running without cloud access.
pub struct LocalBuckets {
    root: PathBuf,
}

impl LocalBuckets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BucketResolver for LocalBuckets {
    fn bucket(&self, name: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        if name.contains("..") || name.contains(std::path::MAIN_SEPARATOR) {
            return Err(StorageError::InvalidUri(format!(
                "bucket name {} is not a single path segment",
                name
            )));
        }

        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir).map_err(|e| {
            StorageError::Config(format!(
                "Failed to create bucket directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let store = LocalFileSystem::new_with_prefix(&dir)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Arc::new(store))
    }
}

/// [`Storage`] over any `object_store` backend, one store per bucket.
pub struct ObjectStorage {
    scheme: String,
    buckets: Arc<dyn BucketResolver>,
}

impl ObjectStorage {
    pub fn new(scheme: impl Into<String>, buckets: Arc<dyn BucketResolver>) -> Self {
        Self {
            scheme: scheme.into(),
            buckets,
        }
    }

    pub fn gcs(scheme: impl Into<String>, credentials: Credentials) -> Self {
        Self::new(scheme, Arc::new(GcsBuckets::new(credentials)))
    }

    pub fn local(scheme: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self::new(scheme, Arc::new(LocalBuckets::new(root)))
    }
}

#[async_trait]
impl Storage for ObjectStorage {
    async fn fetch(&self, uri: &str, local_path: &Path) -> StorageResult<PathBuf> {
        let parsed = StorageUri::parse(uri, &self.scheme)?;
        if parsed.key.is_empty() {
            return Err(StorageError::InvalidUri(format!("{} has no object key", uri)));
        }

        let store = self.buckets.bucket(&parsed.bucket)?;
        download_object(&store, &parsed, local_path).await?;

        info!("Downloaded {} to {}", uri, local_path.display());
        Ok(local_path.to_path_buf())
    }

    async fn store(&self, local_dir: &Path, uri: &str) -> StorageResult<usize> {
        let parsed = StorageUri::parse(uri, &self.scheme)?;
        let store = self.buckets.bucket(&parsed.bucket)?;
        upload_directory(&store, local_dir, &parsed).await
    }
}

async fn download_object(
    store: &Arc<dyn ObjectStore>,
    uri: &StorageUri,
    local_path: &Path,
) -> StorageResult<()> {
    let start = Instant::now();
    let location = ObjectPath::from(uri.key.as_str());

    let result = store.get(&location).await.map_err(|e| match e {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(uri.to_string()),
        other => {
            error!(
                error = %other,
                bucket = %uri.bucket,
                key = %uri.key,
                "Object download failed"
            );
            StorageError::DownloadFailed(other.to_string())
        }
    })?;

    if let Some(parent) = local_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = fs::File::create(local_path).await?;
    let mut stream = result.into_stream();
    let mut size_bytes = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            error!(
                error = %e,
                bucket = %uri.bucket,
                key = %uri.key,
                received_bytes = size_bytes,
                "Object download stream failed"
            );
            StorageError::DownloadFailed(e.to_string())
        })?;
        file.write_all(&chunk).await?;
        size_bytes += chunk.len() as u64;
    }
    file.flush().await?;

    debug!(
        bucket = %uri.bucket,
        key = %uri.key,
        size_bytes,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Object downloaded"
    );

    Ok(())
}

async fn upload_directory(
    store: &Arc<dyn ObjectStore>,
    local_dir: &Path,
    uri: &StorageUri,
) -> StorageResult<usize> {
    let files = collect_files(local_dir).await?;
    let mut uploaded = 0;

    for file in files {
        let relative = relative_key(local_dir, &file)?;
        let key = uri.child_key(&relative);

        let size = upload_file(store, &file, &key, UPLOAD_BUFFER_SIZE)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    bucket = %uri.bucket,
                    key = %key,
                    uploaded_so_far = uploaded,
                    "Object upload failed"
                );
                StorageError::UploadFailed(format!("{}: {}", key, e))
            })?;

        info!(
            "Uploaded {} to {}://{}/{} ({} bytes)",
            file.display(),
            uri.scheme,
            uri.bucket,
            key,
            size
        );
        uploaded += 1;
    }

    Ok(uploaded)
}

/// Copies one file into the store through a buffered writer. Files larger than
/// `buffer_size` go up as a multipart upload.
async fn upload_file(
    store: &Arc<dyn ObjectStore>,
    file: &Path,
    key: &str,
    buffer_size: usize,
) -> std::io::Result<u64> {
    let mut source = fs::File::open(file).await?;
    let mut writer =
        BufWriter::with_capacity(store.clone(), ObjectPath::from(key), buffer_size);

    let copied = match tokio::io::copy(&mut source, &mut writer).await {
        Ok(copied) => copied,
        Err(e) => {
            if let Err(abort_err) = writer.abort().await {
                warn!(key = %key, error = %abort_err, "Failed to abort upload");
            }
            return Err(e);
        }
    };
    writer.shutdown().await?;

    Ok(copied)
}

/// All regular files below `root`, in a stable order.
async fn collect_files(root: &Path) -> StorageResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }

    files.sort();
    Ok(files)
}

fn relative_key(root: &Path, file: &Path) -> StorageResult<String> {
    let relative = file.strip_prefix(root).map_err(|_| {
        StorageError::UploadFailed(format!(
            "{} is outside {}",
            file.display(),
            root.display()
        ))
    })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}
