use super::{StorageError, StorageResult};
use std::fmt;

/// A parsed `scheme://bucket/key` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUri {
    pub scheme: String,
    pub bucket: String,
    pub key: String,
}

impl StorageUri {
    pub fn parse(uri: &str, scheme: &str) -> StorageResult<Self> {
        let prefix = format!("{}://", scheme);
        let rest = uri.strip_prefix(&prefix).ok_or_else(|| {
            StorageError::InvalidUri(format!("{} must start with {}", uri, prefix))
        })?;

        let (bucket, key) = match rest.split_once('/') {
            Some((bucket, key)) => (bucket, key),
            None => (rest, ""),
        };

        if bucket.is_empty() {
            return Err(StorageError::InvalidUri(format!("{} has no bucket name", uri)));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Key for `relative` beneath this reference's key prefix.
    pub fn child_key(&self, relative: &str) -> String {
        let prefix = self.key.trim_end_matches('/');
        if prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", prefix, relative)
        }
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}
