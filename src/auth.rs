//! Credential bootstrap for the GCS storage backend.
//!
//! Runs once at startup. The outcome is only logged: storage calls made without usable
//! credentials fail on their own.

use crate::{config::AuthConfig, Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::ObjectStore;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

const PROBE_PLACEHOLDER_BUCKET: &str = "credential-probe";

#[derive(Clone, Default)]
pub enum Credentials {
    /// Service account key file on disk.
    KeyFile(PathBuf),
    /// Decoded service account key JSON.
    ServiceAccountKey(String),
    /// Whatever the environment provides (application default credentials, metadata server).
    #[default]
    Ambient,
}

impl Credentials {
    pub fn apply(&self, builder: GoogleCloudStorageBuilder) -> GoogleCloudStorageBuilder {
        match self {
            Self::KeyFile(path) => builder.with_service_account_path(path.to_string_lossy()),
            Self::ServiceAccountKey(json) => builder.with_service_account_key(json.clone()),
            Self::Ambient => builder,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Self::KeyFile(_) => "key_file",
            Self::ServiceAccountKey(_) => "environment",
            Self::Ambient => "ambient",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
            Self::ServiceAccountKey(_) => f.write_str("ServiceAccountKey(<redacted>)"),
            Self::Ambient => f.write_str("Ambient"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    #[serde(rename = "type")]
    key_type: String,
    client_email: String,
    private_key: String,
    #[serde(default)]
    project_id: Option<String>,
}

pub async fn init(config: &AuthConfig) -> Result<Credentials> {
    let encoded = std::env::var(&config.key_env).ok();
    resolve(config, encoded.as_deref()).await
}

/// Picks credentials from the key file, then from `encoded_key`.
pub async fn resolve(config: &AuthConfig, encoded_key: Option<&str>) -> Result<Credentials> {
    if tokio::fs::try_exists(&config.key_file).await.unwrap_or(false) {
        info!(
            "Using service account key from file: {}",
            config.key_file.display()
        );
        return Ok(Credentials::KeyFile(config.key_file.clone()));
    }

    let Some(encoded) = encoded_key.filter(|value| !value.trim().is_empty()) else {
        return Err(Error::auth("No service account key found"));
    };

    debug!("Decoding service account key from {}", config.key_env);
    let (credentials, key) = decode_service_account(encoded)?;
    probe(&credentials, config.probe_bucket.as_deref()).await?;

    info!(
        "Successfully authenticated as {} (project: {})",
        key.client_email,
        key.project_id.as_deref().unwrap_or("unknown")
    );
    Ok(credentials)
}

fn decode_service_account(encoded: &str) -> Result<(Credentials, ServiceAccountKey)> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::auth(format!("Service account key is not valid base64: {}", e)))?;

    let json = String::from_utf8(bytes)
        .map_err(|e| Error::auth(format!("Service account key is not UTF-8: {}", e)))?;

    let key: ServiceAccountKey = serde_json::from_str(&json)
        .map_err(|e| Error::auth(format!("Service account key is not valid JSON: {}", e)))?;

    if key.key_type != "service_account" {
        return Err(Error::auth(format!(
            "Expected a service_account key, got '{}'",
            key.key_type
        )));
    }
    if key.private_key.trim().is_empty() {
        return Err(Error::auth("Service account key has an empty private_key"));
    }

    Ok((Credentials::ServiceAccountKey(json), key))
}

/// Builds a client from the key and, when a bucket is configured, lists it.
async fn probe(credentials: &Credentials, bucket: Option<&str>) -> Result<()> {
    let store = credentials
        .apply(GoogleCloudStorageBuilder::new())
        .with_bucket_name(bucket.unwrap_or(PROBE_PLACEHOLDER_BUCKET))
        .build()
        .map_err(|e| Error::auth(format!("Failed to build storage client: {}", e)))?;

    if let Some(bucket) = bucket {
        store
            .list_with_delimiter(None)
            .await
            .map_err(|e| Error::auth(format!("Failed to list bucket {}: {}", bucket, e)))?;
        debug!("Credential probe listed bucket {}", bucket);
    }

    Ok(())
}
