//! Model asset loading: local files, downloads with an on-disk cache, or bytes in memory

use crate::error::{BackendUnavailable, VisionError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const MAX_MODEL_SIZE: usize = 2_000_000_000; // 2GB max
const MIN_DOWNLOAD_SIZE: usize = 1024;
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// Where the model bytes come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    File(PathBuf),
    Url(String),
    #[serde(skip)]
    Memory(Vec<u8>),
}

impl Default for ModelSource {
    fn default() -> Self {
        ModelSource::File(PathBuf::from("models/yolo11n.onnx"))
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSource::File(path) => write!(f, "{}", path.display()),
            ModelSource::Url(url) => write!(f, "{}", url),
            ModelSource::Memory(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Resolves a [`ModelSource`] into the raw bytes handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct ModelFetcher {
    cache_dir: Option<PathBuf>,
}

impl ModelFetcher {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Load the model, verifying `checksum` (hex SHA-256) when given.
    ///
    /// Every failure is reported as [`BackendUnavailable::ModelAsset`]: without
    /// the asset there is nothing for either backend to initialize.
    pub async fn fetch(
        &self,
        source: &ModelSource,
        checksum: Option<&str>,
    ) -> Result<Vec<u8>, BackendUnavailable> {
        self.fetch_inner(source, checksum)
            .await
            .map_err(|e| BackendUnavailable::ModelAsset(format!("{}: {}", source, e)))
    }

    async fn fetch_inner(&self, source: &ModelSource, checksum: Option<&str>) -> Result<Vec<u8>, VisionError> {
        let bytes = match source {
            ModelSource::Memory(bytes) => bytes.clone(),
            ModelSource::File(path) => {
                let bytes = tokio::fs::read(path).await?;
                info!("Model loaded from {:?} ({} bytes)", path, bytes.len());
                bytes
            }
            ModelSource::Url(url) => self.download_cached(url, checksum).await?,
        };

        if bytes.is_empty() {
            return Err(VisionError::Config("Model asset is empty".to_string()));
        }
        if bytes.len() > MAX_MODEL_SIZE {
            return Err(VisionError::Config(format!(
                "Model too large: {} bytes (max {} bytes)",
                bytes.len(),
                MAX_MODEL_SIZE
            )));
        }
        verify_checksum(&bytes, checksum)?;
        Ok(bytes)
    }

    /// Cache file for `url`, keyed by the URL hash so two models never collide
    pub fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let file_name = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty() && !name.contains("..") && !name.contains('\\'))
            .unwrap_or("model.onnx");
        let key = &sha256_hex(url.as_bytes())[..16];
        Some(dir.join(format!("{}-{}", key, file_name)))
    }

    async fn download_cached(&self, url: &str, checksum: Option<&str>) -> Result<Vec<u8>, VisionError> {
        validate_url(url)?;

        let cache_path = self.cache_path(url);
        if let Some(path) = &cache_path {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                let bytes = tokio::fs::read(path).await?;
                if verify_checksum(&bytes, checksum).is_ok() {
                    info!("Model cache hit for {} at {:?}", url, path);
                    return Ok(bytes);
                }
                debug!("Cached model at {:?} failed verification, downloading again", path);
            }
        }

        let bytes = download(url).await?;
        verify_checksum(&bytes, checksum)?;

        if let Some(path) = &cache_path {
            write_atomically(path, &bytes).await?;
            info!("Model {} saved to {:?}", url, path);
        }
        Ok(bytes)
    }
}

fn validate_url(url: &str) -> Result<(), VisionError> {
    if url.is_empty() || url.len() > 2048 {
        return Err(VisionError::Config("Invalid model URL".to_string()));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(VisionError::Config(format!(
            "Unsupported model URL scheme: {}",
            url
        )));
    }
    Ok(())
}

fn verify_checksum(bytes: &[u8], checksum: Option<&str>) -> Result<(), VisionError> {
    let Some(expected) = checksum.filter(|c| !c.is_empty()) else {
        return Ok(());
    };
    let computed = sha256_hex(bytes);
    if !computed.eq_ignore_ascii_case(expected) {
        return Err(VisionError::Config(format!(
            "Checksum mismatch: expected {}, got {}",
            expected, computed
        )));
    }
    Ok(())
}

async fn download(url: &str) -> Result<Vec<u8>, VisionError> {
    info!("Downloading model from {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()?;

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(VisionError::Config(format!(
            "Failed to download model: HTTP {}",
            response.status()
        )));
    }

    if let Some(content_length) = response.content_length() {
        if content_length > MAX_MODEL_SIZE as u64 {
            return Err(VisionError::Config(format!(
                "Model too large: {} bytes (max {} bytes)",
                content_length, MAX_MODEL_SIZE
            )));
        }
    }

    let bytes = response.bytes().await?;
    if bytes.len() < MIN_DOWNLOAD_SIZE {
        return Err(VisionError::Config(
            "Downloaded file too small, likely corrupted".to_string(),
        ));
    }
    Ok(bytes.to_vec())
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), VisionError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, bytes).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}
