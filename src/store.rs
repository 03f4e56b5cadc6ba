// src/store.rs
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Server-relative path of the site configuration file, fixed under the
/// project root and not configurable per-request.
pub const SITE_CONFIG_FILE: &str = "data/site-config.json";

/// Failure writing the site configuration to disk.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document could not be serialized.
    #[error("{0}")]
    Encode(#[from] serde_json::Error),
    /// The file could not be written.
    #[error("{0}")]
    Write(#[from] std::io::Error),
}

impl StoreError {
    /// Short category string reported alongside the underlying message.
    pub fn category(&self) -> &'static str {
        match self {
            StoreError::Encode(_) => "Failed to encode configuration",
            StoreError::Write(_) => "Failed to write configuration",
        }
    }
}

/// Resolves the site configuration path under the given project root.
pub fn site_config_path(root: &Path) -> PathBuf {
    root.join(SITE_CONFIG_FILE)
}

/// Overwrites the configuration file with the pretty-printed document.
///
/// The document is serialized with stable 2-space indentation and written
/// wholesale; the parent directory is created if missing. There is no
/// atomic replace and no locking: concurrent saves race, last writer wins,
/// and a failed write leaves the file as the failure left it.
pub async fn persist(path: &Path, document: &serde_json::Value) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(document)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, payload).await?;
    Ok(())
}
