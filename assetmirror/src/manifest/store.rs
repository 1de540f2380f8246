//! Persistence of the last synchronized manifest.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::AssetManifest;
use crate::error::{SyncError, SyncResult};

/// File name of the stored baseline inside the assets directory.
pub const MANIFEST_FILE_NAME: &str = "AssetManifest.json";

/// A manifest as raw decoded bytes plus its parsed form.
///
/// The raw bytes are what gets compared against the next fetched payload.
#[derive(Clone, Debug, Default)]
pub struct StoredManifest {
    pub raw: Vec<u8>,
    pub manifest: AssetManifest,
}

impl StoredManifest {
    /// An empty baseline: every upstream asset counts as new.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Loads and saves the baseline manifest at a fixed path.
#[derive(Clone, Debug)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<assets_dir>/AssetManifest.json`.
    pub fn in_dir(assets_dir: &Path) -> Self {
        Self::new(assets_dir.join(MANIFEST_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the baseline. A missing or unparsable file is an error.
    pub async fn load(&self) -> SyncResult<StoredManifest> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| SyncError::BaselineRead {
                path: self.path.clone(),
                source: e,
            })?;
        self.parse(raw)
    }

    /// Load the baseline, treating a missing file as an empty manifest.
    pub async fn load_or_empty(&self) -> SyncResult<StoredManifest> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => self.parse(raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No previous manifest, starting from scratch");
                Ok(StoredManifest::empty())
            }
            Err(e) => Err(SyncError::BaselineRead {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Persist raw manifest bytes, creating the parent directory if needed.
    pub async fn save(&self, raw: &[u8]) -> SyncResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::ManifestSave {
                    path: self.path.clone(),
                    source: e,
                })?;
        }

        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| SyncError::ManifestSave {
                path: self.path.clone(),
                source: e,
            })?;

        debug!(path = %self.path.display(), bytes = raw.len(), "Saved manifest");
        Ok(())
    }

    fn parse(&self, raw: Vec<u8>) -> SyncResult<StoredManifest> {
        let manifest = AssetManifest::from_json(&raw).map_err(|e| SyncError::BaselineParse {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(StoredManifest { raw, manifest })
    }
}
