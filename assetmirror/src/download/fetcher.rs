//! Single-asset fetcher.
//!
//! Downloads one asset from `<base_url>/<dimension>/<category>/<asset>` and
//! writes the decompressed body to the same relative path below the assets
//! directory, overwriting what was there.

use std::future::Future;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::diff::DownloadTask;
use crate::http::{join_url, AsyncHttpClient, HttpError};

/// Errors from a single fetch attempt. All of them are retried.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport, status or decompression failure.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The asset path would escape the assets directory.
    #[error("refusing to write outside the assets directory: {0}")]
    UnsafePath(String),

    /// Failed to create the destination directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// Failed to write the asset.
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Something that can fetch a [`DownloadTask`] once.
///
/// The coordinator drives retries; an implementation performs exactly one
/// attempt per call and returns the number of bytes stored.
pub trait AssetFetch: Send + Sync + 'static {
    fn fetch(&self, task: &DownloadTask) -> impl Future<Output = Result<u64, FetchError>> + Send;
}

/// HTTP-to-disk asset fetcher.
#[derive(Debug)]
pub struct AssetFetcher<C: AsyncHttpClient> {
    client: C,
    base_url: String,
    assets_dir: PathBuf,
}

impl<C: AsyncHttpClient> AssetFetcher<C> {
    pub fn new(client: C, base_url: impl Into<String>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            assets_dir: assets_dir.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// CDN URL of an asset.
    pub fn url_for(&self, task: &DownloadTask) -> String {
        join_url(&self.base_url, &task.route())
    }

    /// Local destination of an asset.
    pub fn destination(&self, task: &DownloadTask) -> Result<PathBuf, FetchError> {
        let relative = task.relative_path();
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !contained {
            return Err(FetchError::UnsafePath(task.route()));
        }
        Ok(self.assets_dir.join(relative))
    }
}

impl<C: AsyncHttpClient> AssetFetch for AssetFetcher<C> {
    async fn fetch(&self, task: &DownloadTask) -> Result<u64, FetchError> {
        let dest = self.destination(task)?;
        let body = self.client.get(&self.url_for(task)).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::CreateDir {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        tokio::fs::write(&dest, &body)
            .await
            .map_err(|e| FetchError::Write {
                path: dest.clone(),
                source: e,
            })?;

        Ok(body.len() as u64)
    }
}
