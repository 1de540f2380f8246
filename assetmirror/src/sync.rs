//! One synchronization run.
//!
//! [`SyncRunner`] wires the manifest store, the manifest fetcher, the plan
//! builder and the download coordinator together:
//!
//! 1. load the baseline manifest
//! 2. fetch the published manifest, stopping early if it is unchanged
//! 3. enumerate every download task
//! 4. download them concurrently
//! 5. persist the new manifest, even if some downloads failed

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::diff::SyncPlan;
use crate::download::{AssetFetcher, DownloadCoordinator, ProgressCallback, RetryPolicy, RunSummary};
use crate::error::{SyncError, SyncResult};
use crate::http::{AsyncHttpClient, ReqwestClient, DEFAULT_MAX_CONNECTIONS, DEFAULT_TIMEOUT_SECS};
use crate::manifest::{FetchOutcome, ManifestFetcher, ManifestStore};
use crate::selection::Selection;

/// Default CDN base URL.
pub const DEFAULT_BASE_URL: &str = "https://cdn.id.supercell.com/assets/";

/// Default local mirror directory.
pub const DEFAULT_ASSETS_DIR: &str = "assets";

/// Everything a run needs to know.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum number of in-flight HTTP requests.
    pub max_connections: usize,
    pub selection: Selection,
    pub retry: RetryPolicy,
    pub assets_dir: PathBuf,
    /// Treat a missing baseline manifest as empty instead of failing.
    pub fresh: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            selection: Selection::default(),
            retry: RetryPolicy::default(),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            fresh: false,
        }
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The published manifest matches the baseline; nothing was downloaded.
    Unchanged,
    /// A new manifest was processed and persisted.
    Synced(RunSummary),
}

/// Runs a single synchronization.
pub struct SyncRunner<C: AsyncHttpClient> {
    config: SyncConfig,
    client: Arc<C>,
    on_progress: Option<ProgressCallback>,
}

impl SyncRunner<ReqwestClient> {
    /// Create a runner backed by a real HTTP client built from `config`.
    pub fn from_config(config: SyncConfig) -> SyncResult<Self> {
        let client = ReqwestClient::with_settings(config.timeout, config.max_connections)
            .map_err(SyncError::HttpClient)?;
        Ok(Self::new(config, client))
    }
}

impl<C: AsyncHttpClient> SyncRunner<C> {
    pub fn new(config: SyncConfig, client: C) -> Self {
        Self {
            config,
            client: Arc::new(client),
            on_progress: None,
        }
    }

    /// Report every task resolution to `on_progress`.
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Build the plan for this run without downloading anything.
    ///
    /// Returns `None` when the published manifest is unchanged.
    pub async fn plan(&self) -> SyncResult<Option<(SyncPlan, Vec<u8>)>> {
        let store = ManifestStore::in_dir(&self.config.assets_dir);
        let baseline = if self.config.fresh {
            store.load_or_empty().await?
        } else {
            store.load().await?
        };

        let fetcher = ManifestFetcher::new(Arc::clone(&self.client), self.config.base_url.as_str());
        let (raw, manifest) = match fetcher.fetch(&baseline.raw).await? {
            FetchOutcome::Unchanged => return Ok(None),
            FetchOutcome::Updated { raw, manifest } => (raw, manifest),
        };

        let plan = SyncPlan::build(&baseline.manifest, &manifest, &self.config.selection);
        Ok(Some((plan, raw)))
    }

    /// Run the synchronization to completion.
    pub async fn run(self) -> SyncResult<SyncOutcome> {
        let Some((plan, raw)) = self.plan().await? else {
            info!("Assets are up to date");
            return Ok(SyncOutcome::Unchanged);
        };

        info!(tasks = plan.len(), "Planned downloads");

        let fetcher = AssetFetcher::new(
            Arc::clone(&self.client),
            self.config.base_url.as_str(),
            self.config.assets_dir.clone(),
        );
        let mut coordinator =
            DownloadCoordinator::new(fetcher).with_retry(self.config.retry.clone());
        if let Some(on_progress) = self.on_progress {
            coordinator = coordinator.with_progress(on_progress);
        }

        let summary = coordinator.run(plan.into_tasks()).await;

        ManifestStore::in_dir(&self.config.assets_dir)
            .save(&raw)
            .await?;

        if summary.failure > 0 {
            warn!(
                success = summary.success,
                failed = summary.failure,
                total = summary.total,
                "Sync finished with failures"
            );
        } else {
            info!(
                success = summary.success,
                failed = summary.failure,
                total = summary.total,
                "Sync finished"
            );
        }

        Ok(SyncOutcome::Synced(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;
    use crate::manifest::MANIFEST_FILE_NAME;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use tempfile::TempDir;

    const BASE: &str = "https://cdn.example.com/assets/";

    const OLD: &[u8] = br#"{"RemoteAssets":{"Android":{"hdpi":{"x.png":"h1"}}}}"#;
    const NEW: &[u8] =
        br#"{"RemoteAssets":{"Android":{"hdpi":{"x.png":"h2"},"mdpi":{"y.png":"h3"}}}}"#;

    fn token(payload: &[u8]) -> String {
        format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    fn config(dir: &TempDir) -> SyncConfig {
        SyncConfig {
            base_url: BASE.to_string(),
            selection: Selection::preferred("hdpi", "images3x", "en"),
            retry: RetryPolicy::immediate(3),
            assets_dir: dir.path().to_path_buf(),
            ..SyncConfig::default()
        }
    }

    fn seed_baseline(dir: &TempDir, raw: &[u8]) {
        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), raw).unwrap();
    }

    #[tokio::test]
    async fn test_unchanged_manifest_downloads_nothing() {
        let temp = TempDir::new().unwrap();
        seed_baseline(&temp, OLD);
        let manifest = temp.path().join(MANIFEST_FILE_NAME);
        let modified = std::fs::metadata(&manifest).unwrap().modified().unwrap();
        let client = Arc::new(
            MockHttpClient::new().with_body("https://cdn.example.com/assets/AssetManifest.jwt", token(OLD)),
        );

        let outcome = SyncRunner::new(config(&temp), Arc::clone(&client))
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert_eq!(client.calls(), 1);
        assert!(!temp.path().join("Android").exists());

        // The stored manifest is not rewritten
        assert_eq!(std::fs::read(&manifest).unwrap(), OLD);
        assert_eq!(std::fs::metadata(&manifest).unwrap().modified().unwrap(), modified);
    }

    #[tokio::test]
    async fn test_changed_manifest_downloads_preferred_assets() {
        let temp = TempDir::new().unwrap();
        seed_baseline(&temp, OLD);
        let client = Arc::new(
            MockHttpClient::new()
                .with_body("https://cdn.example.com/assets/AssetManifest.jwt", token(NEW))
                .with_body("https://cdn.example.com/assets/Android/hdpi/x.png", "x-v2"),
        );

        let outcome = SyncRunner::new(config(&temp), Arc::clone(&client))
            .run()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Synced(RunSummary {
                success: 1,
                failure: 0,
                total: 1
            })
        );
        assert_eq!(
            std::fs::read(temp.path().join("Android/hdpi/x.png")).unwrap(),
            b"x-v2"
        );
        assert!(!temp.path().join("Android/mdpi").exists());
        assert_eq!(
            std::fs::read(temp.path().join(MANIFEST_FILE_NAME)).unwrap(),
            NEW
        );
    }

    #[tokio::test]
    async fn test_failed_assets_still_persist_manifest() {
        let temp = TempDir::new().unwrap();
        seed_baseline(&temp, OLD);
        // No body for x.png: every attempt gets a 404
        let client = Arc::new(
            MockHttpClient::new()
                .with_body("https://cdn.example.com/assets/AssetManifest.jwt", token(NEW)),
        );

        let outcome = SyncRunner::new(config(&temp), Arc::clone(&client))
            .run()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Synced(RunSummary {
                success: 0,
                failure: 1,
                total: 1
            })
        );
        // One manifest request plus three attempts
        assert_eq!(client.calls(), 4);
        assert_eq!(
            std::fs::read(temp.path().join(MANIFEST_FILE_NAME)).unwrap(),
            NEW
        );
    }

    #[tokio::test]
    async fn test_missing_baseline_is_fatal() {
        let temp = TempDir::new().unwrap();
        let client = MockHttpClient::new()
            .with_body("https://cdn.example.com/assets/AssetManifest.jwt", token(NEW));

        let err = SyncRunner::new(config(&temp), client).run().await.unwrap_err();

        assert!(matches!(err, SyncError::BaselineRead { .. }));
        assert!(!temp.path().join(MANIFEST_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_fresh_run_downloads_everything_selected() {
        let temp = TempDir::new().unwrap();
        let client = MockHttpClient::new()
            .with_body("https://cdn.example.com/assets/AssetManifest.jwt", token(NEW))
            .with_body("https://cdn.example.com/assets/Android/hdpi/x.png", "x")
            .with_body("https://cdn.example.com/assets/Android/mdpi/y.png", "y");

        let config = SyncConfig {
            selection: Selection::all(),
            fresh: true,
            ..config(&temp)
        };
        let outcome = SyncRunner::new(config, client).run().await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Synced(RunSummary {
                success: 2,
                failure: 0,
                total: 2
            })
        );
        assert!(temp.path().join("Android/mdpi/y.png").exists());
    }

    #[tokio::test]
    async fn test_manifest_fetch_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        seed_baseline(&temp, OLD);

        let err = SyncRunner::new(config(&temp), MockHttpClient::new())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::ManifestFetch(_)));
        assert_eq!(
            std::fs::read(temp.path().join(MANIFEST_FILE_NAME)).unwrap(),
            OLD
        );
    }

    #[tokio::test]
    async fn test_progress_reports_completion() {
        let temp = TempDir::new().unwrap();
        seed_baseline(&temp, OLD);
        let client = MockHttpClient::new()
            .with_body("https://cdn.example.com/assets/AssetManifest.jwt", token(NEW))
            .with_body("https://cdn.example.com/assets/Android/hdpi/x.png", "x");

        let finished = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&finished);
        SyncRunner::new(config(&temp), client)
            .with_progress(Box::new(move |progress| {
                if progress.finished {
                    seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            }))
            .run()
            .await
            .unwrap();

        assert_eq!(finished.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.retry.max_attempts(), 50);
        assert_eq!(config.assets_dir, PathBuf::from("assets"));
        assert!(!config.fresh);
    }
}
