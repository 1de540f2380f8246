//! Concurrent download coordinator.
//!
//! Every task of a plan is spawned onto its own tokio task right away; there
//! is no batching at this level. Concurrency on the wire is bounded by the
//! HTTP client's connection cap instead. Each task retries according to its
//! [`RetryPolicy`] and then resolves exactly once, as a success or as a
//! terminal failure that is logged but does not stop the run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::counters::{Progress, Resolution, RunCounters, RunSummary};
use super::fetcher::{AssetFetch, FetchError};
use super::retry::RetryPolicy;
use crate::diff::DownloadTask;

/// Called after every task resolution with the updated counts.
///
/// Invoked from the coordinating task; a panic inside it is logged and
/// does not affect the counts.
pub type ProgressCallback = Box<dyn Fn(&Progress) + Send + Sync>;

/// Fans out download tasks and waits for all of them to resolve.
pub struct DownloadCoordinator<F: AssetFetch> {
    fetcher: Arc<F>,
    retry: RetryPolicy,
    on_progress: Option<ProgressCallback>,
}

impl<F: AssetFetch> DownloadCoordinator<F> {
    /// Create a coordinator with the default retry policy.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            retry: RetryPolicy::default(),
            on_progress: None,
        }
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set a progress callback.
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Download every task and return the final counts.
    ///
    /// The total is fixed from `tasks` before anything is spawned, so the
    /// completion reported through [`Progress::finished`] always covers the
    /// whole run.
    pub async fn run(&self, tasks: Vec<DownloadTask>) -> RunSummary {
        let counters = Arc::new(RunCounters::new(tasks.len()));
        if tasks.is_empty() {
            info!("Nothing to download");
            return counters.summary();
        }

        info!(
            total = tasks.len(),
            max_attempts = self.retry.max_attempts(),
            "Starting downloads"
        );

        let mut running = JoinSet::new();
        for task in tasks {
            let fetcher = Arc::clone(&self.fetcher);
            let retry = self.retry.clone();

            running.spawn(async move {
                let result = fetch_with_retry(fetcher.as_ref(), &task, &retry).await;
                (task, result)
            });
        }

        // Every task resolves exactly once, here, whether it returned or died
        while let Some(joined) = running.join_next().await {
            let progress = match joined {
                Ok((task, Ok(bytes))) => {
                    let progress = counters.record(Resolution::Succeeded);
                    info!(
                        asset = %task,
                        bytes,
                        "Downloaded asset ({}/{})",
                        progress.resolved(),
                        progress.total
                    );
                    progress
                }
                Ok((task, Err(e))) => {
                    let progress = counters.record(Resolution::Failed);
                    error!(
                        asset = %task,
                        attempts = self.retry.max_attempts(),
                        error = %e,
                        "Giving up on asset ({}/{})",
                        progress.resolved(),
                        progress.total
                    );
                    progress
                }
                Err(e) => {
                    let progress = counters.record(Resolution::Failed);
                    error!(
                        error = %e,
                        "Download task aborted ({}/{})",
                        progress.resolved(),
                        progress.total
                    );
                    progress
                }
            };
            self.report(&progress);
        }

        counters.summary()
    }

    fn report(&self, progress: &Progress) {
        if progress.finished {
            info!(
                success = progress.success,
                failed = progress.failure,
                total = progress.total,
                "All downloads resolved"
            );
        }
        if let Some(cb) = &self.on_progress {
            if panic::catch_unwind(AssertUnwindSafe(|| cb(progress))).is_err() {
                warn!(resolved = progress.resolved(), "Progress callback panicked");
            }
        }
    }
}

/// Attempt a task until it succeeds or the retry budget is exhausted.
async fn fetch_with_retry<F: AssetFetch>(
    fetcher: &F,
    task: &DownloadTask,
    retry: &RetryPolicy,
) -> Result<u64, FetchError> {
    let mut attempt = 1;
    loop {
        match fetcher.fetch(task).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => match retry.delay_for_attempt(attempt) {
                Some(delay) => {
                    debug!(asset = %task, attempt, error = %e, "Retrying download");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                None => return Err(e),
            },
        }
    }
}
