//! Asset downloads.
//!
//! This module turns a list of [`DownloadTask`](crate::diff::DownloadTask)s
//! into files on disk:
//!
//! - [`AssetFetcher`] performs one attempt for one asset (HTTP GET, then
//!   write to `<assets_dir>/<dimension>/<category>/<asset>`)
//! - [`RetryPolicy`] bounds the attempts per asset
//! - [`DownloadCoordinator`] spawns every task concurrently and tracks
//!   success, failure and completion with [`RunCounters`]
//!
//! # Example
//!
//! ```ignore
//! use assetmirror::download::{AssetFetcher, DownloadCoordinator, RetryPolicy};
//! use assetmirror::http::ReqwestClient;
//!
//! let fetcher = AssetFetcher::new(ReqwestClient::new()?, base_url, "assets");
//! let summary = DownloadCoordinator::new(fetcher)
//!     .with_retry(RetryPolicy::immediate(50))
//!     .run(plan.into_tasks())
//!     .await;
//! ```

mod coordinator;
mod counters;
mod fetcher;
mod retry;

pub use coordinator::{DownloadCoordinator, ProgressCallback};
pub use counters::{Progress, Resolution, RunCounters, RunSummary};
pub use fetcher::{AssetFetch, AssetFetcher, FetchError};
pub use retry::{
    RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_SECS,
};
