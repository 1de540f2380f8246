//! AssetMirror - incremental mirroring of a versioned remote asset catalog
//!
//! This library compares the last synchronized asset manifest with the one
//! currently published on the CDN and downloads only the entries whose
//! content hash changed.
//!
//! # Architecture
//!
//! ```text
//! ManifestStore ──┐
//!                 ├──► SyncPlan (selection + diff) ──► DownloadCoordinator ──► AssetFetcher
//! ManifestFetcher ┘                                        (retry, counters)      (HTTP → disk)
//! ```
//!
//! [`sync::SyncRunner`] wires the components together for a single run.

pub mod config;
pub mod diff;
pub mod download;
pub mod error;
pub mod http;
pub mod logging;
pub mod manifest;
pub mod selection;
pub mod sync;

/// Crate version, as reported by the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
