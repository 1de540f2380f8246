//! Asset manifest data model and its persistence/transport.
//!
//! A manifest maps each [`Dimension`] to an [`AssetHashmap`]:
//!
//! ```text
//! RemoteAssets
//!   ├── Android        { "hdpi":  { "ui/logo.png": "<hash>", ... }, ... }
//!   ├── iOS            { "images2x": { ... }, ... }
//!   └── Localizations  { "en": { "texts.csv": "<hash>" }, ... }
//! ```
//!
//! Hashes are opaque fingerprints and are only ever compared for equality.

mod fetcher;
mod store;
mod token;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use fetcher::{FetchOutcome, ManifestFetcher, MANIFEST_ROUTE};
pub use store::{ManifestStore, StoredManifest, MANIFEST_FILE_NAME};
pub use token::{decode_payload, TokenError};

/// Asset name to content hash for a single category.
pub type CategoryAssets = HashMap<String, String>;

/// Category key (density, resolution tier, locale) to its assets.
pub type AssetHashmap = HashMap<String, CategoryAssets>;

/// One of the three top-level asset groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Android,
    Ios,
    Localizations,
}

impl Dimension {
    /// All dimensions, in the order they are planned.
    pub const ALL: [Dimension; 3] = [Dimension::Android, Dimension::Ios, Dimension::Localizations];

    /// Name used both in the manifest JSON and in CDN/local paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Android => "Android",
            Dimension::Ios => "iOS",
            Dimension::Localizations => "Localizations",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three category groups of one catalog snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAssets {
    #[serde(rename = "Android", default)]
    pub android: AssetHashmap,
    #[serde(rename = "iOS", default)]
    pub ios: AssetHashmap,
    #[serde(rename = "Localizations", default)]
    pub localizations: AssetHashmap,
}

/// A full catalog snapshot as published by the CDN.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(rename = "RemoteAssets", default)]
    pub remote_assets: RemoteAssets,
}

impl AssetManifest {
    /// Parse a manifest from its decoded JSON payload.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Category mapping for a dimension.
    pub fn categories(&self, dimension: Dimension) -> &AssetHashmap {
        match dimension {
            Dimension::Android => &self.remote_assets.android,
            Dimension::Ios => &self.remote_assets.ios,
            Dimension::Localizations => &self.remote_assets.localizations,
        }
    }

    /// Mutable category mapping for a dimension.
    pub fn categories_mut(&mut self, dimension: Dimension) -> &mut AssetHashmap {
        match dimension {
            Dimension::Android => &mut self.remote_assets.android,
            Dimension::Ios => &mut self.remote_assets.ios,
            Dimension::Localizations => &mut self.remote_assets.localizations,
        }
    }

    /// Total number of assets across every dimension and category.
    pub fn asset_count(&self) -> usize {
        Dimension::ALL
            .iter()
            .flat_map(|d| self.categories(*d).values())
            .map(HashMap::len)
            .sum()
    }
}
