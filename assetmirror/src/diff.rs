//! Manifest comparison.
//!
//! [`diff`] compares the old and new category mappings of one dimension and
//! lazily yields a [`DownloadTask`] for every asset that is new or whose hash
//! changed. [`SyncPlan`] runs the selector and the differ for every dimension
//! up front, so the total number of tasks is known before any download
//! starts.
//!
//! Assets or categories that only exist in the old manifest are never
//! reported: stale local files are left alone.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::manifest::{AssetHashmap, AssetManifest, Dimension};
use crate::selection::Selection;

/// A single asset that must be fetched.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DownloadTask {
    dimension: Dimension,
    category: String,
    asset: String,
    hash: String,
}

impl DownloadTask {
    pub fn new(
        dimension: Dimension,
        category: impl Into<String>,
        asset: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            dimension,
            category: category.into(),
            asset: asset.into(),
            hash: hash.into(),
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Content hash published for this asset.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Route relative to the CDN base URL: `<dimension>/<category>/<asset>`.
    pub fn route(&self) -> String {
        format!("{}/{}/{}", self.dimension, self.category, self.asset)
    }

    /// Destination relative to the local assets directory.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.dimension.as_str())
            .join(&self.category)
            .join(&self.asset)
    }
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.route())
    }
}

/// Compare the participating categories of one dimension.
///
/// A task is produced for asset `a` in category `k` iff `new[k][a]` exists
/// and `old[k][a]` is absent or different. Participating keys missing from
/// `new` yield nothing. Emission order is unspecified.
pub fn diff<'a>(
    old: &'a AssetHashmap,
    new: &'a AssetHashmap,
    participating: BTreeSet<&'a str>,
    dimension: Dimension,
) -> impl Iterator<Item = DownloadTask> + 'a {
    participating
        .into_iter()
        .filter_map(move |key| new.get_key_value(key))
        .flat_map(move |(category, assets)| {
            let previous = old.get(category.as_str());
            if previous.is_none() {
                info!(dimension = %dimension, category = %category, "Found new category");
            }

            assets.iter().filter_map(move |(name, hash)| {
                match previous.and_then(|p| p.get(name)) {
                    None => debug!(asset = %name, hash = %hash, "New asset"),
                    Some(old_hash) if old_hash == hash => return None,
                    Some(old_hash) => {
                        debug!(asset = %name, from = %old_hash, to = %hash, "Asset changed")
                    }
                }
                Some(DownloadTask::new(
                    dimension,
                    category.as_str(),
                    name.as_str(),
                    hash.as_str(),
                ))
            })
        })
}

/// Every download task of a run, enumerated before execution.
#[derive(Clone, Debug, Default)]
pub struct SyncPlan {
    tasks: Vec<DownloadTask>,
    per_dimension: BTreeMap<Dimension, usize>,
}

impl SyncPlan {
    /// Select and diff every dimension of `old` against `new`.
    pub fn build(old: &AssetManifest, new: &AssetManifest, selection: &Selection) -> Self {
        let mut tasks = Vec::new();
        let mut per_dimension = BTreeMap::new();

        for dimension in Dimension::ALL {
            let new_categories = new.categories(dimension);
            let participating = selection
                .policy(dimension)
                .select(new_categories.keys().map(String::as_str));

            let before = tasks.len();
            tasks.extend(diff(
                old.categories(dimension),
                new_categories,
                participating,
                dimension,
            ));

            let count = tasks.len() - before;
            info!(dimension = %dimension, changed = count, "Checked assets");
            per_dimension.insert(dimension, count);
        }

        Self {
            tasks,
            per_dimension,
        }
    }

    pub fn tasks(&self) -> &[DownloadTask] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<DownloadTask> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks planned for a dimension.
    pub fn count_for(&self, dimension: Dimension) -> usize {
        self.per_dimension.get(&dimension).copied().unwrap_or(0)
    }
}
