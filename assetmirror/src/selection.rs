//! Category selection policy.
//!
//! Every dimension publishes the same assets in several variants: image
//! densities for Android, resolution tiers for iOS, languages for
//! localizations. A [`SelectionPolicy`] decides which variants take part in
//! a run. In [`SelectionMode::PreferredOnly`] exactly one key is mirrored and
//! everything else is skipped, including keys that were never seen before.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::manifest::Dimension;

/// Android image densities, lowest to highest resolution.
pub const ANDROID_DENSITIES: &[&str] = &["mdpi", "hdpi", "xhdpi", "xxhdpi", "xxxhdpi"];

/// iOS image resolution tiers, lowest to highest resolution.
pub const IOS_RESOLUTIONS: &[&str] = &["images1x", "images2x", "images3x"];

/// Published localization codes.
pub const LOCALES: &[&str] = &[
    "ar", "cn", "cnt", "da", "en", "es", "fa", "fr", "he", "id", "it", "jp", "kr", "ms", "nl",
    "no", "pl", "pt", "ru", "sv", "th", "tr", "vi",
];

/// Highest Android density.
pub const DEFAULT_ANDROID_DENSITY: &str = "xxxhdpi";

/// Highest iOS resolution tier.
pub const DEFAULT_IOS_RESOLUTION: &str = "images3x";

/// English.
pub const DEFAULT_LOCALE: &str = "en";

/// Whether every variant or only the preferred one is mirrored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionMode {
    /// Every category key present upstream participates.
    All,
    /// Only the preferred key participates.
    #[default]
    PreferredOnly,
}

/// Selection policy for one dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionPolicy {
    candidates: BTreeSet<String>,
    preferred: String,
    mode: SelectionMode,
}

impl SelectionPolicy {
    /// Create a policy from known candidate keys, a preferred key and a mode.
    pub fn new<I, S>(candidates: I, preferred: impl Into<String>, mode: SelectionMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            preferred: preferred.into(),
            mode,
        }
    }

    /// Policy that selects every key.
    pub fn all<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(candidates, String::new(), SelectionMode::All)
    }

    /// Policy that selects only `preferred`.
    pub fn preferred_only<I, S>(candidates: I, preferred: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(candidates, preferred, SelectionMode::PreferredOnly)
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn preferred(&self) -> &str {
        &self.preferred
    }

    /// Whether `key` belongs to the known vocabulary of this dimension.
    pub fn is_known(&self, key: &str) -> bool {
        self.candidates.contains(key)
    }

    /// Whether a category key participates in diffing.
    pub fn includes(&self, key: &str) -> bool {
        match self.mode {
            SelectionMode::All => true,
            SelectionMode::PreferredOnly => key == self.preferred,
        }
    }

    /// Filter `keys` down to the participating ones.
    pub fn select<'a, I>(&self, keys: I) -> BTreeSet<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter()
            .filter(|key| {
                let included = self.includes(key);
                if !included {
                    if self.is_known(key) {
                        debug!(category = %key, "Skipping category");
                    } else {
                        debug!(category = %key, "Skipping unrecognized category");
                    }
                }
                included
            })
            .collect()
    }
}

/// Selection policies for all three dimensions of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub android: SelectionPolicy,
    pub ios: SelectionPolicy,
    pub localizations: SelectionPolicy,
}

impl Selection {
    /// Mirror every variant of every dimension.
    pub fn all() -> Self {
        Self {
            android: SelectionPolicy::all(ANDROID_DENSITIES.iter().copied()),
            ios: SelectionPolicy::all(IOS_RESOLUTIONS.iter().copied()),
            localizations: SelectionPolicy::all(LOCALES.iter().copied()),
        }
    }

    /// Mirror one preferred variant per dimension.
    ///
    /// Keys outside the known vocabulary are accepted with a warning, since
    /// the CDN may introduce new variants.
    pub fn preferred(android: &str, ios: &str, locale: &str) -> Self {
        let selection = Self {
            android: SelectionPolicy::preferred_only(ANDROID_DENSITIES.iter().copied(), android),
            ios: SelectionPolicy::preferred_only(IOS_RESOLUTIONS.iter().copied(), ios),
            localizations: SelectionPolicy::preferred_only(LOCALES.iter().copied(), locale),
        };

        for dimension in Dimension::ALL {
            let policy = selection.policy(dimension);
            if !policy.is_known(policy.preferred()) {
                warn!(
                    dimension = %dimension,
                    preferred = %policy.preferred(),
                    "Preferred category is not a known variant"
                );
            }
        }

        selection
    }

    pub fn policy(&self, dimension: Dimension) -> &SelectionPolicy {
        match dimension {
            Dimension::Android => &self.android,
            Dimension::Ios => &self.ios,
            Dimension::Localizations => &self.localizations,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::preferred(DEFAULT_ANDROID_DENSITY, DEFAULT_IOS_RESOLUTION, DEFAULT_LOCALE)
    }
}
