//! Configuration file handling.
//!
//! Settings live in an INI file at `~/.config/assetmirror/config.ini` (or the
//! platform equivalent). Missing keys fall back to defaults, so an empty or
//! absent file is a valid configuration. CLI arguments override file values.
//!
//! ```ini
//! [cdn]
//! base_url = https://cdn.id.supercell.com/assets/
//! timeout = 30
//! max_connections = 64
//!
//! [selection]
//! android = xxxhdpi
//! ios = images3x
//! locale = en
//! download_all = false
//!
//! [retry]
//! attempts = 50
//! delay_ms = 0
//! exponential = false
//!
//! [storage]
//! assets_dir = assets
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use tracing::{debug, warn};

use crate::download::{
    RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_SECS,
};
use crate::http::{DEFAULT_MAX_CONNECTIONS, DEFAULT_TIMEOUT_SECS};
use crate::selection::{
    Selection, DEFAULT_ANDROID_DENSITY, DEFAULT_IOS_RESOLUTION, DEFAULT_LOCALE,
};
use crate::sync::{SyncConfig, DEFAULT_ASSETS_DIR, DEFAULT_BASE_URL};

/// Name of the application directory below the platform config directory.
const APP_DIR: &str = "assetmirror";

/// Name of the configuration file.
const CONFIG_FILE: &str = "config.ini";

/// Default location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Errors from reading or writing the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    Io { path: PathBuf, source: io::Error },

    /// The file is not valid INI.
    Parse { path: PathBuf, message: String },

    /// A key holds a value of the wrong type.
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// A `section.key` name that does not exist.
    UnknownKey(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "config file {}: {}", path.display(), source)
            }
            Self::Parse { path, message } => {
                write!(f, "invalid config file {}: {}", path.display(), message)
            }
            Self::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "invalid value '{}' for {}: expected {}", value, key, expected),
            Self::UnknownKey(key) => write!(f, "unknown configuration key '{}'", key),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// `[cdn]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CdnSettings {
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    pub max_connections: usize,
}

impl Default for CdnSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// `[selection]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionSettings {
    pub android: String,
    pub ios: String,
    pub locale: String,
    pub download_all: bool,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            android: DEFAULT_ANDROID_DENSITY.to_string(),
            ios: DEFAULT_IOS_RESOLUTION.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            download_all: false,
        }
    }
}

/// `[retry]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrySettings {
    /// Attempts per asset, including the first one.
    pub attempts: u32,
    /// Delay between attempts, or initial delay with exponential backoff.
    pub delay_ms: u64,
    pub exponential: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: 0,
            exponential: false,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        if !self.exponential {
            return RetryPolicy::fixed(self.attempts, Duration::from_millis(self.delay_ms));
        }

        let initial_delay = if self.delay_ms > 0 {
            self.delay_ms
        } else {
            DEFAULT_INITIAL_DELAY_MS
        };
        let max_delay = Duration::from_secs(DEFAULT_MAX_DELAY_SECS);
        RetryPolicy::ExponentialBackoff {
            max_attempts: self.attempts,
            initial_delay: Duration::from_millis(initial_delay).min(max_delay),
            max_delay,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

/// `[storage]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageSettings {
    pub assets_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
        }
    }
}

/// Parsed configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub cdn: CdnSettings,
    pub selection: SelectionSettings,
    pub retry: RetrySettings,
    pub storage: StorageSettings,
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let ini = Ini::load_from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_ini(&ini)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |e: io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        self.to_ini().write_to_file(path).map_err(io_err)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (section, properties) in ini.iter() {
            let Some(section) = section else { continue };
            for (key, value) in properties.iter() {
                match format!("{}.{}", section, key).parse::<ConfigKey>() {
                    Ok(config_key) => config_key.set(&mut config, value)?,
                    Err(_) => warn!(section, key, "Ignoring unknown config key"),
                }
            }
        }
        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini
    }

    /// Settings for a synchronization run.
    pub fn to_sync_config(&self) -> SyncConfig {
        let selection = if self.selection.download_all {
            Selection::all()
        } else {
            Selection::preferred(
                &self.selection.android,
                &self.selection.ios,
                &self.selection.locale,
            )
        };

        SyncConfig {
            base_url: self.cdn.base_url.clone(),
            timeout: Duration::from_secs(self.cdn.timeout),
            max_connections: self.cdn.max_connections,
            selection,
            retry: self.retry.policy(),
            assets_dir: self.storage.assets_dir.clone(),
            fresh: false,
        }
    }
}

/// A single `section.key` setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigKey {
    CdnBaseUrl,
    CdnTimeout,
    CdnMaxConnections,
    SelectionAndroid,
    SelectionIos,
    SelectionLocale,
    SelectionDownloadAll,
    RetryAttempts,
    RetryDelayMs,
    RetryExponential,
    StorageAssetsDir,
}

impl ConfigKey {
    /// Every key, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            Self::CdnBaseUrl,
            Self::CdnTimeout,
            Self::CdnMaxConnections,
            Self::SelectionAndroid,
            Self::SelectionIos,
            Self::SelectionLocale,
            Self::SelectionDownloadAll,
            Self::RetryAttempts,
            Self::RetryDelayMs,
            Self::RetryExponential,
            Self::StorageAssetsDir,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            Self::CdnBaseUrl | Self::CdnTimeout | Self::CdnMaxConnections => "cdn",
            Self::SelectionAndroid
            | Self::SelectionIos
            | Self::SelectionLocale
            | Self::SelectionDownloadAll => "selection",
            Self::RetryAttempts | Self::RetryDelayMs | Self::RetryExponential => "retry",
            Self::StorageAssetsDir => "storage",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            Self::CdnBaseUrl => "base_url",
            Self::CdnTimeout => "timeout",
            Self::CdnMaxConnections => "max_connections",
            Self::SelectionAndroid => "android",
            Self::SelectionIos => "ios",
            Self::SelectionLocale => "locale",
            Self::SelectionDownloadAll => "download_all",
            Self::RetryAttempts => "attempts",
            Self::RetryDelayMs => "delay_ms",
            Self::RetryExponential => "exponential",
            Self::StorageAssetsDir => "assets_dir",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as it would be written to the file.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            Self::CdnBaseUrl => config.cdn.base_url.clone(),
            Self::CdnTimeout => config.cdn.timeout.to_string(),
            Self::CdnMaxConnections => config.cdn.max_connections.to_string(),
            Self::SelectionAndroid => config.selection.android.clone(),
            Self::SelectionIos => config.selection.ios.clone(),
            Self::SelectionLocale => config.selection.locale.clone(),
            Self::SelectionDownloadAll => config.selection.download_all.to_string(),
            Self::RetryAttempts => config.retry.attempts.to_string(),
            Self::RetryDelayMs => config.retry.delay_ms.to_string(),
            Self::RetryExponential => config.retry.exponential.to_string(),
            Self::StorageAssetsDir => config.storage.assets_dir.display().to_string(),
        }
    }

    /// Parse `value` and store it in `config`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            Self::CdnBaseUrl => config.cdn.base_url = self.non_empty(value)?,
            Self::CdnTimeout => config.cdn.timeout = self.number(value)?,
            Self::CdnMaxConnections => config.cdn.max_connections = self.number(value)?,
            Self::SelectionAndroid => config.selection.android = self.non_empty(value)?,
            Self::SelectionIos => config.selection.ios = self.non_empty(value)?,
            Self::SelectionLocale => config.selection.locale = self.non_empty(value)?,
            Self::SelectionDownloadAll => config.selection.download_all = self.boolean(value)?,
            Self::RetryAttempts => config.retry.attempts = self.number(value)?,
            Self::RetryDelayMs => config.retry.delay_ms = self.number(value)?,
            Self::RetryExponential => config.retry.exponential = self.boolean(value)?,
            Self::StorageAssetsDir => {
                config.storage.assets_dir = PathBuf::from(self.non_empty(value)?)
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, expected: &'static str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            expected,
        }
    }

    fn non_empty(&self, value: &str) -> Result<String, ConfigError> {
        if value.is_empty() {
            return Err(self.invalid(value, "a non-empty value"));
        }
        Ok(value.to_string())
    }

    fn number<T: FromStr>(&self, value: &str) -> Result<T, ConfigError> {
        value
            .parse()
            .map_err(|_| self.invalid(value, "a non-negative integer"))
    }

    fn boolean(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "true or false")),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
