//! Error types for a synchronization run.
//!
//! Only run-level (fatal) failures live here. Failures of a single asset
//! download are [`crate::download::FetchError`]s and never abort a run.

use std::io;
use std::path::PathBuf;

use crate::http::HttpError;
use crate::manifest::TokenError;

/// Result type for run-level operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a synchronization run.
#[derive(Debug)]
pub enum SyncError {
    /// Failed to read the stored baseline manifest.
    BaselineRead { path: PathBuf, source: io::Error },

    /// The stored baseline manifest is not valid JSON.
    BaselineParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to build the HTTP client.
    HttpClient(HttpError),

    /// Failed to fetch the current manifest token.
    ManifestFetch(HttpError),

    /// The manifest token could not be decoded.
    ManifestToken(TokenError),

    /// The decoded manifest payload is not valid JSON.
    ManifestParse(serde_json::Error),

    /// Failed to persist the new manifest.
    ManifestSave { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BaselineRead { path, source } => {
                write!(
                    f,
                    "cannot load previous manifest {}: {}",
                    path.display(),
                    source
                )
            }
            Self::BaselineParse { path, source } => {
                write!(
                    f,
                    "cannot parse previous manifest {}: {}",
                    path.display(),
                    source
                )
            }
            Self::HttpClient(e) => write!(f, "failed to create HTTP client: {}", e),
            Self::ManifestFetch(e) => write!(f, "cannot fetch asset manifest: {}", e),
            Self::ManifestToken(e) => write!(f, "cannot decode asset manifest: {}", e),
            Self::ManifestParse(e) => write!(f, "cannot parse asset manifest: {}", e),
            Self::ManifestSave { path, source } => {
                write!(
                    f,
                    "cannot save new manifest {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BaselineRead { source, .. } => Some(source),
            Self::BaselineParse { source, .. } => Some(source),
            Self::HttpClient(e) => Some(e),
            Self::ManifestFetch(e) => Some(e),
            Self::ManifestToken(e) => Some(e),
            Self::ManifestParse(e) => Some(e),
            Self::ManifestSave { source, .. } => Some(source),
        }
    }
}

impl From<TokenError> for SyncError {
    fn from(e: TokenError) -> Self {
        SyncError::ManifestToken(e)
    }
}
