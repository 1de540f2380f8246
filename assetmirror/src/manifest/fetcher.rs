//! Retrieval of the currently published manifest.

use tracing::{debug, info};

use super::token::decode_payload;
use super::AssetManifest;
use crate::error::{SyncError, SyncResult};
use crate::http::{join_url, AsyncHttpClient};

/// Route of the manifest token relative to the CDN base URL.
pub const MANIFEST_ROUTE: &str = "AssetManifest.jwt";

/// Result of fetching the published manifest.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The decoded payload is byte-identical to the stored baseline.
    Unchanged,

    /// A new manifest was published.
    Updated {
        /// Decoded JSON payload, persisted after the run.
        raw: Vec<u8>,
        manifest: AssetManifest,
    },
}

/// Fetches and decodes the manifest token from the CDN.
pub struct ManifestFetcher<C: AsyncHttpClient> {
    client: C,
    base_url: String,
}

impl<C: AsyncHttpClient> ManifestFetcher<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Full URL of the manifest token.
    pub fn url(&self) -> String {
        join_url(&self.base_url, MANIFEST_ROUTE)
    }

    /// Fetch the published manifest and compare it with `baseline`.
    ///
    /// Unchanged content is reported before parsing; transport, decoding
    /// and parse failures are fatal.
    pub async fn fetch(&self, baseline: &[u8]) -> SyncResult<FetchOutcome> {
        let url = self.url();
        debug!(url = %url, "Fetching asset manifest");

        let token = self
            .client
            .get(&url)
            .await
            .map_err(SyncError::ManifestFetch)?;
        let raw = decode_payload(&token)?;

        if raw == baseline {
            info!("Manifest has not changed");
            return Ok(FetchOutcome::Unchanged);
        }

        let manifest = AssetManifest::from_json(&raw).map_err(SyncError::ManifestParse)?;
        info!(
            bytes = raw.len(),
            assets = manifest.asset_count(),
            "Fetched new asset manifest"
        );
        Ok(FetchOutcome::Updated { raw, manifest })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;
    use crate::http::HttpError;
    use crate::manifest::Dimension;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    const BASE: &str = "https://cdn.example.com/assets/";
    const PAYLOAD: &[u8] = br#"{"RemoteAssets":{"Localizations":{"en":{"texts.csv":"h1"}}}}"#;

    fn token(payload: &[u8]) -> String {
        format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    fn manifest_url() -> String {
        format!("{}{}", BASE, MANIFEST_ROUTE)
    }

    #[tokio::test]
    async fn test_fetch_updated() {
        let client = MockHttpClient::new().with_body(&manifest_url(), token(PAYLOAD));
        let fetcher = ManifestFetcher::new(client, BASE);

        match fetcher.fetch(b"{}").await.unwrap() {
            FetchOutcome::Updated { raw, manifest } => {
                assert_eq!(raw, PAYLOAD);
                assert_eq!(
                    manifest.categories(Dimension::Localizations)["en"]["texts.csv"],
                    "h1"
                );
            }
            FetchOutcome::Unchanged => panic!("Expected Updated"),
        }
    }

    #[tokio::test]
    async fn test_fetch_unchanged() {
        let client = MockHttpClient::new().with_body(&manifest_url(), token(PAYLOAD));
        let fetcher = ManifestFetcher::new(client, BASE);

        let outcome = fetcher.fetch(PAYLOAD).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Unchanged));
    }

    #[tokio::test]
    async fn test_fetch_unchanged_skips_parsing() {
        // Identical bytes are reported as unchanged even if they would not parse
        let payload = b"not json at all";
        let client = MockHttpClient::new().with_body(&manifest_url(), token(payload));
        let fetcher = ManifestFetcher::new(client, BASE);

        assert!(matches!(
            fetcher.fetch(payload).await.unwrap(),
            FetchOutcome::Unchanged
        ));
    }

    #[tokio::test]
    async fn test_fetch_transport_error() {
        let client = MockHttpClient::new().with_error(
            &manifest_url(),
            HttpError::Request {
                url: manifest_url(),
                reason: "Connection refused".to_string(),
            },
        );
        let fetcher = ManifestFetcher::new(client, BASE);

        let err = fetcher.fetch(b"").await.unwrap_err();
        assert!(matches!(err, SyncError::ManifestFetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_malformed_token() {
        let client = MockHttpClient::new().with_body(&manifest_url(), "garbage");
        let fetcher = ManifestFetcher::new(client, BASE);

        let err = fetcher.fetch(b"").await.unwrap_err();
        assert!(matches!(err, SyncError::ManifestToken(_)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_json() {
        let client = MockHttpClient::new().with_body(&manifest_url(), token(b"[1, 2"));
        let fetcher = ManifestFetcher::new(client, BASE);

        let err = fetcher.fetch(b"").await.unwrap_err();
        assert!(matches!(err, SyncError::ManifestParse(_)));
    }

    #[test]
    fn test_url_without_trailing_slash() {
        let fetcher = ManifestFetcher::new(MockHttpClient::new(), "https://cdn.example.com/assets");
        assert_eq!(fetcher.url(), "https://cdn.example.com/assets/AssetManifest.jwt");
    }
}
