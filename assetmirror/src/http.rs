//! HTTP client abstraction for testability
//!
//! The manifest fetcher and the asset fetcher only need "GET this URL and
//! give me the decompressed body". [`ReqwestClient`] is the production
//! implementation; tests substitute the mock in [`tests::MockHttpClient`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Default timeout for a single HTTP request in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default cap on simultaneous in-flight requests.
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Errors returned by an [`AsyncHttpClient`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HttpError {
    /// The client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The request could not be sent or no response was received.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The body could not be read or decompressed.
    #[error("failed to read response from {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Join a base URL and a relative route with exactly one `/` between them.
pub fn join_url(base: &str, route: &str) -> String {
    let route = route.trim_start_matches('/');
    if base.ends_with('/') {
        format!("{}{}", base, route)
    } else {
        format!("{}/{}", base, route)
    }
}

/// Trait for async HTTP GET requests.
///
/// Implementations return the response body with any content encoding
/// already removed.
pub trait AsyncHttpClient: Send + Sync + 'static {
    /// Performs an HTTP GET request.
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes, HttpError>> + Send;
}

impl<C: AsyncHttpClient> AsyncHttpClient for Arc<C> {
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes, HttpError>> + Send {
        (**self).get(url)
    }
}

/// Real HTTP client implementation using reqwest.
///
/// The client advertises `gzip, deflate, br` and transparently decompresses
/// responses. In-flight requests are capped by a semaphore so that an
/// unbounded fan-out of download tasks cannot open unbounded connections.
#[derive(Debug)]
pub struct ReqwestClient {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
    max_connections: usize,
    timeout: Duration,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_settings(
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_MAX_CONNECTIONS,
        )
    }

    /// Creates a new ReqwestClient with a custom timeout and connection cap.
    ///
    /// A cap of zero is raised to one.
    pub fn with_settings(timeout: Duration, max_connections: usize) -> Result<Self, HttpError> {
        let max_connections = max_connections.max(1);

        // Setting Accept-Encoding by hand would disable reqwest's automatic
        // decompression, so the header is left to the enabled codecs.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(max_connections)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .map_err(|e| HttpError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            timeout,
        })
    }

    /// Maximum number of simultaneous requests.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Bytes, HttpError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| HttpError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                HttpError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|e| HttpError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Mock HTTP client for testing.
    ///
    /// Serves canned responses per URL; unknown URLs answer 404. Every call
    /// is recorded.
    #[derive(Default)]
    pub struct MockHttpClient {
        responses: HashMap<String, Result<Bytes, HttpError>>,
        requests: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_body(mut self, url: &str, body: impl Into<Bytes>) -> Self {
            self.responses.insert(url.to_string(), Ok(body.into()));
            self
        }

        pub fn with_error(mut self, url: &str, error: HttpError) -> Self {
            self.responses.insert(url.to_string(), Err(error));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl AsyncHttpClient for MockHttpClient {
        async fn get(&self, url: &str) -> Result<Bytes, HttpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .unwrap_or_else(|| {
                    Err(HttpError::Status {
                        url: url.to_string(),
                        status: 404,
                    })
                })
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockHttpClient::new().with_body("http://example.com/a", vec![1, 2, 3, 4]);

        let result = mock.get("http://example.com/a").await;
        assert_eq!(result.unwrap(), Bytes::from(vec![1, 2, 3, 4]));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_client_unknown_url() {
        let mock = MockHttpClient::new();

        let result = mock.get("http://example.com/missing").await;
        assert!(matches!(result, Err(HttpError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_arc_client_delegates() {
        let mock = Arc::new(MockHttpClient::new().with_body("http://x/", "ok"));
        let shared = Arc::clone(&mock);

        assert_eq!(shared.get("http://x/").await.unwrap(), Bytes::from("ok"));
        assert_eq!(mock.calls(), 1);
    }

    #[test]
    fn test_reqwest_client_settings() {
        let client = ReqwestClient::with_settings(Duration::from_secs(5), 0).unwrap();
        assert_eq!(client.max_connections(), 1);
        assert_eq!(client.timeout(), Duration::from_secs(5));

        let client = ReqwestClient::new().unwrap();
        assert_eq!(client.max_connections(), DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://cdn/assets/", "a/b"), "https://cdn/assets/a/b");
        assert_eq!(join_url("https://cdn/assets", "a/b"), "https://cdn/assets/a/b");
        assert_eq!(join_url("https://cdn/assets/", "/a"), "https://cdn/assets/a");
    }

    #[test]
    fn test_http_error_display() {
        let err = HttpError::Status {
            url: "http://cdn/a".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "HTTP 503 from http://cdn/a");
    }

    // ========================================================================
    // ReqwestClient against a local listener
    // ========================================================================

    /// `hello`, gzip-compressed.
    const HELLO_GZIP: [u8; 25] = [
        0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0xff, 0xcb, 0x48, 0xcd, 0xc9, 0xc9,
        0x07, 0x00, 0x86, 0xa6, 0x10, 0x36, 0x05, 0x00, 0x00, 0x00,
    ];

    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (listener, base)
    }

    /// Reads one request head and returns it.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before request head");
            head.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&head).into_owned()
    }

    async fn respond(stream: &mut TcpStream, status: &str, headers: &[&str], body: &[u8]) {
        let mut response = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\n", status, body.len());
        for header in headers {
            response.push_str(header);
            response.push_str("\r\n");
        }
        response.push_str("Connection: close\r\n\r\n");
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.write_all(body).await.unwrap();
        stream.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_reqwest_client_decodes_gzip() {
        let (listener, base) = listen().await;
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            respond(&mut stream, "200 OK", &["Content-Encoding: gzip"], &HELLO_GZIP).await;
            request
        });

        let client = ReqwestClient::with_settings(Duration::from_secs(5), 4).unwrap();
        let body = client.get(&join_url(&base, "AssetManifest.jwt")).await;

        assert_eq!(body.unwrap(), Bytes::from_static(b"hello"));

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /assetmanifest.jwt "));
        let accept = request
            .lines()
            .find(|line| line.starts_with("accept-encoding:"))
            .expect("accept-encoding header sent");
        for codec in ["gzip", "deflate", "br"] {
            assert!(accept.contains(codec), "{} missing from {}", codec, accept);
        }
    }

    #[tokio::test]
    async fn test_reqwest_client_maps_error_status() {
        let (listener, base) = listen().await;
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            respond(&mut stream, "503 Service Unavailable", &[], b"busy").await;
        });

        let client = ReqwestClient::with_settings(Duration::from_secs(5), 4).unwrap();
        let url = join_url(&base, "a.png");
        let result = client.get(&url).await;

        assert_eq!(result, Err(HttpError::Status { url, status: 503 }));
    }

    #[tokio::test]
    async fn test_reqwest_client_caps_connections() {
        let (listener, base) = listen().await;
        let client = Arc::new(ReqwestClient::with_settings(Duration::from_secs(5), 1).unwrap());

        let first = {
            let client = Arc::clone(&client);
            let url = join_url(&base, "first");
            tokio::spawn(async move { client.get(&url).await })
        };
        let (mut stream, _) = listener.accept().await.unwrap();
        assert!(read_request(&mut stream).await.starts_with("GET /first "));

        let second = {
            let client = Arc::clone(&client);
            let url = join_url(&base, "second");
            tokio::spawn(async move { client.get(&url).await })
        };

        // The only permit is held until the first body has been read
        let early = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(early.is_err(), "second request connected while the first was in flight");

        respond(&mut stream, "200 OK", &[], b"one").await;
        drop(stream);
        assert_eq!(first.await.unwrap().unwrap(), Bytes::from_static(b"one"));

        let (mut stream, _) = listener.accept().await.unwrap();
        assert!(read_request(&mut stream).await.starts_with("GET /second "));
        respond(&mut stream, "200 OK", &[], b"two").await;
        assert_eq!(second.await.unwrap().unwrap(), Bytes::from_static(b"two"));
    }
}
