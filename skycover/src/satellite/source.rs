//! Element-set sources.
//!
//! The catalog does not care where element-set text comes from. The
//! [`ElementSetSource`] trait abstracts the fetch so tests can inject canned
//! text or failures, and so the CLI can read a local file instead of the
//! network.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::cache::BoxFuture;

/// Default element-set feed (Starlink group, TLE format).
pub const DEFAULT_ELEMENTS_URL: &str =
    "https://celestrak.org/NORAD/elements/gp.php?GROUP=starlink&FORMAT=tle";

/// Default HTTP timeout for element-set downloads (in seconds).
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Some feeds answer 403 to clients without a browser-like agent.
const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; skycover/", env!("CARGO_PKG_VERSION"), ")");

/// Errors fetching element-set text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to read element sets: {0}")]
    Read(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of raw element-set text.
pub trait ElementSetSource: Send + Sync {
    /// Fetch the full element-set document.
    fn fetch(&self) -> BoxFuture<'_, Result<String, FetchError>>;

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}

/// Element-set source that downloads over HTTP(S).
pub struct HttpElementSource {
    client: reqwest::Client,
    url: String,
}

impl HttpElementSource {
    /// Create a source for `url` with the default timeout.
    pub fn new(url: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    /// Create a source for `url` with a custom request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl ElementSetSource for HttpElementSource {
    fn fetch(&self) -> BoxFuture<'_, Result<String, FetchError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(FetchError::Status {
                    status: response.status().as_u16(),
                    url: self.url.clone(),
                });
            }

            response
                .text()
                .await
                .map_err(|e| FetchError::Read(format!("Failed to read response: {}", e)))
        })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Element-set source reading a local file on every fetch.
pub struct FileElementSource {
    path: PathBuf,
}

impl FileElementSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ElementSetSource for FileElementSource {
    fn fetch(&self) -> BoxFuture<'_, Result<String, FetchError>> {
        Box::pin(async move {
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| FetchError::Read(format!("{}: {}", self.path.display(), e)))
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Element-set source returning a fixed response.
///
/// Counts fetches so tests can assert on refetch behavior.
pub struct StaticElementSource {
    response: Result<String, FetchError>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl StaticElementSource {
    /// Source that always returns `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Source that always fails with `error`.
    pub fn failing(error: FetchError) -> Self {
        Self {
            response: Err(error),
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Wait `delay` before answering each fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches performed so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ElementSetSource for StaticElementSource {
    fn fetch(&self) -> BoxFuture<'_, Result<String, FetchError>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.response.clone()
        })
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}
