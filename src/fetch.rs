//! Feed fetching over HTTP
//!
//! The [`Fetch`] trait is the pipeline's only network seam; [`HttpFetcher`] is the
//! reqwest-backed implementation, and tests substitute their own.

use crate::config::FetchConfig;
use crate::error::{Error, FetchError, Result};
use async_trait::async_trait;

/// Retrieves raw feed bytes from a source URL
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch the document at `url`, enforcing the configured timeout
    ///
    /// A non-success HTTP status is an error; transient classification is the
    /// caller's concern (see [`crate::retry::IsRetryable`]).
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP fetcher backed by a shared reqwest client
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the configured timeout and user agent
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!(url = url, "Fetching feed");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Fetch(FetchError::Timeout { url: url.to_string() })
            } else {
                Error::Fetch(FetchError::Request {
                    url: url.to_string(),
                    source: e,
                })
            }
        })?;

        // Check HTTP status before trying to read the response body
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }

        let content = response.text().await.map_err(|e| {
            Error::Fetch(FetchError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })
        })?;

        tracing::debug!(url = url, bytes = content.len(), "Feed fetched");
        Ok(content)
    }
}
