//! Snapshot document fetcher
//!
//! Retrieves one publisher document per call with bounded retry and
//! exponential backoff. A 404-equivalent response is a terminal "not
//! available" signal (the batch probe uses it to detect the end of a
//! numbered sequence); any other failure is transient and retried.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use tally_common::config::FetchConfig;
use tally_common::{Error, Result};

const USER_AGENT: &str = concat!("tally-collector/", env!("CARGO_PKG_VERSION"));

/// Per-attempt failure classification.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The publisher reports the resource does not exist.
    #[error("resource absent")]
    Absent,

    /// Network-level failure worth retrying (timeout, reset, 5xx).
    #[error("transient failure: {0}")]
    Transient(String),
}

/// One HTTP round trip. The seam exists so retry behavior can be
/// exercised with a scripted transport in tests.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = std::result::Result<String, TransportError>> + Send;
}

/// reqwest-backed transport with a per-attempt timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> std::result::Result<String, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Transient(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::Absent);
        }
        if !status.is_success() {
            return Err(TransportError::Transient(format!("status {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| TransportError::Transient(e.to_string()))
    }
}

/// Snapshot fetcher with retry policy. Knows nothing about document
/// content; it hands back raw text or reports the document unavailable.
pub struct SnapshotFetcher<T: Transport> {
    transport: T,
    max_attempts: u32,
    base_delay: Duration,
}

impl SnapshotFetcher<HttpTransport> {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let transport = HttpTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_transport(
            transport,
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
        ))
    }
}

impl<T: Transport> SnapshotFetcher<T> {
    pub fn with_transport(transport: T, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            transport,
            max_attempts,
            base_delay,
        }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch one document. `None` means the document is not available this
    /// tick: either the publisher reports it absent, or every attempt
    /// failed transiently.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        for attempt in 0..self.max_attempts {
            match self.transport.get(url).await {
                Ok(content) => return Some(content),
                Err(TransportError::Absent) => {
                    tracing::debug!(url, "document not available");
                    return None;
                }
                Err(TransportError::Transient(reason)) => {
                    tracing::warn!(
                        url,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        %reason,
                        "fetch attempt failed"
                    );
                    if attempt + 1 < self.max_attempts {
                        tokio::time::sleep(self.base_delay * 2u32.pow(attempt)).await;
                    }
                }
            }
        }

        tracing::error!(url, attempts = self.max_attempts, "giving up on document");
        None
    }
}
