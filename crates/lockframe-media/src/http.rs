//! HTTP blob source.
//!
//! Thin reqwest wrapper: one GET per call, 2xx required, optional body size
//! cap. Redirects, TLS and connection pooling are reqwest's defaults.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::{error::FetchError, fetcher::BlobSource};

/// HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Whole-request timeout (connect + headers + body)
    pub timeout: Duration,
    /// Reject bodies larger than this many bytes
    pub max_body_bytes: Option<usize>,
    /// `User-Agent` header value
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_body_bytes: Some(16 * 1024 * 1024),
            user_agent: concat!("lockframe-media/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// [`BlobSource`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpBlobSource {
    client: Client,
    max_body_bytes: Option<usize>,
}

impl HttpBlobSource {
    /// Build a source from `config`.
    ///
    /// # Errors
    ///
    /// `FetchError::Transport` if the TLS backend cannot be initialized.
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Transport(format!("http client setup failed: {e}")))?;

        Ok(Self { client, max_body_bytes: config.max_body_bytes })
    }

}

#[async_trait]
impl BlobSource for HttpBlobSource {
    async fn get(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("request failed: {e}")))?;

        check_status(response.status())?;
        check_body_size(response.content_length(), self.max_body_bytes)?;

        let mut body = BodyBuffer::new(self.max_body_bytes);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Transport(format!("body read failed: {e}")))?
        {
            body.push(&chunk)?;
        }

        Ok(body.into_bytes())
    }
}

/// Body accumulator that stops as soon as the size cap is crossed.
///
/// The cap applies to bytes received, not to `Content-Length`, which chunked
/// responses omit.
struct BodyBuffer {
    bytes: Vec<u8>,
    limit: Option<usize>,
}

impl BodyBuffer {
    fn new(limit: Option<usize>) -> Self {
        Self { bytes: Vec::new(), limit }
    }

    fn push(&mut self, chunk: &[u8]) -> Result<(), FetchError> {
        let received = self.bytes.len() + chunk.len();
        check_body_size(Some(received as u64), self.limit)?;
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn check_status(status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() { Ok(()) } else { Err(FetchError::UnexpectedStatus(status.as_u16())) }
}

fn check_body_size(length: Option<u64>, limit: Option<usize>) -> Result<(), FetchError> {
    match (length, limit) {
        (Some(length), Some(limit)) if length > limit as u64 => Err(FetchError::Transport(
            format!("body of {length} bytes exceeds limit of {limit} bytes"),
        )),
        _ => Ok(()),
    }
}
