//! Network seam for image and deck downloads
//!
//! Everything that talks HTTP goes through [`Transport`], so the fetch
//! pipeline can be driven by an in-memory fake in tests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = concat!("mtg-proxy-sheets/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// 404/422: the resource does not exist (no back face, unknown card)
    #[error("not found (status {0})")]
    NotFound(u16),
    #[error("rate limited by server")]
    RateLimited,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Client errors other than 429 will not change on a second attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::NotFound(_) => false,
            TransportError::Status(code) => !(400..500).contains(code),
            TransportError::RateLimited | TransportError::Request(_) => true,
        }
    }
}

/// Fetches raw bytes for a URL
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError>;
}

/// `reqwest`-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_user_agent(timeout, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .bytes()
                .await
                .map_err(|e| TransportError::Request(e.to_string())),
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(TransportError::NotFound(response.status().as_u16()))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(TransportError::RateLimited),
            other => Err(TransportError::Status(other.as_u16())),
        }
    }
}
