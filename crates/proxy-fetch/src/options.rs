use crate::cache::ImageCache;
use crate::fetcher::{DEFAULT_WORKERS, Fetcher};
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, Transport};
use crate::types::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Settings for the image acquisition pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Shared, persistent image cache directory
    pub cache_dir: PathBuf,
    /// Requests allowed per `rate_window`
    pub rate_limit: usize,
    pub rate_window: Duration,
    /// Concurrent fetch workers
    pub workers: usize,
    pub retry: RetryPolicy,
    pub http_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("card_images"),
            rate_limit: 10,
            rate_window: Duration::from_secs(1),
            workers: DEFAULT_WORKERS,
            retry: RetryPolicy::default(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl FetchOptions {
    /// Build a fetcher over an arbitrary transport
    pub async fn build_with(&self, transport: Arc<dyn Transport>) -> Result<Fetcher> {
        let cache = ImageCache::open(&self.cache_dir).await?;
        let limiter = Arc::new(RateLimiter::new(self.rate_limit, self.rate_window));
        Ok(Fetcher::with_policy(
            transport,
            cache,
            limiter,
            self.retry.clone(),
            self.workers,
        ))
    }

    /// Build a fetcher over HTTP
    pub async fn build(&self) -> Result<Fetcher> {
        let transport = HttpTransport::new(self.http_timeout)?;
        self.build_with(Arc::new(transport)).await
    }
}
