//! Card image acquisition: deck sources, a rate-limited fetch pipeline and a
//! persistent on-disk image cache.

mod cache;
pub mod deck;
mod fetcher;
mod options;
mod rate_limiter;
mod retry;
mod scryfall;
mod transport;
mod types;

pub use cache::{CacheRecord, ImageCache};
pub use fetcher::{DEFAULT_WORKERS, Fetcher, ProgressFn, Resolution};
pub use options::FetchOptions;
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use scryfall::{ImageVersion, image_url};
pub use transport::{HttpTransport, Transport, TransportError};
pub use types::*;
