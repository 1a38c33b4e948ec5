//! Fetch orchestration: cache lookup, rate limiting, retry and re-sequencing

use crate::cache::ImageCache;
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::scryfall::{ImageVersion, image_url};
use crate::transport::{Transport, TransportError};
use crate::types::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default number of concurrent fetch workers
pub const DEFAULT_WORKERS: usize = 4;

/// Progress callback: `(completed, total)`
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Cards resolved to local images, in decklist order
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub cards: Vec<ResolvedCard>,
    pub warnings: Vec<String>,
}

impl Resolution {
    pub fn double_faced_count(&self) -> usize {
        self.cards.iter().filter(|c| c.is_double_faced).count()
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    cache: ImageCache,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    workers: usize,
    key_locks: Mutex<HashMap<ImageKey, KeyMutex>>,
}

/// Resolves card faces to cached image files.
///
/// Cheap to clone; clones share the cache, the rate limiter and the
/// fetched-this-run set. [`Fetcher::fork`] shares everything except that set.
#[derive(Clone)]
pub struct Fetcher {
    inner: Arc<Inner>,
    fetched_this_run: Arc<Mutex<BTreeSet<ImageKey>>>,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, cache: ImageCache, limiter: Arc<RateLimiter>) -> Self {
        Self::with_policy(transport, cache, limiter, RetryPolicy::default(), DEFAULT_WORKERS)
    }

    pub fn with_policy(
        transport: Arc<dyn Transport>,
        cache: ImageCache,
        limiter: Arc<RateLimiter>,
        policy: RetryPolicy,
        workers: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                cache,
                limiter,
                policy,
                workers: workers.max(1),
                key_locks: Mutex::new(HashMap::new()),
            }),
            fetched_this_run: Arc::default(),
        }
    }

    /// A fetcher over the same cache and rate limiter that tracks its own
    /// downloads, so one job's purge never touches another's images
    pub fn fork(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            fetched_this_run: Arc::default(),
        }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.inner.cache
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.inner.transport.clone()
    }

    /// Resolve one face of one card
    pub async fn fetch_face(&self, card: &CardEntry, face: Face) -> FetchOutcome {
        if face == Face::Back && card.is_double_faced == Some(false) {
            return FetchOutcome::Absent;
        }

        let Some(key) = card.image_key(face) else {
            return FetchOutcome::Missing(format!("{}: no card identifier", card.name));
        };
        let url = match image_url(card, face, ImageVersion::Png) {
            Ok(url) => url,
            Err(e) => return FetchOutcome::Missing(e.to_string()),
        };

        // Concurrent requests for the same key wait here; the loser finds
        // the winner's file in the cache.
        let lease = self.key_lock(&key);
        let _guard = lease.lock.lock().await;

        if let Some(path) = self.inner.cache.get(&key).await {
            return FetchOutcome::Cached(path);
        }

        self.download(&key, &url, &card.name).await
    }

    async fn download(&self, key: &ImageKey, url: &str, name: &str) -> FetchOutcome {
        let policy = &self.inner.policy;
        let mut last_error = String::new();

        for attempt in 0..policy.total_attempts() {
            if attempt > 0 {
                log::debug!("Retrying {name} ({}), attempt {}", key.face().name(), attempt + 1);
            }
            self.inner.limiter.acquire().await;

            let wait = match self.inner.transport.get(url).await {
                Ok(bytes) => match self.inner.cache.put(key, &bytes).await {
                    Ok(path) => {
                        self.record_fetched(key);
                        return FetchOutcome::Fetched(path);
                    }
                    Err(e) => {
                        log::warn!("Could not store {name}: {e}");
                        last_error = e.to_string();
                        policy.delay(attempt)
                    }
                },
                Err(TransportError::NotFound(_)) => return FetchOutcome::Absent,
                Err(e) if !e.is_retryable() => {
                    log::warn!("Failed to download {url}: {e}");
                    last_error = e.to_string();
                    break;
                }
                Err(TransportError::RateLimited) => {
                    log::warn!(
                        "Rate limited (429). Backing off for {:?}...",
                        policy.rate_limited_delay
                    );
                    last_error = TransportError::RateLimited.to_string();
                    policy.rate_limited_delay
                }
                Err(e) => {
                    log::warn!("Failed to download {url}: {e}");
                    last_error = e.to_string();
                    policy.delay(attempt)
                }
            };

            if attempt + 1 < policy.total_attempts() {
                tokio::time::sleep(wait).await;
            }
        }

        FetchOutcome::Missing(format!(
            "{name} ({} face): {}",
            key.face().name(),
            FetchError::NetworkFailure(last_error)
        ))
    }

    /// Resolve `face` for every card, preserving input order.
    ///
    /// Identical keys are fetched once; results are re-sequenced so output
    /// index `i` always belongs to `cards[i]`.
    pub async fn fetch_all(
        &self,
        cards: &[CardEntry],
        face: Face,
        progress: ProgressFn<'_>,
    ) -> Vec<FetchOutcome> {
        let (unique, job_of_card) = plan_jobs(cards, face);

        let total = unique.len();
        let semaphore = Arc::new(Semaphore::new(self.inner.workers));
        let mut tasks = JoinSet::new();
        for (job, card) in unique.into_iter().enumerate() {
            let fetcher = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => fetcher.fetch_face(&card, face).await,
                    Err(_) => FetchOutcome::Missing("worker pool closed".to_string()),
                };
                (job, outcome)
            });
        }

        let mut results: Vec<Option<FetchOutcome>> = vec![None; total];
        let mut completed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((job, outcome)) => results[job] = Some(outcome),
                Err(e) => log::error!("Fetch worker failed: {e}"),
            }
            completed += 1;
            progress(completed, total);
        }

        job_of_card
            .into_iter()
            .map(|job| {
                results[job]
                    .clone()
                    .unwrap_or_else(|| FetchOutcome::Missing("fetch worker failed".to_string()))
            })
            .collect()
    }

    /// Resolve fronts (and backs, when `with_backs`) for a decklist.
    ///
    /// A card is double-faced when its source says so or when a back image
    /// exists upstream.
    pub async fn resolve(
        &self,
        cards: &[CardEntry],
        with_backs: bool,
        progress: ProgressFn<'_>,
    ) -> Resolution {
        let mut warnings = Vec::new();
        // Progress counts fetch jobs, so duplicates count once per face
        let front_jobs = plan_jobs(cards, Face::Front).0.len();
        let back_jobs = if with_backs {
            plan_jobs(cards, Face::Back).0.len()
        } else {
            0
        };
        let total_jobs = front_jobs + back_jobs;

        let fronts = self
            .fetch_all(cards, Face::Front, &|done, _| progress(done, total_jobs))
            .await;

        let backs = if with_backs {
            self.fetch_all(cards, Face::Back, &|done, _| {
                progress(front_jobs + done, total_jobs)
            })
            .await
        } else {
            vec![FetchOutcome::Absent; cards.len()]
        };

        let mut resolved = Vec::with_capacity(cards.len());
        for ((card, front), back) in cards.iter().zip(fronts).zip(backs) {
            if let FetchOutcome::Missing(reason) = &front {
                warnings.push(format!("Missing front image: {reason}"));
            }
            let is_double_faced = match (&back, card.is_double_faced) {
                (_, Some(hint)) => hint,
                (FetchOutcome::Cached(_) | FetchOutcome::Fetched(_), None) => true,
                (FetchOutcome::Missing(reason), None) => {
                    warnings.push(format!(
                        "Could not check back face, treating as single-faced: {reason}"
                    ));
                    false
                }
                (FetchOutcome::Absent, None) => false,
            };
            if let (true, FetchOutcome::Missing(reason)) = (is_double_faced, &back) {
                warnings.push(format!("Missing back image: {reason}"));
            }

            resolved.push(ResolvedCard {
                entry: card.clone(),
                front: front.into_path(),
                back: back.into_path(),
                is_double_faced,
            });
        }

        for warning in &warnings {
            log::warn!("{warning}");
        }

        Resolution {
            cards: resolved,
            warnings,
        }
    }

    /// Keys downloaded (not served from cache) by this fetcher
    pub fn fetched_this_run(&self) -> Vec<ImageKey> {
        self.lock_fetched().iter().cloned().collect()
    }

    /// Delete only the images this fetcher downloaded
    pub async fn purge_new(&self) -> Result<usize> {
        let keys = self.fetched_this_run();
        let removed = self.inner.cache.purge(&keys).await?;
        self.lock_fetched().clear();
        Ok(removed)
    }

    fn record_fetched(&self, key: &ImageKey) {
        self.lock_fetched().insert(key.clone());
    }

    fn lock_fetched(&self) -> std::sync::MutexGuard<'_, BTreeSet<ImageKey>> {
        self.fetched_this_run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn key_lock(&self, key: &ImageKey) -> KeyLease<'_> {
        let lock = self.lock_key_locks().entry(key.clone()).or_default().clone();
        KeyLease {
            fetcher: self,
            key: key.clone(),
            lock,
        }
    }

    /// Keys with a fetch in flight or waiting on one
    pub fn pending_key_locks(&self) -> usize {
        self.lock_key_locks().len()
    }

    fn lock_key_locks(&self) -> std::sync::MutexGuard<'_, HashMap<ImageKey, KeyMutex>> {
        self.inner
            .key_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

type KeyMutex = Arc<tokio::sync::Mutex<()>>;

/// A per-key lock that leaves the shared map once its last holder is done
struct KeyLease<'a> {
    fetcher: &'a Fetcher,
    key: ImageKey,
    lock: KeyMutex,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.fetcher.lock_key_locks();
        // Clones are only taken under the map lock, so two owners means
        // the map and this lease
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

/// Map each card to a unique job; cards without a key get their own.
/// Returns the job cards and, per input card, its job index.
fn plan_jobs(cards: &[CardEntry], face: Face) -> (Vec<CardEntry>, Vec<usize>) {
    let mut unique: Vec<CardEntry> = Vec::new();
    let mut by_key: HashMap<ImageKey, usize> = HashMap::new();
    let mut job_of_card = Vec::with_capacity(cards.len());
    for card in cards {
        let job = match card.image_key(face) {
            Some(key) => *by_key.entry(key).or_insert_with(|| {
                unique.push(card.clone());
                unique.len() - 1
            }),
            None => {
                unique.push(card.clone());
                unique.len() - 1
            }
        };
        job_of_card.push(job);
    }
    (unique, job_of_card)
}
