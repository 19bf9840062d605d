use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bilancio_core::{CacheConfig, LoadError, ResourceKey, TabularDataset};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;

type LoadOutcome = Result<Arc<TabularDataset>, LoadError>;
type InFlight = Shared<BoxFuture<'static, LoadOutcome>>;

/// Lifecycle state of a cache entry as observed by [`ResourceCache::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// Loaded successfully and within its TTL.
    Fresh,
    /// Past its TTL with no refresh running.
    Expired,
    /// A load for this key is in flight. A stale value may still be attached.
    Loading,
    /// The last load failed and the failure is still within the failure TTL.
    Failed(LoadError),
}

/// Read-only snapshot of one entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Last successfully loaded value, if any.
    pub dataset: Option<Arc<TabularDataset>>,
    /// When the stored outcome landed; `None` while only a first load is in flight.
    pub loaded_at: Option<Instant>,
    /// TTL the stored outcome was written with.
    pub ttl: Duration,
    /// Current lifecycle state.
    pub status: EntryStatus,
}

/// Value handed back by [`ResourceCache::get_or_load`].
#[derive(Debug, Clone)]
pub struct Fetched {
    /// The dataset.
    pub dataset: Arc<TabularDataset>,
    /// True when served from a stored entry rather than a load this call waited on.
    pub from_cache: bool,
    /// True when the value is past its TTL and a refresh is running.
    pub stale: bool,
}

/// Per-call load settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Timeout applied to the loader.
    pub timeout: Duration,
    /// Return an expired value immediately while refreshing it.
    pub serve_stale: bool,
}

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered by a fresh value.
    pub hits: u64,
    /// Calls answered by a cached failure.
    pub failure_hits: u64,
    /// Calls answered by an expired value while a refresh ran.
    pub stale_hits: u64,
    /// Calls that found nothing usable and waited on a new load.
    pub misses: u64,
    /// Calls that attached to a load another caller started.
    pub joined: u64,
    /// Loads started.
    pub loads: u64,
    /// Loads that ended in an error (including timeouts).
    pub failures: u64,
    /// Keys dropped by the capacity bound.
    pub evictions: u64,
    /// Keys dropped by explicit invalidation.
    pub invalidations: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    failure_hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            failure_hits: self.failure_hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

struct Stored {
    outcome: LoadOutcome,
    loaded_at: Instant,
    ttl: Duration,
}

impl Stored {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.loaded_at) > self.ttl
    }
}

struct Pending {
    // A load only writes back while it is still the pending load for its key.
    generation: u64,
    fut: InFlight,
}

struct State {
    // Finished outcomes, bounded by `max_entries`.
    stored: LruCache<ResourceKey, Stored>,
    // Running loads. Never evicted, so one key has at most one fetch in flight.
    pending: HashMap<ResourceKey, Pending>,
    next_generation: u64,
}

impl State {
    fn running(&self, key: &ResourceKey) -> Option<InFlight> {
        self.pending.get(key).map(|p| p.fut.clone())
    }

    fn tracked(&self) -> usize {
        self.stored.len()
            + self
                .pending
                .keys()
                .filter(|k| !self.stored.contains(*k))
                .count()
    }
}

struct Inner {
    cfg: CacheConfig,
    state: Mutex<State>,
    counters: Counters,
}

/// What a lookup under the lock decided.
enum Lookup {
    Stale(Arc<TabularDataset>),
    Wait(InFlight),
}

/// Process-wide memo of provider datasets keyed by [`ResourceKey`].
///
/// Cloning is cheap and clones share the same store. The map is guarded by
/// one async mutex that is never held across a provider call. Loads run as
/// spawned tasks, so a caller that stops waiting does not cancel the fetch;
/// its result still lands in the cache.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<Inner>,
}

impl ResourceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(cfg: CacheConfig) -> Self {
        let cap = NonZeroUsize::new(cfg.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Inner {
                cfg,
                state: Mutex::new(State {
                    stored: LruCache::new(cap),
                    pending: HashMap::new(),
                    next_generation: 0,
                }),
                counters: Counters::default(),
            }),
        }
    }

    /// Configuration the cache was built with.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.inner.cfg
    }

    /// Load settings derived from the configuration.
    #[must_use]
    pub fn default_options(&self) -> LoadOptions {
        LoadOptions {
            timeout: self.inner.cfg.fetch_timeout,
            serve_stale: self.inner.cfg.serve_stale,
        }
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot()
    }

    /// Number of keys currently tracked, including in-flight first loads.
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.tracked()
    }

    /// True when no keys are tracked.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Inspect an entry without triggering a load or touching its recency.
    pub async fn get(&self, key: &ResourceKey) -> Option<CacheEntry> {
        let now = Instant::now();
        let state = self.inner.state.lock().await;
        let loading = state.pending.contains_key(key);
        let Some(stored) = state.stored.peek(key) else {
            return loading.then(|| CacheEntry {
                dataset: None,
                loaded_at: None,
                ttl: Duration::ZERO,
                status: EntryStatus::Loading,
            });
        };
        let status = match (&stored.outcome, stored.is_expired(now)) {
            _ if loading => EntryStatus::Loading,
            (Ok(_), false) => EntryStatus::Fresh,
            (Err(e), false) => EntryStatus::Failed(e.clone()),
            (_, true) => EntryStatus::Expired,
        };
        Some(CacheEntry {
            dataset: stored.outcome.as_ref().ok().cloned(),
            loaded_at: Some(stored.loaded_at),
            ttl: stored.ttl,
            status,
        })
    }

    /// Return the cached dataset for `key`, loading it with `loader` on a miss.
    ///
    /// Uses the configured timeout and stale policy. See
    /// [`get_or_load_with`](Self::get_or_load_with).
    ///
    /// # Errors
    /// Returns the loader's error, a cached failure, or `Timeout`.
    pub async fn get_or_load<F, Fut>(&self, key: ResourceKey, loader: F) -> Result<Fetched, LoadError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<TabularDataset, LoadError>> + Send + 'static,
    {
        self.get_or_load_with(key, self.default_options(), loader)
            .await
    }

    /// Return the cached dataset for `key`, loading it with `loader` on a miss.
    ///
    /// - A fresh value, or a failure still within the failure TTL, is returned
    ///   without calling `loader`.
    /// - If a load for `key` is already in flight, this call waits on it
    ///   instead of starting another one.
    /// - Otherwise `loader` runs once, bounded by `opts.timeout`, and its
    ///   outcome is stored with the kind's TTL (or the failure TTL).
    /// - With `opts.serve_stale`, an expired value is returned at once while a
    ///   single refresh runs in the background.
    ///
    /// # Errors
    /// Returns the loader's error, a cached failure, or `Timeout`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "bilancio::cache::get_or_load",
            skip_all,
            fields(key = %key, timeout_ms = u64::try_from(opts.timeout.as_millis()).unwrap_or(u64::MAX)),
        )
    )]
    pub async fn get_or_load_with<F, Fut>(
        &self,
        key: ResourceKey,
        opts: LoadOptions,
        loader: F,
    ) -> Result<Fetched, LoadError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<TabularDataset, LoadError>> + Send + 'static,
    {
        let counters = &self.inner.counters;
        let lookup = {
            let now = Instant::now();
            let mut state = self.inner.state.lock().await;
            let mut stale = None;
            let running = state.running(&key);
            if let Some(stored) = state.stored.get(&key) {
                match (&stored.outcome, stored.is_expired(now)) {
                    (Ok(ds), false) => {
                        Counters::bump(&counters.hits);
                        return Ok(Fetched {
                            dataset: Arc::clone(ds),
                            from_cache: true,
                            stale: false,
                        });
                    }
                    (Err(e), false) if running.is_none() => {
                        Counters::bump(&counters.failure_hits);
                        return Err(e.clone());
                    }
                    (Ok(ds), true) if opts.serve_stale => stale = Some(Arc::clone(ds)),
                    _ => {}
                }
            }

            match (running, stale) {
                (Some(_), Some(ds)) => Lookup::Stale(ds),
                (Some(fut), None) => {
                    Counters::bump(&counters.joined);
                    Lookup::Wait(fut)
                }
                (None, stale) => {
                    let fut = self.start_load(&mut state, key.clone(), opts.timeout, loader);
                    match stale {
                        Some(ds) => Lookup::Stale(ds),
                        None => {
                            Counters::bump(&counters.misses);
                            Lookup::Wait(fut)
                        }
                    }
                }
            }
        };

        match lookup {
            Lookup::Stale(ds) => {
                Counters::bump(&counters.stale_hits);
                #[cfg(feature = "tracing")]
                tracing::debug!(key = %key, "serving stale value while refreshing");
                Ok(Fetched {
                    dataset: ds,
                    from_cache: true,
                    stale: true,
                })
            }
            Lookup::Wait(fut) => fut.await.map(|dataset| Fetched {
                dataset,
                from_cache: false,
                stale: false,
            }),
        }
    }

    /// Drop the entry for `key`. Returns whether one existed.
    ///
    /// A load in flight for `key` still completes for its waiters but does not
    /// write its result back.
    pub async fn invalidate(&self, key: &ResourceKey) -> bool {
        let mut state = self.inner.state.lock().await;
        let had_value = state.stored.pop(key).is_some();
        let had_load = state.pending.remove(key).is_some();
        drop(state);
        let removed = had_value || had_load;
        if removed {
            Counters::bump(&self.inner.counters.invalidations);
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %key, "invalidated");
        }
        removed
    }

    /// Drop every entry whose entity starts with `entity_prefix`. Returns the count.
    pub async fn invalidate_pattern(&self, entity_prefix: &str) -> usize {
        let prefix = entity_prefix.trim().to_ascii_uppercase();
        self.invalidate_where(|k| k.entity().starts_with(&prefix))
            .await
    }

    /// Drop every entry matching `pred`. Returns the count.
    pub async fn invalidate_where<P>(&self, mut pred: P) -> usize
    where
        P: FnMut(&ResourceKey) -> bool,
    {
        let mut state = self.inner.state.lock().await;
        let mut doomed: Vec<ResourceKey> = state
            .stored
            .iter()
            .map(|(k, _)| k)
            .chain(state.pending.keys())
            .filter(|k| pred(*k))
            .cloned()
            .collect();
        doomed.sort_unstable();
        doomed.dedup();
        for k in &doomed {
            state.stored.pop(k);
            state.pending.remove(k);
        }
        let n = doomed.len();
        self.inner
            .counters
            .invalidations
            .fetch_add(n as u64, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        tracing::debug!(count = n, "invalidated matching entries");
        n
    }

    /// Drop everything.
    pub async fn clear(&self) -> usize {
        self.invalidate_where(|_| true).await
    }

    fn start_load<F, Fut>(
        &self,
        state: &mut State,
        key: ResourceKey,
        timeout: Duration,
        loader: F,
    ) -> InFlight
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<TabularDataset, LoadError>> + Send + 'static,
    {
        state.next_generation += 1;
        let generation = state.next_generation;
        Counters::bump(&self.inner.counters.loads);
        #[cfg(feature = "tracing")]
        tracing::debug!(key = %key, generation, "starting load");

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, loader()).await {
                Ok(res) => res.map(Arc::new),
                Err(_) => Err(LoadError::timeout(task_key.to_string(), timeout)),
            };
            inner.complete(&task_key, generation, &outcome).await;
            outcome
        });

        let inner = Arc::clone(&self.inner);
        let join_key = key.clone();
        let fut: InFlight = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(join) => {
                    // The loader panicked; record it like any other failure.
                    let err = LoadError::provider(
                        join_key.source(),
                        format!("load task for {join_key} aborted: {join}"),
                    );
                    let outcome = Err(err);
                    inner.complete(&join_key, generation, &outcome).await;
                    outcome
                }
            }
        }
        .boxed()
        .shared();

        state.pending.insert(
            key,
            Pending {
                generation,
                fut: fut.clone(),
            },
        );
        fut
    }
}

impl Inner {
    async fn complete(&self, key: &ResourceKey, generation: u64, outcome: &LoadOutcome) {
        let ttl = match outcome {
            Ok(_) => self.cfg.ttl_for(key.kind()),
            Err(_) => {
                Counters::bump(&self.counters.failures);
                self.cfg.failure_ttl()
            }
        };
        #[cfg(feature = "tracing")]
        match outcome {
            Ok(ds) => tracing::debug!(key = %key, rows = ds.len(), "load completed"),
            Err(e) => tracing::warn!(key = %key, error = %e, "load failed"),
        }

        let mut state = self.state.lock().await;
        if state.pending.get(key).is_none_or(|p| p.generation != generation) {
            return;
        }
        state.pending.remove(key);
        let Some(ttl) = ttl else {
            state.stored.pop(key);
            return;
        };
        let stored = Stored {
            outcome: outcome.clone(),
            loaded_at: Instant::now(),
            ttl,
        };
        match state.stored.push(key.clone(), stored) {
            Some((evicted, _)) if evicted != *key => {
                Counters::bump(&self.counters.evictions);
                #[cfg(feature = "tracing")]
                tracing::debug!(key = %evicted, "evicted at capacity");
            }
            _ => {}
        }
    }
}
