//! Configuration types shared by the cache and the loader.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::kind::ResourceKind;

/// Time-to-live and sizing policy for the resource cache.
///
/// Loaded once at process start. A TTL of zero disables storage for that
/// kind; concurrent requests are still deduplicated while a load is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for kinds without an entry in `per_kind_ttl`.
    pub default_ttl: Duration,
    /// Per-kind TTL overrides.
    pub per_kind_ttl: HashMap<ResourceKind, Duration>,
    /// TTL of a cached failure. Kept short so an outage does not stick.
    pub failure_ttl: Duration,
    /// Timeout applied to a provider fetch when the caller supplies none.
    pub fetch_timeout: Duration,
    /// Upper bound on the number of keys held; least recently used go first.
    pub max_entries: usize,
    /// Hand out an expired value immediately while a refresh runs.
    pub serve_stale: bool,
}

impl CacheConfig {
    /// TTL for successful loads of `kind`, or `None` when caching is disabled.
    #[must_use]
    pub fn ttl_for(&self, kind: ResourceKind) -> Option<Duration> {
        let ttl = self
            .per_kind_ttl
            .get(&kind)
            .copied()
            .unwrap_or(self.default_ttl);
        (!ttl.is_zero()).then_some(ttl)
    }

    /// TTL for failed loads, or `None` when failures are not cached.
    #[must_use]
    pub fn failure_ttl(&self) -> Option<Duration> {
        (!self.failure_ttl.is_zero()).then_some(self.failure_ttl)
    }

    /// Override the TTL of one kind.
    #[must_use]
    pub fn with_ttl(mut self, kind: ResourceKind, ttl: Duration) -> Self {
        self.per_kind_ttl.insert(kind, ttl);
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        const MINUTE: u64 = 60;
        const HOUR: u64 = 60 * MINUTE;
        let per_kind_ttl = HashMap::from([
            (ResourceKind::SymbolIndex, Duration::from_secs(24 * HOUR)),
            (ResourceKind::PriceHistory, Duration::from_secs(5 * MINUTE)),
            (ResourceKind::BalanceSheet, Duration::from_secs(6 * HOUR)),
            (ResourceKind::IncomeStatement, Duration::from_secs(6 * HOUR)),
            (ResourceKind::CashFlow, Duration::from_secs(6 * HOUR)),
            (ResourceKind::Ratios, Duration::from_secs(6 * HOUR)),
        ]);
        Self {
            default_ttl: Duration::from_secs(HOUR),
            per_kind_ttl,
            failure_ttl: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10),
            max_entries: 1024,
            serve_stale: true,
        }
    }
}

/// Settings for the progressive loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Per-fetch timeout handed to the cache; `None` uses the cache default.
    pub fetch_timeout: Option<Duration>,
}

