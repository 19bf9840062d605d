//! Bilancio loads the datasets a financial analysis view needs, through a
//! shared cache, and reports progress and partial failure back to the view.
//!
//! Overview
//! - A view names an analysis profile (`valuation`, `technical`, ...) and
//!   passes [`LoadParams`] (entity, period, source, date range).
//! - The resolver turns the profile into an ordered [`Plan`] of resources
//!   tagged hard or soft.
//! - The loader fetches each resource through the process-wide
//!   [`ResourceCache`], which deduplicates concurrent fetches per key.
//! - Multi-period datasets are aligned chronologically before they are
//!   handed back, so `latest()` is always the most recent fiscal period.
//! - The view receives a [`LoadResult`] with one [`Outcome`] per resource.
//!
//! Key behaviors and trade-offs
//! - Hard failures mark the result `Failed` and stop further hard stages, but
//!   soft resources are still attempted so the view can render what exists.
//! - Soft failures only degrade the result to `Partial`.
//! - Cancellation is cooperative: pending resources are reported as
//!   `Cancelled`, while fetches already running finish and fill the cache.
//! - Expired entries can be served immediately while a single refresh runs
//!   (`CacheConfig::serve_stale`); turn it off when freshness beats latency.
//!
//! Examples
//! ```rust,ignore
//! use std::sync::Arc;
//! use bilancio::{Bilancio, LoadParams, NoProgress, Period, ResourceKind};
//! use bilancio_mock::MockProvider;
//!
//! let bilancio = Bilancio::builder()
//!     .with_provider(Arc::new(MockProvider::new()))
//!     .with_default_profiles()
//!     .build()?;
//!
//! let result = bilancio
//!     .load("valuation", &LoadParams::new("ABC").period(Period::Annual), &NoProgress)
//!     .await?;
//! let bs = result.dataset(ResourceKind::BalanceSheet).unwrap();
//! assert_eq!(bs.latest().unwrap().fiscal_year(), Some(2023));
//! ```
//!
//! See `bilancio/examples/` for a runnable end-to-end demonstration.
#![warn(missing_docs)]

pub(crate) mod core;
mod loader;
mod profile;
mod resolver;
mod result;

pub use core::{Bilancio, BilancioBuilder};
pub use profile::{AnalysisProfile, ProfileEdge};
pub use resolver::{LoadParams, Plan, PlannedResource, ProfileRegistry};
pub use result::{LoadResult, Outcome};

pub use bilancio_cache::{
    CacheEntry, CacheStats, EntryStatus, Fetched, LoadOptions, ResourceCache,
};
pub use tokio_util::sync::CancellationToken;

// Re-export core types for convenience
pub use bilancio_core::{
    AlignedDataset, AlignedRow, CacheConfig, ChannelProgress, DataProvider, DateRange, Dependency,
    LoadError, LoadPhase, LoadStatus, LoaderConfig, NoProgress, PeriodKey, Period, ProgressEvent,
    ProgressSink, ResourceKey, ResourceKind, ResourceSpec, Row, Schema, Source, TabularDataset,
    TemporalKey, Value, align, columns,
};
