//! bilancio-core
//!
//! Datasets, collaborator contracts and temporal alignment shared across the
//! bilancio loading layer.
//!
//! - `dataset`: row-major `TabularDataset` with typed cells.
//! - `schema`: per-kind required columns, validated at the provider boundary.
//! - `provider`: the `DataProvider` trait and the `ResourceSpec` it serves.
//! - `progress`: the `ProgressSink` trait and ready-made sinks.
//! - `timeseries`: chronological alignment of multi-period datasets.
//!
//! Async runtime (Tokio)
//! ---------------------
//! `DataProvider::fetch` is async and `ChannelProgress` wraps a
//! `tokio::sync::mpsc` channel, so consumers run under a Tokio 1.x runtime.
//!
#![warn(missing_docs)]

/// Tabular datasets and cell values.
pub mod dataset;
/// Progress reporting contract.
pub mod progress;
/// Provider contract.
pub mod provider;
/// Per-kind dataset schemas.
pub mod schema;
/// Temporal keys and alignment.
pub mod timeseries;

pub use dataset::{Row, TabularDataset, Value};
pub use progress::{ChannelProgress, NoProgress, ProgressEvent, ProgressSink};
pub use provider::{DataProvider, ResourceSpec};
pub use schema::{Schema, columns};
pub use timeseries::align::{AlignedDataset, AlignedRow, align};
pub use timeseries::key::{PeriodKey, TemporalKey, TemporalLayout};

pub use bilancio_types::{
    CacheConfig, DateRange, Dependency, LoadError, LoadPhase, LoadStatus, LoaderConfig, Period,
    ResourceKey, ResourceKeyBuilder, ResourceKind, SOURCE_WIDE_ENTITY, Source,
};
