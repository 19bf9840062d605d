//! Bilancio value types shared across the cache, the aligner and the loader.
#![warn(missing_docs)]

mod config;
mod error;
mod key;
mod kind;
mod status;

pub use config::{CacheConfig, LoaderConfig};
pub use error::LoadError;
pub use key::{DateRange, ResourceKey, ResourceKeyBuilder, SOURCE_WIDE_ENTITY};
pub use kind::{Dependency, Period, ResourceKind, Source};
pub use status::{LoadPhase, LoadStatus};
