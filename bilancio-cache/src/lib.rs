#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod cache;

pub use crate::cache::{CacheEntry, CacheStats, EntryStatus, Fetched, LoadOptions, ResourceCache};
