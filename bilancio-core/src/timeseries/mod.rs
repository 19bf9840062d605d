//! Temporal utilities shared by the loader and downstream consumers.
//!
//! Modules include:
//! - `key`: derive per-row ordering keys from fiscal-period or timestamp columns
//! - `align`: sort multi-period datasets chronologically and expose latest/earliest
/// Chronological alignment of multi-period datasets.
pub mod align;
/// Per-row temporal keys and their parsing rules.
pub mod key;
