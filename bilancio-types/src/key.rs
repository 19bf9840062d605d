//! Cache identity of a single parameterized dataset.

use core::fmt;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::kind::{Period, ResourceKind, Source};

/// Entity placeholder used by source-wide datasets such as the symbol index.
pub const SOURCE_WIDE_ENTITY: &str = "*";

/// Inclusive calendar date range attached to range-sensitive requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range from inclusive bounds.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, LoadError> {
        if start > end {
            return Err(LoadError::InvalidArg(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The whole calendar year `year`, if representable.
    #[must_use]
    pub fn year(year: i32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)?;
        Some(Self { start, end })
    }

    /// First day covered.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day covered.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// True when `date` falls within the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.ordinal() == 1
            && self.end.month() == 12
            && self.end.day() == 31
            && self.start.year() == self.end.year()
        {
            return write!(f, "{}", self.start.year());
        }
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Immutable identity of a cacheable dataset.
///
/// Equality and hashing are structural. Construction normalizes the entity
/// (trimmed, upper-cased), drops parameters the kind is insensitive to, and
/// folds the remaining parameters into `range_hash` in a canonical order, so
/// two requests with the same values always map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    entity: String,
    kind: ResourceKind,
    period: Period,
    source: Source,
    range_hash: u64,
}

impl ResourceKey {
    /// Key with no extra parameters.
    pub fn new(entity: impl AsRef<str>, kind: ResourceKind, period: Period, source: Source) -> Self {
        Self::builder(entity, kind).period(period).source(source).build()
    }

    /// Start building a key for `entity` and `kind`.
    pub fn builder(entity: impl AsRef<str>, kind: ResourceKind) -> ResourceKeyBuilder {
        ResourceKeyBuilder {
            entity: entity.as_ref().to_string(),
            kind,
            period: Period::default(),
            source: Source::default(),
            range: None,
            params: BTreeMap::new(),
        }
    }

    /// Subject identifier (ticker), or [`SOURCE_WIDE_ENTITY`].
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Dataset kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Reporting granularity.
    #[must_use]
    pub const fn period(&self) -> Period {
        self.period
    }

    /// Upstream source.
    #[must_use]
    pub const fn source(&self) -> Source {
        self.source
    }

    /// Stable hash of the date range and extra parameters; `0` when there are none.
    #[must_use]
    pub const fn range_hash(&self) -> u64 {
        self.range_hash
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.entity, self.kind, self.period, self.source
        )?;
        if self.range_hash != 0 {
            write!(f, "#{:016x}", self.range_hash)?;
        }
        Ok(())
    }
}

/// Builder for [`ResourceKey`].
#[derive(Debug, Clone)]
pub struct ResourceKeyBuilder {
    entity: String,
    kind: ResourceKind,
    period: Period,
    source: Source,
    range: Option<DateRange>,
    params: BTreeMap<String, String>,
}

impl ResourceKeyBuilder {
    /// Set the reporting granularity.
    #[must_use]
    pub const fn period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    /// Set the upstream source.
    #[must_use]
    pub const fn source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Attach a date range. Ignored for kinds that are not range-sensitive.
    #[must_use]
    pub const fn range(mut self, range: Option<DateRange>) -> Self {
        self.range = range;
        self
    }

    /// Attach one extra parameter. Insertion order does not matter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Attach many extra parameters.
    #[must_use]
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Finish the key.
    #[must_use]
    pub fn build(self) -> ResourceKey {
        let (entity, period) = if self.kind.is_source_wide() {
            (SOURCE_WIDE_ENTITY.to_string(), Period::NotApplicable)
        } else {
            (self.entity.trim().to_ascii_uppercase(), self.period)
        };
        let range = self.range.filter(|_| self.kind.uses_range());
        ResourceKey {
            entity,
            kind: self.kind,
            period,
            source: self.source,
            range_hash: params_hash(range.as_ref(), &self.params),
        }
    }
}

/// Canonical hash of a range plus parameters; `0` for "nothing".
fn params_hash(range: Option<&DateRange>, params: &BTreeMap<String, String>) -> u64 {
    if range.is_none() && params.is_empty() {
        return 0;
    }
    let mut hasher = blake3::Hasher::new();
    if let Some(r) = range {
        hasher.update(b"range=");
        hasher.update(r.start.to_string().as_bytes());
        hasher.update(b"..");
        hasher.update(r.end.to_string().as_bytes());
        hasher.update(b";");
    }
    for (k, v) in params {
        hasher.update(&(k.len() as u64).to_le_bytes());
        hasher.update(k.as_bytes());
        hasher.update(&(v.len() as u64).to_le_bytes());
        hasher.update(v.as_bytes());
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    // Reserve 0 for the parameterless key.
    u64::from_le_bytes(head).max(1)
}
