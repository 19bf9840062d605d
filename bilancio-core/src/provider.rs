use std::collections::BTreeMap;

use async_trait::async_trait;
use bilancio_types::{DateRange, LoadError, Period, ResourceKey, ResourceKind, Source};

use crate::dataset::TabularDataset;

/// Everything a provider needs to serve one resource.
///
/// The [`ResourceKey`] only carries a hash of the range and extra parameters;
/// the spec keeps the values themselves so the provider can build its request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    key: ResourceKey,
    range: Option<DateRange>,
    params: BTreeMap<String, String>,
}

impl ResourceSpec {
    /// Build a spec and its key from the same inputs.
    ///
    /// The range is dropped for kinds that are not range-sensitive so the
    /// spec never carries more than its key identifies.
    #[must_use]
    pub fn new(
        entity: &str,
        kind: ResourceKind,
        period: Period,
        source: Source,
        range: Option<DateRange>,
        params: BTreeMap<String, String>,
    ) -> Self {
        let range = range.filter(|_| kind.uses_range());
        let key = ResourceKey::builder(entity, kind)
            .period(period)
            .source(source)
            .range(range)
            .params(params.iter().map(|(k, v)| (k.clone(), v.clone())))
            .build();
        Self { key, range, params }
    }

    /// Spec for a key without range or extra parameters.
    #[must_use]
    pub fn from_key(key: ResourceKey) -> Self {
        Self {
            key,
            range: None,
            params: BTreeMap::new(),
        }
    }

    /// Cache identity of this resource.
    #[must_use]
    pub const fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Requested date range, for range-sensitive kinds.
    #[must_use]
    pub const fn range(&self) -> Option<DateRange> {
        self.range
    }

    /// Extra provider parameters.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

/// Market-data collaborator that serves datasets for one or more sources.
///
/// Implementations normalize their payloads to the column names in
/// [`crate::schema::columns`]; the loader validates the result against the
/// kind's [`crate::Schema`] before caching it.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Stable provider name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this provider serves `kind` from `source`.
    fn supports(&self, source: Source, kind: ResourceKind) -> bool;

    /// Fetch the dataset described by `spec`.
    async fn fetch(&self, spec: &ResourceSpec) -> Result<TabularDataset, LoadError>;
}
