use std::collections::BTreeMap;

use bilancio_core::AlignedDataset;
use bilancio_types::{Dependency, LoadError, LoadPhase, LoadStatus, ResourceKey, ResourceKind};

/// What happened to one resource of a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Resource identity.
    pub key: ResourceKey,
    /// Hard or soft, as tagged by the profile.
    pub dependency: Dependency,
    /// The aligned dataset, or why it is missing.
    pub result: Result<AlignedDataset, LoadError>,
    /// True when served from the cache rather than a fetch this load waited on.
    pub from_cache: bool,
    /// True when the value was past its TTL and is being refreshed.
    pub stale: bool,
}

impl Outcome {
    pub(crate) const fn failed(key: ResourceKey, dependency: Dependency, err: LoadError) -> Self {
        Self {
            key,
            dependency,
            result: Err(err),
            from_cache: false,
            stale: false,
        }
    }

    /// The dataset, when the resource loaded.
    #[must_use]
    pub fn dataset(&self) -> Option<&AlignedDataset> {
        self.result.as_ref().ok()
    }

    /// The error, when it did not.
    #[must_use]
    pub fn error(&self) -> Option<&LoadError> {
        self.result.as_ref().err()
    }

    /// True when the resource loaded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything one `load` produced. Owned by the caller and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    /// Profile that was loaded.
    pub profile: String,
    /// Per-resource outcomes.
    pub outcomes: BTreeMap<ResourceKey, Outcome>,
    /// Aggregate status.
    pub overall_status: LoadStatus,
    /// Last phase reached. `Done` unless the load was cancelled.
    pub phase: LoadPhase,
    /// True when the load stopped early on cancellation.
    pub cancelled: bool,
}

impl LoadResult {
    pub(crate) fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            outcomes: BTreeMap::new(),
            overall_status: LoadStatus::Success,
            phase: LoadPhase::Planning,
            cancelled: false,
        }
    }

    pub(crate) fn record(&mut self, outcome: Outcome) {
        if let Err(e) = &outcome.result {
            self.overall_status = match outcome.dependency {
                Dependency::Hard => LoadStatus::Failed,
                Dependency::Soft => self.overall_status.degrade_soft(),
            };
            if matches!(e, LoadError::Cancelled { .. }) {
                self.cancelled = true;
            }
        }
        self.outcomes.insert(outcome.key.clone(), outcome);
    }

    /// Outcome for the first resource of `kind`.
    #[must_use]
    pub fn outcome(&self, kind: ResourceKind) -> Option<&Outcome> {
        self.outcomes.values().find(|o| o.key.kind() == kind)
    }

    /// Aligned dataset for `kind`, when it loaded.
    #[must_use]
    pub fn dataset(&self, kind: ResourceKind) -> Option<&AlignedDataset> {
        self.outcome(kind).and_then(Outcome::dataset)
    }

    /// Failed resources and their errors.
    pub fn errors(&self) -> impl Iterator<Item = (&ResourceKey, &LoadError)> + '_ {
        self.outcomes
            .iter()
            .filter_map(|(k, o)| o.error().map(|e| (k, e)))
    }

    /// One line per failed resource, for a view to show next to what did load.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.outcomes
            .values()
            .filter_map(|o| {
                let e = o.error()?;
                let severity = match o.dependency {
                    Dependency::Hard => "required",
                    Dependency::Soft => "optional",
                };
                Some(format!("{} ({severity}) unavailable: {e}", o.key.kind()))
            })
            .collect()
    }

    /// True when every resource loaded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.overall_status.is_success()
    }
}
