use serde::{Deserialize, Serialize};

/// Aggregate outcome of one profile load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Every resource loaded and aligned.
    #[default]
    Success,
    /// All hard resources loaded; at least one soft resource is missing.
    Partial,
    /// At least one hard resource is missing.
    Failed,
}

impl LoadStatus {
    /// Fold a soft failure into the status. Never upgrades `Failed`.
    #[must_use]
    pub const fn degrade_soft(self) -> Self {
        match self {
            Self::Success | Self::Partial => Self::Partial,
            Self::Failed => Self::Failed,
        }
    }

    /// True for [`LoadStatus::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Phase of a load, in the order a load walks through them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPhase {
    /// Resolving the profile into resource keys.
    #[default]
    Planning,
    /// Fetching hard dependencies.
    LoadingHard,
    /// Aligning the hard datasets.
    Aligning,
    /// Fetching soft dependencies.
    LoadingSoft,
    /// Result assembled.
    Done,
}
