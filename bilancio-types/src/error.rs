use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind::{ResourceKind, Source};

/// Unified error type for the bilancio workspace.
///
/// Errors are cloneable so a single failed load can be cached and handed to
/// every caller that was waiting on it.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadError {
    /// The market-data provider failed (network, API, bad payload).
    #[error("{origin} provider failed: {msg}")]
    Provider {
        /// Source the failing provider serves.
        origin: Source,
        /// Human-readable error message.
        msg: String,
    },

    /// A provider fetch exceeded its timeout.
    #[error("fetch timed out after {timeout_ms}ms: {what}")]
    Timeout {
        /// Description of the resource that timed out.
        what: String,
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Period keys of a multi-period dataset were missing, ambiguous or duplicated.
    #[error("cannot align {kind}: {reason}")]
    Alignment {
        /// Kind of the dataset that failed alignment.
        kind: ResourceKind,
        /// What was wrong with the period keys.
        reason: String,
    },

    /// No analysis profile is registered under this name.
    #[error("unknown analysis profile: {name}")]
    UnknownProfile {
        /// Requested profile name.
        name: String,
    },

    /// A soft dependency could not be loaded; the analysis is degraded.
    #[error("soft dependency {kind} unavailable: {cause}")]
    PartialDependency {
        /// Kind of the missing soft resource.
        kind: ResourceKind,
        /// Underlying failure.
        cause: Box<LoadError>,
    },

    /// A dataset did not match the schema declared for its kind.
    #[error("schema mismatch for {kind}: {msg}")]
    Schema {
        /// Kind whose schema was violated.
        kind: ResourceKind,
        /// Human-readable description of the violation.
        msg: String,
    },

    /// No registered provider serves this request.
    #[error("unsupported: {what}")]
    Unsupported {
        /// Description of what was requested, e.g. "cash-flow via MSN".
        what: String,
    },

    /// The provider has no data for the request.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource.
        what: String,
    },

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A profile could not be registered (cycle, duplicate or dangling edge).
    #[error("invalid profile {name}: {reason}")]
    InvalidProfile {
        /// Profile name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A hard resource was not requested because an earlier hard stage failed.
    #[error("{kind} skipped: hard dependency {dependency} failed")]
    DependencyFailed {
        /// Kind that was skipped.
        kind: ResourceKind,
        /// First hard dependency that failed.
        dependency: ResourceKind,
    },

    /// The load was cancelled before this resource was requested.
    #[error("{kind} not requested: load cancelled")]
    Cancelled {
        /// Kind that was not requested.
        kind: ResourceKind,
    },
}

impl LoadError {
    /// Helper: build a `Provider` error.
    pub fn provider(origin: Source, msg: impl Into<String>) -> Self {
        Self::Provider {
            origin,
            msg: msg.into(),
        }
    }

    /// Helper: build a `Timeout` error.
    pub fn timeout(what: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Helper: build an `Alignment` error.
    pub fn alignment(kind: ResourceKind, reason: impl Into<String>) -> Self {
        Self::Alignment {
            kind,
            reason: reason.into(),
        }
    }

    /// Helper: build a `Schema` error.
    pub fn schema(kind: ResourceKind, msg: impl Into<String>) -> Self {
        Self::Schema {
            kind,
            msg: msg.into(),
        }
    }

    /// Helper: build an `Unsupported` error.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported { what: what.into() }
    }

    /// Helper: build a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper: wrap a soft-resource failure.
    #[must_use]
    pub fn partial(kind: ResourceKind, cause: Self) -> Self {
        Self::PartialDependency {
            kind,
            cause: Box::new(cause),
        }
    }

    /// True when retrying later may succeed (provider outage or timeout).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider { .. } | Self::Timeout { .. } | Self::Cancelled { .. } => true,
            Self::PartialDependency { cause, .. } => cause.is_transient(),
            _ => false,
        }
    }

    /// Strip `PartialDependency` wrappers and return the underlying failure.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::PartialDependency { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}
