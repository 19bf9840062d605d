use core::fmt;
use serde::{Deserialize, Serialize};

/// Dataset kinds the loading layer knows how to cache and sequence.
///
/// These map one-to-one with provider endpoints and allow consistent
/// Display formatting, TTL lookup and match-exhaustive handling when
/// adding new datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ResourceKind {
    /// Fundamentals: balance sheet rows, one per fiscal period.
    BalanceSheet,
    /// Fundamentals: income statement rows, one per fiscal period.
    IncomeStatement,
    /// Fundamentals: cash flow statement rows, one per fiscal period.
    CashFlow,
    /// Derived financial ratios, one row per fiscal period.
    Ratios,
    /// Daily OHLCV price history.
    PriceHistory,
    /// Listing of tradable symbols for a source. Slow-changing reference data.
    SymbolIndex,
}

impl ResourceKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::BalanceSheet,
        Self::IncomeStatement,
        Self::CashFlow,
        Self::Ratios,
        Self::PriceHistory,
        Self::SymbolIndex,
    ];

    /// Stable, kebab-case identifier for logs, errors and progress stages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BalanceSheet => "balance-sheet",
            Self::IncomeStatement => "income-statement",
            Self::CashFlow => "cash-flow",
            Self::Ratios => "ratios",
            Self::PriceHistory => "price-history",
            Self::SymbolIndex => "symbol-index",
        }
    }

    /// True for kinds whose rows are reported per fiscal period.
    #[must_use]
    pub const fn is_fiscal(self) -> bool {
        matches!(
            self,
            Self::BalanceSheet | Self::IncomeStatement | Self::CashFlow | Self::Ratios
        )
    }

    /// True for kinds that carry one row per point in time and must be aligned
    /// before any "latest"/"earliest" access.
    #[must_use]
    pub const fn is_multi_period(self) -> bool {
        self.is_fiscal() || matches!(self, Self::PriceHistory)
    }

    /// True when the key for this kind is sensitive to the requested date range.
    #[must_use]
    pub const fn uses_range(self) -> bool {
        matches!(self, Self::PriceHistory)
    }

    /// True when the dataset is scoped to a whole source rather than one entity.
    #[must_use]
    pub const fn is_source_wide(self) -> bool {
        matches!(self, Self::SymbolIndex)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting granularity of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Period {
    /// One row per fiscal year.
    #[default]
    Annual,
    /// One row per fiscal quarter.
    Quarterly,
    /// The dataset has no reporting period (e.g. a symbol index).
    NotApplicable,
}

impl Period {
    /// Stable identifier for logs and key rendering.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
            Self::NotApplicable => "n/a",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream market-data source a dataset is requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[non_exhaustive]
pub enum Source {
    /// Vietcap securities data feed.
    #[default]
    Vci,
    /// Techcom securities data feed.
    Tcbs,
    /// MSN money data feed.
    Msn,
}

impl Source {
    /// Stable, upper-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vci => "VCI",
            Self::Tcbs => "TCBS",
            Self::Msn => "MSN",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strongly an analysis depends on one of its resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependency {
    /// Absence invalidates the whole analysis.
    Hard,
    /// Absence only degrades the analysis.
    Soft,
}

impl Dependency {
    /// True for hard dependencies.
    #[must_use]
    pub const fn is_hard(self) -> bool {
        matches!(self, Self::Hard)
    }
}
