//! Declared per-kind dataset shapes, checked once at the provider boundary.

use std::collections::HashSet;

use bilancio_types::{LoadError, ResourceKind};

use crate::dataset::TabularDataset;

/// Well-known column names that providers normalize their payloads to.
pub mod columns {
    /// Fiscal year of a statement or ratio row.
    pub const FISCAL_YEAR: &str = "year";
    /// Quarter indicator (`1..=4`, `"Q1".."Q4"`); absent or null for annual rows.
    pub const FISCAL_PERIOD: &str = "quarter";
    /// Observation date or timestamp of a price row.
    pub const TIME: &str = "time";
    /// Closing price of a price row.
    pub const CLOSE: &str = "close";
    /// Ticker of a symbol-index row.
    pub const SYMBOL: &str = "symbol";
}

/// Required columns for one [`ResourceKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    kind: ResourceKind,
    required: &'static [&'static str],
}

impl Schema {
    /// Schema declared for `kind`.
    #[must_use]
    pub const fn for_kind(kind: ResourceKind) -> Self {
        let required: &'static [&'static str] = match kind {
            ResourceKind::BalanceSheet
            | ResourceKind::IncomeStatement
            | ResourceKind::CashFlow
            | ResourceKind::Ratios => &[columns::FISCAL_YEAR],
            ResourceKind::PriceHistory => &[columns::TIME, columns::CLOSE],
            ResourceKind::SymbolIndex => &[columns::SYMBOL],
            _ => &[],
        };
        Self { kind, required }
    }

    /// Kind this schema belongs to.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Columns every dataset of this kind must carry.
    #[must_use]
    pub const fn required(&self) -> &'static [&'static str] {
        self.required
    }

    /// Check that `dataset` has unique column names and every required column.
    ///
    /// # Errors
    /// Returns `LoadError::Schema` naming the first violation.
    pub fn validate(&self, dataset: &TabularDataset) -> Result<(), LoadError> {
        let mut seen = HashSet::with_capacity(dataset.columns().len());
        for c in dataset.columns() {
            if !seen.insert(c.as_str()) {
                return Err(LoadError::schema(
                    self.kind,
                    format!("duplicate column '{c}'"),
                ));
            }
        }
        if let Some(missing) = self.required.iter().find(|c| !seen.contains(**c)) {
            return Err(LoadError::schema(
                self.kind,
                format!("missing required column '{missing}'"),
            ));
        }
        Ok(())
    }
}
