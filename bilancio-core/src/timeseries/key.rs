use core::fmt;

use bilancio_types::{LoadError, ResourceKind};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::{Row, Value};
use crate::schema::columns;

/// Composite fiscal ordering key: `period_index` is `0` for annual rows and
/// `1..=4` for quarters. Orders by year, then index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PeriodKey {
    /// Fiscal year.
    pub fiscal_year: i32,
    /// `0` for annual, `1..=4` for quarterly.
    pub period_index: u8,
}

impl PeriodKey {
    /// Annual key for `fiscal_year`.
    #[must_use]
    pub const fn annual(fiscal_year: i32) -> Self {
        Self {
            fiscal_year,
            period_index: 0,
        }
    }

    /// Quarterly key; `None` unless `quarter` is in `1..=4`.
    #[must_use]
    pub const fn quarter(fiscal_year: i32, quarter: u8) -> Option<Self> {
        if quarter >= 1 && quarter <= 4 {
            Some(Self {
                fiscal_year,
                period_index: quarter,
            })
        } else {
            None
        }
    }

    /// True for annual keys.
    #[must_use]
    pub const fn is_annual(&self) -> bool {
        self.period_index == 0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_annual() {
            write!(f, "FY{}", self.fiscal_year)
        } else {
            write!(f, "{}Q{}", self.fiscal_year, self.period_index)
        }
    }
}

/// Ordering key of one row of a multi-period dataset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TemporalKey {
    /// Fiscal-period rows (statements, ratios).
    Period(PeriodKey),
    /// Point-in-time rows (price history).
    Instant(DateTime<Utc>),
}

impl TemporalKey {
    /// Fiscal year of a period key, or calendar year of an instant.
    #[must_use]
    pub fn fiscal_year(&self) -> i32 {
        match self {
            Self::Period(p) => p.fiscal_year,
            Self::Instant(t) => t.year(),
        }
    }

    /// The period key, if this is one.
    #[must_use]
    pub const fn as_period(&self) -> Option<PeriodKey> {
        match self {
            Self::Period(p) => Some(*p),
            Self::Instant(_) => None,
        }
    }
}

impl fmt::Display for TemporalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Period(p) => p.fmt(f),
            Self::Instant(t) => f.write_str(&t.to_rfc3339()),
        }
    }
}

/// How rows of a kind are placed in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalLayout {
    /// Fiscal year plus optional quarter indicator.
    FiscalPeriod,
    /// One timestamp column.
    Timestamp,
}

impl TemporalLayout {
    /// Layout of `kind`, or `None` for kinds without period information.
    #[must_use]
    pub const fn for_kind(kind: ResourceKind) -> Option<Self> {
        if kind.is_fiscal() {
            Some(Self::FiscalPeriod)
        } else if kind.is_multi_period() {
            Some(Self::Timestamp)
        } else {
            None
        }
    }

    /// Derive the key of `row`.
    ///
    /// # Errors
    /// Returns `LoadError::Alignment` when the key is missing or unparsable.
    pub fn key_of(self, kind: ResourceKind, row: Row<'_>) -> Result<TemporalKey, LoadError> {
        match self {
            Self::FiscalPeriod => period_key(kind, row).map(TemporalKey::Period),
            Self::Timestamp => instant_key(kind, row).map(TemporalKey::Instant),
        }
    }
}

fn period_key(kind: ResourceKind, row: Row<'_>) -> Result<PeriodKey, LoadError> {
    let at = row.index();
    let year = match row.get(columns::FISCAL_YEAR) {
        None | Some(Value::Null) => {
            return Err(LoadError::alignment(
                kind,
                format!("row {at}: missing fiscal year"),
            ));
        }
        Some(v) => parse_year(v).ok_or_else(|| {
            LoadError::alignment(kind, format!("row {at}: unparsable fiscal year '{v}'"))
        })?,
    };
    // Annual rows routinely omit the quarter indicator; treat that as index 0.
    let index = match row.get(columns::FISCAL_PERIOD) {
        None | Some(Value::Null) => 0,
        Some(v) => parse_period_index(v).ok_or_else(|| {
            LoadError::alignment(kind, format!("row {at}: unparsable quarter '{v}'"))
        })?,
    };
    Ok(PeriodKey {
        fiscal_year: year,
        period_index: index,
    })
}

fn parse_year(v: &Value) -> Option<i32> {
    match v {
        Value::Text(s) => s.trim().parse().ok(),
        other => other.as_i64().and_then(|y| i32::try_from(y).ok()),
    }
}

/// Accepts `0..=4`, `"1".."4"`, `"Q1".."Q4"` (any case) and the empty string.
fn parse_period_index(v: &Value) -> Option<u8> {
    let raw = match v {
        Value::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Some(0);
            }
            let digits = s.strip_prefix(['Q', 'q']).unwrap_or(s);
            digits.parse::<i64>().ok()?
        }
        other => other.as_i64()?,
    };
    u8::try_from(raw).ok().filter(|i| *i <= 4)
}

fn instant_key(kind: ResourceKind, row: Row<'_>) -> Result<DateTime<Utc>, LoadError> {
    let at = row.index();
    let v = row
        .get(columns::TIME)
        .filter(|v| !v.is_null())
        .ok_or_else(|| LoadError::alignment(kind, format!("row {at}: missing timestamp")))?;
    parse_instant(v)
        .ok_or_else(|| LoadError::alignment(kind, format!("row {at}: unparsable timestamp '{v}'")))
}

fn parse_instant(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Time(t) => Some(*t),
        Value::Date(d) => Some(d.and_time(NaiveTime::MIN).and_utc()),
        Value::Text(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
                })
        }
        Value::Int(secs) => DateTime::from_timestamp(*secs, 0),
        _ => None,
    }
}
