use std::sync::Arc;

use bilancio_types::{LoadError, ResourceKind};

use crate::dataset::{Row, TabularDataset, Value};
use crate::timeseries::key::{TemporalKey, TemporalLayout};

/// A dataset whose rows are in strict ascending temporal order.
///
/// Kinds without period information pass through in provider order and carry
/// no keys. For multi-period kinds `keys()[i]` is the key of row `i`, and
/// [`latest`](Self::latest) / [`earliest`](Self::earliest) are O(1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedDataset {
    kind: ResourceKind,
    data: Arc<TabularDataset>,
    keys: Vec<TemporalKey>,
}

/// Sort `dataset` chronologically according to the layout of `kind`.
///
/// Rows without a quarter indicator are treated as annual. Aligning an
/// already aligned dataset returns an identical result without copying rows.
///
/// # Errors
/// Returns `LoadError::Alignment` if any row has a missing or unparsable key,
/// or if two rows share a key.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "bilancio::align",
        skip_all,
        fields(kind = %kind),
        level = "debug",
    )
)]
pub fn align(
    dataset: impl Into<Arc<TabularDataset>>,
    kind: ResourceKind,
) -> Result<AlignedDataset, LoadError> {
    let data = dataset.into();
    let Some(layout) = TemporalLayout::for_kind(kind) else {
        return Ok(AlignedDataset {
            kind,
            data,
            keys: Vec::new(),
        });
    };

    let mut keyed: Vec<(TemporalKey, usize)> = data
        .rows()
        .map(|row| layout.key_of(kind, row).map(|k| (k, row.index())))
        .collect::<Result<_, _>>()?;
    keyed.sort_unstable_by_key(|(k, _)| *k);

    if let Some(w) = keyed.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(LoadError::alignment(
            kind,
            format!("duplicate period {} at rows {} and {}", w[0].0, w[0].1, w[1].1),
        ));
    }

    let in_order = keyed.iter().enumerate().all(|(pos, (_, i))| pos == *i);
    let (keys, order): (Vec<TemporalKey>, Vec<usize>) = keyed.into_iter().unzip();
    let data = if in_order {
        data
    } else {
        #[cfg(feature = "tracing")]
        tracing::trace!(kind = %kind, rows = order.len(), "reordering rows");
        Arc::new(data.reordered(&order))
    };
    Ok(AlignedDataset { kind, data, keys })
}

impl AlignedDataset {
    /// Kind the dataset was aligned for.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The ordered rows.
    #[must_use]
    pub fn dataset(&self) -> &TabularDataset {
        &self.data
    }

    /// Shared handle to the ordered rows.
    #[must_use]
    pub fn shared(&self) -> Arc<TabularDataset> {
        Arc::clone(&self.data)
    }

    /// Per-row keys, ascending. Empty for kinds without period information.
    #[must_use]
    pub fn keys(&self) -> &[TemporalKey] {
        &self.keys
    }

    /// True when rows carry temporal keys.
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        TemporalLayout::for_kind(self.kind).is_some()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Most recent row.
    #[must_use]
    pub fn latest(&self) -> Option<AlignedRow<'_>> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }

    /// Oldest row.
    #[must_use]
    pub fn earliest(&self) -> Option<AlignedRow<'_>> {
        self.row(0)
    }

    /// Row `index` in aligned order.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<AlignedRow<'_>> {
        let row = self.data.row(index)?;
        Some(AlignedRow {
            row,
            key: self.keys.get(index).copied(),
        })
    }

    /// Row whose key equals `key`, by binary search.
    #[must_use]
    pub fn at(&self, key: &TemporalKey) -> Option<AlignedRow<'_>> {
        let i = self.keys.binary_search(key).ok()?;
        self.row(i)
    }

    /// Iterate rows in aligned order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = AlignedRow<'_>> + '_ {
        self.data.rows().map(move |row| AlignedRow {
            row,
            key: self.keys.get(row.index()).copied(),
        })
    }
}

/// One row of an [`AlignedDataset`] together with its key.
#[derive(Debug, Clone, Copy)]
pub struct AlignedRow<'a> {
    row: Row<'a>,
    key: Option<TemporalKey>,
}

impl<'a> AlignedRow<'a> {
    /// Temporal key, for multi-period kinds.
    #[must_use]
    pub const fn key(&self) -> Option<TemporalKey> {
        self.key
    }

    /// Fiscal (or calendar) year of the row.
    #[must_use]
    pub fn fiscal_year(&self) -> Option<i32> {
        self.key.map(|k| k.fiscal_year())
    }

    /// Cell in `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.row.get(column)
    }

    /// Underlying row view.
    #[must_use]
    pub const fn row(&self) -> Row<'a> {
        self.row
    }
}
