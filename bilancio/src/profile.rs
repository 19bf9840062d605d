use std::collections::BTreeMap;

use bilancio_types::{Dependency, LoadError, ResourceKind};
use serde::{Deserialize, Serialize};

/// One resource an analysis needs, and what it must wait for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEdge {
    /// Resource kind to load.
    pub kind: ResourceKind,
    /// Whether its absence aborts or only degrades the analysis.
    pub dependency: Dependency,
    /// Kinds that must be attempted before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<ResourceKind>,
}

/// Named set of dependency edges between resource kinds.
///
/// Profiles are static configuration. They are registered once through
/// [`BilancioBuilder::register_profile`](crate::BilancioBuilder::register_profile)
/// and validated there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisProfile {
    name: String,
    edges: Vec<ProfileEdge>,
}

impl AnalysisProfile {
    /// Empty profile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            edges: Vec::new(),
        }
    }

    /// Add a hard dependency with no ordering constraint.
    #[must_use]
    pub fn hard(self, kind: ResourceKind) -> Self {
        self.edge(kind, Dependency::Hard, &[])
    }

    /// Add a soft dependency with no ordering constraint.
    #[must_use]
    pub fn soft(self, kind: ResourceKind) -> Self {
        self.edge(kind, Dependency::Soft, &[])
    }

    /// Add a hard dependency attempted only after `after`.
    #[must_use]
    pub fn hard_after(self, kind: ResourceKind, after: &[ResourceKind]) -> Self {
        self.edge(kind, Dependency::Hard, after)
    }

    /// Add a soft dependency attempted only after `after`.
    #[must_use]
    pub fn soft_after(self, kind: ResourceKind, after: &[ResourceKind]) -> Self {
        self.edge(kind, Dependency::Soft, after)
    }

    fn edge(mut self, kind: ResourceKind, dependency: Dependency, after: &[ResourceKind]) -> Self {
        self.edges.push(ProfileEdge {
            kind,
            dependency,
            after: after.to_vec(),
        });
        self
    }

    /// Profile name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Edges in declaration order.
    #[must_use]
    pub fn edges(&self) -> &[ProfileEdge] {
        &self.edges
    }

    /// Edge for `kind`, if the profile needs it.
    #[must_use]
    pub fn edge_for(&self, kind: ResourceKind) -> Option<&ProfileEdge> {
        self.edges.iter().find(|e| e.kind == kind)
    }

    /// Check the profile is loadable.
    ///
    /// # Errors
    /// Returns `InvalidProfile` when the profile is empty, lists a kind twice,
    /// orders a kind after one it does not contain, orders a hard kind after a
    /// soft one, or contains a cycle.
    pub fn validate(&self) -> Result<(), LoadError> {
        self.stage_indices().map(|_| ())
    }

    /// Edges grouped into stages. Every edge sits in a later stage than all of
    /// its `after` kinds; within a stage, declaration order is kept.
    ///
    /// # Errors
    /// Same conditions as [`validate`](Self::validate).
    pub fn stages(&self) -> Result<Vec<Vec<&ProfileEdge>>, LoadError> {
        let levels = self.stage_indices()?;
        let depth = levels.iter().max().map_or(0, |d| d + 1);
        let mut out: Vec<Vec<&ProfileEdge>> = vec![Vec::new(); depth];
        for (edge, level) in self.edges.iter().zip(levels) {
            out[level].push(edge);
        }
        Ok(out)
    }

    fn invalid(&self, reason: impl Into<String>) -> LoadError {
        LoadError::InvalidProfile {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn stage_indices(&self) -> Result<Vec<usize>, LoadError> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("profile name is empty"));
        }
        if self.edges.is_empty() {
            return Err(self.invalid("profile has no resources"));
        }

        let mut index: BTreeMap<ResourceKind, usize> = BTreeMap::new();
        for (i, e) in self.edges.iter().enumerate() {
            if index.insert(e.kind, i).is_some() {
                return Err(self.invalid(format!("{} listed twice", e.kind)));
            }
        }
        for e in &self.edges {
            for dep in &e.after {
                let Some(&j) = index.get(dep) else {
                    return Err(self.invalid(format!("{} waits on {dep}, which is not in the profile", e.kind)));
                };
                if e.dependency.is_hard() && !self.edges[j].dependency.is_hard() {
                    return Err(self.invalid(format!(
                        "hard {} cannot wait on soft {dep}",
                        e.kind
                    )));
                }
            }
        }

        // Longest-path levelling; a pass that makes no progress means a cycle.
        let mut level: Vec<Option<usize>> = vec![None; self.edges.len()];
        let mut remaining = self.edges.len();
        while remaining > 0 {
            let mut progressed = false;
            for (i, e) in self.edges.iter().enumerate() {
                if level[i].is_some() {
                    continue;
                }
                let deps: Option<Vec<usize>> = e
                    .after
                    .iter()
                    .map(|d| index.get(d).and_then(|&j| level[j]))
                    .collect();
                if let Some(deps) = deps {
                    level[i] = Some(deps.into_iter().max().map_or(0, |m| m + 1));
                    remaining -= 1;
                    progressed = true;
                }
            }
            if !progressed {
                let stuck: Vec<String> = self
                    .edges
                    .iter()
                    .zip(&level)
                    .filter(|(_, l)| l.is_none())
                    .map(|(e, _)| e.kind.to_string())
                    .collect();
                return Err(self.invalid(format!("cycle among {}", stuck.join(", "))));
            }
        }
        Ok(level.into_iter().flatten().collect())
    }

    /// Price history, the three statements (hard) and ratios (soft, after the
    /// balance sheet and income statement). Feeds DCF and WACC computations.
    #[must_use]
    pub fn valuation() -> Self {
        Self::new("valuation")
            .hard(ResourceKind::PriceHistory)
            .hard(ResourceKind::BalanceSheet)
            .hard(ResourceKind::IncomeStatement)
            .hard(ResourceKind::CashFlow)
            .soft_after(
                ResourceKind::Ratios,
                &[ResourceKind::BalanceSheet, ResourceKind::IncomeStatement],
            )
    }

    /// Price history only.
    #[must_use]
    pub fn technical() -> Self {
        Self::new("technical").hard(ResourceKind::PriceHistory)
    }

    /// Price history, with the symbol index for labelling holdings.
    #[must_use]
    pub fn portfolio() -> Self {
        Self::new("portfolio")
            .hard(ResourceKind::PriceHistory)
            .soft(ResourceKind::SymbolIndex)
    }

    /// Symbol index, with ratios for the ranking columns.
    #[must_use]
    pub fn screening() -> Self {
        Self::new("screening")
            .hard(ResourceKind::SymbolIndex)
            .soft_after(ResourceKind::Ratios, &[ResourceKind::SymbolIndex])
    }

    /// The four built-in profiles.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::valuation(),
            Self::technical(),
            Self::portfolio(),
            Self::screening(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        for p in AnalysisProfile::defaults() {
            p.validate().unwrap();
        }
    }

    #[test]
    fn stages_follow_after_edges() {
        let p = AnalysisProfile::valuation();
        let stages = p.stages().unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].len(), 4);
        assert_eq!(stages[1][0].kind, ResourceKind::Ratios);
    }

    #[test]
    fn cycles_are_rejected() {
        let p = AnalysisProfile::new("loop")
            .hard_after(ResourceKind::BalanceSheet, &[ResourceKind::CashFlow])
            .hard_after(ResourceKind::CashFlow, &[ResourceKind::BalanceSheet]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("cycle"), "{err}");
    }

    #[test]
    fn dangling_and_duplicate_edges_are_rejected() {
        let dangling = AnalysisProfile::new("d").hard_after(ResourceKind::Ratios, &[ResourceKind::CashFlow]);
        assert!(matches!(dangling.validate(), Err(LoadError::InvalidProfile { .. })));

        let dup = AnalysisProfile::new("d")
            .hard(ResourceKind::Ratios)
            .soft(ResourceKind::Ratios);
        assert!(dup.validate().is_err());
    }

    #[test]
    fn hard_cannot_wait_on_soft() {
        let p = AnalysisProfile::new("inverted")
            .soft(ResourceKind::SymbolIndex)
            .hard_after(ResourceKind::Ratios, &[ResourceKind::SymbolIndex]);
        assert!(p.validate().is_err());
    }

    #[test]
    fn empty_profile_is_rejected() {
        assert!(AnalysisProfile::new("nothing").validate().is_err());
    }
}
