use std::collections::BTreeMap;

use bilancio_core::ResourceSpec;
use bilancio_types::{DateRange, Dependency, LoadError, Period, ResourceKey, ResourceKind, Source};

use crate::profile::AnalysisProfile;

/// Parameters a view passes along with a profile name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadParams {
    entity: String,
    period: Period,
    source: Source,
    range: Option<DateRange>,
    params: BTreeMap<String, String>,
}

impl LoadParams {
    /// Parameters for `entity` with annual period, the default source and no range.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            period: Period::Annual,
            source: Source::default(),
            range: None,
            params: BTreeMap::new(),
        }
    }

    /// Set the statement period.
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

    /// Set the date range used by range-sensitive kinds.
    #[must_use]
    pub const fn range(mut self, range: Option<DateRange>) -> Self {
        self.range = range;
        self
    }

    /// Add an extra provider parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Subject identifier as given.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    fn spec_for(&self, kind: ResourceKind) -> ResourceSpec {
        let period = if kind.is_fiscal() {
            self.period
        } else {
            Period::NotApplicable
        };
        ResourceSpec::new(
            &self.entity,
            kind,
            period,
            self.source,
            self.range,
            self.params.clone(),
        )
    }
}

/// One resource of a [`Plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedResource {
    /// What to fetch.
    pub spec: ResourceSpec,
    /// Hard or soft.
    pub dependency: Dependency,
    /// Stage index within its dependency group.
    pub stage: usize,
}

impl PlannedResource {
    /// Cache key of the resource.
    #[must_use]
    pub const fn key(&self) -> &ResourceKey {
        self.spec.key()
    }

    /// Kind of the resource.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.spec.key().kind()
    }
}

/// Ordered resource list for one profile and parameter set.
///
/// Hard resources come first, grouped by stage, followed by soft resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    profile: String,
    resources: Vec<PlannedResource>,
}

impl Plan {
    /// Profile the plan was resolved from.
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// All resources in load order.
    #[must_use]
    pub fn resources(&self) -> &[PlannedResource] {
        &self.resources
    }

    /// Keys in load order.
    #[must_use]
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.resources.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// True when the plan has no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Stages of one dependency group, in order.
    #[must_use]
    pub fn stages(&self, dependency: Dependency) -> Vec<Vec<&PlannedResource>> {
        let mut out: Vec<Vec<&PlannedResource>> = Vec::new();
        for r in self.resources.iter().filter(|r| r.dependency == dependency) {
            if out.len() <= r.stage {
                out.resize_with(r.stage + 1, Vec::new);
            }
            out[r.stage].push(r);
        }
        out.retain(|s| !s.is_empty());
        out
    }
}

/// Registry of analysis profiles, filled once at startup.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, AnalysisProfile>,
}

impl ProfileRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a profile.
    ///
    /// # Errors
    /// Returns `InvalidProfile` if the profile fails validation or its name is
    /// already registered.
    pub fn register(&mut self, profile: AnalysisProfile) -> Result<(), LoadError> {
        profile.validate()?;
        if self.profiles.contains_key(profile.name()) {
            return Err(LoadError::InvalidProfile {
                name: profile.name().to_string(),
                reason: "already registered".into(),
            });
        }
        self.profiles.insert(profile.name().to_string(), profile);
        Ok(())
    }

    /// Registered profile by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AnalysisProfile> {
        self.profiles.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.profiles.keys().map(String::as_str)
    }

    /// Turn a profile name and parameters into an ordered plan.
    ///
    /// Pure: the same registry, name and parameters always give the same plan.
    ///
    /// # Errors
    /// Returns `UnknownProfile` if `name` is not registered.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "bilancio::resolver::resolve",
            skip(self, params),
            fields(entity = %params.entity()),
            level = "debug",
        )
    )]
    pub fn resolve(&self, name: &str, params: &LoadParams) -> Result<Plan, LoadError> {
        let profile = self.get(name).ok_or_else(|| LoadError::UnknownProfile {
            name: name.to_string(),
        })?;
        let stages = profile.stages()?;

        let mut resources = Vec::with_capacity(profile.edges().len());
        for dependency in [Dependency::Hard, Dependency::Soft] {
            let mut stage = 0;
            for level in &stages {
                let group: Vec<_> = level.iter().filter(|e| e.dependency == dependency).collect();
                if group.is_empty() {
                    continue;
                }
                resources.extend(group.into_iter().map(|e| PlannedResource {
                    spec: params.spec_for(e.kind),
                    dependency,
                    stage,
                }));
                stage += 1;
            }
        }

        Ok(Plan {
            profile: profile.name().to_string(),
            resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProfileRegistry {
        let mut r = ProfileRegistry::new();
        for p in AnalysisProfile::defaults() {
            r.register(p).unwrap();
        }
        r
    }

    #[test]
    fn unknown_profile_fails_fast() {
        let err = registry()
            .resolve("astrology", &LoadParams::new("ABC"))
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::UnknownProfile {
                name: "astrology".into()
            }
        );
    }

    #[test]
    fn hard_resources_precede_soft_ones() {
        let plan = registry()
            .resolve("valuation", &LoadParams::new("ABC"))
            .unwrap();
        let deps: Vec<Dependency> = plan.resources().iter().map(|r| r.dependency).collect();
        assert_eq!(
            deps,
            [
                Dependency::Hard,
                Dependency::Hard,
                Dependency::Hard,
                Dependency::Hard,
                Dependency::Soft
            ]
        );
        assert_eq!(plan.stages(Dependency::Hard).len(), 1);
        assert_eq!(plan.stages(Dependency::Soft).len(), 1);
    }

    #[test]
    fn resolution_is_deterministic() {
        let params = LoadParams::new("abc")
            .period(Period::Quarterly)
            .param("lang", "en")
            .range(DateRange::year(2024));
        let a = registry().resolve("valuation", &params).unwrap();
        let b = registry().resolve("valuation", &params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.keys(), b.keys());
    }

    #[test]
    fn non_fiscal_kinds_carry_no_period() {
        let plan = registry()
            .resolve("portfolio", &LoadParams::new("ABC").period(Period::Quarterly))
            .unwrap();
        assert!(
            plan.keys()
                .iter()
                .all(|k| k.period() == Period::NotApplicable)
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut r = registry();
        let err = r.register(AnalysisProfile::technical()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidProfile { .. }));
    }
}
