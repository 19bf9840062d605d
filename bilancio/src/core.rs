use std::sync::Arc;
use std::time::Duration;

use bilancio_cache::{Fetched, LoadOptions, ResourceCache};
use bilancio_core::{DataProvider, ResourceSpec, Schema};
use bilancio_types::{CacheConfig, LoadError, LoaderConfig};

use crate::profile::AnalysisProfile;
use crate::resolver::{LoadParams, Plan, ProfileRegistry};

/// Orchestrator that resolves analysis profiles and loads their resources
/// through a shared cache.
pub struct Bilancio {
    pub(crate) providers: Vec<Arc<dyn DataProvider>>,
    pub(crate) cache: ResourceCache,
    pub(crate) profiles: ProfileRegistry,
    pub(crate) cfg: LoaderConfig,
}

/// Builder for constructing a `Bilancio` orchestrator.
pub struct BilancioBuilder {
    providers: Vec<Arc<dyn DataProvider>>,
    cache: Option<ResourceCache>,
    cache_cfg: CacheConfig,
    profiles: Vec<AnalysisProfile>,
    cfg: LoaderConfig,
}

impl Default for BilancioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BilancioBuilder {
    /// Create a new builder with no providers, no profiles and default cache settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: vec![],
            cache: None,
            cache_cfg: CacheConfig::default(),
            profiles: vec![],
            cfg: LoaderConfig::default(),
        }
    }

    /// Register a data provider.
    ///
    /// Registration order decides routing: a resource goes to the first
    /// provider whose `supports` accepts its source and kind.
    #[must_use]
    pub fn with_provider(mut self, p: Arc<dyn DataProvider>) -> Self {
        self.providers.push(p);
        self
    }

    /// Settings for the cache the builder creates. Ignored when
    /// [`with_cache`](Self::with_cache) supplies one.
    #[must_use]
    pub fn cache_config(mut self, cfg: CacheConfig) -> Self {
        self.cache_cfg = cfg;
        self
    }

    /// Share an existing cache, e.g. one process-wide instance across sessions.
    #[must_use]
    pub fn with_cache(mut self, cache: ResourceCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Add an analysis profile. Validated at [`build`](Self::build).
    #[must_use]
    pub fn register_profile(mut self, profile: AnalysisProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// Add the built-in `valuation`, `technical`, `portfolio` and `screening` profiles.
    #[must_use]
    pub fn with_default_profiles(mut self) -> Self {
        self.profiles.extend(AnalysisProfile::defaults());
        self
    }

    /// Override the cache's fetch timeout for loads issued by this orchestrator.
    #[must_use]
    pub const fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.fetch_timeout = Some(timeout);
        self
    }

    /// Replace the loader settings.
    #[must_use]
    pub const fn loader_config(mut self, cfg: LoaderConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Build the `Bilancio` orchestrator.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no providers have been registered via
    /// [`with_provider`](Self::with_provider), and `InvalidProfile` if a
    /// registered profile is malformed or registered twice.
    pub fn build(self) -> Result<Bilancio, LoadError> {
        if self.providers.is_empty() {
            return Err(LoadError::InvalidArg(
                "no providers registered; add at least one via with_provider(...)".to_string(),
            ));
        }

        let mut profiles = ProfileRegistry::new();
        for p in self.profiles {
            profiles.register(p)?;
        }

        Ok(Bilancio {
            providers: self.providers,
            cache: self
                .cache
                .unwrap_or_else(|| ResourceCache::new(self.cache_cfg)),
            profiles,
            cfg: self.cfg,
        })
    }
}

impl Bilancio {
    /// Start building a new `Bilancio` instance.
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use bilancio::Bilancio;
    /// use bilancio_mock::MockProvider;
    ///
    /// let bilancio = Bilancio::builder()
    ///     .with_provider(Arc::new(MockProvider::new()))
    ///     .with_default_profiles()
    ///     .build()?;
    /// ```
    #[must_use]
    pub fn builder() -> BilancioBuilder {
        BilancioBuilder::new()
    }

    /// The cache loads go through.
    #[must_use]
    pub const fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Registered profiles.
    #[must_use]
    pub const fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    /// Resolve a profile without loading anything.
    ///
    /// # Errors
    /// Returns `UnknownProfile` if `profile` is not registered.
    pub fn plan(&self, profile: &str, params: &LoadParams) -> Result<Plan, LoadError> {
        self.profiles.resolve(profile, params)
    }

    /// Drop every cached resource of `entity`, e.g. after its filings change.
    pub async fn invalidate_entity(&self, entity: &str) -> usize {
        self.cache.invalidate_pattern(entity).await
    }

    pub(crate) fn load_options(&self) -> LoadOptions {
        let mut opts = self.cache.default_options();
        if let Some(t) = self.cfg.fetch_timeout {
            opts.timeout = t;
        }
        opts
    }

    pub(crate) fn route(&self, spec: &ResourceSpec) -> Result<Arc<dyn DataProvider>, LoadError> {
        let key = spec.key();
        self.providers
            .iter()
            .find(|p| p.supports(key.source(), key.kind()))
            .cloned()
            .ok_or_else(|| LoadError::unsupported(format!("{} via {}", key.kind(), key.source())))
    }

    /// Fetch one resource through the cache, outside any profile.
    ///
    /// The provider output is checked against the kind's schema before it is
    /// cached; a violation is cached like any other failure.
    ///
    /// # Errors
    /// Returns `Unsupported` when no provider serves the source and kind, or
    /// whatever the provider, schema check or timeout produced.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "bilancio::core::fetch",
            skip(self, spec),
            fields(key = %spec.key()),
        )
    )]
    pub async fn fetch(&self, spec: &ResourceSpec) -> Result<Fetched, LoadError> {
        let provider = self.route(spec)?;
        let owned = spec.clone();
        let loader = move || async move {
            #[cfg(feature = "tracing")]
            tracing::debug!(provider = provider.name(), key = %owned.key(), "provider fetch");
            let ds = provider.fetch(&owned).await?;
            Schema::for_kind(owned.key().kind()).validate(&ds)?;
            Ok(ds)
        };
        self.cache
            .get_or_load_with(spec.key().clone(), self.load_options(), loader)
            .await
    }
}
