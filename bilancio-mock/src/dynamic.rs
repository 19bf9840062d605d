use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use bilancio_core::{
    DataProvider, LoadError, ResourceKey, ResourceKind, ResourceSpec, Source, TabularDataset,
};

use crate::MockProvider;

/// Instruction for how a fetch should behave for a given entity and kind.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return the provided dataset immediately.
    Return(TabularDataset),
    /// Fail immediately with the provided error.
    Fail(LoadError),
    /// Hang indefinitely (simulate a stalled upstream).
    Hang,
    /// Return the dataset after the given delay.
    Delay(Duration, TabularDataset),
}

#[derive(Default)]
struct InternalState {
    // `None` entity means the rule applies to every entity of that kind.
    rules: HashMap<(Option<String>, ResourceKind), MockBehavior>,
    requests: Vec<ResourceKey>,
}

impl InternalState {
    fn behavior_for(&self, key: &ResourceKey) -> Option<MockBehavior> {
        self.rules
            .get(&(Some(key.entity().to_string()), key.kind()))
            .or_else(|| self.rules.get(&(None, key.kind())))
            .cloned()
    }
}

fn normalize(entity: &str) -> String {
    entity.trim().to_ascii_uppercase()
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
#[derive(Clone)]
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Set the behavior for fetches of `kind` for one entity.
    pub async fn set_behavior(&self, entity: &str, kind: ResourceKind, behavior: MockBehavior) {
        let mut guard = self.state.lock().await;
        guard.rules.insert((Some(normalize(entity)), kind), behavior);
    }

    /// Set the behavior for fetches of `kind` for any entity without its own rule.
    pub async fn set_kind_behavior(&self, kind: ResourceKind, behavior: MockBehavior) {
        let mut guard = self.state.lock().await;
        guard.rules.insert((None, kind), behavior);
    }

    /// Number of fetches received for `entity` and `kind`.
    pub async fn calls(&self, entity: &str, kind: ResourceKind) -> usize {
        let entity = normalize(entity);
        let guard = self.state.lock().await;
        guard
            .requests
            .iter()
            .filter(|k| k.kind() == kind && k.entity() == entity)
            .count()
    }

    /// Every key fetched so far, in arrival order.
    pub async fn requests(&self) -> Vec<ResourceKey> {
        self.state.lock().await.requests.clone()
    }

    /// Clear all configured behaviors and request logs.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.rules.clear();
        guard.requests.clear();
    }
}

/// A provider that defers all behavior to an external controller.
///
/// Without a matching rule it answers from the same fixtures as
/// [`MockProvider`].
pub struct DynamicMockProvider {
    name: &'static str,
    sources: Option<Vec<Source>>,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockProvider {
    /// Create a provider that serves every source, and its controller.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn DataProvider>, DynamicMockController) {
        Self::build(name, None)
    }

    /// Create a provider that only claims `sources`, and its controller.
    #[must_use]
    pub fn for_sources(
        name: &'static str,
        sources: &[Source],
    ) -> (Arc<dyn DataProvider>, DynamicMockController) {
        Self::build(name, Some(sources.to_vec()))
    }

    fn build(
        name: &'static str,
        sources: Option<Vec<Source>>,
    ) -> (Arc<dyn DataProvider>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self {
            name,
            sources,
            state,
        });
        (me as Arc<dyn DataProvider>, controller)
    }
}

#[async_trait]
impl DataProvider for DynamicMockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports(&self, source: Source, _kind: ResourceKind) -> bool {
        self.sources.as_ref().is_none_or(|s| s.contains(&source))
    }

    async fn fetch(&self, spec: &ResourceSpec) -> Result<TabularDataset, LoadError> {
        // Snapshot the behavior without holding the lock across await points.
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.requests.push(spec.key().clone());
            guard.behavior_for(spec.key())
        };

        match behavior {
            None => MockProvider::fixture(spec),
            Some(MockBehavior::Return(ds)) => Ok(ds),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                Err(LoadError::unsupported("hung fetch resumed"))
            }
            Some(MockBehavior::Delay(d, ds)) => {
                tokio::time::sleep(d).await;
                Ok(ds)
            }
        }
    }
}
