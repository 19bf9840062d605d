//! bilancio-mock
//!
//! Deterministic providers for tests and examples.
//!
//! - [`MockProvider`] serves static fixtures for a handful of tickers and
//!   counts how often it is asked.
//! - [`DynamicMockProvider`] defers to a [`DynamicMockController`] so a test can
//!   script returns, failures, hangs and delays per entity and kind.
//! - [`RecordingProgress`] keeps every progress report for later assertions.
#![warn(missing_docs)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bilancio_core::{
    DataProvider, LoadError, ProgressEvent, ProgressSink, ResourceKind, ResourceSpec, Source,
    TabularDataset,
};

mod dynamic;
mod fixtures;

pub use dynamic::{DynamicMockController, DynamicMockProvider, MockBehavior};

/// Entity that fails every fetch with a provider error.
pub const FAIL_ENTITY: &str = "FAIL";
/// Entity whose fetches take [`TIMEOUT_DELAY`] before answering.
pub const TIMEOUT_ENTITY: &str = "TIMEOUT";
/// Latency injected for [`TIMEOUT_ENTITY`].
pub const TIMEOUT_DELAY: Duration = Duration::from_millis(200);

/// Mock provider for CI-safe examples. Provides deterministic data from static fixtures.
///
/// Known tickers are `ABC` and `XYZ`. Statements cover fiscal years 2021 to
/// 2023 and are returned newest first; price history covers a few sessions
/// around the 2023/2024 year end.
#[derive(Debug, Default)]
pub struct MockProvider {
    fetches: AtomicUsize,
}

impl MockProvider {
    /// Create a provider with a zeroed fetch counter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of `fetch` calls served so far, including failed ones.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn fixture(spec: &ResourceSpec) -> Result<TabularDataset, LoadError> {
        let key = spec.key();
        let entity = key.entity();
        let found = match key.kind() {
            ResourceKind::PriceHistory => fixtures::history::by_entity(entity, spec.range()),
            ResourceKind::SymbolIndex => fixtures::symbols::index(),
            kind => fixtures::fundamentals::by_entity(entity, kind, key.period()),
        };
        found.ok_or_else(|| LoadError::not_found(format!("{} for {entity}", key.kind())))
    }

    async fn maybe_fail_or_delay(spec: &ResourceSpec) -> Result<(), LoadError> {
        match spec.key().entity() {
            FAIL_ENTITY => Err(LoadError::provider(
                spec.key().source(),
                format!("forced failure: {}", spec.key().kind()),
            )),
            TIMEOUT_ENTITY => {
                tokio::time::sleep(TIMEOUT_DELAY).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    fn name(&self) -> &'static str {
        "bilancio-mock"
    }

    fn supports(&self, _source: Source, _kind: ResourceKind) -> bool {
        true
    }

    async fn fetch(&self, spec: &ResourceSpec) -> Result<TabularDataset, LoadError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Self::maybe_fail_or_delay(spec).await?;
        Self::fixture(spec)
    }
}

/// Progress sink that stores every report in order.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the reports received so far.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    /// Percent values in the order they were reported.
    #[must_use]
    pub fn percents(&self) -> Vec<f32> {
        self.events().iter().map(|e| e.percent).collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn report_progress(&self, stage: &str, percent: f32, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(ProgressEvent {
                stage: stage.to_string(),
                percent,
                message: message.to_string(),
            });
        }
    }
}
