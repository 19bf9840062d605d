// Shared fixtures so tests can `use helpers::*;`
#![allow(dead_code)]

use std::sync::Arc;

use bilancio::{
    Bilancio, CacheConfig, DataProvider, LoadParams, Period, ResourceCache, Source,
    TabularDataset, Value, columns,
};
use bilancio_mock::{DynamicMockController, DynamicMockProvider};

/// Common entity constants used across tests.
pub const ABC: &str = "ABC";
pub const XYZ: &str = "XYZ";

/// Annual statement rows for the given years, in the order given.
pub fn statements(years: &[i32]) -> TabularDataset {
    TabularDataset::from_rows(
        [columns::FISCAL_YEAR, "value"],
        years
            .iter()
            .map(|y| vec![Value::from(*y), Value::from(i64::from(*y) * 10)])
            .collect(),
    )
    .unwrap()
}

/// Daily closes on the given ISO dates.
pub fn prices(days: &[&str]) -> TabularDataset {
    TabularDataset::from_rows(
        [columns::TIME, columns::CLOSE],
        days.iter()
            .enumerate()
            .map(|(i, d)| vec![Value::from(*d), Value::from(i64::try_from(i).unwrap() + 100)])
            .collect(),
    )
    .unwrap()
}

/// Orchestrator over a scripted provider, with the default profiles.
pub fn scripted() -> (Bilancio, DynamicMockController) {
    scripted_with_cache(ResourceCache::new(CacheConfig::default()))
}

/// Same as [`scripted`], sharing `cache`.
pub fn scripted_with_cache(cache: ResourceCache) -> (Bilancio, DynamicMockController) {
    let (provider, controller) = DynamicMockProvider::new_with_controller("scripted");
    (build(provider, cache), controller)
}

pub fn build(provider: Arc<dyn DataProvider>, cache: ResourceCache) -> Bilancio {
    Bilancio::builder()
        .with_provider(provider)
        .with_cache(cache)
        .with_default_profiles()
        .build()
        .unwrap()
}

pub fn abc_annual() -> LoadParams {
    LoadParams::new(ABC).period(Period::Annual).source(Source::Vci)
}
