mod helpers;

use std::sync::Arc;
use std::time::Duration;

use bilancio::{
    CacheConfig, DateRange, LoadError, LoadPhase, LoadStatus, NoProgress, ResourceCache,
    ResourceKind, Source,
};
use bilancio_mock::{DynamicMockProvider, MockBehavior, MockProvider};
use helpers::*;

#[tokio::test]
async fn cash_flow_failure_fails_valuation_but_keeps_ratios() {
    let (bilancio, controller) = scripted();
    controller
        .set_behavior(
            ABC,
            ResourceKind::BalanceSheet,
            MockBehavior::Return(statements(&[2022, 2021, 2023])),
        )
        .await;
    controller
        .set_behavior(
            ABC,
            ResourceKind::IncomeStatement,
            MockBehavior::Return(statements(&[2021, 2022, 2023])),
        )
        .await;
    controller
        .set_behavior(
            ABC,
            ResourceKind::CashFlow,
            MockBehavior::Fail(LoadError::provider(Source::Vci, "503 from upstream")),
        )
        .await;
    controller
        .set_behavior(
            ABC,
            ResourceKind::Ratios,
            MockBehavior::Return(statements(&[2023, 2022, 2021])),
        )
        .await;

    let result = bilancio
        .load("valuation", &abc_annual(), &NoProgress)
        .await
        .unwrap();

    assert_eq!(result.overall_status, LoadStatus::Failed);
    assert_eq!(result.phase, LoadPhase::Done);
    assert!(!result.cancelled);

    let cf = result.outcome(ResourceKind::CashFlow).unwrap();
    assert!(matches!(cf.error(), Some(LoadError::Provider { .. })));

    let ratios = result.dataset(ResourceKind::Ratios).unwrap();
    assert_eq!(ratios.latest().unwrap().fiscal_year(), Some(2023));

    let bs = result.dataset(ResourceKind::BalanceSheet).unwrap();
    assert_eq!(bs.latest().unwrap().fiscal_year(), Some(2023));
    assert_eq!(bs.earliest().unwrap().fiscal_year(), Some(2021));

    let warnings = result.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("cash-flow (required)"), "{}", warnings[0]);
}

#[tokio::test]
async fn fixture_provider_loads_every_valuation_resource() {
    let mock = Arc::new(MockProvider::new());
    let bilancio = build(mock.clone(), ResourceCache::new(CacheConfig::default()));

    let result = bilancio
        .load("valuation", &abc_annual(), &NoProgress)
        .await
        .unwrap();
    assert!(result.is_success());
    assert_eq!(result.outcomes.len(), 5);
    assert_eq!(result.errors().count(), 0);
    assert_eq!(mock.fetch_count(), 5);

    // Same parameters again: everything comes from the cache.
    let again = bilancio
        .load("valuation", &abc_annual(), &NoProgress)
        .await
        .unwrap();
    assert!(again.outcomes.values().all(|o| o.from_cache));
    assert_eq!(mock.fetch_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn two_sessions_share_one_price_history_fetch() {
    let cache = ResourceCache::new(CacheConfig::default());
    let (provider, controller) = DynamicMockProvider::new_with_controller("vci");
    let session_a = build(Arc::clone(&provider), cache.clone());
    let session_b = build(provider, cache.clone());
    controller
        .set_behavior(
            ABC,
            ResourceKind::PriceHistory,
            MockBehavior::Delay(
                Duration::from_millis(200),
                prices(&["2024-01-03", "2024-01-02", "2024-01-04"]),
            ),
        )
        .await;

    let params = abc_annual().range(DateRange::year(2024));
    let (a, b) = tokio::join!(
        session_a.load("technical", &params, &NoProgress),
        session_b.load("technical", &params, &NoProgress),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(controller.calls(ABC, ResourceKind::PriceHistory).await, 1);
    let pa = a.dataset(ResourceKind::PriceHistory).unwrap();
    let pb = b.dataset(ResourceKind::PriceHistory).unwrap();
    assert_eq!(pa, pb);
    assert_eq!(pa.len(), 3);
    assert_eq!(cache.stats().joined, 1);
}

#[tokio::test]
async fn different_periods_are_cached_separately() {
    let mock = Arc::new(MockProvider::new());
    let bilancio = build(mock.clone(), ResourceCache::new(CacheConfig::default()));

    let annual = bilancio
        .load("valuation", &abc_annual(), &NoProgress)
        .await
        .unwrap();
    let quarterly = bilancio
        .load(
            "valuation",
            &abc_annual().period(bilancio::Period::Quarterly),
            &NoProgress,
        )
        .await
        .unwrap();

    let a = annual.dataset(ResourceKind::IncomeStatement).unwrap();
    let q = quarterly.dataset(ResourceKind::IncomeStatement).unwrap();
    assert_eq!(a.len(), 3);
    assert_eq!(q.len(), 12);
    assert_eq!(q.latest().unwrap().key().unwrap().to_string(), "2023Q4");
    // Price history is not period-sensitive and was reused.
    assert!(
        quarterly
            .outcome(ResourceKind::PriceHistory)
            .unwrap()
            .from_cache
    );
}
