mod helpers;

use std::time::Duration;

use bilancio::{
    CancellationToken, EntryStatus, LoadError, LoadPhase, LoadStatus, NoProgress, ResourceKind,
};
use bilancio_mock::MockBehavior;
use helpers::*;

#[tokio::test]
async fn cancelled_before_start_requests_nothing() {
    let (bilancio, controller) = scripted();
    let token = CancellationToken::new();
    token.cancel();

    let result = bilancio
        .load_with_cancel("valuation", &abc_annual(), &NoProgress, &token)
        .await
        .unwrap();

    assert!(result.cancelled);
    assert_eq!(result.phase, LoadPhase::LoadingHard);
    assert_eq!(result.outcomes.len(), 5);
    assert!(
        result
            .outcomes
            .values()
            .all(|o| matches!(o.error(), Some(LoadError::Cancelled { .. })))
    );
    assert!(controller.requests().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn in_flight_fetch_finishes_and_fills_the_cache_after_cancel() {
    let (bilancio, controller) = scripted();
    controller
        .set_behavior(
            ABC,
            ResourceKind::BalanceSheet,
            MockBehavior::Delay(Duration::from_secs(5), statements(&[2021, 2022, 2023])),
        )
        .await;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let result = bilancio
        .load_with_cancel("valuation", &abc_annual(), &NoProgress, &token)
        .await
        .unwrap();

    assert!(result.cancelled);
    assert_eq!(result.overall_status, LoadStatus::Failed);
    assert!(matches!(
        result.outcome(ResourceKind::BalanceSheet).unwrap().error(),
        Some(LoadError::Cancelled { .. })
    ));
    // Siblings that landed before the cancel are kept.
    assert!(result.dataset(ResourceKind::IncomeStatement).is_some());
    // No soft resources are requested after the cancel.
    assert!(matches!(
        result.outcome(ResourceKind::Ratios).unwrap().error(),
        Some(LoadError::Cancelled { .. })
    ));
    assert_eq!(controller.calls(ABC, ResourceKind::Ratios).await, 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let bs_key = result
        .outcome(ResourceKind::BalanceSheet)
        .unwrap()
        .key
        .clone();
    let entry = bilancio.cache().get(&bs_key).await.unwrap();
    assert_eq!(entry.status, EntryStatus::Fresh);
}
