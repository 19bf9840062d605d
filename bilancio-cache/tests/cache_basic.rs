use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bilancio_cache::{EntryStatus, ResourceCache};
use bilancio_core::{
    CacheConfig, DateRange, Period, ResourceKey, ResourceKind, Source, TabularDataset, Value,
};

fn table(tag: i64) -> TabularDataset {
    TabularDataset::from_rows(
        ["time", "close"],
        vec![vec![Value::from("2024-01-02"), Value::from(tag)]],
    )
    .unwrap()
}

fn tag_of(ds: &TabularDataset) -> i64 {
    ds.value(0, "close").and_then(Value::as_i64).unwrap()
}

fn price_key() -> ResourceKey {
    ResourceKey::builder("ABC", ResourceKind::PriceHistory)
        .period(Period::Annual)
        .source(Source::Vci)
        .range(DateRange::year(2024))
        .build()
}

#[tokio::test]
async fn second_call_is_served_from_cache() {
    let cache = ResourceCache::new(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let c = Arc::clone(&calls);
        cache
            .get_or_load(price_key(), move || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(table(7))
            })
            .await
            .unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1, "second call should be cached");
    let stats = cache.stats();
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn first_fetch_is_not_from_cache() {
    let cache = ResourceCache::new(CacheConfig::default());
    let first = cache
        .get_or_load(price_key(), || async { Ok(table(1)) })
        .await
        .unwrap();
    assert!(!first.from_cache);
    let second = cache
        .get_or_load(price_key(), || async { Ok(table(2)) })
        .await
        .unwrap();
    assert!(second.from_cache);
    assert!(!second.stale);
    assert!(Arc::ptr_eq(&first.dataset, &second.dataset));
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_load() {
    let cache = ResourceCache::new(CacheConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            let c = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_load(price_key(), move || async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(table(42))
                    })
                    .await
            })
        })
        .collect();

    let mut datasets = Vec::new();
    for h in handles {
        datasets.push(h.await.unwrap().unwrap().dataset);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(datasets.iter().all(|d| Arc::ptr_eq(d, &datasets[0])));
    assert_eq!(tag_of(&datasets[0]), 42);
    assert_eq!(cache.stats().joined, 15);
}

#[tokio::test]
async fn keys_differing_in_range_load_separately() {
    let cache = ResourceCache::new(CacheConfig::default());
    let y2023 = ResourceKey::builder("ABC", ResourceKind::PriceHistory)
        .range(DateRange::year(2023))
        .build();

    let a = cache
        .get_or_load(price_key(), || async { Ok(table(2024)) })
        .await
        .unwrap();
    let b = cache
        .get_or_load(y2023, || async { Ok(table(2023)) })
        .await
        .unwrap();

    assert_eq!(tag_of(&a.dataset), 2024);
    assert_eq!(tag_of(&b.dataset), 2023);
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn entity_case_does_not_split_entries() {
    let cache = ResourceCache::new(CacheConfig::default());
    let lower = ResourceKey::new(" abc ", ResourceKind::BalanceSheet, Period::Annual, Source::Vci);
    let upper = ResourceKey::new("ABC", ResourceKind::BalanceSheet, Period::Annual, Source::Vci);

    cache
        .get_or_load(lower, || async { Ok(table(1)) })
        .await
        .unwrap();
    let hit = cache
        .get_or_load(upper, || async { Ok(table(2)) })
        .await
        .unwrap();
    assert!(hit.from_cache);
    assert_eq!(tag_of(&hit.dataset), 1);
}

#[tokio::test(start_paused = true)]
async fn get_reports_lifecycle_without_loading() {
    let cache = ResourceCache::new(CacheConfig::default());
    assert!(cache.get(&price_key()).await.is_none());

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let task = {
        let cache = cache.clone();
        tokio::spawn(async move {
            cache
                .get_or_load(price_key(), move || async move {
                    let _ = rx.await;
                    Ok(table(3))
                })
                .await
        })
    };
    tokio::task::yield_now().await;

    let entry = cache.get(&price_key()).await.unwrap();
    assert_eq!(entry.status, EntryStatus::Loading);
    assert!(entry.dataset.is_none());

    tx.send(()).unwrap();
    task.await.unwrap().unwrap();

    let entry = cache.get(&price_key()).await.unwrap();
    assert_eq!(entry.status, EntryStatus::Fresh);
    assert_eq!(tag_of(entry.dataset.as_deref().unwrap()), 3);
    assert_eq!(entry.ttl, Duration::from_secs(5 * 60));
}
