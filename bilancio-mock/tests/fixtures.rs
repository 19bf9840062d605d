use bilancio_core::{
    DataProvider, DateRange, LoadError, Period, ProgressSink, ResourceKind, ResourceSpec, Schema,
    Source, Value, align, columns,
};
use bilancio_mock::{FAIL_ENTITY, MockProvider, RecordingProgress};

fn spec(entity: &str, kind: ResourceKind, period: Period) -> ResourceSpec {
    ResourceSpec::new(entity, kind, period, Source::Vci, None, Default::default())
}

#[tokio::test]
async fn fixtures_satisfy_their_schemas() {
    let mock = MockProvider::new();
    for kind in ResourceKind::ALL {
        let ds = mock.fetch(&spec("ABC", kind, Period::Annual)).await.unwrap();
        Schema::for_kind(kind).validate(&ds).unwrap();
        align(ds, kind).unwrap();
    }
    assert_eq!(mock.fetch_count(), ResourceKind::ALL.len());
}

#[tokio::test]
async fn symbol_index_lists_every_listing() {
    let mock = MockProvider::new();
    let ds = mock
        .fetch(&spec("ANY", ResourceKind::SymbolIndex, Period::NotApplicable))
        .await
        .unwrap();
    assert_eq!(ds.len(), 4);
    assert_eq!(ds.value(0, "exchange").and_then(Value::as_str), Some("HOSE"));
}

#[tokio::test]
async fn statements_are_returned_newest_first() {
    let mock = MockProvider::new();
    let ds = mock
        .fetch(&spec("ABC", ResourceKind::IncomeStatement, Period::Annual))
        .await
        .unwrap();
    let first = ds.value(0, columns::FISCAL_YEAR).and_then(|v| v.as_i64());
    assert_eq!(first, Some(2023));

    let aligned = align(ds, ResourceKind::IncomeStatement).unwrap();
    assert_eq!(aligned.earliest().unwrap().fiscal_year(), Some(2021));
}

#[tokio::test]
async fn quarterly_statements_have_four_rows_per_year() {
    let mock = MockProvider::new();
    let ds = mock
        .fetch(&spec("XYZ", ResourceKind::BalanceSheet, Period::Quarterly))
        .await
        .unwrap();
    assert_eq!(ds.len(), 12);
    let aligned = align(ds, ResourceKind::BalanceSheet).unwrap();
    assert_eq!(aligned.latest().unwrap().key().unwrap().to_string(), "2023Q4");
}

#[tokio::test]
async fn price_history_honors_range() {
    let mock = MockProvider::new();
    let s = ResourceSpec::new(
        "ABC",
        ResourceKind::PriceHistory,
        Period::Annual,
        Source::Vci,
        DateRange::year(2024),
        Default::default(),
    );
    let ds = mock.fetch(&s).await.unwrap();
    assert_eq!(ds.len(), 3);
}

#[tokio::test]
async fn forced_failure_and_unknown_entities() {
    let mock = MockProvider::new();
    let err = mock
        .fetch(&spec(FAIL_ENTITY, ResourceKind::CashFlow, Period::Annual))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Provider { .. }));

    let err = mock
        .fetch(&spec("NOPE", ResourceKind::CashFlow, Period::Annual))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::NotFound { .. }));
}

#[test]
fn recording_progress_keeps_order() {
    let sink = RecordingProgress::new();
    sink.report_progress("balance-sheet", 25.0, "loaded");
    sink.report_progress("cash-flow", 50.0, "failed");
    assert_eq!(sink.percents(), [25.0, 50.0]);
    assert_eq!(sink.events()[1].stage, "cash-flow");
}
