use bilancio_core::{LoadError, ResourceKind, Schema, TabularDataset, Value, columns};

#[test]
fn statements_require_fiscal_year() {
    let ds = TabularDataset::new(["quarter", "total_assets"]);
    let err = Schema::for_kind(ResourceKind::BalanceSheet)
        .validate(&ds)
        .unwrap_err();
    match err {
        LoadError::Schema { kind, msg } => {
            assert_eq!(kind, ResourceKind::BalanceSheet);
            assert!(msg.contains("year"), "{msg}");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn price_history_requires_time_and_close() {
    let schema = Schema::for_kind(ResourceKind::PriceHistory);
    assert_eq!(schema.required(), [columns::TIME, columns::CLOSE]);

    let ok = TabularDataset::new([columns::TIME, "open", columns::CLOSE]);
    assert!(schema.validate(&ok).is_ok());

    let missing_close = TabularDataset::new([columns::TIME, "open"]);
    assert!(schema.validate(&missing_close).is_err());
}

#[test]
fn duplicate_columns_are_rejected() {
    let ds = TabularDataset::from_rows(
        [columns::SYMBOL, columns::SYMBOL],
        vec![vec![Value::from("ABC"), Value::from("ABC")]],
    )
    .unwrap();
    let err = Schema::for_kind(ResourceKind::SymbolIndex)
        .validate(&ds)
        .unwrap_err();
    assert!(err.to_string().contains("duplicate column"), "{err}");
}

#[test]
fn empty_datasets_with_the_right_columns_are_valid() {
    for kind in ResourceKind::ALL {
        let schema = Schema::for_kind(kind);
        let ds = TabularDataset::new(schema.required().iter().copied());
        assert!(schema.validate(&ds).is_ok(), "{kind}");
    }
}
