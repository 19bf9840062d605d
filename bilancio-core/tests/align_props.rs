use bilancio_core::{
    LoadError, PeriodKey, ResourceKind, TabularDataset, TemporalKey, Value, align, columns,
};
use chrono::NaiveDate;
use proptest::prelude::*;

fn annual(years: &[i64]) -> TabularDataset {
    TabularDataset::from_rows(
        [columns::FISCAL_YEAR, "net_income"],
        years
            .iter()
            .map(|y| vec![Value::from(*y), Value::from(*y - 2000)])
            .collect(),
    )
    .unwrap()
}

#[test]
fn latest_and_earliest_ignore_input_order() {
    let aligned = align(annual(&[2021, 2023, 2022]), ResourceKind::BalanceSheet).unwrap();
    assert_eq!(aligned.earliest().unwrap().fiscal_year(), Some(2021));
    assert_eq!(aligned.latest().unwrap().fiscal_year(), Some(2023));
    assert_eq!(
        aligned.latest().unwrap().get("net_income"),
        Some(&Value::from(23))
    );
}

#[test]
fn realigning_is_a_no_op() {
    let once = align(annual(&[2021, 2023, 2022]), ResourceKind::BalanceSheet).unwrap();
    let twice = align(once.shared(), ResourceKind::BalanceSheet).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn textual_years_and_quarters_are_normalized() {
    let ds = TabularDataset::from_rows(
        [columns::FISCAL_YEAR, columns::FISCAL_PERIOD],
        vec![
            vec![Value::from("2024"), Value::from("Q1")],
            vec![Value::from("2023"), Value::Null],
            vec![Value::from(2023), Value::from(4)],
        ],
    )
    .unwrap();
    let aligned = align(ds, ResourceKind::IncomeStatement).unwrap();
    assert_eq!(
        aligned.keys(),
        [
            TemporalKey::Period(PeriodKey::annual(2023)),
            TemporalKey::Period(PeriodKey::quarter(2023, 4).unwrap()),
            TemporalKey::Period(PeriodKey::quarter(2024, 1).unwrap()),
        ]
    );
}

#[test]
fn missing_year_column_fails() {
    let ds = TabularDataset::from_rows(["quarter"], vec![vec![Value::from("Q1")]]).unwrap();
    let err = align(ds, ResourceKind::CashFlow).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Alignment {
            kind: ResourceKind::CashFlow,
            ..
        }
    ));
}

#[test]
fn unparsable_quarter_fails() {
    let ds = TabularDataset::from_rows(
        [columns::FISCAL_YEAR, columns::FISCAL_PERIOD],
        vec![vec![Value::from(2024), Value::from("H2")]],
    )
    .unwrap();
    assert!(align(ds, ResourceKind::Ratios).is_err());
}

#[test]
fn price_history_aligns_on_time() {
    let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
    let ds = TabularDataset::from_rows(
        [columns::TIME, columns::CLOSE],
        vec![
            vec![Value::from(day(3)), Value::from(12)],
            vec![Value::from(day(1)), Value::from(10)],
            vec![Value::from(day(2)), Value::from(11)],
        ],
    )
    .unwrap();
    let aligned = align(ds, ResourceKind::PriceHistory).unwrap();
    assert_eq!(
        aligned.latest().unwrap().get(columns::CLOSE),
        Some(&Value::from(12))
    );
    assert_eq!(aligned.earliest().unwrap().fiscal_year(), Some(2024));
}

#[test]
fn duplicate_timestamps_fail() {
    let ds = TabularDataset::from_rows(
        [columns::TIME, columns::CLOSE],
        vec![
            vec![Value::from("2024-01-02"), Value::from(1)],
            vec![Value::from("2024-01-02T00:00:00Z"), Value::from(2)],
        ],
    )
    .unwrap();
    assert!(matches!(
        align(ds, ResourceKind::PriceHistory),
        Err(LoadError::Alignment { .. })
    ));
}

#[test]
fn empty_dataset_has_no_latest() {
    let aligned = align(annual(&[]), ResourceKind::BalanceSheet).unwrap();
    assert!(aligned.is_empty());
    assert!(aligned.latest().is_none());
    assert!(aligned.earliest().is_none());
}

proptest! {
    #[test]
    fn any_permutation_aligns_to_the_same_result(
        years in prop::collection::btree_set(1990i64..2100, 1..20),
        seed in any::<u64>(),
    ) {
        let sorted: Vec<i64> = years.into_iter().collect();
        let mut shuffled = sorted.clone();
        // Deterministic Fisher-Yates driven by the seed.
        let mut s = seed;
        for i in (1..shuffled.len()).rev() {
            s = s.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let j = usize::try_from(s >> 33).unwrap() % (i + 1);
            shuffled.swap(i, j);
        }

        let a = align(annual(&shuffled), ResourceKind::IncomeStatement).unwrap();
        let b = align(annual(&sorted), ResourceKind::IncomeStatement).unwrap();
        prop_assert_eq!(&a, &b);

        let years: Vec<i32> = a.rows().filter_map(|r| r.fiscal_year()).collect();
        prop_assert!(years.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(i64::from(a.latest().unwrap().fiscal_year().unwrap()), *sorted.last().unwrap());
    }
}
