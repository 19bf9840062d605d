use bilancio_core::{DateRange, TabularDataset, Value, columns};
use chrono::NaiveDate;
use rust_decimal::Decimal;

const DAYS: [&str; 6] = [
    "2023-12-27",
    "2023-12-28",
    "2023-12-29",
    "2024-01-02",
    "2024-01-03",
    "2024-01-04",
];

fn base(entity: &str) -> Option<i64> {
    match entity {
        "ABC" => Some(25_000),
        "XYZ" => Some(8_000),
        "TIMEOUT" => Some(1_000),
        _ => None,
    }
}

/// Daily bars for `entity` inside `range`, in ascending order.
pub fn by_entity(entity: &str, range: Option<DateRange>) -> Option<TabularDataset> {
    let base = base(entity)?;
    let mut ds = TabularDataset::new([columns::TIME, "open", columns::CLOSE, "volume"]);
    for (i, day) in DAYS.iter().enumerate() {
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
        if range.is_some_and(|r| !r.contains(date)) {
            continue;
        }
        let step = i64::try_from(i).unwrap_or(0);
        ds.push_row(vec![
            Value::from(date),
            Value::from(Decimal::new(base + step * 100, 0)),
            Value::from(Decimal::new(base + step * 100 + 50, 0)),
            Value::from(1_000_000 + step * 10_000),
        ])
        .ok()?;
    }
    Some(ds)
}
