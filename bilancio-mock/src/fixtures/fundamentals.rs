use bilancio_core::{Period, ResourceKind, TabularDataset, Value, columns};
use rust_decimal::Decimal;

const YEARS: [i32; 3] = [2021, 2022, 2023];

/// Scale factor per known entity, in billions.
fn scale(entity: &str) -> Option<i64> {
    match entity {
        "ABC" => Some(100),
        "XYZ" => Some(40),
        "TIMEOUT" => Some(1),
        _ => None,
    }
}

/// Statement or ratio rows for `entity`, newest first as upstream sources return them.
pub fn by_entity(entity: &str, kind: ResourceKind, period: Period) -> Option<TabularDataset> {
    let scale = scale(entity)?;
    let metrics: &[&str] = match kind {
        ResourceKind::BalanceSheet => &["total_assets", "total_liabilities", "equity"],
        ResourceKind::IncomeStatement => &["revenue", "operating_income", "net_income"],
        ResourceKind::CashFlow => &["operating_cash_flow", "capex", "free_cash_flow"],
        ResourceKind::Ratios => &["pe", "pb", "roe"],
        _ => return None,
    };

    let mut cols = vec![columns::FISCAL_YEAR, columns::FISCAL_PERIOD];
    cols.extend_from_slice(metrics);
    let mut ds = TabularDataset::new(cols);

    let quarters: &[u8] = match period {
        Period::Quarterly => &[4, 3, 2, 1],
        _ => &[0],
    };
    for year in YEARS.iter().rev() {
        for q in quarters {
            let mut row = vec![Value::from(*year), quarter_cell(*q)];
            row.extend((0..metrics.len()).map(|i| Value::from(metric(kind, scale, *year, *q, i))));
            ds.push_row(row).ok()?;
        }
    }
    Some(ds)
}

fn quarter_cell(q: u8) -> Value {
    if q == 0 {
        Value::Null
    } else {
        Value::from(format!("Q{q}"))
    }
}

fn metric(kind: ResourceKind, scale: i64, year: i32, quarter: u8, column: usize) -> Decimal {
    let growth = i64::from(year - 2020);
    let col = i64::try_from(column).unwrap_or(0);
    let divisor = if quarter == 0 { 1 } else { 4 };
    match kind {
        // Ratios are small and carry two decimals.
        ResourceKind::Ratios => Decimal::new(800 + 150 * col + 25 * growth, 2),
        _ => Decimal::from(scale * (10 - 3 * col) * growth * 1_000 / divisor),
    }
}
