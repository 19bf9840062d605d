use bilancio_core::{TabularDataset, Value, columns};

const LISTINGS: [(&str, &str, &str); 4] = [
    ("ABC", "HOSE", "Banking"),
    ("XYZ", "HNX", "Real Estate"),
    ("DEF", "HOSE", "Steel"),
    ("GHI", "UPCOM", "Retail"),
];

pub fn index() -> Option<TabularDataset> {
    let rows = LISTINGS
        .iter()
        .map(|(symbol, exchange, industry)| {
            vec![
                Value::from(*symbol),
                Value::from(*exchange),
                Value::from(*industry),
            ]
        })
        .collect();
    TabularDataset::from_rows([columns::SYMBOL, "exchange", "industry"], rows).ok()
}
