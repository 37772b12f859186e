use crate::process::raw_table::RawTable;

/// Cells pandas-style readers treat as missing, on top of the empty string.
const NULL_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One cleaned price row for a single fund.
#[derive(Debug, Clone, PartialEq)]
pub struct FundRecord {
    /// `YYYYMMDD`
    pub date: String,
    pub buy: Option<f64>,
    pub sell: Option<f64>,
}

impl FundRecord {
    pub fn new(date: impl Into<String>, buy: Option<f64>, sell: Option<f64>) -> Self {
        Self {
            date: date.into(),
            buy,
            sell,
        }
    }
}

/// Blank, null-like, non-numeric and NaN cells all read as `None`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || NULL_TOKENS.contains(&s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Pull `(date, buy, sell)` for every row. `dates[i]` is the normalized date of
/// `table.rows[i]`.
pub fn extract_records(
    table: &RawTable,
    dates: &[String],
    (buy_col, sell_col): (usize, usize),
) -> Vec<FundRecord> {
    table
        .rows
        .iter()
        .zip(dates)
        .map(|(row, date)| {
            let cell = |idx: usize| row.fields.get(idx).and_then(|s| parse_price(s));
            FundRecord::new(date.clone(), cell(buy_col), cell(sell_col))
        })
        .collect()
}

/// Apply the row rules in order:
/// 1. drop rows with neither price,
/// 2. drop rows where both prices are exactly zero,
/// 3. a zero Sell takes the Buy price (a zero Buy is left alone),
/// 4. stable sort by date.
pub fn clean_records(records: Vec<FundRecord>) -> Vec<FundRecord> {
    let mut out: Vec<FundRecord> = records
        .into_iter()
        .filter(|r| r.buy.is_some() || r.sell.is_some())
        .filter(|r| !(r.buy == Some(0.0) && r.sell == Some(0.0)))
        .map(|mut r| {
            if r.sell == Some(0.0) {
                r.sell = r.buy;
            }
            r
        })
        .collect();
    out.sort_by(|a, b| a.date.cmp(&b.date));
    out
}
