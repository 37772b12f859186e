use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::BTreeMap, fmt};

/// `"<fund> (Buy Price)"` or `"<fund> (Sell Price)"`, nothing after the suffix.
static FUND_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+) \((Buy|Sell) Price\)$").expect("fund header pattern should compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("Buy Price"),
            Side::Sell => f.write_str("Sell Price"),
        }
    }
}

/// Where a fund's two price columns sit in the raw table. Either may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FundColumns {
    pub buy: Option<usize>,
    pub sell: Option<usize>,
}

impl FundColumns {
    /// `(buy, sell)` indices, or the side that has no column.
    pub fn pair(&self) -> Result<(usize, usize), Side> {
        match (self.buy, self.sell) {
            (Some(buy), Some(sell)) => Ok((buy, sell)),
            (None, _) => Err(Side::Buy),
            (_, None) => Err(Side::Sell),
        }
    }
}

/// Split a header into fund name and side. `Date` and anything without the
/// exact price suffix yield `None`.
pub fn parse_fund_header(header: &str) -> Option<(&str, Side)> {
    if header == "Date" {
        return None;
    }
    let caps = FUND_HEADER.captures(header)?;
    let side = match &caps[2] {
        "Buy" => Side::Buy,
        _ => Side::Sell,
    };
    Some((caps.get(1)?.as_str(), side))
}

/// Every fund named by at least one price column, keyed (and so ordered) by name.
/// When a header is repeated the first occurrence wins.
pub fn discover_funds(headers: &[String]) -> BTreeMap<String, FundColumns> {
    let mut funds: BTreeMap<String, FundColumns> = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let Some((name, side)) = parse_fund_header(header) else {
            continue;
        };
        let cols = funds.entry(name.to_string()).or_default();
        let slot = match side {
            Side::Buy => &mut cols.buy,
            Side::Sell => &mut cols.sell,
        };
        slot.get_or_insert(idx);
    }
    funds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fund_with_one_side_is_discovered_but_not_paired() {
        let funds = discover_funds(&headers(&[
            "Date",
            "A (Buy Price)",
            "A (Sell Price)",
            "B (Buy Price)",
        ]));
        assert_eq!(funds.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(funds["A"].pair(), Ok((1, 2)));
        assert_eq!(funds["B"].pair(), Err(Side::Sell));
    }

    #[test]
    fn non_matching_headers_are_ignored() {
        let funds = discover_funds(&headers(&[
            "Date",
            "Notes",
            "C (Buy Price) old",
            "C(Buy Price)",
            " (Buy Price)",
            "D (Mid Price)",
        ]));
        assert!(funds.is_empty());
    }

    #[test]
    fn names_keep_spaces_and_parentheses() {
        let (name, side) = parse_fund_header("MySuper (Balanced) (Sell Price)").unwrap();
        assert_eq!(name, "MySuper (Balanced)");
        assert_eq!(side, Side::Sell);
    }

    #[test]
    fn names_come_back_sorted_regardless_of_column_order() {
        let funds = discover_funds(&headers(&[
            "Zeta (Sell Price)",
            "Date",
            "Alpha (Buy Price)",
            "Zeta (Buy Price)",
            "Alpha (Sell Price)",
        ]));
        assert_eq!(funds.keys().collect::<Vec<_>>(), vec!["Alpha", "Zeta"]);
        assert_eq!(
            funds["Zeta"],
            FundColumns {
                buy: Some(3),
                sell: Some(0)
            }
        );
    }

    #[test]
    fn repeated_header_keeps_first_column() {
        let funds = discover_funds(&headers(&["E (Buy Price)", "E (Buy Price)", "E (Sell Price)"]));
        assert_eq!(funds["E"].pair(), Ok((0, 2)));
    }
}
