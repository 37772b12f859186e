use chrono::NaiveDate;

/// `"DD/MM/YYYY"` → `"YYYYMMDD"`. `None` if the value is not a real calendar date
/// or carries any surrounding whitespace.
pub fn normalize_date(s: &str) -> Option<String> {
    if s.trim() != s {
        return None;
    }
    let date = NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()?;
    Some(date.format("%Y%m%d").to_string())
}
