use csv::ReaderBuilder;
use tracing::debug;

use crate::process::ReshapeError;

/// One data line of the report, fields kept as text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line number in the original report, preamble included.
    pub line: u64,
    pub fields: Vec<String>,
}

/// The wide report as downloaded: a `Date` column plus a Buy/Sell pair per fund.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Index of the first column named exactly `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Drop the first `lines` physical lines (title and metadata above the header row).
pub fn skip_preamble(text: &str, lines: usize) -> &str {
    let offset: usize = text.split_inclusive('\n').take(lines).map(str::len).sum();
    &text[offset..]
}

/// Parse the report body: skip the preamble, take the next line as headers and
/// every following non-blank record as a row. Short rows are fine; missing
/// trailing cells read as blank.
pub fn load_report(text: &str, preamble_lines: usize) -> Result<RawTable, ReshapeError> {
    let body = skip_preamble(text, preamble_lines);
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        // rows of nothing but separators carry no date and no prices
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0) + preamble_lines as u64;
        rows.push(RawRow {
            line,
            fields: record.iter().map(str::to_string).collect(),
        });
    }

    debug!(columns = headers.len(), rows = rows.len(), "loaded report");
    Ok(RawTable { headers, rows })
}
