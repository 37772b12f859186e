// src/process/mod.rs
pub mod date_parser;
pub mod funds;
pub mod raw_table;
pub mod records;
pub mod write;

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use funds::{discover_funds, Side};
use raw_table::{load_report, RawTable};
use records::{clean_records, extract_records, FundRecord};

#[derive(Debug, Error)]
pub enum ReshapeError {
    #[error("report has no `Date` column")]
    MissingDateColumn,

    #[error("line {line}: {value:?} is not a DD/MM/YYYY date")]
    MalformedDate { line: u64, value: String },

    #[error("Missing Buy or Sell column for {name} (no `{missing}` column)")]
    MissingColumnPair { name: String, missing: Side },

    #[error("fund name {0:?} cannot be used as a file name")]
    UnsafeFundName(String),

    #[error("malformed report CSV")]
    Csv(#[from] csv::Error),
}

/// What the pure reshape produced for one fund.
#[derive(Debug)]
pub enum FundOutcome {
    /// Cleaned, sorted series ready to be written.
    Ready {
        name: String,
        records: Vec<FundRecord>,
    },
    /// Fund named by a header but lacking one of its columns.
    Skipped { name: String, reason: ReshapeError },
}

impl FundOutcome {
    pub fn name(&self) -> &str {
        match self {
            FundOutcome::Ready { name, .. } | FundOutcome::Skipped { name, .. } => name,
        }
    }
}

/// Normalized date for every row, in row order. Any bad date fails the whole table.
fn normalize_dates(table: &RawTable) -> Result<Vec<String>, ReshapeError> {
    let date_col = table
        .column("Date")
        .ok_or(ReshapeError::MissingDateColumn)?;
    table
        .rows
        .iter()
        .map(|row| {
            let value = row.fields.get(date_col).map(String::as_str).unwrap_or("");
            date_parser::normalize_date(value).ok_or_else(|| ReshapeError::MalformedDate {
                line: row.line,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Wide table → one outcome per discovered fund, ordered by fund name.
/// No I/O happens here.
pub fn reshape(table: &RawTable) -> Result<Vec<FundOutcome>, ReshapeError> {
    let dates = normalize_dates(table)?;
    let outcomes = discover_funds(&table.headers)
        .into_iter()
        .map(|(name, cols)| match cols.pair() {
            Ok(pair) => FundOutcome::Ready {
                records: clean_records(extract_records(table, &dates, pair)),
                name,
            },
            Err(missing) => FundOutcome::Skipped {
                reason: ReshapeError::MissingColumnPair {
                    name: name.clone(),
                    missing,
                },
                name,
            },
        })
        .collect();
    Ok(outcomes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrittenFund {
    pub name: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// Per-fund results of one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub written: Vec<WrittenFund>,
    /// Funds without a complete Buy/Sell pair.
    pub skipped: Vec<String>,
    /// Funds whose file could not be written, with the reason.
    pub failed: Vec<(String, String)>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len() + self.failed.len()
    }
}

/// Reshape `text` and write one CSV per fund under `config.output_dir`.
///
/// A malformed report (no `Date` column, bad date, broken CSV) fails before
/// anything touches the disk. Once the output directory exists, a fund that
/// cannot be written is recorded in [`RunSummary::failed`] and the rest carry on.
#[instrument(level = "info", skip(text, config), fields(out = %config.output_dir.display()))]
pub fn split_report(text: &str, config: &Config) -> Result<RunSummary> {
    let start = Instant::now();
    let table = load_report(text, config.preamble_lines).context("loading report")?;
    let outcomes = reshape(&table)?;

    let out_dir: &Path = &config.output_dir;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {:?}", out_dir))?;

    let total = outcomes.len();
    info!("Found {} funds to process", total);

    let mut summary = RunSummary::default();
    for (i, outcome) in outcomes.into_iter().enumerate() {
        info!("[{}/{}] Processing: {}", i + 1, total, outcome.name());
        match outcome {
            FundOutcome::Ready { name, records } => {
                match write::write_fund_csv(out_dir, &name, &records) {
                    Ok(path) => {
                        info!(
                            "  ✔ Successfully processed and saved: {} ({} rows)",
                            path.display(),
                            records.len()
                        );
                        summary.written.push(WrittenFund {
                            name,
                            path,
                            rows: records.len(),
                        });
                    }
                    Err(e) => {
                        error!("  ✘ Could not save {}: {:#}", name, e);
                        summary.failed.push((name, format!("{:#}", e)));
                    }
                }
            }
            FundOutcome::Skipped { name, reason } => {
                warn!("  ✘ {}", reason);
                summary.skipped.push(name);
            }
        }
    }

    info!(
        elapsed = ?start.elapsed(),
        "Processing complete. Files saved to {}/ directory",
        out_dir.display()
    );
    Ok(summary)
}
