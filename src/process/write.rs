use anyhow::{Context, Result};
use csv::{Terminator, WriterBuilder};
use std::path::{Path, PathBuf};

use crate::process::{records::FundRecord, ReshapeError};

/// File name for a fund's series. Names that could escape the output
/// directory or are not valid file names are refused rather than rewritten.
pub fn fund_file_name(name: &str) -> Result<String, ReshapeError> {
    let unsafe_name = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(ReshapeError::UnsafeFundName(name.to_string()));
    }
    Ok(format!("{}.csv", name))
}

/// Integral prices keep one decimal place (`1.0`), everything else prints at
/// shortest round-trip precision in plain decimal notation: `0.00001`, never
/// `1e-05`. Unit prices stay far from the magnitudes where that differs.
pub fn format_price(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

/// Write `Date,Buy,Sell` plus one line per record to `<out_dir>/<fund>.csv`,
/// replacing any previous file. Missing prices are empty fields.
pub fn write_fund_csv(out_dir: &Path, fund: &str, records: &[FundRecord]) -> Result<PathBuf> {
    let path = out_dir.join(fund_file_name(fund)?);
    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_path(&path)
        .with_context(|| format!("creating {:?}", path))?;

    wtr.write_record(["Date", "Buy", "Sell"])?;
    for r in records {
        let buy = r.buy.map(format_price).unwrap_or_default();
        let sell = r.sell.map(format_price).unwrap_or_default();
        wtr.write_record([r.date.as_str(), buy.as_str(), sell.as_str()])
            .with_context(|| format!("writing {} row to {:?}", r.date, path))?;
    }
    wtr.flush().with_context(|| format!("flushing {:?}", path))?;
    Ok(path)
}
