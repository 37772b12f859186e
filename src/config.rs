// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use url::Url;

const DEFAULT_ENDPOINT: &str =
    "https://investments.legalsuper.com.au/super/investment-performance/downloadPerformanceDataCSV/";
const DEFAULT_FUND_LABEL: &str = "Legal Super Pty Ltd";
const DEFAULT_TIMEOUT_SECS: u64 = 25;
const DEFAULT_PREAMBLE_LINES: usize = 3;

/// Request headers that make the download look like a normal Chrome page visit.
static BROWSING_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    // zstd is left out: the client can only decode these three
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Accept-Language", "en-GB,en-US;q=0.9,en;q=0.8"),
    (
        "Referer",
        "https://investments.legalsuper.com.au/super/investment-performance/",
    ),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "same-origin"),
    ("Sec-Fetch-User", "?1"),
    ("Upgrade-Insecure-Requests", "1"),
    (
        "User-Agent",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36",
    ),
    (
        "sec-ch-ua",
        r#""Google Chrome";v="143", "Chromium";v="143", "Not A(Brand";v="24""#,
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", r#""Linux""#),
];

/// Everything a run needs to know about where the report lives and where the
/// per-fund files go. Every field can be overridden from a YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL of the performance CSV download.
    pub endpoint: Url,
    /// Headers sent with the GET.
    pub headers: BTreeMap<String, String>,
    /// Directory receiving one `{fund}.csv` per fund.
    pub output_dir: PathBuf,
    /// Display name of the super fund, used in log lines.
    pub fund_label: String,
    pub timeout_secs: u64,
    /// Title/metadata lines preceding the column header row.
    pub preamble_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint should parse"),
            headers: BROWSING_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            output_dir: PathBuf::from(DEFAULT_FUND_LABEL),
            fund_label: DEFAULT_FUND_LABEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            preamble_lines: DEFAULT_PREAMBLE_LINES,
        }
    }
}

impl Config {
    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing YAML config")
    }

    /// Load from `path` if given, otherwise fall back to the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let text =
                    fs::read_to_string(p).with_context(|| format!("reading config {:?}", p))?;
                Self::from_yaml(&text).with_context(|| format!("in config file {:?}", p))
            }
            None => Ok(Self::default()),
        }
    }
}
