use anyhow::{bail, Context, Result};
use clap::Parser;
use fundsplit::{fetch, process, Config};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Download the Legal Super unit price report and split it into one CSV per fund.
#[derive(Parser, Debug)]
#[command(name = "fundsplit")]
struct Args {
    /// YAML file overriding endpoint, headers, output directory, timeout or preamble size
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the per-fund files (default: the fund label)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Split a previously downloaded report instead of fetching one
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Also keep the downloaded report at this path
    #[arg(long)]
    save_raw: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_filter = if args.verbose { "debug" } else { "info" };
    let env =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    info!(fund = %config.fund_label, out = %config.output_dir.display(), "startup");

    // ─── 3) get the report text ──────────────────────────────────────
    let text = match &args.input {
        Some(path) => {
            info!("Reading {}...", path.display());
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading report {:?}", path))?
        }
        None => {
            info!("Fetching {}...", config.endpoint);
            let client = fetch::build_client(&config)?;
            fetch::download_report(&client, &config.endpoint)
                .await
                .context("Failed to download the file")?
        }
    };

    if let Some(dest) = &args.save_raw {
        fetch::save_report(&text, dest)
            .await
            .with_context(|| format!("saving raw report to {:?}", dest))?;
        info!("raw report saved to {}", dest.display());
    }

    // ─── 4) reshape + write on the blocking pool ─────────────────────
    let summary = tokio::task::spawn_blocking({
        let config = config.clone();
        move || process::split_report(&text, &config)
    })
    .await??;

    info!(
        written = summary.written.len(),
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        "all done"
    );
    if !summary.failed.is_empty() {
        for (name, reason) in &summary.failed {
            error!("{}: {}", name, reason);
        }
        bail!("{} of {} funds could not be written", summary.failed.len(), summary.total());
    }
    Ok(())
}
