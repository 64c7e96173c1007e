use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use didrep::merge::{merge_directory, MergeOptions};
use didrep::Result;

#[derive(Parser, Debug)]
#[command(name = "tabcat", version, about = "Merge CSV/Excel files into one table")]
struct Cli {
    /// Directory to scan for .csv/.xlsx/.xls files.
    #[arg(value_name = "DIR", default_value = ".")]
    dir: PathBuf,
    /// Add Source_Sheet and Source_File columns to every row.
    #[arg(short = 's', long)]
    include_source: bool,
    /// Output path; an .xlsx extension writes Excel, anything else CSV.
    #[arg(short, long, default_value = "combined_reports.csv")]
    output: PathBuf,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run() {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let summary = merge_directory(&MergeOptions {
        dir: cli.dir,
        output: cli.output,
        include_source: cli.include_source,
    })?;
    info!(
        files = summary.files_merged,
        skipped = summary.files_skipped,
        rows = summary.rows,
        columns = summary.columns,
        output = %summary.output.display(),
        "merge complete"
    );
    Ok(())
}
