use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use didrep::config::RunConfig;
use didrep::process;
use didrep::request::{HttpLookupClient, LookupClient};
use didrep::Result;

#[derive(Parser, Debug)]
#[command(name = "didrep", version, about = "Phone number reputation checker")]
struct Cli {
    /// File with one phone number per line; the first CSV column is used.
    #[arg(short, long, default_value = "numbers.csv")]
    input: PathBuf,
    /// Results CSV, truncated at startup.
    #[arg(short, long, default_value = "results.csv")]
    output: PathBuf,
    /// Maximum lookups in flight at once.
    #[arg(short, long, default_value_t = 30)]
    concurrency: usize,
    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 15)]
    timeout: u64,
    /// Retries after a failed attempt.
    #[arg(long, default_value_t = 2)]
    max_retries: u32,
    /// Request starts per second, shared across all tasks.
    #[arg(short, long, default_value_t = 5.0)]
    rate: f64,
    /// Rows per output flush and progress report.
    #[arg(long, default_value_t = 100)]
    batch_size: usize,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        RunConfig {
            input_file: self.input,
            output_file: self.output,
            concurrent_requests: self.concurrency,
            timeout: Duration::from_secs(self.timeout),
            max_retries: self.max_retries,
            requests_per_second: self.rate,
            batch_size: self.batch_size,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = Cli::parse().into_config();
    for warning in config.validate()? {
        warn!("{}", warning);
    }

    let client: Arc<dyn LookupClient> = Arc::new(HttpLookupClient::new(config.timeout)?);

    tokio::select! {
        res = process::run(&config, client) => {
            let report = res?;
            info!(
                succeeded = report.succeeded,
                failed = report.failed,
                rows = report.rows_written,
                output = %config.output_file.display(),
                "done"
            );
            Ok(())
        }
        _ = shutdown_signal() => {
            // Flushed batches stay on disk; in-flight lookups are dropped.
            warn!("interrupted, abandoning in-flight lookups");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
