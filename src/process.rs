//! Batch lookup orchestration.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::config::RunConfig;
use crate::input;
use crate::limiter::RateLimiter;
use crate::parse::{self, MIN_PAGE_BYTES};
use crate::phone::PhoneNumber;
use crate::record::{marker, LookupResult};
use crate::request::{FetchError, LookupClient, Page};
use crate::sink;
use crate::stats::RunStats;
use crate::Result;

/// Cooldown imposed on the rate limiter after an HTTP 429.
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(10);

/// Final tallies for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub invalid: usize,
    pub rate_limited: usize,
    pub rows_written: usize,
    pub elapsed: Duration,
}

/// Reads the input list, runs every lookup under the concurrency cap and the
/// shared rate limit, and streams rows to the output CSV. A single lookup
/// never aborts the run; input and output file problems do.
///
/// Every input entry ends up as exactly one output row, invalid ones
/// included.
pub async fn run(config: &RunConfig, client: Arc<dyn LookupClient>) -> Result<RunReport> {
    let started = Instant::now();

    let entries = input::read_entries(&config.input_file)?;
    let total = entries.len();
    info!(count = total, input = %config.input_file.display(), "loaded input numbers");

    let (sink, writer) = sink::create_sink(&config.output_file, config.batch_size)?;
    let writer_handle = tokio::spawn(writer.run());

    let limiter = Arc::new(RateLimiter::new(config.requests_per_second));
    let semaphore = Arc::new(Semaphore::new(config.concurrent_requests));
    let stats = Arc::new(RunStats::default());
    let backoff = Backoff::default();

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    for entry in entries {
        let Some(number) = entry.number else {
            // Rejected before any network involvement, but still one row.
            debug!(entry = %entry.label, "invalid number, writing failed row");
            stats.record_invalid();
            sink.submit(LookupResult::failed(&entry.label, marker::INVALID))
                .await?;
            continue;
        };
        tasks.spawn({
            let client = client.clone();
            let limiter = limiter.clone();
            let semaphore = semaphore.clone();
            let stats = stats.clone();
            let sink = sink.clone();
            let max_retries = config.max_retries;
            async move {
                // Held from the first attempt to the terminal state.
                let _permit = semaphore.acquire_owned().await?;
                let row = lookup_number(
                    client.as_ref(),
                    &limiter,
                    &stats,
                    backoff,
                    max_retries,
                    &number,
                )
                .await;
                sink.submit(row).await?;
                Ok(())
            }
        });
    }
    drop(sink);

    let mut joined = 0usize;
    while let Some(task) = tasks.join_next().await {
        task??;
        joined += 1;
        if joined % config.batch_size == 0 {
            let snap = stats.snapshot();
            info!(
                done = snap.completed(),
                total,
                succeeded = snap.succeeded,
                failed = snap.failed,
                in_flight = config.concurrent_requests - semaphore.available_permits(),
                "progress"
            );
        }
    }

    let rows_written = writer_handle.await??;
    let snap = stats.snapshot();
    let elapsed = started.elapsed();
    info!(
        total,
        succeeded = snap.succeeded,
        failed = snap.failed,
        invalid = snap.invalid,
        rate_limited_hits = snap.rate_limited,
        rows_written,
        elapsed_secs = elapsed.as_secs_f64(),
        per_second = total as f64 / elapsed.as_secs_f64().max(0.001),
        "run finished"
    );

    Ok(RunReport {
        total,
        succeeded: snap.succeeded,
        failed: snap.failed,
        invalid: snap.invalid,
        rate_limited: snap.rate_limited,
        rows_written,
        elapsed,
    })
}

/// Per-task lookup lifecycle. A task starts `Pending`, walks through
/// `Attempting` and possibly `Retrying`, and ends in `Done`.
#[derive(Debug)]
enum TaskState {
    Pending,
    Attempting { attempt: u32 },
    Retrying { attempt: u32, delay: Duration },
    Done(LookupResult),
}

/// What a single attempt produced.
#[derive(Debug)]
enum Outcome {
    /// A 200 with a plausible listing body, ready to parse.
    Html(String),
    /// Permanent failure carrying the row marker to record.
    Terminal(String),
    /// Worth another attempt if budget remains.
    Retry(RetryCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryCause {
    RateLimited,
    Status(u16),
    Timeout,
    Connect,
    Transport,
}

/// Runs one number through the retry state machine and returns its row.
/// At most `1 + max_retries` attempts; every attempt acquires the rate
/// limiter before fetching.
async fn lookup_number(
    client: &dyn LookupClient,
    limiter: &RateLimiter,
    stats: &RunStats,
    backoff: Backoff,
    max_retries: u32,
    number: &PhoneNumber,
) -> LookupResult {
    let mut state = TaskState::Pending;
    loop {
        state = match state {
            TaskState::Pending => TaskState::Attempting { attempt: 0 },
            TaskState::Attempting { attempt } => {
                limiter.acquire().await;
                match classify(client.fetch(number).await) {
                    Outcome::Html(body) => match parse::extract_listing(body).await {
                        Ok(listing) => {
                            debug!(number = %number, reputation = %listing.reputation, "lookup succeeded");
                            stats.record_success();
                            TaskState::Done(LookupResult::success(number.as_str(), listing))
                        }
                        Err(e) => {
                            warn!(number = %number, error = %e, "page parse failed");
                            stats.record_failure();
                            TaskState::Done(LookupResult::failed(
                                number.as_str(),
                                marker::PARSE_ERROR,
                            ))
                        }
                    },
                    Outcome::Terminal(reason) => {
                        warn!(number = %number, %reason, "lookup failed terminally");
                        stats.record_failure();
                        TaskState::Done(LookupResult::failed(number.as_str(), &reason))
                    }
                    Outcome::Retry(cause) => {
                        if cause == RetryCause::RateLimited {
                            stats.record_rate_limited();
                            limiter.penalize(RATE_LIMIT_COOLDOWN).await;
                        }
                        if attempt < max_retries {
                            warn!(number = %number, attempt = attempt + 1, ?cause, "attempt failed, will retry");
                            TaskState::Retrying {
                                attempt,
                                delay: backoff.delay(attempt),
                            }
                        } else {
                            warn!(number = %number, attempts = attempt + 1, ?cause, "retry budget exhausted");
                            stats.record_failure();
                            TaskState::Done(LookupResult::failed(number.as_str(), marker::ERROR))
                        }
                    }
                }
            }
            TaskState::Retrying { attempt, delay } => {
                debug!(number = %number, attempt = attempt + 1, ?delay, "waiting before retry");
                sleep(delay).await;
                TaskState::Attempting {
                    attempt: attempt + 1,
                }
            }
            TaskState::Done(row) => return row,
        };
    }
}

/// Pure classification of one fetch attempt into the retry policy.
fn classify(fetched: core::result::Result<Page, FetchError>) -> Outcome {
    match fetched {
        Ok(page) => classify_page(page),
        Err(FetchError::Timeout) => Outcome::Retry(RetryCause::Timeout),
        Err(FetchError::Connect(_)) => Outcome::Retry(RetryCause::Connect),
        Err(FetchError::Transport(_)) => Outcome::Retry(RetryCause::Transport),
    }
}

fn classify_page(page: Page) -> Outcome {
    match page.status {
        200 => {
            if parse::is_block_page(&page.body) {
                Outcome::Terminal(marker::BLOCKED.to_string())
            } else if page.body.len() < MIN_PAGE_BYTES {
                Outcome::Terminal(marker::EMPTY_RESPONSE.to_string())
            } else {
                Outcome::Html(page.body)
            }
        }
        429 => Outcome::Retry(RetryCause::RateLimited),
        403 => Outcome::Retry(RetryCause::Status(403)),
        status @ 400..=499 => Outcome::Terminal(format!("HTTP {status}")),
        status @ 500..=599 => Outcome::Retry(RetryCause::Status(status)),
        status => Outcome::Terminal(format!("HTTP {status}")),
    }
}
