//! Per-job worker process.
//!
//! Launched by the API server with `--job-id` and `--claim` as its only
//! inputs; the shared store is the only channel back. Runs the pipeline
//! once and exits. Crashes here are contained to this one job: the job
//! record is left observably stuck (a stale job an external watchdog can
//! detect), while the API and every other job keep running.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use claim_verify::config::AppConfig;
use claim_verify::models::job::JobStatus;
use claim_verify::pipeline::Pipeline;
use claim_verify::services::telemetry::Telemetry;
use claim_verify::store::{JobStore, StoreError};

/// Terminal-state writes are retried: an unpersisted terminal state is
/// the single worst failure mode (the job appears stuck forever).
const STATE_WRITE_RETRIES: u32 = 3;
const STATE_RETRY_DELAY_MS: u64 = 500;

struct WorkerArgs {
    job_id: Uuid,
    claim: String,
}

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("usage: worker --job-id <uuid> --claim <text>");
            std::process::exit(2);
        }
    };

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    let store = Arc::new(
        JobStore::new(&config.redis_url, config.job_ttl_secs)
            .expect("Failed to initialize job store"),
    );
    let telemetry = Telemetry::new(store.clone());

    tracing::info!(
        job_id = %args.job_id,
        pid = std::process::id(),
        "worker starting"
    );

    // Without a persisted RUNNING transition the job would sit in
    // pending forever while we do work nobody can observe; give up
    // instead and leave a detectable stale job.
    if with_retry("set_status(running)", || {
        store.set_status(args.job_id, JobStatus::Running)
    })
    .await
    .is_err()
    {
        tracing::error!(job_id = %args.job_id, "could not mark job running, exiting");
        std::process::exit(1);
    }

    let started = std::time::Instant::now();

    let outcome = match Pipeline::new(telemetry.clone(), &config) {
        Ok(pipeline) => pipeline.execute(args.job_id, &args.claim).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(verdict) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;

            // Result first, status second: a reader observing `completed`
            // must always find the result already present.
            let result_write =
                with_retry("set_result", || store.set_result(args.job_id, &verdict)).await;
            let status_write = with_retry("set_status(completed)", || {
                store.set_status(args.job_id, JobStatus::Completed)
            })
            .await;

            if result_write.is_err() || status_write.is_err() {
                tracing::error!(
                    job_id = %args.job_id,
                    "terminal state could not be persisted; job will appear stuck"
                );
                std::process::exit(1);
            }

            if let Err(e) = store.increment_counter("jobs_completed", 1).await {
                tracing::warn!(job_id = %args.job_id, error = %e, "counter update failed");
            }
            if let Err(e) = store.record_completed_duration(elapsed_ms).await {
                tracing::warn!(job_id = %args.job_id, error = %e, "duration update failed");
            }

            tracing::info!(
                job_id = %args.job_id,
                verdict = %verdict.verdict,
                confidence = verdict.confidence,
                elapsed_ms = elapsed_ms,
                "job completed"
            );
        }
        Err(e) => {
            tracing::error!(job_id = %args.job_id, error = %e, "pipeline failed");
            telemetry
                .stage_error(args.job_id, e.stage, &e.to_string())
                .await;

            // Error detail first, status second, for the same visibility
            // reason as the success path.
            let detail = e.to_string();
            let error_write =
                with_retry("record_error", || store.record_error(args.job_id, &detail)).await;
            let status_write = with_retry("set_status(failed)", || {
                store.set_status(args.job_id, JobStatus::Failed)
            })
            .await;

            if error_write.is_err() || status_write.is_err() {
                tracing::error!(
                    job_id = %args.job_id,
                    "terminal state could not be persisted; job will appear stuck"
                );
                std::process::exit(1);
            }

            if let Err(se) = store.increment_counter("jobs_failed", 1).await {
                tracing::warn!(job_id = %args.job_id, error = %se, "counter update failed");
            }

            tracing::info!(job_id = %args.job_id, "job marked failed");
        }
    }
}

/// Retry a store write a bounded number of times with linear backoff.
async fn with_retry<F, Fut>(op: &str, mut call: F) -> Result<(), StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), StoreError>>,
{
    let mut attempt = 0u32;
    loop {
        match call().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                attempt += 1;
                if attempt >= STATE_WRITE_RETRIES {
                    tracing::error!(op = op, error = %e, "store write failed after retries");
                    return Err(e);
                }
                tracing::warn!(op = op, attempt = attempt, error = %e, "store write failed, retrying");
                sleep(Duration::from_millis(STATE_RETRY_DELAY_MS * attempt as u64)).await;
            }
        }
    }
}

fn parse_args() -> Result<WorkerArgs, String> {
    let mut job_id = None;
    let mut claim = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--job-id" => {
                job_id = Some(args.next().ok_or("--job-id requires a value")?);
            }
            "--claim" => {
                claim = Some(args.next().ok_or("--claim requires a value")?);
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    let job_id = job_id
        .ok_or("--job-id is required")?
        .parse::<Uuid>()
        .map_err(|e| format!("invalid job id: {}", e))?;
    let claim = claim.ok_or("--claim is required")?;

    Ok(WorkerArgs { job_id, claim })
}
