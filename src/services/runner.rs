//! Job runner: creates job records and launches isolated workers.
//!
//! Each job runs in its own OS process so a crash, infinite loop or
//! resource leak in one job's pipeline cannot corrupt or block any other
//! job or the API layer. The only coupling between processes is the
//! shared store; there is no return channel from the worker.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use uuid::Uuid;

use crate::models::job::JobStatus;
use crate::store::{JobStore, StoreError};

pub struct JobRunner {
    store: Arc<JobStore>,
    worker_bin: PathBuf,
}

impl JobRunner {
    /// Build a runner. The worker binary defaults to a `worker` executable
    /// next to the current one; `worker_bin` overrides it.
    pub fn new(store: Arc<JobStore>, worker_bin: Option<&str>) -> Result<Self, RunnerError> {
        let worker_bin = match worker_bin {
            Some(path) => PathBuf::from(path),
            None => default_worker_bin()?,
        };
        Ok(Self { store, worker_bin })
    }

    /// Create a job record and spawn its worker process.
    ///
    /// Returns as soon as the process is launched; callers poll the store
    /// for progress. The claim is validated before any record is created;
    /// a store failure aborts the call rather than proceeding without
    /// persistence.
    pub async fn start_job(&self, claim: &str) -> Result<Uuid, RunnerError> {
        let claim = claim.trim();
        if claim.is_empty() {
            return Err(RunnerError::EmptyClaim);
        }

        let job_id = self.store.create_job(claim).await?;
        metrics::counter!("claim_jobs_submitted").increment(1);

        let spawned = Command::new(&self.worker_bin)
            .arg("--job-id")
            .arg(job_id.to_string())
            .arg("--claim")
            .arg(claim)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn();

        match spawned {
            Ok(child) => {
                let pid = child.id().unwrap_or(0);
                if pid != 0 {
                    if let Err(e) = self.store.set_worker_pid(job_id, pid).await {
                        tracing::warn!(job_id = %job_id, error = %e, "failed to record worker pid");
                    }
                }
                tracing::info!(job_id = %job_id, pid = pid, "worker spawned");
                Ok(job_id)
            }
            Err(e) => {
                metrics::counter!("claim_worker_spawn_failures").increment(1);
                tracing::error!(job_id = %job_id, error = %e, "failed to spawn worker");

                // Don't leave a pending record that no process will ever
                // pick up; surface the failure on the job itself.
                let detail = format!("failed to spawn worker process: {}", e);
                if let Err(se) = self.store.record_error(job_id, &detail).await {
                    tracing::error!(job_id = %job_id, error = %se, "failed to record spawn error");
                }
                if let Err(se) = self.store.set_status(job_id, JobStatus::Failed).await {
                    tracing::error!(job_id = %job_id, error = %se, "failed to mark job failed");
                }

                Err(RunnerError::Spawn(e))
            }
        }
    }
}

fn default_worker_bin() -> Result<PathBuf, RunnerError> {
    let exe = std::env::current_exe().map_err(RunnerError::Spawn)?;
    match exe.parent() {
        Some(dir) => Ok(dir.join("worker")),
        None => Ok(PathBuf::from("worker")),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("claim must not be empty")]
    EmptyClaim,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to spawn worker process: {0}")]
    Spawn(#[from] std::io::Error),
}
