//! Read-only status and result queries.
//!
//! Translates stored job state into the client-facing view. Reads go
//! straight to the store on every call; there is no caching layer that
//! could serve a stale terminal status.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::event::TelemetryEvent;
use crate::models::job::{JobRecord, JobStatus};
use crate::models::verdict::Verdict;
use crate::store::{JobStore, StoreError};

pub struct JobQuery {
    store: Arc<JobStore>,
}

/// A job record together with its ordered telemetry events.
#[derive(Debug)]
pub struct JobStatusView {
    pub job: JobRecord,
    pub events: Vec<TelemetryEvent>,
}

impl JobQuery {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }

    /// Current status and event log for a job.
    pub async fn get_status(&self, job_id: Uuid) -> Result<JobStatusView, QueryError> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(QueryError::NotFound)?;
        let events = self.store.get_events(job_id).await?;
        Ok(JobStatusView { job, events })
    }

    /// Final verdict for a job.
    ///
    /// Fails with `NotReady` while the job is still in flight and with
    /// `JobFailed` once the worker recorded a failure. Repeated calls on a
    /// completed job return the identical stored verdict.
    pub async fn get_result(&self, job_id: Uuid) -> Result<Verdict, QueryError> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(QueryError::NotFound)?;

        match job.status {
            JobStatus::Pending | JobStatus::Running => Err(QueryError::NotReady),
            JobStatus::Failed => Err(QueryError::JobFailed {
                error: job
                    .error
                    .unwrap_or_else(|| "job failed without error detail".to_string()),
            }),
            JobStatus::Completed => {
                // The worker writes the result before the completed status,
                // so this read should always succeed; treat a gap as still
                // in flight rather than serving a partial result.
                self.store
                    .get_result(job_id)
                    .await?
                    .ok_or(QueryError::NotReady)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("job not found")]
    NotFound,

    #[error("job has not reached a terminal state")]
    NotReady,

    #[error("job failed: {error}")]
    JobFailed { error: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
