use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Status of a claim verification job.
///
/// Transitions are monotonic: `pending → running → {completed, failed}`.
/// A job never moves backward and has at most one running period. A job
/// observed stuck in `pending` or `running` far beyond its expected
/// duration indicates a worker that died before persisting a terminal
/// state; this core does not recover such jobs, it only keeps enough
/// data (`created_at`, event timestamps, `worker_pid`) for an external
/// watchdog to detect them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A claim verification job as stored in Redis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub claim: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// PID of the worker process once spawned. Diagnostic only.
    pub worker_pid: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            let text = status.to_string();
            assert_eq!(text.parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_string_form() {
        assert_eq!(JobStatus::Running.to_string(), "running");
        assert_eq!("failed".parse::<JobStatus>().unwrap(), JobStatus::Failed);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
