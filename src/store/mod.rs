//! Redis-backed job store.
//!
//! The store is the single source of truth shared between the API process
//! and the per-job worker processes; there is no other channel between
//! them. All mutation goes through Redis atomic primitives (HSET, INCR,
//! RPUSH, HINCRBY) so the operations stay safe under concurrent callers
//! from multiple processes, with no client-side read-modify-write.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use uuid::Uuid;

use crate::models::event::TelemetryEvent;
use crate::models::job::{JobRecord, JobStatus};
use crate::models::verdict::Verdict;

/// Hash holding global, monotonically increasing counters.
const STATS_KEY: &str = "claim_verify:stats";

fn job_key(job_id: Uuid) -> String {
    format!("claim_verify:job:{}", job_id)
}

fn seq_key(job_id: Uuid) -> String {
    format!("claim_verify:job:{}:seq", job_id)
}

fn events_key(job_id: Uuid) -> String {
    format!("claim_verify:job:{}:events", job_id)
}

fn result_key(job_id: Uuid) -> String {
    format!("claim_verify:job:{}:result", job_id)
}

/// Async client for the shared job store.
#[derive(Clone)]
pub struct JobStore {
    client: redis::Client,
    job_ttl_secs: u64,
}

impl JobStore {
    pub fn new(redis_url: &str, job_ttl_secs: u64) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(StoreError::Redis)?;
        Ok(Self {
            client,
            job_ttl_secs,
        })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::Redis)
    }

    /// Create a new job record in `pending` state and return its id.
    ///
    /// Job keys expire after the configured TTL; jobs are never deleted
    /// programmatically.
    pub async fn create_job(&self, claim: &str) -> Result<Uuid, StoreError> {
        let job_id = Uuid::new_v4();
        let key = job_key(job_id);
        let mut conn = self.conn().await?;

        let fields = [
            ("claim", claim.to_string()),
            ("status", JobStatus::Pending.to_string()),
            ("created_at", Utc::now().to_rfc3339()),
        ];
        conn.hset_multiple::<_, _, _, ()>(&key, &fields).await?;
        conn.expire::<_, ()>(&key, self.job_ttl_secs as i64).await?;

        conn.hincr::<_, _, _, ()>(STATS_KEY, "jobs_submitted", 1)
            .await?;
        conn.hset::<_, _, _, ()>(STATS_KEY, "last_updated", Utc::now().to_rfc3339())
            .await?;

        Ok(job_id)
    }

    /// Update a job's status. Terminal transitions also stamp `completed_at`.
    pub async fn set_status(&self, job_id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        let key = job_key(job_id);
        let mut conn = self.conn().await?;

        if status.is_terminal() {
            let fields = [
                ("status", status.to_string()),
                ("completed_at", Utc::now().to_rfc3339()),
            ];
            conn.hset_multiple::<_, _, _, ()>(&key, &fields).await?;
        } else {
            conn.hset::<_, _, _, ()>(&key, "status", status.to_string())
                .await?;
        }
        Ok(())
    }

    /// Record the worker process PID for diagnostics.
    pub async fn set_worker_pid(&self, job_id: Uuid, pid: u32) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.hset::<_, _, _, ()>(&job_key(job_id), "worker_pid", pid)
            .await?;
        Ok(())
    }

    /// Record the error detail for a failed job.
    pub async fn record_error(&self, job_id: Uuid, detail: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.hset::<_, _, _, ()>(&job_key(job_id), "error", detail)
            .await?;
        Ok(())
    }

    /// Append a telemetry event, assigning it the next sequence number.
    ///
    /// The sequence number comes from an atomic INCR, so concurrent
    /// appenders always receive unique, increasing values without any
    /// client-side locking. Returns the assigned sequence number.
    pub async fn append_event(
        &self,
        job_id: Uuid,
        mut event: TelemetryEvent,
    ) -> Result<u64, StoreError> {
        let mut conn = self.conn().await?;

        let seq: u64 = conn.incr(seq_key(job_id), 1).await?;
        event.seq = seq;

        let serialized = serde_json::to_string(&event)?;
        conn.rpush::<_, _, ()>(events_key(job_id), &serialized)
            .await?;

        if seq == 1 {
            conn.expire::<_, ()>(seq_key(job_id), self.job_ttl_secs as i64)
                .await?;
            conn.expire::<_, ()>(events_key(job_id), self.job_ttl_secs as i64)
                .await?;
        }

        Ok(seq)
    }

    /// Fetch a job record, or `None` if the id is unknown.
    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.conn().await?;
        let map: HashMap<String, String> = conn.hgetall(job_key(job_id)).await?;
        if map.is_empty() {
            return Ok(None);
        }
        parse_job(job_id, &map).map(Some)
    }

    /// Fetch all telemetry events for a job, ordered by sequence number.
    ///
    /// Events that fail to deserialize are skipped with a warning rather
    /// than failing the read; telemetry is advisory, the job record is not.
    pub async fn get_events(&self, job_id: Uuid) -> Result<Vec<TelemetryEvent>, StoreError> {
        let mut conn = self.conn().await?;
        let raw: Vec<String> = conn.lrange(events_key(job_id), 0, -1).await?;

        let mut events: Vec<TelemetryEvent> = Vec::with_capacity(raw.len());
        for entry in &raw {
            match serde_json::from_str(entry) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "skipping unparseable telemetry event");
                }
            }
        }
        // List order can interleave under concurrent appends; seq order is
        // the contract readers rely on.
        events.sort_by_key(|e| e.seq);
        Ok(events)
    }

    /// Store the final verdict. Written before the terminal status so a
    /// reader observing `completed` always finds the result present.
    pub async fn set_result(&self, job_id: Uuid, verdict: &Verdict) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let serialized = serde_json::to_string(verdict)?;
        conn.set_ex::<_, _, ()>(result_key(job_id), serialized, self.job_ttl_secs)
            .await?;
        Ok(())
    }

    /// Fetch the final verdict, if one has been written.
    pub async fn get_result(&self, job_id: Uuid) -> Result<Option<Verdict>, StoreError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(result_key(job_id)).await?;
        match raw {
            Some(serialized) => Ok(Some(serde_json::from_str(&serialized)?)),
            None => Ok(None),
        }
    }

    /// Atomically increment a global counter.
    pub async fn increment_counter(&self, name: &str, by: i64) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.hincr::<_, _, _, ()>(STATS_KEY, name, by).await?;
        conn.hset::<_, _, _, ()>(STATS_KEY, "last_updated", Utc::now().to_rfc3339())
            .await?;
        Ok(())
    }

    /// Accumulate wall-clock duration of a completed job.
    pub async fn record_completed_duration(&self, millis: u64) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        conn.hincr::<_, _, _, ()>(STATS_KEY, "completed_duration_ms", millis as i64)
            .await?;
        Ok(())
    }

    /// Read the raw global counters hash.
    pub async fn read_counters(&self) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.conn().await?;
        let map: HashMap<String, String> = conn.hgetall(STATS_KEY).await?;
        Ok(map)
    }

    /// Check store connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(StoreError::Redis)?;
        Ok(())
    }
}

fn parse_job(job_id: Uuid, map: &HashMap<String, String>) -> Result<JobRecord, StoreError> {
    let claim = map
        .get("claim")
        .cloned()
        .ok_or_else(|| StoreError::Corrupt(format!("job {} missing claim field", job_id)))?;

    let status = map
        .get("status")
        .ok_or_else(|| StoreError::Corrupt(format!("job {} missing status field", job_id)))?
        .parse::<JobStatus>()
        .map_err(|_| StoreError::Corrupt(format!("job {} has unknown status", job_id)))?;

    let created_at = map
        .get("created_at")
        .ok_or_else(|| StoreError::Corrupt(format!("job {} missing created_at field", job_id)))
        .and_then(|raw| {
            parse_timestamp(raw).ok_or_else(|| {
                StoreError::Corrupt(format!("job {} has invalid created_at", job_id))
            })
        })?;

    let completed_at = map
        .get("completed_at")
        .filter(|s| !s.is_empty())
        .and_then(|raw| parse_timestamp(raw));

    let error = map.get("error").filter(|s| !s.is_empty()).cloned();

    let worker_pid = map.get("worker_pid").and_then(|s| s.parse::<u32>().ok());

    Ok(JobRecord {
        id: job_id,
        claim,
        status,
        created_at,
        completed_at,
        error,
        worker_pid,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Corrupt job record: {0}")]
    Corrupt(String),
}
