//! Aggregate statistics derived from the global counters hash.
//!
//! Counters are maintained at each status transition rather than by
//! scanning job records. They are advisory: a worker that died mid-run
//! keeps its job in the in-flight bucket until an external watchdog
//! resolves it, and concurrent increments may drift transiently. Not
//! billing-grade, documented as such.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::{JobStore, StoreError};

pub struct StatsService {
    store: Arc<JobStore>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PerStatusCounts {
    pub completed: u64,
    pub failed: u64,
    /// Jobs submitted but not yet terminal (includes stale jobs whose
    /// worker died before writing a terminal state).
    pub in_flight: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub per_status: PerStatusCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_duration_ms: Option<u64>,
    pub claims_analyzed: u64,
    pub urls_scraped: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl StatsService {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }

    /// System-wide statistics snapshot.
    pub async fn get_stats(&self) -> Result<StatsSnapshot, StoreError> {
        let counters = self.store.read_counters().await?;
        Ok(snapshot_from_counters(&counters))
    }
}

fn snapshot_from_counters(counters: &HashMap<String, String>) -> StatsSnapshot {
    let get = |name: &str| -> u64 {
        counters
            .get(name)
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(0)
    };

    let submitted = get("jobs_submitted");
    let completed = get("jobs_completed");
    let failed = get("jobs_failed");
    let duration_total = get("completed_duration_ms");

    let avg_duration_ms = if completed > 0 {
        Some(duration_total / completed)
    } else {
        None
    };

    StatsSnapshot {
        total: submitted,
        per_status: PerStatusCounts {
            completed,
            failed,
            in_flight: submitted.saturating_sub(completed + failed),
        },
        avg_duration_ms,
        claims_analyzed: get("claims_analyzed"),
        urls_scraped: get("urls_scraped"),
        last_updated: counters.get("last_updated").cloned(),
    }
}
