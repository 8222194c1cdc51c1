//! Centralized telemetry adapter.
//!
//! Every pipeline stage and tool invocation reports activity through this
//! single chokepoint, which owns the event schema and job attribution.
//! Each call performs one durable store append at call time; nothing is
//! buffered across the process boundary, so a worker crash cannot lose
//! events that were already reported.
//!
//! Telemetry is best-effort relative to pipeline correctness: a failed
//! write is logged locally and swallowed, never aborting the stage that
//! produced it. Job status transitions do NOT go through this adapter and
//! are not best-effort (see the worker entry point).

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::models::event::{EventKind, TelemetryEvent};
use crate::store::JobStore;

#[derive(Clone)]
pub struct Telemetry {
    store: Arc<JobStore>,
}

impl Telemetry {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }

    /// Append one event for a job. Failures are logged and swallowed.
    pub async fn log(
        &self,
        job_id: Uuid,
        stage: &str,
        tool: Option<&str>,
        kind: EventKind,
        payload: serde_json::Value,
    ) {
        let event = TelemetryEvent {
            seq: 0, // assigned by the store
            stage: stage.to_string(),
            tool: tool.map(str::to_string),
            kind,
            payload,
            timestamp: Utc::now(),
        };

        if let Err(e) = self.store.append_event(job_id, event).await {
            tracing::warn!(
                job_id = %job_id,
                stage = stage,
                error = %e,
                "telemetry write failed, continuing"
            );
        }
    }

    pub async fn stage_start(&self, job_id: Uuid, stage: &str) {
        self.log(job_id, stage, None, EventKind::Start, json!({}))
            .await;
    }

    pub async fn stage_end(&self, job_id: Uuid, stage: &str, payload: serde_json::Value) {
        self.log(job_id, stage, None, EventKind::End, payload).await;
    }

    pub async fn stage_error(&self, job_id: Uuid, stage: &str, message: &str) {
        self.log(
            job_id,
            stage,
            None,
            EventKind::Error,
            json!({ "message": message }),
        )
        .await;
    }

    /// Record a tool invocation within a stage.
    pub async fn tool_call(
        &self,
        job_id: Uuid,
        stage: &str,
        tool: &str,
        payload: serde_json::Value,
    ) {
        self.log(job_id, stage, Some(tool), EventKind::Info, payload)
            .await;
    }

    pub async fn tool_error(&self, job_id: Uuid, stage: &str, tool: &str, message: &str) {
        self.log(
            job_id,
            stage,
            Some(tool),
            EventKind::Error,
            json!({ "message": message }),
        )
        .await;
    }

    // Global counters. Best-effort like events: the execution path never
    // blocks on statistics bookkeeping.

    pub async fn increment_claims_analyzed(&self) {
        self.increment("claims_analyzed", 1).await;
    }

    pub async fn increment_urls_scraped(&self, count: i64) {
        self.increment("urls_scraped", count).await;
    }

    async fn increment(&self, name: &str, by: i64) {
        if let Err(e) = self.store.increment_counter(name, by).await {
            tracing::warn!(counter = name, error = %e, "counter increment failed");
        }
    }
}
