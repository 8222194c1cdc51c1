use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of telemetry event emitted by a pipeline stage or tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    End,
    Error,
    Info,
}

/// A single telemetry event attributed to one job.
///
/// Events are append-only and never mutated. `seq` is allocated by an
/// atomic counter in the store, so sorting by `seq` always yields a
/// strict total order within a job even when appends from concurrent
/// tool calls interleave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub seq: u64,
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
