//! Fixed three-stage claim verification pipeline.
//!
//! Stages run strictly in order (claim analysis, research, verdict)
//! inside the worker process. Each stage consumes the previous stage's
//! output and receives the job id explicitly so every telemetry event is
//! attributed to the right job. No state is shared across stages or
//! across jobs beyond what is threaded through here: a finished job
//! leaves nothing in memory for the next one to observe.

pub mod claim;
pub mod research;
pub mod verdict;

use serde_json::json;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::verdict::Verdict;
use crate::services::telemetry::Telemetry;

pub const STAGE_CLAIM: &str = "claim_analysis";
pub const STAGE_RESEARCH: &str = "research";
pub const STAGE_VERDICT: &str = "verdict";

/// A stage failed irrecoverably. The worker records this as job failure;
/// partial telemetry already written stays in the store for diagnosis.
#[derive(Debug, thiserror::Error)]
#[error("pipeline stage '{stage}' failed: {cause}")]
pub struct PipelineError {
    pub stage: &'static str,
    #[source]
    pub cause: Box<dyn std::error::Error + Send + Sync>,
}

impl PipelineError {
    pub fn new(
        stage: &'static str,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

pub struct Pipeline {
    telemetry: Telemetry,
    research: research::ResearchTools,
}

impl Pipeline {
    pub fn new(telemetry: Telemetry, config: &AppConfig) -> Result<Self, PipelineError> {
        let research = research::ResearchTools::new(config)
            .map_err(|e| PipelineError::new(STAGE_RESEARCH, e))?;
        Ok(Self {
            telemetry,
            research,
        })
    }

    /// Execute all stages for one job and return the final verdict.
    ///
    /// Tool-level failures degrade gracefully inside their stage (the
    /// verdict reflects missing evidence); an `Err` here means the job
    /// itself cannot produce a verdict and must be marked failed.
    pub async fn execute(&self, job_id: Uuid, claim_text: &str) -> Result<Verdict, PipelineError> {
        if claim_text.trim().is_empty() {
            return Err(PipelineError::new(STAGE_CLAIM, "claim text cannot be empty"));
        }

        // Stage 1: claim analysis
        self.telemetry.stage_start(job_id, STAGE_CLAIM).await;
        let analysis = claim::analyze(claim_text);
        self.telemetry.increment_claims_analyzed().await;
        self.telemetry
            .stage_end(
                job_id,
                STAGE_CLAIM,
                json!({
                    "entity_count": analysis.entity_count,
                    "entity_quality_score": analysis.entity_quality_score,
                    "sensationalism_score": analysis.sensationalism_score,
                    "warning": analysis.warning,
                }),
            )
            .await;

        // Stage 2: research
        self.telemetry.stage_start(job_id, STAGE_RESEARCH).await;
        let findings = self
            .research
            .run(&self.telemetry, job_id, &analysis)
            .await;
        self.telemetry
            .stage_end(
                job_id,
                STAGE_RESEARCH,
                json!({
                    "status": findings.status,
                    "sources_found": findings.total_sources_found,
                    "sources_scraped": findings.total_sources_scraped,
                }),
            )
            .await;

        // Stage 3: verdict
        self.telemetry.stage_start(job_id, STAGE_VERDICT).await;
        let verdict = verdict::decide(&analysis, &findings);
        self.telemetry
            .stage_end(
                job_id,
                STAGE_VERDICT,
                json!({
                    "verdict": verdict.verdict,
                    "confidence": verdict.confidence,
                }),
            )
            .await;

        Ok(verdict)
    }
}
