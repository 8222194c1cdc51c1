//! Test helper utilities for E2E testing

use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use uuid::Uuid;

/// Response from POST /api/v1/jobs
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: String,
}

/// Response from GET /api/v1/jobs/{job_id}
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub job_id: Uuid,
    pub status: String,
    pub claim: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

/// Response from GET /api/v1/jobs/{job_id}/result
#[derive(Debug, Deserialize)]
pub struct ResultResponse {
    pub job_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Get base URL from env or default to localhost
pub fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Submit a claim for verification.
pub async fn submit_claim(
    client: &reqwest::Client,
    base_url: &str,
    claim: &str,
) -> Result<SubmitResponse, Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{}/api/v1/jobs", base_url))
        .json(&serde_json::json!({ "claim": claim }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(format!("submission failed with HTTP {}", response.status()).into());
    }
    Ok(response.json().await?)
}

/// Fetch current job status.
pub async fn get_status(
    client: &reqwest::Client,
    base_url: &str,
    job_id: Uuid,
) -> Result<StatusResponse, Box<dyn std::error::Error>> {
    let response = client
        .get(format!("{}/api/v1/jobs/{}", base_url, job_id))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(format!("status query failed with HTTP {}", response.status()).into());
    }
    Ok(response.json().await?)
}

/// Poll until the job reaches a terminal state or the timeout expires.
pub async fn wait_for_terminal(
    client: &reqwest::Client,
    base_url: &str,
    job_id: Uuid,
    timeout_secs: u64,
) -> Result<StatusResponse, Box<dyn std::error::Error>> {
    let deadline = std::time::Instant::now() + Duration::from_secs(timeout_secs);

    loop {
        let status = get_status(client, base_url, job_id).await?;
        if status.status == "completed" || status.status == "failed" {
            return Ok(status);
        }
        if std::time::Instant::now() >= deadline {
            return Err(format!(
                "job {} still '{}' after {}s",
                job_id, status.status, timeout_secs
            )
            .into());
        }
        sleep(Duration::from_millis(500)).await;
    }
}
