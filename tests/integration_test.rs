use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use claim_verify::config::AppConfig;
use claim_verify::models::event::{EventKind, TelemetryEvent};
use claim_verify::models::job::JobStatus;
use claim_verify::models::verdict::{
    ResearchFindings, ResearchStatus, SourcesAnalyzed, Verdict, VerdictLabel,
};
use claim_verify::pipeline::{claim, verdict};
use claim_verify::services::query::{JobQuery, QueryError};
use claim_verify::services::stats::StatsService;
use claim_verify::store::JobStore;

/// Integration tests for the shared job store and query services.
///
/// These require a running Redis instance configured via REDIS_URL.
/// Run with: cargo test --test integration_test -- --ignored

fn test_store() -> Arc<JobStore> {
    let config = AppConfig::from_env().expect("Failed to load config");
    Arc::new(
        JobStore::new(&config.redis_url, config.job_ttl_secs)
            .expect("Failed to initialize job store"),
    )
}

fn test_event(stage: &str) -> TelemetryEvent {
    TelemetryEvent {
        seq: 0,
        stage: stage.to_string(),
        tool: None,
        kind: EventKind::Info,
        payload: serde_json::json!({"note": "test"}),
        timestamp: Utc::now(),
    }
}

fn test_verdict() -> Verdict {
    Verdict {
        verdict: VerdictLabel::Unverified,
        confidence: 40,
        reasoning: "test verdict".to_string(),
        sources_analyzed: SourcesAnalyzed::default(),
        entity_quality_score: 10,
        sensationalism_score: 5,
    }
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn test_job_lifecycle() {
    let store = test_store();

    // Create: a fresh job is immediately visible as pending.
    let job_id = store
        .create_job("The Eiffel Tower is in Paris")
        .await
        .expect("Failed to create job");

    let job = store
        .get_job(job_id)
        .await
        .expect("Failed to get job")
        .expect("Job not found after create");
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.claim, "The Eiffel Tower is in Paris");
    assert!(job.completed_at.is_none());
    assert!(job.error.is_none());

    // Transition to running.
    store
        .set_status(job_id, JobStatus::Running)
        .await
        .expect("Failed to set running");
    let job = store.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert!(job.completed_at.is_none());

    // Append events; sequence numbers are assigned by the store.
    let seq1 = store
        .append_event(job_id, test_event("claim_analysis"))
        .await
        .expect("Failed to append event");
    let seq2 = store
        .append_event(job_id, test_event("research"))
        .await
        .expect("Failed to append event");
    assert!(seq2 > seq1);

    let events = store.get_events(job_id).await.expect("Failed to read events");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].seq, seq1);
    assert_eq!(events[1].seq, seq2);
    assert_eq!(events[0].stage, "claim_analysis");

    // Result before terminal status, then completion.
    let verdict = test_verdict();
    store
        .set_result(job_id, &verdict)
        .await
        .expect("Failed to set result");
    store
        .set_status(job_id, JobStatus::Completed)
        .await
        .expect("Failed to set completed");

    let job = store.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.completed_at.is_some());

    // Terminal reads are idempotent: identical result every time.
    let first = store.get_result(job_id).await.unwrap().unwrap();
    let second = store.get_result(job_id).await.unwrap().unwrap();
    assert_eq!(first.verdict, verdict.verdict);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn test_concurrent_event_appends_are_strictly_ordered() {
    let store = test_store();
    let job_id = store.create_job("concurrency check").await.unwrap();

    let appends: Vec<_> = (0..20)
        .map(|i| {
            let store = store.clone();
            async move {
                store
                    .append_event(job_id, test_event(&format!("stage_{}", i)))
                    .await
                    .expect("append failed")
            }
        })
        .collect();
    let seqs = futures::future::join_all(appends).await;

    // Every append got a unique sequence number.
    let mut sorted = seqs.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 20);

    // Readers observe a strict, gap-free order.
    let events = store.get_events(job_id).await.unwrap();
    assert_eq!(events.len(), 20);
    for (i, window) in events.windows(2).enumerate() {
        assert!(
            window[0].seq < window[1].seq,
            "events out of order at index {}",
            i
        );
    }
    assert_eq!(events[0].seq, 1);
    assert_eq!(events[19].seq, 20);
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn test_unknown_job_queries() {
    let store = test_store();
    let query = JobQuery::new(store.clone());
    let missing = Uuid::new_v4();

    assert!(store.get_job(missing).await.unwrap().is_none());
    assert!(matches!(
        query.get_status(missing).await,
        Err(QueryError::NotFound)
    ));
    assert!(matches!(
        query.get_result(missing).await,
        Err(QueryError::NotFound)
    ));
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn test_result_gating() {
    let store = test_store();
    let query = JobQuery::new(store.clone());

    // Pending job: result is not ready.
    let job_id = store.create_job("gating check").await.unwrap();
    assert!(matches!(
        query.get_result(job_id).await,
        Err(QueryError::NotReady)
    ));

    // Running job: still not ready.
    store.set_status(job_id, JobStatus::Running).await.unwrap();
    assert!(matches!(
        query.get_result(job_id).await,
        Err(QueryError::NotReady)
    ));

    // Failed job: the recorded error comes back.
    store.record_error(job_id, "stage blew up").await.unwrap();
    store.set_status(job_id, JobStatus::Failed).await.unwrap();
    match query.get_result(job_id).await {
        Err(QueryError::JobFailed { error }) => assert_eq!(error, "stage blew up"),
        other => panic!("expected JobFailed, got {:?}", other.map(|_| ())),
    }

    // Completed job: the verdict comes back.
    let done_id = store.create_job("gating check 2").await.unwrap();
    store.set_result(done_id, &test_verdict()).await.unwrap();
    store
        .set_status(done_id, JobStatus::Completed)
        .await
        .unwrap();
    let verdict = query.get_result(done_id).await.expect("expected verdict");
    assert_eq!(verdict.verdict, VerdictLabel::Unverified);
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn test_cross_job_event_isolation() {
    let store = test_store();
    let job_a = store.create_job("claim A").await.unwrap();
    let job_b = store.create_job("claim B").await.unwrap();

    store
        .append_event(job_a, test_event("stage_for_a"))
        .await
        .unwrap();
    store
        .append_event(job_b, test_event("stage_for_b"))
        .await
        .unwrap();
    store
        .append_event(job_a, test_event("stage_for_a"))
        .await
        .unwrap();

    let events_a = store.get_events(job_a).await.unwrap();
    let events_b = store.get_events(job_b).await.unwrap();

    assert_eq!(events_a.len(), 2);
    assert_eq!(events_b.len(), 1);
    assert!(events_a.iter().all(|e| e.stage == "stage_for_a"));
    assert!(events_b.iter().all(|e| e.stage == "stage_for_b"));
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn test_stats_counters() {
    let store = test_store();
    let stats = StatsService::new(store.clone());

    let before = stats.get_stats().await.expect("Failed to read stats");

    store.create_job("stats check").await.unwrap();
    store.increment_counter("jobs_completed", 1).await.unwrap();
    store.record_completed_duration(1500).await.unwrap();

    let after = stats.get_stats().await.expect("Failed to read stats");
    assert_eq!(after.total, before.total + 1);
    assert_eq!(after.per_status.completed, before.per_status.completed + 1);
    assert!(after.avg_duration_ms.is_some());
    assert!(after.last_updated.is_some());
}

/// Pure pipeline logic, no infrastructure required.
#[test]
fn test_unresearchable_claim_gets_unverified_verdict() {
    let analysis = claim::analyze("The moon is made of cheese");
    assert!(analysis.warning.is_some());

    let findings = ResearchFindings {
        status: ResearchStatus::InsufficientEntities,
        entities_searched: Vec::new(),
        search_query: None,
        sources: Vec::new(),
        total_sources_found: 0,
        total_sources_scraped: 0,
    };
    let verdict = verdict::decide(&analysis, &findings);
    assert_eq!(verdict.verdict, VerdictLabel::Unverified);
    assert!(!verdict.reasoning.is_empty());
}

#[test]
fn test_claim_analysis_finds_named_entities() {
    let analysis = claim::analyze("NASA launched Artemis from Florida in 2022");
    assert!(analysis.entity_count >= 3);
    assert!(analysis.entity_quality_score > 0);
    assert!(analysis.warning.is_none());
}
