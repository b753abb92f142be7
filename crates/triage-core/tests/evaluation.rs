use std::sync::Arc;
use triage_core::{EvaluationSummary, FeedbackRecord, TriageConfig, TriageSystem};
use triage_llm::GenerationClient;
use triage_model::{Category, Severity};
use triage_test_utils::{
    classification_json, mitigation_json, root_cause_json, write_playbook_corpus, KeywordEmbedder,
    ScriptedGenerator,
};

const AUTH_CASE: &str = r#"{
    "incident_id": "GC-AUTH",
    "timestamp": "2024-01-15T10:30:00Z",
    "alert_name": "Auth Service Errors",
    "alert_data": {
        "source": "prometheus",
        "description": "login failing, redis connection refused",
        "metrics": {"failed_requests_per_min": 1310},
        "affected_services": ["auth-service"]
    },
    "logs": "ERROR redis Connection refused",
    "ground_truth": {
        "severity": "SEV1",
        "category": "API/Service",
        "root_causes": ["redis cache down", "connection pool misconfigured"]
    }
}"#;

const DB_CASE: &str = r#"{
    "incident_id": "GC-DB",
    "timestamp": "2024-01-16T08:00:00Z",
    "alert_name": "Database Pool Saturation",
    "alert_data": {
        "source": "datadog",
        "description": "postgres pool at 95/100",
        "affected_services": ["orders"]
    },
    "ground_truth": {"severity": "SEV2", "category": "Database", "root_causes": ["connection leak"]}
}"#;

async fn system(dir: &tempfile::TempDir, generator: Arc<ScriptedGenerator>) -> TriageSystem {
    write_playbook_corpus(&dir.path().join("runbooks")).unwrap();
    let golden = dir.path().join("golden");
    std::fs::create_dir_all(&golden).unwrap();
    std::fs::write(golden.join("01_auth.json"), AUTH_CASE).unwrap();
    std::fs::write(golden.join("02_db.json"), DB_CASE).unwrap();
    std::fs::write(golden.join("notes.txt"), "ignored").unwrap();
    std::fs::write(golden.join("03_broken.json"), "{ not json").unwrap();

    let config = TriageConfig::default()
        .with_runbooks_dir(dir.path().join("runbooks"))
        .with_index_path(Some(dir.path().join("state/vector_store.db")))
        .with_feedback_file(dir.path().join("state/feedback.jsonl"))
        .with_golden_cases_dir(golden);
    TriageSystem::from_parts(
        config,
        generator as Arc<dyn GenerationClient>,
        Arc::new(KeywordEmbedder::incident_axes()),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_golden_cases_are_scored() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(
        ScriptedGenerator::new()
            // auth case: category right, causes half right
            .with_response(classification_json("SEV1", "API/Service", 0.9))
            .with_response(root_cause_json(&[("Redis cache down on auth", 0.9), ("DNS flapping", 0.2)]))
            .with_response(mitigation_json("Restart redis", "Auth Service Outage"))
            // db case: category wrong
            .with_response(classification_json("SEV2", "Performance", 0.7))
            .with_response(root_cause_json(&[("connection leak", 0.8)]))
            .with_response(mitigation_json("Recycle pgbouncer", "Database Connection Pool Exhaustion")),
    );
    let system = system(&dir, generator).await;

    let summary: EvaluationSummary = system.evaluator().evaluate_all().await.unwrap().unwrap();

    assert_eq!(summary.total_cases, 2);
    assert_eq!(summary.severity_accuracy, 1.0);
    assert_eq!(summary.category_accuracy, 0.5);
    assert_eq!(summary.individual_results[0].incident_id, "GC-AUTH");
    assert_eq!(summary.individual_results[0].root_cause_overlap, 0.5);
    assert_eq!(summary.individual_results[1].predicted_category, Category::Performance);
    assert_eq!(summary.individual_results[1].actual_category, Category::Database);
    assert_eq!(summary.avg_root_cause_precision, 0.75);
}

#[tokio::test]
async fn test_report_is_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(ScriptedGenerator::new().with_default_response("unusable"));
    let system = system(&dir, generator).await;

    let path = dir.path().join("reports/evaluation_report.json");
    let summary = system.evaluator().generate_report(&path).await.unwrap().unwrap();

    let written: EvaluationSummary =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, summary);
    // fallback SEV3 is floored by the auth outage signal
    assert_eq!(written.individual_results[0].predicted_severity, Severity::Sev1);
}

#[tokio::test]
async fn test_missing_golden_dir_yields_no_summary() {
    let dir = tempfile::tempdir().unwrap();
    let generator: Arc<dyn GenerationClient> = Arc::new(ScriptedGenerator::new());
    let config = TriageConfig::default()
        .with_runbooks_dir(dir.path().join("runbooks"))
        .with_index_path(None)
        .with_golden_cases_dir(dir.path().join("absent"));
    let system = TriageSystem::from_parts(config, generator, Arc::new(KeywordEmbedder::incident_axes()))
        .await
        .unwrap();

    assert!(system.evaluator().evaluate_all().await.unwrap().is_none());
    let report = dir.path().join("report.json");
    assert!(system.evaluator().generate_report(&report).await.unwrap().is_none());
    assert!(!report.exists());
}

#[tokio::test]
async fn test_feedback_round_trips_through_log() {
    let dir = tempfile::tempdir().unwrap();
    let system = system(&dir, Arc::new(ScriptedGenerator::new())).await;

    let record = FeedbackRecord::new("GC-AUTH", Severity::Sev1, Category::ApiService, 0.8, true)
        .with_notes("restart fixed it");
    system.feedback_log().append(&record).await.unwrap();

    let stored = system.feedback_log().read_all().await.unwrap();
    assert_eq!(stored, vec![record]);
}
