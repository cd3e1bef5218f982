//! HTTP endpoint integration tests using axum-test

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use clap::Parser;
use narrative_engine::EngineConfig;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::api::router;
use crate::state::AppState;
use crate::Args;

/// Create a test server over in-memory storage
fn create_test_server() -> TestServer {
    let state = Arc::new(AppState::in_memory(EngineConfig::default()));
    TestServer::new(router(state)).unwrap()
}

/// Create a test server over an in-memory SQLite database
async fn create_sqlite_server() -> TestServer {
    let state = AppState::new(Some("sqlite::memory:".into()), EngineConfig::default())
        .await
        .unwrap();
    TestServer::new(router(Arc::new(state))).unwrap()
}

fn small_definition(title: &str) -> Value {
    json!({
        "title": title,
        "pages": [{
            "name": "about-you",
            "title": "About You",
            "elements": [
                {"type": "text", "name": "applicantName", "title": "Your Full Name"},
                {"type": "boolean", "name": "hasSafetyConcerns", "title": "Any safety concerns?"},
                {
                    "type": "comment",
                    "name": "safetyConcernsDetails",
                    "title": "Describe the concerns",
                    "visibleIf": "{hasSafetyConcerns} = true"
                }
            ]
        }]
    })
}

#[tokio::test]
async fn test_health_returns_200() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let json = response.json::<Value>();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "narrative-api");
}

#[tokio::test]
async fn test_form_config_bootstraps_default() {
    let server = create_test_server();
    let response = server.get("/api/form-config").await;
    response.assert_status_ok();

    let json = response.json::<Value>();
    assert_eq!(json["version"], 1);
    assert_eq!(json["isActive"], true);
    assert_eq!(json["definition"]["title"], "Child Custody Application Form");
}

#[tokio::test]
async fn test_publish_then_history_lists_newest_first() {
    let server = create_test_server();

    let response = server
        .post("/api/form-config")
        .json(&json!({
            "config": small_definition("Short Form"),
            "notes": "Trimmed questions",
            "author": "admin"
        }))
        .await;
    response.assert_status_ok();
    let published = response.json::<Value>();
    assert_eq!(published["version"], 2);
    assert_eq!(published["createdBy"], "admin");

    let history = server.get("/api/form-config/history").await.json::<Value>();
    assert_eq!(history["count"], 2);
    assert_eq!(history["versions"][0]["version"], 2);
    assert_eq!(history["versions"][0]["isActive"], true);
    assert_eq!(history["versions"][1]["isActive"], false);
}

#[tokio::test]
async fn test_publish_rejects_empty_definition() {
    let server = create_test_server();

    let response = server
        .post("/api/form-config")
        .json(&json!({"config": {"pages": []}}))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["status"], 400);
}

#[tokio::test]
async fn test_form_config_version_lookup() {
    let server = create_test_server();
    server.get("/api/form-config").await.assert_status_ok();

    let response = server.get("/api/form-config/versions/1").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["version"], 1);

    server
        .get("/api/form-config/versions/42")
        .expect_failure()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export_then_import_publishes_same_structure() {
    let server = create_test_server();

    let exported = server.get("/api/form-config/export").await;
    exported.assert_status_ok();
    let body = exported.text();
    assert!(body.contains("applicantName"));

    let before = server.post("/api/narrative-template").await.json::<Value>();

    let imported = server
        .post("/api/form-config/import")
        .json(&json!({"definition": body, "author": "admin"}))
        .await;
    imported.assert_status_ok();
    assert_eq!(imported.json::<Value>()["version"], 2);

    let after = server.post("/api/narrative-template").await.json::<Value>();
    assert_eq!(
        after["template"]["structuralFingerprint"],
        before["template"]["structuralFingerprint"]
    );
}

#[tokio::test]
async fn test_import_rejects_invalid_json() {
    let server = create_test_server();

    server
        .post("/api/form-config/import")
        .json(&json!({"definition": "{not json"}))
        .expect_failure()
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_template_is_generated_once_then_cached() {
    let server = create_test_server();

    let status = server.get("/api/narrative-template").await.json::<Value>();
    assert_eq!(status["aiEnabled"], false);
    assert_eq!(status["cachedTemplates"], 0);

    let first = server.post("/api/narrative-template").await.json::<Value>();
    assert_eq!(first["cached"], false);
    assert_eq!(first["generatedBy"], "fallback");

    let second = server.post("/api/narrative-template").await.json::<Value>();
    assert_eq!(second["cached"], true);
    assert_eq!(second["template"]["id"], first["template"]["id"]);

    let status = server.get("/api/narrative-template").await.json::<Value>();
    assert_eq!(status["cachedTemplates"], 1);
}

#[tokio::test]
async fn test_delete_template_forces_regeneration() {
    let server = create_test_server();
    let first = server.post("/api/narrative-template").await.json::<Value>();

    let deleted = server.delete("/api/narrative-template").await.json::<Value>();
    assert_eq!(deleted["removed"], 1);

    let again = server.post("/api/narrative-template").await.json::<Value>();
    assert_eq!(again["cached"], false);
    assert_ne!(again["template"]["id"], first["template"]["id"]);
}

#[tokio::test]
async fn test_preview_narrative_document() {
    let server = create_test_server();

    let response = server
        .post("/api/documents/preview")
        .json(&json!({
            "answers": {"applicantName": "Jane Doe"},
            "mode": "narrative"
        }))
        .await;
    response.assert_status_ok();

    let document = response.json::<Value>();
    assert_eq!(document["mode"], "narrative");
    assert_eq!(
        document["sections"][0]["bodyParagraphs"][0],
        "I, Jane Doe, am the applicant in this matter."
    );
    assert!(document.get("notice").is_none());
}

#[tokio::test]
async fn test_preview_question_answer_hides_invisible_answers() {
    let server = create_test_server();
    server
        .post("/api/form-config")
        .json(&json!({"config": small_definition("Short Form")}))
        .await
        .assert_status_ok();

    let document = server
        .post("/api/documents/preview")
        .json(&json!({
            "answers": {
                "applicantName": "Jane Doe",
                "hasSafetyConcerns": false,
                "safetyConcernsDetails": "stale text"
            },
            "mode": "question_answer"
        }))
        .await
        .json::<Value>();

    assert_eq!(document["title"], "Short Form");
    assert_eq!(
        document["sections"][0]["bodyParagraphs"],
        json!(["Your Full Name: Jane Doe", "Any safety concerns?: No"])
    );
}

#[tokio::test]
async fn test_export_document_as_text() {
    let server = create_test_server();

    let response = server
        .post("/api/documents/export")
        .json(&json!({
            "answers": {"applicantName": "Jane Doe"},
            "mode": "question_answer"
        }))
        .await;
    response.assert_status_ok();

    let text = response.text();
    assert!(text.starts_with("Child Custody Application Form\n"));
    assert!(text.contains("Your Full Name: Jane Doe"));
}

#[tokio::test]
async fn test_sqlite_state_serves_the_same_routes() {
    let server = create_sqlite_server().await;

    let active = server.get("/api/form-config").await.json::<Value>();
    assert_eq!(active["version"], 1);

    server
        .post("/api/form-config")
        .json(&json!({"config": small_definition("Short Form"), "author": "admin"}))
        .await
        .assert_status_ok();

    let history = server.get("/api/form-config/history").await.json::<Value>();
    assert_eq!(history["count"], 2);

    let first = server.post("/api/narrative-template").await.json::<Value>();
    let second = server.post("/api/narrative-template").await.json::<Value>();
    assert_eq!(second["cached"], true);
    assert_eq!(second["template"]["id"], first["template"]["id"]);
}

#[test]
fn test_args_build_engine_config() {
    let args = Args::parse_from([
        "narrative-api",
        "--ai-endpoint",
        "https://models.example/generate",
        "--generation-timeout-ms",
        "500",
        "--publish-retries",
        "5",
    ]);
    let config = args.engine_config();

    assert!(config.generation.ai_available());
    assert_eq!(config.generation.timeout_ms, 500);
    assert_eq!(config.publish_retries, 5);
}

#[test]
fn test_args_default_to_fallback_generation() {
    let args = Args::parse_from(["narrative-api"]);
    assert!(!args.engine_config().generation.ai_available());
}
