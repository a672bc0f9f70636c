//! Analyzer integration tests against a mock Generative Language API

use crate::common::{fast_config, Sequence};
use reel_sift::analyzer::{Analyzer, GeminiAnalyzer};
use reel_sift::model::{AnalysisResult, Outcome};
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";
const GENERATE_PATH: &str = "/v1beta/models/test-model:generateContent";
const FILE_PATH: &str = "/v1beta/files/abc";

fn analyzer(server: &MockServer) -> GeminiAnalyzer {
    let mut config = fast_config(&server.uri());
    config.analyzer.model = "test-model".to_string();
    GeminiAnalyzer::new(&config, API_KEY).unwrap()
}

fn video_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("reel-sift-VID1.mp4");
    std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42").unwrap();
    path
}

fn remote_file(server: &MockServer, state: &str) -> Value {
    json!({
        "name": "files/abc",
        "uri": format!("{}/v1beta/files/abc", server.uri()),
        "mimeType": "video/mp4",
        "state": state,
    })
}

/// Mounts both legs of the resumable upload, ending in `state`
async fn mount_upload(server: &MockServer, state: &str, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .and(header("x-goog-api-key", API_KEY))
        .and(header("x-goog-upload-command", "start"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-goog-upload-url", format!("{}/upload-session/abc", server.uri()).as_str()),
        )
        .expect(expected)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload-session/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "file": remote_file(server, state) })))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_delete(server: &MockServer, status: u16, expected: u64) {
    Mock::given(method("DELETE"))
        .and(path(FILE_PATH))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected)
        .mount(server)
        .await;
}

fn generated(payload: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": { "parts": [{ "text": payload.to_string() }] }
        }]
    }))
}

fn exercise_payload() -> Value {
    json!({
        "muscle_group": "back",
        "machine": "cable row",
        "wrong_way": "Rounded back, arms doing the work",
        "correct_way": "Neutral spine, pull with the lats",
        "trainer_insights": "3 sets of 10-12, slow negatives",
    })
}

fn general_payload() -> Value {
    json!({
        "trainer_insights": "Consistency beats intensity",
        "video_type": "motivational content",
    })
}

#[tokio::test]
async fn test_exercise_video_analyzed() {
    let server = MockServer::start().await;
    mount_upload(&server, "ACTIVE", 1).await;
    mount_delete(&server, 200, 1).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", API_KEY))
        .respond_with(generated(exercise_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = analyzer(&server).analyze(&video_file(&dir), "VID1").await;

    assert!(outcome.is_success());
    assert!(outcome.is_exercise_video());
    assert_eq!(outcome.url, "https://www.instagram.com/p/VID1/");
    match outcome.analysis() {
        Some(AnalysisResult::Exercise(analysis)) => {
            assert_eq!(analysis.muscle_group, "back");
            assert_eq!(analysis.machine, "cable row");
        }
        other => panic!("expected exercise analysis, got {:?}", other),
    }
}

#[tokio::test]
async fn test_waits_for_processing_file() {
    let server = MockServer::start().await;
    mount_upload(&server, "PROCESSING", 1).await;
    mount_delete(&server, 200, 1).await;

    Mock::given(method("GET"))
        .and(path(FILE_PATH))
        .respond_with(Sequence::new(vec![
            ResponseTemplate::new(200).set_body_json(remote_file(&server, "PROCESSING")),
            ResponseTemplate::new(200).set_body_json(remote_file(&server, "ACTIVE")),
        ]))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(generated(exercise_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = analyzer(&server).analyze(&video_file(&dir), "VID1").await;
    assert!(outcome.is_exercise_video());
}

#[tokio::test]
async fn test_falls_back_to_general_schema() {
    let server = MockServer::start().await;
    mount_upload(&server, "ACTIVE", 1).await;
    mount_delete(&server, 200, 1).await;

    // The same answer fails the exercise schema and satisfies the general one.
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(generated(general_payload()))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = analyzer(&server).analyze(&video_file(&dir), "VID1").await;

    assert!(outcome.is_success());
    assert!(!outcome.is_exercise_video());
    match outcome.analysis() {
        Some(AnalysisResult::General(insights)) => {
            assert_eq!(insights.video_type, "motivational content");
        }
        other => panic!("expected general insights, got {:?}", other),
    }
}

#[tokio::test]
async fn test_answer_matching_neither_schema_fails() {
    let server = MockServer::start().await;
    mount_upload(&server, "ACTIVE", 1).await;
    mount_delete(&server, 200, 1).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(generated(json!({ "summary": "a cat" })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = analyzer(&server).analyze(&video_file(&dir), "VID1").await;

    assert!(!outcome.is_success());
    assert!(outcome.error().unwrap().contains("general"));
}

#[tokio::test]
async fn test_failed_upload_state_is_retried_then_reported() {
    let server = MockServer::start().await;
    mount_upload(&server, "FAILED", 3).await;
    // Every attempt removes the file it created.
    mount_delete(&server, 200, 3).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(generated(exercise_payload()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = analyzer(&server).analyze(&video_file(&dir), "VID1").await;

    assert!(!outcome.is_success());
    let error = outcome.error().unwrap();
    assert!(error.contains("FAILED"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_missing_upload_url_is_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = analyzer(&server).analyze(&video_file(&dir), "VID1").await;

    assert!(!outcome.is_success());
    assert!(outcome.error().unwrap().contains("x-goog-upload-url"));
}

#[tokio::test]
async fn test_generate_server_error_exhausts_retries() {
    let server = MockServer::start().await;
    mount_upload(&server, "ACTIVE", 1).await;
    mount_delete(&server, 200, 1).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = analyzer(&server).analyze(&video_file(&dir), "VID1").await;

    assert!(!outcome.is_success());
    assert!(outcome.error().unwrap().contains("3 attempts"));
}

#[tokio::test]
async fn test_generate_recovers_from_rate_limit() {
    let server = MockServer::start().await;
    mount_upload(&server, "ACTIVE", 1).await;
    mount_delete(&server, 200, 1).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(Sequence::new(vec![
            ResponseTemplate::new(429),
            generated(exercise_payload()),
        ]))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = analyzer(&server).analyze(&video_file(&dir), "VID1").await;
    assert!(outcome.is_exercise_video());
}

#[tokio::test]
async fn test_delete_failure_does_not_change_outcome() {
    let server = MockServer::start().await;
    mount_upload(&server, "ACTIVE", 1).await;
    mount_delete(&server, 500, 1).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(generated(exercise_payload()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome: Outcome = analyzer(&server).analyze(&video_file(&dir), "VID1").await;
    assert!(outcome.is_success());
}
