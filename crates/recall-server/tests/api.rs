//! Integration tests driving the real `axum::Router` in-process via
//! `tower::ServiceExt::oneshot`, against an in-memory `Store`, a
//! `NullVectorIndex`, and a scripted generator; same harness shape as the
//! real server binary, minus a live TCP listener.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use recall_bus::EventBus;
use recall_query::QueryEngine;
use recall_registry::{RunnerSpawn, SessionRegistry};
use recall_runtime::testing::{ScriptedGenerator, ScriptedReply};
use recall_runtime::{MemoryAgentRunner, SkipList};
use recall_store::Store;
use recall_vector::{NullVectorIndex, VectorIndex};

use recall_server::state::AppState;

async fn test_app(replies: Vec<ScriptedReply>) -> axum::Router {
    let store = Store::in_memory().await.unwrap();
    let vector: Arc<dyn VectorIndex> = Arc::new(NullVectorIndex);
    let bus = EventBus::new();
    let registry = Arc::new(SessionRegistry::new());
    let generator = Arc::new(ScriptedGenerator::new(replies));
    let runner: Arc<dyn RunnerSpawn> = Arc::new(MemoryAgentRunner::new(
        store.clone(),
        vector.clone(),
        bus.clone(),
        registry.clone(),
        generator,
    ));
    let query = QueryEngine::new(store.clone(), vector.clone());

    let state = AppState {
        store,
        vector,
        bus,
        registry,
        query,
        skip_list: SkipList::with_defaults(),
        runner,
        default_context_limit: 50,
    };

    recall_server::router::build(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn health_check_reports_ok() {
    let app = test_app(vec![]).await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn ensure_session_creates_then_reuses_existing_row() {
    let app = test_app(vec![]).await;
    let req = json!({
        "agent_session_id": "agent-1",
        "platform": "claude-code",
        "project": "demo",
        "user_prompt": "fix the bug",
    });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/sessions/ensure", req.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["created"], true);
    assert_eq!(first["prompt_number"], 1);

    let response = app.oneshot(json_request("POST", "/api/sessions/ensure", req)).await.unwrap();
    let second = body_json(response).await;
    assert_eq!(second["created"], false);
    assert_eq!(second["prompt_number"], 2);
    assert_eq!(second["id"], first["id"]);
}

#[tokio::test]
async fn ensure_session_rejects_missing_required_field() {
    let app = test_app(vec![]).await;
    let req = json!({ "agent_session_id": "", "platform": "claude-code", "project": "demo" });
    let response = app.oneshot(json_request("POST", "/api/sessions/ensure", req)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn observation_for_unknown_session_is_not_found() {
    let app = test_app(vec![]).await;
    let req = json!({
        "agent_session_id": "ghost",
        "platform": "claude-code",
        "tool_name": "Edit",
    });
    let response = app.oneshot(json_request("POST", "/api/observations", req)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn observation_for_skip_listed_tool_is_skipped_not_queued() {
    let app = test_app(vec![]).await;
    let ensure = json!({
        "agent_session_id": "agent-2",
        "platform": "claude-code",
        "project": "demo",
    });
    app.clone().oneshot(json_request("POST", "/api/sessions/ensure", ensure)).await.unwrap();

    let obs = json!({
        "agent_session_id": "agent-2",
        "platform": "claude-code",
        "tool_name": "TodoWrite",
    });
    let response = app.oneshot(json_request("POST", "/api/observations", obs)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "skipped");
}

#[tokio::test]
async fn observation_round_trips_through_the_scripted_generator_into_search() {
    let reply = ScriptedReply {
        text: "<observation><type>bugfix</type><title>Fixed the auth bug</title>\
               <concepts><concept>auth</concept></concepts></observation>"
            .to_string(),
        input_tokens: 40,
        output_tokens: 12,
    };
    let app = test_app(vec![reply]).await;

    let ensure = json!({
        "agent_session_id": "agent-3",
        "platform": "claude-code",
        "project": "demo",
    });
    app.clone().oneshot(json_request("POST", "/api/sessions/ensure", ensure)).await.unwrap();

    let obs = json!({
        "agent_session_id": "agent-3",
        "platform": "claude-code",
        "tool_name": "Edit",
        "tool_input": {"file_path": "src/auth.rs"},
    });
    let response = app.clone().oneshot(json_request("POST", "/api/observations", obs)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let queued = body_json(response).await;
    assert_eq!(queued["status"], "queued");

    // The runner task processes the queue asynchronously; give it a beat.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/search?query=auth&project=demo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let hits = body_json(response).await;
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["title"], "Fixed the auth bug");
}

#[tokio::test]
async fn search_without_text_or_filters_is_a_validation_error() {
    let app = test_app(vec![]).await;
    let response = app
        .oneshot(Request::builder().uri("/api/search").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_observation_id_is_not_found() {
    let app = test_app(vec![]).await;
    let response = app
        .oneshot(Request::builder().uri("/api/observation/999").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn processing_status_reports_camel_case_fields() {
    let app = test_app(vec![]).await;
    let response = app
        .oneshot(Request::builder().uri("/api/processing-status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["isProcessing"], false);
    assert_eq!(body["queueDepth"], 0);
}
