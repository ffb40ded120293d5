use std::{str::FromStr, sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use db::{DBService, models::task::Task};
use server::{AppState, middleware::auth::AuthVerifier, routes};
use services::services::{config::AgentConfig, dispatcher::Dispatcher};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower::ServiceExt;

async fn test_state() -> AppState {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("invalid sqlite config")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("failed to open sqlite memory db");
    db::MIGRATOR.run(&pool).await.expect("migrations");

    // No providers configured: classification exercises the keyword tier.
    let config = Arc::new(AgentConfig {
        provider_order: vec![],
        ..AgentConfig::default()
    });

    AppState {
        db: DBService { pool: pool.clone() },
        dispatcher: Arc::new(Dispatcher::new(pool, &config)),
        config,
        auth: Arc::new(AuthVerifier::new("test-secret")),
    }
}

fn bearer(state: &AppState, user_id: &str) -> String {
    let token = state
        .auth
        .issue(user_id, Duration::from_secs(3600))
        .expect("token");
    format!("Bearer {}", token)
}

fn json_request(uri: &str, auth: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn dispatch_requires_a_valid_token() {
    let state = test_state().await;
    let app = routes::router(state);

    let response = app
        .clone()
        .oneshot(json_request(
            "/api/agent/dispatch",
            None,
            serde_json::json!({ "utterance": "buy milk" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request(
            "/api/agent/dispatch",
            Some("Bearer not-a-token"),
            serde_json::json!({ "utterance": "buy milk" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dispatch_creates_a_task_for_the_caller() {
    let state = test_state().await;
    let auth = bearer(&state, "U1");
    let app = routes::router(state.clone());

    let response = app
        .oneshot(json_request(
            "/api/agent/dispatch",
            Some(&auth),
            serde_json::json!({ "utterance": "buy milk" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["action"], "create");
    assert_eq!(body["data"]["result"]["task"], "Milk");

    let tasks = Task::find_by_user(&state.db.pool, "U1").await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Milk");
}

#[tokio::test]
async fn tool_route_overrides_client_supplied_user_id() {
    let state = test_state().await;
    let auth = bearer(&state, "attacker");
    let app = routes::router(state.clone());

    let response = app
        .oneshot(json_request(
            "/api/agent/tools",
            Some(&auth),
            serde_json::json!({
                "name": "add_todo",
                "arguments": { "title": "Spoofed", "user_id": "victim" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The row lands under the verified identity, not the claimed one.
    let victim = Task::find_by_user(&state.db.pool, "victim").await.unwrap();
    assert!(victim.is_empty());
    let attacker = Task::find_by_user(&state.db.pool, "attacker").await.unwrap();
    assert_eq!(attacker.len(), 1);
    assert_eq!(attacker[0].title, "Spoofed");
}

#[tokio::test]
async fn tool_route_rejects_unknown_tools() {
    let state = test_state().await;
    let auth = bearer(&state, "U1");
    let app = routes::router(state);

    let response = app
        .oneshot(json_request(
            "/api/agent/tools",
            Some(&auth),
            serde_json::json!({ "name": "drop_tables", "arguments": {} }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_returns_the_callers_records_newest_first() {
    let state = test_state().await;
    let auth = bearer(&state, "U1");
    let app = routes::router(state.clone());

    for utterance in ["buy milk", "list my tasks"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "/api/agent/dispatch",
                Some(&auth),
                serde_json::json!({ "utterance": utterance }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/agent/history")
                .header(header::AUTHORIZATION, auth.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["action"], "list");
    assert_eq!(records[1]["action"], "create");
    assert_eq!(records[1]["utterance"], "buy milk");
}

#[tokio::test]
async fn empty_utterance_is_a_bad_request() {
    let state = test_state().await;
    let auth = bearer(&state, "U1");
    let app = routes::router(state);

    let response = app
        .oneshot(json_request(
            "/api/agent/dispatch",
            Some(&auth),
            serde_json::json!({ "utterance": "   " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
