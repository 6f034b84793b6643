//! Drives the end-to-end scenarios against an in-process axum `Router`
//! backed by the in-memory store, exercising the full HTTP surface
//! (register, login, calculate, worker poll/submit, expression fetch)
//! without a live network port.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use calc_orchestrator::http::{self, AppState};
use calc_orchestrator::scheduler::Scheduler;
use calc_orchestrator::store::memory::InMemoryStore;
use calc_orchestrator::store::Store;
use calc_shared::config::AppConfig;

fn test_config() -> Arc<AppConfig> {
    Arc::new(AppConfig {
        port: 0,
        database_url: None,
        jwt_secret: "integration-test-secret".into(),
        server_url: "http://localhost:0".into(),
        computing_power: 4,
        time_addition_ms: 0,
        time_subtraction_ms: 0,
        time_multiplication_ms: 0,
        time_division_ms: 0,
        shutdown_timeout_secs: 1,
    })
}

fn app() -> Router {
    let config = test_config();
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let scheduler = Scheduler::new(store.clone(), config.clone());
    http::router(AppState {
        scheduler,
        store,
        config,
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register_and_login(app: &Router, login: &str, password: &str) -> String {
    let register = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "login": login, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(register.status(), StatusCode::CREATED);

    let login_resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/login")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "login": login, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(login_resp.status(), StatusCode::OK);
    let body = body_json(login_resp).await;
    body["token"].as_str().unwrap().to_string()
}

async fn submit_expression(app: &Router, token: &str, expression: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/calculate")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(json!({ "expression": expression }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get_expression(app: &Router, token: &str, id: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/expressions/{id}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Drains every outstanding task for `expression_id` by polling
/// `/internal/task`, resolving any `$`-references inline (all referenced
/// tasks are guaranteed already done by post-order emission order), and
/// submitting the computed result.
async fn drain_worker(app: &Router) {
    loop {
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/internal/task")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        if resp.status() == StatusCode::NOT_FOUND {
            return;
        }
        assert_eq!(resp.status(), StatusCode::OK);
        let task = body_json(resp).await;
        let task_id = task["id"].as_str().unwrap().to_string();
        let operation = task["operation"].as_str().unwrap().to_string();

        let resolve = |arg: &str| {
            let app = app.clone();
            let arg = arg.to_string();
            async move {
                if let Some(ref_id) = arg.strip_prefix('$') {
                    let resp = app
                        .clone()
                        .oneshot(
                            Request::builder()
                                .method("GET")
                                .uri(format!("/internal/task/{ref_id}"))
                                .body(Body::empty())
                                .unwrap(),
                        )
                        .await
                        .unwrap();
                    let body = body_json(resp).await;
                    body["result"].as_f64().unwrap()
                } else {
                    arg.parse::<f64>().unwrap()
                }
            }
        };

        let a = resolve(task["arg1"].as_str().unwrap()).await;
        let b = resolve(task["arg2"].as_str().unwrap()).await;

        let result = match operation.as_str() {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            "/" => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
            other => panic!("unexpected operation {other}"),
        };

        let submit = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/internal/task/{task_id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "result": result }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(submit.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_scenario_add() {
    let app = app();
    let token = register_and_login(&app, "alice", "password1").await;
    let resp = submit_expression(&app, &token, "2+2").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let id = body_json(resp).await["id"].as_str().unwrap().to_string();

    drain_worker(&app).await;

    let expr = body_json(get_expression(&app, &token, &id).await).await;
    assert_eq!(expr["status"], "done");
    assert_eq!(expr["result"], 4.0);
}

#[tokio::test]
async fn test_scenario_precedence() {
    let app = app();
    let token = register_and_login(&app, "bob", "password1").await;
    let resp = submit_expression(&app, &token, "2+3*4").await;
    let id = body_json(resp).await["id"].as_str().unwrap().to_string();

    drain_worker(&app).await;

    let expr = body_json(get_expression(&app, &token, &id).await).await;
    assert_eq!(expr["result"], 14.0);
}

#[tokio::test]
async fn test_scenario_left_associativity() {
    let app = app();
    let token = register_and_login(&app, "carol", "password1").await;
    let resp = submit_expression(&app, &token, "10-3-2").await;
    let id = body_json(resp).await["id"].as_str().unwrap().to_string();

    drain_worker(&app).await;

    let expr = body_json(get_expression(&app, &token, &id).await).await;
    assert_eq!(expr["result"], 5.0);
}

#[tokio::test]
async fn test_scenario_parentheses() {
    let app = app();
    let token = register_and_login(&app, "dave", "password1").await;
    let resp = submit_expression(&app, &token, "(1+2)*(3+4)").await;
    let id = body_json(resp).await["id"].as_str().unwrap().to_string();

    drain_worker(&app).await;

    let expr = body_json(get_expression(&app, &token, &id).await).await;
    assert_eq!(expr["result"], 21.0);
}

#[tokio::test]
async fn test_scenario_divide_by_zero_rejected_at_submit() {
    let app = app();
    let token = register_and_login(&app, "erin", "password1").await;
    let resp = submit_expression(&app, &token, "1/0").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let list = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/expressions")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let list = body_json(list).await;
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_scenario_isolation_between_users() {
    let app = app();
    let token_a = register_and_login(&app, "userA", "password1").await;
    let token_b = register_and_login(&app, "userB", "password1").await;

    let resp_a = submit_expression(&app, &token_a, "1+1").await;
    let id_a = body_json(resp_a).await["id"].as_str().unwrap().to_string();
    submit_expression(&app, &token_b, "1+2").await;

    let list_b = body_json(
        app.clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/expressions")
                    .header("authorization", format!("Bearer {token_b}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(list_b.as_array().unwrap().len(), 1);

    let forbidden = get_expression(&app, &token_b, &id_a).await;
    assert_eq!(forbidden.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unauthenticated_calculate_is_rejected() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/calculate")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "expression": "1+1" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let app = app();
    register_and_login(&app, "frank", "password1").await;
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "login": "frank", "password": "password1" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
