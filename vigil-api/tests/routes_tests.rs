//! REST surface tests: the full resource hierarchy wired through the
//! Axum router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use vigil_api::{create_router, AppState, ServerConfig};
use vigil_storage::MemoryStore;

fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    create_router(AppState::new(store, ServerConfig::default()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create(app: &Router, uri: &str, body: serde_json::Value) -> serde_json::Value {
    let (status, json) = send(app, "POST", uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create {} failed: {}", uri, json);
    json
}

#[tokio::test]
async fn full_hierarchy_round_trip() {
    let app = app();

    let view = create(&app, "/serviceviews", serde_json::json!({"name": "prod"})).await;
    let asset = create(
        &app,
        "/assets",
        serde_json::json!({"name": "web", "parent": view["id"]}),
    )
    .await;
    let attribute = create(
        &app,
        "/attributes",
        serde_json::json!({"name": "availability", "parent": asset["id"]}),
    )
    .await;
    let metric = create(
        &app,
        "/metrics",
        serde_json::json!({
            "name": "score",
            "resultFormat": [{"name": "score", "type": "number"}]
        }),
    )
    .await;
    let measurement = create(
        &app,
        "/measurements",
        serde_json::json!({
            "name": "uptime",
            "parent": attribute["id"],
            "metric": metric["id"],
            "state": "pending",
            "objective": {"condition": "value[0].score >= 50"}
        }),
    )
    .await;

    // optimistic objective default with no result
    assert_eq!(measurement["objective"]["status"], "true");

    let trigger = create(
        &app,
        "/triggers",
        serde_json::json!({
            "name": "low score",
            "parent": view["id"],
            "measurement": measurement["id"],
            "condition": "value[0].score > 70",
            "guardTime": 60
        }),
    )
    .await;
    assert_eq!(trigger["status"], "false");

    // post a result: activation + objective + trigger fire
    let uri = format!("/measurements/{}?result", measurement["id"].as_str().unwrap());
    let (status, updated) = send(
        &app,
        "PUT",
        &uri,
        Some(serde_json::json!({"value": [{"score": 75}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["state"], "activated");
    assert_eq!(updated["objective"]["status"], "true");

    let trigger_uri = format!("/triggers/{}", trigger["id"].as_str().unwrap());
    let (status, fired) = send(&app, "GET", &trigger_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fired["status"], "true");
    // statusUpdateTime serializes in the persisted timestamp shape
    let ts = fired["statusUpdateTime"].as_str().unwrap();
    assert!(ts.ends_with('Z') && ts.len() == 20, "bad timestamp {}", ts);

    // metric deletion is refused while the measurement references it
    let metric_uri = format!("/metrics/{}", metric["id"].as_str().unwrap());
    let (status, _) = send(&app, "DELETE", &metric_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn schema_and_parse_errors_are_client_errors() {
    let app = app();

    let view = create(&app, "/serviceviews", serde_json::json!({"name": "prod"})).await;
    let asset = create(
        &app,
        "/assets",
        serde_json::json!({"name": "web", "parent": view["id"]}),
    )
    .await;
    let attribute = create(
        &app,
        "/attributes",
        serde_json::json!({"name": "latency", "parent": asset["id"]}),
    )
    .await;
    let metric = create(
        &app,
        "/metrics",
        serde_json::json!({
            "name": "score",
            "resultFormat": [{"name": "score", "type": "number"}]
        }),
    )
    .await;
    let measurement = create(
        &app,
        "/measurements",
        serde_json::json!({
            "name": "uptime",
            "parent": attribute["id"],
            "metric": metric["id"],
            "state": "pending"
        }),
    )
    .await;
    let id = measurement["id"].as_str().unwrap();

    // column not in the metric schema
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/measurements/{}?result", id),
        Some(serde_json::json!({"value": [{"other": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    // objective that does not parse
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/measurements/{}?objective", id),
        Some(serde_json::json!({"condition": "value[0]."})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // state unchanged by either failure
    let (_, stored) = send(&app, "GET", &format!("/measurements/{}", id), None).await;
    assert_eq!(stored["state"], "pending");
    assert_eq!(stored["objective"], serde_json::Value::Null);

    // unknown query operation
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/measurements/{}?bogus", id),
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // unknown resource
    let (status, _) = send(
        &app,
        "GET",
        "/measurements/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
