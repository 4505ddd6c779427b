use axum::http::StatusCode;
use ferrogrid_core::config::Config;
use ferrogrid_server::controller::RunningController;
use ferrogrid_server::state::AppState;
use http_body_util::BodyExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Start a simulated grid and its router. Keep the controller alive for the
/// duration of the test.
fn start() -> (axum::Router, RunningController) {
    let (state, running) = AppState::start_simulated(Config::default()).unwrap();
    (ferrogrid_server::build_router(state), running)
}

/// Send a request via `oneshot` and return (status, raw body).
async fn send(app: &axum::Router, method: &str, uri: &str) -> (StatusCode, String) {
    let req = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "192.168.4.1:8080")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// Send a request and parse the body as JSON.
async fn send_json(app: &axum::Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(app, method, uri).await;
    let json = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn state_of(app: &axum::Router, index: usize) -> String {
    let (_, json) = send_json(app, "GET", &format!("/api/magnets/{index}")).await;
    json["state"].as_str().unwrap_or_default().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_magnets_starts_all_off() {
    let (app, running) = start();

    let (status, json) = send_json(&app, "GET", "/api/magnets").await;
    assert_eq!(status, StatusCode::OK);
    let actuators = json["actuators"].as_array().expect("expected actuator array");
    assert_eq!(actuators.len(), 12);
    assert!(actuators.iter().all(|a| a["state"] == "off" && a["duty"] == 0));
    assert_eq!(json["rows"], serde_json::json!([4, 4, 4]));

    running.stop().await.unwrap();
}

#[tokio::test]
async fn legacy_toggle_path_reports_enabled_index() {
    let (app, running) = start();

    let (status, body) = send(&app, "GET", "/magnet?num=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Enabling: 3");
    assert_eq!(state_of(&app, 3).await, "on_armed");

    running.stop().await.unwrap();
}

#[tokio::test]
async fn legacy_toggle_url_decodes_the_index() {
    let (app, running) = start();

    let (status, body) = send(&app, "GET", "/magnet?num=%31%30").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Enabling: 10");
    assert_eq!(state_of(&app, 10).await, "on_armed");

    running.stop().await.unwrap();
}

#[tokio::test]
async fn legacy_toggle_out_of_range_is_rejected_without_side_effects() {
    let (app, running) = start();
    send(&app, "GET", "/magnet?num=2").await;

    let (status, body) = send(&app, "GET", "/magnet?num=13").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Rejected: 13");
    assert_eq!(state_of(&app, 2).await, "on_armed");

    running.stop().await.unwrap();
}

#[tokio::test]
async fn malformed_toggle_falls_back_to_page() {
    let (app, running) = start();

    let (status, body) = send(&app, "GET", "/magnet?num=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<!DOCTYPE html>"));

    let (_, json) = send_json(&app, "GET", "/api/magnets").await;
    let actuators = json["actuators"].as_array().unwrap();
    assert!(actuators.iter().all(|a| a["state"] == "off"));

    running.stop().await.unwrap();
}

#[tokio::test]
async fn page_has_host_placeholders_filled() {
    let (app, running) = start();

    let (status, body) = send(&app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("http://192.168.4.1:8080"));
    assert!(!body.contains("HOST_ADDR"));

    running.stop().await.unwrap();
}

#[tokio::test]
async fn api_toggle_hands_off_between_actuators() {
    let (app, running) = start();

    let (status, json) = send_json(&app, "POST", "/api/magnets/1/toggle").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["applied"], 1);
    assert_eq!(json["state"], "on_armed");

    let (_, json) = send_json(&app, "POST", "/api/magnets/7/toggle").await;
    assert_eq!(json["applied"], 7);
    assert_eq!(json["state"], "on_armed");
    assert_eq!(state_of(&app, 1).await, "on_pending_off");

    running.stop().await.unwrap();
}

#[tokio::test]
async fn api_toggle_twice_starts_off_delay() {
    let (app, running) = start();

    send_json(&app, "POST", "/api/magnets/4/toggle").await;
    let (_, json) = send_json(&app, "POST", "/api/magnets/4/toggle").await;
    assert_eq!(json["state"], "on_pending_off");

    let (_, json) = send_json(&app, "GET", "/api/magnets/4").await;
    assert!(json["pending_off_at"].is_u64());
    assert_ne!(json["duty"], 0);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn api_toggle_rejects_bad_indices() {
    let (app, running) = start();

    let (status, json) = send_json(&app, "POST", "/api/magnets/zero/toggle").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("unrecognized request"));

    let (status, _) = send_json(&app, "POST", "/api/magnets/0/toggle").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn config_and_health_endpoints() {
    let (app, running) = start();

    let (status, json) = send_json(&app, "GET", "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["timing"]["max_on_time_ms"], 10_000);
    assert_eq!(json["drive"]["frequency_hz"], 1000);

    let (status, json) = send_json(&app, "GET", "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["actuators"], 12);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn requests_after_stop_are_unavailable() {
    let (app, running) = start();
    running.stop().await.unwrap();

    let (status, _) = send_json(&app, "POST", "/api/magnets/1/toggle").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn serve_on_answers_http10_toggle_and_shuts_down() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(ferrogrid_server::serve_on(
        Config::default(),
        listener,
        false,
        async move {
            let _ = stop_rx.await;
        },
    ));

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /magnet?num=5 HTTP/1.0\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1."), "{response}");
    assert!(response.contains(" 200 "), "{response}");
    assert!(response.ends_with("Enabling: 5"));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
