//! Integration tests for the health and upgrade endpoints.

use http::StatusCode;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_detailed_health_reports_connections() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health/detailed", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["connections"], 0);
}

#[tokio::test]
async fn test_ws_route_requires_upgrade_handshake() {
    let app = TestApp::new();

    // A plain GET without the upgrade headers is not a WebSocket handshake.
    let response = app.request("GET", "/ws?token=whatever", None, None).await;

    assert_ne!(response.status, StatusCode::OK);
}
