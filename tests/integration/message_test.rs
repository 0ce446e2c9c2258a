//! Integration tests for the message REST endpoints.

use http::StatusCode;
use serde_json::json;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_send_direct_message_persists() {
    let app = TestApp::new();
    let asha = app.seed_user("Asha");
    let bala = app.seed_user("Bala");
    let token = app.token_for(asha, "Asha");

    let response = app
        .request(
            "POST",
            "/api/messages",
            Some(&token),
            Some(json!({"content": "hello", "receiverId": bala.to_string()})),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["content"], "hello");
    assert_eq!(response.body["senderId"], asha.to_string());
    assert_eq!(response.body["receiverId"], bala.to_string());
    assert_eq!(response.body["isRead"], false);
    assert!(response.body["_id"].is_string());
    // rendered in the tenant's +05:30 offset
    assert!(response.body["timestamp"]
        .as_str()
        .unwrap()
        .ends_with("+05:30"));
    assert_eq!(app.store.message_count(), 1);
}

#[tokio::test]
async fn test_send_requires_authentication() {
    let app = TestApp::new();
    let bala = app.seed_user("Bala");

    let response = app
        .request(
            "POST",
            "/api/messages",
            None,
            Some(json!({"content": "hello", "receiverId": bala.to_string()})),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.message_count(), 0);
}

#[tokio::test]
async fn test_token_for_unregistered_tenant_rejected() {
    let app = TestApp::new();
    let asha = app.seed_user("Asha");
    let token = app.token_for_unknown_tenant(asha);

    let response = app
        .request(
            "POST",
            "/api/messages",
            Some(&token),
            Some(json!({"content": "hello", "receiverId": asha.to_string()})),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_receiver_is_not_persisted() {
    let app = TestApp::new();
    let asha = app.seed_user("Asha");
    let token = app.token_for(asha, "Asha");

    let response = app
        .request(
            "POST",
            "/api/messages",
            Some(&token),
            Some(json!({
                "content": "hello",
                "receiverId": uuid::Uuid::new_v4().to_string(),
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.message_count(), 0);
}

#[tokio::test]
async fn test_group_send_requires_membership() {
    let app = TestApp::new();
    let asha = app.seed_user("Asha");
    let bala = app.seed_user("Bala");
    let group = app.seed_group(vec![bala]);
    let token = app.token_for(asha, "Asha");

    let response = app
        .request(
            "POST",
            "/api/messages",
            Some(&token),
            Some(json!({"content": "hello", "groupId": group.to_string()})),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.message_count(), 0);
}

#[tokio::test]
async fn test_group_send_carries_verified_sender_name() {
    let app = TestApp::new();
    let asha = app.seed_user("Asha");
    let bala = app.seed_user("Bala");
    let group = app.seed_group(vec![asha, bala]);
    let token = app.token_for(asha, "Asha");

    let response = app
        .request(
            "POST",
            "/api/messages",
            Some(&token),
            Some(json!({"content": "hello group", "groupId": group.to_string()})),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["senderName"], "Asha");
    assert_eq!(response.body["groupId"], group.to_string());
}

#[tokio::test]
async fn test_body_with_both_targets_rejected() {
    let app = TestApp::new();
    let asha = app.seed_user("Asha");
    let bala = app.seed_user("Bala");
    let group = app.seed_group(vec![asha, bala]);
    let token = app.token_for(asha, "Asha");

    let response = app
        .request(
            "POST",
            "/api/messages",
            Some(&token),
            Some(json!({
                "content": "hello",
                "receiverId": bala.to_string(),
                "groupId": group.to_string(),
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_direct_history_is_visible_to_both_sides() {
    let app = TestApp::new();
    let asha = app.seed_user("Asha");
    let bala = app.seed_user("Bala");
    let asha_token = app.token_for(asha, "Asha");
    let bala_token = app.token_for(bala, "Bala");

    for content in ["first", "second"] {
        let response = app
            .request(
                "POST",
                "/api/messages",
                Some(&asha_token),
                Some(json!({"content": content, "receiverId": bala.to_string()})),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app
        .request(
            "GET",
            &format!("/api/messages?peerId={asha}"),
            Some(&bala_token),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let messages = response.body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    // newest first
    assert_eq!(messages[0]["content"], "second");
}

#[tokio::test]
async fn test_group_history_requires_membership() {
    let app = TestApp::new();
    let asha = app.seed_user("Asha");
    let bala = app.seed_user("Bala");
    let group = app.seed_group(vec![bala]);
    let token = app.token_for(asha, "Asha");

    let response = app
        .request(
            "GET",
            &format!("/api/messages?groupId={group}"),
            Some(&token),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
