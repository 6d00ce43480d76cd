mod common;

use axum::http::StatusCode;
use common::{TestApp, json_request, token};
use serde_json::json;
use types::auth::Role;
use types::ids::UserId;

const TRANSFERS: &str = "/api/v1/admin/migrations/tenant-transfers";

#[tokio::test]
async fn test_tenant_transfer_is_idempotent() {
    let app = TestApp::new();
    let admin = token(UserId::new(), "acme", Role::Admin, 2);
    let user_id = UserId::new();
    let user = token(user_id, "acme", Role::User, 1);

    // First authenticated request records the user in acme
    assert_eq!(app.get("/api/v1/wallets", &user).await.status, StatusCode::OK);

    let body = json!({
        "user_id": user_id,
        "from_tenant": "acme",
        "to_tenant": "globex",
        "reason": "customer moved to partner brand"
    })
    .to_string();
    let headers = [("idempotency-key", "transfer-1")];

    let first = app.send(json_request("POST", TRANSFERS, &admin, &body, &headers)).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["data"]["to_tenant"], "globex");
    assert!(first.headers.get("idempotent-replayed").is_none());

    let replay = app.send(json_request("POST", TRANSFERS, &admin, &body, &headers)).await;
    assert_eq!(replay.status, StatusCode::CREATED);
    assert_eq!(replay.headers.get("idempotent-replayed").unwrap(), "true");
    assert_eq!(replay.body, first.body);

    // Same key, different payload
    let other = json!({
        "user_id": user_id,
        "from_tenant": "acme",
        "to_tenant": "initech",
        "reason": "customer moved to partner brand"
    })
    .to_string();
    let reused = app.send(json_request("POST", TRANSFERS, &admin, &other, &headers)).await;
    assert_eq!(reused.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reused.body["error"]["code"], "IDEMPOTENCY_KEY_REUSED");

    // Tokens minted for the old tenant are stale
    let stale = app.get("/api/v1/wallets", &user).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    assert_eq!(stale.body["error"]["code"], "STALE_TENANT");
    let refreshed = token(user_id, "globex", Role::User, 1);
    assert_eq!(app.get("/api/v1/wallets", &refreshed).await.status, StatusCode::OK);

    let runs = app.get("/api/v1/admin/migrations", &admin).await;
    assert_eq!(runs.status, StatusCode::OK);
    assert_eq!(runs.body["data"].as_array().unwrap().len(), 1);

    let run_id = first.body["data"]["migration_id"].as_str().unwrap();
    let run = app.get(&format!("/api/v1/admin/migrations/{run_id}"), &admin).await;
    assert_eq!(run.status, StatusCode::OK);
    assert_eq!(run.body["data"]["user_id"], user_id.to_string());
}

#[tokio::test]
async fn test_tenant_transfer_requires_idempotency_key() {
    let app = TestApp::new();
    let admin = token(UserId::new(), "acme", Role::Admin, 2);
    let body = json!({
        "user_id": UserId::new(),
        "from_tenant": "acme",
        "to_tenant": "globex",
        "reason": "consolidation"
    })
    .to_string();

    let response = app.send(json_request("POST", TRANSFERS, &admin, &body, &[])).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_failed_transfer_is_replayed() {
    let app = TestApp::new();
    let admin = token(UserId::new(), "acme", Role::Admin, 2);
    let body = json!({
        "user_id": UserId::new(),
        "from_tenant": "acme",
        "to_tenant": "globex",
        "reason": "unknown user"
    })
    .to_string();
    let headers = [("idempotency-key", "transfer-missing")];

    let first = app.send(json_request("POST", TRANSFERS, &admin, &body, &headers)).await;
    assert_eq!(first.status, StatusCode::NOT_FOUND);

    let replay = app.send(json_request("POST", TRANSFERS, &admin, &body, &headers)).await;
    assert_eq!(replay.status, StatusCode::NOT_FOUND);
    assert_eq!(replay.headers.get("idempotent-replayed").unwrap(), "true");
    assert_eq!(replay.body, first.body);
}

#[tokio::test]
async fn test_only_admins_run_migrations() {
    let app = TestApp::new();
    let broker = token(UserId::new(), "acme", Role::Broker, 2);

    let response = app.get("/api/v1/admin/migrations", &broker).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
