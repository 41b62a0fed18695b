use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use telegan::config::Config;
use telegan::db::Store;
use telegan::state::SharedState;

/// Default admin seeded by the auth migration.
const ADMIN_EMAIL: &str = "admin@telegan.local";
const ADMIN_PASSWORD: &str = "password";

const REGISTER_KIND: &str = "REGISTER";
const RESET_KIND: &str = "RESET_PASSWORD";

/// Builds the app against an in-memory database and hands back the store
/// so tests can read issued confirmation codes.
async fn spawn_app() -> (Router, Store) {
    let mut config = Config::default();
    config.general.database_url = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.server.secure_cookies = false;

    let shared = Arc::new(
        SharedState::new(config)
            .await
            .expect("Failed to create shared state"),
    );
    let store = shared.store.clone();

    let state = telegan::api::create_app_state(shared)
        .await
        .expect("Failed to create app state");
    (telegan::api::router(state).await, store)
}

struct TestResponse {
    status: StatusCode,
    body: Value,
    set_cookie: Option<String>,
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
    cookie: Option<&str>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    if let Some(cookie) = cookie {
        builder = builder.header("Cookie", cookie);
    }

    let request = match body {
        Some(json_body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(';').next().unwrap_or(s).to_string());

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        body,
        set_cookie,
    }
}

async fn login_token(app: &Router) -> String {
    let response = send(
        app,
        "POST",
        "/api/auth/login",
        Some(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["step"], "authenticated");
    response.body["data"]["token"].as_str().unwrap().to_string()
}

async fn pending_code(store: &Store, email: &str, kind: &str) -> (String, String) {
    let row = store
        .confirmations()
        .latest_active(email, kind)
        .await
        .unwrap()
        .expect("expected a pending confirmation");
    (row.code, row.token)
}

fn wrong_code(code: &str) -> String {
    if code == "000000" {
        "000001".to_string()
    } else {
        "000000".to_string()
    }
}

#[tokio::test]
async fn test_health_is_public_and_resources_require_auth() {
    let (app, _store) = spawn_app().await;

    let response = send(&app, "GET", "/api/health", None, None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");

    let response = send(&app, "GET", "/api/farms", None, None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = send(&app, "GET", "/api/farms", None, Some("bogus-token"), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let token = login_token(&app).await;
    let response = send(&app, "GET", "/api/farms", None, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let (app, _store) = spawn_app().await;

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"email": ADMIN_EMAIL, "password": "wrong-password"})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);

    let token = login_token(&app).await;
    let response = send(&app, "GET", "/api/auth/me", None, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_account_blocks_after_repeated_failures() {
    let (app, _store) = spawn_app().await;

    for _ in 0..5 {
        let response = send(
            &app,
            "POST",
            "/api/auth/login",
            Some(json!({"email": ADMIN_EMAIL, "password": "wrong-password"})),
            None,
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    // Correct credentials are still refused while the block is open.
    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.body["error"].as_str().unwrap(),
        "Account temporarily blocked"
    );
}

#[tokio::test]
async fn test_registration_and_pin_confirmation_flow() {
    let (app, store) = spawn_app().await;
    let email = "nuevo@example.com";

    let payload = json!({
        "name": "Nuevo Técnico",
        "email": email,
        "password": "super-secret-1",
        "accept_terms": true,
    });
    let response = send(&app, "POST", "/api/auth/register", Some(payload.clone()), None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    // Same address again is a conflict.
    let response = send(&app, "POST", "/api/auth/register", Some(payload), None, None).await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Login before confirmation demands the PIN and opens no session.
    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"email": email, "password": "super-secret-1"})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["step"], "pin");
    assert!(response.body["data"]["token"].is_null());

    let (code, _token) = pending_code(&store, email, REGISTER_KIND).await;
    let response = send(
        &app,
        "POST",
        "/api/auth/confirm",
        Some(json!({"email": email, "code": code})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    // Now the credentials open a real session.
    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"email": email, "password": "super-secret-1"})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["step"], "authenticated");
    let token = response.body["data"]["token"].as_str().unwrap().to_string();

    let response = send(&app, "GET", "/api/auth/me", None, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["email"], email);
}

#[tokio::test]
async fn test_wrong_pin_attempts_exhaust_the_code() {
    let (app, store) = spawn_app().await;
    let email = "impaciente@example.com";

    let response = send(
        &app,
        "POST",
        "/api/auth/register",
        Some(json!({
            "name": "Impaciente",
            "email": email,
            "password": "super-secret-1",
            "accept_terms": true,
        })),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let (code, _) = pending_code(&store, email, REGISTER_KIND).await;
    let bad = wrong_code(&code);

    for _ in 0..5 {
        let response = send(
            &app,
            "POST",
            "/api/auth/confirm",
            Some(json!({"email": email, "code": bad})),
            None,
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    // The correct code no longer helps.
    let response = send(
        &app,
        "POST",
        "/api/auth/confirm",
        Some(json!({"email": email, "code": code})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["error"].as_str().unwrap(),
        "Too many incorrect attempts"
    );
}

#[tokio::test]
async fn test_resend_invalidates_previous_code() {
    let (app, store) = spawn_app().await;
    let email = "reintento@example.com";

    send(
        &app,
        "POST",
        "/api/auth/register",
        Some(json!({
            "name": "Reintento",
            "email": email,
            "password": "super-secret-1",
            "accept_terms": true,
        })),
        None,
        None,
    )
    .await;

    let (first_code, first_token) = pending_code(&store, email, REGISTER_KIND).await;

    let response = send(
        &app,
        "POST",
        "/api/auth/confirm/resend",
        Some(json!({"email": email})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let (second_code, second_token) = pending_code(&store, email, REGISTER_KIND).await;
    assert_ne!(first_token, second_token);

    if first_code != second_code {
        let response = send(
            &app,
            "POST",
            "/api/auth/confirm",
            Some(json!({"email": email, "code": first_code})),
            None,
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    let response = send(
        &app,
        "POST",
        "/api/auth/confirm",
        Some(json!({"email": email, "code": second_code})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_email_link_is_single_shot() {
    let (app, store) = spawn_app().await;
    let email = "enlace@example.com";

    send(
        &app,
        "POST",
        "/api/auth/register",
        Some(json!({
            "name": "Enlace",
            "email": email,
            "password": "super-secret-1",
            "accept_terms": true,
        })),
        None,
        None,
    )
    .await;

    let (_, token) = pending_code(&store, email, REGISTER_KIND).await;

    let uri = format!("/api/auth/verify-email?token={token}");
    let response = send(&app, "GET", &uri, None, None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    // Used links stop working.
    let response = send(&app, "GET", &uri, None, None, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"email": email, "password": "super-secret-1"})),
        None,
        None,
    )
    .await;
    assert_eq!(response.body["data"]["step"], "authenticated");
}

#[tokio::test]
async fn test_password_reset_wizard() {
    let (app, store) = spawn_app().await;

    // Constant response whether or not the account exists.
    let response = send(
        &app,
        "POST",
        "/api/auth/forgot-password",
        Some(json!({"email": "nadie@example.com"})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(
        store
            .confirmations()
            .latest_active("nadie@example.com", RESET_KIND)
            .await
            .unwrap()
            .is_none()
    );

    let response = send(
        &app,
        "POST",
        "/api/auth/forgot-password",
        Some(json!({"email": ADMIN_EMAIL})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let (code, _) = pending_code(&store, ADMIN_EMAIL, RESET_KIND).await;

    // The reset step refuses sessions that never passed verification.
    let response = send(
        &app,
        "POST",
        "/api/auth/forgot-password/reset",
        Some(json!({
            "email": ADMIN_EMAIL,
            "new_password": "brand-new-pass",
            "confirm_password": "brand-new-pass",
        })),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        "POST",
        "/api/auth/forgot-password/verify",
        Some(json!({"email": ADMIN_EMAIL, "code": code})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let cookie = response.set_cookie.expect("verify should set the session cookie");

    // Password mismatch changes nothing.
    let response = send(
        &app,
        "POST",
        "/api/auth/forgot-password/reset",
        Some(json!({
            "email": ADMIN_EMAIL,
            "new_password": "brand-new-pass",
            "confirm_password": "different-pass",
        })),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let _ = login_token(&app).await;

    let response = send(
        &app,
        "POST",
        "/api/auth/forgot-password/reset",
        Some(json!({
            "email": ADMIN_EMAIL,
            "new_password": "brand-new-pass",
            "confirm_password": "brand-new-pass",
        })),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    // Old password out, new password in.
    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"email": ADMIN_EMAIL, "password": "brand-new-pass"})),
        None,
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["step"], "authenticated");
}

#[tokio::test]
async fn test_farm_crud_with_paddocks() {
    let (app, _store) = spawn_app().await;
    let token = login_token(&app).await;

    let response = send(
        &app,
        "POST",
        "/api/farms",
        Some(json!({"name": "La Esperanza", "owner": "Pedro", "area_hectares": 120.5})),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let farm_id = response.body["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        "POST",
        &format!("/api/farms/{farm_id}/paddocks"),
        Some(json!({"name": "Potrero Norte", "area_hectares": 12.0})),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = send(
        &app,
        "GET",
        &format!("/api/farms/{farm_id}"),
        None,
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["paddock_count"], 1);

    let response = send(
        &app,
        "PUT",
        &format!("/api/farms/{farm_id}"),
        Some(json!({"name": "La Esperanza Renovada"})),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "La Esperanza Renovada");

    // Delete soft-deletes the farm and removes its paddocks.
    let response = send(
        &app,
        "DELETE",
        &format!("/api/farms/{farm_id}"),
        None,
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = send(
        &app,
        "GET",
        &format!("/api/farms/{farm_id}"),
        None,
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["active"], false);
    assert_eq!(response.body["data"]["paddock_count"], 0);

    let response = send(
        &app,
        "GET",
        "/api/farms/9999",
        None,
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_indices_and_threshold_validation() {
    let (app, _store) = spawn_app().await;
    let token = login_token(&app).await;

    // NDVI is seeded by the domain migration.
    let response = send(
        &app,
        "POST",
        "/api/indices",
        Some(json!({"code": "ndvi", "name": "Duplicate NDVI"})),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = send(
        &app,
        "POST",
        "/api/indices",
        Some(json!({"code": "EVI", "name": "Enhanced Vegetation Index"})),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let indice_id = response.body["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        "POST",
        "/api/thresholds",
        Some(json!({
            "indice_id": indice_id,
            "label": "inverted",
            "min_value": 0.8,
            "max_value": 0.2,
        })),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/thresholds",
        Some(json!({
            "indice_id": 9999,
            "label": "bajo",
            "min_value": 0.0,
            "max_value": 0.3,
        })),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = send(
        &app,
        "POST",
        "/api/thresholds",
        Some(json!({
            "indice_id": indice_id,
            "label": "bajo",
            "min_value": 0.0,
            "max_value": 0.3,
            "color": "#ff0000",
        })),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = send(
        &app,
        "GET",
        &format!("/api/thresholds?indice_id={indice_id}"),
        None,
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_region_geometry_validation() {
    let (app, _store) = spawn_app().await;
    let token = login_token(&app).await;

    let response = send(
        &app,
        "POST",
        "/api/regions",
        Some(json!({"name": "Llanos", "geometry": "not geojson"})),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/regions",
        Some(json!({
            "name": "Llanos",
            "geometry": r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#,
        })),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_user_bulk_status() {
    let (app, _store) = spawn_app().await;
    let token = login_token(&app).await;

    let mut ids = Vec::new();
    for (name, email) in [
        ("Ana", "ana@example.com"),
        ("Luis", "luis@example.com"),
    ] {
        let response = send(
            &app,
            "POST",
            "/api/users",
            Some(json!({"name": name, "email": email})),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        ids.push(response.body["data"]["id"].as_i64().unwrap());
    }

    let response = send(
        &app,
        "POST",
        "/api/users/bulk-status",
        Some(json!({"ids": ids, "active": false})),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["updated"], 2);

    let response = send(
        &app,
        "GET",
        &format!("/api/users/{}", ids[0]),
        None,
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.body["data"]["active"], false);
}

#[tokio::test]
async fn test_admin_cannot_deactivate_self() {
    let (app, _store) = spawn_app().await;
    let token = login_token(&app).await;

    let response = send(&app, "GET", "/api/auth/me", None, Some(&token), None).await;
    let my_id = response.body["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        "DELETE",
        &format!("/api/system-users/{my_id}"),
        None,
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "PUT",
        &format!("/api/system-users/{my_id}"),
        Some(json!({"active": false})),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Other admins can be deactivated.
    let response = send(
        &app,
        "POST",
        "/api/system-users",
        Some(json!({
            "name": "Otro Admin",
            "email": "otro@telegan.local",
            "role": "TECNICO",
        })),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let other_id = response.body["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        "DELETE",
        &format!("/api/system-users/{other_id}"),
        None,
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_dashboard_counts_and_pagination_cap() {
    let (app, _store) = spawn_app().await;
    let token = login_token(&app).await;

    let response = send(&app, "GET", "/api/dashboard", None, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    // The domain migration seeds three indices.
    assert_eq!(response.body["data"]["indices"], 3);
    assert!(response.body["data"]["active_sessions"].as_u64().unwrap() >= 1);

    let response = send(
        &app,
        "GET",
        "/api/users?page_size=5000",
        None,
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["pagination"]["page_size"], 100);
}

#[tokio::test]
async fn test_logout_invalidates_token() {
    let (app, _store) = spawn_app().await;
    let token = login_token(&app).await;

    let response = send(&app, "POST", "/api/auth/logout", None, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = send(&app, "GET", "/api/auth/me", None, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
