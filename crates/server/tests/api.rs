use std::sync::Arc;
use std::time::Duration;

use auth::{PasswordHasher, SessionKeys};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use repository::{MemoryStore, Repositories};
use serde_json::{Value, json};
use server::{AppState, router};
use service::{MarketplaceService, SeedConfig};
use tower::ServiceExt;

const ADMIN_PHONE: &str = "9999999999";
const ADMIN_PASSWORD: &str = "admin123";

async fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let service = MarketplaceService::new(Repositories::in_memory(store), PasswordHasher::new(4));
    service
        .seed_defaults(&SeedConfig {
            admin_phone: ADMIN_PHONE.to_string(),
            admin_password: ADMIN_PASSWORD.to_string(),
        })
        .await
        .unwrap();
    let sessions = SessionKeys::new(b"test-secret", Duration::from_secs(3600));
    let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../static");
    router(AppState::new(service, sessions, static_dir).unwrap())
}

struct Reply {
    status: StatusCode,
    /// `name=value` part of the `Set-Cookie` header, if any.
    cookie: Option<String>,
    set_cookie: Option<String>,
    text: String,
    json: Value,
}

async fn send(app: &Router, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let cookie = set_cookie
        .as_deref()
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let json = serde_json::from_str(&text).unwrap_or(Value::Null);

    Reply {
        status,
        cookie,
        set_cookie,
        text,
        json,
    }
}

async fn register(app: &Router, phone: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "phone": phone, "password": "secret", "name": "Asha" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    reply.cookie.unwrap()
}

async fn login_admin(app: &Router) -> String {
    let reply = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "phone": ADMIN_PHONE, "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    reply.cookie.unwrap()
}

fn order_body(service_id: i32) -> Value {
    json!({
        "service_id": service_id,
        "racquet_type": "Li-Ning Turbo Charging 75",
        "string_type": "BG66 Ultimax",
        "tension": "27 lbs",
        "pickup_address": "221 Baker Street",
        "pickup_slot": "2025-03-01T10:30:00",
        "string_price": 100
    })
}

fn partner_body(name: &str) -> Value {
    json!({
        "business_name": name,
        "address": "12 Court Road",
        "city": "Pune",
        "pincode": "411001",
        "bank_account": "001122334455",
        "ifsc_code": "HDFC0001234"
    })
}

#[tokio::test]
async fn test_register_sets_session_cookie() {
    let app = app().await;

    let reply = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "phone": "9000000001", "password": "secret", "name": "Asha" })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json["message"], "Registration successful");
    assert_eq!(reply.json["user"]["role"], "customer");
    let set_cookie = reply.set_cookie.unwrap();
    assert!(set_cookie.starts_with("session="));
    assert!(set_cookie.contains("HttpOnly"));

    let me = send(&app, Method::GET, "/api/auth/me", reply.cookie.as_deref(), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json["phone"], "9000000001");
    assert_eq!(me.json["name"], "Asha");
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = app().await;

    let missing = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "phone": "9000000001" })),
    )
    .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert!(missing.json["error"].as_str().unwrap().contains("password"));

    register(&app, "9000000002").await;
    let duplicate = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "phone": "9000000002", "password": "other" })),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json["error"], "Phone number already registered");
}

#[tokio::test]
async fn test_session_required() {
    let app = app().await;

    let anonymous = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.json, json!({ "error": "Not authenticated" }));

    let forged = send(&app, Method::GET, "/api/orders/my", Some("session=not-a-token"), None).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let admin_only = send(&app, Method::GET, "/api/admin/analytics", None, None).await;
    assert_eq!(admin_only.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_role_is_forbidden() {
    let app = app().await;
    let customer = register(&app, "9000000001").await;

    for uri in ["/api/admin/analytics", "/api/admin/partners", "/api/partner/orders"] {
        let reply = send(&app, Method::GET, uri, Some(&customer), None).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(reply.json["error"], "Unauthorized");
    }
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = app().await;
    register(&app, "9000000001").await;

    let wrong = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "phone": "9000000001", "password": "nope" })),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json["error"], "Invalid credentials");

    let ok = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "phone": "9000000001", "password": "secret" })),
    )
    .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.json["message"], "Login successful");

    let logout = send(&app, Method::POST, "/api/auth/logout", ok.cookie.as_deref(), None).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.set_cookie.unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_order_placement_and_visibility() {
    let app = app().await;
    let alice = register(&app, "9000000001").await;
    let bob = register(&app, "9000000002").await;

    let services = send(&app, Method::GET, "/api/services", None, None).await;
    assert_eq!(services.json.as_array().unwrap().len(), 4);

    let mut body = order_body(1);
    body["coupon_code"] = json!("FIRST50");
    let created = send(&app, Method::POST, "/api/orders", Some(&alice), Some(body)).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json["message"], "Order created successfully");
    // (299 + 100) - 50% = 199.5
    assert_eq!(created.json["total_price"], 199.5);
    let order_id = created.json["order_id"].as_i64().unwrap();

    let mine = send(&app, Method::GET, "/api/orders/my", Some(&alice), None).await;
    assert_eq!(mine.json.as_array().unwrap().len(), 1);
    let theirs = send(&app, Method::GET, "/api/orders/my", Some(&bob), None).await;
    assert!(theirs.json.as_array().unwrap().is_empty());

    let uri = format!("/api/orders/{order_id}");
    let detail = send(&app, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.json["service"]["name"], "Badminton Restringing");
    assert_eq!(detail.json["discount"], 199.5);

    let denied = send(&app, Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let missing = send(&app, Method::GET, "/api/orders/999", Some(&alice), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let malformed = send(&app, Method::GET, "/api/orders/abc", Some(&alice), None).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_requires_pickup_slot() {
    let app = app().await;
    let alice = register(&app, "9000000001").await;

    let reply = send(
        &app,
        Method::POST,
        "/api/orders",
        Some(&alice),
        Some(json!({ "service_id": 1 })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json["error"].as_str().unwrap().contains("pickup_slot"));
}

#[tokio::test]
async fn test_coupon_validation() {
    let app = app().await;

    let ok = send(
        &app,
        Method::POST,
        "/api/coupons/validate",
        None,
        Some(json!({ "code": "FIRST50", "order_value": 300 })),
    )
    .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(
        ok.json,
        json!({ "valid": true, "discount": 150.0, "discount_type": "percentage", "discount_value": 50.0 })
    );

    let unknown = send(
        &app,
        Method::POST,
        "/api/coupons/validate",
        None,
        Some(json!({ "code": "NOPE", "order_value": 300 })),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.json["error"], "Invalid coupon code");
}

#[tokio::test]
async fn test_partner_fulfilment_flow() {
    let app = app().await;
    let customer = register(&app, "9000000001").await;
    let applicant = register(&app, "9000000002").await;
    let admin = login_admin(&app).await;

    let order = send(&app, Method::POST, "/api/orders", Some(&customer), Some(order_body(2))).await;
    let order_id = order.json["order_id"].as_i64().unwrap();

    let registered = send(
        &app,
        Method::POST,
        "/api/partner/register",
        Some(&applicant),
        Some(partner_body("Smash Strings")),
    )
    .await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.json["partner"]["status"], "pending");
    assert!(registered.json["partner"].get("bank_account").is_none());
    let partner_id = registered.json["partner"]["id"].as_i64().unwrap();
    let partner = registered.cookie.unwrap();

    let again = send(
        &app,
        Method::POST,
        "/api/partner/register",
        Some(&partner),
        Some(partner_body("Smash Strings")),
    )
    .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let approved = send(
        &app,
        Method::PUT,
        &format!("/api/admin/partners/{partner_id}/approve"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(approved.status, StatusCode::OK);
    assert_eq!(approved.json["partner"]["status"], "approved");

    let unknown_partner = send(
        &app,
        Method::PUT,
        &format!("/api/admin/orders/{order_id}/assign"),
        Some(&admin),
        Some(json!({ "partner_id": 999 })),
    )
    .await;
    assert_eq!(unknown_partner.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown_partner.json["error"], "Partner not found");

    let assigned = send(
        &app,
        Method::PUT,
        &format!("/api/admin/orders/{order_id}/assign"),
        Some(&admin),
        Some(json!({ "partner_id": partner_id })),
    )
    .await;
    assert_eq!(assigned.status, StatusCode::OK);

    let status_uri = format!("/api/partner/orders/{order_id}/status");
    let invalid = send(&app, Method::PUT, &status_uri, Some(&partner), Some(json!({ "status": "shipped" }))).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json["error"], "Invalid status: shipped");

    let updated = send(&app, Method::PUT, &status_uri, Some(&partner), Some(json!({ "status": "in_repair" }))).await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json["status"], "in_repair");

    let filtered = send(&app, Method::GET, "/api/partner/orders?status=in_repair", Some(&partner), None).await;
    assert_eq!(filtered.json.as_array().unwrap().len(), 1);
    let none = send(&app, Method::GET, "/api/partner/orders?status=delivered", Some(&partner), None).await;
    assert!(none.json.as_array().unwrap().is_empty());

    let analytics = send(&app, Method::GET, "/api/admin/analytics", Some(&admin), None).await;
    assert_eq!(
        analytics.json,
        json!({ "total_orders": 1, "total_revenue": 499.0, "active_partners": 1, "pending_orders": 0 })
    );

    let admin_orders = send(&app, Method::GET, "/api/admin/orders?status=in_repair", Some(&admin), None).await;
    assert_eq!(admin_orders.json[0]["partner_name"], "Smash Strings");
}

#[tokio::test]
async fn test_static_files() {
    let app = app().await;

    let index = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(index.status, StatusCode::OK);
    assert!(index.text.contains("<html"));

    let missing = send(&app, Method::GET, "/missing.js", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json, json!({ "error": "File not found" }));

    let escape = send(&app, Method::GET, "/../Cargo.toml", None, None).await;
    assert_eq!(escape.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = app().await;

    let health = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(health.text, "OK");

    send(&app, Method::GET, "/api/services", None, None).await;
    let metrics = send(&app, Method::GET, "/metrics", None, None).await;
    assert_eq!(metrics.status, StatusCode::OK);
    assert!(metrics.text.contains("endpoint=\"/api/services\""));
}
