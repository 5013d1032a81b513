mod common;

use common::{harness, register_request};
use model::{Actor, Role};
use service::{LoginRequest, ServiceError};

#[tokio::test]
async fn test_register_defaults_to_customer() {
    let h = harness();

    let user = h.service.register(register_request("9000000001", None)).await.unwrap();

    assert_eq!(user.role, Role::Customer);
    assert_eq!(user.phone, "9000000001");
    assert_eq!(user.name.as_deref(), Some("User 9000000001"));
}

#[tokio::test]
async fn test_register_duplicate_phone_is_conflict() {
    let h = harness();
    h.service.register(register_request("9000000001", None)).await.unwrap();

    let err = h.service.register(register_request("9000000001", None)).await.unwrap_err();

    assert!(matches!(err, ServiceError::Conflict(ref msg) if msg == "Phone number already registered"));
}

#[tokio::test]
async fn test_register_requires_phone_and_password() {
    let h = harness();

    let mut request = register_request("", None);
    let err = h.service.register(request.clone()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    request.phone = "9000000001".to_string();
    request.password = String::new();
    let err = h.service.register(request).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref msg) if msg == "password is required"));
}

#[tokio::test]
async fn test_long_passwords_never_share_a_login() {
    let h = harness();

    let mut request = register_request("9000000001", None);
    request.password = "x".repeat(100);
    let err = h.service.register(request.clone()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref msg) if msg == "password must be at most 72 bytes"));

    request.password = "x".repeat(72);
    h.service.register(request).await.unwrap();

    let err = h
        .service
        .login(LoginRequest {
            phone: "9000000001".to_string(),
            password: "x".repeat(80),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated(ref msg) if msg == "Invalid credentials"));

    let user = h
        .service
        .login(LoginRequest {
            phone: "9000000001".to_string(),
            password: "x".repeat(72),
        })
        .await
        .unwrap();
    assert_eq!(user.phone, "9000000001");
}

#[tokio::test]
async fn test_register_role_self_assignment() {
    let h = harness();

    let admin = h.service.register(register_request("9000000001", Some("admin"))).await.unwrap();
    assert_eq!(admin.role, Role::Admin);

    let err = h
        .service
        .register(register_request("9000000002", Some("superuser")))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref msg) if msg == "Invalid role: superuser"));
}

#[tokio::test]
async fn test_register_role_self_assignment_disabled() {
    let h = harness();
    let service = h.service.clone().with_role_self_assignment(false);

    let err = service
        .register(register_request("9000000001", Some("partner")))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    // An explicit customer role is still fine.
    let user = service
        .register(register_request("9000000002", Some("customer")))
        .await
        .unwrap();
    assert_eq!(user.role, Role::Customer);
}

#[tokio::test]
async fn test_login_checks_password() {
    let h = harness();
    let registered = h.service.register(register_request("9000000001", None)).await.unwrap();

    let user = h
        .service
        .login(LoginRequest {
            phone: "9000000001".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(user, registered);
}

#[tokio::test]
async fn test_login_failures_share_generic_message() {
    let h = harness();
    h.service.register(register_request("9000000001", None)).await.unwrap();

    let wrong_password = h
        .service
        .login(LoginRequest {
            phone: "9000000001".to_string(),
            password: "not-it".to_string(),
        })
        .await
        .unwrap_err();
    let unknown_phone = h
        .service
        .login(LoginRequest {
            phone: "9000000009".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, ServiceError::Unauthenticated(ref msg) if msg == "Invalid credentials"));
    assert_eq!(wrong_password.to_string(), unknown_phone.to_string());
}

#[tokio::test]
async fn test_current_user_for_vanished_account_is_unauthenticated() {
    let h = harness();

    let err = h
        .service
        .current_user(Actor {
            user_id: 42,
            role: Role::Customer,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Unauthenticated(ref msg) if msg == "Not authenticated"));
}
