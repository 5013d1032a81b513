mod common;

use common::{ADMIN_PHONE, harness};
use model::Role;
use service::{LoginRequest, SeedConfig, SeedReport};

fn config() -> SeedConfig {
    SeedConfig {
        admin_phone: ADMIN_PHONE.to_string(),
        admin_password: "admin123".to_string(),
    }
}

#[tokio::test]
async fn test_seed_creates_defaults_once() {
    let h = harness();

    let first = h.service.seed_defaults(&config()).await.unwrap();
    assert_eq!(
        first,
        SeedReport {
            admin_created: true,
            services_created: 4,
            coupon_created: true,
        }
    );

    let second = h.service.seed_defaults(&config()).await.unwrap();
    assert_eq!(second, SeedReport::default());
    assert_eq!(h.service.list_services().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_seeded_admin_can_log_in() {
    let h = harness();
    h.service.seed_defaults(&config()).await.unwrap();

    let admin = h
        .service
        .login(LoginRequest {
            phone: ADMIN_PHONE.to_string(),
            password: "admin123".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(admin.role, Role::Admin);
    assert_eq!(admin.name.as_deref(), Some("Admin User"));
}
