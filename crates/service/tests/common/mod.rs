#![allow(dead_code)]

use std::sync::Arc;

use auth::PasswordHasher;
use chrono::{Duration, Utc};
use model::{Actor, DiscountType, NewCoupon, NewPartner, NewService, Partner, Role};
use repository::{CouponsRepository, MemoryStore, Repositories, ServicesRepository};
use service::{CreateOrderRequest, MarketplaceService, RegisterRequest, SeedConfig};

pub const ADMIN_PHONE: &str = "9999999999";

pub struct Harness {
    pub service: MarketplaceService,
    pub store: Arc<MemoryStore>,
}

/// Service over an empty in-memory store with the cheapest bcrypt cost.
pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let service = MarketplaceService::new(Repositories::in_memory(store.clone()), PasswordHasher::new(4));
    Harness { service, store }
}

/// Harness with the default admin, catalog and welcome coupon in place.
pub async fn seeded() -> Harness {
    let h = harness();
    h.service
        .seed_defaults(&SeedConfig {
            admin_phone: ADMIN_PHONE.to_string(),
            admin_password: "admin123".to_string(),
        })
        .await
        .unwrap();
    h
}

pub fn register_request(phone: &str, role: Option<&str>) -> RegisterRequest {
    RegisterRequest {
        phone: phone.to_string(),
        password: "secret".to_string(),
        name: Some(format!("User {phone}")),
        email: None,
        role: role.map(str::to_string),
    }
}

pub async fn customer(h: &Harness, phone: &str) -> Actor {
    let user = h.service.register(register_request(phone, None)).await.unwrap();
    Actor {
        user_id: user.id,
        role: user.role,
    }
}

pub fn admin_actor() -> Actor {
    // The seeded admin is the first user.
    Actor {
        user_id: 1,
        role: Role::Admin,
    }
}

pub fn partner_application(name: &str) -> NewPartner {
    NewPartner {
        business_name: name.to_string(),
        address: "12 Court Road".to_string(),
        city: "Bengaluru".to_string(),
        pincode: "560001".to_string(),
        gst_number: None,
        bank_account: "001122334455".to_string(),
        ifsc_code: "HDFC0001234".to_string(),
    }
}

pub async fn partner(h: &Harness, phone: &str, name: &str) -> (Partner, Actor) {
    let actor = customer(h, phone).await;
    h.service.register_partner(actor, partner_application(name)).await.unwrap()
}

pub fn order_request(service_id: i32) -> CreateOrderRequest {
    CreateOrderRequest {
        service_id,
        racquet_type: Some("Yonex Astrox 88D".to_string()),
        string_type: Some("BG80".to_string()),
        tension: Some("26 lbs".to_string()),
        pickup_address: Some("4 Shuttle Lane".to_string()),
        pickup_slot: "2025-03-01T10:30:00".to_string(),
        string_price: None,
        coupon_code: None,
        payment_method: None,
    }
}

pub fn coupon(code: &str, discount_type: DiscountType, discount_value: f64) -> NewCoupon {
    NewCoupon {
        code: code.to_string(),
        discount_type,
        discount_value,
        min_order_value: 0.0,
        max_discount: None,
        valid_from: None,
        valid_until: Some(Utc::now() + Duration::days(7)),
        usage_limit: None,
    }
}

pub async fn add_coupon(h: &Harness, new: NewCoupon) {
    CouponsRepository::insert(h.store.as_ref(), &new).await.unwrap();
}

pub async fn usage_count(h: &Harness, code: &str) -> i32 {
    h.store.find_active_by_code(code).await.unwrap().unwrap().usage_count
}

/// Adds a catalog entry priced at `base_price` and returns its id.
pub async fn add_service(h: &Harness, name: &str, base_price: f64) -> i32 {
    let created = ServicesRepository::insert(
        h.store.as_ref(),
        &NewService {
            name: name.to_string(),
            category: Some("stringing".to_string()),
            base_price,
            description: None,
            image_url: None,
        },
    )
    .await
    .unwrap();
    created.id
}
