//! Startup seed: default admin, catalog and welcome coupon.
//!
//! Each step only runs when its data is missing, so seeding on every boot is safe.

use chrono::{Duration, Utc};
use model::{DiscountType, NewCoupon, NewService, NewUser, Role};
use tracing::{info, instrument};

use crate::{MarketplaceService, ServiceError};

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub admin_phone: String,
    pub admin_password: String,
}

/// What a seed run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub services_created: usize,
    pub coupon_created: bool,
}

fn default_services() -> Vec<NewService> {
    let entry = |name: &str, category: &str, base_price: f64, description: &str| NewService {
        name: name.to_string(),
        category: Some(category.to_string()),
        base_price,
        description: Some(description.to_string()),
        image_url: None,
    };
    vec![
        entry("Badminton Restringing", "stringing", 299.0, "Professional badminton racquet restringing"),
        entry("Tennis Restringing", "stringing", 399.0, "Professional tennis racquet restringing"),
        entry("Grip Replacement", "grip", 149.0, "New grip installation"),
        entry("Full Racquet Service", "repair", 599.0, "Complete racquet maintenance"),
    ]
}

fn welcome_coupon() -> NewCoupon {
    let now = Utc::now();
    NewCoupon {
        code: "FIRST50".to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: 50.0,
        min_order_value: 0.0,
        max_discount: Some(200.0),
        valid_from: Some(now),
        valid_until: Some(now + Duration::days(30)),
        usage_limit: Some(100),
    }
}

impl MarketplaceService {
    /// Seeds the default admin account, the catalog and the welcome coupon where missing.
    #[instrument(skip(self, config), fields(admin_phone = %config.admin_phone))]
    pub async fn seed_defaults(&self, config: &SeedConfig) -> Result<SeedReport, ServiceError> {
        let mut report = SeedReport::default();

        if self.repos.users.find_by_phone(&config.admin_phone).await?.is_none() {
            let password_hash = self.hasher.hash(&config.admin_password).await?;
            self.repos
                .users
                .insert(&NewUser {
                    phone: config.admin_phone.clone(),
                    name: Some("Admin User".to_string()),
                    email: None,
                    password_hash,
                    role: Role::Admin,
                })
                .await?;
            report.admin_created = true;
        }

        if self.repos.services.count().await? == 0 {
            for service in default_services() {
                self.repos.services.insert(&service).await?;
                report.services_created += 1;
            }
        }

        if self.repos.coupons.count().await? == 0 {
            self.repos.coupons.insert(&welcome_coupon()).await?;
            report.coupon_created = true;
        }

        info!(?report, "Database seeded");
        Ok(report)
    }
}
