//! In-process implementation of every repository trait.
//!
//! All tables live behind one lock, so each trait method observes and mutates a
//! consistent snapshot. Checks run before any mutation, which gives the same
//! all-or-nothing outcome as the PostgreSQL transactions.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    Analytics, Coupon, NewCoupon, NewOrder, NewPartner, NewService, NewUser, Order, OrderStatus,
    OrderSummary, Partner, PartnerStatus, Role, Service, User,
};
use tokio::sync::RwLock;

use crate::{
    CouponsRepository, OrderFilter, OrdersRepository, PartnersRepository, RepositoryError,
    ServicesRepository, UsersRepository,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    partners: Vec<Partner>,
    services: Vec<Service>,
    coupons: Vec<Coupon>,
    orders: Vec<Order>,
}

fn next_id(len: usize) -> i32 {
    i32::try_from(len + 1).unwrap_or(i32::MAX)
}

/// Thread-safe in-memory store implementing all repositories.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_next_order_insert: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next [`OrdersRepository::insert`] fail after validation, as a lost
    /// connection would in the middle of a transaction.
    pub fn fail_next_order_insert(&self) {
        self.fail_next_order_insert.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UsersRepository for MemoryStore {
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.phone == user.phone) {
            return Err(RepositoryError::Conflict("Phone number already registered".into()));
        }
        let created = User {
            id: next_id(tables.users.len()),
            phone: user.phone.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> Result<User, RepositoryError> {
        let tables = self.tables.read().await;
        tables.users.iter().find(|u| u.id == id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.phone == phone).cloned())
    }
}

#[async_trait]
impl PartnersRepository for MemoryStore {
    async fn register(&self, user_id: i32, partner: &NewPartner) -> Result<Partner, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.partners.iter().any(|p| p.user_id == user_id) {
            return Err(RepositoryError::Conflict("Partner profile already exists".into()));
        }
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(RepositoryError::NotFound)?;
        user.role = Role::Partner;

        let created = Partner {
            id: next_id(tables.partners.len()),
            user_id,
            business_name: partner.business_name.clone(),
            address: partner.address.clone(),
            city: partner.city.clone(),
            pincode: partner.pincode.clone(),
            gst_number: partner.gst_number.clone(),
            bank_account: partner.bank_account.clone(),
            ifsc_code: partner.ifsc_code.clone(),
            status: PartnerStatus::Pending,
            commission_rate: 20.0,
            rating: 0.0,
            total_orders: 0,
            created_at: Utc::now(),
        };
        tables.partners.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> Result<Partner, RepositoryError> {
        let tables = self.tables.read().await;
        tables.partners.iter().find(|p| p.id == id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn find_by_user_id(&self, user_id: i32) -> Result<Option<Partner>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.partners.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Partner>, RepositoryError> {
        Ok(self.tables.read().await.partners.clone())
    }

    async fn set_status(&self, id: i32, status: PartnerStatus) -> Result<Partner, RepositoryError> {
        let mut tables = self.tables.write().await;
        let partner = tables
            .partners
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        partner.status = status;
        Ok(partner.clone())
    }
}

#[async_trait]
impl ServicesRepository for MemoryStore {
    async fn list_active(&self) -> Result<Vec<Service>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.services.iter().filter(|s| s.is_active).cloned().collect())
    }

    async fn get_by_id(&self, id: i32) -> Result<Service, RepositoryError> {
        let tables = self.tables.read().await;
        tables.services.iter().find(|s| s.id == id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn insert(&self, service: &NewService) -> Result<Service, RepositoryError> {
        let mut tables = self.tables.write().await;
        let created = Service {
            id: next_id(tables.services.len()),
            name: service.name.clone(),
            category: service.category.clone(),
            base_price: service.base_price,
            description: service.description.clone(),
            image_url: service.image_url.clone(),
            is_active: true,
        };
        tables.services.push(created.clone());
        Ok(created)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(self.tables.read().await.services.len() as i64)
    }
}

#[async_trait]
impl CouponsRepository for MemoryStore {
    async fn find_active_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.coupons.iter().find(|c| c.code == code && c.is_active).cloned())
    }

    async fn insert(&self, coupon: &NewCoupon) -> Result<Coupon, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.coupons.iter().any(|c| c.code == coupon.code) {
            return Err(RepositoryError::Conflict("Coupon code already exists".into()));
        }
        let created = Coupon {
            id: next_id(tables.coupons.len()),
            code: coupon.code.clone(),
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
            min_order_value: coupon.min_order_value,
            max_discount: coupon.max_discount,
            valid_from: coupon.valid_from,
            valid_until: coupon.valid_until,
            usage_limit: coupon.usage_limit,
            usage_count: 0,
            is_active: true,
        };
        tables.coupons.push(created.clone());
        Ok(created)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(self.tables.read().await.coupons.len() as i64)
    }
}

impl Tables {
    fn summary(&self, order: &Order) -> OrderSummary {
        let customer_name = self
            .users
            .iter()
            .find(|u| u.id == order.customer_id)
            .and_then(|u| u.name.clone());
        let service_name = self
            .services
            .iter()
            .find(|s| s.id == order.service_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let partner_name = order
            .partner_id
            .and_then(|id| self.partners.iter().find(|p| p.id == id))
            .map(|p| p.business_name.clone());

        OrderSummary {
            id: order.id,
            order_number: order.order_number.clone(),
            customer_name,
            service_name,
            partner_name,
            status: order.status,
            total_price: order.total_price,
            pickup_slot: order.pickup_slot,
            created_at: order.created_at,
        }
    }
}

#[async_trait]
impl OrdersRepository for MemoryStore {
    async fn insert(&self, order: &NewOrder, coupon_id: Option<i32>) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.orders.iter().any(|o| o.order_number == order.order_number) {
            return Err(RepositoryError::Conflict("Order number already exists".into()));
        }
        if self.fail_next_order_insert.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("order insert aborted".into()));
        }

        if let Some(coupon_id) = coupon_id {
            if let Some(coupon) = tables.coupons.iter_mut().find(|c| c.id == coupon_id) {
                coupon.usage_count += 1;
            }
        }

        let now = Utc::now();
        let created = Order {
            id: next_id(tables.orders.len()),
            order_number: order.order_number.clone(),
            customer_id: order.customer_id,
            partner_id: None,
            service_id: order.service_id,
            racquet_type: order.racquet_type.clone(),
            string_type: order.string_type.clone(),
            tension: order.tension.clone(),
            pickup_address: order.pickup_address.clone(),
            pickup_slot: Some(order.pickup_slot),
            base_price: order.base_price,
            string_price: order.string_price,
            discount: order.discount,
            total_price: order.total_price,
            status: OrderStatus::Pending,
            payment_status: "pending".to_string(),
            payment_method: Some(order.payment_method.clone()),
            pickup_tracking_id: None,
            delivery_tracking_id: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        tables.orders.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> Result<Order, RepositoryError> {
        let tables = self.tables.read().await;
        tables.orders.iter().find(|o| o.id == id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<OrderSummary>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<&Order> = tables
            .orders
            .iter()
            .filter(|o| filter.customer_id.is_none_or(|id| o.customer_id == id))
            .filter(|o| filter.partner_id.is_none_or(|id| o.partner_id == Some(id)))
            .filter(|o| filter.status.is_none_or(|status| o.status == status))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let limit = filter
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        Ok(orders.into_iter().take(limit).map(|o| tables.summary(o)).collect())
    }

    async fn assign_partner(&self, id: i32, partner_id: i32, at: DateTime<Utc>) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.partner_id = Some(partner_id);
        order.status = OrderStatus::Assigned;
        order.updated_at = at;
        Ok(order.clone())
    }

    async fn update_status(&self, id: i32, status: OrderStatus, at: DateTime<Utc>) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = status;
        order.updated_at = at;
        if status == OrderStatus::Delivered {
            order.completed_at = Some(at);
        }
        let updated = order.clone();

        if let (OrderStatus::Delivered, Some(partner_id)) = (status, updated.partner_id) {
            if let Some(partner) = tables.partners.iter_mut().find(|p| p.id == partner_id) {
                partner.total_orders += 1;
            }
        }
        Ok(updated)
    }

    async fn analytics(&self) -> Result<Analytics, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(Analytics {
            total_orders: tables.orders.len() as i64,
            total_revenue: tables.orders.iter().map(|o| o.total_price).sum(),
            active_partners: tables
                .partners
                .iter()
                .filter(|p| p.status == PartnerStatus::Approved)
                .count() as i64,
            pending_orders: tables
                .orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count() as i64,
        })
    }
}
