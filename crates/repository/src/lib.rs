//! # Data Repository Layer
//!
//! This module provides repository traits for all entities: users, partners,
//! catalog services, coupons and orders, with a PostgreSQL implementation in
//! [`postgres`] and an in-process implementation in `memory` (feature `memory`).
//!
//! Operations that touch more than one table (order creation with a coupon,
//! partner registration, delivery) are single repository calls so that each
//! implementation can apply them atomically.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    Analytics, Coupon, NewCoupon, NewOrder, NewPartner, NewService, NewUser, Order, OrderStatus,
    OrderSummary, Partner, PartnerStatus, Service, User,
};
use thiserror::Error;

#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;
pub use postgres::{
    PgCouponsRepository, PgOrdersRepository, PgPartnersRepository, PgServicesRepository,
    PgUsersRepository,
};

/// # RepositoryError
///
/// Error types that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database-related errors, wrapping the underlying PostgreSQL error
    #[error("Database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    /// Failed to obtain a connection from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    /// No result found.
    #[error("Not found")]
    NotFound,
    /// The storage backend failed outside of a PostgreSQL error.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),
}

/// Filter for order listings. `None` fields do not constrain the result.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderFilter {
    pub customer_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
}

/// # UsersRepository
///
/// Accounts keyed by phone number.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Inserts a user. Fails with [`RepositoryError::Conflict`] if the phone is taken.
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError>;
    async fn get_by_id(&self, id: i32) -> Result<User, RepositoryError>;
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, RepositoryError>;
}

/// # PartnersRepository
///
/// Partner profiles and their approval status.
#[async_trait]
pub trait PartnersRepository: Send + Sync {
    /// Creates the partner profile and upgrades the owning user to the partner role,
    /// atomically. Fails with [`RepositoryError::Conflict`] if the user already has a profile.
    async fn register(&self, user_id: i32, partner: &NewPartner) -> Result<Partner, RepositoryError>;
    async fn get_by_id(&self, id: i32) -> Result<Partner, RepositoryError>;
    async fn find_by_user_id(&self, user_id: i32) -> Result<Option<Partner>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Partner>, RepositoryError>;
    async fn set_status(&self, id: i32, status: PartnerStatus) -> Result<Partner, RepositoryError>;
}

/// # ServicesRepository
///
/// Read-mostly service catalog.
#[async_trait]
pub trait ServicesRepository: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Service>, RepositoryError>;
    async fn get_by_id(&self, id: i32) -> Result<Service, RepositoryError>;
    async fn insert(&self, service: &NewService) -> Result<Service, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

/// # CouponsRepository
#[async_trait]
pub trait CouponsRepository: Send + Sync {
    /// Looks up an active coupon by its code.
    async fn find_active_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError>;
    async fn insert(&self, coupon: &NewCoupon) -> Result<Coupon, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

/// # OrdersRepository
///
/// Orders and the aggregates computed over them.
#[async_trait]
pub trait OrdersRepository: Send + Sync {
    /// Inserts the order and, when `coupon_id` is given, increments that coupon's
    /// usage count in the same transaction. Nothing persists if either write fails.
    async fn insert(&self, order: &NewOrder, coupon_id: Option<i32>) -> Result<Order, RepositoryError>;
    async fn get_by_id(&self, id: i32) -> Result<Order, RepositoryError>;
    /// Lists orders newest first.
    async fn list(&self, filter: OrderFilter) -> Result<Vec<OrderSummary>, RepositoryError>;
    /// Sets the partner and moves the order to `assigned`.
    async fn assign_partner(&self, id: i32, partner_id: i32, at: DateTime<Utc>) -> Result<Order, RepositoryError>;
    /// Sets the status. `delivered` also stamps `completed_at` and increments the
    /// assigned partner's `total_orders` within the same transaction.
    async fn update_status(&self, id: i32, status: OrderStatus, at: DateTime<Utc>) -> Result<Order, RepositoryError>;
    async fn analytics(&self) -> Result<Analytics, RepositoryError>;
}

/// One handle per repository, shared by the service layer.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UsersRepository>,
    pub partners: Arc<dyn PartnersRepository>,
    pub services: Arc<dyn ServicesRepository>,
    pub coupons: Arc<dyn CouponsRepository>,
    pub orders: Arc<dyn OrdersRepository>,
}

impl Repositories {
    /// PostgreSQL-backed repositories sharing one connection pool.
    pub fn postgres(pool: deadpool_postgres::Pool) -> Self {
        Self {
            users: Arc::new(PgUsersRepository::new(pool.clone())),
            partners: Arc::new(PgPartnersRepository::new(pool.clone())),
            services: Arc::new(PgServicesRepository::new(pool.clone())),
            coupons: Arc::new(PgCouponsRepository::new(pool.clone())),
            orders: Arc::new(PgOrdersRepository::new(pool)),
        }
    }

    /// Repositories backed by a single in-process store.
    #[cfg(any(test, feature = "memory"))]
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            partners: store.clone(),
            services: store.clone(),
            coupons: store.clone(),
            orders: store,
        }
    }
}
