//! Business logic layer for the restringing marketplace.
//!
//! This module defines [`MarketplaceService`], which coordinates the repositories to
//! implement the customer, partner and admin use cases, and the error type shared by
//! all of them, [`ServiceError`].
//!
//! # Features
//! - Account registration and login with bcrypt-hashed passwords.
//! - Order placement with coupon discounts priced by the rules in [`pricing`].
//! - Partner onboarding and order fulfilment through the status lifecycle.
//! - Admin oversight: partner approval, order assignment, analytics.
//! - Idempotent bootstrap of the default admin, catalog and coupon.
//!
//! Role gating happens in the HTTP layer. Methods here take the session [`Actor`]
//! only where the outcome depends on who is asking (ownership, own profile).

use auth::{AuthError, PasswordHasher};
use repository::{Repositories, RepositoryError};
use thiserror::Error;

pub mod accounts;
pub mod admin;
pub mod bootstrap;
pub mod orders;
pub mod partners;
pub mod pricing;

pub use accounts::{LoginRequest, RegisterRequest};
pub use admin::AssignPartnerRequest;
pub use bootstrap::{SeedConfig, SeedReport};
pub use model::Actor;
pub use orders::{CreateOrderRequest, CreatedOrder};
pub use pricing::{CouponQuote, ValidateCouponRequest};

/// Maximum number of orders returned by the admin listing.
pub const ADMIN_ORDER_LIMIT: i64 = 100;

/// The main error type for all operations in [`MarketplaceService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No valid identity, or credentials did not match.
    #[error("{0}")]
    Unauthenticated(String),
    /// The identity is known but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// The request clashes with existing state (duplicate phone, unusable coupon, ...).
    #[error("{0}")]
    Conflict(String),
    /// The request itself is malformed.
    #[error("{0}")]
    Validation(String),
    /// A repository (database) operation failed.
    #[error("Database error: {0}")]
    Repository(RepositoryError),
    /// Password hashing or session signing failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => ServiceError::Conflict(message),
            other => ServiceError::Repository(other),
        }
    }
}

/// Turns [`RepositoryError::NotFound`] into a [`ServiceError::NotFound`] with a message
/// naming the missing entity; other errors convert as usual.
pub(crate) fn not_found(message: &'static str) -> impl FnOnce(RepositoryError) -> ServiceError {
    move |err| match err {
        RepositoryError::NotFound => ServiceError::NotFound(message.to_string()),
        other => other.into(),
    }
}

/// Checks that a required text field is present and within its column width.
pub(crate) fn require_text(field: &str, value: &str, max_len: usize) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    check_len(field, Some(value), max_len)
}

/// Checks that an optional text field fits its column width.
pub(crate) fn check_len(field: &str, value: Option<&str>, max_len: usize) -> Result<(), ServiceError> {
    match value {
        Some(v) if v.chars().count() > max_len => Err(ServiceError::Validation(format!(
            "{field} must be at most {max_len} characters"
        ))),
        _ => Ok(()),
    }
}

/// Use cases of the marketplace, backed by the given repositories.
#[derive(Clone)]
pub struct MarketplaceService {
    repos: Repositories,
    hasher: PasswordHasher,
    allow_role_self_assignment: bool,
}

impl MarketplaceService {
    /// Constructs a new [`MarketplaceService`].
    ///
    /// # Arguments
    /// * `repos` - Repository handles (PostgreSQL in production, in-memory in tests).
    /// * `hasher` - Password hasher configured with the bcrypt cost.
    pub fn new(repos: Repositories, hasher: PasswordHasher) -> Self {
        Self {
            repos,
            hasher,
            allow_role_self_assignment: true,
        }
    }

    /// Whether registration honours a caller-supplied non-customer role.
    pub fn with_role_self_assignment(mut self, allowed: bool) -> Self {
        self.allow_role_self_assignment = allowed;
        self
    }
}
