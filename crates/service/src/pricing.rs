//! Order pricing and coupon rules.
//!
//! One rule set serves both call sites. Order placement runs it with
//! [`CouponCheck::OrderCreation`], which only requires the coupon to be active and
//! unexpired and silently drops the discount otherwise. The public validation
//! endpoint runs it with [`CouponCheck::Strict`], which also enforces the usage
//! limit and the minimum order value and reports the first violated rule.

use chrono::{DateTime, Utc};
use model::{Coupon, DiscountType};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::{MarketplaceService, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponCheck {
    OrderCreation,
    Strict,
}

/// Why a coupon cannot be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CouponRejection {
    #[error("Coupon is not active")]
    Inactive,
    #[error("Coupon has expired")]
    Expired,
    #[error("Coupon usage limit reached")]
    UsageLimitReached,
    #[error("Minimum order value {0} required")]
    BelowMinimum(f64),
}

/// Discount granted by a coupon on an order value, before any eligibility check.
///
/// Percentage discounts are capped by `max_discount` when set and non-zero. Fixed
/// discounts are granted in full even when they exceed the order value.
pub fn discount_for(coupon: &Coupon, order_value: f64) -> f64 {
    match coupon.discount_type {
        DiscountType::Percentage => {
            let discount = order_value * (coupon.discount_value / 100.0);
            match coupon.max_discount {
                Some(cap) if cap > 0.0 => discount.min(cap),
                _ => discount,
            }
        }
        DiscountType::Fixed => coupon.discount_value,
    }
}

/// Checks a coupon against the rules of the given call site and returns the discount.
pub fn check_coupon(
    coupon: &Coupon,
    order_value: f64,
    now: DateTime<Utc>,
    check: CouponCheck,
) -> Result<f64, CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if coupon.valid_until.is_some_and(|until| until <= now) {
        return Err(CouponRejection::Expired);
    }
    if check == CouponCheck::Strict {
        // A zero limit means unlimited.
        if coupon.usage_limit.is_some_and(|limit| limit > 0 && coupon.usage_count >= limit) {
            return Err(CouponRejection::UsageLimitReached);
        }
        if order_value < coupon.min_order_value {
            return Err(CouponRejection::BelowMinimum(coupon.min_order_value));
        }
    }
    Ok(discount_for(coupon, order_value))
}

/// Price snapshot stored on an order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBreakdown {
    pub base_price: f64,
    pub string_price: f64,
    pub discount: f64,
    pub total_price: f64,
}

/// `total = base + string - discount`. The total is not floored at zero.
pub fn price_order(base_price: f64, string_price: f64, discount: f64) -> PriceBreakdown {
    PriceBreakdown {
        base_price,
        string_price,
        discount,
        total_price: base_price + string_price - discount,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    #[serde(default)]
    pub order_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouponQuote {
    pub valid: bool,
    pub discount: f64,
    pub discount_type: DiscountType,
    pub discount_value: f64,
}

impl MarketplaceService {
    /// Checks a coupon code for a prospective order value without consuming it.
    ///
    /// # Errors
    /// [`ServiceError::NotFound`] for unknown or inactive codes, [`ServiceError::Conflict`]
    /// naming the first violated rule otherwise.
    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn validate_coupon(&self, request: ValidateCouponRequest) -> Result<CouponQuote, ServiceError> {
        let coupon = self
            .repos
            .coupons
            .find_active_by_code(&request.code)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Invalid coupon code".into()))?;

        let discount = check_coupon(&coupon, request.order_value, Utc::now(), CouponCheck::Strict)
            .map_err(|rejection| ServiceError::Conflict(rejection.to_string()))?;

        info!(discount, "Coupon validated");
        Ok(CouponQuote {
            valid: true,
            discount,
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
        })
    }
}
