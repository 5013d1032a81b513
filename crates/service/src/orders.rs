//! Catalog browsing, order placement and the customer's view of orders.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::{Actor, NewOrder, OrderDetail, OrderSummary, Role, Service};
use rand::Rng;
use repository::OrderFilter;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::pricing::{self, CouponCheck};
use crate::{MarketplaceService, ServiceError, check_len, not_found};

const ORDER_NUMBER_PREFIX: &str = "RS";
const DEFAULT_PAYMENT_METHOD: &str = "online";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub service_id: i32,
    pub racquet_type: Option<String>,
    pub string_type: Option<String>,
    pub tension: Option<String>,
    pub pickup_address: Option<String>,
    /// ISO 8601 datetime; naive values are taken as UTC.
    pub pickup_slot: String,
    pub string_price: Option<f64>,
    pub coupon_code: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedOrder {
    pub order_id: i32,
    pub order_number: String,
    pub total_price: f64,
}

/// `RS` + date + six random upper-case hex digits, e.g. `RS20250301A1B2C3`.
///
/// Uniqueness is left to the storage constraint.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: [u8; 3] = rand::thread_rng().r#gen();
    format!(
        "{ORDER_NUMBER_PREFIX}{}{:02X}{:02X}{:02X}",
        now.format("%Y%m%d"),
        suffix[0],
        suffix[1],
        suffix[2]
    )
}

/// Parses an ISO 8601 pickup slot. Offsets are honoured; naive values are taken as UTC.
pub fn parse_pickup_slot(raw: &str) -> Result<DateTime<Utc>, ServiceError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(ServiceError::Validation(format!(
        "Invalid pickup_slot '{raw}': expected an ISO 8601 datetime"
    )))
}

impl MarketplaceService {
    /// Active catalog entries.
    #[instrument(skip(self))]
    pub async fn list_services(&self) -> Result<Vec<Service>, ServiceError> {
        Ok(self.repos.services.list_active().await?)
    }

    /// Places an order for the session user.
    ///
    /// The price snapshot is `base + string - discount`. A coupon that is unknown,
    /// inactive or expired is ignored rather than rejected. An applied coupon has its
    /// usage counted in the same transaction as the order insert.
    ///
    /// # Errors
    /// [`ServiceError::NotFound`] for an unknown service, [`ServiceError::Validation`]
    /// for malformed input, [`ServiceError::Conflict`] on an order-number collision.
    #[instrument(skip(self, request), fields(customer_id = actor.user_id, service_id = request.service_id))]
    pub async fn create_order(&self, actor: Actor, request: CreateOrderRequest) -> Result<CreatedOrder, ServiceError> {
        let pickup_slot = parse_pickup_slot(&request.pickup_slot)?;
        let string_price = request.string_price.unwrap_or(0.0);
        if !string_price.is_finite() || string_price < 0.0 {
            return Err(ServiceError::Validation("string_price must be a non-negative number".into()));
        }
        check_len("racquet_type", request.racquet_type.as_deref(), 50)?;
        check_len("string_type", request.string_type.as_deref(), 100)?;
        check_len("tension", request.tension.as_deref(), 20)?;
        check_len("payment_method", request.payment_method.as_deref(), 20)?;

        let service = self
            .repos
            .services
            .get_by_id(request.service_id)
            .await
            .map_err(not_found("Service not found"))?;

        let now = Utc::now();
        let subtotal = service.base_price + string_price;
        let mut applied_coupon = None;
        if let Some(code) = request.coupon_code.as_deref().filter(|c| !c.is_empty()) {
            match self.repos.coupons.find_active_by_code(code).await? {
                Some(coupon) => match pricing::check_coupon(&coupon, subtotal, now, CouponCheck::OrderCreation) {
                    Ok(discount) => applied_coupon = Some((coupon.id, discount)),
                    Err(reason) => warn!(code, %reason, "Coupon not applied"),
                },
                None => warn!(code, "Unknown coupon code ignored"),
            }
        }

        let discount = applied_coupon.map_or(0.0, |(_, discount)| discount);
        let price = pricing::price_order(service.base_price, string_price, discount);

        let new_order = NewOrder {
            order_number: generate_order_number(now),
            customer_id: actor.user_id,
            service_id: service.id,
            racquet_type: request.racquet_type,
            string_type: request.string_type,
            tension: request.tension,
            pickup_address: request.pickup_address,
            pickup_slot,
            base_price: price.base_price,
            string_price: price.string_price,
            discount: price.discount,
            total_price: price.total_price,
            payment_method: request
                .payment_method
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
        };

        let order = self
            .repos
            .orders
            .insert(&new_order, applied_coupon.map(|(id, _)| id))
            .await?;

        info!(
            order_id = order.id,
            order_number = %order.order_number,
            total_price = order.total_price,
            discount = order.discount,
            "Order created"
        );
        Ok(CreatedOrder {
            order_id: order.id,
            order_number: order.order_number,
            total_price: order.total_price,
        })
    }

    /// The session user's orders, newest first.
    #[instrument(skip(self))]
    pub async fn my_orders(&self, actor: Actor) -> Result<Vec<OrderSummary>, ServiceError> {
        let filter = OrderFilter {
            customer_id: Some(actor.user_id),
            ..Default::default()
        };
        Ok(self.repos.orders.list(filter).await?)
    }

    /// Full order card.
    ///
    /// Customers may only read their own orders. Partner and admin sessions may read
    /// any order.
    #[instrument(skip(self))]
    pub async fn order_detail(&self, actor: Actor, order_id: i32) -> Result<OrderDetail, ServiceError> {
        let order = self
            .repos
            .orders
            .get_by_id(order_id)
            .await
            .map_err(not_found("Order not found"))?;

        if actor.role == Role::Customer && order.customer_id != actor.user_id {
            warn!(order_id, "Customer requested another customer's order");
            return Err(ServiceError::Forbidden("Unauthorized".into()));
        }

        let service = self
            .repos
            .services
            .get_by_id(order.service_id)
            .await
            .map_err(not_found("Service not found"))?;
        let partner = match order.partner_id {
            Some(partner_id) => Some(
                self.repos
                    .partners
                    .get_by_id(partner_id)
                    .await
                    .map_err(not_found("Partner not found"))?,
            ),
            None => None,
        };

        Ok(OrderDetail::new(order, &service, partner.as_ref()))
    }
}
