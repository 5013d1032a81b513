//! Catalog, customer orders and coupon validation.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use model::{OrderDetail, OrderSummary, Service};
use serde_json::json;
use service::{CouponQuote, CreateOrderRequest, ValidateCouponRequest};

use crate::{
    AppState,
    error::{ApiError, ApiJson, ApiPath},
    session::Session,
};

pub async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(state.service.list_services().await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.service.create_order(actor, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Order created successfully",
            "order_number": created.order_number,
            "order_id": created.order_id,
            "total_price": created.total_price,
        })),
    ))
}

pub async fn my_orders(
    State(state): State<AppState>,
    Session(actor): Session,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(state.service.my_orders(actor).await?))
}

pub async fn order_detail(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(order_id): ApiPath<i32>,
) -> Result<Json<OrderDetail>, ApiError> {
    Ok(Json(state.service.order_detail(actor, order_id).await?))
}

/// Public: quotes a coupon for an order value without consuming it.
pub async fn validate_coupon(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ValidateCouponRequest>,
) -> Result<Json<CouponQuote>, ApiError> {
    Ok(Json(state.service.validate_coupon(request).await?))
}
