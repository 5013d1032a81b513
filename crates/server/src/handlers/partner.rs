//! `/api/partner/*`: onboarding and fulfilment.

use axum::{Json, extract::State, http::StatusCode, http::header::SET_COOKIE, response::IntoResponse};
use model::{NewPartner, OrderSummary, Role};
use serde::Deserialize;
use serde_json::json;

use super::{StatusFilter, parse_status};
use crate::{
    AppState,
    error::{ApiError, ApiJson, ApiPath, ApiQuery},
    session::Session,
};

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Open to any signed-in user. The session is re-issued with the partner role.
pub async fn register(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiJson(application): ApiJson<NewPartner>,
) -> Result<impl IntoResponse, ApiError> {
    let (partner, upgraded) = state.service.register_partner(actor, application).await?;
    let cookie = state.session_cookie(upgraded)?;
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(json!({
            "message": "Partner registration submitted for approval",
            "partner": partner,
        })),
    ))
}

pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    ApiQuery(filter): ApiQuery<StatusFilter>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let actor = session.require(Role::Partner)?;
    let status = filter.parse()?;
    Ok(Json(state.service.partner_orders(actor, status).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    ApiPath(order_id): ApiPath<i32>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = session.require(Role::Partner)?;
    let status = parse_status(&update.status)?;
    let order = state.service.update_order_status(actor, order_id, status).await?;
    Ok(Json(json!({
        "message": "Order status updated",
        "status": order.status,
    })))
}
