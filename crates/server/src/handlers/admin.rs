//! `/api/admin/*`: admin-only oversight.

use axum::{Json, extract::State, response::IntoResponse};
use model::{Analytics, OrderSummary, Partner, Role};
use serde_json::json;
use service::AssignPartnerRequest;

use super::StatusFilter;
use crate::{
    AppState,
    error::{ApiError, ApiJson, ApiPath, ApiQuery},
    session::Session,
};

pub async fn partners(State(state): State<AppState>, session: Session) -> Result<Json<Vec<Partner>>, ApiError> {
    session.require(Role::Admin)?;
    Ok(Json(state.service.list_partners().await?))
}

pub async fn approve_partner(
    State(state): State<AppState>,
    session: Session,
    ApiPath(partner_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    session.require(Role::Admin)?;
    let partner = state.service.approve_partner(partner_id).await?;
    Ok(Json(json!({ "message": "Partner approved", "partner": partner })))
}

pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    ApiQuery(filter): ApiQuery<StatusFilter>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    session.require(Role::Admin)?;
    let status = filter.parse()?;
    Ok(Json(state.service.list_all_orders(status).await?))
}

pub async fn assign_partner(
    State(state): State<AppState>,
    session: Session,
    ApiPath(order_id): ApiPath<i32>,
    ApiJson(request): ApiJson<AssignPartnerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    session.require(Role::Admin)?;
    state.service.assign_partner(order_id, request).await?;
    Ok(Json(json!({ "message": "Partner assigned successfully" })))
}

pub async fn analytics(State(state): State<AppState>, session: Session) -> Result<Json<Analytics>, ApiError> {
    session.require(Role::Admin)?;
    Ok(Json(state.service.analytics().await?))
}
