//! `/api/auth/*`: registration, login, logout and the current user.

use auth::clear_session_cookie;
use axum::{Json, extract::State, http::StatusCode, http::header::SET_COOKIE, response::IntoResponse};
use model::{Actor, PublicUser};
use serde_json::json;
use service::{LoginRequest, RegisterRequest};

use crate::{
    AppState,
    error::{ApiError, ApiJson},
    session::Session,
};

fn actor_of(user: &PublicUser) -> Actor {
    Actor {
        user_id: user.id,
        role: user.role,
    }
}

/// Creates an account and signs the caller in.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.register(request).await?;
    let cookie = state.session_cookie(actor_of(&user))?;
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(json!({ "message": "Registration successful", "user": user })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.login(request).await?;
    let cookie = state.session_cookie(actor_of(&user))?;
    Ok((
        [(SET_COOKIE, cookie)],
        Json(json!({ "message": "Login successful", "user": user })),
    ))
}

/// Always succeeds, with or without a session.
pub async fn logout() -> impl IntoResponse {
    (
        [(SET_COOKIE, clear_session_cookie())],
        Json(json!({ "message": "Logout successful" })),
    )
}

pub async fn me(State(state): State<AppState>, Session(actor): Session) -> Result<Json<PublicUser>, ApiError> {
    Ok(Json(state.service.current_user(actor).await?))
}
