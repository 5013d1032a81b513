//! Session extraction and role gates.

use auth::{SESSION_COOKIE, cookie_value};
use axum::{extract::FromRequestParts, http::header::COOKIE, http::request::Parts};
use model::{Actor, Role};
use tracing::{debug, warn};

use crate::{AppState, error::ApiError};

/// The authenticated caller, read from the signed session cookie.
///
/// Extraction fails with 401 when the cookie is missing, tampered with or expired.
#[derive(Debug, Clone, Copy)]
pub struct Session(pub Actor);

impl Session {
    /// Passes only sessions holding `role`; anything else is a 403.
    pub fn require(self, role: Role) -> Result<Actor, ApiError> {
        if self.0.role == role {
            Ok(self.0)
        } else {
            warn!(user_id = self.0.user_id, have = %self.0.role, need = %role, "Role gate rejected session");
            Err(ApiError::forbidden())
        }
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|header| cookie_value(header, SESSION_COOKIE))
            .filter(|token| !token.is_empty())
            .ok_or_else(ApiError::unauthenticated)?;

        let actor = state.sessions.verify(token).map_err(|e| {
            debug!(error = %e, "Session token rejected");
            ApiError::unauthenticated()
        })?;
        Ok(Session(actor))
    }
}
