//! Request handlers, grouped by audience.

pub mod account;
pub mod admin;
pub mod assets;
pub mod orders;
pub mod partner;

use model::OrderStatus;
use serde::Deserialize;

use crate::error::ApiError;

/// `?status=` filter shared by the partner and admin order listings.
#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

impl StatusFilter {
    /// An absent or empty filter means all statuses.
    pub fn parse(&self) -> Result<Option<OrderStatus>, ApiError> {
        match self.status.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => parse_status(raw).map(Some),
        }
    }
}

pub(crate) fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.parse::<OrderStatus>()
        .map_err(|e| ApiError::bad_request(format!("Invalid status: {}", e.value)))
}
