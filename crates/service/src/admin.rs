//! Admin oversight: partner approval, order assignment and analytics.

use chrono::Utc;
use model::{Analytics, Order, OrderStatus, OrderSummary, Partner, PartnerStatus};
use repository::OrderFilter;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{ADMIN_ORDER_LIMIT, MarketplaceService, ServiceError, not_found};

#[derive(Debug, Clone, Deserialize)]
pub struct AssignPartnerRequest {
    pub partner_id: i32,
}

impl MarketplaceService {
    #[instrument(skip(self))]
    pub async fn list_partners(&self) -> Result<Vec<Partner>, ServiceError> {
        Ok(self.repos.partners.list().await?)
    }

    #[instrument(skip(self))]
    pub async fn approve_partner(&self, partner_id: i32) -> Result<Partner, ServiceError> {
        let partner = self
            .repos
            .partners
            .set_status(partner_id, PartnerStatus::Approved)
            .await
            .map_err(not_found("Partner not found"))?;
        info!(partner_id, "Partner approved");
        Ok(partner)
    }

    /// All orders, newest first, capped at [`ADMIN_ORDER_LIMIT`].
    #[instrument(skip(self))]
    pub async fn list_all_orders(&self, status: Option<OrderStatus>) -> Result<Vec<OrderSummary>, ServiceError> {
        let filter = OrderFilter {
            status,
            limit: Some(ADMIN_ORDER_LIMIT),
            ..Default::default()
        };
        Ok(self.repos.orders.list(filter).await?)
    }

    /// Hands an order to a partner and moves it to `assigned`, whatever its current status.
    #[instrument(skip(self, request), fields(partner_id = request.partner_id))]
    pub async fn assign_partner(&self, order_id: i32, request: AssignPartnerRequest) -> Result<Order, ServiceError> {
        self.repos
            .orders
            .get_by_id(order_id)
            .await
            .map_err(not_found("Order not found"))?;
        self.repos
            .partners
            .get_by_id(request.partner_id)
            .await
            .map_err(not_found("Partner not found"))?;

        let order = self
            .repos
            .orders
            .assign_partner(order_id, request.partner_id, Utc::now())
            .await
            .map_err(not_found("Order not found"))?;
        info!(order_id, "Partner assigned");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn analytics(&self) -> Result<Analytics, ServiceError> {
        Ok(self.repos.orders.analytics().await?)
    }
}
