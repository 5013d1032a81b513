//! Partner onboarding and order fulfilment.

use chrono::Utc;
use model::{Actor, NewPartner, Order, OrderStatus, OrderSummary, Partner, Role};
use repository::OrderFilter;
use tracing::{info, instrument, warn};

use crate::{MarketplaceService, ServiceError, check_len, not_found, require_text};

impl MarketplaceService {
    /// Files a partner profile for the session user and upgrades the stored role to
    /// partner. The profile starts as pending until an admin approves it.
    ///
    /// Returns the profile and the actor with its new role, so the caller can refresh
    /// the session.
    #[instrument(skip(self, application), fields(user_id = actor.user_id))]
    pub async fn register_partner(&self, actor: Actor, application: NewPartner) -> Result<(Partner, Actor), ServiceError> {
        require_text("business_name", &application.business_name, 200)?;
        require_text("address", &application.address, usize::MAX)?;
        require_text("city", &application.city, 100)?;
        require_text("pincode", &application.pincode, 10)?;
        require_text("bank_account", &application.bank_account, 50)?;
        require_text("ifsc_code", &application.ifsc_code, 20)?;
        check_len("gst_number", application.gst_number.as_deref(), 50)?;

        let partner = self
            .repos
            .partners
            .register(actor.user_id, &application)
            .await
            .map_err(not_found("User not found"))?;

        info!(partner_id = partner.id, "Partner registration submitted");
        Ok((
            partner,
            Actor {
                user_id: actor.user_id,
                role: Role::Partner,
            },
        ))
    }

    async fn own_partner_profile(&self, actor: Actor) -> Result<Partner, ServiceError> {
        self.repos
            .partners
            .find_by_user_id(actor.user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Partner profile not found".into()))
    }

    /// Orders assigned to the session partner, newest first, optionally by status.
    #[instrument(skip(self))]
    pub async fn partner_orders(&self, actor: Actor, status: Option<OrderStatus>) -> Result<Vec<OrderSummary>, ServiceError> {
        let partner = self.own_partner_profile(actor).await?;
        let filter = OrderFilter {
            partner_id: Some(partner.id),
            status,
            ..Default::default()
        };
        Ok(self.repos.orders.list(filter).await?)
    }

    /// Moves an order assigned to the session partner to any lifecycle status.
    ///
    /// `delivered` stamps `completed_at` and adds one to the partner's completed
    /// orders every time it is set, including repeats.
    #[instrument(skip(self))]
    pub async fn update_order_status(&self, actor: Actor, order_id: i32, status: OrderStatus) -> Result<Order, ServiceError> {
        let partner = self.own_partner_profile(actor).await?;
        let order = self
            .repos
            .orders
            .get_by_id(order_id)
            .await
            .map_err(not_found("Order not found"))?;

        if order.partner_id != Some(partner.id) {
            warn!(order_id, partner_id = partner.id, "Status update for order not assigned to partner");
            return Err(ServiceError::NotFound("Order not found".into()));
        }
        if status == OrderStatus::Delivered && order.status == OrderStatus::Delivered {
            warn!(order_id, "Order marked delivered again, completion counted twice");
        }

        let updated = self
            .repos
            .orders
            .update_status(order_id, status, Utc::now())
            .await
            .map_err(not_found("Order not found"))?;

        info!(order_id, from = %order.status, to = %status, "Order status updated");
        Ok(updated)
    }
}
