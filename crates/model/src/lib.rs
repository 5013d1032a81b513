use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ошибка разбора строкового значения перечисления.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Role: роль пользователя, определяет доступные эндпоинты.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "snake_case")]
#[postgres(name = "user_role")]
pub enum Role {
    #[default]
    #[postgres(name = "customer")]
    Customer,
    #[postgres(name = "partner")]
    Partner,
    #[postgres(name = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Partner => "partner",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "partner" => Ok(Role::Partner),
            "admin" => Ok(Role::Admin),
            other => Err(ParseEnumError { kind: "role", value: other.to_string() }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PartnerStatus: статус заявки партнёра.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "snake_case")]
#[postgres(name = "partner_status")]
pub enum PartnerStatus {
    #[default]
    #[postgres(name = "pending")]
    Pending,
    #[postgres(name = "approved")]
    Approved,
    #[postgres(name = "rejected")]
    Rejected,
}

/// OrderStatus: этап жизненного цикла заказа.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "snake_case")]
#[postgres(name = "order_status")]
pub enum OrderStatus {
    #[default]
    #[postgres(name = "pending")]
    Pending,
    #[postgres(name = "assigned")]
    Assigned,
    #[postgres(name = "pickup_scheduled")]
    PickupScheduled,
    #[postgres(name = "picked_up")]
    PickedUp,
    #[postgres(name = "in_repair")]
    InRepair,
    #[postgres(name = "ready_for_delivery")]
    ReadyForDelivery,
    #[postgres(name = "out_for_delivery")]
    OutForDelivery,
    #[postgres(name = "delivered")]
    Delivered,
    #[postgres(name = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::PickupScheduled,
        OrderStatus::PickedUp,
        OrderStatus::InRepair,
        OrderStatus::ReadyForDelivery,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::PickupScheduled => "pickup_scheduled",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::InRepair => "in_repair",
            OrderStatus::ReadyForDelivery => "ready_for_delivery",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError { kind: "order status", value: s.to_string() })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DiscountType: способ расчёта скидки по купону.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "snake_case")]
#[postgres(name = "discount_type")]
pub enum DiscountType {
    #[postgres(name = "percentage")]
    Percentage,
    #[postgres(name = "fixed")]
    Fixed,
}

/// User: учётная запись, идентифицируется номером телефона.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i32,
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// PublicUser: поля пользователя, которые можно отдавать клиенту.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i32,
    pub name: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            phone: user.phone.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Actor: личность из сессии (id пользователя и снимок роли).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

/// Partner: сервисный партнёр, выполняющий заказы.
/// Банковские реквизиты не попадают в JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partner {
    pub id: i32,
    pub user_id: i32,
    pub business_name: String,
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub gst_number: Option<String>,
    #[serde(skip_serializing)]
    pub bank_account: String,
    #[serde(skip_serializing)]
    pub ifsc_code: String,
    pub status: PartnerStatus,
    pub commission_rate: f64,
    pub rating: f64,
    pub total_orders: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPartner {
    pub business_name: String,
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub gst_number: Option<String>,
    pub bank_account: String,
    pub ifsc_code: String,
}

/// Service: позиция каталога услуг.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    pub base_price: f64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(skip_serializing)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewService {
    pub name: String,
    pub category: Option<String>,
    pub base_price: f64,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Coupon: промокод со скидкой, сроком действия и лимитом использований.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_order_value: f64,
    pub max_discount: Option<f64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_order_value: f64,
    pub max_discount: Option<f64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
}

/// Order: заказ на обслуживание ракетки со снимком цены на момент создания.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i32,
    pub order_number: String,
    pub customer_id: i32,
    pub partner_id: Option<i32>,
    pub service_id: i32,
    pub racquet_type: Option<String>,
    pub string_type: Option<String>,
    pub tension: Option<String>,
    pub pickup_address: Option<String>,
    pub pickup_slot: Option<DateTime<Utc>>,
    pub base_price: f64,
    pub string_price: f64,
    pub discount: f64,
    pub total_price: f64,
    pub status: OrderStatus,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub pickup_tracking_id: Option<String>,
    pub delivery_tracking_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_id: i32,
    pub service_id: i32,
    pub racquet_type: Option<String>,
    pub string_type: Option<String>,
    pub tension: Option<String>,
    pub pickup_address: Option<String>,
    pub pickup_slot: DateTime<Utc>,
    pub base_price: f64,
    pub string_price: f64,
    pub discount: f64,
    pub total_price: f64,
    pub payment_method: String,
}

/// OrderSummary: строка в списках заказов (клиент, партнёр, администратор).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: i32,
    pub order_number: String,
    pub customer_name: Option<String>,
    pub service_name: String,
    pub partner_name: Option<String>,
    pub status: OrderStatus,
    pub total_price: f64,
    pub pickup_slot: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerRef {
    pub business_name: String,
}

/// OrderDetail: полная карточка заказа.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: i32,
    pub order_number: String,
    pub service: ServiceRef,
    pub racquet_type: Option<String>,
    pub string_type: Option<String>,
    pub tension: Option<String>,
    pub pickup_address: Option<String>,
    pub pickup_slot: Option<DateTime<Utc>>,
    pub base_price: f64,
    pub string_price: f64,
    pub discount: f64,
    pub total_price: f64,
    pub status: OrderStatus,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub partner: Option<PartnerRef>,
}

impl OrderDetail {
    pub fn new(order: Order, service: &Service, partner: Option<&Partner>) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            service: ServiceRef {
                name: service.name.clone(),
                category: service.category.clone(),
            },
            racquet_type: order.racquet_type,
            string_type: order.string_type,
            tension: order.tension,
            pickup_address: order.pickup_address,
            pickup_slot: order.pickup_slot,
            base_price: order.base_price,
            string_price: order.string_price,
            discount: order.discount,
            total_price: order.total_price,
            status: order.status,
            payment_status: order.payment_status,
            created_at: order.created_at,
            partner: partner.map(|p| PartnerRef {
                business_name: p.business_name.clone(),
            }),
        }
    }
}

/// Analytics: сводка для панели администратора.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub total_orders: i64,
    pub total_revenue: f64,
    pub active_partners: i64,
    pub pending_orders: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_order_status_parsing() {
        assert_eq!("ready_for_delivery".parse::<OrderStatus>(), Ok(OrderStatus::ReadyForDelivery));
        assert_eq!("delivered".parse::<OrderStatus>(), Ok(OrderStatus::Delivered));

        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid order status: shipped");
    }

    #[test]
    fn test_role_default_and_parsing() {
        assert_eq!(Role::default(), Role::Customer);
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_status_serializes_as_snake_case() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
    }

    #[test]
    fn test_order_detail_without_partner_serializes_null() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let order = Order {
            id: 7,
            order_number: "RS20250301ABCDEF".to_string(),
            customer_id: 1,
            partner_id: None,
            service_id: 2,
            racquet_type: Some("Yonex Astrox 88".to_string()),
            string_type: Some("BG65".to_string()),
            tension: Some("24 lbs".to_string()),
            pickup_address: None,
            pickup_slot: Some(created),
            base_price: 299.0,
            string_price: 50.0,
            discount: 0.0,
            total_price: 349.0,
            status: OrderStatus::Pending,
            payment_status: "pending".to_string(),
            payment_method: Some("online".to_string()),
            pickup_tracking_id: None,
            delivery_tracking_id: None,
            created_at: created,
            updated_at: created,
            completed_at: None,
        };
        let service = Service {
            id: 2,
            name: "Badminton Restringing".to_string(),
            category: Some("stringing".to_string()),
            base_price: 299.0,
            description: None,
            image_url: None,
            is_active: true,
        };

        let detail = OrderDetail::new(order, &service, None);
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["service"]["name"], "Badminton Restringing");
        assert_eq!(json["status"], "pending");
        assert!(json["partner"].is_null());
        assert_eq!(json["total_price"], 349.0);
    }
}
