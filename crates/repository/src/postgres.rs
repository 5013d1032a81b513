//! PostgreSQL implementations of the repository traits.
//!
//! Every repository holds a clone of the shared `deadpool_postgres::Pool` and checks
//! out a connection per call. Multi-table writes run inside a transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Object, Pool};
use model::{
    Analytics, Coupon, NewCoupon, NewOrder, NewPartner, NewService, NewUser, Order, OrderStatus,
    OrderSummary, Partner, PartnerStatus, Role, Service, User,
};
use tokio_postgres::Row;
use tokio_postgres::error::SqlState;
use tracing::debug;

use crate::{
    CouponsRepository, OrderFilter, OrdersRepository, PartnersRepository, RepositoryError,
    ServicesRepository, UsersRepository,
};

const USER_COLUMNS: &str = "id, phone, name, email, password_hash, role, created_at";

const PARTNER_COLUMNS: &str = "id, user_id, business_name, address, city, pincode, gst_number, \
     bank_account, ifsc_code, status, commission_rate, rating, total_orders, created_at";

const SERVICE_COLUMNS: &str = "id, name, category, base_price, description, image_url, is_active";

const COUPON_COLUMNS: &str = "id, code, discount_type, discount_value, min_order_value, \
     max_discount, valid_from, valid_until, usage_limit, usage_count, is_active";

const ORDER_COLUMNS: &str = "id, order_number, customer_id, partner_id, service_id, racquet_type, \
     string_type, tension, pickup_address, pickup_slot, base_price, string_price, discount, \
     total_price, status, payment_status, payment_method, pickup_tracking_id, \
     delivery_tracking_id, created_at, updated_at, completed_at";

/// Maps a unique-constraint violation to [`RepositoryError::Conflict`].
fn conflict_on_unique(message: &'static str) -> impl Fn(tokio_postgres::Error) -> RepositoryError {
    move |e| {
        if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            RepositoryError::Conflict(message.to_string())
        } else {
            RepositoryError::Db(e)
        }
    }
}

async fn connection(pool: &Pool) -> Result<Object, RepositoryError> {
    Ok(pool.get().await?)
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        phone: row.get("phone"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        created_at: row.get("created_at"),
    }
}

fn partner_from_row(row: &Row) -> Partner {
    Partner {
        id: row.get("id"),
        user_id: row.get("user_id"),
        business_name: row.get("business_name"),
        address: row.get("address"),
        city: row.get("city"),
        pincode: row.get("pincode"),
        gst_number: row.get("gst_number"),
        bank_account: row.get("bank_account"),
        ifsc_code: row.get("ifsc_code"),
        status: row.get("status"),
        commission_rate: row.get("commission_rate"),
        rating: row.get("rating"),
        total_orders: row.get("total_orders"),
        created_at: row.get("created_at"),
    }
}

fn service_from_row(row: &Row) -> Service {
    Service {
        id: row.get("id"),
        name: row.get("name"),
        category: row.get("category"),
        base_price: row.get("base_price"),
        description: row.get("description"),
        image_url: row.get("image_url"),
        is_active: row.get("is_active"),
    }
}

fn coupon_from_row(row: &Row) -> Coupon {
    Coupon {
        id: row.get("id"),
        code: row.get("code"),
        discount_type: row.get("discount_type"),
        discount_value: row.get("discount_value"),
        min_order_value: row.get("min_order_value"),
        max_discount: row.get("max_discount"),
        valid_from: row.get("valid_from"),
        valid_until: row.get("valid_until"),
        usage_limit: row.get("usage_limit"),
        usage_count: row.get("usage_count"),
        is_active: row.get("is_active"),
    }
}

fn order_from_row(row: &Row) -> Order {
    Order {
        id: row.get("id"),
        order_number: row.get("order_number"),
        customer_id: row.get("customer_id"),
        partner_id: row.get("partner_id"),
        service_id: row.get("service_id"),
        racquet_type: row.get("racquet_type"),
        string_type: row.get("string_type"),
        tension: row.get("tension"),
        pickup_address: row.get("pickup_address"),
        pickup_slot: row.get("pickup_slot"),
        base_price: row.get("base_price"),
        string_price: row.get("string_price"),
        discount: row.get("discount"),
        total_price: row.get("total_price"),
        status: row.get("status"),
        payment_status: row.get("payment_status"),
        payment_method: row.get("payment_method"),
        pickup_tracking_id: row.get("pickup_tracking_id"),
        delivery_tracking_id: row.get("delivery_tracking_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        completed_at: row.get("completed_at"),
    }
}

fn summary_from_row(row: &Row) -> OrderSummary {
    OrderSummary {
        id: row.get("id"),
        order_number: row.get("order_number"),
        customer_name: row.get("customer_name"),
        service_name: row.get("service_name"),
        partner_name: row.get("partner_name"),
        status: row.get("status"),
        total_price: row.get("total_price"),
        pickup_slot: row.get("pickup_slot"),
        created_at: row.get("created_at"),
    }
}

/// PostgreSQL implementation of the UsersRepository trait.
pub struct PgUsersRepository {
    pool: Pool,
}

impl PgUsersRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let query = format!(
            "INSERT INTO users (phone, name, email, password_hash, role)
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let client = connection(&self.pool).await?;
        let row = client
            .query_one(&query, &[&user.phone, &user.name, &user.email, &user.password_hash, &user.role])
            .await
            .map_err(conflict_on_unique("Phone number already registered"))?;
        Ok(user_from_row(&row))
    }

    async fn get_by_id(&self, id: i32) -> Result<User, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let client = connection(&self.pool).await?;
        match client.query_opt(&query, &[&id]).await? {
            Some(row) => Ok(user_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE phone = $1");
        let client = connection(&self.pool).await?;
        let row = client.query_opt(&query, &[&phone]).await?;
        Ok(row.as_ref().map(user_from_row))
    }
}

/// PostgreSQL implementation of the PartnersRepository trait.
pub struct PgPartnersRepository {
    pool: Pool,
}

impl PgPartnersRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PartnersRepository for PgPartnersRepository {
    async fn register(&self, user_id: i32, partner: &NewPartner) -> Result<Partner, RepositoryError> {
        let insert = format!(
            "INSERT INTO partners (user_id, business_name, address, city, pincode, gst_number, bank_account, ifsc_code)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PARTNER_COLUMNS}"
        );
        let mut client = connection(&self.pool).await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_one(&insert, &[
                &user_id,
                &partner.business_name,
                &partner.address,
                &partner.city,
                &partner.pincode,
                &partner.gst_number,
                &partner.bank_account,
                &partner.ifsc_code,
            ])
            .await
            .map_err(conflict_on_unique("Partner profile already exists"))?;

        let updated = tx
            .execute("UPDATE users SET role = $2 WHERE id = $1", &[&user_id, &Role::Partner])
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(partner_from_row(&row))
    }

    async fn get_by_id(&self, id: i32) -> Result<Partner, RepositoryError> {
        let query = format!("SELECT {PARTNER_COLUMNS} FROM partners WHERE id = $1");
        let client = connection(&self.pool).await?;
        match client.query_opt(&query, &[&id]).await? {
            Some(row) => Ok(partner_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_by_user_id(&self, user_id: i32) -> Result<Option<Partner>, RepositoryError> {
        let query = format!("SELECT {PARTNER_COLUMNS} FROM partners WHERE user_id = $1");
        let client = connection(&self.pool).await?;
        let row = client.query_opt(&query, &[&user_id]).await?;
        Ok(row.as_ref().map(partner_from_row))
    }

    async fn list(&self) -> Result<Vec<Partner>, RepositoryError> {
        let query = format!("SELECT {PARTNER_COLUMNS} FROM partners ORDER BY id");
        let client = connection(&self.pool).await?;
        let rows = client.query(&query, &[]).await?;
        Ok(rows.iter().map(partner_from_row).collect())
    }

    async fn set_status(&self, id: i32, status: PartnerStatus) -> Result<Partner, RepositoryError> {
        let query = format!("UPDATE partners SET status = $2 WHERE id = $1 RETURNING {PARTNER_COLUMNS}");
        let client = connection(&self.pool).await?;
        match client.query_opt(&query, &[&id, &status]).await? {
            Some(row) => Ok(partner_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// PostgreSQL implementation of the ServicesRepository trait.
pub struct PgServicesRepository {
    pool: Pool,
}

impl PgServicesRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServicesRepository for PgServicesRepository {
    async fn list_active(&self) -> Result<Vec<Service>, RepositoryError> {
        let query = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE is_active ORDER BY id");
        let client = connection(&self.pool).await?;
        let rows = client.query(&query, &[]).await?;
        Ok(rows.iter().map(service_from_row).collect())
    }

    async fn get_by_id(&self, id: i32) -> Result<Service, RepositoryError> {
        let query = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1");
        let client = connection(&self.pool).await?;
        match client.query_opt(&query, &[&id]).await? {
            Some(row) => Ok(service_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn insert(&self, service: &NewService) -> Result<Service, RepositoryError> {
        let query = format!(
            "INSERT INTO services (name, category, base_price, description, image_url)
             VALUES ($1, $2, $3, $4, $5) RETURNING {SERVICE_COLUMNS}"
        );
        let client = connection(&self.pool).await?;
        let row = client
            .query_one(&query, &[
                &service.name,
                &service.category,
                &service.base_price,
                &service.description,
                &service.image_url,
            ])
            .await?;
        Ok(service_from_row(&row))
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let client = connection(&self.pool).await?;
        let row = client.query_one("SELECT COUNT(*) FROM services", &[]).await?;
        Ok(row.get(0))
    }
}

/// PostgreSQL implementation of the CouponsRepository trait.
pub struct PgCouponsRepository {
    pool: Pool,
}

impl PgCouponsRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CouponsRepository for PgCouponsRepository {
    async fn find_active_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let query = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1 AND is_active");
        let client = connection(&self.pool).await?;
        let row = client.query_opt(&query, &[&code]).await?;
        Ok(row.as_ref().map(coupon_from_row))
    }

    async fn insert(&self, coupon: &NewCoupon) -> Result<Coupon, RepositoryError> {
        let query = format!(
            "INSERT INTO coupons (code, discount_type, discount_value, min_order_value, max_discount,
                                  valid_from, valid_until, usage_limit)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COUPON_COLUMNS}"
        );
        let client = connection(&self.pool).await?;
        let row = client
            .query_one(&query, &[
                &coupon.code,
                &coupon.discount_type,
                &coupon.discount_value,
                &coupon.min_order_value,
                &coupon.max_discount,
                &coupon.valid_from,
                &coupon.valid_until,
                &coupon.usage_limit,
            ])
            .await
            .map_err(conflict_on_unique("Coupon code already exists"))?;
        Ok(coupon_from_row(&row))
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let client = connection(&self.pool).await?;
        let row = client.query_one("SELECT COUNT(*) FROM coupons", &[]).await?;
        Ok(row.get(0))
    }
}

/// PostgreSQL implementation of the OrdersRepository trait.
pub struct PgOrdersRepository {
    pool: Pool,
}

impl PgOrdersRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrdersRepository for PgOrdersRepository {
    async fn insert(&self, order: &NewOrder, coupon_id: Option<i32>) -> Result<Order, RepositoryError> {
        let insert = format!(
            "INSERT INTO orders (
                order_number, customer_id, service_id, racquet_type, string_type, tension,
                pickup_address, pickup_slot, base_price, string_price, discount, total_price,
                payment_method
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            RETURNING {ORDER_COLUMNS}"
        );
        let mut client = connection(&self.pool).await?;
        let tx = client.transaction().await?;

        if let Some(coupon_id) = coupon_id {
            debug!(coupon_id, "Incrementing coupon usage");
            tx.execute(
                "UPDATE coupons SET usage_count = usage_count + 1 WHERE id = $1",
                &[&coupon_id],
            )
            .await?;
        }

        let row = tx
            .query_one(&insert, &[
                &order.order_number,
                &order.customer_id,
                &order.service_id,
                &order.racquet_type,
                &order.string_type,
                &order.tension,
                &order.pickup_address,
                &order.pickup_slot,
                &order.base_price,
                &order.string_price,
                &order.discount,
                &order.total_price,
                &order.payment_method,
            ])
            .await
            .map_err(conflict_on_unique("Order number already exists"))?;

        tx.commit().await?;
        Ok(order_from_row(&row))
    }

    async fn get_by_id(&self, id: i32) -> Result<Order, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let client = connection(&self.pool).await?;
        match client.query_opt(&query, &[&id]).await? {
            Some(row) => Ok(order_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<OrderSummary>, RepositoryError> {
        let query = r#"
            SELECT o.id, o.order_number, u.name AS customer_name, s.name AS service_name,
                   p.business_name AS partner_name, o.status, o.total_price, o.pickup_slot,
                   o.created_at
            FROM orders o
            JOIN users u ON u.id = o.customer_id
            JOIN services s ON s.id = o.service_id
            LEFT JOIN partners p ON p.id = o.partner_id
            WHERE ($1::int4 IS NULL OR o.customer_id = $1)
              AND ($2::int4 IS NULL OR o.partner_id = $2)
              AND ($3::order_status IS NULL OR o.status = $3)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $4::int8
        "#;
        let client = connection(&self.pool).await?;
        let rows = client
            .query(query, &[&filter.customer_id, &filter.partner_id, &filter.status, &filter.limit])
            .await?;
        Ok(rows.iter().map(summary_from_row).collect())
    }

    async fn assign_partner(&self, id: i32, partner_id: i32, at: DateTime<Utc>) -> Result<Order, RepositoryError> {
        let query = format!(
            "UPDATE orders SET partner_id = $2, status = $3, updated_at = $4
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        let client = connection(&self.pool).await?;
        match client
            .query_opt(&query, &[&id, &partner_id, &OrderStatus::Assigned, &at])
            .await?
        {
            Some(row) => Ok(order_from_row(&row)),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn update_status(&self, id: i32, status: OrderStatus, at: DateTime<Utc>) -> Result<Order, RepositoryError> {
        let delivered = status == OrderStatus::Delivered;
        let query = format!(
            "UPDATE orders
             SET status = $2, updated_at = $3,
                 completed_at = CASE WHEN $4 THEN $3 ELSE completed_at END
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        let mut client = connection(&self.pool).await?;
        let tx = client.transaction().await?;

        let order = match tx.query_opt(&query, &[&id, &status, &at, &delivered]).await? {
            Some(row) => order_from_row(&row),
            None => return Err(RepositoryError::NotFound),
        };

        if let (true, Some(partner_id)) = (delivered, order.partner_id) {
            tx.execute(
                "UPDATE partners SET total_orders = total_orders + 1 WHERE id = $1",
                &[&partner_id],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(order)
    }

    async fn analytics(&self) -> Result<Analytics, RepositoryError> {
        let query = r#"
            SELECT
                (SELECT COUNT(*) FROM orders) AS total_orders,
                (SELECT COALESCE(SUM(total_price), 0)::float8 FROM orders) AS total_revenue,
                (SELECT COUNT(*) FROM partners WHERE status = 'approved') AS active_partners,
                (SELECT COUNT(*) FROM orders WHERE status = 'pending') AS pending_orders
        "#;
        let client = connection(&self.pool).await?;
        let row = client.query_one(query, &[]).await?;
        Ok(Analytics {
            total_orders: row.get("total_orders"),
            total_revenue: row.get("total_revenue"),
            active_partners: row.get("active_partners"),
            pending_orders: row.get("pending_orders"),
        })
    }
}
