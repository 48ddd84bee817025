use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::models::{Delivery, Item, Order, Payment};
use crate::utils::{retry_with_classifier, RetryConfig, RetryError};
use super::{OrderRepository, RepositoryError};

// ============================================================================
// PostgreSQL Order Repository
// ============================================================================
//
// Relational layout: one row in `orders`, `deliveries` and `payments` per
// order, N rows in `items` (kept in input order by `position`).
//
// Reads go through the fixed-delay retry wrapper with the coarse classifier
// (everything except "not found" is retried). `save` is a single transaction
// and is NOT retried here: a retried insert that actually committed would
// surface as a duplicate. The ingestion pipeline decides what happens to a
// failed write.
//
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    order_uid           TEXT PRIMARY KEY,
    track_number        TEXT NOT NULL,
    entry               TEXT NOT NULL,
    locale              TEXT NOT NULL,
    internal_signature  TEXT NOT NULL DEFAULT '',
    customer_id         TEXT NOT NULL,
    delivery_service    TEXT NOT NULL,
    shardkey            TEXT NOT NULL,
    sm_id               SMALLINT NOT NULL,
    date_created        TIMESTAMPTZ NOT NULL,
    oof_shard           TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS orders_date_created_idx ON orders (date_created DESC);

CREATE TABLE IF NOT EXISTS deliveries (
    order_uid   TEXT PRIMARY KEY REFERENCES orders (order_uid) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    phone       TEXT NOT NULL,
    zip         TEXT NOT NULL,
    city        TEXT NOT NULL,
    address     TEXT NOT NULL,
    region      TEXT NOT NULL,
    email       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS payments (
    order_uid       TEXT PRIMARY KEY REFERENCES orders (order_uid) ON DELETE CASCADE,
    transaction     TEXT NOT NULL,
    request_id      TEXT NOT NULL DEFAULT '',
    currency        TEXT NOT NULL,
    provider        TEXT NOT NULL,
    amount          DOUBLE PRECISION NOT NULL,
    payment_dt      BIGINT NOT NULL,
    bank            TEXT NOT NULL DEFAULT '',
    delivery_cost   DOUBLE PRECISION NOT NULL,
    goods_total     DOUBLE PRECISION NOT NULL,
    custom_fee      DOUBLE PRECISION NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    id              BIGSERIAL PRIMARY KEY,
    order_uid       TEXT NOT NULL REFERENCES orders (order_uid) ON DELETE CASCADE,
    position        INTEGER NOT NULL,
    chrt_id         BIGINT NOT NULL,
    track_number    TEXT NOT NULL,
    price           DOUBLE PRECISION NOT NULL,
    rid             TEXT NOT NULL DEFAULT '',
    name            TEXT NOT NULL,
    sale            DOUBLE PRECISION NOT NULL,
    size            TEXT NOT NULL DEFAULT '',
    total_price     DOUBLE PRECISION NOT NULL,
    nm_id           BIGINT NOT NULL,
    brand           TEXT NOT NULL DEFAULT '',
    status          SMALLINT NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS items_order_uid_idx ON items (order_uid);
"#;

const SELECT_ORDERS: &str = r#"
SELECT o.order_uid, o.track_number, o.entry, o.locale, o.internal_signature,
       o.customer_id, o.delivery_service, o.shardkey, o.sm_id, o.date_created, o.oof_shard,
       d.name AS d_name, d.phone, d.zip, d.city, d.address, d.region, d.email,
       p.transaction, p.request_id, p.currency, p.provider, p.amount, p.payment_dt,
       p.bank, p.delivery_cost, p.goods_total, p.custom_fee
FROM orders o
JOIN deliveries d ON d.order_uid = o.order_uid
JOIN payments p ON p.order_uid = o.order_uid
"#;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
    retry: RetryConfig,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool, retry: RetryConfig) -> Self {
        Self { pool, retry }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        retry: RetryConfig,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!(max_connections = max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool, retry))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("Order schema ready");
        Ok(())
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, RepositoryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T, RepositoryError>>,
    {
        retry_with_classifier(&self.retry, RepositoryError::is_retryable, f)
            .await
            .map_err(|e| match e {
                RetryError::Permanent(e) => e,
                RetryError::Exhausted { attempts, last } => RepositoryError::RetriesExhausted {
                    operation,
                    attempts,
                    source: Box::new(last),
                },
            })
    }

    async fn fetch_one(&self, order_uid: &str) -> Result<Order, RepositoryError> {
        let query = format!("{} WHERE o.order_uid = $1", SELECT_ORDERS);
        let row = sqlx::query(&query)
            .bind(order_uid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(order_uid.to_string()))?;

        let mut orders = self.attach_items(vec![row_to_order(&row)?]).await?;
        Ok(orders.remove(0))
    }

    async fn fetch_many(&self, limit: Option<i64>) -> Result<Vec<Order>, RepositoryError> {
        let rows = match limit {
            Some(n) => {
                let query = format!("{} ORDER BY o.date_created DESC LIMIT $1", SELECT_ORDERS);
                sqlx::query(&query).bind(n).fetch_all(&self.pool).await?
            }
            None => {
                let query = format!("{} ORDER BY o.date_created DESC", SELECT_ORDERS);
                sqlx::query(&query).fetch_all(&self.pool).await?
            }
        };

        let orders = rows
            .iter()
            .map(row_to_order)
            .collect::<Result<Vec<_>, _>>()?;
        self.attach_items(orders).await
    }

    /// Load items for all given orders with one query.
    async fn attach_items(&self, mut orders: Vec<Order>) -> Result<Vec<Order>, RepositoryError> {
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<String> = orders.iter().map(|o| o.order_uid.clone()).collect();
        let rows = sqlx::query(
            r#"
            SELECT order_uid, chrt_id, track_number, price, rid, name, sale, size,
                   total_price, nm_id, brand, status
            FROM items
            WHERE order_uid = ANY($1)
            ORDER BY order_uid, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<String, Vec<Item>> = HashMap::new();
        for row in &rows {
            let order_uid: String = row.try_get("order_uid")?;
            by_order.entry(order_uid).or_default().push(row_to_item(row)?);
        }

        for order in &mut orders {
            order.items = by_order.remove(&order.order_uid).unwrap_or_default();
        }
        Ok(orders)
    }

    async fn insert(&self, order: &Order) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (order_uid, track_number, entry, locale, internal_signature,
                                customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await?;

        let d = &order.delivery;
        sqlx::query(
            r#"
            INSERT INTO deliveries (order_uid, name, phone, zip, city, address, region, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&d.name)
        .bind(&d.phone)
        .bind(&d.zip)
        .bind(&d.city)
        .bind(&d.address)
        .bind(&d.region)
        .bind(&d.email)
        .execute(&mut *tx)
        .await?;

        let p = &order.payment;
        sqlx::query(
            r#"
            INSERT INTO payments (order_uid, transaction, request_id, currency, provider, amount,
                                  payment_dt, bank, delivery_cost, goods_total, custom_fee)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&p.transaction)
        .bind(&p.request_id)
        .bind(&p.currency)
        .bind(&p.provider)
        .bind(p.amount)
        .bind(p.payment_dt)
        .bind(&p.bank)
        .bind(p.delivery_cost)
        .bind(p.goods_total)
        .bind(p.custom_fee)
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO items (order_uid, position, chrt_id, track_number, price, rid, name,
                                   sale, size, total_price, nm_id, brand, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(&order.order_uid)
            .bind(position as i32)
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn get(&self, order_uid: &str) -> Result<Order, RepositoryError> {
        self.with_retry("get", |_| self.fetch_one(order_uid)).await
    }

    async fn get_last_n(&self, n: usize) -> Result<Vec<Order>, RepositoryError> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        self.with_retry("get_last_n", |_| self.fetch_many(Some(limit))).await
    }

    async fn get_all(&self) -> Result<Vec<Order>, RepositoryError> {
        self.with_retry("get_all", |_| self.fetch_many(None)).await
    }

    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        self.insert(order)
            .await
            .map_err(|e| map_insert_error(e, &order.order_uid))?;

        tracing::info!(
            order_uid = %order.order_uid,
            item_count = order.items.len(),
            "Persisted order"
        );
        Ok(())
    }
}

fn map_insert_error(error: sqlx::Error, order_uid: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = error {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return RepositoryError::Conflict(order_uid.to_string());
        }
    }
    RepositoryError::from(error)
}

fn row_to_order(row: &PgRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        order_uid: row.try_get("order_uid")?,
        track_number: row.try_get("track_number")?,
        entry: row.try_get("entry")?,
        delivery: Delivery {
            name: row.try_get("d_name")?,
            phone: row.try_get("phone")?,
            zip: row.try_get("zip")?,
            city: row.try_get("city")?,
            address: row.try_get("address")?,
            region: row.try_get("region")?,
            email: row.try_get("email")?,
        },
        payment: Payment {
            transaction: row.try_get("transaction")?,
            request_id: row.try_get("request_id")?,
            currency: row.try_get("currency")?,
            provider: row.try_get("provider")?,
            amount: row.try_get("amount")?,
            payment_dt: row.try_get("payment_dt")?,
            bank: row.try_get("bank")?,
            delivery_cost: row.try_get("delivery_cost")?,
            goods_total: row.try_get("goods_total")?,
            custom_fee: row.try_get("custom_fee")?,
        },
        items: Vec::new(),
        locale: row.try_get("locale")?,
        internal_signature: row.try_get("internal_signature")?,
        customer_id: row.try_get("customer_id")?,
        delivery_service: row.try_get("delivery_service")?,
        shardkey: row.try_get("shardkey")?,
        sm_id: row.try_get("sm_id")?,
        date_created: row.try_get("date_created")?,
        oof_shard: row.try_get("oof_shard")?,
    })
}

fn row_to_item(row: &PgRow) -> Result<Item, sqlx::Error> {
    Ok(Item {
        chrt_id: row.try_get("chrt_id")?,
        track_number: row.try_get("track_number")?,
        price: row.try_get("price")?,
        rid: row.try_get("rid")?,
        name: row.try_get("name")?,
        sale: row.try_get("sale")?,
        size: row.try_get("size")?,
        total_price: row.try_get("total_price")?,
        nm_id: row.try_get("nm_id")?,
        brand: row.try_get("brand")?,
        status: row.try_get("status")?,
    })
}
