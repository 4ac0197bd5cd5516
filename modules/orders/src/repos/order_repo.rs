use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};

use crate::domain::{Order, OrderStatus};

const ORDER_COLUMNS: &str =
    "order_id, user_id, expires_at, status, weight, cost, last_changed_at";

/// Optional predicates for order listings
#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    order_id: i64,
    user_id: i64,
    expires_at: chrono::DateTime<chrono::Utc>,
    status: String,
    weight: i32,
    cost: i32,
    last_changed_at: chrono::DateTime<chrono::Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, sqlx::Error> {
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Order {
            order_id: self.order_id,
            user_id: self.user_id,
            expires_at: self.expires_at,
            status,
            weight: self.weight,
            cost: self.cost,
            last_changed_at: self.last_changed_at,
        })
    }
}

/// Insert a new order, returning its id
pub async fn insert(db: &PgPool, order: &Order) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO orders (order_id, user_id, expires_at, status, weight, cost, last_changed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING order_id
        "#,
    )
    .bind(order.order_id)
    .bind(order.user_id)
    .bind(order.expires_at)
    .bind(order.status.as_str())
    .bind(order.weight)
    .bind(order.cost)
    .bind(order.last_changed_at)
    .fetch_one(db)
    .await?;

    Ok(id)
}

/// Fetch one order by id
pub async fn fetch(db: &PgPool, order_id: i64) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"
    ))
    .bind(order_id)
    .fetch_optional(db)
    .await?;

    row.map(OrderRow::into_order).transpose()
}

/// Fetch one order by id, locking the row for the rest of the transaction
pub async fn fetch_for_update(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 FOR UPDATE"
    ))
    .bind(order_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(OrderRow::into_order).transpose()
}

/// Move an order to a new status, stamping last_changed_at
pub async fn update_status(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    status: OrderStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE orders
           SET status = $2,
               last_changed_at = NOW()
         WHERE order_id = $1
        "#,
    )
    .bind(order_id)
    .bind(status.as_str())
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Delete an order, returning how many rows were removed
pub async fn delete(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
        .bind(order_id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected())
}

/// List orders matching the filter, keyset-paginated by order_id
pub async fn list(
    db: &PgPool,
    filter: &OrderFilter,
    last_id: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1"
    ));

    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(last_id) = last_id {
        qb.push(" AND order_id > ").push_bind(last_id);
    }

    qb.push(" ORDER BY order_id");

    if let Some(limit) = limit {
        qb.push(" LIMIT ").push_bind(limit);
    }

    let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(db).await?;

    rows.into_iter().map(OrderRow::into_order).collect()
}
