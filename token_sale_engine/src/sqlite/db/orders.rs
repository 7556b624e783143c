use chrono::Duration;
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, SqliteConnection};
use tsg_common::Amount;

use crate::{
    db_types::{NewOrder, Order, UserId, WalletLogEntry},
    sale_api::order_objects::{OrderQueryFilter, UserOrder},
    traits::SaleGatewayError,
};

/// Inserts a new order using the given connection. Not atomic on its own; embed the call in a
/// transaction and pass `&mut *tx` when it must land together with other writes.
///
/// A violation of the one-open-order-per-address index maps to
/// [`SaleGatewayError::DepositAddressInUse`].
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SaleGatewayError> {
    let address = order.address.clone();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (user_id, address, currency, price, amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.address)
    .bind(order.currency)
    .bind(order.price)
    .bind(order.amount)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => SaleGatewayError::DepositAddressInUse(address),
        _ => SaleGatewayError::from(e),
    })?;
    debug!("📝️ Order #{} inserted for user {}", order.id, order.user_id);
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// The order currently owning the given deposit address. When an address has been recycled
/// across expired orders, the newest record wins.
pub async fn fetch_order_for_address(
    address: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE address = $1 ORDER BY created_at DESC, id DESC LIMIT 1")
        .bind(address)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Flips the order to paid and links the settling payment. Returns the updated row.
pub(crate) async fn mark_order_paid(
    id: i64,
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, SaleGatewayError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET paid = 1, payment_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(payment_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(SaleGatewayError::OrderNotFound(id))
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in descending order.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM orders
    "#,
    );
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id.0);
    }
    if let Some(currency) = query.currency {
        where_clause.push("currency = ");
        where_clause.push_bind_unseparated(currency);
    }
    if let Some(address) = query.address {
        where_clause.push("address = ");
        where_clause.push_bind_unseparated(address);
    }
    if let Some(paid) = query.paid {
        where_clause.push("paid = ");
        where_clause.push_bind_unseparated(paid);
    }
    if let Some(expired) = query.expired {
        where_clause.push("expired = ");
        where_clause.push_bind_unseparated(expired);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");

    trace!("📝️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}

/// A user's orders joined with the payment that settled each and the wallet log entry once
/// credited, newest first. Unpaid orders come back with zeroed payment columns.
pub async fn user_orders_with_payment(
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<UserOrder>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT
            o.id, o.user_id, o.address, o.currency, o.price, o.amount, o.paid, o.expired,
            o.payment_id, o.created_at, o.updated_at,
            p.amount AS paid_amount, p.credited AS credited, p.txn_id AS paid_tx,
            l.id AS log_id, l.wallet_id AS log_wallet_id, l.payment_id AS log_payment_id,
            l.addition AS log_addition, l.tx_hash AS log_tx_hash, l.created_at AS log_created_at
        FROM orders o
        LEFT JOIN payments p ON o.payment_id = p.id
        LEFT JOIN wallet_logs l ON l.payment_id = p.id
        WHERE o.user_id = $1
        ORDER BY o.created_at DESC, o.id DESC
        "#,
    )
    .bind(user_id.as_str())
    .fetch_all(conn)
    .await?;
    rows.iter().map(user_order_from_row).collect()
}

fn user_order_from_row(row: &SqliteRow) -> Result<UserOrder, sqlx::Error> {
    let order = Order::from_row(row)?;
    let paid_amount: Option<Amount> = row.try_get("paid_amount")?;
    let credited: Option<bool> = row.try_get("credited")?;
    let paid_tx: Option<String> = row.try_get("paid_tx")?;
    let log = match row.try_get::<Option<i64>, _>("log_id")? {
        Some(id) => Some(WalletLogEntry {
            id,
            wallet_id: row.try_get("log_wallet_id")?,
            payment_id: row.try_get("log_payment_id")?,
            addition: row.try_get("log_addition")?,
            tx_hash: row.try_get("log_tx_hash")?,
            created_at: row.try_get("log_created_at")?,
        }),
        None => None,
    };
    Ok(UserOrder {
        order,
        paid_amount: paid_amount.unwrap_or_default(),
        credited: credited.unwrap_or(false),
        paid_tx,
        log,
    })
}

/// Expires unpaid deposit-rail orders that have sat for longer than `limit`. The rail sentinels
/// (card, bank) are left alone.
pub(crate) async fn expire_unpaid_orders(
    limit: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SaleGatewayError> {
    let rows = sqlx::query_as(
        format!(
            "UPDATE orders SET updated_at = CURRENT_TIMESTAMP, expired = 1 WHERE paid = 0 AND expired = 0 AND \
             address NOT IN ('Stripe', 'Bank Transfer') AND (unixepoch(CURRENT_TIMESTAMP) - unixepoch(created_at)) \
             > {} RETURNING *;",
            limit.num_seconds()
        )
        .as_str(),
    )
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
