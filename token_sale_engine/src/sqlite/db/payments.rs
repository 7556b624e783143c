use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, UserId, CARD_MERCHANT_ID},
    traits::SaleGatewayError,
};

/// Inserts a payment record. The unique index on `ipn_id` turns a racing duplicate into
/// [`SaleGatewayError::PaymentAlreadyExists`].
pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, SaleGatewayError> {
    let ipn_id = payment.ipn_id.clone();
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments
                (user_id, address, currency, amount, order_price, fee, confirms, merchant_id, ipn_id, txn_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(payment.user_id)
    .bind(payment.address)
    .bind(payment.currency)
    .bind(payment.amount)
    .bind(payment.order_price)
    .bind(payment.fee)
    .bind(payment.confirms)
    .bind(payment.merchant_id)
    .bind(payment.ipn_id)
    .bind(payment.txn_id)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => SaleGatewayError::PaymentAlreadyExists(ipn_id),
        _ => SaleGatewayError::from(e),
    })?;
    debug!("🗃️ Payment #{} recorded for notification {}", payment.id, payment.ipn_id);
    Ok(payment)
}

pub async fn fetch_payment_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_by_ipn_id(
    ipn_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE ipn_id = $1").bind(ipn_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payments_for_user(
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

/// The atomic crediting gate. Flips `credited` and returns the updated row; `None` means
/// another actor got there first (or the payment does not exist — callers have already fetched
/// it by the time they reach this).
pub(crate) async fn mark_credited(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        "UPDATE payments SET credited = 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND credited = 0 RETURNING *",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Uncredited payments ripe for crediting: card payments immediately, crypto deposits once they
/// have reported at least `min_confirms` confirmations.
pub async fn creditable_payments(min_confirms: i64, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as(
        "SELECT * FROM payments WHERE credited = 0 AND (merchant_id = $1 OR confirms >= $2) ORDER BY id ASC",
    )
    .bind(CARD_MERCHANT_ID)
    .bind(min_confirms)
    .fetch_all(conn)
    .await?;
    Ok(payments)
}
