use log::debug;
use sqlx::SqliteConnection;
use tsg_common::Amount;

use crate::{
    db_types::{RefBalance, RefLogEntry, UserId, Wallet, WalletLogEntry, TOKEN_WALLET_LABEL},
    traits::SaleGatewayError,
};

pub async fn fetch_wallet(
    user_id: &UserId,
    label: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Wallet>, sqlx::Error> {
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE user_id = $1 AND label = $2")
        .bind(user_id.as_str())
        .bind(label)
        .fetch_optional(conn)
        .await?;
    Ok(wallet)
}

/// Fetches the user's token wallet, creating a zeroed one on first contact.
///
/// The lookup-then-create is not atomic; the `(user_id, label)` unique index is. A lost creation
/// race falls back to re-fetching the winner's row.
pub async fn ensure_wallet(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Wallet, SaleGatewayError> {
    if let Some(wallet) = fetch_wallet(user_id, TOKEN_WALLET_LABEL, conn).await? {
        return Ok(wallet);
    }
    let inserted: Result<Wallet, sqlx::Error> =
        sqlx::query_as("INSERT INTO wallets (user_id, label) VALUES ($1, $2) RETURNING *")
            .bind(user_id.as_str())
            .bind(TOKEN_WALLET_LABEL)
            .fetch_one(&mut *conn)
            .await;
    match inserted {
        Ok(wallet) => {
            debug!("👛️ Created wallet #{} for user {user_id}", wallet.id);
            Ok(wallet)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            // Lost the race; the concurrent winner's row is the wallet.
            fetch_wallet(user_id, TOKEN_WALLET_LABEL, conn)
                .await?
                .ok_or_else(|| SaleGatewayError::WalletNotFound(user_id.clone()))
        },
        Err(e) => Err(e.into()),
    }
}

/// Records the user's withdrawal address, creating the wallet lazily if absent.
pub async fn update_wallet_address(
    user_id: &UserId,
    address: &str,
    conn: &mut SqliteConnection,
) -> Result<Wallet, SaleGatewayError> {
    let wallet = ensure_wallet(user_id, conn).await?;
    let wallet = sqlx::query_as(
        "UPDATE wallets SET address = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(address)
    .bind(wallet.id)
    .fetch_one(conn)
    .await?;
    Ok(wallet)
}

pub(crate) async fn add_to_balance(
    wallet_id: i64,
    addition: Amount,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE wallets SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(addition)
        .bind(wallet_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Appends a credit log entry. The unique index on `payment_id` is the backstop against a
/// payment being credited into a wallet twice.
pub(crate) async fn insert_wallet_log(
    wallet_id: i64,
    payment_id: i64,
    addition: Amount,
    conn: &mut SqliteConnection,
) -> Result<WalletLogEntry, SaleGatewayError> {
    let log = sqlx::query_as(
        "INSERT INTO wallet_logs (wallet_id, payment_id, addition) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(wallet_id)
    .bind(payment_id)
    .bind(addition)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => SaleGatewayError::InvalidPaymentRecord(format!(
            "payment #{payment_id} already has a wallet log entry"
        )),
        _ => SaleGatewayError::from(e),
    })?;
    Ok(log)
}

pub async fn fetch_wallet_logs(wallet_id: i64, conn: &mut SqliteConnection) -> Result<Vec<WalletLogEntry>, sqlx::Error> {
    let logs = sqlx::query_as("SELECT * FROM wallet_logs WHERE wallet_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(wallet_id)
        .fetch_all(conn)
        .await?;
    Ok(logs)
}

/// Adds a referral bonus to the wallet's balance for the given currency, creating the balance
/// row on first contact.
pub(crate) async fn bump_ref_balance(
    wallet_id: i64,
    currency: &str,
    bonus: Amount,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO wallet_ref_balances (wallet_id, currency, balance) VALUES ($1, $2, $3)
        ON CONFLICT (wallet_id, currency) DO UPDATE SET balance = balance + excluded.balance
        "#,
    )
    .bind(wallet_id)
    .bind(currency)
    .bind(bonus)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_ref_log(
    wallet_id: i64,
    referred_user_id: &UserId,
    payment_id: i64,
    addition: Amount,
    currency: &str,
    conn: &mut SqliteConnection,
) -> Result<RefLogEntry, SaleGatewayError> {
    let log = sqlx::query_as(
        r#"
        INSERT INTO referral_logs (wallet_id, referred_user_id, payment_id, addition, currency)
        VALUES ($1, $2, $3, $4, $5) RETURNING *
        "#,
    )
    .bind(wallet_id)
    .bind(referred_user_id.as_str())
    .bind(payment_id)
    .bind(addition)
    .bind(currency)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => SaleGatewayError::InvalidPaymentRecord(format!(
            "payment #{payment_id} already awarded a referral bonus to wallet #{wallet_id}"
        )),
        _ => SaleGatewayError::from(e),
    })?;
    Ok(log)
}

pub async fn fetch_ref_logs(wallet_id: i64, conn: &mut SqliteConnection) -> Result<Vec<RefLogEntry>, sqlx::Error> {
    let logs = sqlx::query_as("SELECT * FROM referral_logs WHERE wallet_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(wallet_id)
        .fetch_all(conn)
        .await?;
    Ok(logs)
}

pub async fn fetch_ref_balances(wallet_id: i64, conn: &mut SqliteConnection) -> Result<Vec<RefBalance>, sqlx::Error> {
    let balances =
        sqlx::query_as("SELECT currency, balance FROM wallet_ref_balances WHERE wallet_id = $1 ORDER BY currency")
            .bind(wallet_id)
            .fetch_all(conn)
            .await?;
    Ok(balances)
}
