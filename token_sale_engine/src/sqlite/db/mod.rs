//! # SQLite database methods
//!
//! "Low-level" statements, kept as simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers obtain a connection from a pool, or open a
//! transaction as the need arises, and call through without any other changes.
use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod orders;
pub mod payments;
pub mod referrals;
pub mod wallets;

const SQLITE_DB_URL: &str = "sqlite://data/token_sale.db";

pub fn db_url() -> String {
    let result = env::var("TSG_DATABASE_URL").unwrap_or_else(|_| {
        info!("TSG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
