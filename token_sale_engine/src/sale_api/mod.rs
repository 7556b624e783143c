//! # Token sale engine public API
//!
//! The `sale_api` module exposes the programmatic API for the token sale engine. The API is
//! modular so that clients can pick the functionality they need:
//!
//! * [`order_flow_api`] drives the write-side flows: persisting purchases for the card, crypto
//!   and bank rails, reconciling deposit notifications, and expiring stale orders.
//! * [`wallet_api`] manages investor wallets: lazy creation, withdrawal addresses, referral
//!   links, and the idempotent crediting step that turns confirmed payments into token balances.
//! * [`order_query_api`] serves the read-side projections (order histories joined with payments
//!   and wallet logs, sale aggregates).
//!
//! The usage pattern is the same for each: construct the API over a database backend that
//! implements the required trait.
//!
//! ```rust,ignore
//! use token_sale_engine::{OrderQueryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/sale.db", 25).await?;
//! let api = OrderQueryApi::new(db);
//! let orders = api.orders_for_user(&"u-1001".into()).await?;
//! ```

pub mod order_flow_api;
pub mod order_objects;
pub mod order_query_api;
pub mod wallet_api;
pub mod wallet_objects;
