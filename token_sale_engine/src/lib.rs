//! Token Sale Engine
//!
//! The token sale engine is the back office for a token sale (ICO): it keeps the books for
//! purchase orders, confirmed payments and per-investor wallets, and enforces the reconciliation
//! rules that tie the three together.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You
//!    should never need to access the database directly; use the public API instead. The
//!    exception is the data types used in the database, which are defined in the `db_types`
//!    module and are public.
//! 2. The engine public API ([`mod@sale_api`]). This provides the public-facing functionality:
//!    purchase order flows, deposit (IPN) reconciliation, wallet crediting and the read-side
//!    queries the REST layer serves. Backends implement the traits in [`mod@traits`] to plug in.
//!
//! The one design rule that matters: every multi-record state transition (purchase persistence,
//! deposit reconciliation, crediting) happens inside a single database transaction, and the
//! invariants that survive a crash or a race live in the schema itself (unique indices on
//! `payments.ipn_id`, `wallets(user_id, label)` and `wallet_logs.payment_id`), not in handler
//! checks.

pub mod db_types;
mod sale_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use sale_api::{
    order_flow_api::OrderFlowApi,
    order_objects,
    order_query_api::OrderQueryApi,
    wallet_api::WalletApi,
    wallet_objects,
};
pub use traits::{OrderManagement, OrderQueryError, SaleGatewayDatabase, SaleGatewayError};
