//! # Database backend contracts.
//!
//! This module defines the interfaces a storage backend must implement to drive the token sale
//! engine.
//!
//! ## Write side
//! [`SaleGatewayDatabase`] carries the state transitions with real invariants behind them:
//! purchase persistence, deposit reconciliation, wallet ensure/credit, order expiry. Every method
//! that touches more than one record is transactional, and the idempotency rules (one payment per
//! `ipn_id`, one wallet per `(user_id, label)`, one wallet log per payment) are enforced by
//! unique indices in the backend schema — the handler-level checks are optimisations, not the
//! correctness mechanism.
//!
//! ## Read side
//! [`OrderManagement`] provides the query projections the REST layer serves: orders joined with
//! their payment and wallet log, wallet summaries, referral records and sale aggregates. These
//! have no invariants of their own beyond faithfully reflecting the write side.
mod data_objects;
mod order_management;
mod sale_gateway_database;

pub use data_objects::{CreditOutcome, CreditSummary, DepositOutcome};
pub use order_management::{OrderManagement, OrderQueryError};
pub use sale_gateway_database::{SaleGatewayDatabase, SaleGatewayError};
