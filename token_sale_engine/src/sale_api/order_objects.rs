use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tsg_common::Amount;

use crate::db_types::{Order, UserId, WalletLogEntry};

//--------------------------------------     CardCharge      ---------------------------------------------------------
/// The parts of a successful card charge the engine needs to persist a settled purchase.
///
/// Constructed by the caller from the card processor's receipt; an unpaid or failed charge never
/// becomes one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCharge {
    /// The processor's charge id. Doubles as the payment's notification id for dedup.
    pub receipt_id: String,
    /// The processor's settlement transaction id.
    pub txn_id: String,
    pub amount: Amount,
    pub currency: String,
}

//--------------------------------------      UserOrder      ---------------------------------------------------------
/// An order as shown to its owner: the record itself plus what actually arrived for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOrder {
    #[serde(flatten)]
    pub order: Order,
    /// The amount received on the linked payment, or zero while unpaid.
    pub paid_amount: Amount,
    pub credited: bool,
    /// The provider transaction id of the linked payment.
    pub paid_tx: Option<String>,
    /// The wallet log entry once the payment has been credited.
    pub log: Option<WalletLogEntry>,
}

impl UserOrder {
    /// An unpaid order's projection: nothing received yet.
    pub fn unpaid(order: Order) -> Self {
        Self { order, paid_amount: Amount::default(), credited: false, paid_tx: None, log: None }
    }
}

//--------------------------------------   OrderQueryFilter  ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub user_id: Option<UserId>,
    pub currency: Option<String>,
    pub address: Option<String>,
    pub paid: Option<bool>,
    pub expired: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn paid(mut self, paid: bool) -> Self {
        self.paid = Some(paid);
        self
    }

    pub fn expired(mut self, expired: bool) -> Self {
        self.expired = Some(expired);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.currency.is_none()
            && self.address.is_none()
            && self.paid.is_none()
            && self.expired.is_none()
            && self.since.is_none()
            && self.until.is_none()
    }
}

//--------------------------------------     SalesSummary    ---------------------------------------------------------
/// Headline aggregates for the public sale dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    /// Orders still live (not expired).
    pub open_orders: i64,
    /// Payments whose value has been applied to a wallet.
    pub credited_payments: i64,
    /// Distinct users with at least one payment.
    pub contributors: i64,
    /// Total token quantity credited across all wallets.
    pub tokens_sold: Amount,
}
