use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use tsg_common::Amount;

/// Currencies settled through the card rail rather than the crypto processor.
pub const FIAT_CURRENCIES: [&str; 2] = ["USD", "EUR"];

/// Sentinel "address" recorded on card orders, which have no deposit address.
pub const CARD_ORDER_ADDRESS: &str = "Stripe";
/// Sentinel "address" recorded on bank transfer orders.
pub const BANK_ORDER_ADDRESS: &str = "Bank Transfer";
/// Placeholder receiving address on card payments.
pub const NO_DEPOSIT_ADDRESS: &str = "n/a";
/// The merchant identifier recorded on card payments.
pub const CARD_MERCHANT_ID: &str = "Stripe";

/// The wallet label holding purchased sale tokens. Every investor gets exactly one wallet per
/// label.
pub const TOKEN_WALLET_LABEL: &str = "token";

pub fn is_fiat(currency: &str) -> bool {
    FIAT_CURRENCIES.iter().any(|c| c.eq_ignore_ascii_case(currency))
}

//--------------------------------------      UserId       -----------------------------------------------------------
/// An investor's identifier, assigned by the (out of scope) identity layer and treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct UserId(pub String);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for UserId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       Order       -----------------------------------------------------------
/// A purchase intent. Crypto orders wait on a deposit to their receiving address; card orders are
/// born paid; bank orders wait on manual reconciliation.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: UserId,
    /// The deposit address for crypto orders, or one of the rail sentinels
    /// ([`CARD_ORDER_ADDRESS`], [`BANK_ORDER_ADDRESS`]).
    pub address: String,
    pub currency: String,
    /// Price of one sale token, in `currency`.
    pub price: Amount,
    /// The purchase amount, in `currency`.
    pub amount: Amount,
    pub paid: bool,
    pub expired: bool,
    pub payment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub address: String,
    pub currency: String,
    pub price: Amount,
    pub amount: Amount,
}

impl NewOrder {
    pub fn new<S: Into<String>>(user_id: UserId, address: S, currency: S, price: Amount, amount: Amount) -> Self {
        Self { user_id, address: address.into(), currency: currency.into(), price, amount }
    }
}

//--------------------------------------      Payment       ----------------------------------------------------------
/// A confirmed funds-received event. Exactly one record exists per provider notification id
/// (`ipn_id`); the schema enforces this with a unique index.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub user_id: UserId,
    pub address: String,
    pub currency: String,
    /// The amount actually received, in `currency`.
    pub amount: Amount,
    /// The per-token price quoted on the order this payment settles.
    pub order_price: Amount,
    /// The processor's fee, in `currency`.
    pub fee: Amount,
    pub confirms: i64,
    pub merchant_id: String,
    /// The provider-assigned notification id. Natural dedup key.
    pub ipn_id: String,
    pub txn_id: String,
    /// Whether this payment's value has been applied to the owner's wallet.
    pub credited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     NewPayment       --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub user_id: UserId,
    pub address: String,
    pub currency: String,
    pub amount: Amount,
    pub order_price: Amount,
    pub fee: Amount,
    pub confirms: i64,
    pub merchant_id: String,
    pub ipn_id: String,
    pub txn_id: String,
}

//--------------------------------------     NewDeposit       --------------------------------------------------------
/// A verified deposit notification from the crypto processor, ready for reconciliation.
///
/// By the time one of these is constructed the transport-level checks have already passed: the
/// HMAC signature was valid, `ipn_type` was `deposit` and the amount was positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeposit {
    pub address: String,
    pub currency: String,
    pub amount: Amount,
    pub fee: Amount,
    pub confirms: i64,
    pub merchant_id: String,
    pub ipn_id: String,
    pub txn_id: String,
}

//--------------------------------------       Wallet       ----------------------------------------------------------
/// An investor's token ledger. One row per `(user_id, label)`, enforced by the schema.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub user_id: UserId,
    pub label: String,
    /// The investor's own withdrawal address, if they have supplied one.
    pub address: Option<String>,
    /// Credited token balance.
    pub balance: Amount,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    WalletLogEntry    --------------------------------------------------------
/// One credit applied to a wallet. 1:1 with credited payments; the unique index on `payment_id`
/// is what makes double-crediting impossible.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct WalletLogEntry {
    pub id: i64,
    pub wallet_id: i64,
    pub payment_id: i64,
    /// Token quantity credited.
    pub addition: Amount,
    /// On-chain distribution hash, once tokens have been delivered.
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     RefBalance       --------------------------------------------------------
/// A referrer's accumulated bonus in one currency.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct RefBalance {
    pub currency: String,
    pub balance: Amount,
}

//--------------------------------------      RefStatus       --------------------------------------------------------
/// Payout state of a referral bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RefStatus {
    /// Bonus accrued, no payout requested.
    Not,
    /// Payout requested, not yet settled.
    Pending,
    /// Paid out.
    Paid,
}

impl Display for RefStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefStatus::Not => write!(f, "not"),
            RefStatus::Pending => write!(f, "pending"),
            RefStatus::Paid => write!(f, "paid"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid referral status: {0}")]
pub struct RefStatusConversionError(String);

impl FromStr for RefStatus {
    type Err = RefStatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not" => Ok(Self::Not),
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            s => Err(RefStatusConversionError(s.to_string())),
        }
    }
}

impl From<String> for RefStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|e| {
            error!("{e}. But this conversion cannot fail. Defaulting to 'not'.");
            RefStatus::Not
        })
    }
}

//--------------------------------------     RefLogEntry      --------------------------------------------------------
/// One referral bonus accrued to a wallet, denominated in the currency of the payment that earned
/// it.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct RefLogEntry {
    pub id: i64,
    pub wallet_id: i64,
    /// The investor whose purchase earned the bonus.
    pub referred_user_id: UserId,
    pub payment_id: i64,
    pub addition: Amount,
    pub currency: String,
    pub paid: bool,
    pub status: RefStatus,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      Referral        --------------------------------------------------------
/// A referral relationship: `referrer_user_id` recruited `user_id` at the given program level.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Referral {
    pub id: i64,
    pub user_id: UserId,
    pub referrer_user_id: UserId,
    /// 1-based program level; level n earns the n-th configured bonus rate.
    pub level: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fiat_detection() {
        assert!(is_fiat("USD"));
        assert!(is_fiat("eur"));
        assert!(!is_fiat("BTC"));
        assert!(!is_fiat("LTCT"));
    }

    #[test]
    fn ref_status_round_trip() {
        for s in [RefStatus::Not, RefStatus::Pending, RefStatus::Paid] {
            assert_eq!(s.to_string().parse::<RefStatus>().unwrap(), s);
        }
        assert!("nope".parse::<RefStatus>().is_err());
    }
}
