use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment, UserId, WalletLogEntry};

//--------------------------------------   DepositOutcome   ----------------------------------------------------------
/// The resolution of one deposit notification.
///
/// Every terminal rejection is its own variant so callers can log and answer the provider
/// distinctly. Only infrastructure failures surface as errors; a rejected notification is a
/// *successful* resolution (the provider's retry would reproduce it, so it must not look like a
/// delivery failure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DepositOutcome {
    /// The happy path: a payment record was created and the order flipped to paid.
    PaymentRecorded { order: Order, payment: Payment },
    /// A payment already exists for this `ipn_id`. No state was changed.
    DuplicateNotification { ipn_id: String },
    /// No order owns the deposit address.
    NoMatchingOrder { address: String },
    /// The matched order has already been paid.
    OrderAlreadyPaid { order_id: i64 },
    /// The matched order expired before the deposit arrived.
    OrderExpired { order_id: i64 },
    /// The deposit's currency does not match the order's.
    CurrencyMismatch { order_id: i64, order_currency: String, deposit_currency: String },
}

//--------------------------------------    CreditOutcome   ----------------------------------------------------------
/// The resolution of one crediting attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CreditOutcome {
    /// Tokens were credited and `referral_awards` bonus rows were appended to referrer wallets.
    Credited { payment: Payment, log: WalletLogEntry, referral_awards: usize },
    /// The payment was credited previously. No state was changed.
    AlreadyCredited { payment_id: i64 },
    /// The owner's wallet is disabled; crediting is withheld until an operator re-enables it.
    WalletDisabled { payment_id: i64, user_id: UserId },
}

//--------------------------------------    CreditSummary   ----------------------------------------------------------
/// Tally of one crediting sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSummary {
    pub credited: usize,
    pub skipped: usize,
}

impl CreditSummary {
    pub fn total(&self) -> usize {
        self.credited + self.skipped
    }
}
