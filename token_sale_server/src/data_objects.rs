use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tsg_common::Amount;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub currency: String,
    /// Amount to spend, in `currency`.
    pub amount: Amount,
    /// Quoted per-token price, in `currency`.
    pub price: Amount,
    /// Card token from the payment form. Required for fiat purchases only.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankPurchaseRequest {
    pub currency: String,
    pub amount: Amount,
    pub price: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletAddressUpdate {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralUpdate {
    pub user_id: String,
    pub referrer_user_id: String,
    #[serde(default = "default_level")]
    pub level: i64,
}

fn default_level() -> i64 {
    1
}

/// The crypto processor's notification wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpnPayload {
    pub ipn_type: String,
    pub ipn_id: String,
    #[serde(default)]
    pub address: String,
    pub amount: Amount,
    pub currency: String,
    #[serde(default)]
    pub fee: Amount,
    #[serde(default)]
    pub confirms: i64,
    pub merchant: String,
    #[serde(default)]
    pub txn_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoOrderResponse {
    pub currency: String,
    /// The deposit address the investor must fund.
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}
