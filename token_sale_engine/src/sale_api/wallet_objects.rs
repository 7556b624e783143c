use serde::{Deserialize, Serialize};

use crate::db_types::{RefBalance, RefLogEntry, Wallet, WalletLogEntry};

/// A wallet with its ledger, as served to the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub wallet: Wallet,
    pub logs: Vec<WalletLogEntry>,
    pub ref_balances: Vec<RefBalance>,
}

/// A user's referral earnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefEarnings {
    pub entries: Vec<RefLogEntry>,
}

impl RefEarnings {
    pub fn total_awards(&self) -> usize {
        self.entries.len()
    }
}
