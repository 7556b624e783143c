use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Referral, UserId, Wallet, TOKEN_WALLET_LABEL},
    sale_api::wallet_objects::{RefEarnings, WalletSummary},
    traits::{CreditOutcome, CreditSummary, OrderQueryError, SaleGatewayDatabase, SaleGatewayError},
};

/// `WalletApi` manages investor wallets and the crediting workflow that turns confirmed payments
/// into token balances (and referral bonuses).
pub struct WalletApi<B> {
    db: B,
}

impl<B> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> WalletApi<B>
where B: SaleGatewayDatabase
{
    /// Fetches the user's token wallet, creating a zeroed one if this is their first contact.
    pub async fn ensure_wallet(&self, user_id: &UserId) -> Result<Wallet, SaleGatewayError> {
        self.db.ensure_wallet(user_id).await
    }

    /// Records the user's withdrawal address, creating the wallet lazily if needed.
    pub async fn update_wallet_address(&self, user_id: &UserId, address: &str) -> Result<Wallet, SaleGatewayError> {
        let wallet = self.db.update_wallet_address(user_id, address).await?;
        debug!("👛️ Wallet #{} for user {user_id} now points at {address}", wallet.id);
        Ok(wallet)
    }

    /// The user's wallet with its credit log and per-currency referral balances, or `None` if
    /// they have never interacted with the sale.
    pub async fn wallet_summary(&self, user_id: &UserId) -> Result<Option<WalletSummary>, OrderQueryError> {
        let wallet = match self.db.fetch_wallet_for_user(user_id, TOKEN_WALLET_LABEL).await? {
            Some(w) => w,
            None => return Ok(None),
        };
        let logs = self.db.fetch_wallet_logs(wallet.id).await?;
        let ref_balances = self.db.fetch_ref_balances(wallet.id).await?;
        Ok(Some(WalletSummary { wallet, logs, ref_balances }))
    }

    /// The user's referral bonus records, newest first.
    pub async fn ref_earnings(&self, user_id: &UserId) -> Result<RefEarnings, OrderQueryError> {
        let wallet = match self.db.fetch_wallet_for_user(user_id, TOKEN_WALLET_LABEL).await? {
            Some(w) => w,
            None => return Ok(RefEarnings::default()),
        };
        let entries = self.db.fetch_ref_logs(wallet.id).await?;
        Ok(RefEarnings { entries })
    }

    /// Records that `referrer` recruited `user` at the given program level.
    pub async fn upsert_referral(
        &self,
        user_id: &UserId,
        referrer_user_id: &UserId,
        level: i64,
    ) -> Result<Referral, SaleGatewayError> {
        if user_id == referrer_user_id {
            return Err(SaleGatewayError::InvalidReferral(format!("user {user_id} cannot refer themselves")));
        }
        if level < 1 {
            return Err(SaleGatewayError::InvalidReferral(format!("level must be >= 1, got {level}")));
        }
        self.db.upsert_referral(user_id, referrer_user_id, level).await
    }

    /// Credits one payment, exactly once. See [`SaleGatewayDatabase::credit_payment`].
    pub async fn credit_payment(
        &self,
        payment_id: i64,
        referral_rates: &[f64],
    ) -> Result<CreditOutcome, SaleGatewayError> {
        let outcome = self.db.credit_payment(payment_id, referral_rates).await?;
        match &outcome {
            CreditOutcome::Credited { payment, log, referral_awards } => {
                info!(
                    "💰️ Payment #{} credited: {} tokens to user {} ({} referral awards)",
                    payment.id, log.addition, payment.user_id, referral_awards
                );
            },
            CreditOutcome::AlreadyCredited { payment_id } => {
                debug!("💰️ Payment #{payment_id} was already credited. Nothing to do.");
            },
            CreditOutcome::WalletDisabled { payment_id, user_id } => {
                warn!("💰️ Withholding credit for payment #{payment_id}: wallet of user {user_id} is disabled.");
            },
        }
        Ok(outcome)
    }

    /// Credits every eligible uncredited payment: card payments immediately, crypto payments
    /// once `min_confirms` confirmations have been reported.
    ///
    /// Per-payment failures are logged and skipped rather than aborting the sweep; the atomic
    /// `credited` gate makes re-running always safe.
    pub async fn credit_eligible_payments(
        &self,
        min_confirms: i64,
        referral_rates: &[f64],
    ) -> Result<CreditSummary, SaleGatewayError> {
        let eligible = self.db.fetch_creditable_payments(min_confirms).await?;
        let mut summary = CreditSummary::default();
        for payment in eligible {
            match self.credit_payment(payment.id, referral_rates).await {
                Ok(CreditOutcome::Credited { .. }) => summary.credited += 1,
                Ok(_) => summary.skipped += 1,
                Err(e) => {
                    error!("💰️ Could not credit payment #{}: {e}", payment.id);
                    summary.skipped += 1;
                },
            }
        }
        Ok(summary)
    }
}
