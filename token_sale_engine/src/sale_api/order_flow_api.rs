use std::fmt::Debug;

use chrono::Duration;
use log::*;
use tsg_common::Amount;

use crate::{
    db_types::{NewDeposit, NewOrder, NewPayment, Order, Payment, UserId, BANK_ORDER_ADDRESS, CARD_MERCHANT_ID,
        CARD_ORDER_ADDRESS, NO_DEPOSIT_ADDRESS},
    sale_api::order_objects::CardCharge,
    traits::{DepositOutcome, SaleGatewayDatabase, SaleGatewayError},
};

/// `OrderFlowApi` is the primary write-side API: it persists purchases for each payment rail and
/// reconciles asynchronous deposit notifications against the order book.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderFlowApi<B>
where B: SaleGatewayDatabase
{
    /// Persists a card purchase that has already been charged successfully.
    ///
    /// The wallet, the payment record (uncredited, `merchant_id = "Stripe"`) and the paid order
    /// land in a single transaction, so a crash here cannot strand a payment without its order.
    /// If the transaction fails regardless, the card *has* been charged; the error is logged
    /// loudly for manual reconciliation and surfaced to the caller.
    pub async fn process_card_purchase(
        &self,
        user_id: UserId,
        price: Amount,
        amount: Amount,
        charge: CardCharge,
    ) -> Result<(Order, Payment), SaleGatewayError> {
        let payment = NewPayment {
            user_id: user_id.clone(),
            address: NO_DEPOSIT_ADDRESS.to_string(),
            currency: charge.currency.clone(),
            amount: charge.amount,
            order_price: price,
            fee: Amount::default(),
            confirms: 1,
            merchant_id: CARD_MERCHANT_ID.to_string(),
            ipn_id: charge.receipt_id.clone(),
            txn_id: charge.txn_id.clone(),
        };
        let order =
            NewOrder::new(user_id.clone(), CARD_ORDER_ADDRESS.to_string(), charge.currency.clone(), price, amount);
        let result = self.db.insert_card_order(order, payment).await;
        match &result {
            Ok((order, payment)) => {
                info!(
                    "💳️ Card purchase for user {user_id} settled. Order #{} paid by payment #{} ({} {})",
                    order.id, payment.id, payment.amount, payment.currency
                );
            },
            Err(e) => {
                // The charge has gone through at the processor but nothing was persisted.
                error!(
                    "💳️ CHARGED BUT NOT RECORDED: card charge {} for user {user_id} ({} {}) could not be \
                     persisted: {e}. Reconcile manually against the processor dashboard.",
                    charge.receipt_id, charge.amount, charge.currency
                );
            },
        }
        result
    }

    /// Persists a crypto purchase awaiting funds on the processor-issued deposit address.
    pub async fn process_crypto_purchase(
        &self,
        user_id: UserId,
        currency: String,
        amount: Amount,
        price: Amount,
        deposit_address: String,
    ) -> Result<Order, SaleGatewayError> {
        let order = NewOrder::new(user_id.clone(), deposit_address, currency, price, amount);
        let order = self.db.insert_pending_order(order).await?;
        info!(
            "🪙️ Crypto order #{} created for user {user_id}: awaiting {} {} on address {}",
            order.id, order.amount, order.currency, order.address
        );
        Ok(order)
    }

    /// Persists a bank transfer purchase. The order stays unpaid until an operator reconciles
    /// the transfer out of band.
    pub async fn process_bank_purchase(
        &self,
        user_id: UserId,
        currency: String,
        amount: Amount,
        price: Amount,
    ) -> Result<Order, SaleGatewayError> {
        let order = NewOrder::new(user_id.clone(), BANK_ORDER_ADDRESS.to_string(), currency, price, amount);
        let order = self.db.insert_pending_order(order).await?;
        info!("🏦️ Bank order #{} created for user {user_id} ({} {})", order.id, order.amount, order.currency);
        Ok(order)
    }

    /// Reconciles a verified deposit notification.
    ///
    /// Terminal rejections come back as [`DepositOutcome`] variants and are logged here; only
    /// infrastructure failures return `Err`, in which case the provider's redelivery will retry
    /// the whole resolution safely (the `ipn_id` uniqueness guard makes re-invocation harmless).
    pub async fn process_deposit(&self, deposit: NewDeposit) -> Result<DepositOutcome, SaleGatewayError> {
        let ipn_id = deposit.ipn_id.clone();
        let outcome = self.db.process_deposit(deposit).await.map_err(|e| {
            error!("🪙️ Error processing deposit notification {ipn_id}: {e}");
            e
        })?;
        match &outcome {
            DepositOutcome::PaymentRecorded { order, payment } => {
                info!(
                    "🪙️ Deposit {ipn_id} recorded as payment #{} ({} {}). Order #{} is now paid.",
                    payment.id, payment.amount, payment.currency, order.id
                );
            },
            DepositOutcome::DuplicateNotification { ipn_id } => {
                info!("🪙️ Payment already exists for notification {ipn_id}. Ignoring redelivery.");
            },
            DepositOutcome::NoMatchingOrder { address } => {
                warn!("🪙️ Deposit {ipn_id} arrived for address {address}, but no order owns it.");
            },
            DepositOutcome::OrderAlreadyPaid { order_id } => {
                warn!("🪙️ Deposit {ipn_id} targets order #{order_id}, which is already paid.");
            },
            DepositOutcome::OrderExpired { order_id } => {
                warn!("🪙️ Deposit {ipn_id} targets order #{order_id}, which has expired.");
            },
            DepositOutcome::CurrencyMismatch { order_id, order_currency, deposit_currency } => {
                warn!(
                    "🪙️ Deposit {ipn_id} is denominated in {deposit_currency}, but order #{order_id} was \
                     placed in {order_currency}. Rejecting."
                );
            },
        }
        Ok(outcome)
    }

    /// Marks unpaid orders older than `unpaid_limit` as expired, returning them.
    pub async fn expire_old_orders(&self, unpaid_limit: Duration) -> Result<Vec<Order>, SaleGatewayError> {
        let expired = self.db.expire_unpaid_orders(unpaid_limit).await?;
        if !expired.is_empty() {
            info!("🕰️ {} orders expired", expired.len());
        }
        Ok(expired)
    }
}
