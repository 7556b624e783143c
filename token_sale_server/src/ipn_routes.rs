//----------------------------------------------  Deposits  ----------------------------------------------------
//! The crypto processor's notification endpoint.
//!
//! Transport authentication (the HMAC body signature) happens in
//! [`crate::middleware::HmacMiddlewareFactory`] before this handler runs. Everything the handler
//! itself decides is a *business* outcome and must answer in the 200 range: a non-2xx response
//! makes the provider redeliver, and redelivering a terminally rejected notification can never
//! change the result. Only infrastructure failures answer 5xx, precisely because a retry might
//! then succeed.

use actix_web::{web, HttpResponse};
use log::*;
use token_sale_engine::{db_types::NewDeposit, traits::DepositOutcome, OrderFlowApi, SaleGatewayDatabase};

use crate::{
    config::ServerConfig,
    data_objects::{IpnPayload, JsonResponse},
    errors::ServerError,
    route,
};

route!(ipn_webhook => Post "" impl SaleGatewayDatabase);
pub async fn ipn_webhook<B: SaleGatewayDatabase>(
    body: web::Json<IpnPayload>,
    api: web::Data<OrderFlowApi<B>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let notice = body.into_inner();
    trace!("🪙️ Received IPN {} of type {}", notice.ipn_id, notice.ipn_type);
    if notice.merchant != config.ipn.merchant_id {
        warn!("🪙️ IPN {} carries unknown merchant id. Denying.", notice.ipn_id);
        return Ok(HttpResponse::Forbidden().json(JsonResponse::failure("Unknown merchant.")));
    }
    // Only funded deposits drive state; everything else is noise from the provider's lifecycle
    if notice.ipn_type != "deposit" || !notice.amount.is_positive() {
        debug!("🪙️ Ignoring IPN {} (type {}, amount {})", notice.ipn_id, notice.ipn_type, notice.amount);
        return Ok(HttpResponse::Ok().json(JsonResponse::success("Notification ignored.")));
    }
    let deposit = NewDeposit {
        address: notice.address,
        currency: notice.currency,
        amount: notice.amount,
        fee: notice.fee,
        confirms: notice.confirms,
        merchant_id: notice.merchant,
        ipn_id: notice.ipn_id,
        txn_id: notice.txn_id,
    };
    let response = match api.process_deposit(deposit).await? {
        DepositOutcome::PaymentRecorded { order, payment } => {
            JsonResponse::success(format!("Payment #{} recorded, order #{} paid.", payment.id, order.id))
        },
        DepositOutcome::DuplicateNotification { ipn_id } => {
            JsonResponse::success(format!("Payment already exists for notification {ipn_id}."))
        },
        DepositOutcome::NoMatchingOrder { address } => {
            JsonResponse::failure(format!("No order found for address {address}."))
        },
        DepositOutcome::OrderAlreadyPaid { order_id } => {
            JsonResponse::failure(format!("Order #{order_id} was already paid."))
        },
        DepositOutcome::OrderExpired { order_id } => {
            JsonResponse::failure(format!("Order #{order_id} has expired."))
        },
        DepositOutcome::CurrencyMismatch { order_id, order_currency, deposit_currency } => JsonResponse::failure(
            format!("Deposit currency {deposit_currency} does not match {order_currency} on order #{order_id}."),
        ),
    };
    Ok(HttpResponse::Ok().json(response))
}
