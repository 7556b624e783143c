//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module
//! neat and tidy 🙏
//!
//! Since each worker thread processes its requests sequentially, any long, non-cpu-bound
//! operation (I/O, database and processor calls) must be expressed as a future so the worker can
//! interleave other requests while it waits.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use processor_tools::{BankOrderMail, CoinPaymentsApi, MailerApi, ProcessorApiError, StripeApi};
use token_sale_engine::{
    db_types::is_fiat,
    order_objects::CardCharge,
    OrderFlowApi,
    OrderManagement,
    OrderQueryApi,
    SaleGatewayDatabase,
    WalletApi,
};
use tsg_common::Amount;

use crate::{
    config::ServerConfig,
    data_objects::{BankPurchaseRequest, CryptoOrderResponse, JsonResponse, PurchaseRequest, ReferralUpdate,
        WalletAddressUpdate},
    errors::ServerError,
    middleware::AuthClaims,
};

// Web-actix cannot route generic handlers directly, so registration goes through the `route!`
// macro, which wraps each handler in a concrete unit struct implementing `HttpServiceFactory`.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Purchases ----------------------------------------------------
route!(create_order => Post "/order" impl SaleGatewayDatabase);
/// The purchase orchestrator. Fiat currencies are charged against the card processor first and
/// only a paid charge is persisted; any other currency gets a deposit address from the crypto
/// processor and the order waits for funds.
pub async fn create_order<B: SaleGatewayDatabase>(
    claims: AuthClaims,
    body: web::Json<PurchaseRequest>,
    api: web::Data<OrderFlowApi<B>>,
    stripe: web::Data<StripeApi>,
    coinpayments: web::Data<CoinPaymentsApi>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST order: {} {} for {}", request.amount, request.currency, claims.user_id);
    validate_purchase(&request.amount, &request.price)?;
    if is_fiat(&request.currency) {
        let token = request
            .token
            .as_deref()
            .ok_or_else(|| ServerError::InvalidPurchase("A card token is required for fiat purchases".to_string()))?;
        let receipt = stripe
            .charge(request.amount.minor_units(), &request.currency, token, "Token purchase")
            .await
            .map_err(card_charge_error)?;
        if !receipt.paid {
            return Err(ServerError::CardDeclined("The charge was not paid"));
        }
        let charged = Amount::from(receipt.amount as f64 / 100.0);
        let charge = CardCharge {
            receipt_id: receipt.id,
            txn_id: receipt.balance_transaction.unwrap_or_default(),
            amount: charged,
            currency: request.currency.to_ascii_uppercase(),
        };
        api.process_card_purchase(claims.user_id.into(), request.price, request.amount, charge).await?;
        Ok(HttpResponse::Ok()
            .json(JsonResponse::success(format!("Successfully paid {charged} {}", request.currency))))
    } else {
        let callback = coinpayments.get_callback_address(&request.currency).await.map_err(|e| {
            warn!("💻️ Could not obtain a deposit address: {e}");
            ServerError::ProcessorUnavailable("Coinpayments is unavailable".to_string())
        })?;
        let order = api
            .process_crypto_purchase(
                claims.user_id.into(),
                request.currency,
                request.amount,
                request.price,
                callback.address,
            )
            .await?;
        Ok(HttpResponse::Ok().json(CryptoOrderResponse { currency: order.currency, address: order.address }))
    }
}

route!(create_bank_order => Post "/bank-order" impl SaleGatewayDatabase);
/// Bank orders are persisted unpaid and the operator is emailed the transfer instructions; the
/// order stays open until someone reconciles the wire manually.
pub async fn create_bank_order<B: SaleGatewayDatabase>(
    claims: AuthClaims,
    body: web::Json<BankPurchaseRequest>,
    api: web::Data<OrderFlowApi<B>>,
    mailer: web::Data<MailerApi>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST bank order: {} {} for {}", request.amount, request.currency, claims.user_id);
    validate_purchase(&request.amount, &request.price)?;
    api.process_bank_purchase(claims.user_id.into(), request.currency.clone(), request.amount, request.price)
        .await?;
    let mail = BankOrderMail {
        investor_email: claims.email,
        amount: request.amount,
        currency: request.currency,
        bank_name: config.bank.bank_name.clone(),
        bank_number: config.bank.bank_number.clone(),
        swift_code: config.bank.swift_code.clone(),
    };
    // Fire-and-forget: mail failures must not fail the order
    let mailer = mailer.into_inner();
    tokio::spawn(async move { mailer.send_bank_order_email(mail).await });
    Ok(HttpResponse::Ok().json(JsonResponse::success("success")))
}

fn validate_purchase(amount: &Amount, price: &Amount) -> Result<(), ServerError> {
    if !amount.is_positive() {
        return Err(ServerError::InvalidPurchase(format!("Amount must be positive, got {amount}")));
    }
    if !price.is_positive() {
        return Err(ServerError::InvalidPurchase(format!("Price must be positive, got {price}")));
    }
    Ok(())
}

fn card_charge_error(e: ProcessorApiError) -> ServerError {
    match e {
        // The processor answered; the card was simply not charged
        ProcessorApiError::QueryError { status, .. } if status < 500 => {
            ServerError::CardDeclined("The processor declined the charge")
        },
        e => {
            warn!("💻️ Card processor failure: {e}");
            ServerError::ProcessorUnavailable("Card processor is unavailable".to_string())
        },
    }
}

//----------------------------------------------   Orders   ----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderManagement);
pub async fn my_orders<B: OrderManagement>(
    claims: AuthClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for {}", claims.user_id);
    let orders = api.orders_for_user(&claims.user_id.into()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/id/{id}" impl OrderManagement);
pub async fn order_by_id<B: OrderManagement>(
    claims: AuthClaims,
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let raw = path.into_inner();
    // Validate the id format before touching the store
    let id = raw.parse::<i64>().map_err(|_| ServerError::InvalidRequestPath(format!("'{raw}' is not an order id")))?;
    let order = api.order_by_id(id).await?.ok_or_else(|| ServerError::NoRecordFound("Order does not exist".into()))?;
    if order.user_id.as_str() != claims.user_id && !claims.admin {
        return Err(ServerError::InsufficientPermissions("This is not your order".to_string()));
    }
    Ok(HttpResponse::Ok().json(order))
}

route!(all_orders => Get "/orders/all" impl OrderManagement);
pub async fn all_orders<B: OrderManagement>(
    claims: AuthClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let orders = api.list_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(orders_by_currency => Get "/orders/currency/{code}" impl OrderManagement);
pub async fn orders_by_currency<B: OrderManagement>(
    claims: AuthClaims,
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let code = path.into_inner();
    let orders = api.orders_for_currency(&code).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Wallets  ----------------------------------------------------
route!(my_wallet => Get "/wallet" impl SaleGatewayDatabase);
pub async fn my_wallet<B: SaleGatewayDatabase>(
    claims: AuthClaims,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET wallet for {}", claims.user_id);
    let summary = api
        .wallet_summary(&claims.user_id.into())
        .await?
        .ok_or_else(|| ServerError::NoRecordFound("Wallet does not exist".to_string()))?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(update_wallet_address => Post "/wallet/address" impl SaleGatewayDatabase);
pub async fn update_wallet_address<B: SaleGatewayDatabase>(
    claims: AuthClaims,
    body: web::Json<WalletAddressUpdate>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let update = body.into_inner();
    if update.address.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("Address must not be empty".to_string()));
    }
    let wallet = api.update_wallet_address(&claims.user_id.into(), update.address.trim()).await?;
    Ok(HttpResponse::Ok().json(wallet))
}

route!(my_refers => Get "/refers" impl SaleGatewayDatabase);
pub async fn my_refers<B: SaleGatewayDatabase>(
    claims: AuthClaims,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let earnings = api.ref_earnings(&claims.user_id.into()).await?;
    Ok(HttpResponse::Ok().json(earnings.entries))
}

route!(upsert_referral => Post "/referrals" impl SaleGatewayDatabase);
pub async fn upsert_referral<B: SaleGatewayDatabase>(
    claims: AuthClaims,
    body: web::Json<ReferralUpdate>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let update = body.into_inner();
    let referral =
        api.upsert_referral(&update.user_id.into(), &update.referrer_user_id.into(), update.level).await?;
    Ok(HttpResponse::Ok().json(referral))
}

route!(run_credit_sweep => Post "/credits/run" impl SaleGatewayDatabase);
/// On-demand crediting sweep; the same operation the background worker runs on a timer.
pub async fn run_credit_sweep<B: SaleGatewayDatabase>(
    claims: AuthClaims,
    api: web::Data<WalletApi<B>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let summary = api.credit_eligible_payments(config.min_confirmations, &config.referral_rates).await?;
    info!("💻️ Manual credit sweep: {} credited, {} skipped", summary.credited, summary.skipped);
    Ok(HttpResponse::Ok().json(summary))
}

//----------------------------------------------    Sales   ----------------------------------------------------
route!(sales_stats => Get "/sales/stats" impl OrderManagement);
pub async fn sales_stats<B: OrderManagement>(
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let summary = api.sales_summary().await?;
    Ok(HttpResponse::Ok().json(summary))
}
