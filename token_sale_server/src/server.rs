use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::info;
use processor_tools::{CoinPaymentsApi, MailerApi, StripeApi};
use token_sale_engine::{OrderFlowApi, OrderQueryApi, SqliteDatabase, WalletApi};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    ipn_routes::IpnWebhookRoute,
    middleware::{HmacMiddlewareFactory, TokenVerifier},
    routes::{
        health,
        AllOrdersRoute,
        CreateBankOrderRoute,
        CreateOrderRoute,
        MyOrdersRoute,
        MyRefersRoute,
        MyWalletRoute,
        OrderByIdRoute,
        OrdersByCurrencyRoute,
        RunCreditSweepRoute,
        SalesStatsRoute,
        UpdateWalletAddressRoute,
        UpsertReferralRoute,
    },
    workers::{start_credit_worker, start_expiry_worker},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let _expiry_worker = start_expiry_worker(db.clone(), config.unpaid_order_timeout);
    let _credit_worker = start_credit_worker(db.clone(), config.min_confirmations, config.referral_rates.clone());
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let stripe = StripeApi::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let coinpayments =
        CoinPaymentsApi::new(config.coinpayments.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mailer = MailerApi::new(config.mailer.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Processor clients initialised");
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let order_flow_api = OrderFlowApi::new(db.clone());
        let wallet_api = WalletApi::new(db.clone());
        let query_api = OrderQueryApi::new(db.clone());
        let verifier = TokenVerifier::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("tsg::access_log"))
            .app_data(web::Data::new(order_flow_api))
            .app_data(web::Data::new(wallet_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(verifier))
            .app_data(web::Data::new(stripe.clone()))
            .app_data(web::Data::new(coinpayments.clone()))
            .app_data(web::Data::new(mailer.clone()))
            .app_data(web::Data::new(config.clone()));
        // Routes that require an access token
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(CreateBankOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(AllOrdersRoute::<SqliteDatabase>::new())
            .service(OrdersByCurrencyRoute::<SqliteDatabase>::new())
            .service(MyWalletRoute::<SqliteDatabase>::new())
            .service(UpdateWalletAddressRoute::<SqliteDatabase>::new())
            .service(MyRefersRoute::<SqliteDatabase>::new())
            .service(UpsertReferralRoute::<SqliteDatabase>::new())
            .service(RunCreditSweepRoute::<SqliteDatabase>::new());
        // The processor's notifications are authenticated by body signature, not access token
        let ipn_scope = web::scope("/ipn")
            .wrap(HmacMiddlewareFactory::new(
                "HMAC",
                config.ipn.merchant_secret.clone(),
                config.ipn.hmac_checks,
            ))
            .service(IpnWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(SalesStatsRoute::<SqliteDatabase>::new()).service(api_scope).service(ipn_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
