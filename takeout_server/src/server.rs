use std::time::Duration;

use actix_web::{dev::Server, error, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use takeout_engine::{notifications::NotificationHub, CartApi, OrderFlowApi, PaymentCallbackApi, SqliteDatabase};

use crate::{
    auth::JwtAuthority,
    config::ServerConfig,
    errors::ServerError,
    integrations::wxpay::WxPayProvider,
    reconciliation_worker::{start_delivery_sweeper, start_timeout_sweeper},
    routes::{
        health,
        AdminCancelRoute,
        AdminOrderDetailRoute,
        CartAddRoute,
        CartCleanRoute,
        CartListRoute,
        CartSubRoute,
        CompleteRoute,
        ConditionSearchRoute,
        ConfirmRoute,
        DeliveryRoute,
        HistoryOrdersRoute,
        OrderDetailRoute,
        PaySuccessCallbackRoute,
        RefundCallbackRoute,
        RejectionRoute,
        ReminderRoute,
        RepetitionRoute,
        RequestPaymentRoute,
        StatisticsRoute,
        SubmitOrderRoute,
        UserCancelRoute,
    },
    ws::dashboard_socket,
};

type Db = SqliteDatabase;
type Provider = WxPayProvider;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let provider = WxPayProvider::new(config.wxpay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let hub = NotificationHub::new();
    // The workers hold their own handle to the pool, and run until the process ends
    let _timeout_sweeper = start_timeout_sweeper(db.clone(), config.sweeps.clone());
    let _delivery_sweeper = start_delivery_sweeper(db.clone(), config.sweeps.clone());
    let srv = create_server_instance(config, db, provider, hub)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    provider: WxPayProvider,
    hub: NotificationHub,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), provider.clone(), hub.clone(), config.payment_mode);
        let callback_api = PaymentCallbackApi::new(orders_api.clone());
        let cart_api = CartApi::new(db.clone());
        let authority = JwtAuthority::new(&config.auth);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("takeout::access_log"))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(callback_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(authority))
            .app_data(web::Data::new(hub.clone()))
            .service(health)
            .service(dashboard_socket)
            // Customer routes
            .service(SubmitOrderRoute::<Db, Provider>::new())
            .service(RequestPaymentRoute::<Db, Provider>::new())
            .service(HistoryOrdersRoute::<Db, Provider>::new())
            .service(OrderDetailRoute::<Db, Provider>::new())
            .service(UserCancelRoute::<Db, Provider>::new())
            .service(RepetitionRoute::<Db>::new())
            .service(ReminderRoute::<Db, Provider>::new())
            .service(CartAddRoute::<Db>::new())
            .service(CartSubRoute::<Db>::new())
            .service(CartListRoute::<Db>::new())
            .service(CartCleanRoute::<Db>::new())
            // Back office routes
            .service(ConditionSearchRoute::<Db, Provider>::new())
            .service(StatisticsRoute::<Db, Provider>::new())
            .service(AdminOrderDetailRoute::<Db, Provider>::new())
            .service(ConfirmRoute::<Db, Provider>::new())
            .service(RejectionRoute::<Db, Provider>::new())
            .service(AdminCancelRoute::<Db, Provider>::new())
            .service(DeliveryRoute::<Db, Provider>::new())
            .service(CompleteRoute::<Db, Provider>::new())
            // Payment provider callbacks
            .service(PaySuccessCallbackRoute::<Db, Provider>::new())
            .service(RefundCallbackRoute::<Db, Provider>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Server is listening");
    Ok(srv)
}

/// Malformed bodies, queries and paths are answered with the usual envelope instead of actix's plain text.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|e, _| {
        debug!("💻️ Could not deserialize request body. {e}");
        error::Error::from(ServerError::BadRequest(e.to_string()))
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|e, _| error::Error::from(ServerError::BadRequest(e.to_string())))
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|e, _| error::Error::from(ServerError::BadRequest(e.to_string())))
}
