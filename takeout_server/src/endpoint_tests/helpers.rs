use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use log::debug;
use serde_json::Value;
use takeout_engine::{notifications::NotificationHub, order_objects::PaymentMode, CartApi, OrderFlowApi};

use super::mocks::{MockCartStore, MockOrderStore, MockProvider};
use crate::{
    auth::{AdminClaims, JwtAuthority, UserClaims},
    config::AuthConfig,
    server::{json_config, path_config, query_config},
};

// Signs the tokens used by the endpoint tests. DO NOT re-use this secret anywhere.
pub const TEST_JWT_SECRET: &str = "endpoint-tests-secret-not-for-production";

pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new(TEST_JWT_SECRET)
}

pub fn authority() -> JwtAuthority {
    JwtAuthority::new(&get_auth_config())
}

pub fn user_token(user_id: i64) -> String {
    authority().issue_token(UserClaims { user_id }).expect("Failed to sign token")
}

pub fn admin_token(emp_id: i64) -> String {
    authority().issue_token(AdminClaims { emp_id }).expect("Failed to sign token")
}

/// Registers an order API backed by the given mocks, in bypass mode, with an empty notification hub.
pub fn orders_api(cfg: &mut ServiceConfig, store: MockOrderStore, provider: MockProvider) {
    let api = OrderFlowApi::new(store, provider, NotificationHub::new(), PaymentMode::Bypass);
    cfg.app_data(web::Data::new(api));
}

pub fn cart_api(cfg: &mut ServiceConfig, store: MockCartStore) {
    cfg.app_data(web::Data::new(CartApi::new(store)));
}

/// Sends `req` to an app built the way the server builds it, and returns the status along with the body.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new()
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .app_data(web::Data::new(authority()))
        .configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::call_service(&service, req.to_request()).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    debug!("Response: {status} {body}");
    (status, body)
}

/// Like [`send_request`], for routes that answer with JSON.
pub async fn send_json_request<F>(req: TestRequest, configure: F) -> (StatusCode, Value)
where F: FnOnce(&mut ServiceConfig) {
    let (status, body) = send_request(req, configure).await;
    let json = serde_json::from_str(&body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"));
    (status, json)
}
