use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use takeout_engine::{
    db_types::{OrderStatus, PayStatus},
    notifications::NotificationHub,
    order_objects::PaymentMode,
    traits::{OrderRepositoryError, PaymentResult, ProviderError, RefundResult},
    OrderFlowApi,
    PaymentCallbackApi,
};

use super::{
    helpers::send_json_request,
    mocks::{order, updated, MockOrderStore, MockProvider},
};
use crate::routes::{PaySuccessCallbackRoute, RefundCallbackRoute};

type Store = MockOrderStore;
type Provider = MockProvider;

const NOTIFICATION: &str = r#"{
    "id": "EV-2024101600001",
    "create_time": "2024-10-16T16:00:00+08:00",
    "resource_type": "encrypt-resource",
    "event_type": "TRANSACTION.SUCCESS",
    "summary": "payment succeeded",
    "resource": {
        "original_type": "transaction",
        "algorithm": "AEAD_AES_256_GCM",
        "ciphertext": "c2VhbGVk",
        "associated_data": "transaction",
        "nonce": "n0nc3n0nc3n0"
    }
}"#;

fn callback(path: &str) -> TestRequest {
    TestRequest::post()
        .uri(path)
        .insert_header(("Wechatpay-Timestamp", "1729065600"))
        .insert_header(("Wechatpay-Nonce", "5K8264ILTKCH16CQ2502SI8ZNMTM67VS"))
        .insert_header(("Wechatpay-Signature", "c2lnbmF0dXJl"))
        .insert_header(("Wechatpay-Serial", "PUB_KEY_ID_0001"))
        .set_payload(NOTIFICATION)
}

fn callback_api(cfg: &mut ServiceConfig, store: Store, provider: Provider) {
    let orders = OrderFlowApi::new(store, provider, NotificationHub::new(), PaymentMode::Gateway);
    cfg.app_data(web::Data::new(PaymentCallbackApi::new(orders)))
        .service(PaySuccessCallbackRoute::<Store, Provider>::new())
        .service(RefundCallbackRoute::<Store, Provider>::new());
}

fn verified_payment(trade_state: &'static str) -> Provider {
    let mut provider = Provider::new();
    provider
        .expect_verify_callback_signature()
        .withf(|envelope| envelope.headers.serial == "PUB_KEY_ID_0001" && envelope.body == NOTIFICATION)
        .returning(|_| true);
    provider.expect_decrypt_payment_result().returning(move |_| {
        Ok(PaymentResult {
            out_trade_no: "1729065600001".to_string(),
            transaction_id: "4200000000202410160000000001".to_string(),
            trade_state: trade_state.to_string(),
            trade_state_desc: String::new(),
        })
    });
    provider
}

#[actix_web::test]
async fn forged_callback_is_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_json_request(callback("/notify/paySuccess"), |cfg| {
        let mut provider = Provider::new();
        provider.expect_verify_callback_signature().returning(|_| false);
        provider.expect_decrypt_payment_result().never();
        let mut store = Store::new();
        store.expect_fetch_order_by_number().never();
        callback_api(cfg, store, provider);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "FAIL");
    assert_eq!(body["message"], "invalid signature");
}

#[actix_web::test]
async fn callback_without_signature_headers() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/notify/paySuccess").set_payload(NOTIFICATION);
    let (status, body) = send_json_request(req, |cfg| {
        let mut provider = Provider::new();
        provider.expect_verify_callback_signature().never();
        callback_api(cfg, Store::new(), provider);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "FAIL");
}

#[actix_web::test]
async fn payment_is_recorded() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_json_request(callback("/notify/paySuccess"), |cfg| {
        let mut store = Store::new();
        store
            .expect_fetch_order_by_number()
            .withf(|number| number.to_string() == "1729065600001")
            .times(1)
            .returning(|_| Ok(Some(order(1, OrderStatus::PendingPayment, PayStatus::Unpaid))));
        store
            .expect_update_order()
            .withf(|_, _, update| {
                update.status == Some(OrderStatus::ToBeConfirmed) && update.pay_status == Some(PayStatus::Paid)
            })
            .times(1)
            .returning(|_, _, update| {
                Ok(Some(updated(order(1, OrderStatus::PendingPayment, PayStatus::Unpaid), update)))
            });
        callback_api(cfg, store, verified_payment("SUCCESS"));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "SUCCESS");
    assert_eq!(body["message"], "order paid");
}

#[actix_web::test]
async fn redelivered_payment_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_json_request(callback("/notify/paySuccess"), |cfg| {
        let mut store = Store::new();
        store
            .expect_fetch_order_by_number()
            .returning(|_| Ok(Some(order(1, OrderStatus::ToBeConfirmed, PayStatus::Paid))));
        store.expect_update_order().never();
        callback_api(cfg, store, verified_payment("SUCCESS"));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "SUCCESS");
    assert_eq!(body["message"], "already processed");
}

#[actix_web::test]
async fn unsuccessful_trade_is_ignored() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_json_request(callback("/notify/paySuccess"), |cfg| {
        let mut store = Store::new();
        store.expect_fetch_order_by_number().never();
        callback_api(cfg, store, verified_payment("CLOSED"));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "SUCCESS");
}

#[actix_web::test]
async fn database_failure_asks_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_json_request(callback("/notify/paySuccess"), |cfg| {
        let mut store = Store::new();
        store
            .expect_fetch_order_by_number()
            .returning(|_| Err(OrderRepositoryError::DatabaseError("database is locked".into())));
        callback_api(cfg, store, verified_payment("SUCCESS"));
    })
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "FAIL");
}

#[actix_web::test]
async fn undecryptable_payment_is_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_json_request(callback("/notify/paySuccess"), |cfg| {
        let mut provider = Provider::new();
        provider.expect_verify_callback_signature().returning(|_| true);
        provider
            .expect_decrypt_payment_result()
            .returning(|_| Err(ProviderError::DecryptionFailed("aead::Error".into())));
        callback_api(cfg, Store::new(), provider);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "FAIL");
}

#[actix_web::test]
async fn refund_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_json_request(callback("/notify/refundSuccess"), |cfg| {
        let mut provider = Provider::new();
        provider.expect_verify_callback_signature().returning(|_| true);
        provider.expect_decrypt_refund_result().times(1).returning(|_| {
            Ok(RefundResult {
                out_trade_no: "1729065600001".to_string(),
                out_refund_no: "1729065600001-refund".to_string(),
                refund_id: "50000000382019052709732678859".to_string(),
                refund_status: "SUCCESS".to_string(),
            })
        });
        let mut store = Store::new();
        store.expect_update_order().never();
        callback_api(cfg, store, provider);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "SUCCESS");
    assert_eq!(body["message"], "refund recorded");
}
