use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use takeout_engine::{
    db_types::{OrderStatus, PayStatus},
    traits::{OrderRepositoryError, ProviderError},
};

use super::{
    helpers::{admin_token, orders_api, send_json_request, user_token},
    mocks::{order, updated, MockOrderStore, MockProvider},
};
use crate::routes::{
    AdminCancelRoute,
    CompleteRoute,
    ConditionSearchRoute,
    ConfirmRoute,
    HistoryOrdersRoute,
    OrderDetailRoute,
    RejectionRoute,
    ReminderRoute,
    RequestPaymentRoute,
    SubmitOrderRoute,
    UserCancelRoute,
};

type Store = MockOrderStore;
type Provider = MockProvider;

fn submit_body() -> serde_json::Value {
    json!({
        "addressBookId": 1,
        "payMethod": 1,
        "remark": "no coriander",
        "packAmount": 100,
        "amount": 7900,
        "tablewareNumber": 0,
        "tablewareStatus": true
    })
}

fn as_user(req: TestRequest) -> TestRequest {
    req.insert_header(("authentication", user_token(1)))
}

fn as_employee(req: TestRequest) -> TestRequest {
    req.insert_header(("token", admin_token(1)))
}

//----------------------------------------------   Submission  ----------------------------------------------------
#[actix_web::test]
async fn submit_order() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/user/order/submit")).set_json(submit_body());
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store
            .expect_create_order_from_cart()
            .withf(|draft| draft.user_id == 1 && draft.address_book_id == 1 && draft.remark == "no coriander")
            .times(1)
            .returning(|_| Ok((order(1, OrderStatus::PendingPayment, PayStatus::Unpaid), vec![])));
        orders_api(cfg, store, Provider::new());
        cfg.service(SubmitOrderRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1);
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["orderNumber"], "1729065600001");
    assert_eq!(body["data"]["orderAmount"], 7900);
}

#[actix_web::test]
async fn submit_with_empty_cart() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/user/order/submit")).set_json(submit_body());
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store.expect_create_order_from_cart().returning(|_| Err(OrderRepositoryError::CartEmpty));
        orders_api(cfg, store, Provider::new());
        cfg.service(SubmitOrderRoute::<Store, Provider>::new());
    })
    .await;
    // Business failures are reported in the envelope, not in the status
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], -1);
    assert_eq!(body["msg"], "shopping cart is empty");
    assert!(body["data"].is_null());
}

#[actix_web::test]
async fn submit_with_unknown_address() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/user/order/submit")).set_json(submit_body());
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store.expect_create_order_from_cart().returning(|_| Err(OrderRepositoryError::AddressNotFound(1)));
        orders_api(cfg, store, Provider::new());
        cfg.service(SubmitOrderRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "address book is empty");
}

#[actix_web::test]
async fn database_errors_are_not_leaked() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/user/order/submit")).set_json(submit_body());
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store
            .expect_create_order_from_cart()
            .returning(|_| Err(OrderRepositoryError::DatabaseError("disk I/O error in /var/lib/takeout.db".into())));
        orders_api(cfg, store, Provider::new());
        cfg.service(SubmitOrderRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 900);
    assert_eq!(body["msg"], "database error");
}

#[actix_web::test]
async fn malformed_body() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/user/order/submit")).set_json(json!({ "remark": "no amount" }));
    let (status, body) = send_json_request(req, |cfg| {
        orders_api(cfg, Store::new(), Provider::new());
        cfg.service(SubmitOrderRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

//----------------------------------------------   Payment  ----------------------------------------------------
#[actix_web::test]
async fn bypassed_payment_marks_order_as_paid() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::put().uri("/user/order/payment"))
        .set_json(json!({ "orderNumber": "1729065600001", "payMethod": 1 }));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store
            .expect_fetch_order_by_number()
            .withf(|number| number.to_string() == "1729065600001")
            .times(2)
            .returning(|_| Ok(Some(order(1, OrderStatus::PendingPayment, PayStatus::Unpaid))));
        store
            .expect_update_order()
            .withf(|id, version, update| {
                *id == 1 &&
                    *version == 0 &&
                    update.status == Some(OrderStatus::ToBeConfirmed) &&
                    update.pay_status == Some(PayStatus::Paid) &&
                    update.checkout_time.is_some()
            })
            .times(1)
            .returning(|_, _, update| {
                Ok(Some(updated(order(1, OrderStatus::PendingPayment, PayStatus::Unpaid), update)))
            });
        orders_api(cfg, store, Provider::new());
        cfg.service(RequestPaymentRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1);
    assert_eq!(body["data"]["package"], "prepay_id=bypass-1729065600001");
}

#[actix_web::test]
async fn pay_for_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::put()
        .uri("/user/order/payment")
        .insert_header(("authentication", user_token(2)))
        .set_json(json!({ "orderNumber": "1729065600001" }));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store
            .expect_fetch_order_by_number()
            .returning(|_| Ok(Some(order(1, OrderStatus::PendingPayment, PayStatus::Unpaid))));
        store.expect_update_order().never();
        orders_api(cfg, store, Provider::new());
        cfg.service(RequestPaymentRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], -1);
    assert_eq!(body["msg"], "order not found");
}

#[actix_web::test]
async fn pay_twice() {
    let _ = env_logger::try_init().ok();
    let req =
        as_user(TestRequest::put().uri("/user/order/payment")).set_json(json!({ "orderNumber": "1729065600001" }));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store
            .expect_fetch_order_by_number()
            .returning(|_| Ok(Some(order(1, OrderStatus::ToBeConfirmed, PayStatus::Paid))));
        store.expect_update_order().never();
        orders_api(cfg, store, Provider::new());
        cfg.service(RequestPaymentRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "order has been paid");
}

//----------------------------------------------   Customer queries  ---------------------------------------------
#[actix_web::test]
async fn history_orders() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/user/order/historyOrders?page=1&pageSize=5&status=5"));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store
            .expect_search_orders()
            .withf(|query, page| {
                query.user_id == Some(1) &&
                    query.status == Some(vec![OrderStatus::Completed]) &&
                    page.page() == 1 &&
                    page.limit() == 5
            })
            .returning(|_, _| Ok((1, vec![order(1, OrderStatus::Completed, PayStatus::Paid)])));
        store.expect_fetch_order_lines().returning(|_| Ok(vec![]));
        orders_api(cfg, store, Provider::new());
        cfg.service(HistoryOrdersRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["records"][0]["number"], "1729065600001");
    assert_eq!(body["data"]["records"][0]["status"], 5);
    assert_eq!(body["data"]["records"][0]["orderDetailList"], json!([]));
}

#[actix_web::test]
async fn order_detail_of_another_user() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/user/order/orderDetail/1").insert_header(("authentication", user_token(2)));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store.expect_fetch_order().returning(|id| Ok(Some(order(id, OrderStatus::Confirmed, PayStatus::Paid))));
        store.expect_fetch_order_lines().never();
        orders_api(cfg, store, Provider::new());
        cfg.service(OrderDetailRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "order not found");
}

#[actix_web::test]
async fn order_id_must_be_numeric() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/user/order/orderDetail/abc"));
    let (status, body) = send_json_request(req, |cfg| {
        orders_api(cfg, Store::new(), Provider::new());
        cfg.service(OrderDetailRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[actix_web::test]
async fn cancel_after_acceptance() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::put().uri("/user/order/cancel/1"));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store.expect_fetch_order().returning(|id| Ok(Some(order(id, OrderStatus::Confirmed, PayStatus::Paid))));
        store.expect_update_order().never();
        let mut provider = Provider::new();
        provider.expect_create_refund().never();
        orders_api(cfg, store, provider);
        cfg.service(UserCancelRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], -1);
    assert_eq!(body["msg"], "order status error");
}

#[actix_web::test]
async fn cancel_a_paid_order() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::put().uri("/user/order/cancel/1"));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store.expect_fetch_order().returning(|id| Ok(Some(order(id, OrderStatus::ToBeConfirmed, PayStatus::Paid))));
        store
            .expect_update_order()
            .withf(|_, _, update| {
                update.status == Some(OrderStatus::Cancelled) &&
                    update.pay_status == Some(PayStatus::Refunded) &&
                    update.cancel_reason.as_deref() == Some("user cancelled")
            })
            .times(1)
            .returning(|_, _, update| Ok(Some(updated(order(1, OrderStatus::ToBeConfirmed, PayStatus::Paid), update))));
        let mut provider = Provider::new();
        provider
            .expect_create_refund()
            .withf(|refund| refund.order_number == "1729065600001" && refund.refund.value() == 7900)
            .times(1)
            .returning(|_| Ok(()));
        orders_api(cfg, store, provider);
        cfg.service(UserCancelRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1);
}

#[actix_web::test]
async fn reminder() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/user/order/reminder/1"));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store
            .expect_fetch_order()
            .returning(|id| Ok(Some(order(id, OrderStatus::ToBeConfirmed, PayStatus::Paid))));
        store.expect_update_order().never();
        orders_api(cfg, store, Provider::new());
        cfg.service(ReminderRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1);
}

//----------------------------------------------   Back office  ----------------------------------------------------
#[actix_web::test]
async fn condition_search() {
    let _ = env_logger::try_init().ok();
    let uri = "/admin/order/conditionSearch?phone=138&number=&status=2&pageSize=20";
    let req = as_employee(TestRequest::get().uri(uri));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store
            .expect_search_orders()
            .withf(|query, page| {
                query.phone.as_deref() == Some("138") &&
                    query.number.is_none() &&
                    query.user_id.is_none() &&
                    query.status == Some(vec![OrderStatus::ToBeConfirmed]) &&
                    page.limit() == 20
            })
            .returning(|_, _| Ok((1, vec![order(1, OrderStatus::ToBeConfirmed, PayStatus::Paid)])));
        store.expect_fetch_order_lines().returning(|_| Ok(vec![]));
        orders_api(cfg, store, Provider::new());
        cfg.service(ConditionSearchRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["records"][0]["orderDishes"], "");
    assert_eq!(body["data"]["records"][0]["consignee"], "Alice");
}

#[actix_web::test]
async fn confirm() {
    let _ = env_logger::try_init().ok();
    let req = as_employee(TestRequest::put().uri("/admin/order/confirm")).set_json(json!({ "id": 1 }));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store.expect_fetch_order().returning(|id| Ok(Some(order(id, OrderStatus::ToBeConfirmed, PayStatus::Paid))));
        store
            .expect_update_order()
            .withf(|_, _, update| update.status == Some(OrderStatus::Confirmed))
            .times(1)
            .returning(|_, _, update| Ok(Some(updated(order(1, OrderStatus::ToBeConfirmed, PayStatus::Paid), update))));
        orders_api(cfg, store, Provider::new());
        cfg.service(ConfirmRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1);
}

#[actix_web::test]
async fn confirm_loses_a_race() {
    let _ = env_logger::try_init().ok();
    let req = as_employee(TestRequest::put().uri("/admin/order/confirm")).set_json(json!({ "id": 1 }));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store.expect_fetch_order().returning(|id| Ok(Some(order(id, OrderStatus::ToBeConfirmed, PayStatus::Paid))));
        store.expect_update_order().returning(|_, _, _| Ok(None));
        orders_api(cfg, store, Provider::new());
        cfg.service(ConfirmRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], -1);
    assert_eq!(body["msg"], "order was modified concurrently, please retry");
}

#[actix_web::test]
async fn rejection_fails_when_the_refund_fails() {
    let _ = env_logger::try_init().ok();
    let req = as_employee(TestRequest::put().uri("/admin/order/rejection"))
        .set_json(json!({ "id": 1, "rejectionReason": "out of stock" }));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store.expect_fetch_order().returning(|id| Ok(Some(order(id, OrderStatus::ToBeConfirmed, PayStatus::Paid))));
        store.expect_update_order().never();
        let mut provider = Provider::new();
        provider.expect_create_refund().returning(|_| Err(ProviderError::Network("connection reset".into())));
        orders_api(cfg, store, provider);
        cfg.service(RejectionRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], 50);
    assert_eq!(body["msg"], "payment service unavailable");
}

#[actix_web::test]
async fn admin_cancel_an_unpaid_order() {
    let _ = env_logger::try_init().ok();
    let req = as_employee(TestRequest::put().uri("/admin/order/cancel"))
        .set_json(json!({ "id": 1, "cancelReason": "shop closed" }));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store
            .expect_fetch_order()
            .returning(|id| Ok(Some(order(id, OrderStatus::PendingPayment, PayStatus::Unpaid))));
        store
            .expect_update_order()
            .withf(|_, _, update| {
                update.status == Some(OrderStatus::Cancelled) &&
                    update.pay_status.is_none() &&
                    update.cancel_reason.as_deref() == Some("shop closed") &&
                    update.cancel_time.is_some()
            })
            .times(1)
            .returning(|_, _, update| {
                Ok(Some(updated(order(1, OrderStatus::PendingPayment, PayStatus::Unpaid), update)))
            });
        let mut provider = Provider::new();
        provider.expect_create_refund().never();
        orders_api(cfg, store, provider);
        cfg.service(AdminCancelRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1);
}

#[actix_web::test]
async fn complete_before_delivery() {
    let _ = env_logger::try_init().ok();
    let req = as_employee(TestRequest::put().uri("/admin/order/complete/1"));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = Store::new();
        store.expect_fetch_order().returning(|id| Ok(Some(order(id, OrderStatus::Confirmed, PayStatus::Paid))));
        store.expect_update_order().never();
        orders_api(cfg, store, Provider::new());
        cfg.service(CompleteRoute::<Store, Provider>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "order status error");
}
