use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use takeout_engine::traits::OrderRepositoryError;

use super::{
    helpers::{cart_api, send_json_request, user_token},
    mocks::{cart_item, MockCartStore},
};
use crate::routes::{CartAddRoute, CartCleanRoute, CartListRoute, CartSubRoute, RepetitionRoute};

fn as_user(req: TestRequest) -> TestRequest {
    req.insert_header(("authentication", user_token(1)))
}

#[actix_web::test]
async fn add_to_cart() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/user/shoppingCart/add"))
        .set_json(json!({ "dishId": 1, "dishFlavor": "spicy" }));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = MockCartStore::new();
        store
            .expect_add_to_cart()
            .withf(|user_id, key| {
                *user_id == 1 &&
                    key.dish_id == Some(1) &&
                    key.setmeal_id.is_none() &&
                    key.dish_flavor.as_deref() == Some("spicy")
            })
            .times(1)
            .returning(|_, _| Ok(cart_item(1, 2)));
        cart_api(cfg, store);
        cfg.service(CartAddRoute::<MockCartStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1);
}

#[actix_web::test]
async fn add_needs_exactly_one_item() {
    let _ = env_logger::try_init().ok();
    for key in [json!({ "dishId": 1, "setmealId": 2 }), json!({ "dishFlavor": "spicy" })] {
        let req = as_user(TestRequest::post().uri("/user/shoppingCart/add")).set_json(key);
        let (status, body) = send_json_request(req, |cfg| {
            let mut store = MockCartStore::new();
            store.expect_add_to_cart().never();
            cart_api(cfg, store);
            cfg.service(CartAddRoute::<MockCartStore>::new());
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert_eq!(body["msg"], "a cart item must reference exactly one dish or setmeal");
    }
}

#[actix_web::test]
async fn sub_an_item_that_is_not_in_the_cart() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/user/shoppingCart/sub")).set_json(json!({ "setmealId": 4 }));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = MockCartStore::new();
        store
            .expect_subtract_from_cart()
            .returning(|_, key| Err(OrderRepositoryError::CartItemNotFound(key.to_string())));
        cart_api(cfg, store);
        cfg.service(CartSubRoute::<MockCartStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], -1);
    assert_eq!(body["msg"], "item not found in cart");
}

#[actix_web::test]
async fn sub_the_last_portion() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/user/shoppingCart/sub")).set_json(json!({ "dishId": 1 }));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = MockCartStore::new();
        store.expect_subtract_from_cart().times(1).returning(|_, _| Ok(None));
        cart_api(cfg, store);
        cfg.service(CartSubRoute::<MockCartStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1);
}

#[actix_web::test]
async fn list_cart() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/user/shoppingCart/list"));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = MockCartStore::new();
        store.expect_fetch_cart().withf(|user_id| *user_id == 1).returning(|_| Ok(vec![cart_item(1, 2)]));
        cart_api(cfg, store);
        cfg.service(CartListRoute::<MockCartStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Kung Pao Chicken");
    assert_eq!(body["data"][0]["amount"], 3800);
    assert_eq!(body["data"][0]["dishFlavor"], "spicy");
}

#[actix_web::test]
async fn clean_cart() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::delete().uri("/user/shoppingCart/clean"));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = MockCartStore::new();
        store.expect_clear_cart().times(1).returning(|_| Ok(3));
        cart_api(cfg, store);
        cfg.service(CartCleanRoute::<MockCartStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1);
}

#[actix_web::test]
async fn repeat_an_order() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/user/order/repetition/7"));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = MockCartStore::new();
        store
            .expect_reorder_into_cart()
            .withf(|user_id, order_id| *user_id == 1 && *order_id == 7)
            .times(1)
            .returning(|_, _| Ok(vec![cart_item(1, 1), cart_item(2, 3)]));
        cart_api(cfg, store);
        cfg.service(RepetitionRoute::<MockCartStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 1);
}

#[actix_web::test]
async fn repeat_an_unknown_order() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/user/order/repetition/9"));
    let (status, body) = send_json_request(req, |cfg| {
        let mut store = MockCartStore::new();
        store.expect_reorder_into_cart().returning(|_, order_id| Err(OrderRepositoryError::OrderNotFound(order_id)));
        cart_api(cfg, store);
        cfg.service(RepetitionRoute::<MockCartStore>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "order not found");
}
