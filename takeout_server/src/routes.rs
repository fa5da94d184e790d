//! Request handler definitions
//!
//! Define each route and its handler here. Handlers stay thin: pull the identity and parameters out of the request,
//! call the engine, and wrap the result in the response envelope.
//!
//! Customer routes live under `/user` and need a customer token; back-office routes live under `/admin` and need an
//! employee token. The `/notify` routes are called by the payment provider and authenticate the provider's signature
//! instead.
//!
//! Handlers must not block the worker thread. Everything that touches the database or the network is awaited.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use takeout_engine::{
    db_types::CartItemKey,
    order_objects::{CallbackAck, SubmitOrderRequest},
    traits::{CallbackHeaders, CartManagement, OrderManagement, PaymentProvider},
    CartApi,
    OrderFlowApi,
    PaymentCallbackApi,
};

use crate::{
    auth::{AdminClaims, UserClaims},
    data_objects::{
        ApiResponse,
        CallbackAckBody,
        CancelParams,
        ConditionSearchParams,
        HistoryParams,
        OrderIdParams,
        PaymentParams,
        RejectionParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
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

//----------------------------------------------   Customer orders  ----------------------------------------------------
route!(submit_order => Post "/user/order/submit" impl OrderManagement, PaymentProvider);
/// Turns the customer's cart into a new order, pending payment.
pub async fn submit_order<B: OrderManagement, P: PaymentProvider>(
    claims: UserClaims,
    body: web::Json<SubmitOrderRequest>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST submit order for user #{}", claims.user_id);
    let submitted = api.submit_order(claims.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(submitted)))
}

route!(request_payment => Put "/user/order/payment" impl OrderManagement, PaymentProvider);
/// Starts the payment of one of the customer's orders and returns what the client needs to complete it.
pub async fn request_payment<B: OrderManagement, P: PaymentProvider>(
    claims: UserClaims,
    body: web::Json<PaymentParams>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ PUT payment for order [{}] by user #{}", params.order_number, claims.user_id);
    let material = api.request_payment(claims.user_id, &params.order_number).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(material)))
}

route!(history_orders => Get "/user/order/historyOrders" impl OrderManagement, PaymentProvider);
pub async fn history_orders<B: OrderManagement, P: PaymentProvider>(
    claims: UserClaims,
    query: web::Query<HistoryParams>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET order history for user #{}", claims.user_id);
    let history = api.user_history(claims.user_id, query.pagination(), query.status).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(history)))
}

route!(order_detail => Get "/user/order/orderDetail/{id}" impl OrderManagement, PaymentProvider);
pub async fn order_detail<B: OrderManagement, P: PaymentProvider>(
    claims: UserClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET order #{id} for user #{}", claims.user_id);
    let order = api.user_order_detail(claims.user_id, id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(order)))
}

route!(user_cancel => Put "/user/order/cancel/{id}" impl OrderManagement, PaymentProvider);
pub async fn user_cancel<B: OrderManagement, P: PaymentProvider>(
    claims: UserClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PUT cancel order #{id} for user #{}", claims.user_id);
    api.user_cancel(claims.user_id, id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

route!(repetition => Post "/user/order/repetition/{id}" impl CartManagement);
/// Puts the contents of an earlier order back into the customer's cart.
pub async fn repetition<B: CartManagement>(
    claims: UserClaims,
    path: web::Path<i64>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ POST repeat order #{id} for user #{}", claims.user_id);
    api.reorder(claims.user_id, id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

route!(reminder => Get "/user/order/reminder/{id}" impl OrderManagement, PaymentProvider);
pub async fn reminder<B: OrderManagement, P: PaymentProvider>(
    claims: UserClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET reminder for order #{id} from user #{}", claims.user_id);
    api.remind(claims.user_id, id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

//----------------------------------------------   Shopping cart  ----------------------------------------------------
route!(cart_add => Post "/user/shoppingCart/add" impl CartManagement);
pub async fn cart_add<B: CartManagement>(
    claims: UserClaims,
    body: web::Json<CartItemKey>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let key = body.into_inner();
    debug!("💻️ POST add {key} to the cart of user #{}", claims.user_id);
    api.add(claims.user_id, &key).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

route!(cart_sub => Post "/user/shoppingCart/sub" impl CartManagement);
pub async fn cart_sub<B: CartManagement>(
    claims: UserClaims,
    body: web::Json<CartItemKey>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let key = body.into_inner();
    debug!("💻️ POST remove one {key} from the cart of user #{}", claims.user_id);
    api.sub(claims.user_id, &key).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

route!(cart_list => Get "/user/shoppingCart/list" impl CartManagement);
pub async fn cart_list<B: CartManagement>(
    claims: UserClaims,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET cart for user #{}", claims.user_id);
    let items = api.list(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(items)))
}

route!(cart_clean => Delete "/user/shoppingCart/clean" impl CartManagement);
pub async fn cart_clean<B: CartManagement>(
    claims: UserClaims,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ DELETE cart for user #{}", claims.user_id);
    api.clean(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

//----------------------------------------------   Back office  ----------------------------------------------------
route!(condition_search => Get "/admin/order/conditionSearch" impl OrderManagement, PaymentProvider);
pub async fn condition_search<B: OrderManagement, P: PaymentProvider>(
    claims: AdminClaims,
    query: web::Query<ConditionSearchParams>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let filter = query.filter();
    debug!("💻️ GET order search by employee #{}. {filter}", claims.emp_id);
    let page = api.search_orders(filter, query.pagination()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

route!(statistics => Get "/admin/order/statistics" impl OrderManagement, PaymentProvider);
pub async fn statistics<B: OrderManagement, P: PaymentProvider>(
    claims: AdminClaims,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET order statistics for employee #{}", claims.emp_id);
    let stats = api.statistics().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}

route!(admin_order_detail => Get "/admin/order/details/{id}" impl OrderManagement, PaymentProvider);
pub async fn admin_order_detail<B: OrderManagement, P: PaymentProvider>(
    claims: AdminClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET order #{id} for employee #{}", claims.emp_id);
    let order = api.order_detail(id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(order)))
}

route!(confirm => Put "/admin/order/confirm" impl OrderManagement, PaymentProvider);
pub async fn confirm<B: OrderManagement, P: PaymentProvider>(
    claims: AdminClaims,
    body: web::Json<OrderIdParams>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ PUT confirm order #{} by employee #{}", body.id, claims.emp_id);
    api.confirm(body.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

route!(rejection => Put "/admin/order/rejection" impl OrderManagement, PaymentProvider);
pub async fn rejection<B: OrderManagement, P: PaymentProvider>(
    claims: AdminClaims,
    body: web::Json<RejectionParams>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ PUT reject order #{} by employee #{}", body.id, claims.emp_id);
    api.reject(body.id, &body.rejection_reason).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

route!(admin_cancel => Put "/admin/order/cancel" impl OrderManagement, PaymentProvider);
pub async fn admin_cancel<B: OrderManagement, P: PaymentProvider>(
    claims: AdminClaims,
    body: web::Json<CancelParams>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ PUT cancel order #{} by employee #{}", body.id, claims.emp_id);
    api.admin_cancel(body.id, &body.cancel_reason).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

route!(delivery => Put "/admin/order/delivery/{id}" impl OrderManagement, PaymentProvider);
pub async fn delivery<B: OrderManagement, P: PaymentProvider>(
    claims: AdminClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PUT deliver order #{id} by employee #{}", claims.emp_id);
    api.deliver(id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

route!(complete => Put "/admin/order/complete/{id}" impl OrderManagement, PaymentProvider);
pub async fn complete<B: OrderManagement, P: PaymentProvider>(
    claims: AdminClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PUT complete order #{id} by employee #{}", claims.emp_id);
    api.complete(id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok()))
}

//----------------------------------------------   Provider callbacks  ----------------------------------------------
route!(pay_success_callback => Post "/notify/paySuccess" impl OrderManagement, PaymentProvider);
/// The payment provider's payment notification.
///
/// The response tells the provider whether to retry: 200 stops the retries, anything else asks for the notification
/// again. See [`CallbackAck`].
pub async fn pay_success_callback<B: OrderManagement, P: PaymentProvider>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<PaymentCallbackApi<B, P>>,
) -> HttpResponse {
    trace!("💻️ Received payment callback");
    let ack = match String::from_utf8(body.to_vec()) {
        Ok(body) => api.handle_payment_callback(callback_headers(&req), &body).await,
        Err(e) => CallbackAck::Rejected(format!("callback body is not UTF-8. {e}")),
    };
    callback_response(ack)
}

route!(refund_callback => Post "/notify/refundSuccess" impl OrderManagement, PaymentProvider);
pub async fn refund_callback<B: OrderManagement, P: PaymentProvider>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<PaymentCallbackApi<B, P>>,
) -> HttpResponse {
    trace!("💻️ Received refund callback");
    let ack = match String::from_utf8(body.to_vec()) {
        Ok(body) => api.handle_refund_callback(callback_headers(&req), &body).await,
        Err(e) => CallbackAck::Rejected(format!("callback body is not UTF-8. {e}")),
    };
    callback_response(ack)
}

pub fn callback_headers(req: &HttpRequest) -> CallbackHeaders {
    let header = |name: &str| {
        req.headers().get(name).and_then(|v| v.to_str().ok()).map(|s| s.trim().to_string()).unwrap_or_default()
    };
    CallbackHeaders {
        timestamp: header("Wechatpay-Timestamp"),
        nonce: header("Wechatpay-Nonce"),
        signature: header("Wechatpay-Signature"),
        serial: header("Wechatpay-Serial"),
    }
}

fn callback_response(ack: CallbackAck) -> HttpResponse {
    let body = CallbackAckBody::from(&ack);
    match ack {
        CallbackAck::Accepted(_) => HttpResponse::Ok().json(body),
        CallbackAck::Rejected(reason) => {
            info!("💻️ Callback rejected. {reason}");
            HttpResponse::BadRequest().json(body)
        },
        CallbackAck::Retry(reason) => {
            warn!("💻️ Callback could not be processed. The provider will retry. {reason}");
            HttpResponse::InternalServerError().json(body)
        },
    }
}
