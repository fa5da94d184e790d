use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::*;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use takeout_common::CURRENCY_CODE;

use crate::{
    config::WxPayConfig,
    crypto::decrypt_resource,
    data_objects::{
        Amount,
        ErrorResponse,
        JsapiSigningMaterial,
        Payer,
        PrepayRequest,
        PrepayResponse,
        RefundAmount,
        RefundRequestBody,
        RefundResponse,
    },
    signature::{callback_message, sign_message, verify_message, CALLBACK_TIMESTAMP_TOLERANCE_SECS},
    WxPayError,
};

const AUTH_SCHEME: &str = "WECHATPAY2-HMAC-SHA256";
const SIGN_TYPE: &str = "HMAC-SHA256";

#[derive(Clone)]
pub struct WxPayApi {
    config: WxPayConfig,
    client: Arc<Client>,
}

fn random_nonce() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
}

impl WxPayApi {
    pub fn new(config: WxPayConfig) -> Result<Self, WxPayError> {
        if config.api_v3_key.len() != 32 {
            return Err(WxPayError::Initialization(format!(
                "The API v3 key must be 32 bytes long, but it is {} bytes",
                config.api_v3_key.len()
            )));
        }
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WxPayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &WxPayConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorization(&self, method: &Method, path: &str, body: &str) -> String {
        let timestamp = Utc::now().timestamp().to_string();
        let nonce = random_nonce();
        let message = format!("{method}\n{path}\n{timestamp}\n{nonce}\n{body}\n");
        let signature = sign_message(self.config.mch_secret.reveal(), &message);
        format!(
            r#"{AUTH_SCHEME} mchid="{}",nonce_str="{nonce}",timestamp="{timestamp}",signature="{signature}""#,
            self.config.mch_id
        )
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, WxPayError> {
        let body = body
            .map(|b| serde_json::to_string(&b))
            .transpose()
            .map_err(|e| WxPayError::JsonError(e.to_string()))?
            .unwrap_or_default();
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let authorization = self.authorization(&method, path, &body);
        let mut req = self.client.request(method, url).header(AUTHORIZATION, authorization);
        if !body.is_empty() {
            req = req.body(body);
        }
        let response = req.send().await.map_err(|e| WxPayError::RestResponseError(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            trace!("💳️ REST query successful. {status}");
            return response.json::<T>().await.map_err(|e| WxPayError::JsonError(e.to_string()));
        }
        let text = response.text().await.map_err(|e| WxPayError::RestResponseError(e.to_string()))?;
        let error = serde_json::from_str::<ErrorResponse>(&text)
            .unwrap_or_else(|_| ErrorResponse { code: "UNKNOWN".to_string(), message: text });
        debug!("💳️ REST query failed. {status}. {}: {}", error.code, error.message);
        if error.code == "ORDERPAID" {
            return Err(WxPayError::OrderPaid);
        }
        Err(WxPayError::QueryError { status: status.as_u16(), code: error.code, message: error.message })
    }

    /// Opens a JSAPI payment and returns the provider's prepay id.
    pub async fn jsapi_prepay(
        &self,
        out_trade_no: &str,
        description: &str,
        total: i64,
        openid: &str,
    ) -> Result<PrepayResponse, WxPayError> {
        let body = PrepayRequest {
            appid: self.config.app_id.clone(),
            mchid: self.config.mch_id.clone(),
            description: description.to_string(),
            out_trade_no: out_trade_no.to_string(),
            notify_url: self.config.notify_url.clone(),
            amount: Amount::new(total),
            payer: Payer { openid: openid.to_string() },
        };
        debug!("💳️ Requesting prepay for order [{out_trade_no}]");
        let response =
            self.rest_query::<PrepayResponse, _>(Method::POST, "/v3/pay/transactions/jsapi", Some(body)).await?;
        info!("💳️ Prepay {} issued for order [{out_trade_no}]", response.prepay_id);
        Ok(response)
    }

    /// The material the client hands to the payment sheet for `prepay_id`, signed with the merchant secret.
    pub fn signing_material(&self, prepay_id: &str) -> JsapiSigningMaterial {
        let time_stamp = Utc::now().timestamp().to_string();
        let nonce_str = random_nonce();
        let package = format!("prepay_id={prepay_id}");
        let message = format!("{}\n{time_stamp}\n{nonce_str}\n{package}\n", self.config.app_id);
        let pay_sign = sign_message(self.config.mch_secret.reveal(), &message);
        JsapiSigningMaterial { time_stamp, nonce_str, package, sign_type: SIGN_TYPE.to_string(), pay_sign }
    }

    pub async fn refund(
        &self,
        out_trade_no: &str,
        out_refund_no: &str,
        refund: i64,
        total: i64,
    ) -> Result<RefundResponse, WxPayError> {
        let body = RefundRequestBody {
            out_trade_no: out_trade_no.to_string(),
            out_refund_no: out_refund_no.to_string(),
            notify_url: self.config.refund_notify_url.clone(),
            amount: RefundAmount { refund, total, currency: CURRENCY_CODE.to_string() },
        };
        debug!("💳️ Requesting refund {out_refund_no} for order [{out_trade_no}]");
        let response =
            self.rest_query::<RefundResponse, _>(Method::POST, "/v3/refund/domestic/refunds", Some(body)).await?;
        info!("💳️ Refund {out_refund_no} accepted. Status: {}", response.status);
        Ok(response)
    }

    /// Checks a callback against the platform key registered under `serial`, and checks that its timestamp is within
    /// [`CALLBACK_TIMESTAMP_TOLERANCE_SECS`] of `now` (unix seconds).
    pub fn verify_callback(
        &self,
        timestamp: &str,
        nonce: &str,
        body: &str,
        signature: &str,
        serial: &str,
        now: i64,
    ) -> Result<(), WxPayError> {
        let key = self.config.platform_keys.get(serial).ok_or_else(|| WxPayError::UnknownSerial(serial.to_string()))?;
        let sent_at = timestamp.trim().parse::<i64>().map_err(|_| WxPayError::StaleTimestamp(timestamp.to_string()))?;
        if (now - sent_at).abs() > CALLBACK_TIMESTAMP_TOLERANCE_SECS {
            return Err(WxPayError::StaleTimestamp(timestamp.to_string()));
        }
        let message = callback_message(timestamp, nonce, body);
        if verify_message(key.reveal(), &message, signature) {
            Ok(())
        } else {
            Err(WxPayError::InvalidSignature)
        }
    }

    pub fn decrypt(
        &self,
        algorithm: &str,
        ciphertext: &str,
        associated_data: &str,
        nonce: &str,
    ) -> Result<String, WxPayError> {
        decrypt_resource(self.config.api_v3_key.reveal(), algorithm, ciphertext, associated_data, nonce)
    }
}
