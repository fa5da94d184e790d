//! Adapts the [`WxPayApi`] client to the engine's [`PaymentProvider`] seam.
use chrono::Utc;
use log::*;
use takeout_engine::traits::{
    CallbackEnvelope,
    PaymentIntent,
    PaymentProvider,
    PaymentResult,
    PaymentSigningMaterial,
    ProviderError,
    RefundRequest,
    RefundResult,
};
use wxpay_tools::{JsapiSigningMaterial, WxPayApi, WxPayConfig, WxPayError};

#[derive(Clone)]
pub struct WxPayProvider {
    api: WxPayApi,
}

impl WxPayProvider {
    pub fn new(config: WxPayConfig) -> Result<Self, ProviderError> {
        let api = WxPayApi::new(config).map_err(provider_error)?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &WxPayApi {
        &self.api
    }

    fn decrypt(&self, envelope: &CallbackEnvelope) -> Result<String, ProviderError> {
        let resource = &envelope.notification.resource;
        self.api
            .decrypt(&resource.algorithm, &resource.ciphertext, &resource.associated_data, &resource.nonce)
            .map_err(provider_error)
    }
}

/// `WxPayError` and `ProviderError` both live outside this crate, so this is a function rather than a `From` impl.
pub fn provider_error(e: WxPayError) -> ProviderError {
    match e {
        WxPayError::OrderPaid => ProviderError::OrderPaid,
        WxPayError::QueryError { status, code, message } => {
            ProviderError::Rejected { status, message: format!("{code}: {message}") }
        },
        WxPayError::RestResponseError(s) | WxPayError::JsonError(s) => ProviderError::Network(s),
        WxPayError::Initialization(s) => ProviderError::Configuration(s),
        e @ (WxPayError::UnknownSerial(_) | WxPayError::StaleTimestamp(_) | WxPayError::InvalidSignature) => {
            ProviderError::InvalidSignature(e.to_string())
        },
        e @ (WxPayError::UnsupportedAlgorithm(_) | WxPayError::DecryptionFailed(_)) => {
            ProviderError::DecryptionFailed(e.to_string())
        },
    }
}

fn signing_material(m: JsapiSigningMaterial) -> PaymentSigningMaterial {
    PaymentSigningMaterial {
        time_stamp: m.time_stamp,
        nonce_str: m.nonce_str,
        package: m.package,
        sign_type: m.sign_type,
        pay_sign: m.pay_sign,
    }
}

impl PaymentProvider for WxPayProvider {
    async fn create_payment_intent(&self, intent: PaymentIntent) -> Result<PaymentSigningMaterial, ProviderError> {
        let prepay = self
            .api
            .jsapi_prepay(&intent.order_number, &intent.description, intent.amount.value(), &intent.payer_ref)
            .await
            .map_err(provider_error)?;
        Ok(signing_material(self.api.signing_material(&prepay.prepay_id)))
    }

    fn verify_callback_signature(&self, envelope: &CallbackEnvelope) -> bool {
        let headers = &envelope.headers;
        let now = Utc::now().timestamp();
        match self.api.verify_callback(
            &headers.timestamp,
            &headers.nonce,
            &envelope.body,
            &headers.signature,
            &headers.serial,
            now,
        ) {
            Ok(()) => true,
            Err(e) => {
                warn!("💳️ Callback {} failed verification. {e}", envelope.notification.id);
                false
            },
        }
    }

    fn decrypt_payment_result(&self, envelope: &CallbackEnvelope) -> Result<PaymentResult, ProviderError> {
        let plaintext = self.decrypt(envelope)?;
        serde_json::from_str::<PaymentResult>(&plaintext).map_err(|e| ProviderError::DecryptionFailed(e.to_string()))
    }

    fn decrypt_refund_result(&self, envelope: &CallbackEnvelope) -> Result<RefundResult, ProviderError> {
        let plaintext = self.decrypt(envelope)?;
        serde_json::from_str::<RefundResult>(&plaintext).map_err(|e| ProviderError::DecryptionFailed(e.to_string()))
    }

    async fn create_refund(&self, refund: RefundRequest) -> Result<(), ProviderError> {
        let response = self
            .api
            .refund(&refund.order_number, &refund.refund_number, refund.refund.value(), refund.total.value())
            .await
            .map_err(provider_error)?;
        debug!("💳️ Refund {} for order [{}] is {}", response.out_refund_no, refund.order_number, response.status);
        Ok(())
    }
}
