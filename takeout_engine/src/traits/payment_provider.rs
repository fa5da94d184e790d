use serde::{Deserialize, Serialize};
use takeout_common::Cents;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Malformed callback envelope: {0}")]
    MalformedEnvelope(String),
    #[error("The callback signature could not be verified: {0}")]
    InvalidSignature(String),
    #[error("Could not decrypt the callback resource: {0}")]
    DecryptionFailed(String),
    #[error("The order has already been paid")]
    OrderPaid,
    #[error("The payment provider rejected the request. Error {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("Could not reach the payment provider: {0}")]
    Network(String),
    #[error("Payment provider configuration error: {0}")]
    Configuration(String),
}

/// A request for the provider to open a payment for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub order_number: String,
    pub description: String,
    pub amount: Cents,
    /// The payer's identity at the provider
    pub payer_ref: String,
}

/// What the client needs to hand to the provider's payment sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSigningMaterial {
    pub time_stamp: String,
    pub nonce_str: String,
    pub package: String,
    pub sign_type: String,
    pub pay_sign: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub order_number: String,
    pub refund_number: String,
    pub refund: Cents,
    pub total: Cents,
}

/// The authentication headers that accompany a provider callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackHeaders {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
    pub serial: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedResource {
    pub algorithm: String,
    pub ciphertext: String,
    #[serde(default)]
    pub associated_data: String,
    pub nonce: String,
    #[serde(default)]
    pub original_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackNotification {
    pub id: String,
    pub event_type: String,
    #[serde(default)]
    pub resource_type: String,
    pub resource: EncryptedResource,
    #[serde(default)]
    pub summary: String,
}

/// A parsed, but not yet authenticated, provider callback. The raw body is kept because the signature covers the exact
/// bytes that were received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackEnvelope {
    pub headers: CallbackHeaders,
    pub body: String,
    pub notification: CallbackNotification,
}

impl CallbackEnvelope {
    pub fn parse(headers: CallbackHeaders, body: &str) -> Result<Self, ProviderError> {
        if headers.signature.is_empty() || headers.timestamp.is_empty() || headers.nonce.is_empty() {
            return Err(ProviderError::MalformedEnvelope("missing authentication headers".into()));
        }
        let notification = serde_json::from_str::<CallbackNotification>(body)
            .map_err(|e| ProviderError::MalformedEnvelope(e.to_string()))?;
        Ok(Self { headers, body: body.to_string(), notification })
    }
}

/// The decrypted result of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    /// Our order number, echoed back by the provider
    pub out_trade_no: String,
    #[serde(default)]
    pub transaction_id: String,
    pub trade_state: String,
    #[serde(default)]
    pub trade_state_desc: String,
}

impl PaymentResult {
    pub fn is_success(&self) -> bool {
        self.trade_state == "SUCCESS"
    }
}

/// The decrypted result of a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResult {
    pub out_trade_no: String,
    pub out_refund_no: String,
    #[serde(default)]
    pub refund_id: String,
    pub refund_status: String,
}

impl RefundResult {
    pub fn is_success(&self) -> bool {
        self.refund_status == "SUCCESS"
    }
}

/// The external payment gateway.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider: Clone {
    /// Opens a payment for the order and returns the material the client needs to complete it.
    async fn create_payment_intent(&self, intent: PaymentIntent) -> Result<PaymentSigningMaterial, ProviderError>;

    /// Checks the envelope's signature against the provider's current platform key.
    fn verify_callback_signature(&self, envelope: &CallbackEnvelope) -> bool;

    fn decrypt_payment_result(&self, envelope: &CallbackEnvelope) -> Result<PaymentResult, ProviderError>;

    fn decrypt_refund_result(&self, envelope: &CallbackEnvelope) -> Result<RefundResult, ProviderError>;

    async fn create_refund(&self, refund: RefundRequest) -> Result<(), ProviderError>;
}
