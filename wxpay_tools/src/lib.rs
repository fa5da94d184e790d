mod api;
mod config;
mod crypto;
mod error;
mod signature;

mod data_objects;

pub use api::WxPayApi;
pub use config::{parse_platform_keys, WxPayConfig};
pub use crypto::{decrypt_resource, encrypt_resource, AEAD_AES_256_GCM};
pub use data_objects::{
    Amount,
    ErrorResponse,
    JsapiSigningMaterial,
    Payer,
    PrepayRequest,
    PrepayResponse,
    RefundAmount,
    RefundRequestBody,
    RefundResponse,
};
pub use error::WxPayError;
pub use signature::{callback_message, sign_message, verify_message, CALLBACK_TIMESTAMP_TOLERANCE_SECS};
