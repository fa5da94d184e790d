//! HMAC-SHA256 signatures, base64 encoded.
//!
//! Callbacks from the platform are signed over `"<timestamp>\n<nonce>\n<body>\n"` with the platform key identified by
//! the `Wechatpay-Serial` header.
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// How far a callback's timestamp may be from our clock, in either direction.
pub const CALLBACK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

pub fn callback_message(timestamp: &str, nonce: &str, body: &str) -> String {
    format!("{timestamp}\n{nonce}\n{body}\n")
}

pub fn sign_message(key: &str, message: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(message.as_bytes());
    base64::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of `signature` against the signature of `message` under `key`.
pub fn verify_message(key: &str, message: &str, signature: &str) -> bool {
    let Ok(expected) = base64::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key.as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
