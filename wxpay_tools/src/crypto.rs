//! Decryption of callback resources. The platform encrypts them with AEAD_AES_256_GCM under the merchant's API v3 key.
//! The ciphertext is base64 with the 16-byte tag appended, and the nonce is 12 ASCII characters.
use aes_gcm::{
    aead::{consts::U12, Aead, KeyInit, Payload},
    Aes256Gcm,
    Nonce,
};

use crate::WxPayError;

pub const AEAD_AES_256_GCM: &str = "AEAD_AES_256_GCM";
const NONCE_LEN: usize = 12;

fn cipher(key: &str) -> Result<Aes256Gcm, WxPayError> {
    Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| WxPayError::DecryptionFailed(format!("the API v3 key must be 32 bytes, not {}", key.len())))
}

fn nonce(nonce: &str) -> Result<&Nonce<U12>, WxPayError> {
    if nonce.len() != NONCE_LEN {
        return Err(WxPayError::DecryptionFailed(format!("nonce must be {NONCE_LEN} bytes, not {}", nonce.len())));
    }
    Ok(Nonce::from_slice(nonce.as_bytes()))
}

/// Decrypts a callback resource into its plaintext JSON.
pub fn decrypt_resource(
    key: &str,
    algorithm: &str,
    ciphertext: &str,
    associated_data: &str,
    nonce_str: &str,
) -> Result<String, WxPayError> {
    if algorithm != AEAD_AES_256_GCM {
        return Err(WxPayError::UnsupportedAlgorithm(algorithm.to_string()));
    }
    let data = base64::decode(ciphertext).map_err(|e| WxPayError::DecryptionFailed(e.to_string()))?;
    let payload = Payload { msg: &data, aad: associated_data.as_bytes() };
    let plaintext = cipher(key)?
        .decrypt(nonce(nonce_str)?, payload)
        .map_err(|_| WxPayError::DecryptionFailed("authentication tag mismatch".to_string()))?;
    String::from_utf8(plaintext).map_err(|e| WxPayError::DecryptionFailed(e.to_string()))
}

/// The inverse of [`decrypt_resource`]. The platform does this on its side; we only need it to build test callbacks.
pub fn encrypt_resource(
    key: &str,
    plaintext: &str,
    associated_data: &str,
    nonce_str: &str,
) -> Result<String, WxPayError> {
    let payload = Payload { msg: plaintext.as_bytes(), aad: associated_data.as_bytes() };
    let data = cipher(key)?
        .encrypt(nonce(nonce_str)?, payload)
        .map_err(|_| WxPayError::DecryptionFailed("encryption failed".to_string()))?;
    Ok(base64::encode(data))
}
