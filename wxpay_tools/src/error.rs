use thiserror::Error;

#[derive(Debug, Error)]
pub enum WxPayError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {code}: {message}")]
    QueryError { status: u16, code: String, message: String },
    #[error("The order has already been paid")]
    OrderPaid,
    #[error("Unknown platform certificate serial: {0}")]
    UnknownSerial(String),
    #[error("Callback timestamp is outside the accepted window: {0}")]
    StaleTimestamp(String),
    #[error("Signature mismatch")]
    InvalidSignature,
    #[error("Unsupported encryption algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}
