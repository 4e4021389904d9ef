//! Error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned while building or decoding platform messages
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("XML error: {0}")]
    Serialization(#[from] serde_xml_rs::Error),
    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),
    #[error("failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("invalid timestamp: `{0}`")]
    InvalidTimestamp(String),
    #[error("app id mismatch: expected `{expected}`, got `{actual}`")]
    AppIdMismatch { expected: String, actual: String },
}

/// Failures of the AES message scheme
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("EncodingAESKey must be 43 characters, got {0}")]
    InvalidKeyLength(usize),
    #[error("decoded key must be 32 bytes, got {0}")]
    InvalidDecodedKeyLength(usize),
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    InvalidCiphertextLength(usize),
    #[error("invalid padding value {0}")]
    InvalidPadding(u8),
    #[error("message length {declared} exceeds the {available} available bytes")]
    InvalidMessageLength { declared: usize, available: usize },
    #[error("message too long to encrypt: {0} bytes")]
    MessageTooLong(usize),
    #[error("cipher failure: {0}")]
    Cipher(String),
}
