//! Per-request context and inbound callback decoding

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::WechatCrypto;
use crate::error::{Error, Result};

/// Query parameters the platform appends to every callback
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    pub signature: String,
    pub timestamp: String,
    pub nonce: String,
    #[serde(default)]
    pub echostr: Option<String>,
    #[serde(default)]
    pub openid: Option<String>,
    #[serde(default)]
    pub encrypt_type: Option<String>,
    #[serde(default)]
    pub msg_signature: Option<String>,
}

impl CallbackParams {
    /// `encrypt_type=aes` marks a safe-mode callback
    pub fn is_aes(&self) -> bool {
        self.encrypt_type.as_deref() == Some("aes")
    }

    fn parse_timestamp(&self) -> Result<i64> {
        self.timestamp
            .parse()
            .map_err(|_| Error::InvalidTimestamp(self.timestamp.clone()))
    }
}

/// Safe-mode request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "xml")]
pub struct EncryptedRequestBody {
    #[serde(rename = "ToUserName", default)]
    pub to_user_name: String,
    #[serde(rename = "Encrypt")]
    pub encrypt: String,
}

/// Answer the platform's URL verification (`GET` with `echostr`)
pub fn verify_url<'a>(token: &str, params: &'a CallbackParams) -> Result<&'a str> {
    if !WechatCrypto::verify(token, &params.timestamp, &params.nonce, &params.signature) {
        return Err(Error::SignatureMismatch);
    }
    params
        .echostr
        .as_deref()
        .ok_or(Error::MissingArgument("echostr"))
}

/// Cryptographic and session material of one inbound request.
///
/// Responders only read it. Timestamp, nonce and random may be replaced
/// before replying.
#[derive(Clone)]
pub struct RequestContext {
    pub token: String,
    pub app_id: String,
    pub aes_key: [u8; 32],
    /// Random prefix echoed back inside the encrypted reply
    pub random: [u8; 16],
    pub timestamp: i64,
    pub nonce: String,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("app_id", &self.app_id)
            .field("timestamp", &self.timestamp)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    pub fn new(
        token: &str,
        crypto: &WechatCrypto,
        random: [u8; 16],
        timestamp: i64,
        nonce: &str,
    ) -> Self {
        Self {
            token: token.to_string(),
            app_id: crypto.app_id().to_string(),
            aes_key: *crypto.aes_key(),
            random,
            timestamp,
            nonce: nonce.to_string(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_nonce(mut self, nonce: &str) -> Self {
        self.nonce = nonce.to_string();
        self
    }

    pub fn with_random(mut self, random: [u8; 16]) -> Self {
        self.random = random;
        self
    }

    /// Context for a plaintext-mode callback after checking `signature`.
    ///
    /// Key material stays zeroed; only [`write_raw_response`](crate::response::write_raw_response)
    /// should be used with it.
    pub fn from_raw_request(token: &str, app_id: &str, params: &CallbackParams) -> Result<Self> {
        if !WechatCrypto::verify(token, &params.timestamp, &params.nonce, &params.signature) {
            return Err(Error::SignatureMismatch);
        }

        Ok(Self {
            token: token.to_string(),
            app_id: app_id.to_string(),
            aes_key: [0u8; 32],
            random: [0u8; 16],
            timestamp: params.parse_timestamp()?,
            nonce: params.nonce.clone(),
        })
    }

    /// Verify and decrypt a safe-mode callback.
    ///
    /// Returns the context for the reply together with the decrypted message XML.
    pub fn from_aes_request(
        token: &str,
        crypto: &WechatCrypto,
        params: &CallbackParams,
        body: &[u8],
    ) -> Result<(Self, Vec<u8>)> {
        let msg_signature = params
            .msg_signature
            .as_deref()
            .ok_or(Error::MissingArgument("msg_signature"))?;

        let encrypted: EncryptedRequestBody = serde_xml_rs::from_reader(body)?;

        if !WechatCrypto::verify_msg(
            token,
            &params.timestamp,
            &params.nonce,
            &encrypted.encrypt,
            msg_signature,
        ) {
            return Err(Error::SignatureMismatch);
        }

        let timestamp = params.parse_timestamp()?;
        let decrypted = crypto.decrypt(&encrypted.encrypt)?;

        debug!(
            to_user = %encrypted.to_user_name,
            msg_len = decrypted.msg.len(),
            "decrypted safe-mode callback"
        );

        let context = Self {
            token: token.to_string(),
            app_id: crypto.app_id().to_string(),
            aes_key: *crypto.aes_key(),
            random: decrypted.random,
            timestamp,
            nonce: params.nonce.clone(),
        };
        Ok((context, decrypted.msg))
    }
}
