//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::crypto::WechatCrypto;

/// Official Account settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpConfig {
    /// Token for signature verification
    pub token: String,

    /// AppID
    pub app_id: String,

    /// EncodingAESKey (43 characters, absent in plaintext mode)
    #[serde(default)]
    pub encoding_aes_key: Option<String>,

    /// AppSecret (only needed for API calls made by the host)
    #[serde(default)]
    pub app_secret: Option<String>,
}

impl MpConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("WECHAT_TOKEN").context("WECHAT_TOKEN is required")?;
        let app_id = lookup("WECHAT_APP_ID").context("WECHAT_APP_ID is required")?;

        Ok(Self {
            token,
            app_id,
            encoding_aes_key: lookup("WECHAT_ENCODING_AES_KEY").filter(|s| !s.trim().is_empty()),
            app_secret: lookup("WECHAT_APP_SECRET"),
        })
    }

    /// Whether replies should be encrypted
    pub fn is_aes(&self) -> bool {
        self.encoding_aes_key.is_some()
    }

    /// Crypto handler for safe mode, `None` in plaintext mode
    pub fn crypto(&self) -> Result<Option<WechatCrypto>> {
        self.encoding_aes_key
            .as_deref()
            .map(|key| {
                WechatCrypto::new(key, &self.app_id).context("Invalid WECHAT_ENCODING_AES_KEY")
            })
            .transpose()
    }
}
