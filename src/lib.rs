//! WeChat Official Account reply library
//!
//! Builds the passive replies a public-account callback returns to the
//! platform, in plaintext or safe (encrypted) mode.
//!
//! # Flow
//!
//! ```text
//! WeChat Server ──callback──▶ host HTTP handler
//!                               │  RequestContext::from_aes_request (verify + decrypt)
//!                               │  MixedMessage::from_xml
//!                               │  build a reply (message::Text, News, ...)
//!                               ▼
//!                             write_aes_response ──▶ <xml><Encrypt/><MsgSignature/>...</xml>
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use wechat_mp_reply::prelude::*;
//!
//! # fn handle(params: CallbackParams, body: &[u8]) -> wechat_mp_reply::Result<Vec<u8>> {
//! let crypto = WechatCrypto::new("abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG", "wx1234567890abcdef")?;
//! let (ctx, raw_xml) = RequestContext::from_aes_request("token", &crypto, &params, body)?;
//! let incoming = MixedMessage::from_xml(&raw_xml)?;
//!
//! let mut out = Vec::new();
//! write_aes_response(Some(&mut out), Some(&ctx), Some(&incoming.text_reply("hello")))?;
//! # Ok(out)
//! # }
//! ```
//!
//! ## Environment
//!
//! ```bash
//! export WECHAT_TOKEN=your_token
//! export WECHAT_APP_ID=wx1234567890abcdef
//! export WECHAT_ENCODING_AES_KEY=your_43_char_key  # optional, enables safe mode
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod escape;
pub mod message;
pub mod request;
pub mod response;
pub mod template;

pub use config::MpConfig;
pub use crypto::WechatCrypto;
pub use error::{CryptoError, Error, Result};
pub use escape::escape_ctrl;
pub use request::{CallbackParams, RequestContext};
pub use response::{ResponseEnvelope, write_aes_response, write_raw_response};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::MpConfig;
    pub use crate::crypto::WechatCrypto;
    pub use crate::error::{Error, Result};
    pub use crate::message::*;
    pub use crate::request::{CallbackParams, RequestContext, verify_url};
    pub use crate::response::{write_aes_response, write_raw_response};
}
