//! Passive reply writers
//!
//! Plaintext mode writes the reply's own XML. Safe mode wraps the encrypted
//! reply in an envelope:
//!
//! ```text
//! <xml>
//!   <Encrypt>base64(ciphertext)</Encrypt>
//!   <MsgSignature>sha1(sort(token, timestamp, nonce, Encrypt))</MsgSignature>
//!   <TimeStamp>1700000000</TimeStamp>
//!   <Nonce>nonce</Nonce>
//! </xml>
//! ```

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose;
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::crypto::{encrypt_msg, msg_sign};
use crate::error::{Error, Result};
use crate::request::RequestContext;

/// Safe-mode response body.
///
/// The signature is computed on construction from the other three fields,
/// which cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(rename = "xml")]
pub struct ResponseEnvelope {
    #[serde(rename = "Encrypt")]
    encrypted_msg: String,
    #[serde(rename = "MsgSignature")]
    msg_signature: String,
    #[serde(rename = "TimeStamp")]
    timestamp: i64,
    #[serde(rename = "Nonce")]
    nonce: String,
}

impl ResponseEnvelope {
    pub fn new(token: &str, timestamp: i64, nonce: &str, encrypted_msg: String) -> Self {
        let msg_signature = msg_sign(token, &timestamp.to_string(), nonce, &encrypted_msg);
        Self {
            encrypted_msg,
            msg_signature,
            timestamp,
            nonce: nonce.to_string(),
        }
    }

    pub fn encrypted_msg(&self) -> &str {
        &self.encrypted_msg
    }

    pub fn msg_signature(&self) -> &str {
        &self.msg_signature
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Check `MsgSignature` against the other fields
    pub fn verify(&self, token: &str) -> bool {
        msg_sign(token, &self.timestamp.to_string(), &self.nonce, &self.encrypted_msg)
            == self.msg_signature
    }
}

/// Reply in plaintext mode.
///
/// `msg` must serialize to a valid platform message (see [`crate::message`]).
pub fn write_raw_response<W, M>(w: Option<&mut W>, msg: Option<&M>) -> Result<()>
where
    W: Write,
    M: Serialize,
{
    let w = w.ok_or(Error::MissingArgument("response writer"))?;
    let msg = msg.ok_or(Error::MissingArgument("message"))?;

    serde_xml_rs::to_writer(w, msg)?;
    Ok(())
}

/// Reply in safe mode.
///
/// Uses `ctx.random`, `ctx.timestamp` and `ctx.nonce` as they are; override
/// them on the context first if needed. Nothing is written unless the
/// envelope is complete.
pub fn write_aes_response<W, M>(
    w: Option<&mut W>,
    ctx: Option<&RequestContext>,
    msg: Option<&M>,
) -> Result<()>
where
    W: Write,
    M: Serialize,
{
    let w = w.ok_or(Error::MissingArgument("response writer"))?;
    let ctx = ctx.ok_or(Error::MissingArgument("request context"))?;
    let msg = msg.ok_or(Error::MissingArgument("message"))?;

    let envelope = encrypt_response(ctx, msg)?;
    serde_xml_rs::to_writer(w, &envelope)?;
    Ok(())
}

/// Serialize, encrypt and sign `msg` without writing it anywhere
pub fn encrypt_response<M>(ctx: &RequestContext, msg: &M) -> Result<ResponseEnvelope>
where
    M: Serialize,
{
    let mut raw_msg_xml = Vec::new();
    serde_xml_rs::to_writer(&mut raw_msg_xml, msg)?;

    let ciphertext = encrypt_msg(&ctx.random, &raw_msg_xml, &ctx.app_id, &ctx.aes_key)?;
    let encrypted_msg = general_purpose::STANDARD.encode(ciphertext);

    debug!(
        app_id = %ctx.app_id,
        timestamp = ctx.timestamp,
        raw_len = raw_msg_xml.len(),
        "encrypted passive reply"
    );

    Ok(ResponseEnvelope::new(
        &ctx.token,
        ctx.timestamp,
        &ctx.nonce,
        encrypted_msg,
    ))
}
