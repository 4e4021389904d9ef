//! Control-character escaping for platform JSON
//!
//! The platform occasionally returns raw control bytes inside JSON strings,
//! which strict decoders reject. Every byte `<= 0x1f` is rewritten as a
//! `\u00xx` escape before decoding.

use std::borrow::Cow;

use serde::de::DeserializeOwned;

use crate::error::Result;

const ESCAPE_PREFIX: &[u8] = br"\u00";
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Escape every control byte (`<= 31`) as `\u00xx`.
///
/// Returns the input unchanged (borrowed) when it holds no control bytes.
pub fn escape_ctrl(input: &[u8]) -> Cow<'_, [u8]> {
    let Some(first) = input.iter().position(|&b| b <= 31) else {
        return Cow::Borrowed(input);
    };

    let ctrl_count = input[first..].iter().filter(|&&b| b <= 31).count();
    let mut out = Vec::with_capacity(input.len() + 5 * ctrl_count);
    out.extend_from_slice(&input[..first]);

    for &b in &input[first..] {
        if b <= 31 {
            out.extend_from_slice(ESCAPE_PREFIX);
            out.push(HEX_DIGITS[(b >> 4) as usize]);
            out.push(HEX_DIGITS[(b & 0x0f) as usize]);
        } else {
            out.push(b);
        }
    }

    Cow::Owned(out)
}

/// Decode a JSON body from the platform, escaping control bytes first
pub fn from_json_slice<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let escaped = escape_ctrl(body);
    Ok(serde_json::from_slice(&escaped)?)
}
