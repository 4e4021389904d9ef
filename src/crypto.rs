//! WeChat cryptographic utilities
//!
//! SHA1 signatures and the AES-256-CBC message scheme used by the Official
//! Account "safe mode":
//!
//! ```text
//! ciphertext = AES_CBC(key, iv = key[..16], random(16) + msg_len(4, BE) + msg + app_id + pad)
//! ```
//!
//! Padding is PKCS#7 over a 32-byte block, so a pad byte is always in `1..=32`.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use base64::Engine;
use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig, general_purpose};
use rand::RngCore;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;
use tracing::trace;

use crate::error::{CryptoError, Error, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// PKCS#7 block size used by the platform (not the AES block size)
pub const BLOCK_SIZE: usize = 32;
const AES_BLOCK_SIZE: usize = 16;
const RANDOM_LEN: usize = 16;
const HEADER_LEN: usize = RANDOM_LEN + 4;

// EncodingAESKey's last character carries bits past the 32nd byte
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Plaintext recovered from an encrypted platform message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMsg {
    pub random: [u8; 16],
    pub msg: Vec<u8>,
    pub app_id: Vec<u8>,
}

/// Encrypt `raw_msg` for the platform.
///
/// Returns raw ciphertext bytes; callers base64 them for the wire.
pub fn encrypt_msg(
    random: &[u8; 16],
    raw_msg: &[u8],
    app_id: &str,
    aes_key: &[u8; 32],
) -> std::result::Result<Vec<u8>, CryptoError> {
    let msg_len =
        u32::try_from(raw_msg.len()).map_err(|_| CryptoError::MessageTooLong(raw_msg.len()))?;

    let app_id_offset = HEADER_LEN + raw_msg.len();
    let content_len = app_id_offset + app_id.len();
    let amount_to_pad = BLOCK_SIZE - content_len % BLOCK_SIZE;
    let plaintext_len = content_len + amount_to_pad;

    let mut buf = vec![0u8; plaintext_len];
    buf[..RANDOM_LEN].copy_from_slice(random);
    buf[RANDOM_LEN..HEADER_LEN].copy_from_slice(&msg_len.to_be_bytes());
    buf[HEADER_LEN..app_id_offset].copy_from_slice(raw_msg);
    buf[app_id_offset..content_len].copy_from_slice(app_id.as_bytes());
    // amount_to_pad <= 32
    buf[content_len..].fill(amount_to_pad as u8);

    let cipher = Aes256CbcEnc::new_from_slices(aes_key, &aes_key[..AES_BLOCK_SIZE])
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;
    cipher
        .encrypt_padded_mut::<NoPadding>(&mut buf, plaintext_len)
        .map_err(|_| CryptoError::Cipher("failed to encrypt message".to_string()))?;

    trace!(
        plaintext_len,
        msg_len = raw_msg.len(),
        "encrypted platform message"
    );
    Ok(buf)
}

/// Decrypt a platform message and split it into its parts.
///
/// The embedded app id is returned as-is; [`WechatCrypto::decrypt`] checks it.
pub fn decrypt_msg(
    ciphertext: &[u8],
    aes_key: &[u8; 32],
) -> std::result::Result<DecryptedMsg, CryptoError> {
    if ciphertext.len() < BLOCK_SIZE || ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextLength(ciphertext.len()));
    }

    let cipher = Aes256CbcDec::new_from_slices(aes_key, &aes_key[..AES_BLOCK_SIZE])
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;
    let mut buf = ciphertext.to_vec();
    let plaintext = cipher
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| CryptoError::Cipher("failed to decrypt message".to_string()))?;

    let amount_to_pad = plaintext[plaintext.len() - 1];
    if amount_to_pad == 0 || amount_to_pad as usize > BLOCK_SIZE {
        return Err(CryptoError::InvalidPadding(amount_to_pad));
    }
    let content = &plaintext[..plaintext.len() - amount_to_pad as usize];

    if content.len() < HEADER_LEN {
        return Err(CryptoError::InvalidMessageLength {
            declared: 0,
            available: content.len(),
        });
    }

    let mut random = [0u8; RANDOM_LEN];
    random.copy_from_slice(&content[..RANDOM_LEN]);

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&content[RANDOM_LEN..HEADER_LEN]);
    let msg_len = u32::from_be_bytes(len_bytes) as usize;

    let available = content.len() - HEADER_LEN;
    if msg_len > available {
        return Err(CryptoError::InvalidMessageLength {
            declared: msg_len,
            available,
        });
    }

    let app_id_offset = HEADER_LEN + msg_len;
    Ok(DecryptedMsg {
        random,
        msg: content[HEADER_LEN..app_id_offset].to_vec(),
        app_id: content[app_id_offset..].to_vec(),
    })
}

/// URL-verification and plaintext-mode signature: `sha1(sort(token, timestamp, nonce))`
pub fn sign(token: &str, timestamp: &str, nonce: &str) -> String {
    sorted_sha1(&mut [token, timestamp, nonce])
}

/// Safe-mode message signature: `sha1(sort(token, timestamp, nonce, encrypted_msg))`
pub fn msg_sign(token: &str, timestamp: &str, nonce: &str, encrypted_msg: &str) -> String {
    sorted_sha1(&mut [token, timestamp, nonce, encrypted_msg])
}

fn sorted_sha1(parts: &mut [&str]) -> String {
    parts.sort_unstable();

    let mut hasher = Sha1::new();
    for part in parts.iter() {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Constant-time comparison of two hex signatures
pub(crate) fn signature_eq(expected: &str, actual: &str) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    bool::from(expected.as_bytes().ct_eq(actual.as_bytes()))
}

/// Fresh 16-byte random prefix for outbound messages
pub fn random_prefix() -> [u8; 16] {
    let mut random = [0u8; RANDOM_LEN];
    rand::rng().fill_bytes(&mut random);
    random
}

/// WeChat cryptographic handler
#[derive(Clone)]
pub struct WechatCrypto {
    aes_key: [u8; 32],
    app_id: String,
}

impl std::fmt::Debug for WechatCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatCrypto")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

impl WechatCrypto {
    /// Create from the 43-character EncodingAESKey and AppID
    pub fn new(encoding_aes_key: &str, app_id: &str) -> std::result::Result<Self, CryptoError> {
        let aes_key = decode_encoding_aes_key(encoding_aes_key)?;
        Ok(Self::from_key(aes_key, app_id))
    }

    /// Create from an already decoded 32-byte key
    pub fn from_key(aes_key: [u8; 32], app_id: &str) -> Self {
        Self {
            aes_key,
            app_id: app_id.to_string(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn aes_key(&self) -> &[u8; 32] {
        &self.aes_key
    }

    /// Verify a plaintext-mode signature
    pub fn verify(token: &str, timestamp: &str, nonce: &str, signature: &str) -> bool {
        signature_eq(&sign(token, timestamp, nonce), signature)
    }

    /// Verify a safe-mode message signature
    pub fn verify_msg(
        token: &str,
        timestamp: &str,
        nonce: &str,
        encrypted_msg: &str,
        msg_signature: &str,
    ) -> bool {
        signature_eq(&msg_sign(token, timestamp, nonce, encrypted_msg), msg_signature)
    }

    /// Encrypt and base64 a message for the platform
    pub fn encrypt(
        &self,
        random: &[u8; 16],
        raw_msg: &[u8],
    ) -> std::result::Result<String, CryptoError> {
        let ciphertext = encrypt_msg(random, raw_msg, &self.app_id, &self.aes_key)?;
        Ok(general_purpose::STANDARD.encode(ciphertext))
    }

    /// Base64-decode, decrypt and check the embedded app id
    pub fn decrypt(&self, encrypted: &str) -> Result<DecryptedMsg> {
        let ciphertext = general_purpose::STANDARD
            .decode(encrypted)
            .map_err(CryptoError::from)?;
        let decrypted = decrypt_msg(&ciphertext, &self.aes_key)?;

        if decrypted.app_id != self.app_id.as_bytes() {
            return Err(Error::AppIdMismatch {
                expected: self.app_id.clone(),
                actual: String::from_utf8_lossy(&decrypted.app_id).into_owned(),
            });
        }

        Ok(decrypted)
    }
}

/// Decode the platform's 43-char EncodingAESKey.
///
/// The key is standard base64 of 32 bytes with the trailing `=` stripped.
pub fn decode_encoding_aes_key(
    encoding_aes_key: &str,
) -> std::result::Result<[u8; 32], CryptoError> {
    let encoding_aes_key = encoding_aes_key.trim();
    if encoding_aes_key.len() != 43 {
        return Err(CryptoError::InvalidKeyLength(encoding_aes_key.len()));
    }

    let decoded = KEY_ENGINE.decode(format!("{}=", encoding_aes_key))?;
    let key: [u8; 32] = decoded
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidDecodedKeyLength(decoded.len()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x11; 32];
    const RANDOM: [u8; 16] = *b"0123456789abcdef";

    #[test]
    fn test_sign_and_verify() {
        let token = "test_token";
        let timestamp = "1234567890";
        let nonce = "abc123";

        let signature = sign(token, timestamp, nonce);
        assert!(WechatCrypto::verify(token, timestamp, nonce, &signature));
        assert!(!WechatCrypto::verify(token, timestamp, "wrong", &signature));
    }

    #[test]
    fn test_msg_sign_sorts_inputs() {
        // sorted: "1409304348" < "xxxxxx" < "yyyy" < "zzz"
        let expected = hex::encode(Sha1::digest(b"1409304348xxxxxxyyyyzzz"));
        assert_eq!(msg_sign("zzz", "1409304348", "xxxxxx", "yyyy"), expected);
        assert_eq!(msg_sign("yyyy", "xxxxxx", "1409304348", "zzz"), expected);
        assert_eq!(expected.len(), 40);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let raw = b"<xml><Content>Hello, WeChat!</Content></xml>";
        let ciphertext = encrypt_msg(&RANDOM, raw, "wx_app", &KEY).unwrap();
        assert_eq!(ciphertext.len() % BLOCK_SIZE, 0);

        let decrypted = decrypt_msg(&ciphertext, &KEY).unwrap();
        assert_eq!(decrypted.random, RANDOM);
        assert_eq!(decrypted.msg, raw);
        assert_eq!(decrypted.app_id, b"wx_app");
    }

    #[test]
    fn test_full_block_of_padding() {
        // 20 header + 8 msg + 4 app id = 32, so a whole 32-byte pad block is added
        let ciphertext = encrypt_msg(&RANDOM, b"12345678", "wxid", &KEY).unwrap();
        assert_eq!(ciphertext.len(), 64);
        assert_eq!(decrypt_msg(&ciphertext, &KEY).unwrap().msg, b"12345678");
    }

    #[test]
    fn test_encrypt_is_deterministic_for_same_random() {
        let a = encrypt_msg(&RANDOM, b"same", "wx", &KEY).unwrap();
        let b = encrypt_msg(&RANDOM, b"same", "wx", &KEY).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decrypt_rejects_bad_length() {
        let err = decrypt_msg(&[0u8; 40], &KEY).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidCiphertextLength(40)));
    }

    #[test]
    fn test_decrypt_rejects_wrong_key() {
        let ciphertext = encrypt_msg(&RANDOM, b"payload", "wx", &KEY).unwrap();
        let other_key = [0x22; 32];
        assert!(!matches!(
            decrypt_msg(&ciphertext, &other_key),
            Ok(decrypted) if decrypted.msg == b"payload"
        ));
    }

    fn encrypt_blocks(plaintext: &[u8]) -> Vec<u8> {
        let mut buf = plaintext.to_vec();
        let len = buf.len();
        Aes256CbcEnc::new_from_slices(&KEY, &KEY[..AES_BLOCK_SIZE])
            .unwrap()
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .unwrap();
        buf
    }

    #[test]
    fn test_decrypt_rejects_bad_padding() {
        let zero_pad = encrypt_blocks(&[0u8; 32]);
        assert!(matches!(
            decrypt_msg(&zero_pad, &KEY),
            Err(CryptoError::InvalidPadding(0))
        ));

        let mut oversized = [b'x'; 48];
        oversized[47] = 33;
        assert!(matches!(
            decrypt_msg(&encrypt_blocks(&oversized), &KEY),
            Err(CryptoError::InvalidPadding(33))
        ));
    }

    #[test]
    fn test_decrypt_rejects_declared_length_past_buffer() {
        let mut plaintext = [0xffu8; 32];
        plaintext[31] = 1;
        assert!(matches!(
            decrypt_msg(&encrypt_blocks(&plaintext), &KEY),
            Err(CryptoError::InvalidMessageLength {
                declared: 4294967295,
                available: 11
            })
        ));

        // pad of 20 leaves only 12 bytes, shorter than the header
        let mut short = [0u8; 32];
        short[12..].fill(20);
        assert!(matches!(
            decrypt_msg(&encrypt_blocks(&short), &KEY),
            Err(CryptoError::InvalidMessageLength { available: 12, .. })
        ));
    }

    #[test]
    fn test_signature_eq() {
        let signature = msg_sign("tok", "1", "n", "enc");
        assert!(signature_eq(&signature, &signature));
        assert!(!signature_eq(&signature, &signature[..39]));
        assert!(!signature_eq(&signature, &signature.to_uppercase()));
        assert!(WechatCrypto::verify_msg("tok", "1", "n", "enc", &signature));
        assert!(!WechatCrypto::verify_msg("tok", "1", "n", "other", &signature));
    }

    #[test]
    fn test_crypto_checks_app_id() {
        let sender = WechatCrypto::from_key(KEY, "wx_sender");
        let receiver = WechatCrypto::from_key(KEY, "wx_receiver");

        let encrypted = sender.encrypt(&RANDOM, b"hello").unwrap();
        assert_eq!(sender.decrypt(&encrypted).unwrap().msg, b"hello");
        assert!(matches!(
            receiver.decrypt(&encrypted),
            Err(Error::AppIdMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_encoding_aes_key() {
        let key_43 = general_purpose::STANDARD_NO_PAD.encode(KEY);
        assert_eq!(key_43.len(), 43, "Key should be 43 chars");

        assert_eq!(decode_encoding_aes_key(&key_43).unwrap(), KEY);
        let crypto = WechatCrypto::new(&format!(" {key_43}\n"), "wx").unwrap();
        assert_eq!(crypto.aes_key(), &KEY);

        // trailing bits of the 43rd character are ignored
        let random_key = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG";
        assert_eq!(decode_encoding_aes_key(random_key).unwrap().len(), 32);

        assert!(matches!(
            decode_encoding_aes_key("short"),
            Err(CryptoError::InvalidKeyLength(5))
        ));
    }

    #[test]
    fn test_random_prefix_varies() {
        assert_ne!(random_prefix(), random_prefix());
    }
}
