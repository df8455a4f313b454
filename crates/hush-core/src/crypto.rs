use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::base58::{self, KEY_BYTES};
use crate::error::CoreError;

/// GCM nonce size: 96 bits, freshly random per encryption call.
pub const IV_BYTES: usize = 12;

/// GCM authentication tag appended to the ciphertext.
pub const TAG_BYTES: usize = 16;

/// A 128-bit AES-GCM key.
///
/// Exists only on the client side of the protocol: it is minted at share
/// time, travels in the URL fragment, and is never sent to the server.
/// Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_BYTES]);

impl EncryptionKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse a key from its base58 form (the URL fragment).
    pub fn from_encoded(encoded: &str) -> Result<Self, CoreError> {
        let bytes = base58::decode(encoded)?;
        if bytes.len() != KEY_BYTES {
            return Err(CoreError::InvalidKeyLength {
                expected: KEY_BYTES,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; KEY_BYTES];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Base58 form for the URL fragment.
    pub fn encoded(&self) -> String {
        base58::encode(&self.0)
    }

    fn cipher(&self) -> Aes128Gcm {
        Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&self.0))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Encrypt raw bytes, returning the fresh IV and the ciphertext (tag
/// included). IV and ciphertext stay separate for the file flow, where the
/// IV rides in the metadata document.
pub fn encrypt_bytes(
    key: &EncryptionKey,
    plaintext: &[u8],
) -> Result<([u8; IV_BYTES], Vec<u8>), CoreError> {
    let mut iv = [0u8; IV_BYTES];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = key
        .cipher()
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CoreError::EncryptionFailed)?;

    Ok((iv, ciphertext))
}

/// Decrypt raw bytes. Fails uniformly on wrong key or any tampering.
pub fn decrypt_bytes(
    key: &EncryptionKey,
    iv: &[u8; IV_BYTES],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CoreError> {
    key.cipher()
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CoreError::DecryptionFailed)
}

/// Encrypt a UTF-8 secret into the single-string envelope:
/// `base64(IV || ciphertext-with-tag)`.
pub fn seal_text(key: &EncryptionKey, plaintext: &str) -> Result<String, CoreError> {
    let (iv, ciphertext) = encrypt_bytes(key, plaintext.as_bytes())?;
    let mut raw = Vec::with_capacity(IV_BYTES + ciphertext.len());
    raw.extend_from_slice(&iv);
    raw.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(raw))
}

/// Inverse of [`seal_text`]: split the first 12 bytes as IV, decrypt the rest.
pub fn open_text(key: &EncryptionKey, envelope: &str) -> Result<String, CoreError> {
    let raw = STANDARD
        .decode(envelope)
        .map_err(|e| CoreError::InvalidEnvelope(format!("base64 decode: {e}")))?;
    if raw.len() < IV_BYTES + TAG_BYTES {
        return Err(CoreError::InvalidEnvelope(
            "too short to hold an IV and tag".into(),
        ));
    }

    let (iv, ciphertext) = raw.split_at(IV_BYTES);
    let mut iv_arr = [0u8; IV_BYTES];
    iv_arr.copy_from_slice(iv);

    let plaintext = decrypt_bytes(key, &iv_arr, ciphertext)?;
    String::from_utf8(plaintext)
        .map_err(|_| CoreError::InvalidEnvelope("plaintext is not valid UTF-8".into()))
}
