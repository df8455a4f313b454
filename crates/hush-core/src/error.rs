use thiserror::Error;

/// Errors surfaced by the protocol layer.
///
/// `DecryptionFailed` is deliberately opaque: wrong key, tampered IV and
/// tampered ciphertext are cryptographically indistinguishable and the error
/// must not hint at which one occurred.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid base58 character {0:?}")]
    InvalidBase58Char(char),

    #[error("key must decode to {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("malformed ciphertext envelope: {0}")]
    InvalidEnvelope(String),

    #[error("invalid share link: {0}")]
    InvalidLink(String),

    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),

    #[error("payload exceeds {limit} byte limit")]
    PayloadTooLarge { limit: usize },
}
