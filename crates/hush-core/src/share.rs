//! Client-side half of the share protocol.
//!
//! Everything here runs before the first byte leaves the machine: the key is
//! generated and the payload encrypted locally, and only ciphertext (plus
//! non-secret metadata) is handed to the transport. There is no server-side
//! encryption path anywhere in the workspace.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::{self, EncryptionKey, IV_BYTES, TAG_BYTES};
use crate::error::CoreError;
use crate::limits;

/// Non-secret file attributes stored alongside the ciphertext.
///
/// The IV lives here (base64) rather than concatenated with the ciphertext,
/// because the file transport carries metadata and blob as separate JSON
/// fields. Field names are part of the wire/storage format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub original_filename: String,
    pub content_type: String,
    pub iv_base64: String,
}

/// The stored/transported document for an encrypted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub metadata: FileMetadata,
    pub encrypted_data_base64: String,
}

/// Result of preparing a text secret for upload.
pub struct TextShare {
    /// Ciphertext envelope, safe to send to the server.
    pub envelope: String,
    /// Base58 key for the URL fragment. Never sent anywhere.
    pub key: String,
}

/// Encrypt a text secret locally. The caller uploads `envelope` and keeps
/// `key` for the link fragment.
pub fn create_text_share(
    plaintext: &str,
    max_plaintext_bytes: usize,
) -> Result<TextShare, CoreError> {
    if plaintext.len() > max_plaintext_bytes {
        return Err(CoreError::PayloadTooLarge {
            limit: max_plaintext_bytes,
        });
    }
    let key = EncryptionKey::generate();
    let envelope = crypto::seal_text(&key, plaintext)?;
    Ok(TextShare {
        envelope,
        key: key.encoded(),
    })
}

/// Decrypt a revealed envelope with the key recovered from the fragment.
pub fn open_text_share(envelope: &str, encoded_key: &str) -> Result<String, CoreError> {
    let key = EncryptionKey::from_encoded(encoded_key)?;
    crypto::open_text(&key, envelope)
}

/// Result of preparing a file for upload.
pub struct FileShare {
    pub payload: FilePayload,
    /// Base58 key for the URL fragment.
    pub key: String,
}

/// Encrypt a file locally. The encrypted-size ceiling is checked before any
/// crypto work happens.
pub fn create_file_share(
    content: &[u8],
    filename: &str,
    content_type: &str,
) -> Result<FileShare, CoreError> {
    if content.len() + IV_BYTES + TAG_BYTES > limits::MAX_ENCRYPTED_FILE_BYTES {
        return Err(CoreError::PayloadTooLarge {
            limit: limits::MAX_ENCRYPTED_FILE_BYTES,
        });
    }

    let key = EncryptionKey::generate();
    let (iv, ciphertext) = crypto::encrypt_bytes(&key, content)?;

    let payload = FilePayload {
        metadata: FileMetadata {
            original_filename: filename.to_owned(),
            content_type: content_type.to_owned(),
            iv_base64: STANDARD.encode(iv),
        },
        encrypted_data_base64: STANDARD.encode(&ciphertext),
    };

    Ok(FileShare {
        payload,
        key: key.encoded(),
    })
}

/// Decrypt a fetched file payload with the key from the fragment.
pub fn open_file_share(payload: &FilePayload, encoded_key: &str) -> Result<Vec<u8>, CoreError> {
    let key = EncryptionKey::from_encoded(encoded_key)?;

    let iv_raw = STANDARD
        .decode(&payload.metadata.iv_base64)
        .map_err(|e| CoreError::InvalidEnvelope(format!("iv base64: {e}")))?;
    let iv: [u8; IV_BYTES] = iv_raw
        .as_slice()
        .try_into()
        .map_err(|_| CoreError::InvalidEnvelope(format!("iv must be {IV_BYTES} bytes")))?;

    let ciphertext = STANDARD
        .decode(&payload.encrypted_data_base64)
        .map_err(|e| CoreError::InvalidEnvelope(format!("ciphertext base64: {e}")))?;

    crypto::decrypt_bytes(&key, &iv, &ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_share_round_trip() {
        let share = create_text_share("hello world", limits::DEFAULT_MAX_PLAINTEXT_BYTES).unwrap();
        assert_eq!(
            open_text_share(&share.envelope, &share.key).unwrap(),
            "hello world"
        );
    }

    #[test]
    fn oversized_text_is_rejected_before_encryption() {
        let err = create_text_share("abcdef", 5).unwrap_err();
        assert_eq!(err, CoreError::PayloadTooLarge { limit: 5 });
    }

    #[test]
    fn file_share_round_trip() {
        let content = [0x01u8, 0x02, 0x03];
        let share = create_file_share(&content, "notes.txt", "text/plain").unwrap();
        assert_eq!(share.payload.metadata.original_filename, "notes.txt");
        assert_eq!(share.payload.metadata.content_type, "text/plain");
        assert_eq!(open_file_share(&share.payload, &share.key).unwrap(), content);
    }

    #[test]
    fn oversized_file_is_rejected() {
        let content = vec![0u8; limits::MAX_ENCRYPTED_FILE_BYTES];
        let err = create_file_share(&content, "big.bin", "application/octet-stream").unwrap_err();
        assert_eq!(
            err,
            CoreError::PayloadTooLarge {
                limit: limits::MAX_ENCRYPTED_FILE_BYTES
            }
        );
    }

    #[test]
    fn wrong_key_fails_for_files() {
        let share = create_file_share(b"bytes", "a.bin", "application/octet-stream").unwrap();
        let other = crate::base58::generate_key();
        assert_eq!(
            open_file_share(&share.payload, &other),
            Err(CoreError::DecryptionFailed)
        );
    }

    #[test]
    fn payload_wire_names_are_camel_case() {
        let share = create_file_share(b"x", "a.txt", "text/plain").unwrap();
        let json = serde_json::to_value(&share.payload).unwrap();
        assert!(json.get("encryptedDataBase64").is_some());
        let meta = json.get("metadata").unwrap();
        assert!(meta.get("originalFilename").is_some());
        assert!(meta.get("contentType").is_some());
        assert!(meta.get("ivBase64").is_some());
    }

    #[test]
    fn corrupt_iv_metadata_is_malformed_not_a_crash() {
        let mut share = create_file_share(b"x", "a.txt", "text/plain").unwrap();
        share.payload.metadata.iv_base64 = "AAAA".into(); // 3 bytes, not 12
        assert!(matches!(
            open_file_share(&share.payload, &share.key),
            Err(CoreError::InvalidEnvelope(_))
        ));
    }
}
