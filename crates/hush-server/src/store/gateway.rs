use std::sync::Arc;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::Rng;
use tracing::debug;

use hush_core::base58::ALPHABET as ID_ALPHABET;
use hush_core::share::{FileMetadata, FilePayload};

use super::backend::KvBackend;

/// Length of the random body of a storage id.
pub const ID_LEN: usize = 21;

/// What kind of secret a storage key points at.
///
/// The `sp-`/`spf-` storage prefix is derived from this tag in exactly one
/// place; nothing else in the crate parses prefixes out of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Text,
    File,
}

impl SecretKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Text => "sp-",
            Self::File => "spf-",
        }
    }

    fn storage_key(self) -> String {
        format!("{}{}", self.prefix(), generate_id())
    }
}

/// Collision-resistant random id over the unambiguous id alphabet (the key
/// codec's base58 set — alphanumeric minus `0`, `O`, `I`, `l`).
fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect()
}

/// Classify a storage key, accepting only the exact shape
/// `prefix + ID_LEN alphabet characters`. Prefix alone is not enough — a
/// malformed-but-prefixed key must never reach the backend.
pub fn classify(storage_key: &str) -> Option<SecretKind> {
    for kind in [SecretKind::Text, SecretKind::File] {
        if let Some(body) = storage_key.strip_prefix(kind.prefix()) {
            if body.len() == ID_LEN && body.bytes().all(|b| ID_ALPHABET.contains(&b)) {
                return Some(kind);
            }
            return None;
        }
    }
    None
}

/// True iff the id has the exact shape of a storage key of either kind.
pub fn is_well_formed(storage_key: &str) -> bool {
    classify(storage_key).is_some()
}

/// Application-facing face of the storage backend.
///
/// Owns id generation and shape validation, and exposes the reveal-once
/// semantics. Invalid ids are answered locally, before any backend call.
#[derive(Clone)]
pub struct Gateway {
    backend: Arc<dyn KvBackend>,
}

impl Gateway {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Persist a text ciphertext envelope. Returns the fresh storage key.
    pub async fn store_text(&self, envelope: &str, ttl_seconds: u64) -> Result<String> {
        let storage_key = SecretKind::Text.storage_key();
        self.backend
            .set_with_ttl(&storage_key, envelope.as_bytes(), ttl_seconds)
            .await?;
        debug!(key = %storage_key, ttl_seconds, "stored text secret");
        Ok(storage_key)
    }

    /// Destructive read of a text envelope. `None` covers missing, expired
    /// and already-taken alike — callers cannot tell these apart.
    pub async fn take_text(&self, storage_key: &str) -> Result<Option<String>> {
        if classify(storage_key) != Some(SecretKind::Text) {
            return Ok(None);
        }
        match self.backend.get_and_delete(storage_key).await? {
            None => Ok(None),
            Some(bytes) => {
                let envelope =
                    String::from_utf8(bytes).context("stored envelope is not valid UTF-8")?;
                Ok(Some(envelope))
            }
        }
    }

    /// Persist an encrypted file with its metadata as one JSON document.
    pub async fn store_file(
        &self,
        metadata: FileMetadata,
        ciphertext: &[u8],
        ttl_seconds: u64,
    ) -> Result<String> {
        let storage_key = SecretKind::File.storage_key();
        let document = FilePayload {
            metadata,
            encrypted_data_base64: STANDARD.encode(ciphertext),
        };
        let bytes = serde_json::to_vec(&document).context("encode file document")?;
        self.backend
            .set_with_ttl(&storage_key, &bytes, ttl_seconds)
            .await?;
        debug!(key = %storage_key, ttl_seconds, "stored file secret");
        Ok(storage_key)
    }

    /// Destructive read of a file record.
    ///
    /// A record that exists but does not parse is surfaced as an error, not
    /// `None`: the take already consumed it, so this is a data-integrity
    /// failure and must be distinguishable from an ordinary miss.
    pub async fn take_file(&self, storage_key: &str) -> Result<Option<(FileMetadata, Vec<u8>)>> {
        if classify(storage_key) != Some(SecretKind::File) {
            return Ok(None);
        }
        match self.backend.get_and_delete(storage_key).await? {
            None => Ok(None),
            Some(bytes) => {
                let document: FilePayload =
                    serde_json::from_slice(&bytes).context("corrupted stored file document")?;
                let ciphertext = STANDARD
                    .decode(&document.encrypted_data_base64)
                    .context("corrupted stored file document")?;
                Ok(Some((document.metadata, ciphertext)))
            }
        }
    }

    /// Unconditional delete. A well-formed key that is already gone is a
    /// no-op; a malformed key never reaches the backend.
    pub async fn delete_by_id(&self, storage_key: &str) -> Result<()> {
        if classify(storage_key).is_none() {
            return Ok(());
        }
        self.backend.delete(storage_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::MemoryBackend;

    fn make_gateway() -> (Gateway, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (Gateway::new(backend.clone()), backend)
    }

    /// Backend that fails the test if any call reaches it. Proves that
    /// shape validation short-circuits before storage access.
    struct UnreachableBackend;

    #[async_trait::async_trait]
    impl KvBackend for UnreachableBackend {
        async fn set_with_ttl(&self, _: &str, _: &[u8], _: u64) -> Result<()> {
            panic!("backend must not be reached");
        }
        async fn get_and_delete(&self, _: &str) -> Result<Option<Vec<u8>>> {
            panic!("backend must not be reached");
        }
        async fn delete(&self, _: &str) -> Result<()> {
            panic!("backend must not be reached");
        }
    }

    #[test]
    fn classify_accepts_exact_shapes_only() {
        let text_key = SecretKind::Text.storage_key();
        let file_key = SecretKind::File.storage_key();
        assert_eq!(classify(&text_key), Some(SecretKind::Text));
        assert_eq!(classify(&file_key), Some(SecretKind::File));

        assert_eq!(classify(""), None);
        assert_eq!(classify("sp-"), None);
        assert_eq!(classify("xy-AAAAAAAAAAAAAAAAAAAAA"), None);
        // Right prefix, wrong body length.
        assert_eq!(classify("sp-short"), None);
        assert_eq!(classify(&format!("sp-{}", "A".repeat(ID_LEN + 1))), None);
        // Right shape, illegal characters.
        assert_eq!(classify(&format!("sp-{}!", "A".repeat(ID_LEN - 1))), None);
        assert_eq!(classify(&format!("sp-{}-", "A".repeat(ID_LEN - 1))), None);
        // The ambiguous glyphs excluded from the id alphabet.
        for ch in ['0', 'O', 'I', 'l'] {
            assert_eq!(classify(&format!("sp-{ch}{}", "A".repeat(ID_LEN - 1))), None);
        }
    }

    #[test]
    fn generated_ids_are_well_formed_and_unique() {
        let a = SecretKind::Text.storage_key();
        let b = SecretKind::Text.storage_key();
        assert_ne!(a, b);
        assert!(is_well_formed(&a));
        assert!(a
            .strip_prefix("sp-")
            .unwrap()
            .bytes()
            .all(|c| ID_ALPHABET.contains(&c)));
    }

    #[tokio::test]
    async fn text_store_take_take() {
        let (gateway, _) = make_gateway();
        let key = gateway.store_text("envelope-bytes", 3600).await.unwrap();
        assert!(key.starts_with("sp-"));

        assert_eq!(
            gateway.take_text(&key).await.unwrap(),
            Some("envelope-bytes".into())
        );
        assert_eq!(gateway.take_text(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_ids_never_touch_the_backend() {
        let gateway = Gateway::new(Arc::new(UnreachableBackend));
        assert_eq!(gateway.take_text("sp-not-a-real-id").await.unwrap(), None);
        assert_eq!(gateway.take_file("spf-nope").await.unwrap(), None);
        gateway.delete_by_id("../../etc/passwd").await.unwrap();
        // A text key on the file path (and vice versa) is also a local miss.
        let text_shaped = SecretKind::Text.storage_key();
        assert_eq!(gateway.take_file(&text_shaped).await.unwrap(), None);
        let file_shaped = SecretKind::File.storage_key();
        assert_eq!(gateway.take_text(&file_shaped).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_secret_is_gone_without_ever_being_read() {
        let (gateway, backend) = make_gateway();
        let key = gateway.store_text("short-lived", 60).await.unwrap();
        backend.advance(61);
        assert_eq!(gateway.take_text(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn exactly_one_of_n_concurrent_takes_wins() {
        let (gateway, _) = make_gateway();
        let key = gateway.store_text("raced", 3600).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let gateway = gateway.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                gateway.take_text(&key).await.unwrap().is_some()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn file_store_fetch_delete_fetch() {
        let (gateway, _) = make_gateway();
        let metadata = FileMetadata {
            original_filename: "notes.txt".into(),
            content_type: "text/plain".into(),
            iv_base64: STANDARD.encode([0u8; 12]),
        };
        let ciphertext = [0xde, 0xad, 0xbe];

        let key = gateway
            .store_file(metadata.clone(), &ciphertext, 3600)
            .await
            .unwrap();
        assert!(key.starts_with("spf-"));

        let (got_meta, got_bytes) = gateway.take_file(&key).await.unwrap().unwrap();
        assert_eq!(got_meta, metadata);
        assert_eq!(got_bytes, ciphertext);

        // The take consumed the record; the client's confirm-delete is a
        // defensive second call and must be a safe no-op.
        gateway.delete_by_id(&key).await.unwrap();
        gateway.delete_by_id(&key).await.unwrap();
        assert_eq!(gateway.take_file(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupted_file_document_is_an_error_not_a_miss() {
        let (gateway, backend) = make_gateway();
        let key = SecretKind::File.storage_key();
        backend.inject(&key, b"{not json".to_vec(), 3600);

        let err = gateway.take_file(&key).await.unwrap_err();
        assert!(err.to_string().contains("corrupted stored file document"));
    }

    #[tokio::test]
    async fn corrupted_ciphertext_base64_is_an_error() {
        let (gateway, backend) = make_gateway();
        let key = SecretKind::File.storage_key();
        let doc = serde_json::json!({
            "metadata": {
                "originalFilename": "a.bin",
                "contentType": "application/octet-stream",
                "ivBase64": STANDARD.encode([0u8; 12]),
            },
            "encryptedDataBase64": "!!not base64!!",
        });
        backend.inject(&key, serde_json::to_vec(&doc).unwrap(), 3600);

        assert!(gateway.take_file(&key).await.is_err());
    }
}
