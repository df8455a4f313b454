use serde::{Deserialize, Serialize};

/// Stored in the backend as bincode-encoded bytes.
///
/// The payload is opaque ciphertext produced by the client — a text envelope
/// or a file JSON document. The server holds no key that could open it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub payload: Vec<u8>,
    /// Unix timestamp (seconds) when the record was created.
    pub created_at: i64,
    /// Unix timestamp (seconds) after which the record is unreadable.
    pub expires_at: i64,
}

impl StoredRecord {
    pub fn new(payload: Vec<u8>, now: i64, ttl_seconds: u64) -> Self {
        Self {
            payload,
            created_at: now,
            expires_at: now + ttl_seconds as i64,
        }
    }

    /// Deadline check applied on every read; the sweep only reclaims space.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_exactly_at_deadline() {
        let record = StoredRecord::new(vec![1], 1_000, 60);
        assert!(!record.is_expired(1_059));
        assert!(record.is_expired(1_060));
        assert!(record.is_expired(1_061));
    }
}
