/// Default cap on a text secret before encryption: 1 MiB.
pub const DEFAULT_MAX_PLAINTEXT_BYTES: usize = 1_048_576;

/// Hard ceiling on an encrypted file payload: 2 MiB. Enforced on the client
/// before encryption and on the server after the upload is decoded.
pub const MAX_ENCRYPTED_FILE_BYTES: usize = 2_097_152;

/// Largest envelope the server accepts for a given plaintext cap.
///
/// A 1.5x margin over the plaintext cap, covering base64 plus IV and tag
/// overhead. Looser than the exact 4/3 * (n + 28) expansion at any
/// realistic cap.
pub fn max_envelope_bytes(max_plaintext_bytes: usize) -> usize {
    max_plaintext_bytes + max_plaintext_bytes / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_margin_covers_exact_expansion_at_default_cap() {
        // base64(12-byte IV + plaintext + 16-byte tag), padded to 4.
        let exact = (DEFAULT_MAX_PLAINTEXT_BYTES + 28).div_ceil(3) * 4;
        assert!(max_envelope_bytes(DEFAULT_MAX_PLAINTEXT_BYTES) >= exact);
    }
}
