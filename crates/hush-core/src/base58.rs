use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CoreError;

/// Bitcoin base58 alphabet. Excludes the visually ambiguous `0`, `O`, `I`,
/// `l`. Storage ids are drawn from the same alphabet so every identifier in
/// a share link is safe to read aloud.
pub const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Fixed key size: 128 bits.
pub const KEY_BYTES: usize = 16;

/// Encode a byte sequence as base58.
///
/// Each leading zero byte maps to exactly one leading `'1'`. Zero-length
/// input still encodes to `"1"` (the digit for zero) rather than an empty
/// string; `decode` mirrors this.
pub fn encode(input: &[u8]) -> String {
    let zeros = input.iter().take_while(|&&b| b == 0).count();

    // Base-256 to base-58 long division over the tail; digits accumulate
    // least-significant first.
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 138 / 100 + 1);
    for &byte in &input[zeros..] {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            carry += u32::from(*digit) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len() + 1);
    for _ in 0..zeros {
        out.push('1');
    }
    for &d in digits.iter().rev() {
        out.push(ALPHABET[d as usize] as char);
    }
    if out.is_empty() {
        out.push('1');
    }
    out
}

/// Decode a base58 string back into bytes.
///
/// Any character outside the alphabet (including the excluded `0`, `O`,
/// `I`, `l`) is rejected with the offending character. The empty string
/// decodes to a single zero byte, matching `encode`'s zero-length rule.
pub fn decode(input: &str) -> Result<Vec<u8>, CoreError> {
    if input.is_empty() {
        return Ok(vec![0]);
    }

    let ones = input.chars().take_while(|&c| c == '1').count();

    let mut bytes: Vec<u8> = Vec::with_capacity(input.len());
    for ch in input.chars().skip(ones) {
        let val = ALPHABET
            .iter()
            .position(|&a| char::from(a) == ch)
            .ok_or(CoreError::InvalidBase58Char(ch))? as u32;
        let mut carry = val;
        for b in bytes.iter_mut() {
            carry += u32::from(*b) * 58;
            *b = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let mut out = vec![0u8; ones];
    out.extend(bytes.iter().rev());
    Ok(out)
}

/// True iff `input` decodes successfully to exactly [`KEY_BYTES`] bytes.
///
/// Guards the decryptor against structurally valid base58 that is not a key.
pub fn is_valid_key(input: &str) -> bool {
    matches!(decode(input), Ok(bytes) if bytes.len() == KEY_BYTES)
}

/// Draw a fresh 128-bit key from the OS RNG and encode it.
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    encode(&bytes)
}
