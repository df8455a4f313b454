pub mod base58;
pub mod crypto;
pub mod error;
pub mod expiry;
pub mod limits;
pub mod link;
pub mod share;

pub use base58::{decode, encode, generate_key, is_valid_key, KEY_BYTES};
pub use crypto::EncryptionKey;
pub use error::CoreError;
pub use expiry::Expiration;
pub use link::{format_share_link, parse_share_link};
pub use share::{FileMetadata, FilePayload};
