//! Safehold Core
//!
//! Shared types and key custody primitives for Safehold.
//!
//! # Account Keys
//!
//! A single secp256k1 secret scalar per wallet. The public address is the
//! last 20 bytes of the Keccak-256 hash of the uncompressed public key.
//!
//! # Encrypted Storage
//!
//! Account keys are encrypted at rest using Argon2id + AES-256-GCM. The
//! password itself is never stored, only an Argon2id PHC verification hash.

pub mod crypto;
pub mod error;
pub mod keys;
pub mod password;
pub mod types;

pub use crypto::{
    decrypt_secret, encrypt_secret, hash_password, verify_password, CryptoError, EncryptedKey,
    KdfParams,
};
pub use error::ErrorKind;
pub use keys::{recover_address, AccountKey, KeyError};
pub use types::{keccak256, Address, Amount, ParseError, TxId, NATIVE_DECIMALS};
