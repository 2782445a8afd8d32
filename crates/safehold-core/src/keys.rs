//! Account keys
//!
//! One secp256k1 secret scalar per wallet, deriving exactly one address.

use crate::types::{keccak256, Address};
use rand::rngs::OsRng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid private key format: expected 64 hex characters with optional 0x prefix")]
    InvalidKeyFormat,
    #[error("Private key is not a valid secp256k1 scalar")]
    OutOfRange,
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

/// A wallet's secret key. Zeroed on drop, never printed.
#[derive(Clone)]
pub struct AccountKey {
    secret: SecretKey,
}

impl AccountKey {
    /// Generate a fresh key from the OS CSPRNG
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::new(&mut OsRng),
        }
    }

    /// Parse a hex-encoded key.
    ///
    /// Exactly 64 hex characters, with or without a `0x` prefix. Anything
    /// else is rejected before the scalar range is checked.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if body.len() != 64 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(KeyError::InvalidKeyFormat);
        }

        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(body, &mut bytes[..]).map_err(|_| KeyError::InvalidKeyFormat)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, KeyError> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| KeyError::OutOfRange)?;
        Ok(Self { secret })
    }

    /// Lower-case hex with `0x` prefix
    pub fn to_hex(&self) -> Zeroizing<String> {
        let bytes = Zeroizing::new(self.secret.secret_bytes());
        Zeroizing::new(format!("0x{}", hex::encode(&bytes[..])))
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key(&Secp256k1::signing_only())
    }

    pub fn address(&self) -> Address {
        address_from_public_key(&self.public_key())
    }

    /// Sign a 32-byte digest. Returns `r || s || v` with `v` in `{0, 1}`.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> [u8; 65] {
        let secp = Secp256k1::signing_only();
        let message = Message::from_digest(*digest);
        let signature = secp.sign_ecdsa_recoverable(&message, &self.secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&compact);
        out[64] = recovery_id.to_i32() as u8;
        out
    }
}

impl Drop for AccountKey {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountKey({}, <redacted>)", self.address())
    }
}

/// Address = last 20 bytes of keccak256(uncompressed pubkey without the 0x04 tag)
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(bytes)
}

/// Recover the signer address from a digest and a 65-byte signature
pub fn recover_address(digest: &[u8; 32], signature: &[u8; 65]) -> Result<Address, KeyError> {
    let recovery_id = RecoveryId::from_i32(signature[64] as i32)
        .map_err(|e| KeyError::InvalidSignature(e.to_string()))?;
    let recoverable = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|e| KeyError::InvalidSignature(e.to_string()))?;
    let message = Message::from_digest(*digest);
    let public_key = Secp256k1::verification_only()
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| KeyError::InvalidSignature(e.to_string()))?;
    Ok(address_from_public_key(&public_key))
}
