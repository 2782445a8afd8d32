//! Cryptographic utilities
//!
//! Password-based encryption for account keys using Argon2id + AES-256-GCM,
//! and the Argon2id PHC hash used to verify a password without decrypting.
//!
//! # Security Notes
//!
//! - Argon2id is memory-hard (resistant to GPU/ASIC attacks)
//! - AES-256-GCM provides authenticated encryption
//! - Each encryption uses a random salt and nonce
//! - The KDF cost travels with the ciphertext so it can be raised later
//! - Password is never stored

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use argon2::password_hash::{
    Error as PhcError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

/// Current blob format version
const FORMAT_VERSION: u8 = 1;

/// version (1) + m_cost, t_cost, p_cost (3 x u32 LE)
const HEADER_LEN: usize = 13;

const ARGON2_OUTPUT_LEN: usize = 32; // 256 bits for AES-256

/// Salt length for Argon2
const SALT_LEN: usize = 16;

/// Nonce length for AES-256-GCM
const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag
const TAG_LEN: usize = 16;

/// Ceilings for KDF cost read back from storage: 4 GiB, 16 passes, 16 lanes
const MAX_M_COST_KIB: u32 = 4 * 1024 * 1024;
const MAX_T_COST: u32 = 16;
const MAX_P_COST: u32 = 16;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
    #[error("Invalid ciphertext format")]
    InvalidFormat,
    #[error("Unsupported ciphertext version {0}")]
    UnsupportedVersion(u8),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory in KiB
    pub m_cost: u32,
    /// Iterations
    pub t_cost: u32,
    /// Lanes
    pub p_cost: u32,
}

impl KdfParams {
    pub const fn new(m_cost: u32, t_cost: u32, p_cost: u32) -> Self {
        Self {
            m_cost,
            t_cost,
            p_cost,
        }
    }

    /// Minimal cost profile. Only for tests and throwaway wallets.
    pub const fn light() -> Self {
        Self::new(256, 1, 1)
    }

    /// Whether the cost stays under the ceilings a stored blob may ask for
    pub fn within_limits(&self) -> bool {
        self.m_cost <= MAX_M_COST_KIB && self.t_cost <= MAX_T_COST && self.p_cost <= MAX_P_COST
    }

    fn argon2(&self) -> Result<Argon2<'static>, CryptoError> {
        let params = Params::new(
            self.m_cost,
            self.t_cost,
            self.p_cost,
            Some(ARGON2_OUTPUT_LEN),
        )
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// OWASP recommendation: 64 MiB, 3 iterations, 4 lanes
impl Default for KdfParams {
    fn default() -> Self {
        Self::new(65536, 3, 4)
    }
}

/// Encrypted key format:
/// [version (1)][m_cost, t_cost, p_cost (12)][salt (16)][nonce (12)][ciphertext + tag]
#[derive(Debug, Clone)]
pub struct EncryptedKey {
    params: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedKey {
    pub fn params(&self) -> KdfParams {
        self.params
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(HEADER_LEN + SALT_LEN + NONCE_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&header(&self.params));
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        // At least one byte of ciphertext plus the tag
        if bytes.len() < HEADER_LEN + SALT_LEN + NONCE_LEN + TAG_LEN + 1 {
            return Err(CryptoError::InvalidFormat);
        }
        if bytes[0] != FORMAT_VERSION {
            return Err(CryptoError::UnsupportedVersion(bytes[0]));
        }

        let read_u32 = |at: usize| {
            let mut word = [0u8; 4];
            word.copy_from_slice(&bytes[at..at + 4]);
            u32::from_le_bytes(word)
        };
        let params = KdfParams::new(read_u32(1), read_u32(5), read_u32(9));
        if !params.within_limits() {
            return Err(CryptoError::InvalidFormat);
        }

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let salt_at = HEADER_LEN;
        let nonce_at = salt_at + SALT_LEN;
        salt.copy_from_slice(&bytes[salt_at..nonce_at]);
        nonce.copy_from_slice(&bytes[nonce_at..nonce_at + NONCE_LEN]);

        Ok(Self {
            params,
            salt,
            nonce,
            ciphertext: bytes[nonce_at + NONCE_LEN..].to_vec(),
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidFormat)?;
        Self::from_bytes(&bytes)
    }
}

/// Version and KDF cost, also bound into the ciphertext as associated data
fn header(params: &KdfParams) -> [u8; HEADER_LEN] {
    let mut out = [0u8; HEADER_LEN];
    out[0] = FORMAT_VERSION;
    out[1..5].copy_from_slice(&params.m_cost.to_le_bytes());
    out[5..9].copy_from_slice(&params.t_cost.to_le_bytes());
    out[9..13].copy_from_slice(&params.p_cost.to_le_bytes());
    out
}

fn derive_key(
    password: &str,
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; ARGON2_OUTPUT_LEN]>, CryptoError> {
    let mut key = Zeroizing::new([0u8; ARGON2_OUTPUT_LEN]);
    params
        .argon2()?
        .hash_password_into(password.as_bytes(), salt, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    Ok(key)
}

/// Encrypt secret bytes with a password.
///
/// Each call generates a new random salt and nonce.
pub fn encrypt_secret(
    plaintext: &[u8],
    password: &str,
    params: KdfParams,
) -> Result<EncryptedKey, CryptoError> {
    if !params.within_limits() {
        return Err(CryptoError::KeyDerivationFailed(
            "KDF cost exceeds supported limits".into(),
        ));
    }
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let nonce_arr = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&nonce_arr);

    let key = derive_key(password, &salt, &params)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let aad = header(&params);
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedKey {
        params,
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt with a password.
///
/// # Errors
/// Returns error if password is wrong or ciphertext is tampered
pub fn decrypt_secret(
    encrypted: &EncryptedKey,
    password: &str,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if !encrypted.params.within_limits() {
        return Err(CryptoError::InvalidFormat);
    }
    let key = derive_key(password, &encrypted.salt, &encrypted.params)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let aad = header(&encrypted.params);
    cipher
        .decrypt(
            Nonce::from_slice(&encrypted.nonce),
            Payload {
                msg: encrypted.ciphertext.as_slice(),
                aad: &aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed("Invalid password or corrupted data".to_string()))
}

/// One-way Argon2id hash of a password in PHC string format.
pub fn hash_password(password: &str, params: KdfParams) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    params
        .argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CryptoError::HashingFailed(e.to_string()))
}

/// Check a password against a PHC hash. Comparison is constant-time.
///
/// `Ok(false)` on mismatch, `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, CryptoError> {
    let parsed = PasswordHash::new(phc).map_err(|_| CryptoError::InvalidFormat)?;
    let params = Params::try_from(&parsed).map_err(|_| CryptoError::InvalidFormat)?;
    if !KdfParams::new(params.m_cost(), params.t_cost(), params.p_cost()).within_limits() {
        return Err(CryptoError::InvalidFormat);
    }
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PhcError::Password) => Ok(false),
        Err(e) => Err(CryptoError::HashingFailed(e.to_string())),
    }
}
