//! Error taxonomy shared by every layer.
//!
//! Each crate keeps its own `thiserror` enum; `ErrorKind` is the coarse
//! category a caller (usually the UI) branches on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of every failure surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad address, amount or format. Caught before any network call.
    Validation,
    /// Caller lacks the role required (not a signer, not the owner).
    Authorization,
    /// On-chain state forbids the operation (already signed, executed...).
    StateConflict,
    /// Submission or RPC failure, or a reverted receipt.
    Chain,
    /// A confirmed transaction did not produce the expected state change.
    Integrity,
    /// Decryption, hashing or key-format failure in the vault.
    Crypto,
    /// The local key-value store could not be read or written.
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Authorization => "AuthorizationError",
            Self::StateConflict => "StateConflictError",
            Self::Chain => "ChainError",
            Self::Integrity => "IntegrityError",
            Self::Crypto => "CryptoError",
            Self::Storage => "StorageError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
