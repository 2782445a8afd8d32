use crate::store::StoreError;
use safehold_core::{CryptoError, ErrorKind, KeyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("{0}")]
    InvalidKeyFormat(#[from] KeyError),

    #[error("No wallet found")]
    NoWalletFound,

    #[error("A wallet already exists; wipe it first")]
    WalletExists,

    #[error("Wallet is locked")]
    Locked,

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Stored wallet record is corrupt: {0}")]
    CorruptRecord(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WeakPassword { .. } | Self::InvalidKeyFormat(_) => ErrorKind::Validation,
            Self::NoWalletFound | Self::WalletExists => ErrorKind::StateConflict,
            Self::Locked | Self::WrongPassword => ErrorKind::Authorization,
            Self::CorruptRecord(_) | Self::Crypto(_) => ErrorKind::Crypto,
            Self::Store(_) => ErrorKind::Storage,
        }
    }
}
