use crate::tx::TxHash;
use safehold_core::{ErrorKind, KeyError};
use thiserror::Error;

/// Errors from talking to the chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Wrong chain: expected {expected}, node reports {actual}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("Nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch { expected: u64, got: u64 },

    #[error("Insufficient funds for value plus gas")]
    InsufficientFundsForGas,

    #[error("Invalid transaction signature: {0}")]
    InvalidSignature(#[from] KeyError),

    /// A read or static call reverted
    #[error("Call reverted: {0}")]
    CallReverted(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The transaction was sent but no receipt appeared in time. It may
    /// still be included later.
    #[error("Transaction {tx_hash} not included before timeout")]
    InclusionTimeout { tx_hash: TxHash },
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Chain
    }

    /// Revert message of a reverted call, if this is one
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            Self::CallReverted(reason) => Some(reason),
            _ => None,
        }
    }
}
