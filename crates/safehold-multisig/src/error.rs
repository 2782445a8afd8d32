use safehold_chain::{ChainError, TxHash};
use safehold_core::{Address, Amount, ErrorKind, TxId};
use safehold_wallet::WalletError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Proposal pays out {expected}, not {actual}")]
    TokenMismatch { expected: Address, actual: Address },

    #[error("{0} is not a multisig contract")]
    NotAMultisig(Address),

    #[error("{account} is not a signer of this multisig")]
    NotASigner { account: Address },

    #[error("Transaction {0} not found")]
    TransactionNotFound(TxId),

    #[error("Transaction {0} already signed by this account")]
    AlreadySigned(TxId),

    #[error("Transaction {0} already executed")]
    AlreadyExecuted(TxId),

    #[error("Insufficient signatures: have {have}, need {need}")]
    InsufficientSignatures { have: u32, need: u32 },

    #[error("Insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: Amount, required: Amount },

    #[error("Transaction {tx_hash} reverted: {reason}")]
    TransactionReverted { tx_hash: TxHash, reason: String },

    #[error("Proposal {0} not found on chain after confirmation")]
    ProposalNotRecorded(TxId),

    #[error("Signature on {0} not recorded despite successful receipt")]
    SignatureNotRecorded(TxId),

    #[error("Execution of {0} not recorded despite successful receipt")]
    ExecutionNotRecorded(TxId),

    #[error("Deposit to {0} not recorded despite successful receipt")]
    DepositNotRecorded(TxId),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
}

impl MultisigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_)
            | Self::InvalidAmount(_)
            | Self::TokenMismatch { .. }
            | Self::NotAMultisig(_) => ErrorKind::Validation,
            Self::NotASigner { .. } => ErrorKind::Authorization,
            Self::TransactionNotFound(_)
            | Self::AlreadySigned(_)
            | Self::AlreadyExecuted(_)
            | Self::InsufficientSignatures { .. }
            | Self::InsufficientFunds { .. } => ErrorKind::StateConflict,
            Self::TransactionReverted { .. } | Self::Chain(_) => ErrorKind::Chain,
            Self::ProposalNotRecorded(_)
            | Self::SignatureNotRecorded(_)
            | Self::ExecutionNotRecorded(_)
            | Self::DepositNotRecorded(_) => ErrorKind::Integrity,
            Self::Wallet(e) => e.kind(),
        }
    }
}
