use safehold_chain::{ChainError, TxHash};
use safehold_core::{Address, ErrorKind};
use safehold_wallet::WalletError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("No recovery contract selected")]
    NoContract,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid guardian list: {0}")]
    InvalidGuardians(String),

    #[error("Invalid quorum {quorum} for {guardians} guardians")]
    InvalidQuorum { quorum: u32, guardians: usize },

    #[error("{account} is not the owner of this recovery contract")]
    NotOwner { account: Address },

    #[error("{account} is not a guardian")]
    NotAGuardian { account: Address },

    #[error("{0} is already a guardian")]
    GuardianExists(Address),

    #[error("{0} is not a guardian")]
    UnknownGuardian(Address),

    #[error("Already voted for {candidate}")]
    AlreadyVoted { candidate: Address },

    #[error("Contract already recovered")]
    AlreadyRecovered,

    #[error("Transaction {tx_hash} reverted: {reason}")]
    TransactionReverted { tx_hash: TxHash, reason: String },

    #[error("Deployment {0} confirmed without a contract address")]
    DeploymentNotRecorded(TxHash),

    #[error("Vote for {candidate} not recorded despite successful receipt")]
    VoteNotRecorded { candidate: Address },

    #[error("Change not recorded despite successful receipt: {0}")]
    ChangeNotRecorded(String),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
}

impl RecoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoContract
            | Self::InvalidAddress(_)
            | Self::InvalidGuardians(_)
            | Self::InvalidQuorum { .. } => ErrorKind::Validation,
            Self::NotOwner { .. } | Self::NotAGuardian { .. } => ErrorKind::Authorization,
            Self::GuardianExists(_)
            | Self::UnknownGuardian(_)
            | Self::AlreadyVoted { .. }
            | Self::AlreadyRecovered => ErrorKind::StateConflict,
            Self::TransactionReverted { .. } | Self::Chain(_) => ErrorKind::Chain,
            Self::DeploymentNotRecorded(_)
            | Self::VoteNotRecorded { .. }
            | Self::ChangeNotRecorded(_) => ErrorKind::Integrity,
            Self::Wallet(e) => e.kind(),
        }
    }
}
