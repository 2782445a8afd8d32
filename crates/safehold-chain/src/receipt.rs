//! Receipts and per-submission state

use crate::tx::TxHash;
use safehold_core::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub status: ReceiptStatus,
    pub block_number: u64,
    pub gas_used: u64,
    /// Set for contract creation
    pub contract_address: Option<Address>,
    pub revert_reason: Option<String>,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Where one submission stands. Only ever moves forward:
///
/// ```text
/// Unknown -> Submitted -> Confirmed
///                      -> Reverted
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Unknown,
    Submitted(TxHash),
    Confirmed(Receipt),
    Reverted(Receipt),
}

impl SubmissionState {
    /// Record that the node accepted the transaction.
    pub fn submitted(self, hash: TxHash) -> Self {
        match self {
            Self::Unknown => Self::Submitted(hash),
            other => other,
        }
    }

    /// Record the receipt. Ignored unless the hash matches the submission.
    pub fn included(self, receipt: Receipt) -> Self {
        match self {
            Self::Submitted(hash) if hash == receipt.tx_hash => {
                if receipt.succeeded() {
                    Self::Confirmed(receipt)
                } else {
                    Self::Reverted(receipt)
                }
            }
            other => other,
        }
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::Unknown => None,
            Self::Submitted(hash) => Some(*hash),
            Self::Confirmed(r) | Self::Reverted(r) => Some(r.tx_hash),
        }
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            Self::Confirmed(r) | Self::Reverted(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Confirmed(_) | Self::Reverted(_))
    }
}
