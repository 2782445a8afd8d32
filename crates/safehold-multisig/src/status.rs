//! Proposal lifecycle as seen from chain reads

use safehold_chain::MultisigTransaction;
use safehold_core::TxId;
use serde::Serialize;

/// Derived fresh from the contract on every call, never cached.
///
/// ```text
/// Unknown -> Proposed -> PartiallySigned(n) -> ReadyToExecute(n) -> Executed
/// ```
///
/// Contracts that count the proposer as the first signer skip `Proposed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "signatures")]
pub enum ProposalStatus {
    Unknown,
    Proposed,
    PartiallySigned(u32),
    ReadyToExecute(u32),
    Executed,
}

impl ProposalStatus {
    pub fn derive(record: &MultisigTransaction, min_signatures: u32) -> Self {
        if !record.exists() {
            Self::Unknown
        } else if record.executed {
            Self::Executed
        } else if record.signed_count >= min_signatures {
            Self::ReadyToExecute(record.signed_count)
        } else if record.signed_count == 0 {
            Self::Proposed
        } else {
            Self::PartiallySigned(record.signed_count)
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed)
    }
}

/// A ledger id joined with its current on-chain record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedTransaction {
    pub id: TxId,
    pub record: MultisigTransaction,
    pub status: ProposalStatus,
}
