//! Persisted key layout.
//!
//! Key names and field casing match what earlier versions of the client wrote,
//! so existing storage keeps loading.

use safehold_core::Address;
use serde::{Deserialize, Serialize};

pub const WALLET_KEY: &str = "wallet";
pub const PASSWORD_HASH_KEY: &str = "passwordHash";
pub const IS_UNLOCKED_KEY: &str = "isUnlocked";
pub const DECRYPTED_KEY_KEY: &str = "decryptedPrivateKey";
pub const MULTISIG_CONTRACTS_KEY: &str = "multisigContracts";

const MULTISIG_TXS_PREFIX: &str = "multisigTxs:";

/// Ledger key holding the proposal ids for one contract
pub fn multisig_txs_key(contract: &Address) -> String {
    format!("{}{}", MULTISIG_TXS_PREFIX, contract.to_lower_hex())
}

/// The `wallet` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    /// Hex of the versioned encrypted blob
    pub encrypted_private_key: String,
    pub address: Address,
    /// Creation time, ms since the Unix epoch
    pub timestamp: u64,
}
