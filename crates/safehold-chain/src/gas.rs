//! Gas limits and price
//!
//! Callers may supply their own [`GasSettings`]; otherwise the fixed default
//! for the operation type applies.

use safehold_core::Amount;
use serde::{Deserialize, Serialize};

/// Gas for a plain native transfer
pub const NATIVE_TRANSFER_GAS: u64 = 21_000;
/// Gas for an ERC-20 approve/transfer
pub const TOKEN_CALL_GAS: u64 = 100_000;
/// Gas for multisig and recovery calls
pub const CONTRACT_CALL_GAS: u64 = 300_000;
/// Gas for contract creation
pub const DEPLOY_GAS: u64 = 3_000_000;
/// 1 gwei
pub const DEFAULT_GAS_PRICE: u128 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    NativeTransfer,
    TokenCall,
    ContractCall,
    Deploy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasSettings {
    pub gas_limit: u64,
    /// Price per gas unit in base units
    pub gas_price: Amount,
}

impl GasSettings {
    /// Worst-case fee: `gas_limit * gas_price`
    pub fn max_fee(&self) -> Option<Amount> {
        self.gas_price.checked_mul(u128::from(self.gas_limit))
    }
}

/// Per-operation defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasDefaults {
    pub gas_price: Amount,
    pub native_transfer: u64,
    pub token_call: u64,
    pub contract_call: u64,
    pub deploy: u64,
}

impl Default for GasDefaults {
    fn default() -> Self {
        Self {
            gas_price: Amount::from_base_units(DEFAULT_GAS_PRICE),
            native_transfer: NATIVE_TRANSFER_GAS,
            token_call: TOKEN_CALL_GAS,
            contract_call: CONTRACT_CALL_GAS,
            deploy: DEPLOY_GAS,
        }
    }
}

impl GasDefaults {
    pub fn limit_for(&self, operation: OperationKind) -> u64 {
        match operation {
            OperationKind::NativeTransfer => self.native_transfer,
            OperationKind::TokenCall => self.token_call,
            OperationKind::ContractCall => self.contract_call,
            OperationKind::Deploy => self.deploy,
        }
    }

    pub fn settings_for(&self, operation: OperationKind) -> GasSettings {
        GasSettings {
            gas_limit: self.limit_for(operation),
            gas_price: self.gas_price,
        }
    }

    /// `custom` if given, else the default for `operation`
    pub fn resolve(&self, operation: OperationKind, custom: Option<GasSettings>) -> GasSettings {
        custom.unwrap_or_else(|| self.settings_for(operation))
    }
}
