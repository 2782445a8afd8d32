//! Typed contract calls
//!
//! The multisig, recovery and token contracts are consumed through a fixed
//! interface. Each state-changing function is a variant of a [`Call`], each
//! view function a variant of a [`ReadCall`]. Their serde form is the
//! canonical encoding that gets signed.

use crate::error::ChainError;
use crate::gas::OperationKind;
use safehold_core::{Address, Amount, TxId};
use serde::{Deserialize, Serialize};

/// Body of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "call", rename_all = "camelCase")]
pub enum Call {
    /// Plain native transfer, no contract code
    Transfer,
    Deploy(DeployCall),
    Multisig(MultisigCall),
    Recovery(RecoveryCall),
    Token(TokenCall),
}

impl Call {
    pub fn operation(&self) -> OperationKind {
        match self {
            Self::Transfer => OperationKind::NativeTransfer,
            Self::Deploy(_) => OperationKind::Deploy,
            Self::Token(_) => OperationKind::TokenCall,
            Self::Multisig(_) | Self::Recovery(_) => OperationKind::ContractCall,
        }
    }

    pub fn is_deploy(&self) -> bool {
        matches!(self, Self::Deploy(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "contract", rename_all = "camelCase")]
pub enum DeployCall {
    #[serde(rename_all = "camelCase")]
    Multisig {
        signers: Vec<Address>,
        min_signatures: u32,
    },
    Recovery { guardians: Vec<Address>, quorum: u32 },
    Token {
        name: String,
        symbol: String,
        decimals: u8,
        supply: Amount,
    },
}

/// Multisig mutators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "camelCase")]
pub enum MultisigCall {
    /// `propose(address,uint256)`
    ProposeNative { to: Address, amount: Amount },
    /// `propose(address,uint256,address)`
    ProposeToken {
        to: Address,
        amount: Amount,
        token: Address,
    },
    Sign { id: TxId },
    Execute { id: TxId },
    /// Payable; the deposited amount is the transaction value
    Deposit { id: TxId },
    /// Pulls `amount` of `token` from the caller under an existing allowance
    DepositToken {
        id: TxId,
        token: Address,
        amount: Amount,
    },
}

/// Recovery mutators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "camelCase")]
pub enum RecoveryCall {
    AddRecoveryAddress { guardian: Address },
    RemoveRecoveryAddress { guardian: Address },
    SetQuorum { quorum: u32 },
    Recover { candidate: Address },
}

/// ERC-20 mutators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "camelCase")]
pub enum TokenCall {
    Approve { spender: Address, amount: Amount },
    Transfer { to: Address, amount: Amount },
}

/// View function call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "call", rename_all = "camelCase")]
pub enum ReadCall {
    Multisig(MultisigRead),
    Recovery(RecoveryRead),
    Token(TokenRead),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "camelCase")]
pub enum MultisigRead {
    MinSignatures,
    /// `signers(address)`
    IsSigner { account: Address },
    /// `transactions(bytes32)`
    Transaction { id: TxId },
    /// `transactionSigners(bytes32,address)`
    HasSigned { id: TxId, signer: Address },
    /// `getBalance(address)`: contract holdings of a token, native for the
    /// zero address
    Balance { token: Address },
    /// `getBalance(bytes32)`: amount deposited against one proposal
    TxBalance { id: TxId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "camelCase")]
pub enum RecoveryRead {
    Owner,
    Guardians,
    IsGuardian { account: Address },
    Quorum,
    IsRecovered,
    HasVoted { guardian: Address, candidate: Address },
    VoteCount { candidate: Address },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "camelCase")]
pub enum TokenRead {
    Name,
    Symbol,
    Decimals,
    BalanceOf { owner: Address },
    Allowance { owner: Address, spender: Address },
}

/// On-chain multisig proposal record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigTransaction {
    pub to: Address,
    pub is_native: bool,
    /// Zero for native proposals
    pub token: Address,
    pub amount: Amount,
    /// Zero when no record exists for the id
    pub proposer: Address,
    pub timestamp: u64,
    pub signed_count: u32,
    pub executed: bool,
    pub balance: Amount,
}

impl MultisigTransaction {
    /// What the contract returns for an unknown id
    pub fn empty() -> Self {
        Self {
            to: Address::ZERO,
            is_native: false,
            token: Address::ZERO,
            amount: Amount::ZERO,
            proposer: Address::ZERO,
            timestamp: 0,
            signed_count: 0,
            executed: false,
            balance: Amount::ZERO,
        }
    }

    pub fn exists(&self) -> bool {
        !self.proposer.is_zero()
    }

    /// Asset the proposal pays out: zero address for native
    pub fn asset(&self) -> Address {
        if self.is_native {
            Address::ZERO
        } else {
            self.token
        }
    }
}

/// Decoded return value of a read or static call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ReadValue {
    Unit,
    Bool(bool),
    Uint(u64),
    Amount(Amount),
    Address(Address),
    Addresses(Vec<Address>),
    Text(String),
    Id(TxId),
    Transaction(MultisigTransaction),
}

macro_rules! expect_variant {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(self) -> Result<$ty, ChainError> {
            match self {
                Self::$variant(v) => Ok(v),
                other => Err(ChainError::UnexpectedResponse(format!(
                    concat!("expected ", stringify!($variant), ", got {:?}"),
                    other
                ))),
            }
        }
    };
}

impl ReadValue {
    expect_variant!(into_bool, Bool, bool);
    expect_variant!(into_uint, Uint, u64);
    expect_variant!(into_amount, Amount, Amount);
    expect_variant!(into_address, Address, Address);
    expect_variant!(into_addresses, Addresses, Vec<Address>);
    expect_variant!(into_text, Text, String);
    expect_variant!(into_id, Id, TxId);
    expect_variant!(into_transaction, Transaction, MultisigTransaction);
}
