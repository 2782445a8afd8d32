//! Node interface
//!
//! The coordinators are generic over this trait; the node or RPC transport
//! behind it is not part of Safehold.

use crate::call::{ReadCall, ReadValue};
use crate::error::ChainError;
use crate::receipt::Receipt;
use crate::tx::{SignedTx, TxHash, TxRequest};
use safehold_core::{Address, Amount};

#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// Network identifier the node serves
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Next nonce for `account`
    async fn nonce(&self, account: Address) -> Result<u64, ChainError>;

    async fn native_balance(&self, account: Address) -> Result<Amount, ChainError>;

    /// Call a view function. A revert is `ChainError::CallReverted`.
    async fn read(&self, contract: Address, call: ReadCall) -> Result<ReadValue, ChainError>;

    /// Execute a request against current state without committing it and
    /// return what the call would return.
    async fn simulate(&self, from: Address, request: &TxRequest) -> Result<ReadValue, ChainError>;

    /// Hand a signed transaction to the node.
    async fn send(&self, tx: SignedTx) -> Result<TxHash, ChainError>;

    /// `None` while the transaction is not yet included
    async fn receipt(&self, hash: TxHash) -> Result<Option<Receipt>, ChainError>;
}
