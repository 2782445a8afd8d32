//! Typed read bindings over [`ChainClient::read`]
//!
//! Each binding pairs a client with a contract address and decodes view
//! results into Rust types.

use crate::call::{
    MultisigRead, MultisigTransaction, ReadCall, ReadValue, RecoveryRead, TokenRead,
};
use crate::client::ChainClient;
use crate::error::ChainError;
use safehold_core::{Address, Amount, TxId};

fn to_u32(value: u64, what: &str) -> Result<u32, ChainError> {
    u32::try_from(value)
        .map_err(|_| ChainError::UnexpectedResponse(format!("{} out of range: {}", what, value)))
}

pub struct MultisigContract<'a, C> {
    client: &'a C,
    address: Address,
}

impl<'a, C: ChainClient> MultisigContract<'a, C> {
    pub fn new(client: &'a C, address: Address) -> Self {
        Self { client, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn read(&self, call: MultisigRead) -> Result<ReadValue, ChainError> {
        self.client.read(self.address, ReadCall::Multisig(call)).await
    }

    pub async fn min_signatures(&self) -> Result<u32, ChainError> {
        let value = self.read(MultisigRead::MinSignatures).await?.into_uint()?;
        to_u32(value, "minSignatures")
    }

    pub async fn is_signer(&self, account: Address) -> Result<bool, ChainError> {
        self.read(MultisigRead::IsSigner { account })
            .await?
            .into_bool()
    }

    /// Record for `id`; an all-zero record if the id is unknown
    pub async fn transaction(&self, id: TxId) -> Result<MultisigTransaction, ChainError> {
        self.read(MultisigRead::Transaction { id })
            .await?
            .into_transaction()
    }

    pub async fn has_signed(&self, id: TxId, signer: Address) -> Result<bool, ChainError> {
        self.read(MultisigRead::HasSigned { id, signer })
            .await?
            .into_bool()
    }

    /// Contract holdings of `token`; zero address for native
    pub async fn balance(&self, token: Address) -> Result<Amount, ChainError> {
        self.read(MultisigRead::Balance { token })
            .await?
            .into_amount()
    }

    /// Amount deposited against one proposal
    pub async fn tx_balance(&self, id: TxId) -> Result<Amount, ChainError> {
        self.read(MultisigRead::TxBalance { id })
            .await?
            .into_amount()
    }
}

pub struct RecoveryContract<'a, C> {
    client: &'a C,
    address: Address,
}

impl<'a, C: ChainClient> RecoveryContract<'a, C> {
    pub fn new(client: &'a C, address: Address) -> Self {
        Self { client, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn read(&self, call: RecoveryRead) -> Result<ReadValue, ChainError> {
        self.client.read(self.address, ReadCall::Recovery(call)).await
    }

    pub async fn owner(&self) -> Result<Address, ChainError> {
        self.read(RecoveryRead::Owner).await?.into_address()
    }

    pub async fn guardians(&self) -> Result<Vec<Address>, ChainError> {
        self.read(RecoveryRead::Guardians).await?.into_addresses()
    }

    pub async fn is_guardian(&self, account: Address) -> Result<bool, ChainError> {
        self.read(RecoveryRead::IsGuardian { account })
            .await?
            .into_bool()
    }

    pub async fn quorum(&self) -> Result<u32, ChainError> {
        let value = self.read(RecoveryRead::Quorum).await?.into_uint()?;
        to_u32(value, "quorum")
    }

    pub async fn is_recovered(&self) -> Result<bool, ChainError> {
        self.read(RecoveryRead::IsRecovered).await?.into_bool()
    }

    pub async fn has_voted(&self, guardian: Address, candidate: Address) -> Result<bool, ChainError> {
        self.read(RecoveryRead::HasVoted {
            guardian,
            candidate,
        })
        .await?
        .into_bool()
    }

    pub async fn vote_count(&self, candidate: Address) -> Result<u32, ChainError> {
        let value = self
            .read(RecoveryRead::VoteCount { candidate })
            .await?
            .into_uint()?;
        to_u32(value, "vote count")
    }
}

pub struct TokenContract<'a, C> {
    client: &'a C,
    address: Address,
}

impl<'a, C: ChainClient> TokenContract<'a, C> {
    pub fn new(client: &'a C, address: Address) -> Self {
        Self { client, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn read(&self, call: TokenRead) -> Result<ReadValue, ChainError> {
        self.client.read(self.address, ReadCall::Token(call)).await
    }

    pub async fn name(&self) -> Result<String, ChainError> {
        self.read(TokenRead::Name).await?.into_text()
    }

    pub async fn symbol(&self) -> Result<String, ChainError> {
        self.read(TokenRead::Symbol).await?.into_text()
    }

    pub async fn decimals(&self) -> Result<u8, ChainError> {
        let value = self.read(TokenRead::Decimals).await?.into_uint()?;
        u8::try_from(value)
            .map_err(|_| ChainError::UnexpectedResponse(format!("decimals out of range: {}", value)))
    }

    pub async fn balance_of(&self, owner: Address) -> Result<Amount, ChainError> {
        self.read(TokenRead::BalanceOf { owner })
            .await?
            .into_amount()
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<Amount, ChainError> {
        self.read(TokenRead::Allowance { owner, spender })
            .await?
            .into_amount()
    }
}
