//! Multisig coordinator
//!
//! Every state-changing operation runs the same sequence:
//!
//! 1. Fail-fast guards from fresh contract reads
//! 2. Sign with the session's unlocked key and submit
//! 3. Wait for the receipt; a reverted receipt is an error
//! 4. Re-read the contract and check the expected change actually landed
//!
//! Nothing is cached between operations. The only local state written is
//! the ledger of proposal ids, and only for ids seen on chain.

use crate::error::MultisigError;
use crate::status::{ProposalStatus, TrackedTransaction};
use safehold_chain::{
    Call, ChainClient, ChainError, GasDefaults, GasSettings, MultisigCall, MultisigContract,
    MultisigTransaction, Receipt, SubmissionState, Submitter, TokenCall, TokenContract, WaitPolicy,
};
use safehold_core::{AccountKey, Address, Amount, TxId};
use safehold_wallet::WalletSession;

pub struct MultisigCoordinator<'a, C> {
    session: &'a WalletSession,
    contract: MultisigContract<'a, C>,
    submitter: Submitter<'a, C>,
    gas: Option<GasSettings>,
}

impl<'a, C: ChainClient> MultisigCoordinator<'a, C> {
    pub fn new(client: &'a C, session: &'a WalletSession, address: Address) -> Self {
        Self {
            session,
            contract: MultisigContract::new(client, address),
            submitter: Submitter::new(client),
            gas: None,
        }
    }

    pub fn with_gas_defaults(mut self, gas: GasDefaults) -> Self {
        self.submitter = self.submitter.with_gas(gas);
        self
    }

    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.submitter = self.submitter.with_wait(wait);
        self
    }

    /// User-supplied gas for every submission from this coordinator
    pub fn with_gas(mut self, gas: GasSettings) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    /// Check the address is a multisig and remember it.
    ///
    /// Returns its `minSignatures`.
    pub async fn track_contract(&self) -> Result<u32, MultisigError> {
        let address = self.address();
        let min = match self.contract.min_signatures().await {
            Ok(min) => min,
            Err(ChainError::CallReverted(reason)) => {
                log::warn!("{} rejected minSignatures(): {}", address, reason);
                return Err(MultisigError::NotAMultisig(address));
            }
            Err(e) => return Err(e.into()),
        };
        if self.session.ledger().remember_contract(address)? {
            log::info!("Tracking multisig {} (min {})", address, min);
        }
        Ok(min)
    }

    /// Remember an id entered by hand, once the contract confirms it.
    pub async fn import_transaction(&self, id: TxId) -> Result<MultisigTransaction, MultisigError> {
        let record = self.contract.transaction(id).await?;
        if !record.exists() {
            return Err(MultisigError::TransactionNotFound(id));
        }
        self.session
            .ledger()
            .remember_transaction(self.address(), id)?;
        Ok(record)
    }

    /// Ledger ids for this contract, each with a fresh on-chain record
    pub async fn list_transactions(&self) -> Result<Vec<TrackedTransaction>, MultisigError> {
        let ids = self.session.ledger().list_transactions(&self.address())?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let min = self.contract.min_signatures().await?;
        let mut tracked = Vec::with_capacity(ids.len());
        for id in ids {
            let record = self.contract.transaction(id).await?;
            let status = ProposalStatus::derive(&record, min);
            tracked.push(TrackedTransaction { id, record, status });
        }
        Ok(tracked)
    }

    pub async fn status(&self, id: TxId) -> Result<ProposalStatus, MultisigError> {
        let record = self.contract.transaction(id).await?;
        if !record.exists() {
            return Ok(ProposalStatus::Unknown);
        }
        let min = self.contract.min_signatures().await?;
        Ok(ProposalStatus::derive(&record, min))
    }

    // ------------------------------------------------------------------
    // Proposals
    // ------------------------------------------------------------------

    pub async fn propose_native(&self, to: Address, amount: Amount) -> Result<TxId, MultisigError> {
        validate_recipient(to)?;
        validate_amount(amount)?;
        self.propose(MultisigCall::ProposeNative { to, amount })
            .await
    }

    pub async fn propose_token(
        &self,
        to: Address,
        amount: Amount,
        token: Address,
    ) -> Result<TxId, MultisigError> {
        validate_recipient(to)?;
        validate_amount(amount)?;
        if token.is_zero() {
            return Err(MultisigError::InvalidAddress(
                "token address must not be zero".into(),
            ));
        }
        self.propose(MultisigCall::ProposeToken { to, amount, token })
            .await
    }

    /// Submit a proposal, then recover its id with a static call of the
    /// same call. The id depends only on the parameters, so the static call
    /// after inclusion returns the id of the record just written.
    async fn propose(&self, call: MultisigCall) -> Result<TxId, MultisigError> {
        let key = self.session.account()?;
        self.ensure_signer(key.address()).await?;

        let call = Call::Multisig(call);
        self.send(key, self.address(), Amount::ZERO, call.clone())
            .await?;

        let id = self
            .submitter
            .simulate(key.address(), Some(self.address()), Amount::ZERO, call, self.gas)
            .await?
            .into_id()?;

        if !self.contract.transaction(id).await?.exists() {
            log::error!("Proposal {} missing on {} after confirmation", id, self.address());
            return Err(MultisigError::ProposalNotRecorded(id));
        }

        if !self
            .session
            .ledger()
            .remember_transaction(self.address(), id)?
        {
            log::info!("Proposal {} already known; parameters match an earlier one", id);
        }
        log::info!("Proposed {} on {}", id, self.address());
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Signing and execution
    // ------------------------------------------------------------------

    pub async fn sign(&self, id: TxId) -> Result<Receipt, MultisigError> {
        let key = self.session.account()?;
        let me = key.address();
        self.ensure_signer(me).await?;
        let record = self.pending_record(id).await?;
        if self.contract.has_signed(id, me).await? {
            return Err(MultisigError::AlreadySigned(id));
        }

        let receipt = self
            .send(key, self.address(), Amount::ZERO, Call::Multisig(MultisigCall::Sign { id }))
            .await?;

        let after = self.contract.transaction(id).await?;
        let recorded = self.contract.has_signed(id, me).await?;
        if !recorded || after.signed_count <= record.signed_count {
            log::error!(
                "Signature on {} not recorded (receipt {}, count {} -> {})",
                id,
                receipt.tx_hash,
                record.signed_count,
                after.signed_count
            );
            return Err(MultisigError::SignatureNotRecorded(id));
        }
        log::info!("Signed {} ({} signatures)", id, after.signed_count);
        Ok(receipt)
    }

    pub async fn execute(&self, id: TxId) -> Result<Receipt, MultisigError> {
        let key = self.session.account()?;
        self.ensure_signer(key.address()).await?;
        let record = self.pending_record(id).await?;

        let need = self.contract.min_signatures().await?;
        if record.signed_count < need {
            return Err(MultisigError::InsufficientSignatures {
                have: record.signed_count,
                need,
            });
        }
        let available = self.contract.balance(record.asset()).await?;
        if available < record.amount {
            return Err(MultisigError::InsufficientFunds {
                available,
                required: record.amount,
            });
        }

        let receipt = self
            .send(key, self.address(), Amount::ZERO, Call::Multisig(MultisigCall::Execute { id }))
            .await?;

        if !self.contract.transaction(id).await?.executed {
            log::error!("Execution of {} not recorded (receipt {})", id, receipt.tx_hash);
            return Err(MultisigError::ExecutionNotRecorded(id));
        }
        log::info!("Executed {}: {} to {}", id, record.amount, record.to);
        Ok(receipt)
    }

    // ------------------------------------------------------------------
    // Deposits
    // ------------------------------------------------------------------

    /// Fund a native proposal by attaching `value` to the deposit call.
    pub async fn deposit_native(&self, id: TxId, value: Amount) -> Result<Receipt, MultisigError> {
        validate_amount(value)?;
        let key = self.session.account()?;
        let record = self.pending_record(id).await?;
        if !record.is_native {
            return Err(MultisigError::TokenMismatch {
                expected: record.token,
                actual: Address::ZERO,
            });
        }

        let before = self.contract.tx_balance(id).await?;
        let receipt = self
            .send(key, self.address(), value, Call::Multisig(MultisigCall::Deposit { id }))
            .await?;
        self.ensure_deposited(id, before, value).await?;
        Ok(receipt)
    }

    /// Fund a token proposal.
    ///
    /// Approves the multisig for exactly `amount`, then deposits. If the
    /// deposit fails after the approval landed, the approval is reset to
    /// zero so no standing allowance is left behind.
    pub async fn deposit_token(
        &self,
        id: TxId,
        token: Address,
        amount: Amount,
    ) -> Result<Receipt, MultisigError> {
        validate_amount(amount)?;
        if token.is_zero() {
            return Err(MultisigError::InvalidAddress(
                "token address must not be zero".into(),
            ));
        }
        let key = self.session.account()?;
        let record = self.pending_record(id).await?;
        if record.asset() != token {
            return Err(MultisigError::TokenMismatch {
                expected: record.asset(),
                actual: token,
            });
        }

        let erc20 = TokenContract::new(self.submitter.client(), token);
        let available = erc20.balance_of(key.address()).await?;
        if available < amount {
            return Err(MultisigError::InsufficientFunds {
                available,
                required: amount,
            });
        }

        let before = self.contract.tx_balance(id).await?;
        self.approve(key, token, amount).await?;

        let deposit = Call::Multisig(MultisigCall::DepositToken { id, token, amount });
        let receipt = match self.send(key, self.address(), Amount::ZERO, deposit).await {
            Ok(receipt) => receipt,
            Err(e) => {
                log::warn!("Token deposit to {} failed, revoking approval: {}", id, e);
                if let Err(revoke) = self.approve(key, token, Amount::ZERO).await {
                    log::error!("Could not revoke approval on {}: {}", token, revoke);
                }
                return Err(e);
            }
        };
        self.ensure_deposited(id, before, amount).await?;
        Ok(receipt)
    }

    async fn approve(
        &self,
        key: &AccountKey,
        token: Address,
        amount: Amount,
    ) -> Result<Receipt, MultisigError> {
        let call = Call::Token(TokenCall::Approve {
            spender: self.address(),
            amount,
        });
        self.send(key, token, Amount::ZERO, call).await
    }

    async fn ensure_deposited(
        &self,
        id: TxId,
        before: Amount,
        value: Amount,
    ) -> Result<(), MultisigError> {
        let after = self.contract.tx_balance(id).await?;
        if before.checked_add(value) != Some(after) {
            log::error!("Deposit to {} not recorded ({} -> {})", id, before, after);
            return Err(MultisigError::DepositNotRecorded(id));
        }
        log::info!("Deposited {} to {} (balance {})", value, id, after);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Native balance held by the contract
    pub async fn get_balance(&self) -> Result<Amount, MultisigError> {
        Ok(self.contract.balance(Address::ZERO).await?)
    }

    pub async fn get_token_balance(&self, token: Address) -> Result<Amount, MultisigError> {
        Ok(self.contract.balance(token).await?)
    }

    pub async fn get_tx_balance(&self, id: TxId) -> Result<Amount, MultisigError> {
        Ok(self.contract.tx_balance(id).await?)
    }

    /// `None` when the contract has no record for `id`
    pub async fn get_transaction_data(
        &self,
        id: TxId,
    ) -> Result<Option<MultisigTransaction>, MultisigError> {
        let record = self.contract.transaction(id).await?;
        Ok(record.exists().then_some(record))
    }

    pub async fn get_min_signatures(&self) -> Result<u32, MultisigError> {
        Ok(self.contract.min_signatures().await?)
    }

    pub async fn has_signed(&self, id: TxId, signer: Address) -> Result<bool, MultisigError> {
        Ok(self.contract.has_signed(id, signer).await?)
    }

    pub async fn is_signer(&self, account: Address) -> Result<bool, MultisigError> {
        Ok(self.contract.is_signer(account).await?)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn ensure_signer(&self, account: Address) -> Result<(), MultisigError> {
        if !self.contract.is_signer(account).await? {
            log::warn!("{} is not a signer of {}", account, self.address());
            return Err(MultisigError::NotASigner { account });
        }
        Ok(())
    }

    /// Existing record that has not been executed
    async fn pending_record(&self, id: TxId) -> Result<MultisigTransaction, MultisigError> {
        let record = self.contract.transaction(id).await?;
        if !record.exists() {
            return Err(MultisigError::TransactionNotFound(id));
        }
        if record.executed {
            return Err(MultisigError::AlreadyExecuted(id));
        }
        Ok(record)
    }

    async fn send(
        &self,
        key: &AccountKey,
        to: Address,
        value: Amount,
        call: Call,
    ) -> Result<Receipt, MultisigError> {
        let state = self
            .submitter
            .send_call(key, Some(to), value, call, self.gas)
            .await?;
        confirmed(state)
    }
}

fn confirmed(state: SubmissionState) -> Result<Receipt, MultisigError> {
    match state {
        SubmissionState::Confirmed(receipt) => Ok(receipt),
        SubmissionState::Reverted(receipt) => Err(MultisigError::TransactionReverted {
            tx_hash: receipt.tx_hash,
            reason: receipt
                .revert_reason
                .unwrap_or_else(|| "no reason given".to_string()),
        }),
        other => Err(ChainError::UnexpectedResponse(format!(
            "submission ended without a receipt: {:?}",
            other
        ))
        .into()),
    }
}

fn validate_recipient(to: Address) -> Result<(), MultisigError> {
    if to.is_zero() {
        return Err(MultisigError::InvalidAddress(
            "recipient must not be the zero address".into(),
        ));
    }
    Ok(())
}

fn validate_amount(amount: Amount) -> Result<(), MultisigError> {
    if amount.is_zero() {
        return Err(MultisigError::InvalidAmount("amount must be positive".into()));
    }
    Ok(())
}
