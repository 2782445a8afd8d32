//! Recovery coordinator
//!
//! Deploys a social-recovery contract and drives its governance. The
//! contract gates governance on ownership itself; the client only maps the
//! rejection to [`RecoveryError::NotOwner`]. Votes are tallied on chain and
//! read back, never counted locally.

use crate::error::RecoveryError;
use safehold_chain::{
    Call, ChainClient, ChainError, DeployCall, GasDefaults, GasSettings, Receipt, RecoveryCall,
    RecoveryContract, SubmissionState, Submitter, WaitPolicy,
};
use safehold_core::{AccountKey, Address, Amount};
use safehold_wallet::WalletSession;
use serde::Serialize;
use std::collections::HashSet;

/// Revert message of owner-gated functions
const NOT_OWNER_REASON: &str = "caller is not the owner";

/// On-chain tally after a vote lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub votes: u32,
    pub quorum: u32,
    pub recovered: bool,
}

pub struct RecoveryCoordinator<'a, C> {
    client: &'a C,
    session: &'a WalletSession,
    submitter: Submitter<'a, C>,
    gas: Option<GasSettings>,
    address: Option<Address>,
}

impl<'a, C: ChainClient> RecoveryCoordinator<'a, C> {
    /// Coordinator with no contract selected; call [`Self::deploy`] or
    /// [`Self::at`].
    pub fn new(client: &'a C, session: &'a WalletSession) -> Self {
        Self {
            client,
            session,
            submitter: Submitter::new(client),
            gas: None,
            address: None,
        }
    }

    pub fn at(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_gas_defaults(mut self, gas: GasDefaults) -> Self {
        self.submitter = self.submitter.with_gas(gas);
        self
    }

    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.submitter = self.submitter.with_wait(wait);
        self
    }

    pub fn with_gas(mut self, gas: GasSettings) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    fn contract(&self) -> Result<RecoveryContract<'a, C>, RecoveryError> {
        let address = self.address.ok_or(RecoveryError::NoContract)?;
        Ok(RecoveryContract::new(self.client, address))
    }

    /// Deploy a recovery contract owned by the session's account and select
    /// it.
    pub async fn deploy(
        &mut self,
        guardians: Vec<Address>,
        quorum: u32,
    ) -> Result<Address, RecoveryError> {
        validate_guardians(&guardians)?;
        validate_quorum(quorum, guardians.len())?;
        let key = self.session.account()?;

        let count = guardians.len();
        let call = Call::Deploy(DeployCall::Recovery { guardians, quorum });
        let state = self
            .submitter
            .send_call(key, None, Amount::ZERO, call, self.gas)
            .await?;
        let receipt = confirmed(state, key.address())?;
        let address = receipt
            .contract_address
            .ok_or(RecoveryError::DeploymentNotRecorded(receipt.tx_hash))?;

        log::info!(
            "Deployed recovery contract {} ({} guardians, quorum {})",
            address,
            count,
            quorum
        );
        self.address = Some(address);
        Ok(address)
    }

    // ------------------------------------------------------------------
    // Governance
    // ------------------------------------------------------------------

    pub async fn add_recovery_address(&self, guardian: Address) -> Result<Receipt, RecoveryError> {
        if guardian.is_zero() {
            return Err(RecoveryError::InvalidAddress(
                "guardian must not be the zero address".into(),
            ));
        }
        let contract = self.contract()?;
        if contract.is_guardian(guardian).await? {
            return Err(RecoveryError::GuardianExists(guardian));
        }

        let receipt = self
            .send(RecoveryCall::AddRecoveryAddress { guardian })
            .await?;
        if !contract.is_guardian(guardian).await? {
            return Err(RecoveryError::ChangeNotRecorded(format!(
                "{} not added",
                guardian
            )));
        }
        log::info!("Added guardian {} to {}", guardian, contract.address());
        Ok(receipt)
    }

    pub async fn remove_recovery_address(
        &self,
        guardian: Address,
    ) -> Result<Receipt, RecoveryError> {
        let contract = self.contract()?;
        let guardians = contract.guardians().await?;
        if !guardians.contains(&guardian) {
            return Err(RecoveryError::UnknownGuardian(guardian));
        }
        let quorum = contract.quorum().await?;
        validate_quorum(quorum, guardians.len() - 1)?;

        let receipt = self
            .send(RecoveryCall::RemoveRecoveryAddress { guardian })
            .await?;
        if contract.is_guardian(guardian).await? {
            return Err(RecoveryError::ChangeNotRecorded(format!(
                "{} not removed",
                guardian
            )));
        }
        log::info!("Removed guardian {} from {}", guardian, contract.address());
        Ok(receipt)
    }

    /// Set the number of guardian votes needed to recover.
    pub async fn set_quorum(&self, quorum: u32) -> Result<Receipt, RecoveryError> {
        let contract = self.contract()?;
        let guardians = contract.guardians().await?;
        validate_quorum(quorum, guardians.len())?;

        let receipt = self.send(RecoveryCall::SetQuorum { quorum }).await?;
        let now = contract.quorum().await?;
        if now != quorum {
            return Err(RecoveryError::ChangeNotRecorded(format!(
                "quorum is {}, expected {}",
                now, quorum
            )));
        }
        log::info!("Quorum of {} set to {}", contract.address(), quorum);
        Ok(receipt)
    }

    // ------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------

    /// Cast this guardian's vote to hand ownership to `candidate`.
    pub async fn recover(&self, candidate: Address) -> Result<VoteOutcome, RecoveryError> {
        if candidate.is_zero() {
            return Err(RecoveryError::InvalidAddress(
                "candidate must not be the zero address".into(),
            ));
        }
        let contract = self.contract()?;
        let me = self.session.account_address()?;

        if !contract.is_guardian(me).await? {
            log::warn!("{} is not a guardian of {}", me, contract.address());
            return Err(RecoveryError::NotAGuardian { account: me });
        }
        if contract.is_recovered().await? {
            return Err(RecoveryError::AlreadyRecovered);
        }
        if contract.has_voted(me, candidate).await? {
            return Err(RecoveryError::AlreadyVoted { candidate });
        }

        self.send(RecoveryCall::Recover { candidate }).await?;

        if !contract.has_voted(me, candidate).await? {
            log::error!("Vote for {} on {} not recorded", candidate, contract.address());
            return Err(RecoveryError::VoteNotRecorded { candidate });
        }
        let outcome = VoteOutcome {
            votes: contract.vote_count(candidate).await?,
            quorum: contract.quorum().await?,
            recovered: contract.is_recovered().await?,
        };
        log::info!(
            "Voted for {} ({}/{}){}",
            candidate,
            outcome.votes,
            outcome.quorum,
            if outcome.recovered { ", recovered" } else { "" }
        );
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn owner(&self) -> Result<Address, RecoveryError> {
        Ok(self.contract()?.owner().await?)
    }

    pub async fn guardians(&self) -> Result<Vec<Address>, RecoveryError> {
        Ok(self.contract()?.guardians().await?)
    }

    pub async fn is_guardian(&self, account: Address) -> Result<bool, RecoveryError> {
        Ok(self.contract()?.is_guardian(account).await?)
    }

    pub async fn quorum(&self) -> Result<u32, RecoveryError> {
        Ok(self.contract()?.quorum().await?)
    }

    pub async fn is_recovered(&self) -> Result<bool, RecoveryError> {
        Ok(self.contract()?.is_recovered().await?)
    }

    pub async fn has_voted(
        &self,
        guardian: Address,
        candidate: Address,
    ) -> Result<bool, RecoveryError> {
        Ok(self.contract()?.has_voted(guardian, candidate).await?)
    }

    pub async fn vote_count(&self, candidate: Address) -> Result<u32, RecoveryError> {
        Ok(self.contract()?.vote_count(candidate).await?)
    }

    /// Whether the session's account owns the contract. A UI hint only.
    pub async fn is_owner(&self) -> Result<bool, RecoveryError> {
        let me = self.session.account_address()?;
        Ok(self.owner().await? == me)
    }

    async fn send(&self, call: RecoveryCall) -> Result<Receipt, RecoveryError> {
        let address = self.address.ok_or(RecoveryError::NoContract)?;
        let key: &AccountKey = self.session.account()?;
        let state = self
            .submitter
            .send_call(key, Some(address), Amount::ZERO, Call::Recovery(call), self.gas)
            .await?;
        confirmed(state, key.address())
    }
}

fn confirmed(state: SubmissionState, sender: Address) -> Result<Receipt, RecoveryError> {
    match state {
        SubmissionState::Confirmed(receipt) => Ok(receipt),
        SubmissionState::Reverted(receipt) => {
            let reason = receipt
                .revert_reason
                .unwrap_or_else(|| "no reason given".to_string());
            if reason == NOT_OWNER_REASON {
                log::warn!("{} rejected: not the owner", sender);
                return Err(RecoveryError::NotOwner { account: sender });
            }
            Err(RecoveryError::TransactionReverted {
                tx_hash: receipt.tx_hash,
                reason,
            })
        }
        other => Err(ChainError::UnexpectedResponse(format!(
            "submission ended without a receipt: {:?}",
            other
        ))
        .into()),
    }
}

fn validate_guardians(guardians: &[Address]) -> Result<(), RecoveryError> {
    if guardians.is_empty() {
        return Err(RecoveryError::InvalidGuardians(
            "at least one guardian required".into(),
        ));
    }
    let mut seen = HashSet::with_capacity(guardians.len());
    for guardian in guardians {
        if guardian.is_zero() {
            return Err(RecoveryError::InvalidGuardians(
                "zero address is not a guardian".into(),
            ));
        }
        if !seen.insert(guardian) {
            return Err(RecoveryError::InvalidGuardians(format!(
                "{} listed twice",
                guardian
            )));
        }
    }
    Ok(())
}

fn validate_quorum(quorum: u32, guardians: usize) -> Result<(), RecoveryError> {
    if quorum == 0 || quorum as usize > guardians {
        return Err(RecoveryError::InvalidQuorum { quorum, guardians });
    }
    Ok(())
}
