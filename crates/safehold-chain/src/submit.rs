//! Submission pipeline: prepare, sign, send, wait.
//!
//! Every state-changing operation goes through [`Submitter::send_call`],
//! which returns only once the transaction has a receipt (or the wait
//! times out). Nothing is applied optimistically.

use crate::call::{Call, ReadValue};
use crate::client::ChainClient;
use crate::error::ChainError;
use crate::gas::{GasDefaults, GasSettings};
use crate::receipt::{Receipt, SubmissionState};
use crate::tx::{sign_request, TxHash, TxRequest};
use safehold_core::{AccountKey, Address, Amount};
use std::time::Duration;

/// Default time to wait for a receipt
pub const DEFAULT_INCLUSION_TIMEOUT: Duration = Duration::from_secs(120);

/// Default receipt polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long to wait for inclusion and how often to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_INCLUSION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub struct Submitter<'a, C> {
    client: &'a C,
    gas: GasDefaults,
    wait: WaitPolicy,
}

impl<'a, C: ChainClient> Submitter<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            gas: GasDefaults::default(),
            wait: WaitPolicy::default(),
        }
    }

    pub fn with_gas(mut self, gas: GasDefaults) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    pub fn client(&self) -> &'a C {
        self.client
    }

    pub fn gas_defaults(&self) -> &GasDefaults {
        &self.gas
    }

    /// Build a request from `from` with the node's chain id and nonce.
    pub async fn prepare(
        &self,
        from: Address,
        to: Option<Address>,
        value: Amount,
        call: Call,
        gas: Option<GasSettings>,
    ) -> Result<TxRequest, ChainError> {
        let chain_id = self.client.chain_id().await?;
        let nonce = self.client.nonce(from).await?;
        let gas = self.gas.resolve(call.operation(), gas);
        Ok(TxRequest {
            chain_id,
            nonce,
            to,
            value,
            gas,
            call,
        })
    }

    /// Sign and send a prepared request, then wait for its receipt.
    ///
    /// Returns `Confirmed` or `Reverted`. A receipt that never shows up is
    /// `ChainError::InclusionTimeout`; the transaction is not cancelled.
    pub async fn submit(
        &self,
        key: &AccountKey,
        request: TxRequest,
    ) -> Result<SubmissionState, ChainError> {
        let signed = sign_request(key, request)?;
        let hash = self.client.send(signed).await?;
        log::info!("Submitted transaction {}", hash);

        let state = SubmissionState::Unknown.submitted(hash);
        let receipt = self.wait_for_inclusion(hash).await?;
        let state = state.included(receipt);

        match &state {
            SubmissionState::Confirmed(r) => {
                log::info!("Transaction {} confirmed in block {}", hash, r.block_number)
            }
            SubmissionState::Reverted(r) => log::warn!(
                "Transaction {} reverted: {}",
                hash,
                r.revert_reason.as_deref().unwrap_or("no reason")
            ),
            _ => {}
        }
        Ok(state)
    }

    /// Prepare, sign, send and wait in one step.
    pub async fn send_call(
        &self,
        key: &AccountKey,
        to: Option<Address>,
        value: Amount,
        call: Call,
        gas: Option<GasSettings>,
    ) -> Result<SubmissionState, ChainError> {
        let request = self.prepare(key.address(), to, value, call, gas).await?;
        self.submit(key, request).await
    }

    /// Static call of the request `send_call` would build.
    pub async fn simulate(
        &self,
        from: Address,
        to: Option<Address>,
        value: Amount,
        call: Call,
        gas: Option<GasSettings>,
    ) -> Result<ReadValue, ChainError> {
        let request = self.prepare(from, to, value, call, gas).await?;
        self.client.simulate(from, &request).await
    }

    /// Poll for a receipt until one appears or the policy's timeout passes.
    pub async fn wait_for_inclusion(&self, hash: TxHash) -> Result<Receipt, ChainError> {
        let poll = async {
            loop {
                match self.client.receipt(hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => {}
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(self.wait.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.wait.timeout, poll).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "No receipt for {} after {:?}; it may still be included",
                    hash,
                    self.wait.timeout
                );
                Err(ChainError::InclusionTimeout { tx_hash: hash })
            }
        }
    }
}
