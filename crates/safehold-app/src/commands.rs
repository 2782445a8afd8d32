//! Commands: the boundary between the UI and the wallet core
//!
//! One function per user operation. Every failure is caught here and
//! returned as a [`CommandResult`] with a message and its [`ErrorKind`];
//! nothing panics past this layer. Inputs arrive as strings the way a UI
//! sends them and are parsed here.

use crate::app::App;
use safehold_chain::{ChainClient, ChainError, MultisigTransaction, Receipt, TokenContract};
use safehold_core::password::{analyze, PasswordStrength};
use safehold_core::{Address, Amount, ErrorKind, TxId, NATIVE_DECIMALS};
use safehold_multisig::{MultisigError, ProposalStatus, TrackedTransaction};
use safehold_recovery::{RecoveryError, VoteOutcome};
use safehold_wallet::{LockState, VaultRecord, WalletError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for commands
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub kind: Option<ErrorKind>,
}

impl<T> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn err(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
            kind: Some(kind),
        }
    }
}

impl<T> From<Result<T, CommandError>> for CommandResult<T> {
    fn from(result: Result<T, CommandError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                log::debug!("Command failed ({}): {}", e.kind, e.message);
                Self::err(e.kind, e.message)
            }
        }
    }
}

/// Errors that know their category
pub trait Categorized {
    fn kind(&self) -> ErrorKind;
}

impl Categorized for WalletError {
    fn kind(&self) -> ErrorKind {
        WalletError::kind(self)
    }
}

impl Categorized for ChainError {
    fn kind(&self) -> ErrorKind {
        ChainError::kind(self)
    }
}

impl Categorized for MultisigError {
    fn kind(&self) -> ErrorKind {
        MultisigError::kind(self)
    }
}

impl Categorized for RecoveryError {
    fn kind(&self) -> ErrorKind {
        RecoveryError::kind(self)
    }
}

/// A classified failure on its way into a [`CommandResult`]
#[derive(Debug)]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CommandError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }
}

impl<E: Categorized + fmt::Display> From<E> for CommandError {
    fn from(e: E) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

type CmdResult<T> = Result<T, CommandError>;

fn parse_address(what: &str, s: &str) -> CmdResult<Address> {
    s.trim()
        .parse()
        .map_err(|e| CommandError::invalid(format!("Invalid {} address: {}", what, e)))
}

fn parse_id(s: &str) -> CmdResult<TxId> {
    s.trim()
        .parse()
        .map_err(|e| CommandError::invalid(format!("Invalid transaction id: {}", e)))
}

fn parse_amount(s: &str, decimals: u8) -> CmdResult<Amount> {
    Amount::parse_units(s.trim(), decimals)
        .map_err(|e| CommandError::invalid(format!("Invalid amount: {}", e)))
}

// ============================================================================
// Wallet Commands
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStatus {
    pub state: LockState,
    pub address: Option<Address>,
    pub remember_unlock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletCreated {
    pub address: Address,
    pub created_at: u64,
    pub password_strength: String,
    pub password_warnings: Vec<String>,
}

fn created(record: VaultRecord, password: &str) -> WalletCreated {
    let analysis = analyze(password);
    let strength = match analysis.strength {
        PasswordStrength::Weak => "weak",
        PasswordStrength::Fair => "fair",
        PasswordStrength::Strong => "strong",
    };
    WalletCreated {
        address: record.address,
        created_at: record.timestamp,
        password_strength: strength.to_string(),
        password_warnings: analysis.warnings,
    }
}

pub fn wallet_status(app: &App) -> CommandResult<WalletStatus> {
    let vault = app.session().vault();
    CommandResult::ok(WalletStatus {
        state: vault.state(),
        address: vault.address(),
        remember_unlock: vault.options().remember_unlock,
    })
}

/// Generate a new account key and encrypt it under `password`
pub fn create_wallet(app: &mut App, password: &str) -> CommandResult<WalletCreated> {
    let result = app.session_mut().vault_mut().setup(password);
    result
        .map(|record| created(record, password))
        .map_err(CommandError::from)
        .into()
}

/// Import a 64-hex private key
pub fn import_wallet(app: &mut App, private_key: &str, password: &str) -> CommandResult<WalletCreated> {
    let result = app.session_mut().vault_mut().import(private_key, password);
    result
        .map(|record| created(record, password))
        .map_err(CommandError::from)
        .into()
}

/// `false` for a wrong password; the wallet stays locked
pub fn unlock_wallet(app: &mut App, password: &str) -> CommandResult<bool> {
    app.session_mut()
        .vault_mut()
        .unlock(password)
        .map_err(CommandError::from)
        .into()
}

pub fn lock_wallet(app: &mut App) -> CommandResult<WalletStatus> {
    app.session_mut().vault_mut().lock();
    wallet_status(app)
}

/// Delete everything. Irreversible.
pub fn wipe_wallet(app: &mut App) -> CommandResult<()> {
    app.session_mut().wipe().map_err(CommandError::from).into()
}

pub fn export_private_key(app: &App, password: &str) -> CommandResult<String> {
    app.session()
        .vault()
        .export_private_key(password)
        .map(|key| key.as_str().to_string())
        .map_err(CommandError::from)
        .into()
}

pub fn change_password(app: &mut App, old: &str, new: &str) -> CommandResult<()> {
    app.session_mut()
        .vault_mut()
        .change_password(old, new)
        .map_err(CommandError::from)
        .into()
}

// ============================================================================
// Ledger Commands
// ============================================================================

pub fn list_contracts(app: &App) -> CommandResult<Vec<Address>> {
    app.session()
        .ledger()
        .list_contracts()
        .map_err(CommandError::from)
        .into()
}

pub fn list_transaction_ids(app: &App, contract: &str) -> CommandResult<Vec<TxId>> {
    let result = (|| -> CmdResult<Vec<TxId>> {
        let contract = parse_address("contract", contract)?;
        Ok(app.session().ledger().list_transactions(&contract)?)
    })();
    result.into()
}

pub fn forget_contract(app: &App, contract: &str) -> CommandResult<bool> {
    let result = (|| -> CmdResult<bool> {
        let contract = parse_address("contract", contract)?;
        Ok(app.session().ledger().forget_contract(&contract)?)
    })();
    result.into()
}

// ============================================================================
// Multisig Commands
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigOverview {
    pub address: Address,
    pub min_signatures: u32,
    pub balance: Amount,
    pub is_signer: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    pub id: TxId,
    pub record: MultisigTransaction,
    pub status: ProposalStatus,
    pub tx_balance: Amount,
}

/// Validate a multisig address and add it to the ledger
pub async fn track_multisig<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
) -> CommandResult<u32> {
    let result: CmdResult<u32> = async {
        let contract = parse_address("contract", contract)?;
        Ok(app.multisig(client, contract).track_contract().await?)
    }
    .await;
    result.into()
}

pub async fn multisig_overview<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
) -> CommandResult<MultisigOverview> {
    let result: CmdResult<MultisigOverview> = async {
        let contract = parse_address("contract", contract)?;
        let coordinator = app.multisig(client, contract);
        let is_signer = match app.session().account_address() {
            Ok(me) => coordinator.is_signer(me).await?,
            Err(_) => false,
        };
        Ok(MultisigOverview {
            address: contract,
            min_signatures: coordinator.get_min_signatures().await?,
            balance: coordinator.get_balance().await?,
            is_signer,
        })
    }
    .await;
    result.into()
}

/// Propose paying `amount` (decimal, native units) to `to`
pub async fn propose_native<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    to: &str,
    amount: &str,
) -> CommandResult<TxId> {
    let result: CmdResult<TxId> = async {
        let contract = parse_address("contract", contract)?;
        let to = parse_address("recipient", to)?;
        let amount = parse_amount(amount, NATIVE_DECIMALS)?;
        Ok(app
            .multisig(client, contract)
            .propose_native(to, amount)
            .await?)
    }
    .await;
    result.into()
}

/// Propose paying `amount` of `token`, in the token's own decimals
pub async fn propose_token<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    to: &str,
    amount: &str,
    token: &str,
) -> CommandResult<TxId> {
    let result: CmdResult<TxId> = async {
        let contract = parse_address("contract", contract)?;
        let to = parse_address("recipient", to)?;
        let token = parse_address("token", token)?;
        let decimals = TokenContract::new(client, token).decimals().await?;
        let amount = parse_amount(amount, decimals)?;
        Ok(app
            .multisig(client, contract)
            .propose_token(to, amount, token)
            .await?)
    }
    .await;
    result.into()
}

pub async fn sign_transaction<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    id: &str,
) -> CommandResult<Receipt> {
    let result: CmdResult<Receipt> = async {
        let contract = parse_address("contract", contract)?;
        let id = parse_id(id)?;
        Ok(app.multisig(client, contract).sign(id).await?)
    }
    .await;
    result.into()
}

pub async fn execute_transaction<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    id: &str,
) -> CommandResult<Receipt> {
    let result: CmdResult<Receipt> = async {
        let contract = parse_address("contract", contract)?;
        let id = parse_id(id)?;
        Ok(app.multisig(client, contract).execute(id).await?)
    }
    .await;
    result.into()
}

pub async fn deposit_native<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    id: &str,
    amount: &str,
) -> CommandResult<Receipt> {
    let result: CmdResult<Receipt> = async {
        let contract = parse_address("contract", contract)?;
        let id = parse_id(id)?;
        let amount = parse_amount(amount, NATIVE_DECIMALS)?;
        Ok(app
            .multisig(client, contract)
            .deposit_native(id, amount)
            .await?)
    }
    .await;
    result.into()
}

pub async fn deposit_token<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    id: &str,
    token: &str,
    amount: &str,
) -> CommandResult<Receipt> {
    let result: CmdResult<Receipt> = async {
        let contract = parse_address("contract", contract)?;
        let id = parse_id(id)?;
        let token = parse_address("token", token)?;
        let decimals = TokenContract::new(client, token).decimals().await?;
        let amount = parse_amount(amount, decimals)?;
        Ok(app
            .multisig(client, contract)
            .deposit_token(id, token, amount)
            .await?)
    }
    .await;
    result.into()
}

/// Add an id learned out of band to the ledger
pub async fn import_transaction<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    id: &str,
) -> CommandResult<MultisigTransaction> {
    let result: CmdResult<MultisigTransaction> = async {
        let contract = parse_address("contract", contract)?;
        let id = parse_id(id)?;
        Ok(app
            .multisig(client, contract)
            .import_transaction(id)
            .await?)
    }
    .await;
    result.into()
}

/// `None` when the contract has no record for the id
pub async fn transaction_details<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    id: &str,
) -> CommandResult<Option<TransactionDetails>> {
    let result: CmdResult<Option<TransactionDetails>> = async {
        let contract = parse_address("contract", contract)?;
        let id = parse_id(id)?;
        let coordinator = app.multisig(client, contract);
        let Some(record) = coordinator.get_transaction_data(id).await? else {
            return Ok(None);
        };
        Ok(Some(TransactionDetails {
            id,
            record,
            status: coordinator.status(id).await?,
            tx_balance: coordinator.get_tx_balance(id).await?,
        }))
    }
    .await;
    result.into()
}

pub async fn multisig_transactions<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
) -> CommandResult<Vec<TrackedTransaction>> {
    let result: CmdResult<Vec<TrackedTransaction>> = async {
        let contract = parse_address("contract", contract)?;
        Ok(app.multisig(client, contract).list_transactions().await?)
    }
    .await;
    result.into()
}

// ============================================================================
// Recovery Commands
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryOverview {
    pub address: Address,
    pub owner: Address,
    pub guardians: Vec<Address>,
    pub quorum: u32,
    pub recovered: bool,
    pub is_owner: bool,
}

pub async fn deploy_recovery<C: ChainClient>(
    app: &App,
    client: &C,
    guardians: &[String],
    quorum: u32,
) -> CommandResult<Address> {
    let result: CmdResult<Address> = async {
        let guardians = guardians
            .iter()
            .map(|g| parse_address("guardian", g))
            .collect::<CmdResult<Vec<_>>>()?;
        let mut coordinator = app.recovery(client);
        Ok(coordinator.deploy(guardians, quorum).await?)
    }
    .await;
    result.into()
}

pub async fn recovery_overview<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
) -> CommandResult<RecoveryOverview> {
    let result: CmdResult<RecoveryOverview> = async {
        let address = parse_address("contract", contract)?;
        let coordinator = app.recovery(client).at(address);
        let owner = coordinator.owner().await?;
        let is_owner = app.session().account_address().ok() == Some(owner);
        Ok(RecoveryOverview {
            address,
            owner,
            guardians: coordinator.guardians().await?,
            quorum: coordinator.quorum().await?,
            recovered: coordinator.is_recovered().await?,
            is_owner,
        })
    }
    .await;
    result.into()
}

pub async fn add_guardian<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    guardian: &str,
) -> CommandResult<Receipt> {
    let result: CmdResult<Receipt> = async {
        let address = parse_address("contract", contract)?;
        let guardian = parse_address("guardian", guardian)?;
        Ok(app
            .recovery(client)
            .at(address)
            .add_recovery_address(guardian)
            .await?)
    }
    .await;
    result.into()
}

pub async fn remove_guardian<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    guardian: &str,
) -> CommandResult<Receipt> {
    let result: CmdResult<Receipt> = async {
        let address = parse_address("contract", contract)?;
        let guardian = parse_address("guardian", guardian)?;
        Ok(app
            .recovery(client)
            .at(address)
            .remove_recovery_address(guardian)
            .await?)
    }
    .await;
    result.into()
}

pub async fn set_quorum<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    quorum: u32,
) -> CommandResult<Receipt> {
    let result: CmdResult<Receipt> = async {
        let address = parse_address("contract", contract)?;
        Ok(app.recovery(client).at(address).set_quorum(quorum).await?)
    }
    .await;
    result.into()
}

/// Cast this guardian's vote for `candidate`
pub async fn vote_recovery<C: ChainClient>(
    app: &App,
    client: &C,
    contract: &str,
    candidate: &str,
) -> CommandResult<VoteOutcome> {
    let result: CmdResult<VoteOutcome> = async {
        let address = parse_address("contract", contract)?;
        let candidate = parse_address("candidate", candidate)?;
        Ok(app.recovery(client).at(address).recover(candidate).await?)
    }
    .await;
    result.into()
}
