//! In-memory chain for tests.
//!
//! [`MockChain`] implements [`ChainClient`] and executes the multisig,
//! recovery and ERC-20 semantics the coordinators rely on: signature
//! recovery, chain id and nonce checks, gas charged to the sender, atomic
//! revert of failed calls, and deterministic proposal ids.
//!
//! [`Faults`] make it misbehave the ways a real node or contract can:
//! report success without applying a proposal, signature, deposit, vote
//! or execution, or never include a transaction.

use crate::call::{
    Call, DeployCall, MultisigCall, MultisigRead, MultisigTransaction, ReadCall, ReadValue,
    RecoveryCall, RecoveryRead, TokenCall, TokenRead,
};
use crate::client::ChainClient;
use crate::error::ChainError;
use crate::receipt::{Receipt, ReceiptStatus};
use crate::tx::{SignedTx, TxHash, TxRequest};
use safehold_core::{keccak256, Address, Amount, TxId};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Chain id the mock reports unless told otherwise
pub const MOCK_CHAIN_ID: u64 = 1337;

// Gas actually consumed per operation type
const TRANSFER_GAS_USED: u64 = 21_000;
const TOKEN_GAS_USED: u64 = 50_000;
const CONTRACT_GAS_USED: u64 = 90_000;
const DEPLOY_GAS_USED: u64 = 1_500_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    /// `propose` succeeds without storing the record
    pub drop_proposals: bool,
    /// `sign` succeeds without recording the signature
    pub drop_signatures: bool,
    /// `execute` succeeds without executing
    pub drop_executions: bool,
    /// Deposits move the funds but never credit the proposal
    pub drop_deposits: bool,
    /// `recover` succeeds without counting the vote
    pub drop_votes: bool,
    /// Accepted transactions are never included until released
    pub stall_inclusion: bool,
}

#[derive(Debug, Clone)]
struct MultisigState {
    signers: Vec<Address>,
    min_signatures: u32,
    transactions: HashMap<TxId, MultisigTransaction>,
    signatures: HashSet<(TxId, Address)>,
}

#[derive(Debug, Clone)]
struct RecoveryState {
    owner: Address,
    guardians: Vec<Address>,
    quorum: u32,
    recovered: bool,
    votes: HashSet<(Address, Address)>,
    vote_counts: HashMap<Address, u32>,
}

#[derive(Debug, Clone)]
struct TokenState {
    name: String,
    symbol: String,
    decimals: u8,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

#[derive(Debug, Clone)]
enum Contract {
    Multisig(MultisigState),
    Recovery(RecoveryState),
    Token(TokenState),
}

/// Balances and contract storage. Cloned before each call so a revert
/// discards every change the call made.
#[derive(Debug, Clone, Default)]
struct World {
    balances: HashMap<Address, Amount>,
    contracts: HashMap<Address, Contract>,
}

struct MockState {
    chain_id: u64,
    block_number: u64,
    world: World,
    nonces: HashMap<Address, u64>,
    receipts: HashMap<TxHash, Receipt>,
    stalled: Vec<(Address, SignedTx, TxHash)>,
    faults: Faults,
    revert_next: Option<String>,
    installed: u64,
    sent: usize,
}

/// Per-call execution context
struct Ctx {
    sender: Address,
    nonce: u64,
    value: Amount,
    block: u64,
    faults: Faults,
}

type Revert = String;

pub struct MockChain {
    state: Mutex<MockState>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self::with_chain_id(MOCK_CHAIN_ID)
    }

    pub fn with_chain_id(chain_id: u64) -> Self {
        Self {
            state: Mutex::new(MockState {
                chain_id,
                block_number: 0,
                world: World::default(),
                nonces: HashMap::new(),
                receipts: HashMap::new(),
                stalled: Vec::new(),
                faults: Faults::default(),
                revert_next: None,
                installed: 0,
                sent: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock chain poisoned")
    }

    pub fn chain_id_value(&self) -> u64 {
        self.lock().chain_id
    }

    /// Credit native currency to an account
    pub fn fund(&self, account: Address, amount: Amount) {
        credit(&mut self.lock().world.balances, account, amount);
    }

    pub fn balance_of(&self, account: Address) -> Amount {
        balance(&self.lock().world.balances, account)
    }

    pub fn nonce_of(&self, account: Address) -> u64 {
        self.lock().nonces.get(&account).copied().unwrap_or(0)
    }

    pub fn block_number(&self) -> u64 {
        self.lock().block_number
    }

    /// Transactions accepted by `send`
    pub fn sent_count(&self) -> usize {
        self.lock().sent
    }

    pub fn set_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    /// Revert the next included transaction with `reason`
    pub fn revert_next(&self, reason: &str) {
        self.lock().revert_next = Some(reason.to_string());
    }

    /// Include every stalled transaction and stop stalling.
    pub fn release_stalled(&self) {
        let mut state = self.lock();
        state.faults.stall_inclusion = false;
        let stalled = std::mem::take(&mut state.stalled);
        for (sender, tx, hash) in stalled {
            include(&mut state, sender, &tx, hash);
        }
    }

    /// Place a multisig contract directly, bypassing deployment
    pub fn install_multisig(&self, signers: &[Address], min_signatures: u32) -> Address {
        self.install(Contract::Multisig(MultisigState {
            signers: signers.to_vec(),
            min_signatures,
            transactions: HashMap::new(),
            signatures: HashSet::new(),
        }))
    }

    pub fn install_recovery(&self, owner: Address, guardians: &[Address], quorum: u32) -> Address {
        self.install(Contract::Recovery(RecoveryState {
            owner,
            guardians: guardians.to_vec(),
            quorum,
            recovered: false,
            votes: HashSet::new(),
            vote_counts: HashMap::new(),
        }))
    }

    /// ERC-20 with the whole supply held by `holder`
    pub fn install_token(
        &self,
        name: &str,
        symbol: &str,
        decimals: u8,
        holder: Address,
        supply: Amount,
    ) -> Address {
        let mut balances = HashMap::new();
        balances.insert(holder, supply);
        self.install(Contract::Token(TokenState {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            balances,
            allowances: HashMap::new(),
        }))
    }

    fn install(&self, contract: Contract) -> Address {
        let mut state = self.lock();
        state.installed += 1;
        let mut seed = b"safehold-mock".to_vec();
        seed.extend_from_slice(&state.installed.to_be_bytes());
        let address = derive_address(&seed);
        state.world.contracts.insert(address, contract);
        address
    }

    pub fn multisig_transaction(&self, contract: Address, id: TxId) -> Option<MultisigTransaction> {
        match self.lock().world.contracts.get(&contract) {
            Some(Contract::Multisig(ms)) => ms.transactions.get(&id).cloned(),
            _ => None,
        }
    }

    pub fn token_balance(&self, token: Address, owner: Address) -> Amount {
        match self.lock().world.contracts.get(&token) {
            Some(Contract::Token(t)) => balance(&t.balances, owner),
            _ => Amount::ZERO,
        }
    }

    pub fn token_allowance(&self, token: Address, owner: Address, spender: Address) -> Amount {
        match self.lock().world.contracts.get(&token) {
            Some(Contract::Token(t)) => t
                .allowances
                .get(&(owner, spender))
                .copied()
                .unwrap_or(Amount::ZERO),
            _ => Amount::ZERO,
        }
    }
}

impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.lock().chain_id)
    }

    async fn nonce(&self, account: Address) -> Result<u64, ChainError> {
        Ok(self.nonce_of(account))
    }

    async fn native_balance(&self, account: Address) -> Result<Amount, ChainError> {
        Ok(self.balance_of(account))
    }

    async fn read(&self, contract: Address, call: ReadCall) -> Result<ReadValue, ChainError> {
        read(&self.lock().world, contract, &call).map_err(ChainError::CallReverted)
    }

    async fn simulate(&self, from: Address, request: &TxRequest) -> Result<ReadValue, ChainError> {
        let state = self.lock();
        let mut world = state.world.clone();
        let ctx = Ctx {
            sender: from,
            nonce: request.nonce,
            value: request.value,
            block: state.block_number + 1,
            faults: Faults::default(),
        };
        apply(&mut world, &ctx, request)
            .map(|(value, _)| value)
            .map_err(ChainError::CallReverted)
    }

    async fn send(&self, tx: SignedTx) -> Result<TxHash, ChainError> {
        let sender = tx.sender()?;
        let hash = tx.hash()?;
        let request = tx.request();

        let mut state = self.lock();
        if request.chain_id != state.chain_id {
            return Err(ChainError::Rpc(format!(
                "invalid chain id {}",
                request.chain_id
            )));
        }
        let expected = state.nonces.get(&sender).copied().unwrap_or(0);
        if request.nonce != expected {
            return Err(ChainError::NonceMismatch {
                expected,
                got: request.nonce,
            });
        }
        let max_fee = request
            .gas
            .max_fee()
            .ok_or(ChainError::InsufficientFundsForGas)?;
        let needed = max_fee
            .checked_add(request.value)
            .ok_or(ChainError::InsufficientFundsForGas)?;
        if balance(&state.world.balances, sender) < needed {
            return Err(ChainError::InsufficientFundsForGas);
        }

        state.nonces.insert(sender, expected + 1);
        state.sent += 1;

        if state.faults.stall_inclusion {
            state.stalled.push((sender, tx, hash));
        } else {
            include(&mut state, sender, &tx, hash);
        }
        Ok(hash)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<Receipt>, ChainError> {
        Ok(self.lock().receipts.get(&hash).cloned())
    }
}

/// Mine one transaction into its own block.
fn include(state: &mut MockState, sender: Address, tx: &SignedTx, hash: TxHash) {
    let request = tx.request();
    state.block_number += 1;

    let needed_gas = match request.call {
        Call::Transfer => TRANSFER_GAS_USED,
        Call::Token(_) => TOKEN_GAS_USED,
        Call::Multisig(_) | Call::Recovery(_) => CONTRACT_GAS_USED,
        Call::Deploy(_) => DEPLOY_GAS_USED,
    };

    let ctx = Ctx {
        sender,
        nonce: request.nonce,
        value: request.value,
        block: state.block_number,
        faults: state.faults,
    };

    let (gas_used, outcome) = if request.gas.gas_limit < needed_gas {
        (request.gas.gas_limit, Err("out of gas".to_string()))
    } else if let Some(reason) = state.revert_next.take() {
        (needed_gas, Err(reason))
    } else {
        let mut world = state.world.clone();
        let outcome = apply(&mut world, &ctx, request);
        if outcome.is_ok() {
            state.world = world;
        }
        (needed_gas, outcome)
    };

    let fee = request
        .gas
        .gas_price
        .checked_mul(u128::from(gas_used))
        .unwrap_or(Amount::ZERO);
    let remaining = balance(&state.world.balances, sender).saturating_sub(fee);
    state.world.balances.insert(sender, remaining);

    let receipt = match outcome {
        Ok((_, contract_address)) => Receipt {
            tx_hash: hash,
            status: ReceiptStatus::Success,
            block_number: state.block_number,
            gas_used,
            contract_address,
            revert_reason: None,
        },
        Err(reason) => Receipt {
            tx_hash: hash,
            status: ReceiptStatus::Reverted,
            block_number: state.block_number,
            gas_used,
            contract_address: None,
            revert_reason: Some(reason),
        },
    };
    state.receipts.insert(hash, receipt);
}

/// Execute a request against `world`. On `Err` the caller discards `world`.
fn apply(
    world: &mut World,
    ctx: &Ctx,
    request: &TxRequest,
) -> Result<(ReadValue, Option<Address>), Revert> {
    if let Call::Deploy(deploy) = &request.call {
        if !ctx.value.is_zero() {
            return Err("non-payable constructor".into());
        }
        let address = deploy_contract(world, ctx, deploy)?;
        return Ok((ReadValue::Address(address), Some(address)));
    }

    let to = request.to.ok_or("missing recipient")?;
    let payable = matches!(
        request.call,
        Call::Transfer | Call::Multisig(MultisigCall::Deposit { .. })
    );
    if !ctx.value.is_zero() {
        if !payable {
            return Err("non-payable function".into());
        }
        debit(&mut world.balances, ctx.sender, ctx.value)?;
        credit(&mut world.balances, to, ctx.value);
    }

    let value = match &request.call {
        Call::Transfer | Call::Deploy(_) => ReadValue::Unit,
        Call::Multisig(call) => multisig_call(world, ctx, to, call)?,
        Call::Recovery(call) => {
            let Some(Contract::Recovery(rc)) = world.contracts.get_mut(&to) else {
                return Err("no recovery contract at address".into());
            };
            recovery_call(rc, ctx, call)?
        }
        Call::Token(call) => {
            let token = token_mut(world, to)?;
            match call {
                TokenCall::Approve { spender, amount } => {
                    token.allowances.insert((ctx.sender, *spender), *amount);
                }
                TokenCall::Transfer { to, amount } => {
                    debit(&mut token.balances, ctx.sender, *amount)?;
                    credit(&mut token.balances, *to, *amount);
                }
            }
            ReadValue::Bool(true)
        }
    };
    Ok((value, None))
}

fn deploy_contract(world: &mut World, ctx: &Ctx, deploy: &DeployCall) -> Result<Address, Revert> {
    let mut seed = ctx.sender.as_bytes().to_vec();
    seed.extend_from_slice(&ctx.nonce.to_be_bytes());
    let address = derive_address(&seed);

    let contract = match deploy {
        DeployCall::Multisig {
            signers,
            min_signatures,
        } => {
            if signers.is_empty()
                || signers.iter().any(Address::is_zero)
                || *min_signatures == 0
                || *min_signatures as usize > signers.len()
            {
                return Err("invalid multisig parameters".into());
            }
            Contract::Multisig(MultisigState {
                signers: signers.clone(),
                min_signatures: *min_signatures,
                transactions: HashMap::new(),
                signatures: HashSet::new(),
            })
        }
        DeployCall::Recovery { guardians, quorum } => {
            let unique: HashSet<&Address> = guardians.iter().collect();
            if guardians.is_empty()
                || unique.len() != guardians.len()
                || guardians.iter().any(Address::is_zero)
                || *quorum == 0
                || *quorum as usize > guardians.len()
            {
                return Err("invalid recovery parameters".into());
            }
            Contract::Recovery(RecoveryState {
                owner: ctx.sender,
                guardians: guardians.clone(),
                quorum: *quorum,
                recovered: false,
                votes: HashSet::new(),
                vote_counts: HashMap::new(),
            })
        }
        DeployCall::Token {
            name,
            symbol,
            decimals,
            supply,
        } => {
            let mut balances = HashMap::new();
            balances.insert(ctx.sender, *supply);
            Contract::Token(TokenState {
                name: name.clone(),
                symbol: symbol.clone(),
                decimals: *decimals,
                balances,
                allowances: HashMap::new(),
            })
        }
    };
    world.contracts.insert(address, contract);
    Ok(address)
}

fn multisig_call(
    world: &mut World,
    ctx: &Ctx,
    contract: Address,
    call: &MultisigCall,
) -> Result<ReadValue, Revert> {
    let ms = multisig_mut(world, contract)?;
    let deposit = matches!(
        call,
        MultisigCall::Deposit { .. } | MultisigCall::DepositToken { .. }
    );
    if !deposit && !ms.signers.contains(&ctx.sender) {
        return Err("not a signer".into());
    }

    match call {
        MultisigCall::ProposeNative { to, amount } => {
            propose(ms, ctx, *to, *amount, Address::ZERO, true)
        }
        MultisigCall::ProposeToken { to, amount, token } => {
            if token.is_zero() {
                return Err("invalid token".into());
            }
            propose(ms, ctx, *to, *amount, *token, false)
        }
        MultisigCall::Sign { id } => {
            pending_record(ms, id)?;
            if ms.signatures.contains(&(*id, ctx.sender)) {
                return Err("already signed".into());
            }
            if ctx.faults.drop_signatures {
                return Ok(ReadValue::Unit);
            }
            ms.signatures.insert((*id, ctx.sender));
            if let Some(record) = ms.transactions.get_mut(id) {
                record.signed_count += 1;
            }
            Ok(ReadValue::Unit)
        }
        MultisigCall::Execute { id } => {
            let record = pending_record(ms, id)?;
            if record.signed_count < ms.min_signatures {
                return Err("not enough signatures".into());
            }
            if ctx.faults.drop_executions {
                return Ok(ReadValue::Unit);
            }

            if record.is_native {
                debit(&mut world.balances, contract, record.amount)
                    .map_err(|_| "insufficient contract balance".to_string())?;
                credit(&mut world.balances, record.to, record.amount);
            } else {
                let token = token_mut(world, record.token)?;
                debit(&mut token.balances, contract, record.amount)
                    .map_err(|_| "insufficient contract balance".to_string())?;
                credit(&mut token.balances, record.to, record.amount);
            }

            let ms = multisig_mut(world, contract)?;
            if let Some(stored) = ms.transactions.get_mut(id) {
                stored.executed = true;
                stored.balance = stored.balance.saturating_sub(record.amount);
            }
            Ok(ReadValue::Unit)
        }
        MultisigCall::Deposit { id } => {
            let record = pending_record(ms, id)?;
            if !record.is_native {
                return Err("not a native proposal".into());
            }
            if ctx.value.is_zero() {
                return Err("no value sent".into());
            }
            if !ctx.faults.drop_deposits {
                add_tx_balance(ms, id, ctx.value)?;
            }
            Ok(ReadValue::Unit)
        }
        MultisigCall::DepositToken { id, token, amount } => {
            let record = pending_record(ms, id)?;
            if record.is_native {
                return Err("not a token proposal".into());
            }
            if record.token != *token {
                return Err("token mismatch".into());
            }
            if amount.is_zero() {
                return Err("amount must be positive".into());
            }

            let erc20 = token_mut(world, *token)?;
            let allowance = erc20
                .allowances
                .get(&(ctx.sender, contract))
                .copied()
                .unwrap_or(Amount::ZERO);
            let remaining = allowance
                .checked_sub(*amount)
                .ok_or("insufficient allowance")?;
            debit(&mut erc20.balances, ctx.sender, *amount)?;
            credit(&mut erc20.balances, contract, *amount);
            erc20.allowances.insert((ctx.sender, contract), remaining);

            if !ctx.faults.drop_deposits {
                add_tx_balance(multisig_mut(world, contract)?, id, *amount)?;
            }
            Ok(ReadValue::Unit)
        }
    }
}

fn propose(
    ms: &mut MultisigState,
    ctx: &Ctx,
    to: Address,
    amount: Amount,
    token: Address,
    is_native: bool,
) -> Result<ReadValue, Revert> {
    if to.is_zero() {
        return Err("invalid recipient".into());
    }
    if amount.is_zero() {
        return Err("amount must be positive".into());
    }

    let id = proposal_id(to, amount, token, is_native);
    if !ctx.faults.drop_proposals && !ms.transactions.contains_key(&id) {
        ms.transactions.insert(
            id,
            MultisigTransaction {
                to,
                is_native,
                token,
                amount,
                proposer: ctx.sender,
                timestamp: ctx.block,
                signed_count: 1,
                executed: false,
                balance: Amount::ZERO,
            },
        );
        ms.signatures.insert((id, ctx.sender));
    }
    Ok(ReadValue::Id(id))
}

/// The contract's id: a pure function of the proposal parameters
pub fn proposal_id(to: Address, amount: Amount, token: Address, is_native: bool) -> TxId {
    let mut preimage = Vec::with_capacity(20 + 16 + 20 + 1);
    preimage.extend_from_slice(to.as_bytes());
    preimage.extend_from_slice(&amount.base_units().to_be_bytes());
    preimage.extend_from_slice(token.as_bytes());
    preimage.push(u8::from(is_native));
    TxId::from_bytes(keccak256(&preimage))
}

/// Existing, not yet executed record
fn pending_record(ms: &MultisigState, id: &TxId) -> Result<MultisigTransaction, Revert> {
    let record = ms
        .transactions
        .get(id)
        .ok_or("transaction does not exist")?;
    if record.executed {
        return Err("already executed".into());
    }
    Ok(record.clone())
}

fn add_tx_balance(ms: &mut MultisigState, id: &TxId, amount: Amount) -> Result<(), Revert> {
    let record = ms
        .transactions
        .get_mut(id)
        .ok_or("transaction does not exist")?;
    record.balance = record.balance.checked_add(amount).ok_or("overflow")?;
    Ok(())
}

fn recovery_call(rc: &mut RecoveryState, ctx: &Ctx, call: &RecoveryCall) -> Result<ReadValue, Revert> {
    let owner_only = !matches!(call, RecoveryCall::Recover { .. });
    if owner_only && ctx.sender != rc.owner {
        return Err("caller is not the owner".into());
    }

    match call {
        RecoveryCall::AddRecoveryAddress { guardian } => {
            if guardian.is_zero() {
                return Err("invalid guardian".into());
            }
            if rc.guardians.contains(guardian) {
                return Err("guardian already exists".into());
            }
            rc.guardians.push(*guardian);
        }
        RecoveryCall::RemoveRecoveryAddress { guardian } => {
            if !rc.guardians.contains(guardian) {
                return Err("unknown guardian".into());
            }
            if rc.guardians.len() as u32 - 1 < rc.quorum {
                return Err("quorum exceeds guardians".into());
            }
            rc.guardians.retain(|g| g != guardian);
        }
        RecoveryCall::SetQuorum { quorum } => {
            if *quorum == 0 || *quorum as usize > rc.guardians.len() {
                return Err("invalid quorum".into());
            }
            rc.quorum = *quorum;
        }
        RecoveryCall::Recover { candidate } => {
            if !rc.guardians.contains(&ctx.sender) {
                return Err("not a guardian".into());
            }
            if rc.recovered {
                return Err("already recovered".into());
            }
            if rc.votes.contains(&(ctx.sender, *candidate)) {
                return Err("already voted".into());
            }
            if ctx.faults.drop_votes {
                return Ok(ReadValue::Unit);
            }
            rc.votes.insert((ctx.sender, *candidate));
            let count = rc.vote_counts.entry(*candidate).or_insert(0);
            *count += 1;
            if *count >= rc.quorum {
                rc.owner = *candidate;
                rc.recovered = true;
            }
        }
    }
    Ok(ReadValue::Unit)
}

fn read(world: &World, contract: Address, call: &ReadCall) -> Result<ReadValue, Revert> {
    let found = world
        .contracts
        .get(&contract)
        .ok_or("no contract at address")?;

    let value = match (found, call) {
        (Contract::Multisig(ms), ReadCall::Multisig(call)) => match call {
            MultisigRead::MinSignatures => ReadValue::Uint(u64::from(ms.min_signatures)),
            MultisigRead::IsSigner { account } => ReadValue::Bool(ms.signers.contains(account)),
            MultisigRead::Transaction { id } => ReadValue::Transaction(
                ms.transactions
                    .get(id)
                    .cloned()
                    .unwrap_or_else(MultisigTransaction::empty),
            ),
            MultisigRead::HasSigned { id, signer } => {
                ReadValue::Bool(ms.signatures.contains(&(*id, *signer)))
            }
            MultisigRead::Balance { token } => {
                if token.is_zero() {
                    ReadValue::Amount(balance(&world.balances, contract))
                } else {
                    match world.contracts.get(token) {
                        Some(Contract::Token(t)) => ReadValue::Amount(balance(&t.balances, contract)),
                        _ => return Err("no token contract at address".into()),
                    }
                }
            }
            MultisigRead::TxBalance { id } => ReadValue::Amount(
                ms.transactions
                    .get(id)
                    .map(|r| r.balance)
                    .unwrap_or(Amount::ZERO),
            ),
        },
        (Contract::Recovery(rc), ReadCall::Recovery(call)) => match call {
            RecoveryRead::Owner => ReadValue::Address(rc.owner),
            RecoveryRead::Guardians => ReadValue::Addresses(rc.guardians.clone()),
            RecoveryRead::IsGuardian { account } => ReadValue::Bool(rc.guardians.contains(account)),
            RecoveryRead::Quorum => ReadValue::Uint(u64::from(rc.quorum)),
            RecoveryRead::IsRecovered => ReadValue::Bool(rc.recovered),
            RecoveryRead::HasVoted {
                guardian,
                candidate,
            } => ReadValue::Bool(rc.votes.contains(&(*guardian, *candidate))),
            RecoveryRead::VoteCount { candidate } => {
                ReadValue::Uint(u64::from(rc.vote_counts.get(candidate).copied().unwrap_or(0)))
            }
        },
        (Contract::Token(t), ReadCall::Token(call)) => match call {
            TokenRead::Name => ReadValue::Text(t.name.clone()),
            TokenRead::Symbol => ReadValue::Text(t.symbol.clone()),
            TokenRead::Decimals => ReadValue::Uint(u64::from(t.decimals)),
            TokenRead::BalanceOf { owner } => ReadValue::Amount(balance(&t.balances, *owner)),
            TokenRead::Allowance { owner, spender } => ReadValue::Amount(
                t.allowances
                    .get(&(*owner, *spender))
                    .copied()
                    .unwrap_or(Amount::ZERO),
            ),
        },
        _ => return Err("function not found".into()),
    };
    Ok(value)
}

fn multisig_mut(world: &mut World, address: Address) -> Result<&mut MultisigState, Revert> {
    match world.contracts.get_mut(&address) {
        Some(Contract::Multisig(ms)) => Ok(ms),
        _ => Err("no multisig contract at address".into()),
    }
}

fn token_mut(world: &mut World, address: Address) -> Result<&mut TokenState, Revert> {
    match world.contracts.get_mut(&address) {
        Some(Contract::Token(t)) => Ok(t),
        _ => Err("no token contract at address".into()),
    }
}

fn balance(balances: &HashMap<Address, Amount>, account: Address) -> Amount {
    balances.get(&account).copied().unwrap_or(Amount::ZERO)
}

fn credit(balances: &mut HashMap<Address, Amount>, account: Address, amount: Amount) {
    let entry = balances.entry(account).or_insert(Amount::ZERO);
    *entry = entry.checked_add(amount).unwrap_or(*entry);
}

fn debit(balances: &mut HashMap<Address, Amount>, account: Address, amount: Amount) -> Result<(), Revert> {
    let current = balance(balances, account);
    let remaining = current
        .checked_sub(amount)
        .ok_or("insufficient balance")?;
    balances.insert(account, remaining);
    Ok(())
}

fn derive_address(seed: &[u8]) -> Address {
    let hash = keccak256(seed);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(bytes)
}
