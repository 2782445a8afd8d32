//! Whole-client scenarios.
//!
//! Each party runs a full `App` on its own SQLite file and is restarted
//! between steps, so everything asserted here survives a reload. All
//! parties share one `MockChain`.
//!
//! Covers:
//! 1. Vault round trips for arbitrary keys and passwords
//! 2. The A/B/C treasury: propose, sign, execute, balances
//! 3. Ledger idempotence and authorization guards
//! 4. Lost receipts and late inclusion
//! 5. Wipe and guardian recovery of a lost wallet

use safehold_app::commands;
use safehold_app::{App, AppConfig, StorageBackend};
use safehold_chain::testing::{proposal_id, Faults, MockChain};
use safehold_chain::{ChainError, WaitPolicy};
use safehold_core::{AccountKey, Address, Amount, ErrorKind};
use safehold_multisig::{MultisigError, ProposalStatus};
use safehold_recovery::RecoveryError;
use safehold_wallet::{LockState, WalletError};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const PASSWORD: &str = "correct horse battery staple";

fn config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.wallet.storage = StorageBackend::Sqlite;
    config.wallet.data_dir = dir.to_path_buf();
    config.wallet.kdf.memory_kib = 256;
    config.wallet.kdf.iterations = 1;
    config.wallet.kdf.parallelism = 1;
    config
}

/// One participant: a data directory and the app currently open on it
struct Party {
    dir: TempDir,
    app: App,
    address: Address,
}

impl Party {
    fn new(chain: &MockChain) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::open(config(dir.path())).unwrap();
        let address = commands::create_wallet(&mut app, PASSWORD)
            .data
            .unwrap()
            .address;
        chain.fund(address, Amount::native(10));
        Self { dir, app, address }
    }

    /// Close and reopen the app, then unlock it again
    fn restart(&mut self) {
        self.app = App::open(config(self.dir.path())).unwrap();
        assert_eq!(self.app.session().state(), LockState::Locked);
        assert_eq!(
            commands::unlock_wallet(&mut self.app, PASSWORD).data,
            Some(true)
        );
    }
}

// ============================================================================
// 1. Vault Properties
// ============================================================================

#[test]
fn test_unlock_recovers_the_stored_key() {
    let passwords = [
        "eight ch",
        "correct horse battery staple",
        "Tr0ub4dor&3-with-symbols!",
        "ünïcødé pässwörd",
    ];

    for password in passwords {
        let dir = tempfile::tempdir().unwrap();
        let key = AccountKey::generate();
        let expected_hex = key.to_hex();
        let address = key.address();

        let mut app = App::open(config(dir.path())).unwrap();
        app.session_mut()
            .vault_mut()
            .setup_with_key(key, password)
            .unwrap();
        drop(app);

        let mut app = App::open(config(dir.path())).unwrap();
        let before = app.session().state();
        assert!(!app.session_mut().vault_mut().unlock("not it at all").unwrap());
        assert_eq!(app.session().state(), before);

        assert!(app.session_mut().vault_mut().unlock(password).unwrap());
        let recovered = app.session().account().unwrap();
        assert_eq!(recovered.to_hex(), expected_hex, "{:?}", password);
        assert_eq!(recovered.address(), address);
    }
}

#[test]
fn test_lock_then_unlock_restores_address() {
    let chain = MockChain::new();
    let mut party = Party::new(&chain);

    let locked = commands::lock_wallet(&mut party.app).data.unwrap();
    assert_eq!(locked.state, LockState::Locked);
    assert_eq!(locked.address, Some(party.address));
    assert!(party.app.session().account().is_err());

    assert_eq!(
        commands::unlock_wallet(&mut party.app, PASSWORD).data,
        Some(true)
    );
    assert_eq!(party.app.session().account_address().unwrap(), party.address);

    party.restart();
    assert_eq!(party.app.session().account_address().unwrap(), party.address);
}

// ============================================================================
// 2. Treasury Scenario
// ============================================================================

#[tokio::test]
async fn test_three_signer_treasury() {
    let chain = MockChain::new();
    let mut a = Party::new(&chain);
    let mut b = Party::new(&chain);
    let c = Party::new(&chain);
    let d = Address::from_bytes([0xdd; 20]);
    let one = Amount::native(1);

    let multisig = chain.install_multisig(&[a.address, b.address, c.address], 2);
    chain.fund(multisig, Amount::native(5));

    // A proposes
    let id = a
        .app
        .multisig(&chain, multisig)
        .propose_native(d, one)
        .await
        .unwrap();
    assert_eq!(
        chain.multisig_transaction(multisig, id).unwrap().signed_count,
        1
    );

    // A's ledger survives a restart
    a.restart();
    assert_eq!(
        a.app.session().ledger().list_transactions(&multisig).unwrap(),
        vec![id]
    );

    // B learns the id out of band
    b.restart();
    let imported = b
        .app
        .multisig(&chain, multisig)
        .import_transaction(id)
        .await
        .unwrap();
    assert_eq!(imported.to, d);
    assert_eq!(imported.amount, one);

    b.app.multisig(&chain, multisig).sign(id).await.unwrap();
    assert_eq!(
        chain.multisig_transaction(multisig, id).unwrap().signed_count,
        2
    );
    assert_eq!(
        b.app.multisig(&chain, multisig).status(id).await.unwrap(),
        ProposalStatus::ReadyToExecute(2)
    );

    // C never signed and still may execute
    let treasury_before = chain.balance_of(multisig);
    let executor_before = chain.balance_of(c.address);
    let receipt = c.app.multisig(&chain, multisig).execute(id).await.unwrap();
    assert!(receipt.succeeded());

    let record = chain.multisig_transaction(multisig, id).unwrap();
    assert!(record.executed);
    assert_eq!(
        chain.balance_of(multisig),
        treasury_before.checked_sub(one).unwrap()
    );
    assert_eq!(chain.balance_of(d), one);
    assert!(
        chain.balance_of(c.address) < executor_before,
        "Executor pays the gas"
    );

    // Second execute is a state conflict for everyone
    let again = a.app.multisig(&chain, multisig).execute(id).await;
    assert!(matches!(again, Err(MultisigError::AlreadyExecuted(x)) if x == id));
    assert_eq!(chain.balance_of(d), one);
}

// ============================================================================
// 3. Ledger And Guards
// ============================================================================

#[tokio::test]
async fn test_repeat_proposal_keeps_one_ledger_entry() {
    let chain = MockChain::new();
    let mut a = Party::new(&chain);
    let b = Party::new(&chain);
    let multisig = chain.install_multisig(&[a.address, b.address], 2);
    let to = Address::from_bytes([0x77; 20]);
    let amount = Amount::parse_units("0.25", 18).unwrap();

    let first = a
        .app
        .multisig(&chain, multisig)
        .propose_native(to, amount)
        .await
        .unwrap();
    a.restart();
    let second = a
        .app
        .multisig(&chain, multisig)
        .propose_native(to, amount)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first, proposal_id(to, amount, Address::ZERO, true));
    assert_eq!(
        a.app.session().ledger().list_transactions(&multisig).unwrap(),
        vec![first]
    );
    assert_eq!(
        a.app.session().ledger().list_contracts().unwrap(),
        vec![multisig]
    );
}

#[tokio::test]
async fn test_outsider_cannot_sign() {
    let chain = MockChain::new();
    let a = Party::new(&chain);
    let b = Party::new(&chain);
    let outsider = Party::new(&chain);
    let multisig = chain.install_multisig(&[a.address, b.address], 2);

    let id = a
        .app
        .multisig(&chain, multisig)
        .propose_native(Address::from_bytes([0x01; 20]), Amount::native(1))
        .await
        .unwrap();
    let sent_before = chain.sent_count();

    let result = commands::sign_transaction(
        &outsider.app,
        &chain,
        &multisig.to_string(),
        &id.to_string(),
    )
    .await;
    assert_eq!(result.kind, Some(ErrorKind::Authorization));
    assert_eq!(
        chain.multisig_transaction(multisig, id).unwrap().signed_count,
        1
    );
    assert_eq!(chain.sent_count(), sent_before, "Rejected before sending");
}

#[tokio::test]
async fn test_execute_waits_for_threshold() {
    let chain = MockChain::new();
    let a = Party::new(&chain);
    let b = Party::new(&chain);
    let c = Party::new(&chain);
    let multisig = chain.install_multisig(&[a.address, b.address, c.address], 3);
    chain.fund(multisig, Amount::native(2));
    let to = Address::from_bytes([0x02; 20]);

    let coordinator = a.app.multisig(&chain, multisig);
    let id = coordinator.propose_native(to, Amount::native(1)).await.unwrap();

    for signer in [&b, &c] {
        let early = coordinator.execute(id).await;
        assert!(matches!(
            early,
            Err(MultisigError::InsufficientSignatures { need: 3, .. })
        ));
        signer.app.multisig(&chain, multisig).sign(id).await.unwrap();
    }

    coordinator.execute(id).await.unwrap();
    assert!(matches!(
        coordinator.execute(id).await,
        Err(MultisigError::AlreadyExecuted(_))
    ));
    assert_eq!(chain.balance_of(to), Amount::native(1));
}

// ============================================================================
// 4. Inclusion Timeouts
// ============================================================================

#[tokio::test]
async fn test_stalled_proposal_can_be_imported_later() {
    let chain = MockChain::new();
    let a = Party::new(&chain);
    let multisig = chain.install_multisig(&[a.address], 1);
    let to = Address::from_bytes([0x03; 20]);
    let amount = Amount::native(1);
    let impatient = WaitPolicy {
        timeout: Duration::from_millis(50),
        poll_interval: Duration::from_millis(5),
    };

    chain.set_faults(Faults {
        stall_inclusion: true,
        ..Faults::default()
    });
    let result = a
        .app
        .multisig(&chain, multisig)
        .with_wait(impatient)
        .propose_native(to, amount)
        .await;
    assert!(matches!(
        result,
        Err(MultisigError::Chain(ChainError::InclusionTimeout { .. }))
    ));
    assert!(a
        .app
        .session()
        .ledger()
        .list_transactions(&multisig)
        .unwrap()
        .is_empty());

    // The transaction was not cancelled and lands afterwards
    chain.release_stalled();
    let id = proposal_id(to, amount, Address::ZERO, true);
    a.app
        .multisig(&chain, multisig)
        .import_transaction(id)
        .await
        .unwrap();
    assert_eq!(
        a.app.session().ledger().list_transactions(&multisig).unwrap(),
        vec![id]
    );
}

#[tokio::test]
async fn test_unknown_id_is_not_imported() {
    let chain = MockChain::new();
    let a = Party::new(&chain);
    let multisig = chain.install_multisig(&[a.address], 1);
    let bogus = proposal_id(Address::from_bytes([0x04; 20]), Amount::native(9), Address::ZERO, true);

    let result = commands::import_transaction(
        &a.app,
        &chain,
        &multisig.to_string(),
        &bogus.to_string(),
    )
    .await;
    assert!(!result.success);
    assert!(a
        .app
        .session()
        .ledger()
        .list_transactions(&multisig)
        .unwrap()
        .is_empty());
}

// ============================================================================
// 5. Wipe And Recovery
// ============================================================================

#[test]
fn test_wipe_is_final() {
    let chain = MockChain::new();
    let mut party = Party::new(&chain);
    let contract = Address::from_bytes([0x05; 20]);
    party
        .app
        .session()
        .ledger()
        .remember_contract(contract)
        .unwrap();

    assert!(commands::wipe_wallet(&mut party.app).success);
    assert_eq!(party.app.session().state(), LockState::NoWallet);

    for attempt in [PASSWORD, "anything else entirely"] {
        assert!(matches!(
            party.app.session_mut().vault_mut().unlock(attempt),
            Err(WalletError::NoWalletFound)
        ));
    }

    // Nothing comes back on reload either
    let app = App::open(config(party.dir.path())).unwrap();
    assert_eq!(app.session().state(), LockState::NoWallet);
    assert_eq!(app.session().vault().address(), None);
    assert!(app.session().ledger().list_contracts().unwrap().is_empty());
}

#[tokio::test]
async fn test_guardians_hand_ownership_to_a_new_wallet() {
    let chain = MockChain::new();
    let mut owner = Party::new(&chain);
    let g1 = Party::new(&chain);
    let g2 = Party::new(&chain);
    let g3 = Party::new(&chain);

    let mut deployer = owner.app.recovery(&chain);
    let recovery = deployer
        .deploy(vec![g1.address, g2.address, g3.address], 2)
        .await
        .unwrap();
    assert!(owner.app.recovery(&chain).at(recovery).is_owner().await.unwrap());

    // The owner loses the wallet and starts over with a new key
    assert!(commands::wipe_wallet(&mut owner.app).success);
    let replacement = commands::create_wallet(&mut owner.app, PASSWORD)
        .data
        .unwrap()
        .address;
    chain.fund(replacement, Amount::native(1));
    assert!(!owner.app.recovery(&chain).at(recovery).is_owner().await.unwrap());

    let denied = owner.app.recovery(&chain).at(recovery).set_quorum(3).await;
    assert!(matches!(denied, Err(RecoveryError::NotOwner { .. })));

    let first = g1
        .app
        .recovery(&chain)
        .at(recovery)
        .recover(replacement)
        .await
        .unwrap();
    assert_eq!(first.votes, 1);
    assert!(!first.recovered);

    let second = g3
        .app
        .recovery(&chain)
        .at(recovery)
        .recover(replacement)
        .await
        .unwrap();
    assert!(second.recovered);

    owner.restart();
    let coordinator = owner.app.recovery(&chain).at(recovery);
    assert!(coordinator.is_owner().await.unwrap());
    assert_eq!(coordinator.owner().await.unwrap(), replacement);

    // Late guardian finds the vote closed
    let late = g2.app.recovery(&chain).at(recovery).recover(replacement).await;
    assert!(matches!(late, Err(RecoveryError::AlreadyRecovered)));
}
