//! Wallet session
//!
//! One per process. Owns the store handle, the vault and the ledger, and is
//! passed by reference to the coordinators.

use crate::error::WalletError;
use crate::ledger::Ledger;
use crate::store::KvStore;
use crate::vault::{LockState, Vault, VaultOptions};
use safehold_core::{AccountKey, Address};
use std::sync::Arc;

pub struct WalletSession {
    store: Arc<dyn KvStore>,
    vault: Vault,
    ledger: Ledger,
}

impl WalletSession {
    pub fn open(store: Arc<dyn KvStore>, options: VaultOptions) -> Result<Self, WalletError> {
        let vault = Vault::open(store.clone(), options)?;
        let ledger = Ledger::new(store.clone());
        log::debug!("Wallet session opened ({:?})", vault.state());
        Ok(Self {
            store,
            vault,
            ledger,
        })
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn vault_mut(&mut self) -> &mut Vault {
        &mut self.vault
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn state(&self) -> LockState {
        self.vault.state()
    }

    /// Signing key of the unlocked account
    pub fn account(&self) -> Result<&AccountKey, WalletError> {
        self.vault.account_key()
    }

    /// Address of the unlocked account
    pub fn account_address(&self) -> Result<Address, WalletError> {
        Ok(self.account()?.address())
    }

    /// Sign out: wipe the vault, ledger and caches.
    pub fn wipe(&mut self) -> Result<(), WalletError> {
        self.vault.wipe()
    }
}
