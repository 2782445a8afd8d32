//! Password vault
//!
//! Owns the account key and the `NoWallet / Locked / Unlocked` lifecycle.
//!
//! At rest the key exists only as an Argon2id + AES-256-GCM blob in the
//! `wallet` record, next to a separate Argon2id PHC hash of the password.
//! Unlock checks the hash first and only decrypts on a match, so a wrong
//! password and a damaged ciphertext are reported differently.
//!
//! # Remember unlock
//!
//! With [`VaultOptions::remember_unlock`] set, the decrypted key is written
//! to the store in plaintext and restored on the next [`Vault::open`] until
//! [`Vault::lock`] or [`Vault::wipe`]. Anyone who can read the store can
//! then spend from the wallet without the password. Off by default.

use crate::error::WalletError;
use crate::schema::{
    VaultRecord, DECRYPTED_KEY_KEY, IS_UNLOCKED_KEY, PASSWORD_HASH_KEY, WALLET_KEY,
};
use crate::store::{get_json, set_json, KvStore, StoreError};
use safehold_core::password::{self, PasswordStrength, MIN_PASSWORD_LENGTH};
use safehold_core::{
    decrypt_secret, encrypt_secret, hash_password, verify_password, AccountKey, Address,
    EncryptedKey, KdfParams,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    NoWallet,
    Locked,
    Unlocked,
}

/// Result of an unlock attempt that found a wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked,
    /// Password hash did not match. Nothing was decrypted.
    WrongPassword,
    /// Password matched but the record did not decrypt to the stored address
    IntegrityFailure,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VaultOptions {
    /// Argon2id cost for new ciphertexts and password hashes
    pub kdf: KdfParams,
    /// Persist the decrypted key until explicit lock
    pub remember_unlock: bool,
}

pub struct Vault {
    store: Arc<dyn KvStore>,
    options: VaultOptions,
    state: LockState,
    address: Option<Address>,
    key: Option<AccountKey>,
}

impl Vault {
    /// Load the vault from storage and derive the initial lock state.
    pub fn open(store: Arc<dyn KvStore>, options: VaultOptions) -> Result<Self, WalletError> {
        let mut vault = Self {
            store,
            options,
            state: LockState::NoWallet,
            address: None,
            key: None,
        };

        let Some(record) = vault.load_record()? else {
            vault.forget_remembered();
            return Ok(vault);
        };

        vault.address = Some(record.address);
        vault.state = LockState::Locked;

        match vault.remembered_key(&record)? {
            Some(key) if vault.options.remember_unlock => {
                log::warn!(
                    "Restored remembered unlock for {} from plaintext storage",
                    record.address
                );
                vault.key = Some(key);
                vault.state = LockState::Unlocked;
            }
            Some(_) => {
                log::info!("Remember-unlock is disabled, discarding cached key");
                vault.forget_remembered();
            }
            None => {}
        }

        Ok(vault)
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == LockState::Unlocked
    }

    /// Address of the stored wallet, locked or not
    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn options(&self) -> &VaultOptions {
        &self.options
    }

    /// The signing key. Only available while unlocked.
    pub fn account_key(&self) -> Result<&AccountKey, WalletError> {
        self.key.as_ref().ok_or(WalletError::Locked)
    }

    /// Create a wallet with a freshly generated key.
    pub fn setup(&mut self, password: &str) -> Result<VaultRecord, WalletError> {
        self.setup_with_key(AccountKey::generate(), password)
    }

    /// Create a wallet from a hex private key.
    ///
    /// The key must be exactly 64 hex characters, `0x` prefix optional.
    pub fn import(&mut self, private_key_hex: &str, password: &str) -> Result<VaultRecord, WalletError> {
        let key = AccountKey::from_hex(private_key_hex)?;
        self.setup_with_key(key, password)
    }

    /// Encrypt and persist `key`, then unlock with it.
    pub fn setup_with_key(
        &mut self,
        key: AccountKey,
        password: &str,
    ) -> Result<VaultRecord, WalletError> {
        if self.store.get(WALLET_KEY)?.is_some() {
            return Err(WalletError::WalletExists);
        }
        check_password(password)?;

        let address = key.address();
        let plaintext = key.to_hex();
        let encrypted = encrypt_secret(plaintext.as_bytes(), password, self.options.kdf)?;
        let password_hash = hash_password(password, self.options.kdf)?;

        let record = VaultRecord {
            encrypted_private_key: encrypted.to_hex(),
            address,
            timestamp: now_millis(),
        };

        // The record marks the wallet as existing, so it goes last
        set_json(self.store.as_ref(), PASSWORD_HASH_KEY, &password_hash)?;
        set_json(self.store.as_ref(), WALLET_KEY, &record)?;

        self.remember(&key)?;
        self.key = Some(key);
        self.address = Some(address);
        self.state = LockState::Unlocked;

        log::info!("Wallet created for {}", address);
        Ok(record)
    }

    /// Unlock with a password. `Ok(false)` on a wrong password or a record
    /// that fails integrity checks; the lock state is left untouched.
    pub fn unlock(&mut self, password: &str) -> Result<bool, WalletError> {
        Ok(self.unlock_detailed(password)? == UnlockOutcome::Unlocked)
    }

    pub fn unlock_detailed(&mut self, password: &str) -> Result<UnlockOutcome, WalletError> {
        let record = self.load_record()?.ok_or(WalletError::NoWalletFound)?;

        if !self.password_matches(password)? {
            log::warn!("Unlock rejected: incorrect password");
            return Ok(UnlockOutcome::WrongPassword);
        }

        let key = match decrypt_record(&record, password) {
            Ok(key) => key,
            Err(e) => {
                log::error!("DecryptionIntegrityError: {}", e);
                return Ok(UnlockOutcome::IntegrityFailure);
            }
        };

        self.remember(&key)?;
        self.key = Some(key);
        self.address = Some(record.address);
        self.state = LockState::Unlocked;

        log::info!("Wallet {} unlocked", record.address);
        Ok(UnlockOutcome::Unlocked)
    }

    /// Drop the in-memory key and any remembered plaintext.
    pub fn lock(&mut self) {
        self.key = None;
        self.forget_remembered();
        if self.state == LockState::Unlocked {
            self.state = LockState::Locked;
            log::info!("Wallet locked");
        }
    }

    /// Delete every stored entry: vault record, password hash, ledger and
    /// caches. There is no way back without an exported key.
    pub fn wipe(&mut self) -> Result<(), WalletError> {
        self.key = None;
        self.address = None;
        self.state = LockState::NoWallet;
        self.store.clear()?;
        log::warn!("Wallet wiped");
        Ok(())
    }

    /// Decrypt and return the private key as `0x` hex after re-checking the
    /// password. Works while locked.
    pub fn export_private_key(&self, password: &str) -> Result<Zeroizing<String>, WalletError> {
        let record = self.load_record()?.ok_or(WalletError::NoWalletFound)?;
        if !self.password_matches(password)? {
            return Err(WalletError::WrongPassword);
        }
        let key = decrypt_record(&record, password)?;
        log::warn!("Private key exported for {}", record.address);
        Ok(key.to_hex())
    }

    /// Re-encrypt the key and re-hash under a new password.
    pub fn change_password(&mut self, old: &str, new: &str) -> Result<(), WalletError> {
        let record = self.load_record()?.ok_or(WalletError::NoWalletFound)?;
        check_password(new)?;
        if !self.password_matches(old)? {
            return Err(WalletError::WrongPassword);
        }

        let key = decrypt_record(&record, old)?;
        let encrypted = encrypt_secret(key.to_hex().as_bytes(), new, self.options.kdf)?;
        let password_hash = hash_password(new, self.options.kdf)?;

        let updated = VaultRecord {
            encrypted_private_key: encrypted.to_hex(),
            ..record
        };
        set_json(self.store.as_ref(), WALLET_KEY, &updated)?;
        set_json(self.store.as_ref(), PASSWORD_HASH_KEY, &password_hash)?;

        log::info!("Password changed for {}", updated.address);
        Ok(())
    }

    fn load_record(&self) -> Result<Option<VaultRecord>, WalletError> {
        match get_json(self.store.as_ref(), WALLET_KEY) {
            Err(StoreError::Json(e)) => Err(WalletError::CorruptRecord(e.to_string())),
            other => Ok(other?),
        }
    }

    fn password_matches(&self, password: &str) -> Result<bool, WalletError> {
        let hash: String = get_json(self.store.as_ref(), PASSWORD_HASH_KEY)?
            .ok_or_else(|| WalletError::CorruptRecord("password hash missing".into()))?;
        Ok(verify_password(password, &hash)?)
    }

    fn remember(&self, key: &AccountKey) -> Result<(), WalletError> {
        if !self.options.remember_unlock {
            return Ok(());
        }
        log::warn!("Remember-unlock is on: decrypted key persisted in plaintext until lock");
        set_json(self.store.as_ref(), IS_UNLOCKED_KEY, &true)?;
        set_json(self.store.as_ref(), DECRYPTED_KEY_KEY, key.to_hex().as_str())?;
        Ok(())
    }

    /// The remembered key, if present and matching the record
    fn remembered_key(&self, record: &VaultRecord) -> Result<Option<AccountKey>, WalletError> {
        let flagged: Option<bool> = get_json(self.store.as_ref(), IS_UNLOCKED_KEY)?;
        let cached: Option<String> = get_json(self.store.as_ref(), DECRYPTED_KEY_KEY)?;
        let (Some(true), Some(cached)) = (flagged, cached) else {
            return Ok(None);
        };
        let cached = Zeroizing::new(cached);

        match AccountKey::from_hex(&cached) {
            Ok(key) if key.address() == record.address => Ok(Some(key)),
            _ => {
                log::warn!("Remembered key does not match the wallet record, ignoring");
                self.forget_remembered();
                Ok(None)
            }
        }
    }

    fn forget_remembered(&self) {
        for key in [IS_UNLOCKED_KEY, DECRYPTED_KEY_KEY] {
            if let Err(e) = self.store.remove(key) {
                log::warn!("Failed to clear {}: {}", key, e);
            }
        }
    }
}

fn check_password(password: &str) -> Result<(), WalletError> {
    if !password::meets_length_floor(password) {
        return Err(WalletError::WeakPassword {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    let analysis = password::analyze(password);
    if analysis.strength < PasswordStrength::Strong {
        for warning in &analysis.warnings {
            log::warn!("Password strength: {}", warning);
        }
    }
    Ok(())
}

/// Decrypt the record and confirm the key derives the stored address.
fn decrypt_record(record: &VaultRecord, password: &str) -> Result<AccountKey, WalletError> {
    let encrypted = EncryptedKey::from_hex(&record.encrypted_private_key)?;
    let plaintext = decrypt_secret(&encrypted, password)?;
    let hex = std::str::from_utf8(&plaintext)
        .map_err(|_| WalletError::CorruptRecord("decrypted key is not text".into()))?;
    let key = AccountKey::from_hex(hex)
        .map_err(|e| WalletError::CorruptRecord(format!("decrypted key: {}", e)))?;
    if key.address() != record.address {
        return Err(WalletError::CorruptRecord(
            "decrypted key does not match stored address".into(),
        ));
    }
    Ok(key)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const PASSWORD: &str = "correct horse battery";

    fn options() -> VaultOptions {
        VaultOptions {
            kdf: KdfParams::light(),
            remember_unlock: false,
        }
    }

    fn empty_vault() -> (Arc<dyn KvStore>, Vault) {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let vault = Vault::open(store.clone(), options()).unwrap();
        (store, vault)
    }

    #[test]
    fn test_fresh_store_has_no_wallet() {
        let (_, vault) = empty_vault();
        assert_eq!(vault.state(), LockState::NoWallet);
        assert!(vault.address().is_none());
        assert!(matches!(vault.account_key(), Err(WalletError::Locked)));
    }

    #[test]
    fn test_setup_unlocks() {
        let (store, mut vault) = empty_vault();
        let record = vault.setup(PASSWORD).unwrap();

        assert_eq!(vault.state(), LockState::Unlocked);
        assert_eq!(vault.address(), Some(record.address));
        assert_eq!(vault.account_key().unwrap().address(), record.address);

        // Password never stored
        for key in store.keys().unwrap() {
            let value = store.get(&key).unwrap().unwrap();
            assert!(!value.contains(PASSWORD));
        }
    }

    #[test]
    fn test_setup_rejects_short_password() {
        let (_, mut vault) = empty_vault();
        let err = vault.setup("1234567").unwrap_err();
        assert!(matches!(err, WalletError::WeakPassword { min: 8 }));
        assert_eq!(vault.state(), LockState::NoWallet);
    }

    #[test]
    fn test_setup_twice_rejected() {
        let (_, mut vault) = empty_vault();
        vault.setup(PASSWORD).unwrap();
        assert!(matches!(
            vault.setup(PASSWORD),
            Err(WalletError::WalletExists)
        ));
    }

    #[test]
    fn test_import_roundtrip() {
        let (_, mut vault) = empty_vault();
        let record = vault.import(DEV_KEY, PASSWORD).unwrap();
        assert_eq!(record.address.to_string(), DEV_ADDRESS);

        vault.lock();
        assert!(vault.unlock(PASSWORD).unwrap());
        assert_eq!(
            vault.account_key().unwrap().to_hex().as_str(),
            format!("0x{}", DEV_KEY)
        );
    }

    #[test]
    fn test_import_rejects_malformed_keys() {
        let (_, mut vault) = empty_vault();
        for bad in ["not-a-key", &DEV_KEY[..63], "0x", ""] {
            let err = vault.import(bad, PASSWORD).unwrap_err();
            assert!(matches!(err, WalletError::InvalidKeyFormat(_)), "{bad}");
        }
        assert_eq!(vault.state(), LockState::NoWallet);
    }

    #[test]
    fn test_wrong_password_leaves_state() {
        let (_, mut vault) = empty_vault();
        vault.setup(PASSWORD).unwrap();

        // From Unlocked
        assert!(!vault.unlock("wrong password").unwrap());
        assert_eq!(vault.state(), LockState::Unlocked);

        // From Locked
        vault.lock();
        assert_eq!(
            vault.unlock_detailed("wrong password").unwrap(),
            UnlockOutcome::WrongPassword
        );
        assert_eq!(vault.state(), LockState::Locked);
        assert!(vault.account_key().is_err());
    }

    #[test]
    fn test_lock_unlock_restores_address() {
        let (_, mut vault) = empty_vault();
        let record = vault.setup(PASSWORD).unwrap();

        vault.lock();
        assert_eq!(vault.state(), LockState::Locked);
        assert_eq!(vault.address(), Some(record.address));

        assert!(vault.unlock(PASSWORD).unwrap());
        assert_eq!(vault.account_key().unwrap().address(), record.address);
    }

    #[test]
    fn test_reopen_is_locked() {
        let (store, mut vault) = empty_vault();
        vault.setup(PASSWORD).unwrap();

        let reopened = Vault::open(store, options()).unwrap();
        assert_eq!(reopened.state(), LockState::Locked);
    }

    #[test]
    fn test_corrupted_ciphertext_distinct_from_wrong_password() {
        let (store, mut vault) = empty_vault();
        let mut record = vault.setup(PASSWORD).unwrap();
        vault.lock();

        // Flip the last ciphertext byte (inside the GCM tag)
        let mut blob = hex::decode(&record.encrypted_private_key).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        record.encrypted_private_key = hex::encode(blob);
        set_json(store.as_ref(), WALLET_KEY, &record).unwrap();

        assert_eq!(
            vault.unlock_detailed("wrong password").unwrap(),
            UnlockOutcome::WrongPassword
        );
        assert_eq!(
            vault.unlock_detailed(PASSWORD).unwrap(),
            UnlockOutcome::IntegrityFailure
        );
        assert_eq!(vault.state(), LockState::Locked);
    }

    #[test]
    fn test_mismatched_address_is_integrity_failure() {
        let (store, mut vault) = empty_vault();
        let mut record = vault.import(DEV_KEY, PASSWORD).unwrap();
        vault.lock();

        record.address = Address::ZERO;
        set_json(store.as_ref(), WALLET_KEY, &record).unwrap();

        assert_eq!(
            vault.unlock_detailed(PASSWORD).unwrap(),
            UnlockOutcome::IntegrityFailure
        );
    }

    #[test]
    fn test_wipe() {
        let (store, mut vault) = empty_vault();
        vault.setup(PASSWORD).unwrap();
        store.set("multisigContracts", "[]").unwrap();

        vault.wipe().unwrap();
        assert_eq!(vault.state(), LockState::NoWallet);
        assert!(store.keys().unwrap().is_empty());
        assert!(matches!(
            vault.unlock(PASSWORD),
            Err(WalletError::NoWalletFound)
        ));
    }

    #[test]
    fn test_export_requires_password() {
        let (_, mut vault) = empty_vault();
        vault.import(DEV_KEY, PASSWORD).unwrap();
        vault.lock();

        assert!(matches!(
            vault.export_private_key("wrong password"),
            Err(WalletError::WrongPassword)
        ));
        let exported = vault.export_private_key(PASSWORD).unwrap();
        assert_eq!(exported.as_str(), format!("0x{}", DEV_KEY));
    }

    #[test]
    fn test_change_password() {
        let (_, mut vault) = empty_vault();
        let record = vault.setup(PASSWORD).unwrap();
        vault.change_password(PASSWORD, "another long password").unwrap();
        vault.lock();

        assert!(!vault.unlock(PASSWORD).unwrap());
        assert!(vault.unlock("another long password").unwrap());
        assert_eq!(vault.address(), Some(record.address));

        assert!(matches!(
            vault.change_password("another long password", "short"),
            Err(WalletError::WeakPassword { .. })
        ));
    }

    #[test]
    fn test_remember_unlock_restores_on_open() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let remember = VaultOptions {
            remember_unlock: true,
            ..options()
        };
        let mut vault = Vault::open(store.clone(), remember).unwrap();
        let record = vault.setup(PASSWORD).unwrap();
        assert!(store.get(DECRYPTED_KEY_KEY).unwrap().is_some());

        let reopened = Vault::open(store.clone(), remember).unwrap();
        assert_eq!(reopened.state(), LockState::Unlocked);
        assert_eq!(reopened.account_key().unwrap().address(), record.address);

        // Lock clears the plaintext
        let mut reopened = reopened;
        reopened.lock();
        assert!(store.get(DECRYPTED_KEY_KEY).unwrap().is_none());
        assert!(store.get(IS_UNLOCKED_KEY).unwrap().is_none());
        let again = Vault::open(store, remember).unwrap();
        assert_eq!(again.state(), LockState::Locked);
    }

    #[test]
    fn test_remembered_key_discarded_when_policy_off() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let remember = VaultOptions {
            remember_unlock: true,
            ..options()
        };
        Vault::open(store.clone(), remember)
            .unwrap()
            .setup(PASSWORD)
            .unwrap();

        let vault = Vault::open(store.clone(), options()).unwrap();
        assert_eq!(vault.state(), LockState::Locked);
        assert!(store.get(DECRYPTED_KEY_KEY).unwrap().is_none());
    }

    #[test]
    fn test_remembered_key_for_other_wallet_ignored() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let remember = VaultOptions {
            remember_unlock: true,
            ..options()
        };
        Vault::open(store.clone(), remember)
            .unwrap()
            .setup(PASSWORD)
            .unwrap();
        set_json(
            store.as_ref(),
            DECRYPTED_KEY_KEY,
            &format!("0x{}", DEV_KEY),
        )
        .unwrap();

        let vault = Vault::open(store, remember).unwrap();
        assert_eq!(vault.state(), LockState::Locked);
    }
}
