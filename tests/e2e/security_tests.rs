//! Security-specific tests for the vault.
//!
//! These tests verify:
//! 1. Damaged ciphertexts are detected, never decrypted into a wrong key
//! 2. Wrong passwords leave the lock state and storage untouched
//! 3. Key import accepts exactly 64 hex characters
//! 4. Malformed inputs don't panic
//! 5. Secrets stay out of logs and persisted state unless asked for

use safehold_core::crypto::{decrypt_secret, encrypt_secret, EncryptedKey, KdfParams};
use safehold_core::{AccountKey, Address};
use safehold_wallet::schema::{DECRYPTED_KEY_KEY, IS_UNLOCKED_KEY, PASSWORD_HASH_KEY, WALLET_KEY};
use safehold_wallet::store::{get_json, set_json};
use safehold_wallet::{
    KvStore, LockState, MemoryStore, UnlockOutcome, Vault, VaultOptions, VaultRecord, WalletError,
};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};
use std::sync::Arc;

const PASSWORD: &str = "correct horse battery staple";

fn options(remember_unlock: bool) -> VaultOptions {
    VaultOptions {
        kdf: KdfParams::light(),
        remember_unlock,
    }
}

fn fresh_vault() -> (Arc<dyn KvStore>, Vault) {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let vault = Vault::open(store.clone(), options(false)).unwrap();
    (store, vault)
}

fn snapshot(store: &dyn KvStore) -> Vec<(String, Option<String>)> {
    let mut keys = store.keys().unwrap();
    keys.sort();
    keys.into_iter()
        .map(|k| {
            let v = store.get(&k).unwrap();
            (k, v)
        })
        .collect()
}

/// Address derived with secp256k1 and Keccak-256 directly
fn reference_address(secret: &[u8; 32]) -> Address {
    let secp = Secp256k1::signing_only();
    let secret = SecretKey::from_slice(secret).unwrap();
    let public = PublicKey::from_secret_key(&secp, &secret).serialize_uncompressed();
    let hash = Keccak256::digest(&public[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(bytes)
}

// ============================================================================
// 1. Ciphertext Integrity
// ============================================================================

#[test]
fn test_tampered_ciphertext_fails_decryption() {
    let secret = [0x42u8; 32];
    let encrypted = encrypt_secret(&secret, PASSWORD, KdfParams::light()).unwrap();
    let mut bytes = encrypted.to_bytes();

    // Flip one bit in the last byte of the authentication tag
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let tampered = EncryptedKey::from_bytes(&bytes).unwrap();
    assert!(
        decrypt_secret(&tampered, PASSWORD).is_err(),
        "Tampered ciphertext must not decrypt"
    );
}

#[test]
fn test_tampered_salt_fails_decryption() {
    let encrypted = encrypt_secret(&[0x11u8; 32], PASSWORD, KdfParams::light()).unwrap();
    let mut bytes = encrypted.to_bytes();

    // Salt starts right after the 13-byte header
    bytes[13] ^= 0xFF;

    let tampered = EncryptedKey::from_bytes(&bytes).unwrap();
    assert!(decrypt_secret(&tampered, PASSWORD).is_err());
}

#[test]
fn test_same_secret_encrypts_differently() {
    let secret = [0x07u8; 32];
    let a = encrypt_secret(&secret, PASSWORD, KdfParams::light()).unwrap();
    let b = encrypt_secret(&secret, PASSWORD, KdfParams::light()).unwrap();
    assert_ne!(a.to_hex(), b.to_hex(), "Salt and nonce must be fresh per call");
}

#[test]
fn test_tampered_vault_record_reports_integrity_failure() {
    let (store, mut vault) = fresh_vault();
    let record = vault.setup(PASSWORD).unwrap();
    vault.lock();

    let mut bytes = hex::decode(&record.encrypted_private_key).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x80;
    let damaged = VaultRecord {
        encrypted_private_key: hex::encode(bytes),
        ..record
    };
    set_json(store.as_ref(), WALLET_KEY, &damaged).unwrap();

    let mut vault = Vault::open(store, options(false)).unwrap();
    assert_eq!(
        vault.unlock_detailed(PASSWORD).unwrap(),
        UnlockOutcome::IntegrityFailure
    );
    assert_eq!(vault.state(), LockState::Locked);
    assert!(vault.account_key().is_err());
}

#[test]
fn test_corrupted_kdf_cost_reports_integrity_failure() {
    for at in [4usize, 8, 12] {
        let (store, mut vault) = fresh_vault();
        let record = vault.setup(PASSWORD).unwrap();
        vault.lock();

        // High byte of m_cost, t_cost, p_cost in turn
        let mut bytes = hex::decode(&record.encrypted_private_key).unwrap();
        bytes[at] ^= 0x40;
        let damaged = VaultRecord {
            encrypted_private_key: hex::encode(bytes),
            ..record
        };
        set_json(store.as_ref(), WALLET_KEY, &damaged).unwrap();

        let mut vault = Vault::open(store, options(false)).unwrap();
        assert_eq!(
            vault.unlock_detailed(PASSWORD).unwrap(),
            UnlockOutcome::IntegrityFailure,
            "byte {} flipped",
            at
        );
        assert_eq!(vault.state(), LockState::Locked);
    }
}

#[test]
fn test_record_for_another_address_is_rejected() {
    let (store, mut vault) = fresh_vault();
    let record = vault.setup(PASSWORD).unwrap();
    vault.lock();

    // Ciphertext is intact but claims a different owner
    let swapped = VaultRecord {
        address: Address::from_bytes([0xEE; 20]),
        ..record
    };
    set_json(store.as_ref(), WALLET_KEY, &swapped).unwrap();

    let mut vault = Vault::open(store, options(false)).unwrap();
    assert!(!vault.unlock(PASSWORD).unwrap());
    assert_eq!(vault.state(), LockState::Locked);
}

// ============================================================================
// 2. Wrong Passwords
// ============================================================================

#[test]
fn test_wrong_password_never_mutates_state() {
    let (store, mut vault) = fresh_vault();
    vault.setup(PASSWORD).unwrap();
    vault.lock();
    let before = snapshot(store.as_ref());
    let shouted = PASSWORD.to_uppercase();

    for attempt in [
        "",
        "wrong horse battery staple",
        "correct horse battery stapl",
        shouted.as_str(),
    ] {
        assert_eq!(
            vault.unlock_detailed(attempt).unwrap(),
            UnlockOutcome::WrongPassword,
            "{:?} should be rejected",
            attempt
        );
        assert_eq!(vault.state(), LockState::Locked);
    }
    assert_eq!(snapshot(store.as_ref()), before);
}

#[test]
fn test_wrong_password_while_unlocked_keeps_unlocked() {
    let (_store, mut vault) = fresh_vault();
    let record = vault.setup(PASSWORD).unwrap();
    assert!(!vault.unlock("definitely not it").unwrap());
    assert_eq!(vault.state(), LockState::Unlocked);
    assert_eq!(vault.account_key().unwrap().address(), record.address);
}

#[test]
fn test_password_is_never_stored() {
    let (store, mut vault) = fresh_vault();
    vault.setup(PASSWORD).unwrap();

    for (key, value) in snapshot(store.as_ref()) {
        let value = value.unwrap_or_default();
        assert!(!value.contains(PASSWORD), "{} leaks the password", key);
    }
    let hash: String = get_json(store.as_ref(), PASSWORD_HASH_KEY).unwrap().unwrap();
    assert!(hash.starts_with("$argon2id$"));
}

#[test]
fn test_failed_export_and_change_leave_record_alone() {
    let (store, mut vault) = fresh_vault();
    vault.setup(PASSWORD).unwrap();
    let before = snapshot(store.as_ref());

    assert!(matches!(
        vault.export_private_key("wrong password"),
        Err(WalletError::WrongPassword)
    ));
    assert!(matches!(
        vault.change_password("wrong password", "a brand new secret"),
        Err(WalletError::WrongPassword)
    ));
    assert!(matches!(
        vault.change_password(PASSWORD, "short"),
        Err(WalletError::WeakPassword { .. })
    ));
    assert_eq!(snapshot(store.as_ref()), before);
}

// ============================================================================
// 3. Key Import
// ============================================================================

#[test]
fn test_import_rejects_malformed_keys() {
    let sixty_three = "a".repeat(63);
    let sixty_five = "a".repeat(65);
    let non_hex = format!("{}g", "a".repeat(63));
    let double_prefix = format!("0x0x{}", "a".repeat(62));

    for bad in [
        "not-a-key",
        "",
        "0x",
        sixty_three.as_str(),
        sixty_five.as_str(),
        non_hex.as_str(),
        double_prefix.as_str(),
    ] {
        let (store, mut vault) = fresh_vault();
        let result = vault.import(bad, PASSWORD);
        assert!(
            matches!(result, Err(WalletError::InvalidKeyFormat(_))),
            "{:?} should be rejected, got {:?}",
            bad,
            result.map(|r| r.address)
        );
        assert_eq!(vault.state(), LockState::NoWallet);
        assert!(store.keys().unwrap().is_empty(), "Nothing persisted for {:?}", bad);
    }
}

#[test]
fn test_import_rejects_out_of_range_scalars() {
    let zero = "0".repeat(64);
    let order = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
    for bad in [zero.as_str(), order] {
        let (_store, mut vault) = fresh_vault();
        assert!(vault.import(bad, PASSWORD).is_err(), "{} is not a scalar", bad);
    }
}

#[test]
fn test_import_accepts_with_and_without_prefix() {
    let secret: [u8; 32] = rand::random();
    let bare = hex::encode(secret);
    let expected = reference_address(&secret);

    for input in [bare.clone(), format!("0x{}", bare), bare.to_uppercase()] {
        let (_store, mut vault) = fresh_vault();
        let record = vault.import(&input, PASSWORD).unwrap();
        assert_eq!(record.address, expected, "{}", input);
        assert_eq!(vault.account_key().unwrap().address(), expected);
    }
}

#[test]
fn test_import_known_vector() {
    // Private key 1 is the generator point
    let key = format!("0x{}1", "0".repeat(63));
    let (_store, mut vault) = fresh_vault();
    let record = vault.import(&key, PASSWORD).unwrap();
    assert_eq!(
        record.address.to_lower_hex(),
        "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
    );
}

#[test]
fn test_export_round_trips_import() {
    let (_store, mut vault) = fresh_vault();
    let created = vault.setup(PASSWORD).unwrap();
    let exported = vault.export_private_key(PASSWORD).unwrap();

    let (_store, mut other) = fresh_vault();
    let imported = other.import(&exported, "another password").unwrap();
    assert_eq!(imported.address, created.address);
}

// ============================================================================
// 4. Malformed Input Handling
// ============================================================================

#[test]
fn test_garbage_ciphertexts_dont_panic() {
    let mut samples: Vec<Vec<u8>> = vec![vec![], vec![0x01], vec![0xFF; 8], vec![0x01; 40]];
    for len in [41usize, 42, 64, 128, 512] {
        samples.push((0..len).map(|_| rand::random::<u8>()).collect());
    }

    for bytes in samples {
        let _ = EncryptedKey::from_bytes(&bytes);
    }

    // Valid header, random body
    let header = encrypt_secret(&[0x33u8; 32], PASSWORD, KdfParams::light())
        .unwrap()
        .to_bytes();
    for _ in 0..16 {
        let mut bytes = header[..13].to_vec();
        bytes.extend((0..60).map(|_| rand::random::<u8>()));
        let parsed = EncryptedKey::from_bytes(&bytes).unwrap();
        assert!(decrypt_secret(&parsed, PASSWORD).is_err());
    }

    for text in ["", "zz", "0", "01", "not hex at all"] {
        assert!(EncryptedKey::from_hex(text).is_err());
    }
}

#[test]
fn test_unknown_format_version_rejected() {
    let encrypted = encrypt_secret(&[0x55u8; 32], PASSWORD, KdfParams::light()).unwrap();
    let mut bytes = encrypted.to_bytes();
    bytes[0] = 0x7F;
    assert!(EncryptedKey::from_bytes(&bytes).is_err());
}

#[test]
fn test_corrupt_record_json_is_an_error_not_a_panic() {
    let (store, mut vault) = fresh_vault();
    vault.setup(PASSWORD).unwrap();
    store.set(WALLET_KEY, "{ this is not json").unwrap();

    assert!(matches!(
        Vault::open(store.clone(), options(false)),
        Err(WalletError::CorruptRecord(_))
    ));
}

#[test]
fn test_random_import_strings_dont_panic() {
    for _ in 0..200 {
        let len = rand::random::<usize>() % 80;
        let text: String = (0..len)
            .map(|_| char::from(rand::random::<u8>() % 94 + 33))
            .collect();
        let _ = AccountKey::from_hex(&text);
    }
}

// ============================================================================
// 5. Secret Handling
// ============================================================================

#[test]
fn test_debug_output_redacts_key() {
    let key = AccountKey::generate();
    let hex = key.to_hex();
    let debug = format!("{:?}", key);

    assert!(debug.contains("redacted"));
    assert!(!debug.contains(&hex[2..]), "Debug output leaks the key");
}

#[test]
fn test_locked_vault_keeps_no_plaintext() {
    let (store, mut vault) = fresh_vault();
    vault.setup(PASSWORD).unwrap();
    let exported = vault.export_private_key(PASSWORD).unwrap();
    vault.lock();

    assert!(vault.account_key().is_err());
    for (key, value) in snapshot(store.as_ref()) {
        let value = value.unwrap_or_default();
        assert!(!value.contains(&exported[2..]), "{} holds the plaintext key", key);
    }
}

#[test]
fn test_remember_unlock_persists_until_lock() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let mut vault = Vault::open(store.clone(), options(true)).unwrap();
    let record = vault.setup(PASSWORD).unwrap();

    assert_eq!(get_json::<bool, _>(store.as_ref(), IS_UNLOCKED_KEY).unwrap(), Some(true));
    assert!(store.get(DECRYPTED_KEY_KEY).unwrap().is_some());

    // A restart restores the unlocked state without the password
    let mut vault = Vault::open(store.clone(), options(true)).unwrap();
    assert_eq!(vault.state(), LockState::Unlocked);
    assert_eq!(vault.account_key().unwrap().address(), record.address);

    vault.lock();
    assert!(store.get(IS_UNLOCKED_KEY).unwrap().is_none());
    assert!(store.get(DECRYPTED_KEY_KEY).unwrap().is_none());

    let vault = Vault::open(store, options(true)).unwrap();
    assert_eq!(vault.state(), LockState::Locked);
}

#[test]
fn test_remembered_key_discarded_when_option_off() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let mut vault = Vault::open(store.clone(), options(true)).unwrap();
    vault.setup(PASSWORD).unwrap();
    drop(vault);

    let vault = Vault::open(store.clone(), options(false)).unwrap();
    assert_eq!(vault.state(), LockState::Locked);
    assert!(store.get(DECRYPTED_KEY_KEY).unwrap().is_none());
}

#[test]
fn test_mismatched_remembered_key_ignored() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let mut vault = Vault::open(store.clone(), options(true)).unwrap();
    vault.setup(PASSWORD).unwrap();
    drop(vault);

    let stranger = AccountKey::generate();
    set_json(store.as_ref(), DECRYPTED_KEY_KEY, stranger.to_hex().as_str()).unwrap();

    let vault = Vault::open(store.clone(), options(true)).unwrap();
    assert_eq!(vault.state(), LockState::Locked);
    assert!(store.get(DECRYPTED_KEY_KEY).unwrap().is_none());
}
