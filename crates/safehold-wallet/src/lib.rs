//! Safehold Wallet
//!
//! Everything the client keeps locally:
//!
//! - **Vault**: the encrypted account key, its password hash and the
//!   `NoWallet / Locked / Unlocked` lifecycle
//! - **Ledger**: multisig contracts and proposal ids this client has seen,
//!   since the contract offers no enumeration
//! - **Store**: one key-value interface with SQLite, JSON-file and
//!   in-memory backends, picked by the composition root
//!
//! [`WalletSession`] owns all three and is handed by reference to the
//! coordinators.

pub mod error;
pub mod ledger;
pub mod schema;
pub mod session;
pub mod store;
pub mod vault;

pub use error::WalletError;
pub use ledger::Ledger;
pub use schema::VaultRecord;
pub use session::WalletSession;
pub use store::{JsonFileStore, KvStore, MemoryStore, SqliteStore, StoreError};
pub use vault::{LockState, UnlockOutcome, Vault, VaultOptions};
