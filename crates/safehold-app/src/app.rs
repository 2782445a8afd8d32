//! Composition root
//!
//! Picks the storage backend from configuration, opens the one
//! [`WalletSession`] for the process and hands out coordinators bound to a
//! chain client. Nothing below this layer knows which backend is in use.

use crate::config::{AppConfig, StorageBackend};
use anyhow::{Context, Result};
use safehold_chain::{ChainClient, ChainError};
use safehold_core::Address;
use safehold_multisig::MultisigCoordinator;
use safehold_recovery::RecoveryCoordinator;
use safehold_wallet::{JsonFileStore, KvStore, MemoryStore, SqliteStore, WalletSession};
use std::sync::Arc;

const SQLITE_FILE: &str = "safehold.db";
const JSON_FILE: &str = "safehold.json";

pub struct App {
    config: AppConfig,
    session: WalletSession,
}

impl App {
    /// Validate `config`, open its store and the wallet session.
    pub fn open(config: AppConfig) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let store = open_store(&config)?;
        let session = WalletSession::open(store, config.vault_options())
            .context("Failed to open wallet session")?;
        log::info!(
            "Safehold ready ({:?} storage, chain {})",
            config.wallet.storage,
            config.chain.chain_id
        );
        Ok(Self { config, session })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut WalletSession {
        &mut self.session
    }

    /// Refuse to work against a node on another network.
    pub async fn check_chain<C: ChainClient>(&self, client: &C) -> Result<(), ChainError> {
        let actual = client.chain_id().await?;
        let expected = self.config.chain.chain_id;
        if actual != expected {
            log::error!("Node reports chain {}, configured for {}", actual, expected);
            return Err(ChainError::WrongChain { expected, actual });
        }
        Ok(())
    }

    pub fn multisig<'a, C: ChainClient>(
        &'a self,
        client: &'a C,
        contract: Address,
    ) -> MultisigCoordinator<'a, C> {
        MultisigCoordinator::new(client, &self.session, contract)
            .with_gas_defaults(self.config.gas)
            .with_wait(self.config.wait_policy())
    }

    pub fn recovery<'a, C: ChainClient>(&'a self, client: &'a C) -> RecoveryCoordinator<'a, C> {
        RecoveryCoordinator::new(client, &self.session)
            .with_gas_defaults(self.config.gas)
            .with_wait(self.config.wait_policy())
    }
}

fn open_store(config: &AppConfig) -> Result<Arc<dyn KvStore>> {
    let dir = &config.wallet.data_dir;
    let store: Arc<dyn KvStore> = match config.wallet.storage {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Sqlite => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data dir {}", dir.display()))?;
            let path = dir.join(SQLITE_FILE);
            Arc::new(
                SqliteStore::open(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?,
            )
        }
        StorageBackend::Json => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data dir {}", dir.display()))?;
            let path = dir.join(JSON_FILE);
            Arc::new(
                JsonFileStore::open(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?,
            )
        }
    };
    Ok(store)
}
