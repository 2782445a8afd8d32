//! Application configuration: TOML file, then environment overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use safehold_chain::{GasDefaults, WaitPolicy};
use safehold_core::KdfParams;
use safehold_wallet::VaultOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub wallet: WalletSection,

    #[serde(default)]
    pub chain: ChainSection,

    /// Gas price and per-operation limits
    #[serde(default)]
    pub gas: GasDefaults,

    #[serde(default)]
    pub log: LogSection,
}

/// Where and how the wallet is stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSection {
    /// Directory holding the SQLite database or JSON file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub storage: StorageBackend,

    /// Keep the decrypted key in storage until an explicit lock. Anyone who
    /// can read the data directory can then read the key.
    #[serde(default)]
    pub remember_unlock: bool,

    #[serde(default)]
    pub kdf: KdfSection,
}

impl Default for WalletSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: StorageBackend::default(),
            remember_unlock: false,
            kdf: KdfSection::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Json,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "json" => Ok(Self::Json),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown storage backend: {}", other),
        }
    }
}

/// Argon2id cost for new ciphertexts and password hashes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdfSection {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for KdfSection {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

/// Target network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSection {
    /// Node endpoint for an external `ChainClient` transport. Safehold ships
    /// no RPC client of its own; this is validated and reported only.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Transactions are signed for this chain only
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// How long to wait for a receipt before giving up
    #[serde(default = "default_inclusion_timeout")]
    pub inclusion_timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: default_chain_id(),
            inclusion_timeout_secs: default_inclusion_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSection {
    /// error, warn, info, debug or trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_data_dir() -> PathBuf {
    PathBuf::from(".safehold")
}

fn default_memory_kib() -> u32 {
    KdfParams::default().m_cost
}

fn default_iterations() -> u32 {
    KdfParams::default().t_cost
}

fn default_parallelism() -> u32 {
    KdfParams::default().p_cost
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_chain_id() -> u64 {
    1337
}

fn default_inclusion_timeout() -> u64 {
    120
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One day; longer waits are a misconfiguration.
const MAX_INCLUSION_TIMEOUT_SECS: u64 = 86_400;

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

// ============================================================================
// Loading & environment override
// ============================================================================

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse TOML config")
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `SAFEHOLD_DATA_DIR`
    /// - `SAFEHOLD_STORAGE`
    /// - `SAFEHOLD_LOG_LEVEL`
    /// - `SAFEHOLD_RPC_URL`
    /// - `SAFEHOLD_CHAIN_ID`
    /// - `SAFEHOLD_INCLUSION_TIMEOUT`
    /// - `SAFEHOLD_REMEMBER_UNLOCK`
    ///
    /// Values that fail to parse are an error rather than silently ignored.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::apply_env_overrides`] with an explicit lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("SAFEHOLD_DATA_DIR") {
            self.wallet.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SAFEHOLD_STORAGE") {
            self.wallet.storage = v.parse()?;
        }
        if let Some(v) = lookup("SAFEHOLD_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Some(v) = lookup("SAFEHOLD_RPC_URL") {
            self.chain.rpc_url = v;
        }
        if let Some(v) = lookup("SAFEHOLD_CHAIN_ID") {
            self.chain.chain_id = v
                .parse()
                .with_context(|| format!("SAFEHOLD_CHAIN_ID is not a number: {}", v))?;
        }
        if let Some(v) = lookup("SAFEHOLD_INCLUSION_TIMEOUT") {
            self.chain.inclusion_timeout_secs = v
                .parse()
                .with_context(|| format!("SAFEHOLD_INCLUSION_TIMEOUT is not a number: {}", v))?;
        }
        if let Some(v) = lookup("SAFEHOLD_REMEMBER_UNLOCK") {
            self.wallet.remember_unlock = parse_flag(&v)
                .with_context(|| format!("SAFEHOLD_REMEMBER_UNLOCK is not a boolean: {}", v))?;
        }
        Ok(())
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chain.chain_id > 0, "chain.chain_id must be > 0");
        anyhow::ensure!(
            self.chain.rpc_url.starts_with("http://")
                || self.chain.rpc_url.starts_with("https://")
                || self.chain.rpc_url.starts_with("ws://")
                || self.chain.rpc_url.starts_with("wss://"),
            "chain.rpc_url must be an http(s) or ws(s) URL"
        );
        anyhow::ensure!(
            self.chain.inclusion_timeout_secs > 0
                && self.chain.inclusion_timeout_secs <= MAX_INCLUSION_TIMEOUT_SECS,
            "chain.inclusion_timeout_secs must be between 1 and {}",
            MAX_INCLUSION_TIMEOUT_SECS
        );
        anyhow::ensure!(
            self.chain.poll_interval_ms > 0
                && self.chain.poll_interval_ms / 1000 < self.chain.inclusion_timeout_secs,
            "chain.poll_interval_ms must be > 0 and shorter than the inclusion timeout"
        );

        anyhow::ensure!(
            self.gas.native_transfer >= 21_000,
            "gas.native_transfer must be >= 21000"
        );
        anyhow::ensure!(
            self.gas.token_call >= self.gas.native_transfer
                && self.gas.contract_call >= self.gas.native_transfer
                && self.gas.deploy >= self.gas.native_transfer,
            "gas limits for token, contract and deploy calls must be >= gas.native_transfer"
        );
        anyhow::ensure!(!self.gas.gas_price.is_zero(), "gas.gas_price must be > 0");

        let kdf = &self.wallet.kdf;
        anyhow::ensure!(
            kdf.iterations >= 1 && kdf.parallelism >= 1,
            "wallet.kdf iterations and parallelism must be >= 1"
        );
        anyhow::ensure!(
            self.kdf_params().within_limits(),
            "wallet.kdf cost exceeds the supported limits"
        );
        anyhow::ensure!(
            kdf.memory_kib >= 8 * kdf.parallelism,
            "wallet.kdf.memory_kib must be at least 8 * parallelism"
        );
        if self.wallet.storage != StorageBackend::Memory {
            anyhow::ensure!(
                !self.wallet.data_dir.as_os_str().is_empty(),
                "wallet.data_dir must not be empty"
            );
        }

        anyhow::ensure!(
            LOG_LEVELS.contains(&self.log.level.to_ascii_lowercase().as_str()),
            "log.level must be one of {}",
            LOG_LEVELS.join(", ")
        );
        Ok(())
    }

    pub fn kdf_params(&self) -> KdfParams {
        let kdf = &self.wallet.kdf;
        KdfParams::new(kdf.memory_kib, kdf.iterations, kdf.parallelism)
    }

    pub fn vault_options(&self) -> VaultOptions {
        VaultOptions {
            kdf: self.kdf_params(),
            remember_unlock: self.wallet.remember_unlock,
        }
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_secs(self.chain.inclusion_timeout_secs),
            poll_interval: Duration::from_millis(self.chain.poll_interval_ms),
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("expected true or false"),
    }
}

// ============================================================================
// Tests
// ============================================================================
