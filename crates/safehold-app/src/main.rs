//! Safehold command-line wallet
//!
//! Local vault and ledger management. Every command prints its
//! `CommandResult` as JSON and exits non-zero on failure.
//!
//! # Usage
//!
//! ```bash
//! safehold --config safehold.toml status
//! SAFEHOLD_PASSWORD=... safehold create
//! safehold txs 0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed
//! ```

use anyhow::{Context, Result};
use safehold_app::commands;
use safehold_app::{App, AppConfig, CommandResult};
use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Parse CLI args (minimal, no clap dependency needed)
    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut validate_only = false;
    let mut rest: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--validate" => {
                validate_only = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("safehold {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            _ => rest.push(args[i].clone()),
        }
        i += 1;
    }

    let mut config = match &config_path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides()?;
    config
        .validate()
        .context("Configuration validation failed")?;

    env_logger::Builder::new()
        .parse_filters(&config.log.level)
        .init();

    if validate_only {
        println!("Configuration is valid.");
        println!("  Storage:        {:?}", config.wallet.storage);
        println!("  Data dir:       {}", config.wallet.data_dir.display());
        println!("  Remember unlock: {}", config.wallet.remember_unlock);
        println!("  RPC:            {}", config.chain.rpc_url);
        println!("  Chain id:       {}", config.chain.chain_id);
        println!(
            "  Inclusion wait: {} secs",
            config.chain.inclusion_timeout_secs
        );
        return Ok(());
    }

    let Some((command, params)) = rest.split_first() else {
        print_help();
        return Ok(());
    };

    let mut app = App::open(config)?;
    let success = match (command.as_str(), params) {
        ("status", []) => emit(commands::wallet_status(&app)),
        ("create", []) => emit(commands::create_wallet(&mut app, &read_password()?)),
        ("import", [key]) => emit(commands::import_wallet(&mut app, key, &read_password()?)),
        ("unlock", []) => emit(commands::unlock_wallet(&mut app, &read_password()?)),
        ("lock", []) => emit(commands::lock_wallet(&mut app)),
        ("export", []) => emit(commands::export_private_key(&app, &read_password()?)),
        ("wipe", [flag]) if flag == "--yes" => emit(commands::wipe_wallet(&mut app)),
        ("wipe", _) => {
            anyhow::bail!("wipe deletes the wallet and cannot be undone; pass --yes to confirm")
        }
        ("contracts", []) => emit(commands::list_contracts(&app)),
        ("txs", [contract]) => emit(commands::list_transaction_ids(&app, contract)),
        (other, _) => anyhow::bail!("Unknown command or wrong arguments: {}", other),
    }?;

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn emit<T: Serialize>(result: CommandResult<T>) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}

/// `SAFEHOLD_PASSWORD`, or one line from stdin
fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var("SAFEHOLD_PASSWORD") {
        return Ok(password);
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_help() {
    println!(
        r#"Safehold - password vault and multisig ledger

USAGE:
    safehold [OPTIONS] <COMMAND>

OPTIONS:
    -c, --config <PATH>   Config file path (defaults apply when omitted)
    --validate            Validate configuration and exit
    -h, --help            Show this help message
    -V, --version         Show version

COMMANDS:
    status                Lock state and address
    create                Create a wallet with a new key
    import <HEX>          Create a wallet from a 64-hex private key
    unlock                Check the password and unlock
    lock                  Lock and forget any remembered key
    export                Print the private key (backup before wipe)
    wipe --yes            Delete the wallet, ledger and caches
    contracts             Known multisig contracts
    txs <ADDRESS>         Known proposal ids for a contract

The password is read from SAFEHOLD_PASSWORD, or from the first line of stdin.

ENVIRONMENT VARIABLES (override config file):
    SAFEHOLD_DATA_DIR           Data directory path
    SAFEHOLD_STORAGE            sqlite, json or memory
    SAFEHOLD_LOG_LEVEL          error/warn/info/debug/trace
    SAFEHOLD_RPC_URL            Node URL
    SAFEHOLD_CHAIN_ID           Target chain id
    SAFEHOLD_INCLUSION_TIMEOUT  Receipt wait in seconds
    SAFEHOLD_REMEMBER_UNLOCK    Keep the key unlocked across runs (true/false)
"#
    );
}
