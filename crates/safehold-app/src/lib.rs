//! Safehold App
//!
//! The outermost layer: configuration, the [`App`] composition root and the
//! [`commands`] a UI calls. The `safehold` binary is a thin command-line
//! front end over the same commands.

pub mod app;
pub mod commands;
pub mod config;

pub use app::App;
pub use commands::{CommandError, CommandResult};
pub use config::{AppConfig, StorageBackend};
