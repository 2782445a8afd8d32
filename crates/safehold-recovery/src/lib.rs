//! Safehold Recovery
//!
//! Social recovery: a contract owned by the wallet's account, with a set of
//! guardians who can jointly hand ownership to a new address once a quorum
//! of them vote for it.

pub mod coordinator;
pub mod error;

pub use coordinator::{RecoveryCoordinator, VoteOutcome};
pub use error::RecoveryError;
