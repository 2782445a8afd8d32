//! Safehold Chain
//!
//! Everything between the coordinators and a blockchain node:
//!
//! - [`ChainClient`]: the node interface (reads, static calls, submission,
//!   receipts)
//! - Typed contract calls for the multisig, recovery and token contracts,
//!   plus thin read bindings over them
//! - Transaction signing with the vault's account key
//! - [`Submitter`]: sign, send and wait for inclusion with an explicit
//!   timeout, tracked as a [`SubmissionState`]
//! - Per-operation gas defaults
//!
//! With the `test-utils` feature, [`testing::MockChain`] executes the same
//! contract semantics in memory.

pub mod bindings;
pub mod call;
pub mod client;
pub mod error;
pub mod gas;
pub mod receipt;
pub mod submit;
pub mod tx;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use bindings::{MultisigContract, RecoveryContract, TokenContract};
pub use call::{
    Call, DeployCall, MultisigCall, MultisigRead, MultisigTransaction, ReadCall, ReadValue,
    RecoveryCall, RecoveryRead, TokenCall, TokenRead,
};
pub use client::ChainClient;
pub use error::ChainError;
pub use gas::{GasDefaults, GasSettings, OperationKind};
pub use receipt::{Receipt, ReceiptStatus, SubmissionState};
pub use submit::{Submitter, WaitPolicy};
pub use tx::{sign_request, SignedTx, TxHash, TxRequest};
