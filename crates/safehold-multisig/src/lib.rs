//! Safehold Multisig
//!
//! Client-side coordination of an on-chain multisig treasury: propose,
//! deposit, co-sign and execute, with fail-fast guards before every
//! submission and a re-read after every receipt.
//!
//! The contract cannot enumerate its proposals, so every id this client
//! proposes or imports is remembered in the wallet's ledger once the
//! contract confirms it exists.
//!
//! ```text
//! guardians A, B, C; minSignatures = 2
//!
//! A: propose_native(D, 1.0) -> id      (A's signature counted)
//! *: deposit_native(id, 1.0)           (contract holds 1.0)
//! B: sign(id)                          (2 of 2)
//! C: execute(id)                       (D receives 1.0)
//! ```

pub mod coordinator;
pub mod error;
pub mod status;

pub use coordinator::MultisigCoordinator;
pub use error::MultisigError;
pub use status::{ProposalStatus, TrackedTransaction};
