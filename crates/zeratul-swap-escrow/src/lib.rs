//! zeratul swap escrow
//!
//! private swap escrow on top of an append-only commitment tree
//!
//! # architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ESCROW LEDGER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  deposit     fixed denomination + commitment → tree leaf    │
//! │  swap        operator converts one denomination,            │
//! │              outcome keyed by nullifier hash                │
//! │  withdraw    proof over (root, nullifier, recipient),       │
//! │              proceeds released once                         │
//! │                                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  external: proof verifier │ swap venue │ asset bank         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! the ledger treats the verifier as an opaque oracle. it never learns
//! which commitment a nullifier belongs to.

pub mod config;
pub mod error;
pub mod events;
pub mod external;
pub mod guard;
pub mod ledger;
pub mod memory;
pub mod registry;
pub mod types;

pub use config::{ConfigError, LedgerConfig, SeedConfiguration};
pub use error::{BankError, ErrorKind, EscrowError, Result, Role, VenueError};
pub use events::LedgerEvent;
pub use external::{AssetBank, ProofVerifier, SwapVenue};
pub use ledger::{Collaborators, EscrowLedger};
pub use registry::SwapRegistry;
pub use types::{
    Address, Amount, AssetId, CallContext, Commitment, CommitmentState, ConfigId, DepositRecord,
    NullifierHash, PublicInputs, SwapConfiguration, SwapDescription, SwapOutcome, SwapPath,
    SwapResult, Timestamp, VenueParams, WithdrawProof,
};

pub use zeratul_commitment_tree::{Hash, MembershipProof};
