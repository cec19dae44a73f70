//! error types for the swap escrow

use thiserror::Error;
use zeratul_commitment_tree::TreeError;

use crate::types::{Address, Amount, AssetId, Commitment, ConfigId, NullifierHash};

pub type Result<T> = std::result::Result<T, EscrowError>;

/// privileged roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Operator,
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Operator => write!(f, "operator"),
        }
    }
}

/// error category, for callers that only care about the class of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    InputValidation,
    Replay,
    Capacity,
    Proof,
    ExternalCall,
    Reentrancy,
}

/// host asset environment failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("insufficient {asset} balance for {holder}: need {needed}, have {available}")]
    InsufficientBalance {
        asset: AssetId,
        holder: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("insufficient {asset} allowance from {owner} to {spender}: need {needed}, have {available}")]
    InsufficientAllowance {
        asset: AssetId,
        owner: Address,
        spender: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// swap venue failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    #[error("venue reverted: {0}")]
    Reverted(String),

    #[error("no liquidity for {src} -> {dst}")]
    NoLiquidity { src: AssetId, dst: AssetId },

    #[error("slippage exceeded: return {got} below minimum {min}")]
    SlippageExceeded { got: Amount, min: Amount },

    #[error("venue asset transfer failed: {0}")]
    Transfer(#[from] BankError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    // === authorization ===
    #[error("caller {caller} is not the {required}")]
    Unauthorized { caller: Address, required: Role },

    // === input validation ===
    #[error("commitment must be non-zero")]
    InvalidCommitment,

    #[error("commitment {0} already deposited")]
    DuplicateCommitment(Commitment),

    #[error("asset mismatch: configuration expects {expected_amount} of {expected_asset}, call attached {attached} native")]
    AssetMismatch {
        expected_asset: AssetId,
        expected_amount: Amount,
        attached: Amount,
    },

    #[error("invalid swap configuration {0}")]
    InvalidSwapConfig(ConfigId),

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("recipient must not be the null address")]
    InvalidRecipient,

    #[error("address must not be the null address")]
    InvalidAddress,

    #[error("unsupported swap path {input} -> {output}")]
    UnsupportedSwapPath { input: AssetId, output: AssetId },

    #[error("ledger holds {available} of {asset}, swap needs {needed}")]
    InsufficientLedgerBalance {
        asset: AssetId,
        needed: Amount,
        available: Amount,
    },

    // === replay ===
    #[error("nullifier {0} already used")]
    NullifierAlreadyUsed(NullifierHash),

    #[error("no proceeds available for nullifier {0}")]
    NoProceedsAvailable(NullifierHash),

    #[error("swap not yet executed for nullifier {0}")]
    SwapNotYetExecuted(NullifierHash),

    // === capacity ===
    #[error("commitment tree: {0}")]
    Tree(#[from] TreeError),

    // === proof ===
    #[error("withdrawal proof rejected")]
    InvalidProof,

    // === external calls ===
    #[error("swap venue: {0}")]
    Venue(#[from] VenueError),

    #[error("asset bank: {0}")]
    Bank(#[from] BankError),

    #[error("reentrant call rejected")]
    Reentrancy,
}

impl EscrowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EscrowError::Unauthorized { .. } => ErrorKind::Authorization,
            EscrowError::InvalidCommitment
            | EscrowError::DuplicateCommitment(_)
            | EscrowError::AssetMismatch { .. }
            | EscrowError::InvalidSwapConfig(_)
            | EscrowError::InvalidAmount
            | EscrowError::InvalidRecipient
            | EscrowError::InvalidAddress
            | EscrowError::UnsupportedSwapPath { .. }
            | EscrowError::InsufficientLedgerBalance { .. } => ErrorKind::InputValidation,
            EscrowError::NullifierAlreadyUsed(_)
            | EscrowError::NoProceedsAvailable(_)
            | EscrowError::SwapNotYetExecuted(_) => ErrorKind::Replay,
            EscrowError::Tree(TreeError::CapacityExceeded { .. }) => ErrorKind::Capacity,
            EscrowError::Tree(_) => ErrorKind::InputValidation,
            EscrowError::InvalidProof => ErrorKind::Proof,
            EscrowError::Venue(_) | EscrowError::Bank(_) => ErrorKind::ExternalCall,
            EscrowError::Reentrancy => ErrorKind::Reentrancy,
        }
    }
}
