//! incremental commitment tree
//!
//! fixed-height, append-only binary hash tree over opaque 256-bit
//! commitments. only nodes that have actually been computed are stored;
//! every other slot resolves to the precomputed default hash of its level.
//!
//! ```text
//!                      root (level H)
//!                    /               \
//!             node(H-1, 0)        default[H-1]
//!              /       \
//!        leaf 0       leaf 1      ... unfilled slots = default[0] = 0
//! ```
//!
//! the node hasher is a type parameter. whatever circuit produces the
//! membership proofs must use the same compression function bit-for-bit,
//! otherwise proofs silently fail to verify.

pub mod hasher;
pub mod tree;

pub use hasher::{Blake3Compress, NodeHasher, Sha256Compress};
pub use tree::{empty_root, CommitmentTree, MembershipProof};

/// 256-bit node / commitment value
pub type Hash = [u8; 32];

/// canonical zero element used for unfilled leaf slots
pub const ZERO_LEAF: Hash = [0u8; 32];

/// largest supported tree height (2^32 leaves)
pub const MAX_TREE_HEIGHT: u8 = 32;

/// height used when no explicit height is configured
pub const DEFAULT_TREE_HEIGHT: u8 = 20;

/// commitment tree errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("invalid tree height {0} (must be 1..={max})", max = MAX_TREE_HEIGHT)]
    InvalidHeight(u8),

    #[error("commitment tree is full ({capacity} leaves)")]
    CapacityExceeded { capacity: u64 },

    #[error("leaf index {index} out of range ({leaf_count} leaves inserted)")]
    InvalidIndex { index: u64, leaf_count: u64 },
}

pub type Result<T> = std::result::Result<T, TreeError>;
