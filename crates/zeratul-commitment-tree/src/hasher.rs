//! two-input compression functions for tree nodes

use crate::Hash;
use sha2::{Digest, Sha256};

/// domain separator for blake3 node hashing
pub const NODE_DOMAIN: &[u8] = b"zeratul.commitment-tree.node.v1";

/// collision-resistant two-input compression `H(left, right)`
///
/// implementations are stateless; the tree is generic over the hasher
/// type so prover and verifier pick the same function at compile time.
pub trait NodeHasher {
    fn hash(left: &Hash, right: &Hash) -> Hash;
}

/// sha256(left || right)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sha256Compress;

impl NodeHasher for Sha256Compress {
    fn hash(left: &Hash, right: &Hash) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(left);
        hasher.update(right);
        hasher.finalize().into()
    }
}

/// blake3(domain || left || right)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blake3Compress;

impl NodeHasher for Blake3Compress {
    fn hash(left: &Hash, right: &Hash) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(NODE_DOMAIN);
        hasher.update(left);
        hasher.update(right);
        *hasher.finalize().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_is_order_sensitive() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_ne!(Sha256Compress::hash(&a, &b), Sha256Compress::hash(&b, &a));
    }

    #[test]
    fn test_sha256_known_zero_pair() {
        // sha256 of 64 zero bytes
        let expected = "f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b";
        assert_eq!(hex::encode(Sha256Compress::hash(&[0u8; 32], &[0u8; 32])), expected);
    }

    #[test]
    fn test_hashers_disagree() {
        let a = [7u8; 32];
        assert_ne!(Sha256Compress::hash(&a, &a), Blake3Compress::hash(&a, &a));
    }
}
