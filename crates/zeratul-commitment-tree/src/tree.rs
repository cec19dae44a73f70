//! append-only commitment tree with sparse node storage

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::hasher::{NodeHasher, Sha256Compress};
use crate::{Hash, Result, TreeError, MAX_TREE_HEIGHT, ZERO_LEAF};

/// merkle membership proof for a single leaf
///
/// `path_bits[level]` is true when the node on the path at that level is
/// the right child, i.e. its sibling sits on the left.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MembershipProof {
    pub leaf_index: u64,
    /// sibling hashes from leaf level up to the root's children
    pub siblings: Vec<Hash>,
    pub path_bits: Vec<bool>,
}

impl MembershipProof {
    /// fold `leaf` up the path and return the implied root
    pub fn compute_root<H: NodeHasher>(&self, leaf: &Hash) -> Hash {
        fold_path::<H>(leaf, &self.siblings, &self.path_bits)
    }

    /// check the proof against an explicit root
    pub fn verify<H: NodeHasher>(&self, leaf: &Hash, root: &Hash) -> bool {
        self.siblings.len() == self.path_bits.len() && self.compute_root::<H>(leaf) == *root
    }
}

fn fold_path<H: NodeHasher>(leaf: &Hash, siblings: &[Hash], path_bits: &[bool]) -> Hash {
    siblings
        .iter()
        .zip(path_bits)
        .fold(*leaf, |current, (sibling, &is_right)| {
            if is_right {
                H::hash(sibling, &current)
            } else {
                H::hash(&current, sibling)
            }
        })
}

fn default_hashes<H: NodeHasher>(height: u8) -> Vec<Hash> {
    let mut defaults = Vec::with_capacity(height as usize + 1);
    defaults.push(ZERO_LEAF);
    for level in 0..height as usize {
        let below = defaults[level];
        defaults.push(H::hash(&below, &below));
    }
    defaults
}

/// root of a tree of the given height with every slot unfilled
pub fn empty_root<H: NodeHasher>(height: u8) -> Hash {
    (0..height).fold(ZERO_LEAF, |node, _| H::hash(&node, &node))
}

/// fixed-height append-only commitment tree
#[derive(Clone, Debug)]
pub struct CommitmentTree<H: NodeHasher = Sha256Compress> {
    height: u8,
    leaf_count: u64,
    root: Hash,
    /// default hash per level, `defaults[height]` is the empty root
    defaults: Vec<Hash>,
    /// rightmost filled subtree per level
    filled_subtrees: Vec<Hash>,
    /// computed nodes keyed by (level, index)
    nodes: HashMap<(u8, u64), Hash>,
    _hasher: PhantomData<fn() -> H>,
}

impl<H: NodeHasher> CommitmentTree<H> {
    /// create an empty tree of `height` levels (capacity `2^height`)
    pub fn new(height: u8) -> Result<Self> {
        if height == 0 || height > MAX_TREE_HEIGHT {
            return Err(TreeError::InvalidHeight(height));
        }

        let defaults = default_hashes::<H>(height);
        let filled_subtrees = defaults[..height as usize].to_vec();

        Ok(Self {
            height,
            leaf_count: 0,
            root: defaults[height as usize],
            defaults,
            filled_subtrees,
            nodes: HashMap::new(),
            _hasher: PhantomData,
        })
    }

    /// append a commitment, returns its leaf index
    pub fn insert(&mut self, commitment: Hash) -> Result<u64> {
        if self.is_full() {
            return Err(TreeError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }

        let leaf_index = self.leaf_count;
        let mut index = leaf_index;
        let mut current = commitment;

        for level in 0..self.height {
            let slot = level as usize;
            self.nodes.insert((level, index), current);

            current = if index & 1 == 0 {
                self.filled_subtrees[slot] = current;
                H::hash(&current, &self.defaults[slot])
            } else {
                // odd index: the even predecessor was inserted earlier
                let left = self
                    .nodes
                    .get(&(level, index - 1))
                    .copied()
                    .unwrap_or(self.filled_subtrees[slot]);
                H::hash(&left, &current)
            };

            index >>= 1;
        }

        self.nodes.insert((self.height, 0), current);
        self.root = current;
        self.leaf_count += 1;

        Ok(leaf_index)
    }

    /// build the sibling path for an inserted leaf against the current root
    pub fn prove_membership(&self, leaf_index: u64) -> Result<MembershipProof> {
        if leaf_index >= self.leaf_count {
            return Err(TreeError::InvalidIndex {
                index: leaf_index,
                leaf_count: self.leaf_count,
            });
        }

        let mut siblings = Vec::with_capacity(self.height as usize);
        let mut path_bits = Vec::with_capacity(self.height as usize);
        let mut index = leaf_index;

        for level in 0..self.height {
            siblings.push(self.node(level, index ^ 1));
            path_bits.push(index & 1 == 1);
            index >>= 1;
        }

        Ok(MembershipProof {
            leaf_index,
            siblings,
            path_bits,
        })
    }

    /// recompute the root from `leaf` and its path, compare to the live root
    pub fn verify_membership(&self, leaf: &Hash, siblings: &[Hash], path_bits: &[bool]) -> bool {
        let height = self.height as usize;
        if siblings.len() != height || path_bits.len() != height {
            return false;
        }
        fold_path::<H>(leaf, siblings, path_bits) == self.root
    }

    /// stored node at (level, index), or the level default if never computed
    pub fn node(&self, level: u8, index: u64) -> Hash {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or_else(|| self.default_hash(level))
    }

    pub fn root(&self) -> Hash {
        self.root
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.height
    }

    pub fn is_full(&self) -> bool {
        self.leaf_count == self.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// default (all-unfilled) hash for a level; levels above the root clamp
    pub fn default_hash(&self, level: u8) -> Hash {
        let level = (level as usize).min(self.height as usize);
        self.defaults[level]
    }

    /// rightmost filled subtree cached for a level
    pub fn filled_subtree(&self, level: u8) -> Option<Hash> {
        self.filled_subtrees.get(level as usize).copied()
    }
}
