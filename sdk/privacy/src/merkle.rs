//! Merkle Tree for Note Commitments
//!
//! Fixed-height, append-only tree mirroring the ledger contract's accumulator.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23          H23 = H2(C2, z0) while C3 is empty
//!                /  \   /   \
//!               C0  C1 C2   z0        (Note Commitments, z0 = empty leaf)
//! ```
//!
//! Insertion keeps the contract's per-level "filled subtree" frontier, so each
//! append costs `height` hashes. The node values produced along that path are
//! also written into flat per-level arrays, which makes proof extraction an
//! index lookup per level instead of a rebuild.

use std::collections::VecDeque;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::error::{PrivacyError, Result};
use crate::field::FieldElement;
use crate::hash::FieldHasher;

/// Largest supported tree height
pub const MAX_TREE_HEIGHT: usize = 32;

/// Number of recent roots the ledger contract accepts
pub const ROOT_HISTORY_SIZE: usize = 30;

/// Pinned tree configuration: height and per-level empty-subtree values
///
/// `zero_values[0]` is the empty leaf and `zero_values[i] = H2(z[i-1], z[i-1])`.
/// The table must be bit-identical to the one the ledger hard-codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeParams {
    height: usize,
    zero_values: Vec<FieldElement>,
}

impl TreeParams {
    /// Use a pinned table as-is
    pub fn new(height: usize, zero_values: Vec<FieldElement>) -> Result<Self> {
        if height == 0 || height > MAX_TREE_HEIGHT {
            return Err(PrivacyError::InvalidTreeHeight(height));
        }
        if zero_values.len() != height {
            return Err(PrivacyError::TreeHeightMismatch {
                expected: height,
                actual: zero_values.len(),
            });
        }
        Ok(Self {
            height,
            zero_values,
        })
    }

    /// Build the table from the empty leaf
    pub fn derive(
        height: usize,
        zero_leaf: FieldElement,
        hasher: &dyn FieldHasher,
    ) -> Result<Self> {
        if height == 0 || height > MAX_TREE_HEIGHT {
            return Err(PrivacyError::InvalidTreeHeight(height));
        }
        let mut zero_values = Vec::with_capacity(height);
        zero_values.push(zero_leaf);
        for level in 1..height {
            let prev = zero_values[level - 1];
            zero_values.push(hasher.hash_pair(&prev, &prev)?);
        }
        Self::new(height, zero_values)
    }

    /// Check that a pinned table really is the H2 chain of its empty leaf
    pub fn verify(&self, hasher: &dyn FieldHasher) -> Result<()> {
        for level in 1..self.height {
            let prev = self.zero_values[level - 1];
            if hasher.hash_pair(&prev, &prev)? != self.zero_values[level] {
                return Err(PrivacyError::ZeroValueMismatch { level });
            }
        }
        Ok(())
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn zero_values(&self) -> &[FieldElement] {
        &self.zero_values
    }

    /// Empty subtree value at `level`
    pub fn zero(&self, level: usize) -> FieldElement {
        self.zero_values[level]
    }

    /// Number of leaves the tree can hold
    pub fn capacity(&self) -> u64 {
        1u64 << self.height
    }
}

/// A Merkle path proving inclusion of a commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    /// The leaf position
    pub leaf_index: u64,
    /// Sibling values from leaf to root
    pub path_elements: Vec<FieldElement>,
    /// Position bits (0 = current node is the left child, 1 = right)
    pub path_indices: Vec<u8>,
    /// Root of the snapshot this path was taken from
    pub root: FieldElement,
}

impl MerkleProof {
    /// Placeholder path for position creation, where no prior leaf exists
    pub fn empty(height: usize, root: FieldElement) -> Self {
        Self {
            leaf_index: 0,
            path_elements: vec![FieldElement::zero(); height],
            path_indices: vec![0; height],
            root,
        }
    }

    /// Fold `leaf` up the path
    pub fn compute_root(
        &self,
        leaf: &FieldElement,
        hasher: &dyn FieldHasher,
    ) -> Result<FieldElement> {
        let mut current = *leaf;
        for (sibling, bit) in self.path_elements.iter().zip(self.path_indices.iter()) {
            current = if *bit == 1 {
                hasher.hash_pair(sibling, &current)?
            } else {
                hasher.hash_pair(&current, sibling)?
            };
        }
        Ok(current)
    }

    /// Verify that this path proves inclusion of `leaf` under `self.root`
    pub fn verify(&self, leaf: &FieldElement, hasher: &dyn FieldHasher) -> Result<bool> {
        Ok(self.compute_root(leaf, hasher)? == self.root)
    }

    pub fn height(&self) -> usize {
        self.path_elements.len()
    }
}

/// Append-only commitment tree
pub struct MerkleTree {
    params: TreeParams,
    hasher: Arc<dyn FieldHasher>,
    /// Node values per level; `layers[0]` is the leaf sequence
    layers: Vec<Vec<FieldElement>>,
    /// Latest left-child node per level, as the contract keeps it
    filled_subtrees: Vec<FieldElement>,
    root: FieldElement,
}

impl MerkleTree {
    /// Create a new empty tree
    pub fn new(params: TreeParams, hasher: Arc<dyn FieldHasher>) -> Result<Self> {
        let root = empty_root(&params, hasher.as_ref())?;
        let filled_subtrees = params.zero_values().to_vec();

        Ok(Self {
            layers: vec![Vec::new(); params.height()],
            params,
            hasher,
            filled_subtrees,
            root,
        })
    }

    /// Rebuild a snapshot from a leaf sequence fetched from the ledger
    pub fn from_leaves(
        params: TreeParams,
        hasher: Arc<dyn FieldHasher>,
        leaves: &[FieldElement],
    ) -> Result<Self> {
        let mut tree = Self::new(params, hasher)?;
        for leaf in leaves {
            tree.insert(*leaf)?;
        }
        debug!(
            "rebuilt snapshot of {} leaves, root {}",
            tree.len(),
            tree.root.to_hex()
        );
        Ok(tree)
    }

    /// Current root
    pub fn root(&self) -> FieldElement {
        self.root
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    pub fn height(&self) -> usize {
        self.params.height()
    }

    pub fn hasher(&self) -> &Arc<dyn FieldHasher> {
        &self.hasher
    }

    /// Number of inserted leaves
    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    pub fn leaves(&self) -> &[FieldElement] {
        &self.layers[0]
    }

    /// The contract-side frontier, for cross-checking against on-chain state
    pub fn filled_subtrees(&self) -> &[FieldElement] {
        &self.filled_subtrees
    }

    /// Append a leaf and return its index
    ///
    /// A hash failure leaves the tree untouched.
    pub fn insert(&mut self, leaf: FieldElement) -> Result<u64> {
        let index = self.len() as u64;
        let capacity = self.params.capacity();
        if index >= capacity {
            return Err(PrivacyError::CapacityExceeded {
                height: self.height(),
                capacity,
            });
        }

        let mut filled = self.filled_subtrees.clone();
        let mut path = Vec::with_capacity(self.height());
        let mut current_index = index;
        let mut current = leaf;

        for level in 0..self.height() {
            path.push(current);

            let (left, right) = if current_index % 2 == 0 {
                filled[level] = current;
                (current, self.params.zero(level))
            } else {
                (filled[level], current)
            };

            current = self.hasher.hash_pair(&left, &right)?;
            current_index /= 2;
        }

        for (level, node) in path.into_iter().enumerate() {
            let position = (index >> level) as usize;
            let layer = &mut self.layers[level];
            if position == layer.len() {
                layer.push(node);
            } else {
                layer[position] = node;
            }
        }
        self.filled_subtrees = filled;
        self.root = current;

        debug!("inserted leaf {} -> root {}", index, self.root.to_hex());
        Ok(index)
    }

    /// Path for the most recently inserted leaf equal to `commitment`
    pub fn proof(&self, commitment: &Commitment) -> Result<MerkleProof> {
        let index = self
            .layers[0]
            .iter()
            .rposition(|leaf| *leaf == commitment.0)
            .ok_or_else(|| PrivacyError::UnknownLeaf(commitment.to_hex()))?;
        self.proof_at(index as u64)
    }

    /// Path for the leaf at `index`
    pub fn proof_at(&self, index: u64) -> Result<MerkleProof> {
        if index >= self.len() as u64 {
            return Err(PrivacyError::UnknownLeaf(format!("index {index}")));
        }

        let mut path_elements = Vec::with_capacity(self.height());
        let mut path_indices = Vec::with_capacity(self.height());

        for level in 0..self.height() {
            let position = (index >> level) as usize;
            let sibling = self.layers[level]
                .get(position ^ 1)
                .copied()
                .unwrap_or_else(|| self.params.zero(level));

            path_elements.push(sibling);
            path_indices.push((position & 1) as u8);
        }

        Ok(MerkleProof {
            leaf_index: index,
            path_elements,
            path_indices,
            root: self.root,
        })
    }

    /// Root recomputed from the leaves alone, level by level
    ///
    /// O(n) hashes. Used to audit the incremental root.
    pub fn recompute_root(&self) -> Result<FieldElement> {
        if self.is_empty() {
            return empty_root(&self.params, self.hasher.as_ref());
        }

        let mut level_nodes = self.layers[0].clone();
        for level in 0..self.height() {
            let zero = self.params.zero(level);
            level_nodes = level_nodes
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(zero);
                    self.hasher.hash_pair(&pair[0], &right)
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
        }

        Ok(level_nodes[0])
    }
}

/// Root of a tree with no leaves
fn empty_root(params: &TreeParams, hasher: &dyn FieldHasher) -> Result<FieldElement> {
    let top = params.zero(params.height() - 1);
    Ok(hasher.hash_pair(&top, &top)?)
}

/// Recent ledger roots
///
/// The ledger accepts proofs against any of its last few roots, which absorbs
/// insertions that land between snapshot and submission.
#[derive(Debug, Clone)]
pub struct RootHistory {
    /// Recent roots (most recent first)
    roots: VecDeque<FieldElement>,
    /// Maximum history size
    max_size: usize,
}

impl RootHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            roots: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Add a new root
    pub fn push(&mut self, root: FieldElement) {
        self.roots.push_front(root);
        if self.roots.len() > self.max_size {
            self.roots.pop_back();
        }
    }

    /// Whether the ledger would still accept `root`. Zero is never a known root.
    pub fn is_known_root(&self, root: &FieldElement) -> bool {
        !root.is_zero() && self.roots.contains(root)
    }

    /// Get the most recent root
    pub fn current(&self) -> Option<&FieldElement> {
        self.roots.front()
    }

    /// Fail with [`PrivacyError::StaleRoot`] if `root` has aged out
    pub fn ensure_fresh(&self, root: &FieldElement) -> Result<()> {
        if self.is_known_root(root) {
            Ok(())
        } else {
            Err(PrivacyError::StaleRoot {
                root: root.to_hex(),
            })
        }
    }
}

impl Default for RootHistory {
    fn default() -> Self {
        Self::new(ROOT_HISTORY_SIZE)
    }
}
