use serde::{Deserialize, Serialize};

use foodblock_types::BlockHash;

use crate::hasher::ContentHasher;

/// Side of a sibling in a Merkle proof path.
///
/// Pairs are sorted before hashing, so the side does not affect the result;
/// it is recorded for readers reconstructing the tree shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One sibling on the path from a leaf to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    /// The sibling node's hash.
    pub hash: BlockHash,
    /// Where the sibling sits relative to the walked node.
    pub position: Side,
    /// Layer index of the walked node (0 = leaves).
    pub layer: usize,
}

/// Binary Merkle tree with sorted-pair interior nodes.
///
/// Each layer pairs adjacent nodes and hashes every pair with
/// [`ContentHasher::hash_pair`]. An unpaired final node is promoted
/// unchanged to the next layer. An empty tree has root `SHA256("")`.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: BlockHash,
    /// Layer 0 holds the leaves, the last layer holds the root.
    levels: Vec<Vec<BlockHash>>,
}

impl MerkleTree {
    /// Build a tree over leaves in the given order.
    pub fn from_leaves(leaves: Vec<BlockHash>) -> Self {
        if leaves.is_empty() {
            return Self {
                root: ContentHasher::empty_root(),
                levels: vec![],
            };
        }

        let mut levels: Vec<Vec<BlockHash>> = vec![leaves];
        loop {
            let current = &levels[levels.len() - 1];
            if current.len() <= 1 {
                break;
            }
            let next: Vec<BlockHash> = current
                .chunks(2)
                .map(|pair| match pair {
                    [a, b] => ContentHasher::hash_pair(a, b),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }

        let root = levels[levels.len() - 1][0];
        Self { root, levels }
    }

    /// The root hash of the tree.
    pub fn root(&self) -> BlockHash {
        self.root
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// All layers, leaves first.
    pub fn levels(&self) -> &[Vec<BlockHash>] {
        &self.levels
    }

    /// Sibling path for the leaf at `index`.
    ///
    /// Layers where the walked node was promoted without a sibling
    /// contribute no step.
    pub fn path(&self, index: usize) -> Option<Vec<ProofStep>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut steps = Vec::new();
        let mut idx = index;
        for (layer, nodes) in self.levels[..self.levels.len() - 1].iter().enumerate() {
            let (sibling_idx, position) = if idx % 2 == 0 {
                (idx + 1, Side::Right)
            } else {
                (idx - 1, Side::Left)
            };
            if let Some(sibling) = nodes.get(sibling_idx) {
                steps.push(ProofStep {
                    hash: *sibling,
                    position,
                    layer,
                });
            }
            idx /= 2;
        }
        Some(steps)
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let path = self.path(index)?;
        Some(MerkleProof {
            leaf: self.levels[0][index],
            path,
            root: self.root,
        })
    }
}

/// Merkle inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: BlockHash,
    /// Siblings from leaf to root, in layer order.
    pub path: Vec<ProofStep>,
    /// Expected root hash.
    pub root: BlockHash,
}

impl MerkleProof {
    /// Recompute the root from the leaf and path.
    pub fn verify(&self) -> bool {
        fold_path(self.leaf, &self.path) == Some(self.root)
    }
}

/// Fold a leaf up through its sibling steps.
///
/// Returns `None` if the steps are not in strictly increasing layer order,
/// which no honestly built path produces.
pub fn fold_path(leaf: BlockHash, steps: &[ProofStep]) -> Option<BlockHash> {
    let mut current = leaf;
    let mut last_layer: Option<usize> = None;
    for step in steps {
        if last_layer.is_some_and(|l| step.layer <= l) {
            return None;
        }
        last_layer = Some(step.layer);
        current = ContentHasher::hash_pair(&current, &step.hash);
    }
    Some(current)
}
