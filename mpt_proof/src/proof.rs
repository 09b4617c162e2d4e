//! Verification of Merkle Patricia trie inclusion proofs.
//!
//! The walk starts at a trusted root hash and consumes the proof front to
//! back. Every node referenced by hash must be the next proof element and hash
//! to the reference. Nodes embedded in their parent are taken from the parent
//! directly; a proof may still repeat such a node as its own element, in which
//! case the element must match the embedded bytes exactly.

use ethereum_types::H256;
use keccak_hash::keccak;
use log::{debug, trace};
use rlp_codec::RlpItem;
use thiserror::Error;

use crate::{
    nibbles::{Nibble, Nibbles},
    node::{ChildRef, NodeDecodeError, ProofNode, TrieNodeType},
};

/// Result type for proof walks.
pub type ProofResult<T> = Result<T, ProofError>;

/// Reasons a proof fails to establish an inclusion.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ProofError {
    /// The path contains a value that is not a nibble.
    #[error("Path element {value:#x} at position {position} is not a nibble")]
    InvalidNibble {
        /// The offending value.
        value: u8,
        /// Its position in the path.
        position: usize,
    },

    /// The walk needs another node but the proof ended.
    #[error("Proof ended after {0} nodes while the path still continues")]
    MissingNode(usize),

    /// A proof node does not hash to the reference held by its parent.
    #[error("Proof node {index} hashes to {found:x} but {expected:x} was referenced")]
    HashMismatch {
        /// Position of the node in the proof.
        index: usize,
        /// The reference held by the parent (or the trusted root).
        expected: H256,
        /// The hash of the supplied node.
        found: H256,
    },

    /// A proof node that is not a well formed trie node.
    #[error("Proof node {index} is malformed: {source}")]
    MalformedNode {
        /// Position of the node in the proof.
        index: usize,
        /// Why decoding failed.
        source: NodeDecodeError,
    },

    /// The path runs into an empty child slot.
    #[error("Path runs into an empty child at depth {0}")]
    EmptyChild(usize),

    /// The nibbles stored in an extension or leaf diverge from the path.
    #[error("{node_type} node at depth {depth} stores {stored} which diverges from the path")]
    PathMismatch {
        /// The node whose nibbles diverge.
        node_type: TrieNodeType,
        /// Path depth at which the node was reached.
        depth: usize,
        /// The nibbles stored in the node.
        stored: Nibbles,
    },

    /// The path ends on a branch that holds no value.
    #[error("Path ends on a branch without a value at depth {0}")]
    NoValue(usize),

    /// The proof holds nodes past the one that terminated the walk.
    #[error("Proof has {0} unused trailing nodes")]
    UnusedNodes(usize),

    /// The proven value does not hash to the expected leaf hash.
    #[error("Proven value hashes to {found:x} instead of {expected:x}")]
    ValueMismatch {
        /// The leaf hash the caller expected.
        expected: H256,
        /// The hash of the value found at the end of the path.
        found: H256,
    },
}

/// The trie path of the `index`-th entry of a block's transaction or receipt
/// trie: the nibbles of the RLP encoding of the index.
pub fn path_for_index(index: u64) -> Nibbles {
    Nibbles::from_bytes_be(&RlpItem::from(index).encode())
}

/// Verifies that the value hashing to `leaf_hash` is stored at `path` in the
/// trie with root `root`, given the nodes of `proof`.
///
/// Malformed input never panics or errors; it simply does not verify. The
/// reason is logged at `debug` level.
pub fn verify_proof(leaf_hash: H256, proof: &[Vec<u8>], root: H256, path: &[Nibble]) -> bool {
    let res = prove_value(root, path, proof).and_then(|value| {
        let found = keccak(&value);

        match found == leaf_hash {
            false => Err(ProofError::ValueMismatch {
                expected: leaf_hash,
                found,
            }),
            true => Ok(()),
        }
    });

    match res {
        Ok(()) => true,
        Err(err) => {
            debug!("Rejected proof for path {:?} under root {:x}: {}", path, root, err);
            false
        }
    }
}

/// Walks `proof` from `root` along `path` and returns the value stored at the
/// end of the path.
pub fn prove_value(root: H256, path: &[Nibble], proof: &[Vec<u8>]) -> ProofResult<Vec<u8>> {
    if let Some((position, value)) = path.iter().enumerate().find(|(_, n)| **n > 0x0f) {
        return Err(ProofError::InvalidNibble {
            value: *value,
            position,
        });
    }

    let mut next_ref = ChildRef::Hash(root);
    let mut next_idx = 0;
    let mut depth = 0;

    loop {
        let (encoded, node_idx) = match next_ref {
            ChildRef::Empty => return Err(ProofError::EmptyChild(depth)),
            ChildRef::Hash(expected) => {
                let encoded = proof
                    .get(next_idx)
                    .ok_or(ProofError::MissingNode(next_idx))?;

                let found = keccak(encoded);
                if found != expected {
                    return Err(ProofError::HashMismatch {
                        index: next_idx,
                        expected,
                        found,
                    });
                }

                next_idx += 1;
                (encoded.clone(), next_idx - 1)
            }
            ChildRef::Inline(embedded) => {
                if proof.get(next_idx) == Some(&embedded) {
                    trace!("Skipping repeated embedded node at proof index {}", next_idx);
                    next_idx += 1;
                }

                (embedded, next_idx.saturating_sub(1))
            }
        };

        let node = ProofNode::decode(&encoded).map_err(|source| ProofError::MalformedNode {
            index: node_idx,
            source,
        })?;

        trace!("Reached {} node at depth {}", node.node_type(), depth);

        let value = match node {
            ProofNode::Branch { mut children, value } => match path.get(depth) {
                None if value.is_empty() => return Err(ProofError::NoValue(depth)),
                None => value,
                Some(nibble) => {
                    next_ref = std::mem::replace(&mut children[*nibble as usize], ChildRef::Empty);
                    depth += 1;
                    continue;
                }
            },
            ProofNode::Extension { nibbles, child } => {
                if !path[depth..].starts_with(&nibbles) {
                    return Err(ProofError::PathMismatch {
                        node_type: TrieNodeType::Extension,
                        depth,
                        stored: nibbles,
                    });
                }

                depth += nibbles.len();
                next_ref = child;
                continue;
            }
            ProofNode::Leaf { nibbles, value } => {
                if path[depth..] != nibbles[..] {
                    return Err(ProofError::PathMismatch {
                        node_type: TrieNodeType::Leaf,
                        depth,
                        stored: nibbles,
                    });
                }

                value
            }
        };

        return match proof.len() - next_idx {
            0 => Ok(value),
            n => Err(ProofError::UnusedNodes(n)),
        };
    }
}
