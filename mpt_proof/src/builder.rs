//! Construction of tries and inclusion proofs from a full key/value set.
//!
//! This is the relayer side of [`verify_proof`](crate::proof::verify_proof):
//! given every transaction (or receipt) of a block it rebuilds the trie, whose
//! root must equal the header's transactions root (or receipts root), and
//! extracts the proof for one of its entries.

use std::collections::BTreeMap;

use ethereum_types::H256;
use log::trace;
use rlp_codec::RlpItem;

use crate::{
    nibbles::Nibbles,
    trie_hashing::{hash_trie, rlp_encode_node},
};

/// In-memory trie node.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) enum Node {
    #[default]
    Empty,
    Branch {
        children: Box<[Node; 16]>,
        value: Option<Vec<u8>>,
    },
    Extension {
        nibbles: Nibbles,
        child: Box<Node>,
    },
    Leaf {
        nibbles: Nibbles,
        value: Vec<u8>,
    },
}

/// Collects key/value pairs before building a [`Trie`].
#[derive(Clone, Debug, Default)]
pub struct TrieBuilder {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl TrieBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for a list of values keyed by the RLP encoding of
    /// their position, the way block transactions and receipts are stored.
    pub fn from_ordered_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let mut builder = Self::new();

        for (i, v) in values.into_iter().enumerate() {
            builder.insert(RlpItem::from(i as u64).encode(), v);
        }

        builder
    }

    /// Inserts `value` under `key`, replacing any previous value.
    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> &mut Self {
        self.entries.insert(key, value);
        self
    }

    /// Builds the trie.
    pub fn build(&self) -> Trie {
        // Byte order equals nibble order, and a key that is a prefix of another
        // sorts first.
        let entries: Vec<(Nibbles, Vec<u8>)> = self
            .entries
            .iter()
            .map(|(k, v)| (Nibbles::from_bytes_be(k), v.clone()))
            .collect();

        trace!("Building trie from {} entries", entries.len());

        Trie {
            root: build_node(&entries, 0),
        }
    }
}

fn build_node(entries: &[(Nibbles, Vec<u8>)], depth: usize) -> Node {
    match entries {
        [] => Node::Empty,
        [(key, value)] => Node::Leaf {
            nibbles: key.suffix(depth),
            value: value.clone(),
        },
        [(first, _), .., (last, _)] => {
            let shared = first.suffix(depth).common_prefix_len(&last[depth..]);

            match shared {
                0 => build_branch(entries, depth),
                _ => Node::Extension {
                    nibbles: first.segment(depth, depth + shared),
                    child: Box::new(build_branch(entries, depth + shared)),
                },
            }
        }
    }
}

fn build_branch(entries: &[(Nibbles, Vec<u8>)], depth: usize) -> Node {
    let mut children: Box<[Node; 16]> = Box::default();

    let (value, rest) = match entries.first() {
        Some((key, value)) if key.len() == depth => (Some(value.clone()), &entries[1..]),
        _ => (None, entries),
    };

    let mut start = 0;
    while start < rest.len() {
        let nibble = rest[start].0[depth];
        let len = rest[start..]
            .iter()
            .take_while(|(k, _)| k[depth] == nibble)
            .count();

        children[nibble as usize] = build_node(&rest[start..start + len], depth + 1);
        start += len;
    }

    Node::Branch { children, value }
}

/// A fully materialized trie.
#[derive(Clone, Debug, Default)]
pub struct Trie {
    root: Node,
}

impl Trie {
    /// The root hash of the trie.
    pub fn root_hash(&self) -> H256 {
        hash_trie(&self.root)
    }

    /// Looks up the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let path = Nibbles::from_bytes_be(key);
        let mut node = &self.root;
        let mut depth = 0;

        loop {
            node = match node {
                Node::Empty => return None,
                Node::Leaf { nibbles, value } => {
                    return (path[depth..] == nibbles[..]).then_some(value.as_slice())
                }
                Node::Branch { children, value } => match path.get(depth) {
                    None => return value.as_deref(),
                    Some(n) => {
                        depth += 1;
                        &children[*n as usize]
                    }
                },
                Node::Extension { nibbles, child } => {
                    if !path[depth..].starts_with(nibbles) {
                        return None;
                    }
                    depth += nibbles.len();
                    child
                }
            };
        }
    }

    /// The proof for `key`: the encodings of every node on its path that is
    /// referenced by hash, starting with the root. Embedded nodes are part of
    /// their parent's encoding and not repeated.
    ///
    /// For an absent key this is an exclusion proof, which
    /// [`verify_proof`](crate::proof::verify_proof) rejects.
    pub fn proof(&self, key: &[u8]) -> Vec<Vec<u8>> {
        let path = Nibbles::from_bytes_be(key);
        let mut proof = Vec::new();
        let mut node = &self.root;
        let mut depth = 0;

        loop {
            let encoded = rlp_encode_node(node);
            if proof.is_empty() || encoded.len() >= 32 {
                proof.push(encoded);
            }

            node = match node {
                Node::Empty | Node::Leaf { .. } => break,
                Node::Branch { children, .. } => match path.get(depth) {
                    None => break,
                    Some(n) => {
                        depth += 1;
                        &children[*n as usize]
                    }
                },
                Node::Extension { nibbles, child } => {
                    if !path[depth..].starts_with(nibbles) {
                        break;
                    }
                    depth += nibbles.len();
                    child
                }
            };
        }

        proof
    }
}
