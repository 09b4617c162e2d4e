//! Decoding of individual trie nodes as they appear inside proofs.

use std::fmt::{self, Display};

use enum_as_inner::EnumAsInner;
use ethereum_types::H256;
use rlp_codec::{decode_exact, RlpError, RlpItem};
use thiserror::Error;

use crate::nibbles::{FromHexPrefixError, Nibbles};

/// Number of items in a branch node: 16 children plus a value slot.
pub const BRANCH_NODE_ITEMS: usize = 17;

/// Encodings shorter than this are embedded in their parent instead of being
/// referenced by hash.
pub const MAX_INLINE_NODE_LEN: usize = 31;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
/// Errors encountered when decoding a trie node.
pub enum NodeDecodeError {
    #[error(transparent)]
    /// The node is not valid RLP.
    Rlp(#[from] RlpError),

    #[error("Trie node has {0} items instead of 2 or 17")]
    /// Neither a branch nor a short node.
    InvalidItemCount(usize),

    #[error(transparent)]
    /// The path of a short node is not a valid hex prefix encoding.
    HexPrefix(#[from] FromHexPrefixError),

    #[error("Child reference of {0} bytes is neither a hash nor an embedded node")]
    /// A child reference that is not empty, a hash or an embedded list.
    InvalidChildReference(usize),

    #[error("Embedded node of {0} bytes is too large to be inlined")]
    /// An embedded node that should have been referenced by hash.
    OversizedInlineNode(usize),
}

/// A reference from a node to one of its children.
#[derive(Clone, Debug, EnumAsInner, Eq, Hash, PartialEq)]
pub enum ChildRef {
    /// No child.
    Empty,
    /// Child referenced by the hash of its encoding.
    Hash(H256),
    /// Child small enough to be embedded; holds its full encoding.
    Inline(Vec<u8>),
}

impl ChildRef {
    fn from_item(item: &RlpItem) -> Result<Self, NodeDecodeError> {
        match item {
            RlpItem::Bytes(b) if b.is_empty() => Ok(ChildRef::Empty),
            RlpItem::Bytes(b) if b.len() == 32 => Ok(ChildRef::Hash(H256::from_slice(b))),
            RlpItem::Bytes(b) => Err(NodeDecodeError::InvalidChildReference(b.len())),
            RlpItem::List(_) => {
                let encoded = item.encode();

                match encoded.len() > MAX_INLINE_NODE_LEN {
                    false => Ok(ChildRef::Inline(encoded)),
                    true => Err(NodeDecodeError::OversizedInlineNode(encoded.len())),
                }
            }
        }
    }
}

/// A decoded trie node.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ProofNode {
    /// Branch node with one child per nibble and an optional value.
    Branch {
        /// The 16 child references.
        children: Box<[ChildRef; 16]>,
        /// Value stored at this node; empty when absent.
        value: Vec<u8>,
    },

    /// Extension node sharing `nibbles` before continuing at `child`.
    Extension {
        /// Shared path segment.
        nibbles: Nibbles,
        /// The node following the shared segment.
        child: ChildRef,
    },

    /// Leaf node terminating the remaining path `nibbles`.
    Leaf {
        /// Remaining path segment.
        nibbles: Nibbles,
        /// Stored value.
        value: Vec<u8>,
    },
}

impl ProofNode {
    /// Decodes a node from its RLP encoding.
    pub fn decode(encoded: &[u8]) -> Result<Self, NodeDecodeError> {
        let item = decode_exact(encoded)?;
        let items = item.list()?;

        match items.len() {
            BRANCH_NODE_ITEMS => {
                let mut children: Box<[ChildRef; 16]> =
                    Box::new(std::array::from_fn(|_| ChildRef::Empty));

                for (slot, child) in children.iter_mut().zip(items.iter()) {
                    *slot = ChildRef::from_item(child)?;
                }

                Ok(ProofNode::Branch {
                    children,
                    value: items[16].bytes()?.to_vec(),
                })
            }
            2 => {
                let (nibbles, is_leaf) = Nibbles::from_hex_prefix_encoding(items[0].bytes()?)?;

                match is_leaf {
                    false => Ok(ProofNode::Extension {
                        nibbles,
                        child: ChildRef::from_item(&items[1])?,
                    }),
                    true => Ok(ProofNode::Leaf {
                        nibbles,
                        value: items[1].bytes()?.to_vec(),
                    }),
                }
            }
            n => Err(NodeDecodeError::InvalidItemCount(n)),
        }
    }

    /// The simplified type of this node.
    pub fn node_type(&self) -> TrieNodeType {
        match self {
            ProofNode::Branch { .. } => TrieNodeType::Branch,
            ProofNode::Extension { .. } => TrieNodeType::Extension,
            ProofNode::Leaf { .. } => TrieNodeType::Leaf,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
/// Simplified trie node type to make logging cleaner.
pub enum TrieNodeType {
    /// Branch node.
    Branch,

    /// Extension node.
    Extension,

    /// Leaf node.
    Leaf,
}

impl Display for TrieNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrieNodeType::Branch => "Branch",
            TrieNodeType::Extension => "Extension",
            TrieNodeType::Leaf => "Leaf",
        };

        write!(f, "{}", s)
    }
}
