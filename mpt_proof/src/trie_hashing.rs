use ethereum_types::H256;
use keccak_hash::keccak;
use rlp::RlpStream;

use crate::builder::Node;

/// The node type used for calculating the hash of a trie.
#[derive(Clone, Debug, Hash)]
pub(crate) enum EncodedNode {
    /// Node that is RLPed but not hashed.
    Raw(Vec<u8>),
    /// Node that is hashed.
    Hashed([u8; 32]),
}

impl From<&EncodedNode> for H256 {
    fn from(v: &EncodedNode) -> Self {
        match v {
            EncodedNode::Raw(b) => keccak(b),
            EncodedNode::Hashed(h) => H256(*h),
        }
    }
}

/// Calculates the hash of a node. The root is always hashed, even when its
/// encoding is short enough to be embedded.
pub(crate) fn hash_trie(node: &Node) -> H256 {
    (&rlp_encode_and_hash_node(node)).into()
}

/// The full RLP encoding of a node, with children replaced by references.
pub(crate) fn rlp_encode_node(node: &Node) -> Vec<u8> {
    match node {
        Node::Empty => rlp::NULL_RLP.to_vec(),
        Node::Branch { children, value } => {
            let mut stream = RlpStream::new_list(17);

            for c in children.iter() {
                append_to_stream(&mut stream, rlp_encode_and_hash_node(c));
            }

            match value {
                Some(v) => stream.append(v),
                None => stream.append_empty_data(),
            };

            stream.out().to_vec()
        }
        Node::Extension { nibbles, child } => {
            let mut stream = RlpStream::new_list(2);

            stream.append(&nibbles.to_hex_prefix_encoding(false));
            append_to_stream(&mut stream, rlp_encode_and_hash_node(child));

            stream.out().to_vec()
        }
        Node::Leaf { nibbles, value } => {
            let mut stream = RlpStream::new_list(2);

            stream.append(&nibbles.to_hex_prefix_encoding(true));
            stream.append(value);

            stream.out().to_vec()
        }
    }
}

/// The reference a parent stores for `node`.
pub(crate) fn rlp_encode_and_hash_node(node: &Node) -> EncodedNode {
    hash_bytes_if_large_enough(rlp_encode_node(node))
}

fn hash_bytes_if_large_enough(bytes: Vec<u8>) -> EncodedNode {
    match bytes.len() >= 32 {
        false => EncodedNode::Raw(bytes),
        true => EncodedNode::Hashed(keccak(&bytes).0),
    }
}

fn append_to_stream(s: &mut RlpStream, node: EncodedNode) {
    match node {
        EncodedNode::Raw(b) => s.append_raw(&b, 1),
        EncodedNode::Hashed(h) => s.append(&h.to_vec()),
    };
}
