//! Verification and construction of Ethereum Merkle Patricia trie inclusion
//! proofs.
//!
//! A proof is the ordered list of RLP encoded trie nodes on the path from the
//! root to a leaf. [`proof::verify_proof`] walks such a list against a trusted
//! root and a nibble path and answers with a plain `bool`: forged, truncated or
//! otherwise broken proofs are expected adversarial input, not faults.
//!
//! [`builder::TrieBuilder`] goes the other way and is used by relayers to build
//! the proofs they later reveal, e.g. for the transactions of a block keyed by
//! the RLP encoding of their index.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod builder;
pub mod nibbles;
pub mod node;
pub mod proof;
mod trie_hashing;

#[cfg(test)]
pub(crate) mod testing_utils;

pub use nibbles::{Nibble, Nibbles};
pub use proof::{path_for_index, prove_value, verify_proof, ProofError, ProofResult};
