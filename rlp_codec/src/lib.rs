//! Canonical Recursive Length Prefix (RLP) codec over dynamically shaped
//! items.
//!
//! The [`rlp`](https://docs.rs/rlp) crate is great when the shape of the data
//! is known at compile time. Evidence submitted by relayers and disputers is
//! not: transactions come in several envelopes, trie nodes are either 2 or 17
//! items long, and any of it may be adversarial. This crate decodes such input
//! into a tagged [`RlpItem`] tree while rejecting every non-canonical encoding,
//! so that re-encoding a decoded item reproduces the exact input bytes and
//! therefore the exact same hash.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod decode;
pub mod error;
pub mod item;

pub use decode::{decode, decode_exact, decode_list_exact};
pub use error::{MalformedRlp, RlpError, RlpResult};
pub use item::RlpItem;
