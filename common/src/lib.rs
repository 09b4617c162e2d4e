//! Primitives shared by every crate of the bridge verifier: hashes, network
//! codes, the trade record consulted during evidence evaluation, and a few
//! serde helpers for `0x`-prefixed payloads.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod network;
pub mod serde_hex;
pub mod trade;

pub use ethereum_types::{Address, H256, U256};

/// The hash of an empty Merkle Patricia trie.
/// 0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421
pub const EMPTY_TRIE_HASH: H256 = H256([
    86, 232, 31, 23, 27, 204, 85, 166, 255, 131, 69, 230, 146, 192, 248, 110, 91, 72, 224, 27, 153,
    108, 173, 192, 1, 98, 47, 181, 227, 99, 180, 33,
]);

/// Method selector of `transfer(address,uint256)`.
pub const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Token type index of the chain's native asset.
pub const NATIVE_TOKEN_INDEX: u8 = 0;

/// Upward transfers carry the destination network code in the last four
/// decimal digits of the transferred value.
pub const UPWARD_DEST_CODE_MODULUS: u64 = 10_000;

/// Keccak-256 of `bytes`.
pub fn hash(bytes: impl AsRef<[u8]>) -> H256 {
    keccak_hash::keccak(bytes)
}
