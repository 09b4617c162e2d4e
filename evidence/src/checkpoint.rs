//! The trusted references evidence is evaluated against.

use std::collections::HashMap;

use bridge_common::{network::NetworkCode, NATIVE_TOKEN_INDEX};
use ethereum_types::{Address, H256};

/// Block hashes relayed from other chains.
pub trait BlockHashSource {
    /// The relayed hash of block `number` of `chain`, if any.
    fn get_block_hash(&self, chain: NetworkCode, number: u64) -> Option<H256>;
}

impl<T: BlockHashSource + ?Sized> BlockHashSource for &T {
    fn get_block_hash(&self, chain: NetworkCode, number: u64) -> Option<H256> {
        (**self).get_block_hash(chain, number)
    }
}

/// Token contracts the ledger accepts.
pub trait TokenAddresses {
    /// The contract of token `token_index` on `chain`, if registered.
    fn token_address(&self, chain: NetworkCode, token_index: u8) -> Option<Address>;

    /// Whether token `token_index` is paid as plain value on `chain`, rather
    /// than through a token contract.
    ///
    /// On chains whose native asset is not ether, ether is a token like any
    /// other.
    fn pays_native(&self, _chain: NetworkCode, token_index: u8) -> bool {
        token_index == NATIVE_TOKEN_INDEX
    }
}

impl<T: TokenAddresses + ?Sized> TokenAddresses for &T {
    fn token_address(&self, chain: NetworkCode, token_index: u8) -> Option<Address> {
        (**self).token_address(chain, token_index)
    }

    fn pays_native(&self, chain: NetworkCode, token_index: u8) -> bool {
        (**self).pays_native(chain, token_index)
    }
}

impl TokenAddresses for HashMap<(NetworkCode, u8), Address> {
    fn token_address(&self, chain: NetworkCode, token_index: u8) -> Option<Address> {
        self.get(&(chain, token_index)).copied()
    }
}

/// Block hashes held in memory, e.g. for a single manual verification.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBlockHashes {
    hashes: HashMap<(NetworkCode, u64), H256>,
}

impl InMemoryBlockHashes {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `hash` as the hash of block `number` of `chain`, returning the
    /// hash it replaces.
    pub fn insert(&mut self, chain: NetworkCode, number: u64, hash: H256) -> Option<H256> {
        self.hashes.insert((chain, number), hash)
    }

    /// Number of recorded hashes.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether no hash is recorded.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl BlockHashSource for InMemoryBlockHashes {
    fn get_block_hash(&self, chain: NetworkCode, number: u64) -> Option<H256> {
        self.hashes.get(&(chain, number)).copied()
    }
}

#[cfg(test)]
mod tests {
    use bridge_common::network::{ETHEREUM, OPTIMISM};

    use super::*;

    #[test]
    fn hashes_are_keyed_by_chain_and_number() {
        let mut store = InMemoryBlockHashes::new();
        assert!(store.is_empty());

        store.insert(ETHEREUM, 10, H256::repeat_byte(1));
        assert_eq!(store.get_block_hash(ETHEREUM, 10), Some(H256::repeat_byte(1)));
        assert_eq!(store.get_block_hash(OPTIMISM, 10), None);
        assert_eq!(store.get_block_hash(ETHEREUM, 11), None);

        assert_eq!(
            store.insert(ETHEREUM, 10, H256::repeat_byte(2)),
            Some(H256::repeat_byte(1))
        );
        assert_eq!(store.len(), 1);

        let by_ref: &dyn BlockHashSource = &store;
        assert_eq!(by_ref.get_block_hash(ETHEREUM, 10), Some(H256::repeat_byte(2)));
    }

    #[test]
    fn token_table_lookup() {
        let mut tokens: HashMap<(NetworkCode, u8), Address> = HashMap::new();
        tokens.insert((OPTIMISM, 1), Address::repeat_byte(0x70));

        assert_eq!(tokens.token_address(OPTIMISM, 1), Some(Address::repeat_byte(0x70)));
        assert_eq!(tokens.token_address(ETHEREUM, 1), None);
        assert!(tokens.pays_native(OPTIMISM, NATIVE_TOKEN_INDEX));
        assert!(!tokens.pays_native(OPTIMISM, 1));
    }
}
