//! Block headers supplied as ordered field lists.

use ethereum_types::H256;
use keccak_hash::keccak;
use log::debug;
use rlp_codec::{RlpError, RlpItem};
use thiserror::Error;

/// Fields of a pre-London header. Later forks only append fields.
pub const MIN_HEADER_FIELDS: usize = 15;

const TRANSACTIONS_ROOT_IDX: usize = 4;
const RECEIPTS_ROOT_IDX: usize = 5;
const NUMBER_IDX: usize = 8;
const TIMESTAMP_IDX: usize = 11;

/// Result type for header accessors.
pub type HeaderResult<T> = Result<T, HeaderError>;

/// Errors encountered when reading a block header.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum HeaderError {
    /// Fewer fields than any fork ever used.
    #[error("Block header has {0} fields, at least 15 are required")]
    TooFewFields(usize),

    /// A field has the wrong shape or width.
    #[error(transparent)]
    Rlp(#[from] RlpError),
}

/// A block header as the ordered list of its fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockHeader {
    fields: Vec<RlpItem>,
}

impl BlockHeader {
    /// Wraps `fields`, which must hold at least [`MIN_HEADER_FIELDS`] items.
    pub fn new(fields: Vec<RlpItem>) -> HeaderResult<Self> {
        match fields.len() < MIN_HEADER_FIELDS {
            true => Err(HeaderError::TooFewFields(fields.len())),
            false => Ok(Self { fields }),
        }
    }

    /// Same as [`Self::new`] for a list item.
    pub fn from_item(item: &RlpItem) -> HeaderResult<Self> {
        Self::new(item.list()?.to_vec())
    }

    /// The header fields.
    pub fn fields(&self) -> &[RlpItem] {
        &self.fields
    }

    /// The block hash: Keccak-256 of the RLP list of every field.
    pub fn hash(&self) -> H256 {
        keccak(RlpItem::List(self.fields.clone()).encode())
    }

    /// Root of the block's transactions trie.
    pub fn transactions_root(&self) -> HeaderResult<H256> {
        Ok(self.fields[TRANSACTIONS_ROOT_IDX].to_h256()?)
    }

    /// Root of the block's receipts trie.
    pub fn receipts_root(&self) -> HeaderResult<H256> {
        Ok(self.fields[RECEIPTS_ROOT_IDX].to_h256()?)
    }

    /// Block number.
    pub fn number(&self) -> HeaderResult<u64> {
        Ok(self.fields[NUMBER_IDX].to_u64()?)
    }

    /// Block timestamp in seconds.
    pub fn timestamp(&self) -> HeaderResult<u64> {
        Ok(self.fields[TIMESTAMP_IDX].to_u64()?)
    }
}

/// Whether `fields` hash to `claimed_hash`.
pub fn verify_block_header(claimed_hash: H256, fields: &[RlpItem]) -> bool {
    let header = match BlockHeader::new(fields.to_vec()) {
        Ok(h) => h,
        Err(err) => {
            debug!("Rejected block header: {}", err);
            return false;
        }
    };

    let hash = header.hash();
    if hash != claimed_hash {
        debug!(
            "Block header hashes to {:x} instead of the claimed {:x}",
            hash, claimed_hash
        );
        return false;
    }

    true
}
