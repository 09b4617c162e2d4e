//! The evidence a relayer reveals to prove a payment.

use bridge_common::serde_hex;
use ethereum_types::H256;
use keccak_hash::keccak;
use mpt_proof::Nibbles;
use rlp_codec::RlpItem;
use serde::{Deserialize, Serialize};

use crate::{
    header::{BlockHeader, HeaderResult},
    transaction::{RawTransactionFields, TxError, TxResult, TxType},
};

/// Everything needed to prove that a transaction was included in a block.
///
/// Serialized in the relayer's JSON format: byte strings are `0x`-prefixed
/// hex, field lists are arrays of such strings, and the trie path is an array
/// of nibbles.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// Number of the block holding the transaction.
    pub block_number: u64,
    /// Hash of that block as claimed by the relayer.
    pub block_hash: H256,
    /// Receipt of the transaction as stored in the receipts trie, empty when
    /// not supplied.
    #[serde(with = "serde_hex", default)]
    pub tx_receipt: Vec<u8>,
    /// Decomposed fields of the signed transaction.
    pub raw_tx: RlpItem,
    /// Ordered block header fields.
    pub raw_block_header: RlpItem,
    /// The signed transaction as broadcast.
    #[serde(with = "serde_hex")]
    pub transaction: Vec<u8>,
    /// Proof of the transaction under the header's transactions root.
    #[serde(with = "serde_hex::vec")]
    pub tx_proof: Vec<Vec<u8>>,
    /// Position of the transaction in its block, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<u64>,
    /// Path of the transaction (and receipt) in its trie.
    pub path: Nibbles,
    /// Proof of the receipt under the header's receipts root.
    #[serde(with = "serde_hex::vec", default, alias = "txReceiptProof")]
    pub receipt_proof: Vec<Vec<u8>>,
}

impl Evidence {
    /// The envelope of [`Self::transaction`].
    pub fn tx_type(&self) -> TxResult<TxType> {
        let first = *self.transaction.first().ok_or(TxError::Empty)?;

        TxType::from_first_byte(first)
    }

    /// The decomposed transaction fields, typed after the original
    /// transaction's envelope.
    pub fn raw_tx_fields(&self) -> TxResult<RawTransactionFields> {
        RawTransactionFields::from_item(self.tx_type()?, &self.raw_tx)
    }

    /// The block header.
    pub fn header(&self) -> HeaderResult<BlockHeader> {
        BlockHeader::from_item(&self.raw_block_header)
    }

    /// Whether a receipt was supplied.
    pub fn has_receipt(&self) -> bool {
        !self.tx_receipt.is_empty()
    }

    /// The canonical RLP encoding every commitment is computed over.
    pub fn encode(&self) -> Vec<u8> {
        let proof = |nodes: &[Vec<u8>]| {
            RlpItem::List(nodes.iter().map(|n| RlpItem::Bytes(n.clone())).collect())
        };

        RlpItem::List(vec![
            RlpItem::from(self.block_number),
            RlpItem::from(self.block_hash),
            RlpItem::Bytes(self.tx_receipt.clone()),
            self.raw_tx.clone(),
            self.raw_block_header.clone(),
            RlpItem::Bytes(self.transaction.clone()),
            proof(&self.tx_proof),
            RlpItem::Bytes(self.path.to_vec()),
            proof(&self.receipt_proof),
        ])
        .encode()
    }
}

/// The commitment a relayer stores when withdrawing a trade, revealed later
/// as its defence.
pub fn hash_evidence(evidence: &Evidence) -> H256 {
    keccak(evidence.encode())
}
