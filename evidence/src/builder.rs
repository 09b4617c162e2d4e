//! Relayer side construction of evidence from a full block.

use keccak_hash::keccak;
use log::debug;
use mpt_proof::{builder::TrieBuilder, path_for_index};
use rlp_codec::RlpItem;

use crate::{
    evaluator::{EvidenceError, EvidenceResult},
    evidence::Evidence,
    header::BlockHeader,
    transaction::decode_raw_tx,
};

/// Builds evidence for the transactions of one block.
///
/// The block's transactions (and receipts, if any) are rebuilt into tries and
/// checked against the header roots before any proof is handed out.
#[derive(Clone, Debug)]
pub struct EvidenceBuilder {
    header: BlockHeader,
    transactions: Vec<Vec<u8>>,
    receipts: Option<Vec<Vec<u8>>>,
}

impl EvidenceBuilder {
    /// A builder for the block of `header` holding `transactions`, in block
    /// order and in their broadcast encoding.
    pub fn new(header: BlockHeader, transactions: Vec<Vec<u8>>) -> Self {
        Self {
            header,
            transactions,
            receipts: None,
        }
    }

    /// Also proves receipts, given in block order.
    pub fn with_receipts(mut self, receipts: Vec<Vec<u8>>) -> Self {
        self.receipts = Some(receipts);
        self
    }

    /// Evidence for the transaction at `index`.
    pub fn build(&self, index: usize) -> EvidenceResult<Evidence> {
        let transaction = self
            .transactions
            .get(index)
            .ok_or(EvidenceError::IndexOutOfRange {
                index,
                len: self.transactions.len(),
            })?
            .clone();

        let key = RlpItem::from(index as u64).encode();

        let tx_trie = TrieBuilder::from_ordered_values(self.transactions.iter().cloned()).build();
        let expected = self.header.transactions_root()?;
        if tx_trie.root_hash() != expected {
            return Err(EvidenceError::TransactionsRootMismatch {
                expected,
                computed: tx_trie.root_hash(),
            });
        }

        let (tx_receipt, receipt_proof) = match &self.receipts {
            None => (Vec::new(), Vec::new()),
            Some(receipts) => {
                let receipt_trie = TrieBuilder::from_ordered_values(receipts.iter().cloned()).build();
                let expected = self.header.receipts_root()?;
                if receipt_trie.root_hash() != expected {
                    return Err(EvidenceError::ReceiptsRootMismatch {
                        expected,
                        computed: receipt_trie.root_hash(),
                    });
                }

                let receipt = receipts.get(index).ok_or(EvidenceError::IndexOutOfRange {
                    index,
                    len: receipts.len(),
                })?;

                (receipt.clone(), receipt_trie.proof(&key))
            }
        };

        let fields = decode_raw_tx(&transaction)?;
        let block_hash = self.header.hash();

        debug!(
            "Built evidence for transaction {:x} at index {} of block {:x}",
            keccak(&transaction),
            index,
            block_hash
        );

        Ok(Evidence {
            block_number: self.header.number()?,
            block_hash,
            tx_receipt,
            raw_tx: RlpItem::List(fields.items().to_vec()),
            raw_block_header: RlpItem::List(self.header.fields().to_vec()),
            tx_proof: tx_trie.proof(&key),
            transaction,
            transaction_index: Some(index as u64),
            path: path_for_index(index as u64),
            receipt_proof,
        })
    }
}
