//! Transaction receipts, as stored in the receipts trie.

use ethereum_types::{H256, U256};
use rlp_codec::decode_exact;

use crate::transaction::{TxError, TxResult, TxType};

/// Outcome recorded in the first receipt field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReceiptOutcome {
    /// Status `1`.
    Success,
    /// Status `0`.
    Failure,
    /// Pre-Byzantium intermediate state root, which says nothing about
    /// success.
    StateRoot(H256),
}

/// The parts of a receipt the evaluator looks at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Receipt {
    /// Envelope of the transaction the receipt belongs to.
    pub tx_type: TxType,
    /// Execution outcome.
    pub outcome: ReceiptOutcome,
    /// Gas used in the block up to and including this transaction.
    pub cumulative_gas_used: U256,
    /// Number of logs emitted.
    pub log_count: usize,
}

impl Receipt {
    /// Whether the transaction executed successfully.
    pub fn succeeded(&self) -> bool {
        self.outcome == ReceiptOutcome::Success
    }
}

/// Decodes a receipt as stored in the receipts trie: legacy receipts are a
/// bare RLP list, typed ones are prefixed with their transaction type.
pub fn decode_receipt(bytes: &[u8]) -> TxResult<Receipt> {
    let first = *bytes.first().ok_or(TxError::Empty)?;
    let tx_type = TxType::from_first_byte(first)?;

    let payload = match tx_type.type_byte() {
        None => bytes,
        Some(_) => &bytes[1..],
    };

    let item = decode_exact(payload)?;
    let fields = item.list_of(4)?;

    let status = fields[0].bytes()?;
    let outcome = match status {
        [] => ReceiptOutcome::Failure,
        [1] => ReceiptOutcome::Success,
        _ => ReceiptOutcome::StateRoot(fields[0].to_h256()?),
    };

    Ok(Receipt {
        tx_type,
        outcome,
        cumulative_gas_used: fields[1].to_u256()?,
        log_count: fields[3].list()?.len(),
    })
}
