//! Evaluation of the evidence a relayer reveals to prove that it paid a
//! cross-chain trade.
//!
//! Evidence ties a signed transaction to a block whose hash was relayed from
//! the destination chain:
//!
//! - [`transaction`] recomposes the signed bytes from their decomposed fields
//!   and recovers the signer,
//! - [`header`] checks the block header against the claimed hash,
//! - [`mpt_proof`] proves the transaction (and its receipt) under the header's
//!   roots,
//! - [`evaluator`] runs all of the above and compares the payment against the
//!   trade.
//!
//! Only a missing relayed block hash is reported as an error by
//! [`evaluator::EvidenceEvaluator::check_evidence`]. Any other defect makes the
//! evidence invalid.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod builder;
pub mod checkpoint;
pub mod evaluator;
pub mod evidence;
pub mod header;
pub mod receipt;
pub mod transaction;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing_utils;

pub use builder::EvidenceBuilder;
pub use checkpoint::{BlockHashSource, InMemoryBlockHashes, TokenAddresses};
pub use evaluator::{
    check_transfer, AmountRule, EvidenceError, EvidenceEvaluator, EvidenceResult, ExpectedTransfer,
};
pub use evidence::{hash_evidence, Evidence};
pub use header::{verify_block_header, BlockHeader, HeaderError};
pub use transaction::{
    decode_raw_tx, recover_address, tx_hash, verify_raw_tx, RawTransactionFields, TxError, TxType,
};
pub use transfer::Transfer;
