//! The evidence evaluator: decides whether revealed evidence proves that a
//! trade was paid.
//!
//! The pipeline runs, in order:
//! 1. the claimed block hash against the relayed checkpoint (the only step
//!    that fails hard, when nothing was relayed for the block),
//! 2. the header fields against the claimed hash,
//! 3. the transaction's inclusion under the header's transactions root,
//! 4. the receipt's inclusion and status, when a receipt is supplied,
//! 5. the transaction itself against the trade. Token payments must come with
//!    their receipt, since a reverted `transfer` is still included.
//!
//! Every other failure, including malformed input, only makes the evidence
//! invalid.

use bridge_common::{
    network::{Network, NetworkCode},
    trade::Trade,
    UPWARD_DEST_CODE_MODULUS,
};
use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use log::{debug, trace, warn};
use mpt_proof::{path_for_index, verify_proof};
use thiserror::Error;

use crate::{
    checkpoint::{BlockHashSource, TokenAddresses},
    evidence::Evidence,
    header::{verify_block_header, HeaderError},
    receipt::decode_receipt,
    transaction::{recover_address, tx_hash, verify_raw_tx, TxError},
    transfer::Transfer,
};

/// Result type for evidence evaluation.
pub type EvidenceResult<T> = Result<T, EvidenceError>;

/// Errors encountered while evaluating or building evidence.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EvidenceError {
    /// The checkpoint holds no hash for the evidence's block.
    #[error("No relayed block hash for block {number} of {}", Network(*chain))]
    NoRelayedBlockHash {
        /// Chain of the block.
        chain: NetworkCode,
        /// Number of the block.
        number: u64,
    },

    /// A token trade whose token has no registered contract.
    #[error("No token contract registered for token {token_index} on {}", Network(*chain))]
    UnknownToken {
        /// Destination chain of the trade.
        chain: NetworkCode,
        /// Token type index of the trade.
        token_index: u8,
    },

    /// A block's transactions do not hash to its transactions root.
    #[error("Transactions hash to root {computed:x} but the header holds {expected:x}")]
    TransactionsRootMismatch {
        /// Root held by the header.
        expected: H256,
        /// Root of the supplied transactions.
        computed: H256,
    },

    /// A block's receipts do not hash to its receipts root.
    #[error("Receipts hash to root {computed:x} but the header holds {expected:x}")]
    ReceiptsRootMismatch {
        /// Root held by the header.
        expected: H256,
        /// Root of the supplied receipts.
        computed: H256,
    },

    /// No transaction at the requested position.
    #[error("Transaction index {index} is out of range for a block of {len} transactions")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Number of transactions in the block.
        len: usize,
    },

    /// The transaction is malformed.
    #[error(transparent)]
    Tx(#[from] TxError),

    /// The header is malformed.
    #[error(transparent)]
    Header(#[from] HeaderError),
}

/// How the paid value is compared against the expected amount.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AmountRule {
    /// The value must equal the expected amount.
    Exact,

    /// The last four decimal digits of the value must be `dest_code`, and the
    /// remaining digits must equal those of the expected amount.
    ///
    /// This lets a plain transfer double as a cross-chain instruction. A
    /// transfer whose value happens to end in a valid code is indistinguishable
    /// from an intentional one.
    UpwardDigits {
        /// Network code the sender addressed.
        dest_code: NetworkCode,
    },
}

impl AmountRule {
    /// Whether `value` satisfies the rule for `expected`.
    pub fn matches(&self, value: U256, expected: U256) -> bool {
        match self {
            AmountRule::Exact => value == expected,
            AmountRule::UpwardDigits { dest_code } => {
                let modulus = U256::from(UPWARD_DEST_CODE_MODULUS);

                value % modulus == U256::from(*dest_code) && value / modulus == expected / modulus
            }
        }
    }
}

/// The payment a piece of evidence must show.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExpectedTransfer {
    /// Required signer, if the sender matters.
    pub sender: Option<Address>,
    /// Required recipient.
    pub to: Address,
    /// Expected amount.
    pub amount: U256,
    /// Required token contract, `None` for a native payment.
    pub token: Option<Address>,
    /// How the amount is compared.
    pub rule: AmountRule,
}

impl ExpectedTransfer {
    /// The payment that settles `trade`.
    ///
    /// A regular trade is settled by the relayer paying `amount - fee` to the
    /// trade's recipient on the destination chain. An upward trade was
    /// started by its user paying `amount` to the relayer, with the
    /// destination code in the value's last digits.
    pub fn for_trade<T: TokenAddresses>(trade: &Trade, tokens: &T) -> EvidenceResult<Self> {
        let token = match tokens.pays_native(trade.dest_code, trade.token_type_index) {
            true => None,
            false => Some(
                tokens
                    .token_address(trade.dest_code, trade.token_type_index)
                    .ok_or(EvidenceError::UnknownToken {
                        chain: trade.dest_code,
                        token_index: trade.token_type_index,
                    })?,
            ),
        };

        Ok(match trade.is_upward {
            false => Self {
                sender: None,
                to: trade.to,
                amount: trade.expected_payment(),
                token,
                rule: AmountRule::Exact,
            },
            true => Self {
                sender: Some(trade.user),
                to: trade.relayer,
                amount: trade.amount,
                token,
                rule: AmountRule::UpwardDigits {
                    dest_code: trade.dest_code,
                },
            },
        })
    }
}

/// Evaluates evidence against relayed block hashes and the token table.
#[derive(Clone, Debug)]
pub struct EvidenceEvaluator<S, T> {
    block_hashes: S,
    tokens: T,
}

impl<S: BlockHashSource, T: TokenAddresses> EvidenceEvaluator<S, T> {
    /// Creates an evaluator. Both arguments are commonly references.
    pub fn new(block_hashes: S, tokens: T) -> Self {
        Self {
            block_hashes,
            tokens,
        }
    }

    /// Whether `claimed` is the relayed hash of block `number` of `chain`.
    pub fn verify_block_hash(
        &self,
        claimed: H256,
        chain: NetworkCode,
        number: u64,
    ) -> EvidenceResult<bool> {
        let relayed = self
            .block_hashes
            .get_block_hash(chain, number)
            .ok_or(EvidenceError::NoRelayedBlockHash { chain, number })?;

        if relayed != claimed {
            warn!(
                "Evidence claims hash {:x} for block {} of {} but {:x} was relayed",
                claimed,
                number,
                Network(chain),
                relayed
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Checks the transaction of `evidence` against `trade`, ignoring where
    /// the transaction was included.
    pub fn check_evidence_except_block_hash(
        &self,
        trade: &Trade,
        evidence: &Evidence,
    ) -> EvidenceResult<bool> {
        let expected = ExpectedTransfer::for_trade(trade, &self.tokens)?;
        check_transfer(&expected, evidence)
    }

    /// Same as [`Self::check_evidence_except_block_hash`], with any error
    /// reported as invalid evidence.
    pub fn safe_check_evidence_except_block_hash(&self, trade: &Trade, evidence: &Evidence) -> bool {
        match self.check_evidence_except_block_hash(trade, evidence) {
            Ok(valid) => valid,
            Err(err) => {
                debug!("Evidence for trade {} is malformed: {}", trade.index, err);
                false
            }
        }
    }

    /// The full pipeline for a trade settled on its destination chain.
    pub fn check_evidence(&self, trade: &Trade, evidence: &Evidence) -> EvidenceResult<bool> {
        if !self.check_inclusion(trade.dest_code, evidence)? {
            return Ok(false);
        }

        let settled = ExpectedTransfer::for_trade(trade, &self.tokens)
            .and_then(|expected| check_settled(&expected, evidence));
        Ok(settled.unwrap_or_else(|err| {
            debug!("Evidence for trade {} is malformed: {}", trade.index, err);
            false
        }))
    }

    /// The full pipeline for an explicit expectation on `chain`.
    pub fn check_expected_evidence(
        &self,
        chain: NetworkCode,
        expected: &ExpectedTransfer,
        evidence: &Evidence,
    ) -> EvidenceResult<bool> {
        if !self.check_inclusion(chain, evidence)? {
            return Ok(false);
        }

        Ok(check_settled(expected, evidence).unwrap_or_else(|err| {
            debug!("Evidence is malformed: {}", err);
            false
        }))
    }

    /// Whether the evidence's transaction (and receipt) is included in a block
    /// of `chain` whose hash was relayed.
    ///
    /// Fails only when no hash was relayed for the block.
    pub fn check_inclusion(&self, chain: NetworkCode, evidence: &Evidence) -> EvidenceResult<bool> {
        if !self.verify_block_hash(evidence.block_hash, chain, evidence.block_number)? {
            return Ok(false);
        }

        Ok(check_included(evidence).unwrap_or_else(|err| {
            debug!("Evidence for block {} is malformed: {}", evidence.block_number, err);
            false
        }))
    }
}

fn check_included(evidence: &Evidence) -> EvidenceResult<bool> {
    let header = evidence.header()?;

    if !verify_block_header(evidence.block_hash, header.fields()) {
        return Ok(false);
    }

    if header.number()? != evidence.block_number {
        debug!(
            "Header is for block {} but evidence claims block {}",
            header.number()?,
            evidence.block_number
        );
        return Ok(false);
    }

    if let Some(index) = evidence.transaction_index {
        if evidence.path != path_for_index(index) {
            debug!("Path {} does not lead to transaction {}", evidence.path, index);
            return Ok(false);
        }
    }

    let tx_root = header.transactions_root()?;
    if !verify_proof(
        tx_hash(&evidence.transaction),
        &evidence.tx_proof,
        tx_root,
        &evidence.path,
    ) {
        debug!("Transaction is not included under root {:x}", tx_root);
        return Ok(false);
    }

    if evidence.has_receipt() {
        let receipts_root = header.receipts_root()?;

        if !verify_proof(
            keccak(&evidence.tx_receipt),
            &evidence.receipt_proof,
            receipts_root,
            &evidence.path,
        ) {
            debug!("Receipt is not included under root {:x}", receipts_root);
            return Ok(false);
        }

        if !decode_receipt(&evidence.tx_receipt)?.succeeded() {
            debug!("Transaction did not execute successfully");
            return Ok(false);
        }
    }

    trace!("Evidence is included in block {}", evidence.block_number);
    Ok(true)
}

/// [`check_transfer`], also requiring the receipt of a token payment.
fn check_settled(expected: &ExpectedTransfer, evidence: &Evidence) -> EvidenceResult<bool> {
    if expected.token.is_some() && !evidence.has_receipt() {
        debug!("Token payment in block {} has no receipt", evidence.block_number);
        return Ok(false);
    }

    check_transfer(expected, evidence)
}

/// Checks that the transaction of `evidence` is the payment `expected`.
pub fn check_transfer(expected: &ExpectedTransfer, evidence: &Evidence) -> EvidenceResult<bool> {
    let fields = evidence.raw_tx_fields()?;

    if !verify_raw_tx(&evidence.transaction, &fields) {
        debug!("Decomposed transaction does not match the signed transaction");
        return Ok(false);
    }

    let transfer = match expected.token {
        None => Transfer::native(&fields),
        Some(_) => Transfer::erc20(&fields),
    };

    let transfer = match transfer {
        Ok(t) => t,
        Err(err @ (TxError::ContractCreation | TxError::NotErc20Transfer)) => {
            debug!("Transaction is not the expected kind of payment: {}", err);
            return Ok(false);
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(sender) = expected.sender {
        let signer = recover_address(&fields)?;

        if signer != sender {
            debug!("Transaction was signed by {:x}, not {:x}", signer, sender);
            return Ok(false);
        }
    }

    if transfer.token() != expected.token {
        debug!(
            "Payment went to token contract {:?} instead of {:?}",
            transfer.token(),
            expected.token
        );
        return Ok(false);
    }

    if transfer.to() != expected.to {
        debug!("Payment went to {:x} instead of {:x}", transfer.to(), expected.to);
        return Ok(false);
    }

    if !expected.rule.matches(transfer.value(), expected.amount) {
        debug!(
            "Paid value {} does not match the expected {} ({:?})",
            transfer.value(),
            expected.amount,
            expected.rule
        );
        return Ok(false);
    }

    Ok(true)
}
