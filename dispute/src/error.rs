//! Errors raised by the ledger, its bond manager, parameters and checkpoints.
//!
//! The messages are the revert reasons relayer tooling already matches on, so
//! they are kept verbatim.

use evidence_verifier::{EvidenceError, TxError};
use thiserror::Error;

/// Result type for every ledger operation.
pub type DisputeResult<T> = Result<T, DisputeError>;

/// A rejected ledger operation. Nothing was mutated.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DisputeError {
    // Access control.
    /// Caller is not the relayer.
    #[error("Only for relayer")]
    OnlyForRelayer,
    /// Caller is not the owner.
    #[error("UNAUTHORIZED")]
    Unauthorized,
    /// Caller is not the disputer of the trade.
    #[error("Only for disputer")]
    OnlyForDisputer,
    /// Trade creation is paused.
    #[error("Contract is not active")]
    ContractNotActive,

    // Trade lookup.
    /// No trade at the requested position.
    #[error("No Trade Exists")]
    NoTrade,
    /// Range end past the last trade.
    #[error("End Index Out of Bounds")]
    OutOfBounds,
    /// Range start after range end.
    #[error("Invalid Range")]
    InvalidRange,

    // Status and timing.
    /// Withdrawal of a trade that is not started.
    #[error("Only for START trade")]
    OnlyForStartTrade,
    /// Cancellation of a trade that is not started.
    #[error("Only for START status")]
    OnlyForStartStatus,
    /// Dispute of a trade that is not paid.
    #[error("Only for PAID status")]
    OnlyForPaidStatus,
    /// Defence of a trade that is not disputed.
    #[error("Only for DISPUTE status")]
    OnlyForDisputeStatus,
    /// Withdrawal after the withdrawal period.
    #[error("Only for withdrawal period")]
    OnlyForWithdrawalPeriod,
    /// Cancellation before the cancel period elapsed.
    #[error("After cancel period")]
    AfterCancelPeriod,
    /// Dispute after the disputable period.
    #[error("Not in disputable period")]
    NotInDisputablePeriod,
    /// Slash of a trade that is neither slashed nor past its defence period.
    #[error("Not yet slashed")]
    NotYetSlashed,
    /// Upward slash before the relayer's acceptance window closed.
    #[error("Not yet available for slashing")]
    NotYetAvailableForSlashing,
    /// Acceptance after the relayer's acceptance window closed.
    #[error("Cannot withdraw with evidence that have passed certain period")]
    EvidenceExpired,
    /// A timelocked change that was never proposed or is not yet due.
    #[error("Ongoing update period")]
    OngoingUpdatePeriod,

    // Amounts.
    /// Amount above the trade threshold of a new trade.
    #[error("Exceed exchangeable limit!")]
    ExceedExchangeableLimit,
    /// Amount above the trade threshold of an upward transfer.
    #[error("Amount too big!")]
    AmountTooBig,
    /// Amount below the minimum.
    #[error("Amount too low!")]
    AmountTooLow,
    /// Zero bond deposit.
    #[error("Amount must be greater than 0")]
    ZeroAmount,
    /// Attached value below the required amount.
    #[error("Insufficient msg.value")]
    InsufficientMsgValue,
    /// Attached value below a bond deposit.
    #[error("Insufficient ETH balance")]
    InsufficientEthBalance,
    /// Bond too small to back the trade.
    #[error("Insufficient bond amount for trade")]
    InsufficientBondAmount,
    /// Bond withdrawal above the bond.
    #[error("Insufficient bond balance to withdraw")]
    InsufficientBondBalance,

    // Parameters and networks.
    /// Token index without trade parameters.
    #[error("Invalid token index")]
    InvalidTokenIndex,
    /// Dispute deposit in another asset than the native one.
    #[error("Invalid tokenTypeIndex")]
    InvalidTokenTypeIndex,
    /// Destination that is not available, or not slashable for disputes.
    #[error("Unavailable dest code")]
    UnavailableDestCode,
    /// Upward transfer addressed to another network.
    #[error("Invalid network id")]
    InvalidNetworkId,
    /// Parameter value out of range.
    #[error("Invalid value")]
    InvalidValue,
    /// Parallel argument arrays of different lengths.
    #[error("Invalid length of array")]
    InvalidArrayLength,
    /// Registering a token address twice.
    #[error("Token address already exists")]
    TokenAddressExists,
    /// Adding a network that was already added.
    #[error("Network is already available")]
    NetworkAlreadyAvailable,
    /// Cancellation reason over 100 characters.
    #[error("Too long reason")]
    TooLongReason,

    // Evidence.
    /// A transaction hash or evidence that was already used.
    #[error("Not unique hashed evidence")]
    NotUniqueHashedEvidence,
    /// Revealed evidence does not match the commitment.
    #[error("Wrong evidence!")]
    WrongEvidence,
    /// Upward evidence that does not prove the transfer.
    #[error("Invalid evidence")]
    InvalidEvidence,
    /// Upward transfer paid to someone other than the relayer.
    #[error("Invalid Relayer")]
    InvalidRelayer,
    /// Upward token transfer on a contract that is not registered.
    #[error("Invalid token address")]
    InvalidTokenAddress,
    /// Malformed upward transaction.
    #[error(transparent)]
    Tx(#[from] TxError),
    /// Evidence could not be evaluated, e.g. its block hash was never relayed.
    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    // Checkpoints.
    /// Relay from an unexpected messenger.
    #[error("INVALID_SENDER")]
    InvalidSender,
    /// Relay from an unexpected root manager.
    #[error("INVALID_SENDER_FROM_ROOT")]
    InvalidSenderFromRoot,
    /// Relay of the zero block hash.
    #[error("INVALID_BLOCKHASH")]
    InvalidBlockHash,
    /// Zero address as root checkpoint manager.
    #[error("INVALID_ROOT_CHECKPOINT_MANAGER")]
    InvalidRootCheckpointManager,
    /// Relay message that is not a block info message.
    #[error("Invalid block info message")]
    MalformedMessage,
}

impl DisputeError {
    /// Whether the error only means the relayed block hash is missing, so the
    /// call can be retried once the checkpoint caught up.
    pub fn is_missing_block_hash(&self) -> bool {
        matches!(
            self,
            DisputeError::Evidence(EvidenceError::NoRelayedBlockHash { .. })
        )
    }
}
