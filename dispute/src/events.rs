//! Events emitted by the ledger, in emission order.

use bridge_common::{network::NetworkCode, trade::TradeStatus};
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// Something observable the ledger did.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BridgeEvent {
    /// A user opened a trade.
    NewTrade {
        /// Trade owner.
        user: Address,
        /// Index of the trade in the owner's list.
        index: u64,
    },
    /// The relayer committed to having paid a trade.
    Withdraw {
        /// Trade owner.
        user: Address,
        /// Trade index.
        index: u64,
        /// Committed evidence hash.
        hashed_evidence: H256,
    },
    /// A trade was cancelled and refunded.
    Cancel {
        /// Trade owner.
        user: Address,
        /// Trade index.
        index: u64,
        /// Relayer's reason, empty for user cancellations.
        reason: String,
    },
    /// A paid trade was disputed.
    Dispute {
        /// Trade owner.
        user: Address,
        /// Trade index.
        index: u64,
    },
    /// The relayer answered a dispute.
    Defence {
        /// Trade owner.
        user: Address,
        /// Trade index.
        index: u64,
        /// [`TradeStatus::Proved`] or [`TradeStatus::Slashed`].
        status: TradeStatus,
    },
    /// A disputed trade's bond was slashed.
    Slash {
        /// Trade owner.
        user: Address,
        /// Trade index.
        index: u64,
        /// Slashed relayer.
        relayer: Address,
    },
    /// The relayer accepted an upward transfer and paid out.
    Accept {
        /// Sender of the upward transfer.
        user: Address,
        /// Index of the recorded trade.
        index: u64,
        /// Relayer that paid out the transfer.
        relayer: Address,
        /// Hash of the upward transfer transaction.
        tx_hash: H256,
    },
    /// An unaccepted upward transfer was slashed.
    UpwardSlash {
        /// Sender of the upward transfer.
        user: Address,
        /// Index of the recorded trade.
        index: u64,
        /// Caller who proved the transfer.
        slasher: Address,
    },
    /// Value left the ledger.
    Transferred {
        /// Recipient.
        to: Address,
        /// Token sent.
        token_type_index: u8,
        /// Amount sent.
        amount: U256,
    },
    /// The relayer deposited bond.
    BondDeposited {
        /// Token of the bond.
        token_type_index: u8,
        /// Deposited amount.
        amount: U256,
    },
    /// The relayer requested a bond withdrawal.
    BondWithdrawalRequested {
        /// Token of the bond.
        token_type_index: u8,
        /// Requested amount.
        amount: U256,
        /// Time the withdrawal can be finalized.
        execute_after: u64,
    },
    /// A requested bond withdrawal was paid out.
    BondWithdrawn {
        /// Token of the bond.
        token_type_index: u8,
        /// Paid amount.
        amount: U256,
    },
    /// A trade parameter change was proposed or applied.
    TradeParamUpdate {
        /// Whether the change was applied.
        finalized: bool,
    },
    /// A network setting change was proposed or applied.
    NetworkSettingUpdate {
        /// Whether the change was applied.
        finalized: bool,
    },
    /// A token registration was proposed or applied.
    TokenAddressUpdate {
        /// Whether the change was applied.
        finalized: bool,
    },
    /// A fee list change was proposed or applied.
    FeeListUpdate {
        /// Whether the change was applied.
        finalized: bool,
    },
    /// A relayer handover was proposed or applied.
    RelayerUpdate {
        /// Incoming relayer.
        new_relayer: Address,
        /// Whether the handover was applied.
        finalized: bool,
    },
    /// A block hash was relayed.
    BlockHashReceived {
        /// Source network.
        chain: NetworkCode,
        /// Block number.
        number: u64,
        /// Block hash.
        hash: H256,
    },
    /// Trade creation was paused or resumed.
    ContractActiveToggled {
        /// Whether trade creation is possible.
        is_active: bool,
    },
}
