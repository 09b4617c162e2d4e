//! The trade and dispute records.
//!
//! Both are owned by the trade ledger; the evidence evaluator only reads them.

use std::fmt::{self, Display};

use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{network::NetworkCode, NATIVE_TOKEN_INDEX};

/// Lifecycle of a trade.
///
/// `START -> PAID -> DISPUTE -> {PROVED, SLASHED} -> SLASH_COMPLETED`, with
/// `START -> CANCEL` as the only path that does not involve evidence.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Created by the user, funds escrowed, not yet paid out.
    #[default]
    Start,
    /// Relayer claimed the escrow after paying on the destination chain.
    Paid,
    /// A disputer challenged the payment.
    Dispute,
    /// The relayer failed to defend the payment.
    Slashed,
    /// The relayer proved the payment.
    Proved,
    /// The relayer's bond was slashed and distributed.
    SlashCompleted,
    /// The trade was cancelled and refunded.
    Cancel,
}

impl Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeStatus::Start => "START",
            TradeStatus::Paid => "PAID",
            TradeStatus::Dispute => "DISPUTE",
            TradeStatus::Slashed => "SLASHED",
            TradeStatus::Proved => "PROVED",
            TradeStatus::SlashCompleted => "SLASH_COMPLETED",
            TradeStatus::Cancel => "CANCEL",
        };

        write!(f, "{}", s)
    }
}

/// A cross-chain trade as recorded by the ledger.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Position of the trade in the user's trade list.
    pub index: u64,
    /// Owner of the trade.
    pub user: Address,
    /// Token type of the traded asset.
    pub token_type_index: u8,
    /// Amount escrowed by the user, fee included.
    pub amount: U256,
    /// Creation time, replaced by the payment time once paid.
    pub timestamp: u64,
    /// Recipient on the destination chain.
    pub to: Address,
    /// Relayer that paid the trade, zero until paid.
    pub relayer: Address,
    /// Current status.
    pub status: TradeStatus,
    /// Relayer fee deducted from `amount`.
    pub fee: U256,
    /// Network code of the destination chain.
    pub dest_code: NetworkCode,
    /// Whether the trade moves value from the destination chain back here.
    #[serde(default)]
    pub is_upward: bool,
}

impl Trade {
    /// Whether the trade moves the destination chain's native asset.
    pub fn is_native(&self) -> bool {
        self.token_type_index == NATIVE_TOKEN_INDEX
    }

    /// Amount the relayer must deliver on the destination chain.
    ///
    /// Saturates at zero so that a malformed record never underflows.
    pub fn expected_payment(&self) -> U256 {
        self.amount.saturating_sub(self.fee)
    }
}

/// A challenge raised against a paid trade.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    /// Account that opened the dispute and receives the slash proceeds.
    pub disputer: Address,
    /// Token type of the deposit.
    pub token_type_index: u8,
    /// Deposit escrowed by the disputer.
    pub deposit: U256,
    /// Time the dispute was opened.
    pub dispute_timestamp: u64,
}
