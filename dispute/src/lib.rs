//! The trade ledger of a relayed cross-chain bridge, and the dispute and
//! slash rules that keep its relayer honest.
//!
//! A user escrows an amount in a [`TradeLedger`] for the relayer to pay on
//! the destination chain. The relayer withdraws the escrow by committing to
//! the evidence of its payment, backed by a bond. Anyone who doubts the
//! payment can dispute it with a deposit:
//!
//! - the relayer defends by revealing the committed evidence, which is
//!   evaluated against the block hashes relayed through the
//!   [`checkpoint`] managers,
//! - a relayer that does not defend in time, or whose evidence is invalid,
//!   loses part of its bond to the disputer and the user.
//!
//! Upward trades run the other way: the user pays the relayer on the source
//! chain and the relayer pays out here, see [`upward`].
//!
//! Every operation takes a [`CallContext`] and either applies in full or
//! returns a [`DisputeError`] without touching the ledger. Value leaving the
//! ledger is reported as [`BridgeEvent::Transferred`].

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod bond;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod ledger;
pub mod params;
pub mod pending;
pub mod upward;

#[cfg(test)]
pub(crate) mod testing_utils;

pub use bond::{BondManager, BondWithdrawal};
pub use checkpoint::{
    BlockInfo, ChildCheckpointManager, MessageOrigin, MessageVerifier, RootCheckpointManager,
};
pub use config::{BridgeConfig, ConfigError};
pub use context::CallContext;
pub use error::{DisputeError, DisputeResult};
pub use events::BridgeEvent;
pub use ledger::{EvidenceCommitment, TradeLedger, UserTrade, WithdrawRequest};
pub use params::{
    FeeList, FeeListUpdate, NetworkOperation, NetworkSettingUpdate, NetworkStatus, Parameters,
    Periods, TokenAddressUpdate, TradeParamOperation, TradeParamUpdate, TradeParams,
};
pub use pending::PendingChange;
