//! Accounts and ledgers shared by the tests of this crate.

use bridge_common::{
    network::{ETHEREUM, OPTIMISM, POLYGON},
    NATIVE_TOKEN_INDEX,
};
use ethereum_types::{Address, H256, U256};
use evidence_verifier::Evidence;
use mpt_proof::Nibbles;
use rlp_codec::RlpItem;

use crate::{
    checkpoint::ChildCheckpointManager,
    context::CallContext,
    ledger::{EvidenceCommitment, TradeLedger},
    params::{NetworkStatus, Parameters},
};

pub(crate) const RELAYER: Address = Address::repeat_byte(0x11);
pub(crate) const USER: Address = Address::repeat_byte(0x22);
pub(crate) const DISPUTER: Address = Address::repeat_byte(0x33);

/// Bond deposited by [`funded_ledger`].
pub(crate) const BOND: u64 = 1_000_000_000_000_000_000;

pub(crate) fn common_setup() {
    let _ = pretty_env_logger::try_init();
}

pub(crate) fn account(b: u8) -> Address {
    Address::repeat_byte(b)
}

/// A ledger on Optimism trading towards Ethereum and Polygon, where only
/// Polygon payments may be disputed.
pub(crate) fn ledger() -> TradeLedger {
    common_setup();

    let mut params = Parameters::new(OPTIMISM);
    params.networks.insert(POLYGON, NetworkStatus::Available);
    params.slashable_networks.insert(POLYGON);

    TradeLedger::new(RELAYER, params, ChildCheckpointManager::direct(RELAYER))
}

/// [`ledger`] with [`BOND`] deposited in the native token.
pub(crate) fn funded_ledger() -> TradeLedger {
    let mut ledger = ledger();
    ledger
        .deposit_bond(
            &CallContext::new(RELAYER, 0).with_value(BOND),
            NATIVE_TOKEN_INDEX,
            BOND.into(),
        )
        .unwrap();
    ledger.drain_events();
    ledger
}

/// Opens a native trade of `user` to Ethereum.
pub(crate) fn open_trade(ledger: &mut TradeLedger, user: Address, amount: u64, timestamp: u64) -> u64 {
    let ctx = CallContext::new(user, timestamp).with_value(amount);

    ledger
        .new_trade(
            &ctx,
            U256::from(amount),
            user,
            U256::zero(),
            NATIVE_TOKEN_INDEX,
            ETHEREUM,
        )
        .unwrap()
}

/// A commitment with made up hashes, distinct per `n`.
pub(crate) fn commitment(n: u8) -> EvidenceCommitment {
    EvidenceCommitment {
        tx_hash: H256::repeat_byte(n),
        evidence_hash: H256::repeat_byte(n.wrapping_add(0x80)),
    }
}

/// Evidence without any content.
pub(crate) fn empty_evidence() -> Evidence {
    Evidence {
        block_number: 0,
        block_hash: H256::zero(),
        tx_receipt: Vec::new(),
        raw_tx: RlpItem::List(Vec::new()),
        raw_block_header: RlpItem::List(Vec::new()),
        transaction: Vec::new(),
        tx_proof: Vec::new(),
        transaction_index: None,
        path: Nibbles::default(),
        receipt_proof: Vec::new(),
    }
}
