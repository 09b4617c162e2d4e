//! Blocks, signed payments and ledgers for the end to end tests.

#![allow(dead_code)]

use bridge_common::{
    hash,
    network::{NetworkCode, OPTIMISM, POLYGON},
};
use dispute_manager::{
    BlockInfo, BridgeConfig, CallContext, NetworkStatus, Parameters, TradeLedger,
};
use ethereum_types::{Address, H160, H256, U256};
use evidence_verifier::{BlockHeader, Evidence, EvidenceBuilder};
use hex_literal::hex;
use k256::ecdsa::SigningKey;
use mpt_proof::builder::TrieBuilder;
use rlp_codec::RlpItem;

pub const RELAYER: Address = Address::repeat_byte(0x11);
pub const DISPUTER: Address = Address::repeat_byte(0x33);
pub const SLASHER: Address = Address::repeat_byte(0x44);

/// Address of [`hardhat_key`].
pub const HARDHAT_ADDRESS: Address = H160(hex!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"));

pub const BOND: u64 = 1_000_000_000_000_000_000;
pub const MAX_FEE_PER_GAS: u64 = 200_000_000_000;

pub fn common_setup() {
    let _ = pretty_env_logger::try_init();
}

/// The first well-known development account.
pub fn hardhat_key() -> SigningKey {
    SigningKey::from_bytes(
        &hex!("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").into(),
    )
    .unwrap()
}

/// The second well-known development account.
pub fn other_key() -> SigningKey {
    SigningKey::from_bytes(
        &hex!("59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d").into(),
    )
    .unwrap()
}

/// A signed dynamic fee payment of `value` to `to`, in its broadcast
/// encoding.
pub fn sign_payment(key: &SigningKey, to: Address, value: U256, nonce: u64) -> Vec<u8> {
    let mut fields = vec![
        RlpItem::from(1u64),
        RlpItem::from(nonce),
        RlpItem::from(2_000_000_000u64),
        RlpItem::from(MAX_FEE_PER_GAS),
        RlpItem::from(21_000u64),
        RlpItem::from(to),
        RlpItem::from(value),
        RlpItem::Bytes(Vec::new()),
        RlpItem::List(Vec::new()),
    ];

    let mut payload = vec![0x02];
    payload.extend(RlpItem::List(fields.clone()).encode());

    let (sig, recid) = key
        .sign_prehash_recoverable(hash(&payload).as_bytes())
        .unwrap();
    let sig = sig.to_bytes();

    fields.push(RlpItem::from(recid.to_byte() as u64));
    fields.push(RlpItem::from(U256::from_big_endian(&sig[..32])));
    fields.push(RlpItem::from(U256::from_big_endian(&sig[32..])));

    let mut tx = vec![0x02];
    tx.extend(RlpItem::List(fields).encode());
    tx
}

/// A dynamic fee receipt without logs.
pub fn receipt(success: bool, cumulative_gas: u64) -> Vec<u8> {
    let status = match success {
        true => vec![1],
        false => Vec::new(),
    };

    let body = RlpItem::List(vec![
        RlpItem::Bytes(status),
        RlpItem::from(cumulative_gas),
        RlpItem::Bytes(vec![0; 256]),
        RlpItem::List(Vec::new()),
    ]);

    [vec![0x02], body.encode()].concat()
}

/// A London header committing to `transactions` and `receipts`.
pub fn header(
    transactions: &[Vec<u8>],
    receipts: &[Vec<u8>],
    number: u64,
    timestamp: u64,
) -> BlockHeader {
    let root = |values: &[Vec<u8>]| {
        TrieBuilder::from_ordered_values(values.iter().cloned())
            .build()
            .root_hash()
    };

    BlockHeader::new(vec![
        RlpItem::from(H256::repeat_byte(0xaa)),
        RlpItem::from(H256::repeat_byte(0xbb)),
        RlpItem::from(Address::repeat_byte(0xcc)),
        RlpItem::from(H256::repeat_byte(0xdd)),
        RlpItem::from(root(transactions)),
        RlpItem::from(root(receipts)),
        RlpItem::Bytes(vec![0; 256]),
        RlpItem::from(0u64),
        RlpItem::from(number),
        RlpItem::from(30_000_000u64),
        RlpItem::from(21_000 * transactions.len() as u64),
        RlpItem::from(timestamp),
        RlpItem::Bytes(b"test".to_vec()),
        RlpItem::from(H256::zero()),
        RlpItem::Bytes(vec![0; 8]),
        RlpItem::from(7u64),
    ])
    .unwrap()
}

/// A block of `payment` surrounded by unrelated payments, and the evidence
/// for `payment`.
pub struct Block {
    pub header: BlockHeader,
    pub evidence: Evidence,
}

impl Block {
    pub fn with_payment(payment: Vec<u8>, number: u64, timestamp: u64) -> Self {
        Self::with_receipt(payment, true, number, timestamp)
    }

    pub fn with_receipt(payment: Vec<u8>, success: bool, number: u64, timestamp: u64) -> Self {
        let key = other_key();
        let mut transactions: Vec<_> = (0..5)
            .map(|nonce| sign_payment(&key, Address::repeat_byte(0x70), U256::from(nonce), nonce))
            .collect();
        transactions.insert(3, payment);

        let receipts: Vec<_> = (0..transactions.len() as u64)
            .map(|i| receipt(i != 3 || success, 21_000 * (i + 1)))
            .collect();

        let header = header(&transactions, &receipts, number, timestamp);
        let evidence = EvidenceBuilder::new(header.clone(), transactions)
            .with_receipts(receipts)
            .build(3)
            .unwrap();

        Self { header, evidence }
    }

    /// Relays the block's hash as a block of `chain`.
    pub fn relay(&self, ledger: &mut TradeLedger, chain: NetworkCode) {
        let info = BlockInfo {
            network_code: chain,
            number: self.header.number().unwrap(),
            hash: self.header.hash(),
        };

        ledger
            .set_block_hash(&CallContext::new(RELAYER, 0), info)
            .unwrap();
    }
}

/// A ledger on Optimism paying towards Polygon, with [`BOND`] deposited.
pub fn ledger() -> TradeLedger {
    common_setup();

    let mut parameters = Parameters::new(OPTIMISM);
    parameters.networks.insert(POLYGON, NetworkStatus::Available);
    parameters.slashable_networks.insert(POLYGON);

    let mut ledger = BridgeConfig {
        relayer: RELAYER,
        checkpoint_owner: None,
        checkpoint_verifier: dispute_manager::MessageVerifier::Direct,
        parameters,
    }
    .into_ledger()
    .unwrap();

    ledger
        .deposit_bond(&CallContext::new(RELAYER, 0).with_value(BOND), 0, BOND.into())
        .unwrap();
    ledger.drain_events();
    ledger
}
