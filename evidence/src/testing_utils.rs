//! Fixtures and helpers shared by the tests of this crate.

use bridge_common::trade::Trade;
use ethereum_types::{Address, H160, U256};
use hex_literal::hex;
use k256::ecdsa::SigningKey;
use keccak_hash::keccak;
use mpt_proof::builder::TrieBuilder;
use rlp_codec::RlpItem;
use serde::Deserialize;

use crate::{evidence::Evidence, header::BlockHeader, transaction::TxType};

/// A native payment on Goerli, index 18 of block 8663139.
pub(crate) const GOERLI_TX: [u8; 117] = hex!("02f87205578477359400852e90edd00082520894fc976d96ccc57bc9d04aea92a4a66abd71926298870fd2e3afd4600080c001a08314b7c04620705e92fbf736e518ace2690c62a3432034980f159560a990e118a045369675a427365b45b4b4750d349e520dbf010515dae8bea624fb8bbfe3bcca");

/// Access list transaction on chain 1337.
pub(crate) const TYPE_1_TX: [u8; 106] = hex!("01f867820539018203e882520894000000000000000000000000000000000000000201824242c080a0e0c03d1aae7278dffd6c864231a5bb571d7ee3ececd3718b26d3d8554b4987f5a02dfb1aeea35ba8c5191abb6efdae6f73c052209fc6a598025b7292db470d9450");

/// Dynamic fee transaction on chain 1337.
pub(crate) const TYPE_2_TX: [u8; 109] = hex!("02f86a820539018203e88201f482520894000000000000000000000000000000000000000201824242c080a06312f059f931a9cf9e9ef4648b14fff1d6f88fbc1aed5ebcb1138f50e295a6b3a0252349ddb42d28b1b2b7c749370867047c8c33d4a0ada8ff7f0d5b71bea862ab");

/// Address of [`hardhat_key`].
pub(crate) const HARDHAT_ADDRESS: Address = H160(hex!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"));

const TEST_CHAIN_ID: u64 = 5;

pub(crate) fn common_setup() {
    let _ = pretty_env_logger::try_init();
}

/// The first well-known development account.
pub(crate) fn hardhat_key() -> SigningKey {
    SigningKey::from_bytes(
        &hex!("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").into(),
    )
    .unwrap()
}

/// A signed dynamic fee transaction, in its broadcast encoding.
pub(crate) fn sign_tx(
    key: &SigningKey,
    to: Option<Address>,
    value: U256,
    data: Vec<u8>,
    nonce: u64,
) -> Vec<u8> {
    let mut fields = vec![
        RlpItem::from(TEST_CHAIN_ID),
        RlpItem::from(nonce),
        RlpItem::from(2_000_000_000u64),
        RlpItem::from(200_000_000_000u64),
        RlpItem::from(100_000u64),
        match to {
            Some(to) => RlpItem::from(to),
            None => RlpItem::Bytes(Vec::new()),
        },
        RlpItem::from(value),
        RlpItem::Bytes(data),
        RlpItem::List(Vec::new()),
    ];

    let mut payload = vec![0x02];
    payload.extend(RlpItem::List(fields.clone()).encode());

    let (sig, recid) = key
        .sign_prehash_recoverable(keccak(&payload).as_bytes())
        .unwrap();
    let sig = sig.to_bytes();

    fields.push(RlpItem::from(recid.to_byte() as u64));
    fields.push(RlpItem::from(U256::from_big_endian(&sig[..32])));
    fields.push(RlpItem::from(U256::from_big_endian(&sig[32..])));

    let mut tx = vec![0x02];
    tx.extend(RlpItem::List(fields).encode());
    tx
}

/// A receipt without logs, in its receipts trie encoding.
pub(crate) fn encode_receipt(tx_type: TxType, success: bool, cumulative_gas: u64) -> Vec<u8> {
    let status = match success {
        true => vec![1],
        false => Vec::new(),
    };

    let body = RlpItem::List(vec![
        RlpItem::Bytes(status),
        RlpItem::from(cumulative_gas),
        RlpItem::Bytes(vec![0; 256]),
        RlpItem::List(Vec::new()),
    ])
    .encode();

    match tx_type.type_byte() {
        None => body,
        Some(b) => [vec![b], body].concat(),
    }
}

#[derive(Deserialize)]
struct Fixture {
    trade: Trade,
    evidence: Evidence,
}

/// A paid Goerli trade and the evidence the relayer revealed for it.
pub(crate) fn goerli_fixture() -> (Trade, Evidence) {
    let fixture: Fixture =
        serde_json::from_str(include_str!("../test_data/goerli_8663139.json")).unwrap();

    (fixture.trade, fixture.evidence)
}

/// The Goerli header with its roots, number and timestamp replaced to commit
/// to `transactions` and `receipts`.
pub(crate) fn synthetic_header(
    transactions: &[Vec<u8>],
    receipts: &[Vec<u8>],
    number: u64,
    timestamp: u64,
) -> BlockHeader {
    let (_, evidence) = goerli_fixture();
    let mut fields = evidence.raw_block_header.list().unwrap().to_vec();

    let tx_root = TrieBuilder::from_ordered_values(transactions.iter().cloned())
        .build()
        .root_hash();
    let receipts_root = TrieBuilder::from_ordered_values(receipts.iter().cloned())
        .build()
        .root_hash();

    fields[4] = RlpItem::from(tx_root);
    fields[5] = RlpItem::from(receipts_root);
    fields[8] = RlpItem::from(number);
    fields[11] = RlpItem::from(timestamp);

    BlockHeader::new(fields).unwrap()
}
