//! The [`RlpItem`] tree and its typed accessors.

use enum_as_inner::EnumAsInner;
use ethereum_types::{Address, H256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use crate::{
    decode::decode_exact,
    error::{RlpError, RlpResult},
};

/// A decoded RLP item: a byte string or a list of items.
///
/// In JSON an item is a `0x`-prefixed hex string or an array of items, which
/// is how relayers ship raw transaction and header field lists.
#[derive(Clone, Debug, Deserialize, EnumAsInner, Eq, Hash, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RlpItem {
    /// A byte string.
    Bytes(#[serde(with = "bridge_common::serde_hex")] Vec<u8>),
    /// A list of items.
    List(Vec<RlpItem>),
}

impl RlpItem {
    /// The canonical encoding of this item.
    pub fn encode(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// The payload of a byte string item.
    pub fn bytes(&self) -> RlpResult<&[u8]> {
        match self {
            RlpItem::Bytes(b) => Ok(b),
            RlpItem::List(_) => Err(RlpError::UnexpectedList),
        }
    }

    /// The items of a list item.
    pub fn list(&self) -> RlpResult<&[RlpItem]> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::Bytes(_) => Err(RlpError::UnexpectedString),
        }
    }

    /// The items of a list item, which must hold exactly `n` items.
    pub fn list_of(&self, n: usize) -> RlpResult<&[RlpItem]> {
        let items = self.list()?;

        match items.len() == n {
            false => Err(RlpError::ItemCount {
                expected: n,
                found: items.len(),
            }),
            true => Ok(items),
        }
    }

    /// Interprets the item as a canonical big-endian `u64`.
    pub fn to_u64(&self) -> RlpResult<u64> {
        let b = canonical_int_bytes(self.bytes()?, 8)?;
        Ok(b.iter().fold(0u64, |acc, x| (acc << 8) | *x as u64))
    }

    /// Interprets the item as a canonical big-endian `U256`.
    pub fn to_u256(&self) -> RlpResult<U256> {
        let b = canonical_int_bytes(self.bytes()?, 32)?;
        Ok(U256::from_big_endian(b))
    }

    /// Interprets the item as a 20 byte address.
    pub fn to_address(&self) -> RlpResult<Address> {
        fixed_width(self.bytes()?, 20).map(Address::from_slice)
    }

    /// Interprets the item as an address, or `None` for the empty string used
    /// by contract creations.
    pub fn to_optional_address(&self) -> RlpResult<Option<Address>> {
        match self.bytes()?.is_empty() {
            true => Ok(None),
            false => self.to_address().map(Some),
        }
    }

    /// Interprets the item as a 32 byte hash.
    pub fn to_h256(&self) -> RlpResult<H256> {
        fixed_width(self.bytes()?, 32).map(H256::from_slice)
    }
}

fn canonical_int_bytes(b: &[u8], max_width: usize) -> RlpResult<&[u8]> {
    if b.len() > max_width {
        return Err(RlpError::Overflow(b.len()));
    }

    if b.first() == Some(&0) {
        return Err(RlpError::LeadingZero);
    }

    Ok(b)
}

fn fixed_width(b: &[u8], width: usize) -> RlpResult<&[u8]> {
    match b.len() == width {
        false => Err(RlpError::InvalidLength {
            expected: width,
            found: b.len(),
        }),
        true => Ok(b),
    }
}

fn trim_leading_zeros(b: &[u8]) -> Vec<u8> {
    let first_non_zero = b.iter().position(|x| *x != 0).unwrap_or(b.len());
    b[first_non_zero..].to_vec()
}

impl Encodable for RlpItem {
    fn rlp_append(&self, s: &mut RlpStream) {
        match self {
            RlpItem::Bytes(b) => {
                s.encoder().encode_value(b);
            }
            RlpItem::List(items) => {
                s.begin_list(items.len());
                for item in items {
                    s.append(item);
                }
            }
        }
    }
}

impl Decodable for RlpItem {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        decode_exact(rlp.as_raw()).map_err(|_| DecoderError::Custom("non-canonical RLP item"))
    }
}

impl From<Vec<u8>> for RlpItem {
    fn from(b: Vec<u8>) -> Self {
        RlpItem::Bytes(b)
    }
}

impl From<&[u8]> for RlpItem {
    fn from(b: &[u8]) -> Self {
        RlpItem::Bytes(b.to_vec())
    }
}

impl From<Vec<RlpItem>> for RlpItem {
    fn from(items: Vec<RlpItem>) -> Self {
        RlpItem::List(items)
    }
}

impl From<u64> for RlpItem {
    fn from(v: u64) -> Self {
        RlpItem::Bytes(trim_leading_zeros(&v.to_be_bytes()))
    }
}

impl From<U256> for RlpItem {
    fn from(v: U256) -> Self {
        let mut buf = [0; 32];
        v.to_big_endian(&mut buf);

        RlpItem::Bytes(trim_leading_zeros(&buf))
    }
}

impl From<Address> for RlpItem {
    fn from(a: Address) -> Self {
        RlpItem::Bytes(a.as_bytes().to_vec())
    }
}

impl From<H256> for RlpItem {
    fn from(h: H256) -> Self {
        RlpItem::Bytes(h.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use rlp_derive::RlpEncodable;

    use super::*;
    use crate::{decode::decode, testing_utils::common_setup};

    const NUM_RANDOM_ITEMS: usize = 500;

    fn gen_random_item(rng: &mut StdRng, depth: usize) -> RlpItem {
        match depth == 0 || rng.gen_bool(0.6) {
            true => {
                // Mix short, boundary and long payloads.
                let len = match rng.gen_range(0..4) {
                    0 => rng.gen_range(0..2),
                    1 => rng.gen_range(54..58),
                    _ => rng.gen_range(0..300),
                };
                RlpItem::Bytes((0..len).map(|_| rng.gen()).collect())
            }
            false => {
                let n = rng.gen_range(0..6);
                RlpItem::List((0..n).map(|_| gen_random_item(rng, depth - 1)).collect())
            }
        }
    }

    /// Length of the shortest possible encoding of `item`.
    fn minimal_len(item: &RlpItem) -> usize {
        let (payload_len, single) = match item {
            RlpItem::Bytes(b) => (b.len(), b.len() == 1 && b[0] < 0x80),
            RlpItem::List(items) => (items.iter().map(minimal_len).sum(), false),
        };

        match (single, payload_len) {
            (true, _) => 1,
            (false, 0..=55) => 1 + payload_len,
            (false, l) => 1 + (usize::BITS as usize / 8 - l.leading_zeros() as usize / 8) + l,
        }
    }

    #[test]
    fn encodes_known_vectors() {
        common_setup();

        assert_eq!(RlpItem::from(b"dog".as_slice()).encode(), hex!("83646f67"));
        assert_eq!(RlpItem::from(0u64).encode(), hex!("80"));
        assert_eq!(RlpItem::from(15u64).encode(), hex!("0f"));
        assert_eq!(RlpItem::from(1024u64).encode(), hex!("820400"));
        assert_eq!(RlpItem::List(vec![]).encode(), hex!("c0"));
        assert_eq!(
            RlpItem::List(vec![b"cat".as_slice().into(), b"dog".as_slice().into()]).encode(),
            hex!("c88363617483646f67")
        );
    }

    #[test]
    fn random_items_round_trip_with_minimal_encoding() {
        common_setup();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..NUM_RANDOM_ITEMS {
            let item = gen_random_item(&mut rng, 3);
            let enc = item.encode();

            assert_eq!(enc.len(), minimal_len(&item));
            assert_eq!(decode_exact(&enc).unwrap(), item);
            assert_eq!(decode_exact(&enc).unwrap().encode(), enc);
        }
    }

    #[derive(RlpEncodable)]
    struct Sample {
        nonce: u64,
        to: Vec<u8>,
        values: Vec<u64>,
    }

    #[test]
    fn reads_items_encoded_by_the_rlp_crate() {
        let sample = Sample {
            nonce: 0x57,
            to: hex!("fc976d96ccc57bc9d04aea92a4a66abd71926298").to_vec(),
            values: vec![0, 1, 0x1_0000],
        };
        let enc = rlp::encode(&sample);

        let (item, rest) = decode(&enc).unwrap();
        assert!(rest.is_empty());

        let fields = item.list_of(3).unwrap();
        assert_eq!(fields[0].to_u64().unwrap(), 0x57);
        assert_eq!(
            fields[1].to_address().unwrap(),
            Address::from(hex!("fc976d96ccc57bc9d04aea92a4a66abd71926298"))
        );
        let values: Vec<u64> = fields[2]
            .list()
            .unwrap()
            .iter()
            .map(|v| v.to_u64().unwrap())
            .collect();
        assert_eq!(values, vec![0, 1, 0x1_0000]);

        let via_crate: RlpItem = rlp::decode(&enc).unwrap();
        assert_eq!(via_crate, item);
    }

    #[test]
    fn typed_accessors_reject_bad_shapes() {
        let list = RlpItem::List(vec![]);
        assert_eq!(list.bytes(), Err(RlpError::UnexpectedList));
        assert_eq!(list.list_of(2), Err(RlpError::ItemCount { expected: 2, found: 0 }));
        assert_eq!(RlpItem::from(vec![1u8]).list(), Err(RlpError::UnexpectedString));

        assert_eq!(RlpItem::from(vec![0u8, 1]).to_u64(), Err(RlpError::LeadingZero));
        assert_eq!(RlpItem::from(vec![1u8; 9]).to_u64(), Err(RlpError::Overflow(9)));
        assert_eq!(RlpItem::from(vec![1u8; 33]).to_u256(), Err(RlpError::Overflow(33)));
        assert_eq!(
            RlpItem::from(vec![1u8; 19]).to_address(),
            Err(RlpError::InvalidLength { expected: 20, found: 19 })
        );
        assert_eq!(RlpItem::from(Vec::<u8>::new()).to_optional_address(), Ok(None));
        assert_eq!(RlpItem::from(Vec::<u8>::new()).to_u256(), Ok(U256::zero()));
    }

    #[test]
    fn integer_conversions_are_canonical() {
        let v = U256::from(0x0fd2e3afd46000u64);
        let item = RlpItem::from(v);

        assert_eq!(item, RlpItem::from(hex!("0fd2e3afd46000").to_vec()));
        assert_eq!(item.to_u256().unwrap(), v);
        assert_eq!(RlpItem::from(U256::zero()), RlpItem::from(Vec::<u8>::new()));
    }

    #[test]
    fn json_uses_hex_strings_and_arrays() {
        let item: RlpItem = serde_json::from_str(r#"["0x05", "0x", [], ["0xc0ffee"]]"#).unwrap();

        assert_eq!(
            item,
            RlpItem::List(vec![
                vec![5u8].into(),
                Vec::<u8>::new().into(),
                RlpItem::List(vec![]),
                RlpItem::List(vec![hex!("c0ffee").to_vec().into()]),
            ])
        );
        assert_eq!(
            serde_json::to_string(&item).unwrap(),
            r#"["0x05","0x",[],["0xc0ffee"]]"#
        );
    }
}
