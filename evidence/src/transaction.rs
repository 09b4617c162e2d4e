//! Recomposition of signed transactions from their decoded fields, and
//! recovery of the account that signed them.
//!
//! Three envelopes are supported:
//! - legacy: `rlp([nonce, gasPrice, gasLimit, to, value, data, v, r, s])`
//! - access list: `0x01 || rlp([chainId, nonce, gasPrice, gasLimit, to, value,
//!   data, accessList, yParity, r, s])`
//! - dynamic fee: `0x02 || rlp([chainId, nonce, maxPriorityFeePerGas,
//!   maxFeePerGas, gasLimit, to, value, data, accessList, yParity, r, s])`

use std::fmt::{self, Display};

use ethereum_types::{Address, H256, U256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use keccak_hash::keccak;
use log::trace;
use rlp_codec::{decode_exact, RlpError, RlpItem};
use thiserror::Error;

/// Result type for transaction decoding and recovery.
pub type TxResult<T> = Result<T, TxError>;

/// Lowest legacy `v` value that carries an EIP-155 chain id.
const EIP155_V_OFFSET: u64 = 35;

/// Legacy `v` value for recovery id 0 without replay protection.
const PRE_EIP155_V_OFFSET: u64 = 27;

/// Errors encountered when decoding or recomposing a transaction.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TxError {
    /// The transaction or one of its fields is not valid RLP.
    #[error(transparent)]
    Rlp(#[from] RlpError),

    /// No bytes at all.
    #[error("Empty transaction payload")]
    Empty,

    /// The leading byte is neither a known type nor a legacy list prefix.
    #[error("Unsupported transaction type {0:#04x}")]
    UnsupportedType(u8),

    /// The field list does not have the arity of its envelope.
    #[error("{tx_type} transaction has {found} fields instead of {expected}")]
    FieldCount {
        /// Envelope of the transaction.
        tx_type: TxType,
        /// Arity of that envelope.
        expected: usize,
        /// Number of fields supplied.
        found: usize,
    },

    /// A legacy `v` value that maps to no recovery id.
    #[error("Legacy v value {0} is not a valid recovery value")]
    InvalidV(u64),

    /// The transaction has no recipient.
    #[error("Transaction creates a contract and has no recipient")]
    ContractCreation,

    /// The call data is not `transfer(address,uint256)`.
    #[error("Call data is not an ERC20 transfer")]
    NotErc20Transfer,

    /// The signature does not yield a signer.
    #[error(transparent)]
    Signature(#[from] SignatureRecoveryError),
}

/// Reasons an ECDSA signature does not yield a signer.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SignatureRecoveryError {
    /// `r` or `s` is zero or not below the curve order.
    #[error("Signature scalars are zero or out of range")]
    InvalidScalars,

    /// `s` lies in the upper half of the curve order.
    #[error("Signature has a high s value")]
    HighS,

    /// The recovery id is not 0 or 1.
    #[error("Recovery id {0} is out of range")]
    InvalidRecoveryId(u64),

    /// The signature is well formed but no public key matches it.
    #[error("No public key can be recovered from the signature")]
    NoPublicKey,
}

/// Transaction envelope.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TxType {
    /// Untyped transaction, optionally replay protected by EIP-155.
    Legacy,
    /// EIP-2930 transaction, type `0x01`.
    AccessList,
    /// EIP-1559 transaction, type `0x02`.
    DynamicFee,
}

impl TxType {
    /// Classifies a signed transaction by its first byte.
    pub fn from_first_byte(b: u8) -> TxResult<Self> {
        match b {
            0x01 => Ok(TxType::AccessList),
            0x02 => Ok(TxType::DynamicFee),
            b if b >= 0xc0 => Ok(TxType::Legacy),
            b => Err(TxError::UnsupportedType(b)),
        }
    }

    /// The type byte prefixed to the RLP payload, `None` for legacy.
    pub fn type_byte(self) -> Option<u8> {
        match self {
            TxType::Legacy => None,
            TxType::AccessList => Some(0x01),
            TxType::DynamicFee => Some(0x02),
        }
    }

    /// Number of fields in the signed payload.
    pub fn field_count(self) -> usize {
        match self {
            TxType::Legacy => 9,
            TxType::AccessList => 11,
            TxType::DynamicFee => 12,
        }
    }

    /// Position of the recipient field.
    fn to_index(self) -> usize {
        match self {
            TxType::Legacy => 3,
            TxType::AccessList => 4,
            TxType::DynamicFee => 5,
        }
    }
}

impl Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxType::Legacy => "Legacy",
            TxType::AccessList => "Access list (0x01)",
            TxType::DynamicFee => "Dynamic fee (0x02)",
        };

        write!(f, "{}", s)
    }
}

/// The ordered fields of a signed transaction, signature included.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawTransactionFields {
    tx_type: TxType,
    items: Vec<RlpItem>,
}

impl RawTransactionFields {
    /// Wraps `items`, which must have the arity of `tx_type`.
    pub fn from_items(tx_type: TxType, items: Vec<RlpItem>) -> TxResult<Self> {
        match items.len() == tx_type.field_count() {
            false => Err(TxError::FieldCount {
                tx_type,
                expected: tx_type.field_count(),
                found: items.len(),
            }),
            true => Ok(Self { tx_type, items }),
        }
    }

    /// Same as [`Self::from_items`] for a list item.
    pub fn from_item(tx_type: TxType, item: &RlpItem) -> TxResult<Self> {
        Self::from_items(tx_type, item.list()?.to_vec())
    }

    /// The envelope.
    pub fn tx_type(&self) -> TxType {
        self.tx_type
    }

    /// All fields, in payload order.
    pub fn items(&self) -> &[RlpItem] {
        &self.items
    }

    /// The chain id: explicit for typed transactions, derived from `v` for
    /// EIP-155 legacy transactions, `None` otherwise.
    pub fn chain_id(&self) -> TxResult<Option<u64>> {
        match self.tx_type {
            TxType::Legacy => match self.v()? {
                v if v >= EIP155_V_OFFSET => Ok(Some((v - EIP155_V_OFFSET) / 2)),
                _ => Ok(None),
            },
            _ => self.items[0].to_u64().map(Some).map_err(Into::into),
        }
    }

    /// The sender's nonce.
    pub fn nonce(&self) -> TxResult<u64> {
        let idx = match self.tx_type {
            TxType::Legacy => 0,
            _ => 1,
        };

        Ok(self.items[idx].to_u64()?)
    }

    /// The price per unit of gas the sender is willing to pay: `gasPrice`, or
    /// `maxFeePerGas` for dynamic fee transactions.
    pub fn gas_price(&self) -> TxResult<U256> {
        Ok(self.items[self.tx_type.to_index() - 2].to_u256()?)
    }

    /// The gas limit.
    pub fn gas_limit(&self) -> TxResult<U256> {
        Ok(self.items[self.tx_type.to_index() - 1].to_u256()?)
    }

    /// The recipient, `None` for contract creations.
    pub fn to(&self) -> TxResult<Option<Address>> {
        Ok(self.items[self.tx_type.to_index()].to_optional_address()?)
    }

    /// The transferred native value.
    pub fn value(&self) -> TxResult<U256> {
        Ok(self.items[self.tx_type.to_index() + 1].to_u256()?)
    }

    /// The call data.
    pub fn data(&self) -> TxResult<&[u8]> {
        Ok(self.items[self.tx_type.to_index() + 2].bytes()?)
    }

    /// `v` for legacy transactions, `yParity` for typed ones.
    pub fn v(&self) -> TxResult<u64> {
        Ok(self.items[self.signature_start()].to_u64()?)
    }

    /// The signature's `r` scalar.
    pub fn r(&self) -> TxResult<U256> {
        Ok(self.items[self.signature_start() + 1].to_u256()?)
    }

    /// The signature's `s` scalar.
    pub fn s(&self) -> TxResult<U256> {
        Ok(self.items[self.signature_start() + 2].to_u256()?)
    }

    fn signature_start(&self) -> usize {
        self.items.len() - 3
    }

    /// The signed transaction bytes as broadcast: type byte (if any) followed
    /// by the RLP encoding of every field.
    pub fn compose_signable_bytes(&self) -> Vec<u8> {
        prefixed(self.tx_type, RlpItem::List(self.items.clone()).encode())
    }

    /// The payload covered by the signature.
    pub fn signing_payload(&self) -> TxResult<Vec<u8>> {
        let unsigned = &self.items[..self.signature_start()];

        let payload = match (self.tx_type, self.chain_id()?) {
            (TxType::Legacy, Some(chain_id)) => {
                // EIP-155: the chain id and two empty strings replace v, r, s.
                let mut items = unsigned[..6].to_vec();
                items.extend([
                    RlpItem::from(chain_id),
                    RlpItem::Bytes(Vec::new()),
                    RlpItem::Bytes(Vec::new()),
                ]);

                RlpItem::List(items).encode()
            }
            _ => RlpItem::List(unsigned.to_vec()).encode(),
        };

        Ok(prefixed(self.tx_type, payload))
    }

    /// Keccak-256 of [`Self::signing_payload`].
    pub fn signing_hash(&self) -> TxResult<H256> {
        Ok(keccak(self.signing_payload()?))
    }

    /// The recovery id encoded by `v` / `yParity`.
    pub fn recovery_id(&self) -> TxResult<u8> {
        let v = self.v()?;

        let recovery_id = match self.tx_type {
            TxType::Legacy if v >= EIP155_V_OFFSET => (v - EIP155_V_OFFSET) % 2,
            TxType::Legacy if v == PRE_EIP155_V_OFFSET || v == PRE_EIP155_V_OFFSET + 1 => {
                v - PRE_EIP155_V_OFFSET
            }
            TxType::Legacy => return Err(TxError::InvalidV(v)),
            _ if v > 1 => return Err(SignatureRecoveryError::InvalidRecoveryId(v).into()),
            _ => v,
        };

        Ok(recovery_id as u8)
    }
}

fn prefixed(tx_type: TxType, payload: Vec<u8>) -> Vec<u8> {
    match tx_type.type_byte() {
        None => payload,
        Some(b) => {
            let mut bytes = Vec::with_capacity(payload.len() + 1);
            bytes.push(b);
            bytes.extend(payload);
            bytes
        }
    }
}

/// Splits a signed transaction into its envelope and fields.
pub fn decode_raw_tx(bytes: &[u8]) -> TxResult<RawTransactionFields> {
    let first = *bytes.first().ok_or(TxError::Empty)?;
    let tx_type = TxType::from_first_byte(first)?;

    let payload = match tx_type.type_byte() {
        None => bytes,
        Some(_) => &bytes[1..],
    };

    RawTransactionFields::from_item(tx_type, &decode_exact(payload)?)
}

/// The transaction hash, which is also the leaf hash in the transactions trie.
pub fn tx_hash(bytes: &[u8]) -> H256 {
    keccak(bytes)
}

/// Whether `fields` recompose to exactly `original`.
pub fn verify_raw_tx(original: &[u8], fields: &RawTransactionFields) -> bool {
    let composed = fields.compose_signable_bytes();
    let matches = composed == original;

    if !matches {
        trace!(
            "Recomposed {} transaction of {} bytes differs from the original of {} bytes",
            fields.tx_type(),
            composed.len(),
            original.len()
        );
    }

    matches
}

/// Recovers the signer of a transaction.
pub fn recover_address(fields: &RawTransactionFields) -> TxResult<Address> {
    let hash = fields.signing_hash()?;
    let signer = recover_signer(hash, fields.recovery_id()?, fields.r()?, fields.s()?)?;

    Ok(signer)
}

/// Recovers the address whose key produced `(r, s)` over `hash`.
pub fn recover_signer(
    hash: H256,
    recovery_id: u8,
    r: U256,
    s: U256,
) -> Result<Address, SignatureRecoveryError> {
    let mut r_bytes = [0u8; 32];
    let mut s_bytes = [0u8; 32];
    r.to_big_endian(&mut r_bytes);
    s.to_big_endian(&mut s_bytes);

    let signature = Signature::from_scalars(r_bytes, s_bytes)
        .map_err(|_| SignatureRecoveryError::InvalidScalars)?;

    if signature.normalize_s().is_some() {
        return Err(SignatureRecoveryError::HighS);
    }

    let recovery_id = RecoveryId::from_byte(recovery_id)
        .ok_or(SignatureRecoveryError::InvalidRecoveryId(recovery_id as u64))?;

    let key = VerifyingKey::recover_from_prehash(hash.as_bytes(), &signature, recovery_id)
        .map_err(|_| SignatureRecoveryError::NoPublicKey)?;

    Ok(public_key_to_address(&key))
}

/// The account address of a public key: the last 20 bytes of the Keccak-256
/// of its uncompressed encoding without the `0x04` tag.
pub fn public_key_to_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak(&point.as_bytes()[1..]);

    Address::from_slice(&hash.as_bytes()[12..])
}

/// The recipient and native value of a signed transaction.
pub fn decode_to_and_value(bytes: &[u8]) -> TxResult<(Address, U256)> {
    let fields = decode_raw_tx(bytes)?;
    let to = fields.to()?.ok_or(TxError::ContractCreation)?;

    Ok((to, fields.value()?))
}
