//! What a payment transaction moved, and to whom.

use bridge_common::ERC20_TRANSFER_SELECTOR;
use ethereum_types::{Address, U256};

use crate::transaction::{RawTransactionFields, TxError, TxResult};

/// Length of `transfer(address,uint256)` call data.
pub const ERC20_TRANSFER_CALL_LEN: usize = 4 + 32 + 32;

/// A decoded payment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transfer {
    /// Native value sent to `to`.
    Native {
        /// Recipient.
        to: Address,
        /// Amount in wei.
        value: U256,
    },

    /// `transfer(to, value)` called on the `token` contract.
    Erc20 {
        /// Token contract the call was sent to.
        token: Address,
        /// Token recipient.
        to: Address,
        /// Amount in token units.
        value: U256,
    },
}

impl Transfer {
    /// Reads a native payment from the recipient and value fields.
    pub fn native(fields: &RawTransactionFields) -> TxResult<Self> {
        Ok(Transfer::Native {
            to: fields.to()?.ok_or(TxError::ContractCreation)?,
            value: fields.value()?,
        })
    }

    /// Reads a token payment from the call data.
    pub fn erc20(fields: &RawTransactionFields) -> TxResult<Self> {
        let token = fields.to()?.ok_or(TxError::ContractCreation)?;
        let (to, value) = decode_erc20_transfer(fields.data()?)?;

        Ok(Transfer::Erc20 { token, to, value })
    }

    /// Recipient of the payment.
    pub fn to(&self) -> Address {
        match self {
            Transfer::Native { to, .. } | Transfer::Erc20 { to, .. } => *to,
        }
    }

    /// Amount paid.
    pub fn value(&self) -> U256 {
        match self {
            Transfer::Native { value, .. } | Transfer::Erc20 { value, .. } => *value,
        }
    }

    /// The token contract, `None` for native payments.
    pub fn token(&self) -> Option<Address> {
        match self {
            Transfer::Native { .. } => None,
            Transfer::Erc20 { token, .. } => Some(*token),
        }
    }
}

/// Decodes the ABI arguments of `transfer(address,uint256)` call data.
///
/// Anything after the two arguments is ignored, as the ABI decoder of the
/// token contract would.
pub fn decode_erc20_transfer(data: &[u8]) -> TxResult<(Address, U256)> {
    if data.len() < ERC20_TRANSFER_CALL_LEN || data[..4] != ERC20_TRANSFER_SELECTOR {
        return Err(TxError::NotErc20Transfer);
    }

    let (to_word, value_word) = (&data[4..36], &data[36..68]);

    // The address is left padded with zeros to a full word.
    if to_word[..12].iter().any(|b| *b != 0) {
        return Err(TxError::NotErc20Transfer);
    }

    Ok((
        Address::from_slice(&to_word[12..]),
        U256::from_big_endian(value_word),
    ))
}

/// `transfer(address,uint256)` call data.
pub fn encode_erc20_transfer(to: Address, value: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(ERC20_TRANSFER_CALL_LEN);
    data.extend_from_slice(&ERC20_TRANSFER_SELECTOR);
    data.extend_from_slice(&[0; 12]);
    data.extend_from_slice(to.as_bytes());

    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    data.extend_from_slice(&word);

    data
}
