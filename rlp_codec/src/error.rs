//! Errors raised while decoding or interpreting RLP.

use thiserror::Error;

/// Alias for the result of any decoding operation.
pub type RlpResult<T> = Result<T, RlpError>;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
/// Ways in which a byte string can fail to be a canonical RLP encoding.
pub enum MalformedRlp {
    #[error("Tried to decode an item from an empty buffer")]
    /// Nothing to decode.
    Empty,

    #[error("Declared length of {needed} bytes exceeds the {available} bytes remaining")]
    /// A length prefix points past the end of the buffer.
    Truncated {
        /// Bytes required by the prefix.
        needed: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    #[error("Multi-byte length prefix starts with a zero byte")]
    /// Length of a long item has a leading zero byte.
    LeadingZeroLength,

    #[error("Long form used for a payload of only {0} bytes")]
    /// Long form used where the short form is mandatory.
    NonCanonicalLongForm(usize),

    #[error("Single byte {0:#04x} wrapped in a string prefix")]
    /// A byte below `0x80` must encode itself.
    NonCanonicalSingleByte(u8),

    #[error("Length prefix of {0} bytes cannot be addressed on this platform")]
    /// Length does not fit into a `usize`.
    LengthTooLarge(usize),

    #[error("{0} bytes remain after the top level item")]
    /// Extra data after a complete item.
    TrailingBytes(usize),

    #[error("Nesting deeper than {0} lists")]
    /// Lists nested too deep to be a transaction, header or trie node.
    TooDeep(usize),
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
/// Errors encountered when decoding or reading an [`RlpItem`][crate::RlpItem].
pub enum RlpError {
    #[error("Malformed RLP: {0}")]
    /// The input is not a canonical encoding.
    Malformed(#[from] MalformedRlp),

    #[error("Expected a byte string but found a list")]
    /// A list was found where a byte string was expected.
    UnexpectedList,

    #[error("Expected a list but found a byte string")]
    /// A byte string was found where a list was expected.
    UnexpectedString,

    #[error("Expected a list of {expected} items but found {found}")]
    /// A list has the wrong number of items.
    ItemCount {
        /// Required item count.
        expected: usize,
        /// Actual item count.
        found: usize,
    },

    #[error("Integer of {0} bytes overflows the target type")]
    /// Integer payload too large for the target type.
    Overflow(usize),

    #[error("Integer payload has a leading zero byte")]
    /// Integers must be encoded without leading zeros.
    LeadingZero,

    #[error("Expected a byte string of {expected} bytes but found {found}")]
    /// Fixed width value (address, hash) has the wrong width.
    InvalidLength {
        /// Required width.
        expected: usize,
        /// Actual width.
        found: usize,
    },
}
