//! Decoding of RLP prefixes and items.
//!
//! Every decoding function here is strict: a successful decode guarantees that
//! [`RlpItem::encode`] reproduces the consumed bytes exactly.

use std::mem::size_of;

use log::trace;

use crate::{
    error::{MalformedRlp, RlpError, RlpResult},
    item::RlpItem,
};

/// Deepest list nesting accepted by the decoder. Transactions, headers and
/// trie nodes never get close to this; deeper input is adversarial.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Length of the payload after which the long form must be used.
pub(crate) const SHORT_PAYLOAD_LIMIT: usize = 55;

/// The decoded prefix of an item.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
    /// Whether the item is a list.
    pub is_list: bool,
    /// Number of prefix bytes (`0` for a single byte below `0x80`).
    pub header_len: usize,
    /// Number of payload bytes following the prefix.
    pub payload_len: usize,
}

impl Header {
    /// Total number of bytes occupied by the item.
    pub fn total_len(&self) -> usize {
        self.header_len + self.payload_len
    }
}

/// Decodes and validates the prefix of the item at the start of `buf`.
///
/// The returned header is guaranteed to fit inside `buf`.
pub fn decode_header(buf: &[u8]) -> RlpResult<Header> {
    let first = *buf.first().ok_or(MalformedRlp::Empty)?;

    let header = match first {
        0x00..=0x7f => Header {
            is_list: false,
            header_len: 0,
            payload_len: 1,
        },
        0x80..=0xb7 => Header {
            is_list: false,
            header_len: 1,
            payload_len: (first - 0x80) as usize,
        },
        0xb8..=0xbf => decode_long_header(buf, false, (first - 0xb7) as usize)?,
        0xc0..=0xf7 => Header {
            is_list: true,
            header_len: 1,
            payload_len: (first - 0xc0) as usize,
        },
        0xf8..=0xff => decode_long_header(buf, true, (first - 0xf7) as usize)?,
    };

    let total = header
        .header_len
        .checked_add(header.payload_len)
        .ok_or(MalformedRlp::LengthTooLarge(header.payload_len))?;

    if total > buf.len() {
        return Err(MalformedRlp::Truncated {
            needed: total,
            available: buf.len(),
        }
        .into());
    }

    if !header.is_list && header.header_len == 1 && header.payload_len == 1 && buf[1] < 0x80 {
        return Err(MalformedRlp::NonCanonicalSingleByte(buf[1]).into());
    }

    Ok(header)
}

fn decode_long_header(buf: &[u8], is_list: bool, len_of_len: usize) -> RlpResult<Header> {
    let len_bytes = buf.get(1..1 + len_of_len).ok_or(MalformedRlp::Truncated {
        needed: 1 + len_of_len,
        available: buf.len(),
    })?;

    if len_bytes[0] == 0 {
        return Err(MalformedRlp::LeadingZeroLength.into());
    }

    if len_of_len > size_of::<usize>() {
        return Err(MalformedRlp::LengthTooLarge(len_of_len).into());
    }

    let payload_len = len_bytes
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);

    if payload_len <= SHORT_PAYLOAD_LIMIT {
        return Err(MalformedRlp::NonCanonicalLongForm(payload_len).into());
    }

    Ok(Header {
        is_list,
        header_len: 1 + len_of_len,
        payload_len,
    })
}

/// Decodes the item at the start of `buf`, returning it together with the
/// bytes that follow it.
pub fn decode(buf: &[u8]) -> RlpResult<(RlpItem, &[u8])> {
    decode_nested(buf, 0)
}

fn decode_nested(buf: &[u8], depth: usize) -> RlpResult<(RlpItem, &[u8])> {
    if depth > MAX_NESTING_DEPTH {
        return Err(MalformedRlp::TooDeep(MAX_NESTING_DEPTH).into());
    }

    let header = decode_header(buf)?;
    let (payload, rest) = buf[header.header_len..].split_at(header.payload_len);

    let item = match header.is_list {
        false => RlpItem::Bytes(payload.to_vec()),
        true => {
            let mut items = Vec::new();
            let mut remaining = payload;

            // Children must tile the payload exactly; a child running past the
            // end is reported as truncation by `decode_header`.
            while !remaining.is_empty() {
                let (child, r) = decode_nested(remaining, depth + 1)?;
                items.push(child);
                remaining = r;
            }

            RlpItem::List(items)
        }
    };

    Ok((item, rest))
}

/// Decodes `buf`, which must contain exactly one item.
pub fn decode_exact(buf: &[u8]) -> RlpResult<RlpItem> {
    let (item, rest) = decode(buf)?;

    if !rest.is_empty() {
        trace!("{} trailing bytes after RLP item", rest.len());
        return Err(MalformedRlp::TrailingBytes(rest.len()).into());
    }

    Ok(item)
}

/// Decodes `buf`, which must contain exactly one list, into its items.
pub fn decode_list_exact(buf: &[u8]) -> RlpResult<Vec<RlpItem>> {
    match decode_exact(buf)? {
        RlpItem::List(items) => Ok(items),
        RlpItem::Bytes(_) => Err(RlpError::UnexpectedString),
    }
}
