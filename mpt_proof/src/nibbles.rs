//! Define [`Nibbles`] and how to convert bytes and hex prefix encodings into
//! nibbles.

use std::{
    fmt::{self, Display},
    ops::Deref,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Use a whole byte for a Nibble just for convenience
/// A Nibble has 4 bits and is stored as `u8`.
pub type Nibble = u8;

#[derive(Clone, Debug, Eq, Error, PartialEq, Hash)]
/// Errors encountered when converting to hex prefix encoding to nibbles.
pub enum FromHexPrefixError {
    #[error("Tried to convert an empty hex prefix byte string into `Nibbles`")]
    /// There is no flag byte.
    Empty,

    #[error("Tried to convert a hex prefix byte string into `Nibbles` with invalid flags at the start: {0:#04b}")]
    /// The hex prefix encoding flag is invalid.
    InvalidFlags(Nibble),

    #[error("Even length hex prefix encoding has a non zero padding nibble: {0:#x}")]
    /// The padding nibble of an even length path is set.
    InvalidPadding(Nibble),
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Hash)]
#[error("Nibble {0:#x} at position {1} is larger than 15")]
/// A value that does not fit into four bits was used as a nibble.
pub struct InvalidNibbleError(pub u8, pub usize);

/// A sequence of nibbles, e.g. a path through a trie.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Nibbles(Vec<Nibble>);

impl Nibbles {
    /// Splits every byte of `bytes` into two nibbles, high nibble first.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self(bytes.iter().flat_map(|b| [b >> 4, b & 0x0f]).collect())
    }

    /// Creates `Nibbles` from raw nibble values.
    pub fn from_nibbles(nibbles: Vec<u8>) -> Result<Self, InvalidNibbleError> {
        if let Some((i, n)) = nibbles.iter().enumerate().find(|(_, n)| **n > 0x0f) {
            return Err(InvalidNibbleError(*n, i));
        }

        Ok(Self(nibbles))
    }

    /// Number of nibbles shared by the start of `self` and `other`.
    pub fn common_prefix_len(&self, other: &[Nibble]) -> usize {
        self.0
            .iter()
            .zip(other.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Nibbles in `start..end`.
    pub fn segment(&self, start: usize, end: usize) -> Nibbles {
        Self(self.0[start..end].to_vec())
    }

    /// Nibbles from `start` onwards.
    pub fn suffix(&self, start: usize) -> Nibbles {
        Self(self.0[start.min(self.0.len())..].to_vec())
    }

    /// Converts `Nibbles` to hex-prefix encoding (AKA "compact").
    pub fn to_hex_prefix_encoding(&self, is_leaf: bool) -> Vec<u8> {
        let is_odd = self.0.len() % 2 == 1;

        let odd_bit = match is_odd {
            false => 0,
            true => 1,
        };

        let term_bit = match is_leaf {
            false => 0,
            true => 1,
        };

        let flags: u8 = (odd_bit | (term_bit << 1)) << 4;
        let mut bytes = Vec::with_capacity(self.0.len() / 2 + 1);

        let rest = match is_odd {
            false => {
                bytes.push(flags);
                &self.0[..]
            }
            true => {
                bytes.push(flags | self.0[0]);
                &self.0[1..]
            }
        };

        bytes.extend(rest.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));
        bytes
    }

    /// Converts a hex prefix byte string ("AKA "compact") into `Nibbles`,
    /// also returning whether the flags mark a leaf.
    pub fn from_hex_prefix_encoding(
        hex_prefix_bytes: &[u8],
    ) -> Result<(Self, bool), FromHexPrefixError> {
        let first = *hex_prefix_bytes.first().ok_or(FromHexPrefixError::Empty)?;
        let flag_bits = first >> 4;

        // is_odd --> 0b01
        // is_leaf --> 0b10
        let (is_leaf, is_odd) = match flag_bits {
            0b00 => (false, false),
            0b01 => (false, true),
            0b10 => (true, false),
            0b11 => (true, true),
            _ => return Err(FromHexPrefixError::InvalidFlags(flag_bits)),
        };

        let mut nibbles = Vec::with_capacity(hex_prefix_bytes.len() * 2);

        match is_odd {
            false if first & 0x0f != 0 => {
                return Err(FromHexPrefixError::InvalidPadding(first & 0x0f))
            }
            false => (),
            true => nibbles.push(first & 0x0f),
        }

        nibbles.extend(
            hex_prefix_bytes[1..]
                .iter()
                .flat_map(|b| [b >> 4, b & 0x0f]),
        );

        Ok((Self(nibbles), is_leaf))
    }
}

impl Deref for Nibbles {
    type Target = [Nibble];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Vec<u8>> for Nibbles {
    type Error = InvalidNibbleError;

    fn try_from(v: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_nibbles(v)
    }
}

impl From<Nibbles> for Vec<u8> {
    fn from(n: Nibbles) -> Self {
        n.0
    }
}

impl Display for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for n in self.0.iter() {
            write!(f, "{:x}", n)?;
        }

        Ok(())
    }
}

impl FromStr for Nibbles {
    type Err = InvalidNibbleError;

    /// Parses a hex string where every character is one nibble (`0x123` has
    /// three nibbles).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);

        s.chars()
            .enumerate()
            .map(|(i, c)| {
                c.to_digit(16)
                    .map(|d| d as u8)
                    .ok_or(InvalidNibbleError(c as u8, i))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    fn n(s: &str) -> Nibbles {
        Nibbles::from_str(s).unwrap()
    }

    #[test]
    fn from_bytes_splits_high_nibble_first() {
        assert_eq!(Nibbles::from_bytes_be(&hex!("12ab")), n("0x12ab"));
        assert_eq!(Nibbles::from_bytes_be(&[]).len(), 0);
    }

    #[test]
    fn nibbles_to_hex_prefix_encoding_works() {
        assert_eq!(n("0x1234").to_hex_prefix_encoding(false), hex!("001234"));
        assert_eq!(n("0x1234").to_hex_prefix_encoding(true), hex!("201234"));
        assert_eq!(n("0x12345").to_hex_prefix_encoding(false), hex!("112345"));
        assert_eq!(n("0x12345").to_hex_prefix_encoding(true), hex!("312345"));
        assert_eq!(n("0x").to_hex_prefix_encoding(true), hex!("20"));
    }

    #[test]
    fn nibbles_from_hex_prefix_encoding_works() {
        assert_eq!(
            Nibbles::from_hex_prefix_encoding(&hex!("001234")),
            Ok((n("0x1234"), false))
        );
        assert_eq!(
            Nibbles::from_hex_prefix_encoding(&hex!("201234")),
            Ok((n("0x1234"), true))
        );
        assert_eq!(
            Nibbles::from_hex_prefix_encoding(&hex!("112345")),
            Ok((n("0x12345"), false))
        );
        assert_eq!(
            Nibbles::from_hex_prefix_encoding(&hex!("312345")),
            Ok((n("0x12345"), true))
        );
        assert_eq!(
            Nibbles::from_hex_prefix_encoding(&hex!("20")),
            Ok((n("0x"), true))
        );
    }

    #[test]
    fn invalid_hex_prefix_encodings_are_rejected() {
        assert_eq!(
            Nibbles::from_hex_prefix_encoding(&[]),
            Err(FromHexPrefixError::Empty)
        );
        assert_eq!(
            Nibbles::from_hex_prefix_encoding(&hex!("4012")),
            Err(FromHexPrefixError::InvalidFlags(0b100))
        );
        assert_eq!(
            Nibbles::from_hex_prefix_encoding(&hex!("0512")),
            Err(FromHexPrefixError::InvalidPadding(5))
        );
    }

    #[test]
    fn json_path_is_validated() {
        let path: Nibbles = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(path, n("0x12"));
        assert!(serde_json::from_str::<Nibbles>("[1, 16]").is_err());
        assert_eq!(serde_json::to_string(&path).unwrap(), "[1,2]");
    }

    #[test]
    fn common_prefix_and_suffix() {
        let a = n("0x12345");
        assert_eq!(a.common_prefix_len(&n("0x1299")), 2);
        assert_eq!(a.common_prefix_len(&n("0x")), 0);
        assert_eq!(a.suffix(3), n("0x45"));
        assert_eq!(a.suffix(9), n("0x"));
        assert_eq!(a.segment(1, 3), n("0x23"));
        assert_eq!(a.to_string(), "0x12345");
    }
}
