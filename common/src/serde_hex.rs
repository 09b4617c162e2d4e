//! `0x`-prefixed hex (de)serialization for raw byte payloads.
//!
//! Use with `#[serde(with = "bridge_common::serde_hex")]` on `Vec<u8>` fields,
//! or `serde_hex::vec` on `Vec<Vec<u8>>` fields such as proof node lists.

use serde::{Deserializer, Serializer};

/// Serializes bytes as a `0x`-prefixed hex string.
pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    impl_serde::serialize::serialize(bytes, serializer)
}

/// Deserializes bytes from a `0x`-prefixed hex string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    impl_serde::serialize::deserialize(deserializer)
}

/// Same as the parent module, for lists of byte payloads.
pub mod vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    struct Hex(#[serde(with = "super")] Vec<u8>);

    /// Serializes a list of byte payloads as hex strings.
    pub fn serialize<S>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(items.iter().map(|b| Hex(b.clone())))
    }

    /// Deserializes a list of hex strings into byte payloads.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = Vec::<Hex>::deserialize(deserializer)?;
        Ok(items.into_iter().map(|h| h.0).collect())
    }
}
