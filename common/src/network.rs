//! Network codes used to address chains inside the protocol.
//!
//! A network code is not an EVM chain id. It is a protocol-level discriminator
//! that also appears in the last four digits of upward transfer values, which
//! is why every code fits in four decimal digits.

use std::fmt::{self, Display};

/// Protocol-level chain discriminator.
pub type NetworkCode = u64;

/// Ethereum mainnet (or its testnet).
pub const ETHEREUM: NetworkCode = 1001;
/// Polygon PoS.
pub const POLYGON: NetworkCode = 1002;
/// Optimism.
pub const OPTIMISM: NetworkCode = 1003;
/// Arbitrum One.
pub const ARBITRUM: NetworkCode = 1004;
/// Scroll.
pub const SCROLL: NetworkCode = 1005;
/// zkSync Era.
pub const ZKSYNC: NetworkCode = 1006;
/// Base.
pub const BASE: NetworkCode = 1007;
/// Polygon zkEVM.
pub const POLYGON_ZKEVM: NetworkCode = 1008;
/// Linea.
pub const LINEA: NetworkCode = 1009;
/// Taiko.
pub const TAIKO: NetworkCode = 1010;
/// Mantle.
pub const MANTLE: NetworkCode = 1011;

/// Human readable wrapper for logging network codes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Network(pub NetworkCode);

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            ETHEREUM => "ethereum",
            POLYGON => "polygon",
            OPTIMISM => "optimism",
            ARBITRUM => "arbitrum",
            SCROLL => "scroll",
            ZKSYNC => "zksync",
            BASE => "base",
            POLYGON_ZKEVM => "polygon-zkevm",
            LINEA => "linea",
            TAIKO => "taiko",
            MANTLE => "mantle",
            _ => return write!(f, "network({})", self.0),
        };

        write!(f, "{} ({})", name, self.0)
    }
}
