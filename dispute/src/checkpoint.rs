//! Block hashes relayed from other chains.
//!
//! A root manager on the source chain sends `(network code, block number,
//! block hash)` messages through a chain specific bridge. The child manager on
//! this chain authenticates the bridge's delivery with a [`MessageVerifier`],
//! decodes the message and records the hash for the evidence evaluator.

use std::collections::HashMap;

use bridge_common::{hash, network::NetworkCode};
use ethereum_types::{Address, H256, U256};
use evidence_verifier::BlockHashSource;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DisputeError, DisputeResult},
    pending::PendingChange,
};

/// Added to an L1 contract address to form the sender Arbitrum reports for
/// its L1 to L2 messages.
pub const ARBITRUM_ALIAS_OFFSET: [u8; 20] = [
    0x11, 0x11, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x11, 0x11,
];

const WORD: usize = 32;

/// Size of an encoded [`BlockInfo`] message.
pub const BLOCK_INFO_MESSAGE_LEN: usize = 6 * WORD;

/// Tag of block info messages.
pub fn receive_block_info_tag() -> H256 {
    hash(b"ReceiveBlockInfo")
}

/// Sender Arbitrum reports for messages sent by `l1` on L1.
pub fn apply_l1_to_l2_alias(l1: Address) -> Address {
    let sum = U256::from_big_endian(l1.as_bytes()) + U256::from_big_endian(&ARBITRUM_ALIAS_OFFSET);

    let mut word = [0u8; WORD];
    sum.to_big_endian(&mut word);
    Address::from_slice(&word[WORD - 20..])
}

/// The payload of a relay message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockInfo {
    /// Network the block belongs to.
    pub network_code: NetworkCode,
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: H256,
}

impl BlockInfo {
    /// Encodes the message as `abi.encode(tag, abi.encode(code, number, hash))`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BLOCK_INFO_MESSAGE_LEN);

        out.extend_from_slice(receive_block_info_tag().as_bytes());
        out.extend_from_slice(&word(U256::from(2 * WORD)));
        out.extend_from_slice(&word(U256::from(3 * WORD)));
        out.extend_from_slice(&word(U256::from(self.network_code)));
        out.extend_from_slice(&word(U256::from(self.number)));
        out.extend_from_slice(self.hash.as_bytes());

        out
    }

    /// Decodes a message produced by [`BlockInfo::encode`].
    pub fn decode(message: &[u8]) -> DisputeResult<Self> {
        if message.len() != BLOCK_INFO_MESSAGE_LEN {
            return Err(DisputeError::MalformedMessage);
        }

        let words: Vec<&[u8]> = message.chunks(WORD).collect();
        if words[0] != receive_block_info_tag().as_bytes()
            || U256::from_big_endian(words[1]) != U256::from(2 * WORD)
            || U256::from_big_endian(words[2]) != U256::from(3 * WORD)
        {
            return Err(DisputeError::MalformedMessage);
        }

        let network_code = U256::from_big_endian(words[3]);
        let number = U256::from_big_endian(words[4]);
        if network_code > U256::from(u64::MAX) || number > U256::from(u64::MAX) {
            return Err(DisputeError::MalformedMessage);
        }

        Ok(Self {
            network_code: network_code.low_u64(),
            number: number.low_u64(),
            hash: H256::from_slice(words[5]),
        })
    }
}

fn word(value: U256) -> [u8; WORD] {
    let mut out = [0u8; WORD];
    value.to_big_endian(&mut out);
    out
}

/// Who delivered a relay message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MessageOrigin {
    /// Immediate caller on this chain.
    pub sender: Address,
    /// Sender on the source chain, as reported by the bridge, if the bridge
    /// reports one.
    pub root_sender: Option<Address>,
}

impl MessageOrigin {
    /// A message delivered by `sender` without a reported source sender.
    pub fn direct(sender: Address) -> Self {
        Self {
            sender,
            root_sender: None,
        }
    }

    /// A message delivered by `sender` on behalf of `root_sender`.
    pub fn bridged(sender: Address, root_sender: Address) -> Self {
        Self {
            sender,
            root_sender: Some(root_sender),
        }
    }
}

/// How a child manager authenticates relay messages.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MessageVerifier {
    /// Polygon's fx portal: delivered by `fx_child` on behalf of `root_tunnel`.
    Polygon {
        /// The fx child contract.
        fx_child: Address,
        /// The root manager on L1.
        root_tunnel: Address,
    },
    /// Optimism's cross domain messenger: delivered by `messenger`, reporting
    /// `root` as the cross domain sender.
    Optimism {
        /// The L2 cross domain messenger.
        messenger: Address,
        /// The root manager on L1.
        root: Address,
    },
    /// Arbitrum retryables: delivered by the aliased address of `root`.
    Arbitrum {
        /// The root manager on L1.
        root: Address,
    },
    /// Hashes set by the owner, for tests and manual relays.
    Direct,
}

impl MessageVerifier {
    fn verify(&self, origin: &MessageOrigin) -> DisputeResult<()> {
        match *self {
            MessageVerifier::Polygon {
                fx_child,
                root_tunnel,
            } => {
                if origin.sender != fx_child {
                    return Err(DisputeError::InvalidSender);
                }
                if origin.root_sender != Some(root_tunnel) {
                    return Err(DisputeError::InvalidSenderFromRoot);
                }
            }
            MessageVerifier::Optimism { messenger, root } => {
                if origin.sender != messenger {
                    return Err(DisputeError::InvalidSender);
                }
                if origin.root_sender != Some(root) {
                    return Err(DisputeError::InvalidSenderFromRoot);
                }
            }
            MessageVerifier::Arbitrum { root } => {
                if origin.sender != apply_l1_to_l2_alias(root) {
                    return Err(DisputeError::InvalidSenderFromRoot);
                }
            }
            MessageVerifier::Direct => return Err(DisputeError::InvalidSender),
        }

        Ok(())
    }

    /// The root manager messages must come from.
    pub fn root(&self) -> Option<Address> {
        match *self {
            MessageVerifier::Polygon { root_tunnel, .. } => Some(root_tunnel),
            MessageVerifier::Optimism { root, .. } | MessageVerifier::Arbitrum { root } => {
                Some(root)
            }
            MessageVerifier::Direct => None,
        }
    }

    fn set_root(&mut self, new_root: Address) {
        match self {
            MessageVerifier::Polygon { root_tunnel, .. } => *root_tunnel = new_root,
            MessageVerifier::Optimism { root, .. } | MessageVerifier::Arbitrum { root } => {
                *root = new_root
            }
            MessageVerifier::Direct => {}
        }
    }
}

/// The receiving end of the relay, and the evaluator's source of block
/// hashes.
#[derive(Clone, Debug)]
pub struct ChildCheckpointManager {
    owner: Address,
    verifier: MessageVerifier,
    hashes: HashMap<(NetworkCode, u64), H256>,
    root_update: PendingChange<Address>,
    update_period: u64,
}

impl ChildCheckpointManager {
    /// A manager owned by `owner`, accepting messages `verifier` accepts.
    pub fn new(
        owner: Address,
        verifier: MessageVerifier,
        update_period: u64,
    ) -> DisputeResult<Self> {
        if verifier.root() == Some(Address::zero()) {
            return Err(DisputeError::InvalidRootCheckpointManager);
        }

        Ok(Self {
            owner,
            verifier,
            hashes: HashMap::new(),
            root_update: PendingChange::default(),
            update_period,
        })
    }

    /// A manager whose hashes are set by `owner` directly.
    pub fn direct(owner: Address) -> Self {
        Self {
            owner,
            verifier: MessageVerifier::Direct,
            hashes: HashMap::new(),
            root_update: PendingChange::default(),
            update_period: 0,
        }
    }

    /// Owner of the manager.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The current message verifier.
    pub fn verifier(&self) -> &MessageVerifier {
        &self.verifier
    }

    /// Authenticates and records a relay message.
    pub fn receive_block_info(
        &mut self,
        origin: &MessageOrigin,
        message: &[u8],
    ) -> DisputeResult<BlockInfo> {
        self.verifier.verify(origin)?;
        let info = BlockInfo::decode(message)?;
        self.store(info)?;

        Ok(info)
    }

    /// Records a hash without a relay message. Owner only.
    pub fn set_block_hash(&mut self, sender: Address, info: BlockInfo) -> DisputeResult<()> {
        if sender != self.owner {
            return Err(DisputeError::Unauthorized);
        }

        self.store(info)
    }

    fn store(&mut self, info: BlockInfo) -> DisputeResult<()> {
        if info.hash.is_zero() {
            return Err(DisputeError::InvalidBlockHash);
        }

        info!(
            "Recorded hash {:x} of block {} on network {}",
            info.hash, info.number, info.network_code
        );
        self.hashes.insert((info.network_code, info.number), info.hash);

        Ok(())
    }

    /// Proposes a new root manager. Owner only.
    pub fn execute_root_update(
        &mut self,
        sender: Address,
        now: u64,
        new_root: Address,
    ) -> DisputeResult<()> {
        if sender != self.owner {
            return Err(DisputeError::Unauthorized);
        }
        if new_root.is_zero() {
            return Err(DisputeError::InvalidRootCheckpointManager);
        }

        self.root_update.propose(new_root, now, self.update_period);
        Ok(())
    }

    /// The pending root manager and the time it becomes applicable.
    pub fn pending_root_update(&self) -> Option<(&Address, u64)> {
        self.root_update.pending()
    }

    /// Applies the pending root manager. Owner only.
    pub fn finalize_root_update(&mut self, sender: Address, now: u64) -> DisputeResult<Address> {
        if sender != self.owner {
            return Err(DisputeError::Unauthorized);
        }

        let new_root = self
            .root_update
            .commit_if_due(now)
            .ok_or(DisputeError::OngoingUpdatePeriod)?;
        self.verifier.set_root(new_root);

        debug!("Root checkpoint manager is now {:x}", new_root);
        Ok(new_root)
    }
}

impl BlockHashSource for ChildCheckpointManager {
    fn get_block_hash(&self, chain: NetworkCode, number: u64) -> Option<H256> {
        self.hashes.get(&(chain, number)).copied()
    }
}

/// The sending end of the relay, on the chain whose blocks are relayed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RootCheckpointManager {
    network_code: NetworkCode,
}

impl RootCheckpointManager {
    /// A manager relaying blocks of `network_code`.
    pub fn new(network_code: NetworkCode) -> Self {
        Self { network_code }
    }

    /// The message announcing `hash` as the hash of block `number`.
    pub fn send_block_info(&self, number: u64, hash: H256) -> DisputeResult<Vec<u8>> {
        if hash.is_zero() {
            return Err(DisputeError::InvalidBlockHash);
        }

        Ok(BlockInfo {
            network_code: self.network_code,
            number,
            hash,
        }
        .encode())
    }
}
