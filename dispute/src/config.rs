//! Deployment configuration, read from JSON.

use std::io::Read;

use ethereum_types::Address;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    checkpoint::{ChildCheckpointManager, MessageVerifier},
    error::DisputeError,
    ledger::TradeLedger,
    params::Parameters,
};

/// Errors raised while loading a [`BridgeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON does not describe a configuration. The path points at the
    /// offending field.
    #[error("invalid config at {}: {}", .0.path(), .0.inner())]
    Json(#[from] serde_path_to_error::Error<serde_json::Error>),

    /// The configuration was read but cannot be deployed.
    #[error(transparent)]
    Invalid(#[from] DisputeError),
}

/// Everything needed to start a [`TradeLedger`].
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// The relayer serving the ledger.
    pub relayer: Address,

    /// Owner of the checkpoint manager. Defaults to the relayer.
    #[serde(default)]
    pub checkpoint_owner: Option<Address>,

    /// How relayed block hashes are authenticated.
    #[serde(default = "direct_verifier")]
    pub checkpoint_verifier: MessageVerifier,

    /// Trade, network and token parameters.
    #[serde(default)]
    pub parameters: Parameters,
}

fn direct_verifier() -> MessageVerifier {
    MessageVerifier::Direct
}

impl BridgeConfig {
    /// Reads a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let des = &mut serde_json::Deserializer::from_str(json);
        Ok(serde_path_to_error::deserialize(des)?)
    }

    /// Reads a configuration from a JSON stream.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let des = &mut serde_json::Deserializer::from_reader(reader);
        Ok(serde_path_to_error::deserialize(des)?)
    }

    /// The checkpoint manager this configuration describes.
    pub fn checkpoint_manager(&self) -> Result<ChildCheckpointManager, ConfigError> {
        let owner = self.checkpoint_owner.unwrap_or(self.relayer);

        Ok(match self.checkpoint_verifier {
            MessageVerifier::Direct => ChildCheckpointManager::direct(owner),
            verifier => {
                ChildCheckpointManager::new(owner, verifier, self.parameters.periods.update)?
            }
        })
    }

    /// Starts a ledger with this configuration.
    pub fn into_ledger(self) -> Result<TradeLedger, ConfigError> {
        let checkpoint = self.checkpoint_manager()?;
        info!(
            "Loaded config for relayer {:x} with {:?} checkpoints",
            self.relayer,
            self.checkpoint_verifier
        );

        Ok(TradeLedger::new(self.relayer, self.parameters, checkpoint))
    }
}
