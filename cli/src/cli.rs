use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};
use ethereum_types::H256;

#[derive(Parser)]
#[command(version, about)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Checks that the header of each evidence hashes to its block hash.
    Header {
        /// JSON array of evidences
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Evaluates an evidence against a trade, trusting one block hash.
    Evidence {
        /// JSON evidence
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// JSON trade the evidence should prove
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        trade: PathBuf,
        /// Hash of the evidence's block, as relayed
        #[arg(long, env = "EVIDENCE_TRUSTED_HASH")]
        trusted_hash: H256,
        /// Bridge config holding the token addresses of non-native trades
        #[arg(short, long, env = "BRIDGE_CONFIG", value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
    },
    /// Decodes a signed transaction and recovers its sender.
    Tx {
        /// Hex encoded transaction as broadcast
        #[arg(short, long)]
        raw: String,
    },
}
