use std::{fs::File, path::Path};

use anyhow::{bail, Context, Result};
use bridge_common::{network::Network, trade::Trade};
use clap::Parser;
use dispute_manager::{BridgeConfig, Parameters};
use dotenvy::dotenv;
use evidence_verifier::{
    decode_raw_tx, recover_address, tx_hash, verify_block_header, Evidence, EvidenceEvaluator,
    InMemoryBlockHashes,
};
use serde::de::DeserializeOwned;
use serde_json::Deserializer;
use tracing::{error, info, warn};

mod cli;
mod init;

fn main() -> Result<()> {
    dotenv().ok();
    init::tracing();

    let args = cli::Cli::parse();

    match args.command {
        cli::Command::Header { file } => {
            // Evidences are serialized as a vector to match the relayer's output.
            let evidences: Vec<Evidence> = read_json(&file)?;

            let rejected = evidences
                .iter()
                .filter(|evidence| {
                    let fields = match evidence.raw_block_header.list() {
                        Ok(fields) => fields,
                        Err(e) => {
                            error!("Block {} has no header field list: {e}", evidence.block_number);
                            return true;
                        }
                    };

                    let valid = verify_block_header(evidence.block_hash, fields);
                    if !valid {
                        warn!(
                            "Header of block {} does not hash to {:x}",
                            evidence.block_number, evidence.block_hash
                        );
                    }
                    !valid
                })
                .count();

            if rejected > 0 {
                bail!("{rejected} of {} headers rejected", evidences.len());
            }
            info!("All {} headers verified successfully!", evidences.len());
        }
        cli::Command::Evidence {
            file,
            trade,
            trusted_hash,
            config,
        } => {
            let evidence: Evidence = read_json(&file)?;
            let trade: Trade = read_json(&trade)?;
            let parameters = match config {
                Some(path) => load_config(&path)?.parameters,
                None => Parameters::default(),
            };

            let mut block_hashes = InMemoryBlockHashes::new();
            block_hashes.insert(trade.dest_code, evidence.block_number, trusted_hash);

            let valid = EvidenceEvaluator::new(block_hashes, &parameters)
                .check_evidence(&trade, &evidence)
                .context("Failed to evaluate evidence")?;

            if !valid {
                bail!(
                    "Evidence does not prove trade {} of {:x} on {}",
                    trade.index,
                    trade.user,
                    Network(trade.dest_code)
                );
            }
            info!(
                "Evidence proves trade {} of {:x} on {}",
                trade.index,
                trade.user,
                Network(trade.dest_code)
            );
        }
        cli::Command::Tx { raw } => {
            let bytes = hex::decode(raw.trim().trim_start_matches("0x"))
                .context("Transaction is not valid hex")?;
            let fields = decode_raw_tx(&bytes).context("Failed to decode transaction")?;
            let sender = recover_address(&fields).context("Failed to recover the sender")?;

            println!("type:   {}", fields.tx_type());
            println!("hash:   {:x}", tx_hash(&bytes));
            println!("from:   {:x}", sender);
            match fields.to()? {
                Some(to) => println!("to:     {:x}", to),
                None => println!("to:     (contract creation)"),
            }
            println!("value:  {}", fields.value()?);
        }
    };

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let des = &mut Deserializer::from_reader(&file);

    serde_path_to_error::deserialize(des)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn load_config(path: &Path) -> Result<BridgeConfig> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    BridgeConfig::from_reader(&file).with_context(|| format!("Failed to parse {}", path.display()))
}
