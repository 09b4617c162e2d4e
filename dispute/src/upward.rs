//! Upward trades: value sent to the relayer on the source chain, paid out by
//! the relayer here.
//!
//! The user starts an upward trade with a plain transfer to the relayer on
//! the source chain whose value ends in this chain's network code. The relayer
//! accepts it by paying out the value minus its fee, within the upward slash
//! start period. Past that period anyone holding the evidence may slash the
//! relayer's bond instead.

use std::collections::HashSet;

use bridge_common::{
    network::Network,
    trade::{Trade, TradeStatus},
    UPWARD_DEST_CODE_MODULUS,
};
use ethereum_types::{Address, H256, U256};
use evidence_verifier::{
    decode_raw_tx, recover_address, tx_hash, AmountRule, Evidence, EvidenceError,
    EvidenceEvaluator, ExpectedTransfer, TokenAddresses, Transfer,
};
use log::{debug, info};

use crate::{
    context::CallContext,
    error::{DisputeError, DisputeResult},
    events::BridgeEvent,
    ledger::TradeLedger,
};

/// What an upward transfer's evidence shows, before any check of its
/// inclusion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct UpwardTransfer {
    tx_hash: H256,
    user: Address,
    token: Option<Address>,
    value: U256,
    gas_price: U256,
    block_timestamp: u64,
}

impl TradeLedger {
    fn read_upward_transfer(
        &self,
        token_type_index: u8,
        evidence: &Evidence,
    ) -> DisputeResult<UpwardTransfer> {
        let limits = self.params.trade_params(token_type_index)?;

        let tx_hash = tx_hash(&evidence.transaction);
        if self.used_tx_hashes.contains(&tx_hash) {
            return Err(DisputeError::NotUniqueHashedEvidence);
        }

        let fields = decode_raw_tx(&evidence.transaction)?;
        let user = recover_address(&fields)?;

        let source = self.params.upward_source_code;
        let transfer = match self.params.pays_native(source, token_type_index) {
            true => Transfer::native(&fields)?,
            false => {
                let transfer = Transfer::erc20(&fields)?;
                if transfer.token() != self.params.token_address(source, token_type_index) {
                    return Err(DisputeError::InvalidTokenAddress);
                }
                transfer
            }
        };

        if transfer.to() != self.relayer {
            return Err(DisputeError::InvalidRelayer);
        }

        let value = transfer.value();
        if value % U256::from(UPWARD_DEST_CODE_MODULUS) != U256::from(self.params.network_code) {
            return Err(DisputeError::InvalidNetworkId);
        }
        limits.check_amount(value, DisputeError::AmountTooBig)?;

        let block_timestamp = evidence
            .header()
            .and_then(|header| header.timestamp())
            .map_err(EvidenceError::from)?;

        Ok(UpwardTransfer {
            tx_hash,
            user,
            token: transfer.token(),
            value,
            gas_price: fields.gas_price()?,
            block_timestamp,
        })
    }

    fn upward_deadline(&self, transfer: &UpwardTransfer) -> u64 {
        transfer
            .block_timestamp
            .saturating_add(self.params.periods.upward_slash_start)
    }

    fn upward_trade(
        &self,
        ctx: &CallContext,
        token_type_index: u8,
        transfer: &UpwardTransfer,
        fee: U256,
        status: TradeStatus,
    ) -> Trade {
        Trade {
            index: 0,
            user: transfer.user,
            token_type_index,
            amount: transfer.value,
            timestamp: ctx.timestamp,
            to: transfer.user,
            relayer: self.relayer,
            status,
            fee,
            dest_code: self.params.network_code,
            is_upward: true,
        }
    }

    /// Pays out the upward transfer proven by `evidence`, minus the relayer
    /// fee for its gas price, and records it as a paid trade.
    ///
    /// Returns the trade's index in the user's list.
    pub fn accept_upward_trade(
        &mut self,
        ctx: &CallContext,
        token_type_index: u8,
        evidence: &Evidence,
    ) -> DisputeResult<u64> {
        let indexes =
            self.bulk_accept_upward_trade(ctx, token_type_index, std::slice::from_ref(evidence))?;

        Ok(indexes[0])
    }

    /// [`Self::accept_upward_trade`] for several transfers, all or none.
    ///
    /// The attached value must cover every payout of a native token. The
    /// surplus is returned to the relayer.
    pub fn bulk_accept_upward_trade(
        &mut self,
        ctx: &CallContext,
        token_type_index: u8,
        evidences: &[Evidence],
    ) -> DisputeResult<Vec<u64>> {
        self.only_relayer(ctx)?;

        let mut transfers = Vec::with_capacity(evidences.len());
        let mut tx_hashes = HashSet::new();
        let mut total = U256::zero();

        for evidence in evidences {
            let transfer = self.read_upward_transfer(token_type_index, evidence)?;

            if !tx_hashes.insert(transfer.tx_hash) {
                return Err(DisputeError::NotUniqueHashedEvidence);
            }
            if ctx.timestamp >= self.upward_deadline(&transfer) {
                return Err(DisputeError::EvidenceExpired);
            }

            let fee = self.params.relayer_fee(token_type_index, transfer.gas_price);
            total = total.saturating_add(transfer.value.saturating_sub(fee));
            transfers.push((transfer, fee));
        }

        let native = self
            .params
            .pays_native(self.params.network_code, token_type_index);
        if native && ctx.value < total {
            return Err(DisputeError::InsufficientMsgValue);
        }

        let mut indexes = Vec::with_capacity(transfers.len());
        for (transfer, fee) in transfers {
            let trade = self.upward_trade(ctx, token_type_index, &transfer, fee, TradeStatus::Paid);
            let index = self.push_trade(trade);
            self.used_tx_hashes.insert(transfer.tx_hash);

            debug!(
                "Accepted upward transfer {:x} of {} from {:x}",
                transfer.tx_hash, transfer.value, transfer.user
            );
            self.transfer(
                transfer.user,
                token_type_index,
                transfer.value.saturating_sub(fee),
            );
            self.events.push(BridgeEvent::Accept {
                user: transfer.user,
                index,
                relayer: ctx.sender,
                tx_hash: transfer.tx_hash,
            });
            indexes.push(index);
        }

        if native {
            self.transfer(ctx.sender, token_type_index, ctx.value - total);
        }

        info!(
            "Accepted {} upward transfers from {}",
            indexes.len(),
            Network(self.params.upward_source_code)
        );
        Ok(indexes)
    }

    /// Slashes the relayer for an upward transfer it did not accept in time.
    ///
    /// The evidence must be included in a relayed block of the source chain.
    /// The bond backing the transfer is split between the caller and the
    /// user. Returns the index of the recorded trade in the user's list.
    pub fn slash_upward_trade(
        &mut self,
        ctx: &CallContext,
        token_type_index: u8,
        evidence: &Evidence,
    ) -> DisputeResult<u64> {
        let transfer = self.read_upward_transfer(token_type_index, evidence)?;

        if ctx.timestamp < self.upward_deadline(&transfer) {
            return Err(DisputeError::NotYetAvailableForSlashing);
        }

        let expected = ExpectedTransfer {
            sender: Some(transfer.user),
            to: self.relayer,
            amount: transfer.value,
            token: transfer.token,
            rule: AmountRule::UpwardDigits {
                dest_code: self.params.network_code,
            },
        };
        let valid = EvidenceEvaluator::new(&self.checkpoint, &self.params).check_expected_evidence(
            self.params.upward_source_code,
            &expected,
            evidence,
        )?;
        if !valid {
            return Err(DisputeError::InvalidEvidence);
        }

        let required = self.params.required_bond(token_type_index, transfer.value)?;
        let half = required.min(self.bonds.balance(token_type_index)) / 2;
        self.bonds.slash(token_type_index, half * 2);

        let trade = self.upward_trade(
            ctx,
            token_type_index,
            &transfer,
            U256::zero(),
            TradeStatus::SlashCompleted,
        );
        let index = self.push_trade(trade);
        self.used_tx_hashes.insert(transfer.tx_hash);

        self.transfer(ctx.sender, token_type_index, half);
        self.transfer(transfer.user, token_type_index, half);

        info!(
            "Slashed {} of relayer {:x} for upward transfer {:x}",
            half * 2,
            self.relayer,
            transfer.tx_hash
        );
        self.events.push(BridgeEvent::UpwardSlash {
            user: transfer.user,
            index,
            slasher: ctx.sender,
        });
        Ok(index)
    }
}
