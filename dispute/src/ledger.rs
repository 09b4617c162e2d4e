//! The trade ledger and its dispute/slash state machine.
//!
//! ```text
//! START -> PAID -> DISPUTE -> PROVED
//!                          -> SLASHED -> SLASH_COMPLETED
//!                  DISPUTE  -----------> SLASH_COMPLETED   (defence period over)
//! START -> CANCEL
//! ```
//!
//! Every operation validates all of its inputs before mutating anything, so a
//! rejected call, bulk calls included, leaves the ledger untouched. Value
//! leaving the ledger is reported as [`BridgeEvent::Transferred`].

use std::collections::{HashMap, HashSet};

use bridge_common::{
    network::{Network, NetworkCode},
    trade::{Dispute, Trade, TradeStatus},
    NATIVE_TOKEN_INDEX,
};
use ethereum_types::{Address, H256, U256};
use evidence_verifier::{hash_evidence, tx_hash, Evidence, EvidenceEvaluator, TokenAddresses};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    bond::{BondManager, BondWithdrawal},
    checkpoint::{BlockInfo, ChildCheckpointManager, MessageOrigin},
    context::CallContext,
    error::{DisputeError, DisputeResult},
    events::BridgeEvent,
    params::{FeeList, NetworkOperation, Parameters, TradeParamUpdate},
    pending::PendingChange,
};

/// Longest reason a relayer may give for cancelling a trade.
pub const MAX_CANCEL_REASON_LEN: usize = 100;

/// Position of a trade: its owner and its index in the owner's list.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTrade {
    /// Trade owner.
    pub user_address: Address,
    /// Index in the owner's trade list.
    pub index: u64,
}

impl UserTrade {
    /// The trade `index` of `user_address`.
    pub fn new(user_address: Address, index: u64) -> Self {
        Self {
            user_address,
            index,
        }
    }
}

/// What a relayer commits to when withdrawing a trade: the payment
/// transaction, and the evidence it will reveal if disputed.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceCommitment {
    /// Hash of the signed payment transaction.
    pub tx_hash: H256,
    /// [`hash_evidence`] of the evidence.
    pub evidence_hash: H256,
}

impl EvidenceCommitment {
    /// The commitment to `evidence`.
    pub fn of(evidence: &Evidence) -> Self {
        Self {
            tx_hash: tx_hash(&evidence.transaction),
            evidence_hash: hash_evidence(evidence),
        }
    }
}

/// A withdrawal in a bulk call.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    /// Trade to withdraw.
    pub trade: UserTrade,
    /// Commitment to its payment.
    pub commitment: EvidenceCommitment,
}

/// Escrowed trades, the relayer's bond, and the rules between them.
#[derive(Clone, Debug)]
pub struct TradeLedger {
    pub(crate) relayer: Address,
    pub(crate) is_active: bool,
    pub(crate) params: Parameters,
    pub(crate) bonds: BondManager,
    pub(crate) checkpoint: ChildCheckpointManager,
    pub(crate) trades: HashMap<Address, Vec<Trade>>,
    pub(crate) user_trade_list: Vec<UserTrade>,
    pub(crate) disputes: HashMap<UserTrade, Dispute>,
    pub(crate) hashed_evidences: HashMap<UserTrade, EvidenceCommitment>,
    pub(crate) used_tx_hashes: HashSet<H256>,
    pub(crate) relayer_update: PendingChange<Address>,
    pub(crate) events: Vec<BridgeEvent>,
}

impl TradeLedger {
    /// An active ledger served by `relayer`, reading block hashes from
    /// `checkpoint`.
    pub fn new(relayer: Address, params: Parameters, checkpoint: ChildCheckpointManager) -> Self {
        info!(
            "Starting ledger on {} with relayer {:x}",
            Network(params.network_code),
            relayer
        );

        Self {
            relayer,
            is_active: true,
            params,
            bonds: BondManager::new(),
            checkpoint,
            trades: HashMap::new(),
            user_trade_list: Vec::new(),
            disputes: HashMap::new(),
            hashed_evidences: HashMap::new(),
            used_tx_hashes: HashSet::new(),
            relayer_update: PendingChange::default(),
            events: Vec::new(),
        }
    }

    /// The relayer.
    pub fn relayer(&self) -> Address {
        self.relayer
    }

    /// Whether new trades are accepted.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// The current parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// The relayer's bond.
    pub fn bonds(&self) -> &BondManager {
        &self.bonds
    }

    /// The block hash store.
    pub fn checkpoint(&self) -> &ChildCheckpointManager {
        &self.checkpoint
    }

    /// Events emitted so far.
    pub fn events(&self) -> &[BridgeEvent] {
        &self.events
    }

    /// Takes the events emitted so far.
    pub fn drain_events(&mut self) -> Vec<BridgeEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn only_relayer(&self, ctx: &CallContext) -> DisputeResult<()> {
        match ctx.sender == self.relayer {
            true => Ok(()),
            false => Err(DisputeError::OnlyForRelayer),
        }
    }

    pub(crate) fn transfer(&mut self, to: Address, token_type_index: u8, amount: U256) {
        if amount.is_zero() {
            return;
        }

        self.events.push(BridgeEvent::Transferred {
            to,
            token_type_index,
            amount,
        });
    }

    pub(crate) fn push_trade(&mut self, mut trade: Trade) -> u64 {
        let trades = self.trades.entry(trade.user).or_default();
        let index = trades.len() as u64;

        trade.index = index;
        self.user_trade_list.push(UserTrade::new(trade.user, index));
        trades.push(trade);

        index
    }

    fn trade_mut(&mut self, user: Address, index: u64) -> DisputeResult<&mut Trade> {
        self.trades
            .get_mut(&user)
            .and_then(|trades| trades.get_mut(index as usize))
            .ok_or(DisputeError::NoTrade)
    }

    // Trades.

    /// Escrows `amount` for delivery of `amount - fee` to `to` on `dest_code`.
    /// Returns the trade's index in the caller's list.
    pub fn new_trade(
        &mut self,
        ctx: &CallContext,
        amount: U256,
        to: Address,
        fee: U256,
        token_type_index: u8,
        dest_code: NetworkCode,
    ) -> DisputeResult<u64> {
        if !self.is_active {
            return Err(DisputeError::ContractNotActive);
        }

        let limits = self.params.trade_params(token_type_index)?;
        if !self.params.is_available_network(dest_code) {
            return Err(DisputeError::UnavailableDestCode);
        }
        limits.check_amount(amount, DisputeError::ExceedExchangeableLimit)?;

        if self
            .params
            .pays_native(self.params.network_code, token_type_index)
        {
            if ctx.value < amount {
                return Err(DisputeError::InsufficientMsgValue);
            }
        } else if self
            .params
            .token_address(self.params.network_code, token_type_index)
            .is_none()
        {
            return Err(DisputeError::InvalidTokenIndex);
        }

        let index = self.push_trade(Trade {
            index: 0,
            user: ctx.sender,
            token_type_index,
            amount,
            timestamp: ctx.timestamp,
            to,
            relayer: Address::zero(),
            status: TradeStatus::Start,
            fee,
            dest_code,
            is_upward: false,
        });

        debug!(
            "New trade {} of {:x}: {} of token {} to {}",
            index,
            ctx.sender,
            amount,
            token_type_index,
            Network(dest_code)
        );
        self.events.push(BridgeEvent::NewTrade {
            user: ctx.sender,
            index,
        });

        Ok(index)
    }

    /// Releases a started trade's escrow to the relayer, who commits to the
    /// transaction that paid it.
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        user: Address,
        index: u64,
        commitment: EvidenceCommitment,
    ) -> DisputeResult<()> {
        self.bulk_withdraw(
            ctx,
            &[WithdrawRequest {
                trade: UserTrade::new(user, index),
                commitment,
            }],
        )
    }

    /// [`Self::withdraw`] for several trades, all or none.
    pub fn bulk_withdraw(
        &mut self,
        ctx: &CallContext,
        requests: &[WithdrawRequest],
    ) -> DisputeResult<()> {
        self.only_relayer(ctx)?;

        let mut tx_hashes = HashSet::new();
        let mut seen = HashSet::new();
        for request in requests {
            let trade = self.get_trade(request.trade.user_address, request.trade.index)?;

            if trade.status != TradeStatus::Start || !seen.insert(request.trade) {
                return Err(DisputeError::OnlyForStartTrade);
            }
            if ctx.timestamp > trade.timestamp.saturating_add(self.params.periods.withdrawal) {
                return Err(DisputeError::OnlyForWithdrawalPeriod);
            }

            let required = self
                .params
                .required_bond(trade.token_type_index, trade.amount)?;
            if !self.bonds.covers(trade.token_type_index, required) {
                return Err(DisputeError::InsufficientBondAmount);
            }

            if self.used_tx_hashes.contains(&request.commitment.tx_hash)
                || !tx_hashes.insert(request.commitment.tx_hash)
            {
                return Err(DisputeError::NotUniqueHashedEvidence);
            }
        }

        for request in requests {
            let UserTrade {
                user_address: user,
                index,
            } = request.trade;

            let trade = self.trade_mut(user, index)?;
            trade.status = TradeStatus::Paid;
            trade.relayer = ctx.sender;
            trade.timestamp = ctx.timestamp;
            let (token, amount) = (trade.token_type_index, trade.amount);

            self.used_tx_hashes.insert(request.commitment.tx_hash);
            self.hashed_evidences
                .insert(request.trade, request.commitment);

            self.transfer(ctx.sender, token, amount);
            self.events.push(BridgeEvent::Withdraw {
                user,
                index,
                hashed_evidence: request.commitment.evidence_hash,
            });
        }

        info!("Relayer withdrew {} trades", requests.len());
        Ok(())
    }

    /// Refunds a started trade to its owner once the cancel period passed.
    pub fn cancel_trade(&mut self, ctx: &CallContext, index: u64) -> DisputeResult<()> {
        let trade = self.get_trade(ctx.sender, index)?;

        if trade.status != TradeStatus::Start {
            return Err(DisputeError::OnlyForStartStatus);
        }
        if ctx.timestamp < trade.timestamp.saturating_add(self.params.periods.cancel) {
            return Err(DisputeError::AfterCancelPeriod);
        }

        self.refund(ctx.sender, index, String::new())
    }

    /// Refunds a started trade on the relayer's initiative.
    pub fn cancel_trade_by_relayer(
        &mut self,
        ctx: &CallContext,
        user: Address,
        index: u64,
        reason: &str,
    ) -> DisputeResult<()> {
        self.only_relayer(ctx)?;
        if reason.chars().count() > MAX_CANCEL_REASON_LEN {
            return Err(DisputeError::TooLongReason);
        }
        if self.get_trade(user, index)?.status != TradeStatus::Start {
            return Err(DisputeError::OnlyForStartStatus);
        }

        self.refund(user, index, reason.to_owned())
    }

    fn refund(&mut self, user: Address, index: u64, reason: String) -> DisputeResult<()> {
        let trade = self.trade_mut(user, index)?;
        trade.status = TradeStatus::Cancel;
        let (token, amount) = (trade.token_type_index, trade.amount);

        self.transfer(user, token, amount);
        self.events
            .push(BridgeEvent::Cancel { user, index, reason });

        Ok(())
    }

    // Disputes.

    /// Challenges the payment of a paid trade with a deposit of `amount` in
    /// the native token.
    pub fn dispute(
        &mut self,
        ctx: &CallContext,
        token_type_index: u8,
        amount: U256,
        user: Address,
        index: u64,
    ) -> DisputeResult<()> {
        let trade = self.get_trade(user, index)?;

        if trade.status != TradeStatus::Paid {
            return Err(DisputeError::OnlyForPaidStatus);
        }
        if !self.params.is_slashable_network(trade.dest_code) {
            return Err(DisputeError::UnavailableDestCode);
        }
        if ctx.timestamp > trade.timestamp.saturating_add(self.params.periods.disputable) {
            return Err(DisputeError::NotInDisputablePeriod);
        }
        if token_type_index != NATIVE_TOKEN_INDEX {
            return Err(DisputeError::InvalidTokenTypeIndex);
        }
        if amount < self.params.trade_params(NATIVE_TOKEN_INDEX)?.dispute_deposit_amount {
            return Err(DisputeError::AmountTooLow);
        }
        if ctx.value < amount {
            return Err(DisputeError::InsufficientMsgValue);
        }

        let key = UserTrade::new(user, index);
        self.trade_mut(user, index)?.status = TradeStatus::Dispute;
        self.disputes.insert(
            key,
            Dispute {
                disputer: ctx.sender,
                token_type_index,
                deposit: amount,
                dispute_timestamp: ctx.timestamp,
            },
        );

        info!("Trade {} of {:x} disputed by {:x}", index, user, ctx.sender);
        self.events.push(BridgeEvent::Dispute { user, index });
        Ok(())
    }

    /// Reveals the committed evidence of a disputed trade.
    ///
    /// The evidence must hash to the committed evidence hash, and its
    /// transaction to the committed transaction hash.
    /// Valid evidence proves the trade and hands the deposit to the relayer.
    /// Anything else marks the trade slashed. Fails without a verdict when the
    /// evidence's block hash was not relayed yet.
    pub fn defence(
        &mut self,
        ctx: &CallContext,
        user: Address,
        index: u64,
        evidence: &Evidence,
    ) -> DisputeResult<TradeStatus> {
        self.only_relayer(ctx)?;

        let key = UserTrade::new(user, index);
        let trade = self.get_trade(user, index)?;
        if trade.status != TradeStatus::Dispute {
            return Err(DisputeError::OnlyForDisputeStatus);
        }
        let revealed = EvidenceCommitment::of(evidence);
        if self.hashed_evidences.get(&key) != Some(&revealed) {
            return Err(DisputeError::WrongEvidence);
        }

        let valid =
            EvidenceEvaluator::new(&self.checkpoint, &self.params).check_evidence(trade, evidence)?;

        let status = match valid {
            true => TradeStatus::Proved,
            false => {
                warn!("Evidence for trade {} of {:x} is invalid", index, user);
                TradeStatus::Slashed
            }
        };

        self.trade_mut(user, index)?.status = status;
        if status == TradeStatus::Proved {
            if let Some(dispute) = self.disputes.remove(&key) {
                self.transfer(ctx.sender, dispute.token_type_index, dispute.deposit);
            }
        }

        self.events
            .push(BridgeEvent::Defence { user, index, status });
        Ok(status)
    }

    /// Slashes the relayer's bond for a trade that failed its defence, or
    /// whose defence period passed without one. Disputer only.
    ///
    /// The bond backing the trade is split between the disputer, who also
    /// gets the deposit back, and the user.
    pub fn slash(&mut self, ctx: &CallContext, user: Address, index: u64) -> DisputeResult<()> {
        let key = UserTrade::new(user, index);
        let trade = self.get_trade(user, index)?;
        let dispute = self
            .disputes
            .get(&key)
            .cloned()
            .ok_or(DisputeError::NotYetSlashed)?;

        if dispute.disputer != ctx.sender {
            return Err(DisputeError::OnlyForDisputer);
        }

        let defence_over = ctx.timestamp
            > dispute
                .dispute_timestamp
                .saturating_add(self.params.periods.defence);
        match trade.status {
            TradeStatus::Slashed => {}
            TradeStatus::Dispute if defence_over => {}
            _ => return Err(DisputeError::NotYetSlashed),
        }

        let (token, relayer) = (trade.token_type_index, trade.relayer);
        let required = self.params.required_bond(token, trade.amount)?;
        let half = required.min(self.bonds.balance(token)) / 2;

        self.bonds.slash(token, half * 2);
        self.trade_mut(user, index)?.status = TradeStatus::SlashCompleted;
        self.disputes.remove(&key);

        self.transfer(ctx.sender, dispute.token_type_index, dispute.deposit);
        self.transfer(ctx.sender, token, half);
        self.transfer(user, token, half);

        info!(
            "Slashed {} of relayer {:x} for trade {} of {:x}",
            half * 2,
            relayer,
            index,
            user
        );
        self.events.push(BridgeEvent::Slash {
            user,
            index,
            relayer,
        });
        Ok(())
    }

    // Queries.

    /// Trade `index` of `user`.
    pub fn get_trade(&self, user: Address, index: u64) -> DisputeResult<&Trade> {
        self.trades
            .get(&user)
            .and_then(|trades| trades.get(index as usize))
            .ok_or(DisputeError::NoTrade)
    }

    /// The trades at `positions`.
    pub fn get_trades(&self, positions: &[UserTrade]) -> DisputeResult<Vec<Trade>> {
        positions
            .iter()
            .map(|p| self.get_trade(p.user_address, p.index).cloned())
            .collect()
    }

    /// Number of trades of `user`.
    pub fn get_trade_length(&self, user: Address) -> usize {
        self.trades.get(&user).map_or(0, Vec::len)
    }

    /// Trades `start..=end` of `user`, or all of them if both are zero.
    pub fn get_trade_list(&self, user: Address, start: u64, end: u64) -> DisputeResult<Vec<Trade>> {
        let trades = self.trades.get(&user).map(Vec::as_slice).unwrap_or_default();

        if start == 0 && end == 0 {
            return Ok(trades.to_vec());
        }

        Ok(inclusive_range(trades, start, end)?.to_vec())
    }

    /// Number of trades ever recorded.
    pub fn get_user_trade_list_length(&self) -> usize {
        self.user_trade_list.len()
    }

    /// Positions `start..=end` of all trades, in recording order.
    pub fn get_user_trade_list_by_index(
        &self,
        start: u64,
        end: u64,
    ) -> DisputeResult<Vec<UserTrade>> {
        Ok(inclusive_range(&self.user_trade_list, start, end)?.to_vec())
    }

    /// The open dispute of trade `index` of `user`, if any.
    pub fn get_dispute(&self, user: Address, index: u64) -> Option<&Dispute> {
        self.disputes.get(&UserTrade::new(user, index))
    }

    /// The evidence hash committed for trade `index` of `user`, if any.
    pub fn get_hashed_evidence(&self, user: Address, index: u64) -> Option<H256> {
        self.hashed_evidences
            .get(&UserTrade::new(user, index))
            .map(|commitment| commitment.evidence_hash)
    }

    /// Whether the transaction with `tx_hash` was already used as evidence.
    pub fn is_used_tx_hash(&self, tx_hash: &H256) -> bool {
        self.used_tx_hashes.contains(tx_hash)
    }

    /// Bond backing a trade of `amount` in `token_type_index`.
    pub fn get_required_bond_amount(&self, token_type_index: u8, amount: U256) -> DisputeResult<U256> {
        self.params.required_bond(token_type_index, amount)
    }

    // Bonds.

    /// Adds to the relayer's bond.
    pub fn deposit_bond(
        &mut self,
        ctx: &CallContext,
        token_type_index: u8,
        amount: U256,
    ) -> DisputeResult<()> {
        self.only_relayer(ctx)?;
        self.params.trade_params(token_type_index)?;

        let attached = match self
            .params
            .pays_native(self.params.network_code, token_type_index)
        {
            true => ctx.value,
            false => amount,
        };
        self.bonds.deposit(token_type_index, amount, attached)?;

        self.events.push(BridgeEvent::BondDeposited {
            token_type_index,
            amount,
        });
        Ok(())
    }

    /// Requests a bond withdrawal, removing the amount from the bond at once.
    pub fn execute_withdraw_bond(
        &mut self,
        ctx: &CallContext,
        token_type_index: u8,
        amount: U256,
    ) -> DisputeResult<BondWithdrawal> {
        self.only_relayer(ctx)?;

        let withdrawal = self.bonds.execute_withdraw_bond(
            token_type_index,
            amount,
            ctx.timestamp,
            self.params.periods.update,
        )?;

        self.events.push(BridgeEvent::BondWithdrawalRequested {
            token_type_index,
            amount: withdrawal.amount,
            execute_after: withdrawal.execute_after,
        });
        Ok(withdrawal)
    }

    /// Pays out a requested bond withdrawal once due.
    pub fn finalize_withdraw_bond(
        &mut self,
        ctx: &CallContext,
        token_type_index: u8,
    ) -> DisputeResult<U256> {
        self.only_relayer(ctx)?;

        let amount = self
            .bonds
            .finalize_withdraw_bond(token_type_index, ctx.timestamp)?;

        self.transfer(ctx.sender, token_type_index, amount);
        self.events.push(BridgeEvent::BondWithdrawn {
            token_type_index,
            amount,
        });
        Ok(amount)
    }

    // Checkpoints.

    /// Records a relayed block hash.
    pub fn receive_block_info(
        &mut self,
        origin: &MessageOrigin,
        message: &[u8],
    ) -> DisputeResult<BlockInfo> {
        let info = self.checkpoint.receive_block_info(origin, message)?;
        self.push_block_hash_event(info);

        Ok(info)
    }

    /// Records a block hash set by the checkpoint's owner.
    pub fn set_block_hash(&mut self, ctx: &CallContext, info: BlockInfo) -> DisputeResult<()> {
        self.checkpoint.set_block_hash(ctx.sender, info)?;
        self.push_block_hash_event(info);

        Ok(())
    }

    fn push_block_hash_event(&mut self, info: BlockInfo) {
        self.events.push(BridgeEvent::BlockHashReceived {
            chain: info.network_code,
            number: info.number,
            hash: info.hash,
        });
    }

    // Administration.

    /// Pauses or resumes trade creation.
    pub fn toggle_contract_active(&mut self, ctx: &CallContext) -> DisputeResult<bool> {
        if ctx.sender != self.relayer {
            return Err(DisputeError::Unauthorized);
        }

        self.is_active = !self.is_active;
        self.events.push(BridgeEvent::ContractActiveToggled {
            is_active: self.is_active,
        });

        Ok(self.is_active)
    }

    /// Proposes handing the ledger over to `new_relayer`.
    pub fn execute_relayer_update(
        &mut self,
        ctx: &CallContext,
        new_relayer: Address,
    ) -> DisputeResult<()> {
        self.only_relayer(ctx)?;

        self.relayer_update
            .propose(new_relayer, ctx.timestamp, self.params.periods.update);
        self.events.push(BridgeEvent::RelayerUpdate {
            new_relayer,
            finalized: false,
        });
        Ok(())
    }

    /// Completes a proposed handover.
    pub fn finalize_relayer_update(&mut self, ctx: &CallContext) -> DisputeResult<Address> {
        self.only_relayer(ctx)?;

        let new_relayer = self
            .relayer_update
            .commit_if_due(ctx.timestamp)
            .ok_or(DisputeError::OngoingUpdatePeriod)?;
        self.relayer = new_relayer;

        info!("Relayer is now {:x}", new_relayer);
        self.events.push(BridgeEvent::RelayerUpdate {
            new_relayer,
            finalized: true,
        });
        Ok(new_relayer)
    }

    /// Proposes a trade parameter change.
    pub fn execute_trade_param_update(
        &mut self,
        ctx: &CallContext,
        update: TradeParamUpdate,
    ) -> DisputeResult<()> {
        self.only_relayer(ctx)?;
        self.params.execute_trade_param_update(ctx.timestamp, update)?;

        self.events
            .push(BridgeEvent::TradeParamUpdate { finalized: false });
        Ok(())
    }

    /// Applies the pending trade parameter change.
    pub fn finalize_trade_param_update(&mut self, ctx: &CallContext) -> DisputeResult<()> {
        self.only_relayer(ctx)?;
        self.params.finalize_trade_param_update(ctx.timestamp)?;

        self.events
            .push(BridgeEvent::TradeParamUpdate { finalized: true });
        Ok(())
    }

    /// Proposes network setting changes.
    pub fn execute_network_setting_update(
        &mut self,
        ctx: &CallContext,
        operations: &[NetworkOperation],
        network_codes: &[NetworkCode],
        native_is_not_eth: &[bool],
    ) -> DisputeResult<()> {
        self.only_relayer(ctx)?;
        self.params.execute_network_setting_update(
            ctx.timestamp,
            operations,
            network_codes,
            native_is_not_eth,
        )?;

        self.events
            .push(BridgeEvent::NetworkSettingUpdate { finalized: false });
        Ok(())
    }

    /// Applies the pending network setting changes.
    pub fn finalize_network_setting_update(&mut self, ctx: &CallContext) -> DisputeResult<()> {
        self.only_relayer(ctx)?;
        self.params.finalize_network_setting_update(ctx.timestamp)?;

        self.events
            .push(BridgeEvent::NetworkSettingUpdate { finalized: true });
        Ok(())
    }

    /// Proposes token registrations.
    pub fn execute_token_address_update(
        &mut self,
        ctx: &CallContext,
        network_codes: &[NetworkCode],
        token_type_indexes: &[u8],
        token_addresses: &[Address],
    ) -> DisputeResult<()> {
        self.only_relayer(ctx)?;
        self.params.execute_token_address_update(
            ctx.timestamp,
            network_codes,
            token_type_indexes,
            token_addresses,
        )?;

        self.events
            .push(BridgeEvent::TokenAddressUpdate { finalized: false });
        Ok(())
    }

    /// Applies the pending token registrations.
    pub fn finalize_token_address_update(&mut self, ctx: &CallContext) -> DisputeResult<()> {
        self.only_relayer(ctx)?;
        self.params.finalize_token_address_update(ctx.timestamp)?;

        self.events
            .push(BridgeEvent::TokenAddressUpdate { finalized: true });
        Ok(())
    }

    /// Proposes a fee list.
    pub fn execute_fee_list_update(
        &mut self,
        ctx: &CallContext,
        token_type_index: u8,
        fee_list: FeeList,
    ) -> DisputeResult<()> {
        self.only_relayer(ctx)?;
        self.params
            .execute_fee_list_update(ctx.timestamp, token_type_index, fee_list)?;

        self.events
            .push(BridgeEvent::FeeListUpdate { finalized: false });
        Ok(())
    }

    /// Applies the pending fee list.
    pub fn finalize_fee_list_update(&mut self, ctx: &CallContext) -> DisputeResult<()> {
        self.only_relayer(ctx)?;
        self.params.finalize_fee_list_update(ctx.timestamp)?;

        self.events
            .push(BridgeEvent::FeeListUpdate { finalized: true });
        Ok(())
    }
}

/// `items[start..=end]`.
fn inclusive_range<T>(items: &[T], start: u64, end: u64) -> DisputeResult<&[T]> {
    if end >= items.len() as u64 {
        return Err(DisputeError::OutOfBounds);
    }
    if start > end {
        return Err(DisputeError::InvalidRange);
    }

    Ok(&items[start as usize..=end as usize])
}

#[cfg(test)]
mod tests {
    use bridge_common::network::{ETHEREUM, OPTIMISM, POLYGON};
    use evidence_verifier::BlockHashSource;

    use super::*;
    use crate::{
        params::TradeParams,
        testing_utils::{
            account, commitment, empty_evidence, funded_ledger, ledger, open_trade, DISPUTER,
            RELAYER, USER,
        },
    };

    const AMOUNT: u64 = 10_000_000_000_000_000;
    const HOUR: u64 = 60 * 60;

    #[test]
    fn new_trade_is_escrowed() {
        let mut ledger = ledger();
        let ctx = CallContext::new(USER, 100).with_value(AMOUNT);

        let index = ledger
            .new_trade(&ctx, AMOUNT.into(), USER, 1_000.into(), 0, ETHEREUM)
            .unwrap();
        assert_eq!(index, 0);

        let trade = ledger.get_trade(USER, 0).unwrap();
        assert_eq!(trade.status, TradeStatus::Start);
        assert_eq!(trade.amount, U256::from(AMOUNT));
        assert_eq!(trade.timestamp, 100);
        assert_eq!(trade.relayer, Address::zero());
        assert_eq!(
            ledger.events(),
            &[BridgeEvent::NewTrade {
                user: USER,
                index: 0
            }]
        );
    }

    #[test]
    fn new_trade_rejections() {
        let mut ledger = ledger();
        let ctx = CallContext::new(USER, 100).with_value(AMOUNT);
        let threshold = ledger.parameters().trade_params(0).unwrap().trade_threshold;

        assert_eq!(
            ledger.new_trade(&ctx, AMOUNT.into(), USER, 0.into(), 0, 1559),
            Err(DisputeError::UnavailableDestCode)
        );
        assert_eq!(
            ledger.new_trade(&ctx, threshold + 1, USER, 0.into(), 0, ETHEREUM),
            Err(DisputeError::ExceedExchangeableLimit)
        );
        assert_eq!(
            ledger.new_trade(&ctx, 1_000.into(), USER, 0.into(), 0, ETHEREUM),
            Err(DisputeError::AmountTooLow)
        );
        assert_eq!(
            ledger.new_trade(&ctx, AMOUNT.into(), USER, 0.into(), 5, ETHEREUM),
            Err(DisputeError::InvalidTokenIndex)
        );
        assert_eq!(
            ledger.new_trade(
                &ctx.with_value(AMOUNT - 1),
                AMOUNT.into(),
                USER,
                0.into(),
                0,
                ETHEREUM
            ),
            Err(DisputeError::InsufficientMsgValue)
        );

        ledger
            .toggle_contract_active(&CallContext::new(RELAYER, 0))
            .unwrap();
        assert_eq!(
            ledger.new_trade(&ctx, AMOUNT.into(), USER, 0.into(), 0, ETHEREUM),
            Err(DisputeError::ContractNotActive)
        );
        assert_eq!(ledger.get_trade_length(USER), 0);
    }

    #[test]
    fn withdraw_releases_escrow() {
        let mut ledger = funded_ledger();
        open_trade(&mut ledger, USER, AMOUNT, 100);
        let relayer = CallContext::new(RELAYER, 200);

        assert_eq!(
            ledger.withdraw(&CallContext::new(USER, 200), USER, 0, commitment(1)),
            Err(DisputeError::OnlyForRelayer)
        );
        assert_eq!(
            ledger.withdraw(&relayer, USER, 1, commitment(1)),
            Err(DisputeError::NoTrade)
        );

        ledger.withdraw(&relayer, USER, 0, commitment(1)).unwrap();

        let trade = ledger.get_trade(USER, 0).unwrap();
        assert_eq!(trade.status, TradeStatus::Paid);
        assert_eq!(trade.relayer, RELAYER);
        assert_eq!(trade.timestamp, 200);
        assert_eq!(
            ledger.get_hashed_evidence(USER, 0),
            Some(commitment(1).evidence_hash)
        );
        assert!(ledger.is_used_tx_hash(&commitment(1).tx_hash));
        assert!(ledger.events().contains(&BridgeEvent::Transferred {
            to: RELAYER,
            token_type_index: 0,
            amount: AMOUNT.into(),
        }));

        assert_eq!(
            ledger.withdraw(&relayer, USER, 0, commitment(2)),
            Err(DisputeError::OnlyForStartTrade)
        );
    }

    #[test]
    fn withdraw_rejections() {
        let mut ledger = funded_ledger();
        open_trade(&mut ledger, USER, AMOUNT, 100);
        open_trade(&mut ledger, USER, AMOUNT, 100);
        let relayer = CallContext::new(RELAYER, 100 + 3 * HOUR);

        assert_eq!(
            ledger.withdraw(&CallContext::new(RELAYER, 101 + 3 * HOUR), USER, 0, commitment(1)),
            Err(DisputeError::OnlyForWithdrawalPeriod)
        );

        ledger.withdraw(&relayer, USER, 0, commitment(1)).unwrap();
        assert_eq!(
            ledger.withdraw(&relayer, USER, 1, commitment(1)),
            Err(DisputeError::NotUniqueHashedEvidence)
        );

        let mut unbonded = ledger_with_bond(U256::from(AMOUNT) * 22 / 10 - 1);
        open_trade(&mut unbonded, USER, AMOUNT, 100);
        assert_eq!(
            unbonded.withdraw(&relayer, USER, 0, commitment(1)),
            Err(DisputeError::InsufficientBondAmount)
        );
    }

    fn ledger_with_bond(bond: U256) -> TradeLedger {
        let mut ledger = ledger();
        ledger
            .deposit_bond(&CallContext::new(RELAYER, 0).with_value(bond), 0, bond)
            .unwrap();
        ledger
    }

    #[test]
    fn bulk_withdraw_is_all_or_nothing() {
        let mut ledger = funded_ledger();
        for _ in 0..3 {
            open_trade(&mut ledger, USER, AMOUNT, 100);
        }
        let relayer = CallContext::new(RELAYER, 200);
        let request = |index, n| WithdrawRequest {
            trade: UserTrade::new(USER, index),
            commitment: commitment(n),
        };

        assert_eq!(
            ledger.bulk_withdraw(&relayer, &[request(0, 1), request(1, 2), request(2, 1)]),
            Err(DisputeError::NotUniqueHashedEvidence)
        );
        assert_eq!(
            ledger.bulk_withdraw(&relayer, &[request(0, 1), request(3, 2)]),
            Err(DisputeError::NoTrade)
        );
        assert!(ledger
            .get_trade_list(USER, 0, 0)
            .unwrap()
            .iter()
            .all(|t| t.status == TradeStatus::Start));

        // One trade withdrawn twice.
        assert_eq!(
            ledger.bulk_withdraw(&relayer, &[request(1, 1), request(1, 2)]),
            Err(DisputeError::OnlyForStartTrade)
        );
        assert!(ledger.events().iter().all(|e| !matches!(e, BridgeEvent::Transferred { .. })));
        assert_eq!(ledger.get_hashed_evidence(USER, 1), None);

        ledger
            .bulk_withdraw(&relayer, &[request(0, 1), request(2, 3)])
            .unwrap();
        assert_eq!(ledger.get_trade(USER, 0).unwrap().status, TradeStatus::Paid);
        assert_eq!(ledger.get_trade(USER, 1).unwrap().status, TradeStatus::Start);
        assert_eq!(ledger.get_trade(USER, 2).unwrap().status, TradeStatus::Paid);
    }

    #[test]
    fn cancel_by_user() {
        let mut ledger = ledger();
        open_trade(&mut ledger, USER, AMOUNT, 100);

        assert_eq!(
            ledger.cancel_trade(&CallContext::new(USER, 100 + HOUR - 1), 0),
            Err(DisputeError::AfterCancelPeriod)
        );
        assert_eq!(
            ledger.cancel_trade(&CallContext::new(DISPUTER, 100 + HOUR), 0),
            Err(DisputeError::NoTrade)
        );

        ledger
            .cancel_trade(&CallContext::new(USER, 100 + HOUR), 0)
            .unwrap();
        assert_eq!(ledger.get_trade(USER, 0).unwrap().status, TradeStatus::Cancel);
        assert_eq!(
            ledger.drain_events()[1..],
            [
                BridgeEvent::Transferred {
                    to: USER,
                    token_type_index: 0,
                    amount: AMOUNT.into(),
                },
                BridgeEvent::Cancel {
                    user: USER,
                    index: 0,
                    reason: String::new(),
                },
            ]
        );

        assert_eq!(
            ledger.cancel_trade(&CallContext::new(USER, 100 + HOUR), 0),
            Err(DisputeError::OnlyForStartStatus)
        );
    }

    #[test]
    fn cancel_by_relayer() {
        let mut ledger = ledger();
        open_trade(&mut ledger, USER, AMOUNT, 100);
        let relayer = CallContext::new(RELAYER, 100);

        assert_eq!(
            ledger.cancel_trade_by_relayer(&CallContext::new(USER, 100), USER, 0, "no"),
            Err(DisputeError::OnlyForRelayer)
        );
        assert_eq!(
            ledger.cancel_trade_by_relayer(&relayer, USER, 0, &"x".repeat(101)),
            Err(DisputeError::TooLongReason)
        );

        ledger
            .cancel_trade_by_relayer(&relayer, USER, 0, &"x".repeat(100))
            .unwrap();
        assert_eq!(ledger.get_trade(USER, 0).unwrap().status, TradeStatus::Cancel);
        assert_eq!(
            ledger.cancel_trade_by_relayer(&relayer, USER, 0, "again"),
            Err(DisputeError::OnlyForStartStatus)
        );
    }

    fn paid_ledger(dest_code: NetworkCode) -> TradeLedger {
        let mut ledger = funded_ledger();
        let ctx = CallContext::new(USER, 100).with_value(AMOUNT);
        ledger
            .new_trade(&ctx, AMOUNT.into(), USER, 0.into(), 0, dest_code)
            .unwrap();
        ledger
            .withdraw(&CallContext::new(RELAYER, 200), USER, 0, commitment(1))
            .unwrap();
        ledger
    }

    fn deposit() -> U256 {
        TradeParams::default().dispute_deposit_amount
    }

    #[test]
    fn dispute_rejections() {
        let mut ledger = paid_ledger(ETHEREUM);
        let ctx = CallContext::new(DISPUTER, 300).with_value(deposit());

        assert_eq!(
            ledger.dispute(&ctx, 0, deposit(), USER, 0),
            Err(DisputeError::UnavailableDestCode)
        );

        let mut ledger = paid_ledger(POLYGON);
        assert_eq!(
            ledger.dispute(
                &CallContext::new(DISPUTER, 201 + 24 * HOUR).with_value(deposit()),
                0,
                deposit(),
                USER,
                0
            ),
            Err(DisputeError::NotInDisputablePeriod)
        );
        assert_eq!(
            ledger.dispute(&ctx, 1, deposit(), USER, 0),
            Err(DisputeError::InvalidTokenTypeIndex)
        );
        assert_eq!(
            ledger.dispute(&ctx, 0, deposit() - 1, USER, 0),
            Err(DisputeError::AmountTooLow)
        );
        assert_eq!(
            ledger.dispute(&ctx.with_value(deposit() - 1), 0, deposit(), USER, 0),
            Err(DisputeError::InsufficientMsgValue)
        );

        ledger.dispute(&ctx, 0, deposit(), USER, 0).unwrap();
        assert_eq!(ledger.get_trade(USER, 0).unwrap().status, TradeStatus::Dispute);
        assert_eq!(
            ledger.get_dispute(USER, 0),
            Some(&Dispute {
                disputer: DISPUTER,
                token_type_index: 0,
                deposit: deposit(),
                dispute_timestamp: 300,
            })
        );
        assert_eq!(
            ledger.dispute(&ctx, 0, deposit(), USER, 0),
            Err(DisputeError::OnlyForPaidStatus)
        );
    }

    #[test]
    fn undefended_dispute_is_slashed_after_defence_period() {
        let mut ledger = paid_ledger(POLYGON);
        let bond_before = ledger.bonds().balance(0);
        ledger
            .dispute(
                &CallContext::new(DISPUTER, 300).with_value(deposit()),
                0,
                deposit(),
                USER,
                0,
            )
            .unwrap();

        assert_eq!(
            ledger.slash(&CallContext::new(USER, 300 + 3 * HOUR + 1), USER, 0),
            Err(DisputeError::OnlyForDisputer)
        );
        assert_eq!(
            ledger.slash(&CallContext::new(DISPUTER, 300 + 3 * HOUR), USER, 0),
            Err(DisputeError::NotYetSlashed)
        );

        ledger.drain_events();
        ledger
            .slash(&CallContext::new(DISPUTER, 300 + 3 * HOUR + 1), USER, 0)
            .unwrap();

        let half = U256::from(AMOUNT) * 220 / 100 / 2;
        assert_eq!(
            ledger.get_trade(USER, 0).unwrap().status,
            TradeStatus::SlashCompleted
        );
        assert_eq!(ledger.bonds().balance(0), bond_before - half * 2);
        assert_eq!(
            ledger.drain_events(),
            vec![
                BridgeEvent::Transferred {
                    to: DISPUTER,
                    token_type_index: 0,
                    amount: deposit(),
                },
                BridgeEvent::Transferred {
                    to: DISPUTER,
                    token_type_index: 0,
                    amount: half,
                },
                BridgeEvent::Transferred {
                    to: USER,
                    token_type_index: 0,
                    amount: half,
                },
                BridgeEvent::Slash {
                    user: USER,
                    index: 0,
                    relayer: RELAYER,
                },
            ]
        );

        assert_eq!(ledger.get_dispute(USER, 0), None);
        assert_eq!(
            ledger.slash(&CallContext::new(DISPUTER, 300 + 3 * HOUR + 1), USER, 0),
            Err(DisputeError::NotYetSlashed)
        );
    }

    #[test]
    fn slash_without_dispute() {
        let mut ledger = paid_ledger(POLYGON);

        assert_eq!(
            ledger.slash(&CallContext::new(DISPUTER, u64::MAX), USER, 0),
            Err(DisputeError::NotYetSlashed)
        );
    }

    #[test]
    fn slash_is_limited_by_the_bond() {
        let mut ledger = paid_ledger(POLYGON);
        ledger
            .dispute(
                &CallContext::new(DISPUTER, 300).with_value(deposit()),
                0,
                deposit(),
                USER,
                0,
            )
            .unwrap();

        let bond = ledger.bonds().balance(0);
        ledger
            .execute_withdraw_bond(&CallContext::new(RELAYER, 300), 0, bond - 7)
            .unwrap();

        ledger
            .slash(&CallContext::new(DISPUTER, 400 + 3 * HOUR), USER, 0)
            .unwrap();
        assert_eq!(ledger.bonds().balance(0), U256::one());
    }

    #[test]
    fn defence_requires_the_committed_evidence() {
        let mut ledger = paid_ledger(POLYGON);
        let evidence = empty_evidence();

        assert_eq!(
            ledger.defence(&CallContext::new(RELAYER, 300), USER, 0, &evidence),
            Err(DisputeError::OnlyForDisputeStatus)
        );

        ledger
            .dispute(
                &CallContext::new(DISPUTER, 300).with_value(deposit()),
                0,
                deposit(),
                USER,
                0,
            )
            .unwrap();
        assert_eq!(
            ledger.defence(&CallContext::new(DISPUTER, 300), USER, 0, &evidence),
            Err(DisputeError::OnlyForRelayer)
        );
        assert_eq!(
            ledger.defence(&CallContext::new(RELAYER, 300), USER, 0, &evidence),
            Err(DisputeError::WrongEvidence)
        );
    }

    #[test]
    fn queries() {
        let mut ledger = ledger();
        let other = account(0x55);
        assert_eq!(ledger.get_trade(USER, 0), Err(DisputeError::NoTrade));
        assert_eq!(ledger.get_trade_list(USER, 0, 0), Ok(Vec::new()));

        for amount in [AMOUNT, AMOUNT + 1, AMOUNT + 2] {
            open_trade(&mut ledger, USER, amount, 100);
        }
        open_trade(&mut ledger, other, AMOUNT, 100);

        assert_eq!(ledger.get_trade_length(USER), 3);
        assert_eq!(ledger.get_trade_list(USER, 0, 0).unwrap().len(), 3);

        let some = ledger.get_trade_list(USER, 1, 2).unwrap();
        assert_eq!(some.len(), 2);
        assert_eq!(some[0].amount, U256::from(AMOUNT + 1));
        assert_eq!(some[1].index, 2);

        assert_eq!(
            ledger.get_trade_list(USER, 0, 3),
            Err(DisputeError::OutOfBounds)
        );
        assert_eq!(
            ledger.get_trade_list(USER, 2, 1),
            Err(DisputeError::InvalidRange)
        );

        let trades = ledger
            .get_trades(&[UserTrade::new(other, 0), UserTrade::new(USER, 2)])
            .unwrap();
        assert_eq!(trades[0].user, other);
        assert_eq!(trades[1].amount, U256::from(AMOUNT + 2));
        assert_eq!(
            ledger.get_trades(&[UserTrade::new(other, 1)]),
            Err(DisputeError::NoTrade)
        );

        assert_eq!(ledger.get_user_trade_list_length(), 4);
        assert_eq!(
            ledger.get_user_trade_list_by_index(2, 3).unwrap(),
            vec![UserTrade::new(USER, 2), UserTrade::new(other, 0)]
        );
        assert_eq!(
            ledger.get_user_trade_list_by_index(0, 4),
            Err(DisputeError::OutOfBounds)
        );
        assert_eq!(
            ledger.get_user_trade_list_by_index(1, 0),
            Err(DisputeError::InvalidRange)
        );

        assert_eq!(
            ledger.get_required_bond_amount(0, 100.into()),
            Ok(U256::from(220))
        );
    }

    #[test]
    fn bond_lifecycle() {
        let mut ledger = ledger();
        let relayer = CallContext::new(RELAYER, 0);

        assert_eq!(
            ledger.deposit_bond(&CallContext::new(USER, 0).with_value(10), 0, 10.into()),
            Err(DisputeError::OnlyForRelayer)
        );
        assert_eq!(
            ledger.deposit_bond(&relayer.with_value(10), 9, 10.into()),
            Err(DisputeError::InvalidTokenIndex)
        );
        assert_eq!(
            ledger.deposit_bond(&relayer.with_value(9), 0, 10.into()),
            Err(DisputeError::InsufficientEthBalance)
        );

        ledger
            .deposit_bond(&relayer.with_value(10), 0, 10.into())
            .unwrap();
        ledger
            .execute_withdraw_bond(&relayer, 0, 4.into())
            .unwrap();
        assert_eq!(ledger.bonds().balance(0), U256::from(6));
        assert_eq!(
            ledger.finalize_withdraw_bond(&CallContext::new(RELAYER, 3 * HOUR - 1), 0),
            Err(DisputeError::OngoingUpdatePeriod)
        );
        assert_eq!(
            ledger.finalize_withdraw_bond(&CallContext::new(RELAYER, 3 * HOUR), 0),
            Ok(U256::from(4))
        );
        assert!(ledger.events().contains(&BridgeEvent::Transferred {
            to: RELAYER,
            token_type_index: 0,
            amount: 4.into(),
        }));
    }

    #[test]
    fn governance_is_relayer_only() {
        let mut ledger = ledger();
        let user = CallContext::new(USER, 0);
        let relayer = CallContext::new(RELAYER, 0);

        assert_eq!(
            ledger.toggle_contract_active(&user),
            Err(DisputeError::Unauthorized)
        );
        assert_eq!(ledger.toggle_contract_active(&relayer), Ok(false));
        assert_eq!(ledger.toggle_contract_active(&relayer), Ok(true));

        assert_eq!(
            ledger.execute_network_setting_update(
                &user,
                &[NetworkOperation::AddAvailable],
                &[OPTIMISM],
                &[false]
            ),
            Err(DisputeError::OnlyForRelayer)
        );
        ledger
            .execute_network_setting_update(
                &relayer,
                &[NetworkOperation::AddAvailable],
                &[OPTIMISM],
                &[false],
            )
            .unwrap();
        assert_eq!(
            ledger.finalize_network_setting_update(&relayer),
            Err(DisputeError::OngoingUpdatePeriod)
        );
        ledger
            .finalize_network_setting_update(&CallContext::new(RELAYER, 3 * HOUR))
            .unwrap();
        assert!(ledger.parameters().is_available_network(OPTIMISM));

        assert_eq!(
            ledger.finalize_fee_list_update(&relayer),
            Err(DisputeError::OngoingUpdatePeriod)
        );
        assert_eq!(
            ledger.finalize_token_address_update(&relayer),
            Err(DisputeError::OngoingUpdatePeriod)
        );
        assert_eq!(
            ledger.finalize_trade_param_update(&relayer),
            Err(DisputeError::OngoingUpdatePeriod)
        );
        assert_eq!(
            ledger.finalize_relayer_update(&relayer),
            Err(DisputeError::OngoingUpdatePeriod)
        );
    }

    #[test]
    fn relayer_handover() {
        let mut ledger = ledger();
        let next = account(0x77);

        assert_eq!(
            ledger.execute_relayer_update(&CallContext::new(next, 0), next),
            Err(DisputeError::OnlyForRelayer)
        );
        ledger
            .execute_relayer_update(&CallContext::new(RELAYER, 0), next)
            .unwrap();
        assert_eq!(
            ledger.finalize_relayer_update(&CallContext::new(RELAYER, 3 * HOUR)),
            Ok(next)
        );
        assert_eq!(ledger.relayer(), next);
        assert_eq!(
            ledger.withdraw(&CallContext::new(RELAYER, 0), USER, 0, commitment(1)),
            Err(DisputeError::OnlyForRelayer)
        );
    }

    #[test]
    fn relayed_hashes_reach_the_checkpoint() {
        let mut ledger = ledger();
        let info = BlockInfo {
            network_code: ETHEREUM,
            number: 5,
            hash: H256::repeat_byte(5),
        };

        assert_eq!(
            ledger.set_block_hash(&CallContext::new(USER, 0), info),
            Err(DisputeError::Unauthorized)
        );
        ledger
            .set_block_hash(&CallContext::new(RELAYER, 0), info)
            .unwrap();

        assert_eq!(
            ledger.checkpoint().get_block_hash(ETHEREUM, 5),
            Some(H256::repeat_byte(5))
        );
        assert_eq!(
            ledger.events(),
            &[BridgeEvent::BlockHashReceived {
                chain: ETHEREUM,
                number: 5,
                hash: H256::repeat_byte(5),
            }]
        );
    }
}
