//! Trade parameters and their timelocked governance.
//!
//! Every mutable setting changes in two steps: an `execute_*` call proposes
//! the change, and a `finalize_*` call applies it once the update period has
//! passed. Finalizing too early, or without a proposal, fails with
//! [`DisputeError::OngoingUpdatePeriod`].

use std::collections::{BTreeMap, BTreeSet};

use bridge_common::{
    network::{NetworkCode, ETHEREUM},
    NATIVE_TOKEN_INDEX,
};
use ethereum_types::{Address, U256};
use evidence_verifier::TokenAddresses;
use itertools::izip;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DisputeError, DisputeResult},
    pending::PendingChange,
};

/// Per token limits and bond requirements.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradeParams {
    /// Largest tradable amount.
    pub trade_threshold: U256,
    /// Smallest tradable amount.
    pub trade_minimum_amount: U256,
    /// Smallest dispute deposit.
    pub dispute_deposit_amount: U256,
    /// Bond backing a trade, in percent of its amount.
    pub tradable_bond_ratio: U256,
}

impl Default for TradeParams {
    fn default() -> Self {
        Self {
            trade_threshold: U256::from(100_000_000_010_000_000u64),
            trade_minimum_amount: U256::from(5_000_000_000_000_000u64),
            dispute_deposit_amount: U256::from(5_000_000_000_000_000u64),
            tradable_bond_ratio: U256::from(220),
        }
    }
}

impl TradeParams {
    /// Bond the relayer must hold to take a trade of `amount`.
    pub fn required_bond(&self, amount: U256) -> U256 {
        amount.saturating_mul(self.tradable_bond_ratio) / 100
    }

    /// Checks `amount` against the minimum and the threshold, failing with
    /// `too_big` above the threshold.
    pub fn check_amount(&self, amount: U256, too_big: DisputeError) -> DisputeResult<()> {
        if amount > self.trade_threshold {
            return Err(too_big);
        }
        if amount < self.trade_minimum_amount {
            return Err(DisputeError::AmountTooLow);
        }

        Ok(())
    }
}

/// Time windows, in seconds.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Periods {
    /// After creation, during which the relayer may withdraw a trade.
    pub withdrawal: u64,
    /// After creation, before which the user may not cancel a trade.
    pub cancel: u64,
    /// After payment, during which a trade may be disputed.
    pub disputable: u64,
    /// After a dispute, during which the relayer may defend.
    pub defence: u64,
    /// After an upward transfer's block, during which the relayer must accept
    /// it and after which anyone may slash it.
    pub upward_slash_start: u64,
    /// Delay of every timelocked change.
    pub update: u64,
}

impl Default for Periods {
    fn default() -> Self {
        Self {
            withdrawal: 3 * 60 * 60,
            cancel: 60 * 60,
            disputable: 24 * 60 * 60,
            defence: 3 * 60 * 60,
            upward_slash_start: 30 * 60,
            update: 3 * 60 * 60,
        }
    }
}

/// Relayer fee tiers for upward trades, chosen by the gas price the user paid.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeeList {
    /// Fee above `gas_price_threshold_high`.
    pub high: U256,
    /// Fee between the thresholds.
    pub medium: U256,
    /// Fee below `gas_price_threshold_low`.
    pub low: U256,
    /// Gas price above which the high fee applies.
    pub gas_price_threshold_high: U256,
    /// Gas price below which the low fee applies.
    pub gas_price_threshold_low: U256,
}

impl Default for FeeList {
    fn default() -> Self {
        let fee = U256::from(10_000_000_000_000u64);

        Self {
            high: fee,
            medium: fee,
            low: fee,
            gas_price_threshold_high: U256::zero(),
            gas_price_threshold_low: U256::zero(),
        }
    }
}

impl FeeList {
    /// The fee tier for `gas_price`.
    pub fn fee_for(&self, gas_price: U256) -> U256 {
        if gas_price > self.gas_price_threshold_high {
            self.high
        } else if gas_price < self.gas_price_threshold_low {
            self.low
        } else {
            self.medium
        }
    }
}

/// Availability of a destination network.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    /// Trades may target the network.
    Available,
    /// Added before, currently switched off.
    Disabled,
}

/// A change to the network settings.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NetworkOperation {
    /// Adds a network that was never added.
    AddAvailable,
    /// Switches an added network on or off. Skipped for networks never added.
    ToggleAvailable,
    /// Makes disputes on the network possible, or impossible again.
    ToggleSlashable,
}

/// Which trade parameter a [`TradeParamUpdate`] changes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TradeParamOperation {
    /// [`TradeParams::trade_threshold`].
    TradeThreshold,
    /// [`TradeParams::trade_minimum_amount`].
    TradeMinimumAmount,
    /// [`TradeParams::tradable_bond_ratio`].
    TradableBondRatio,
    /// [`TradeParams::dispute_deposit_amount`].
    DisputeDepositAmount,
    /// [`Periods::defence`].
    DefencePeriod,
    /// [`Periods::disputable`].
    DisputablePeriod,
    /// [`Periods::withdrawal`].
    WithdrawalPeriod,
    /// [`Periods::cancel`].
    CancelPeriod,
    /// [`Periods::upward_slash_start`].
    UpwardSlashStartPeriod,
}

impl TradeParamOperation {
    fn is_period(self) -> bool {
        !matches!(
            self,
            TradeParamOperation::TradeThreshold
                | TradeParamOperation::TradeMinimumAmount
                | TradeParamOperation::TradableBondRatio
                | TradeParamOperation::DisputeDepositAmount
        )
    }
}

/// A proposed trade parameter change.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeParamUpdate {
    /// Parameter to change.
    pub operation: TradeParamOperation,
    /// Token whose parameters change. Ignored for periods.
    pub token_type_index: u8,
    /// New value.
    pub new_value: U256,
}

/// A proposed batch of network setting changes.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettingUpdate {
    /// Change per network.
    pub operations: Vec<NetworkOperation>,
    /// Networks to change.
    pub network_codes: Vec<NetworkCode>,
    /// Whether the native asset of an added network is not ether.
    pub native_is_not_eth: Vec<bool>,
}

/// A proposed batch of token registrations.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAddressUpdate {
    /// Network of each token.
    pub network_codes: Vec<NetworkCode>,
    /// Token index of each token.
    pub token_type_indexes: Vec<u8>,
    /// Contract of each token.
    pub token_addresses: Vec<Address>,
}

/// A proposed fee list.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeListUpdate {
    /// Token the fee list applies to.
    pub token_type_index: u8,
    /// New fee list.
    pub fee_list: FeeList,
}

/// Everything the ledger is configured with.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Parameters {
    /// Network code of the chain the ledger runs on.
    pub network_code: NetworkCode,
    /// Network upward transfers are sent on.
    pub upward_source_code: NetworkCode,
    /// Limits per token index. A token index without an entry is invalid.
    pub trade_params: BTreeMap<u8, TradeParams>,
    /// Time windows.
    pub periods: Periods,
    /// Destination networks ever added.
    pub networks: BTreeMap<NetworkCode, NetworkStatus>,
    /// Networks on which payments may be disputed.
    pub slashable_networks: BTreeSet<NetworkCode>,
    /// Networks whose native asset is not ether.
    pub native_is_not_eth: BTreeSet<NetworkCode>,
    /// Token contracts per network and token index.
    pub token_addresses: BTreeMap<NetworkCode, BTreeMap<u8, Address>>,
    /// Upward trade fee tiers per token index.
    pub fee_lists: BTreeMap<u8, FeeList>,

    #[serde(skip)]
    trade_param_update: PendingChange<TradeParamUpdate>,
    #[serde(skip)]
    network_setting_update: PendingChange<NetworkSettingUpdate>,
    #[serde(skip)]
    token_address_update: PendingChange<TokenAddressUpdate>,
    #[serde(skip)]
    fee_list_update: PendingChange<FeeListUpdate>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new(ETHEREUM)
    }
}

impl Parameters {
    /// Default parameters for a ledger on `network_code`, trading the native
    /// asset only, towards Ethereum only.
    pub fn new(network_code: NetworkCode) -> Self {
        Self {
            network_code,
            upward_source_code: ETHEREUM,
            trade_params: BTreeMap::from([(NATIVE_TOKEN_INDEX, TradeParams::default())]),
            periods: Periods::default(),
            networks: BTreeMap::from([(ETHEREUM, NetworkStatus::Available)]),
            slashable_networks: BTreeSet::new(),
            native_is_not_eth: BTreeSet::new(),
            token_addresses: BTreeMap::new(),
            fee_lists: BTreeMap::from([(NATIVE_TOKEN_INDEX, FeeList::default())]),
            trade_param_update: PendingChange::default(),
            network_setting_update: PendingChange::default(),
            token_address_update: PendingChange::default(),
            fee_list_update: PendingChange::default(),
        }
    }

    /// Limits of `token_type_index`.
    pub fn trade_params(&self, token_type_index: u8) -> DisputeResult<&TradeParams> {
        self.trade_params
            .get(&token_type_index)
            .ok_or(DisputeError::InvalidTokenIndex)
    }

    /// Bond backing a trade of `amount` in `token_type_index`.
    pub fn required_bond(&self, token_type_index: u8, amount: U256) -> DisputeResult<U256> {
        Ok(self.trade_params(token_type_index)?.required_bond(amount))
    }

    /// Fee for an upward trade in `token_type_index` paid at `gas_price`.
    pub fn relayer_fee(&self, token_type_index: u8, gas_price: U256) -> U256 {
        self.fee_lists
            .get(&token_type_index)
            .cloned()
            .unwrap_or_default()
            .fee_for(gas_price)
    }

    /// Whether trades may target `code`.
    pub fn is_available_network(&self, code: NetworkCode) -> bool {
        self.networks.get(&code) == Some(&NetworkStatus::Available)
    }

    /// Whether payments on `code` may be disputed.
    pub fn is_slashable_network(&self, code: NetworkCode) -> bool {
        self.slashable_networks.contains(&code)
    }

    /// The pending trade parameter change.
    pub fn pending_trade_param_update(&self) -> Option<(&TradeParamUpdate, u64)> {
        self.trade_param_update.pending()
    }

    /// The pending network setting change.
    pub fn pending_network_setting_update(&self) -> Option<(&NetworkSettingUpdate, u64)> {
        self.network_setting_update.pending()
    }

    /// The pending token registrations.
    pub fn pending_token_address_update(&self) -> Option<(&TokenAddressUpdate, u64)> {
        self.token_address_update.pending()
    }

    /// The pending fee list.
    pub fn pending_fee_list_update(&self) -> Option<(&FeeListUpdate, u64)> {
        self.fee_list_update.pending()
    }

    /// Proposes a trade parameter change.
    pub fn execute_trade_param_update(
        &mut self,
        now: u64,
        update: TradeParamUpdate,
    ) -> DisputeResult<()> {
        if update.operation.is_period() {
            if update.new_value > U256::from(u64::MAX) {
                return Err(DisputeError::InvalidValue);
            }
        } else {
            self.trade_params(update.token_type_index)?;
        }

        self.trade_param_update.propose(update, now, self.periods.update);
        Ok(())
    }

    /// Applies the pending trade parameter change.
    pub fn finalize_trade_param_update(&mut self, now: u64) -> DisputeResult<TradeParamUpdate> {
        let update = due(&self.trade_param_update, now)?.clone();
        let value = update.new_value;
        let period = value.low_u64();

        match update.operation {
            TradeParamOperation::DefencePeriod => self.periods.defence = period,
            TradeParamOperation::DisputablePeriod => self.periods.disputable = period,
            TradeParamOperation::WithdrawalPeriod => self.periods.withdrawal = period,
            TradeParamOperation::CancelPeriod => self.periods.cancel = period,
            TradeParamOperation::UpwardSlashStartPeriod => self.periods.upward_slash_start = period,
            op => {
                let params = self
                    .trade_params
                    .get_mut(&update.token_type_index)
                    .ok_or(DisputeError::InvalidTokenIndex)?;

                match op {
                    TradeParamOperation::TradeThreshold => params.trade_threshold = value,
                    TradeParamOperation::TradeMinimumAmount => params.trade_minimum_amount = value,
                    TradeParamOperation::TradableBondRatio => params.tradable_bond_ratio = value,
                    _ => params.dispute_deposit_amount = value,
                }
            }
        }
        self.trade_param_update.cancel();

        info!(
            "Updated {:?} of token {} to {}",
            update.operation, update.token_type_index, value
        );
        Ok(update)
    }

    /// Proposes network setting changes. The three slices run in parallel.
    pub fn execute_network_setting_update(
        &mut self,
        now: u64,
        operations: &[NetworkOperation],
        network_codes: &[NetworkCode],
        native_is_not_eth: &[bool],
    ) -> DisputeResult<()> {
        if operations.len() != network_codes.len() || operations.len() != native_is_not_eth.len()
        {
            return Err(DisputeError::InvalidArrayLength);
        }

        self.network_setting_update.propose(
            NetworkSettingUpdate {
                operations: operations.to_vec(),
                network_codes: network_codes.to_vec(),
                native_is_not_eth: native_is_not_eth.to_vec(),
            },
            now,
            self.periods.update,
        );
        Ok(())
    }

    /// Applies the pending network setting changes, all or none.
    pub fn finalize_network_setting_update(
        &mut self,
        now: u64,
    ) -> DisputeResult<NetworkSettingUpdate> {
        let update = due(&self.network_setting_update, now)?.clone();

        let mut networks = self.networks.clone();
        let mut slashable = self.slashable_networks.clone();
        let mut native_is_not_eth = self.native_is_not_eth.clone();

        for (op, code, not_eth) in izip!(
            &update.operations,
            &update.network_codes,
            &update.native_is_not_eth
        ) {
            match op {
                NetworkOperation::AddAvailable => {
                    if networks.contains_key(code) {
                        return Err(DisputeError::NetworkAlreadyAvailable);
                    }
                    networks.insert(*code, NetworkStatus::Available);
                    if *not_eth {
                        native_is_not_eth.insert(*code);
                    }
                }
                NetworkOperation::ToggleAvailable => {
                    if let Some(status) = networks.get_mut(code) {
                        *status = match status {
                            NetworkStatus::Available => NetworkStatus::Disabled,
                            NetworkStatus::Disabled => NetworkStatus::Available,
                        };
                    }
                }
                NetworkOperation::ToggleSlashable => {
                    if !slashable.remove(code) {
                        slashable.insert(*code);
                    }
                }
            }
        }

        self.networks = networks;
        self.slashable_networks = slashable;
        self.native_is_not_eth = native_is_not_eth;
        self.network_setting_update.cancel();

        info!("Applied {} network setting changes", update.operations.len());
        Ok(update)
    }

    /// Proposes token registrations. The three slices run in parallel.
    pub fn execute_token_address_update(
        &mut self,
        now: u64,
        network_codes: &[NetworkCode],
        token_type_indexes: &[u8],
        token_addresses: &[Address],
    ) -> DisputeResult<()> {
        if network_codes.len() != token_type_indexes.len()
            || network_codes.len() != token_addresses.len()
        {
            return Err(DisputeError::InvalidArrayLength);
        }

        self.token_address_update.propose(
            TokenAddressUpdate {
                network_codes: network_codes.to_vec(),
                token_type_indexes: token_type_indexes.to_vec(),
                token_addresses: token_addresses.to_vec(),
            },
            now,
            self.periods.update,
        );
        Ok(())
    }

    /// Applies the pending token registrations, all or none. A registered
    /// token is never replaced.
    pub fn finalize_token_address_update(&mut self, now: u64) -> DisputeResult<TokenAddressUpdate> {
        let update = due(&self.token_address_update, now)?.clone();
        let mut tokens = self.token_addresses.clone();

        for (code, index, address) in izip!(
            &update.network_codes,
            &update.token_type_indexes,
            &update.token_addresses
        ) {
            let per_network = tokens.entry(*code).or_default();
            if per_network.contains_key(index) {
                return Err(DisputeError::TokenAddressExists);
            }
            per_network.insert(*index, *address);
        }

        self.token_addresses = tokens;
        self.token_address_update.cancel();

        info!("Registered {} token addresses", update.token_addresses.len());
        Ok(update)
    }

    /// Proposes a new fee list for `token_type_index`.
    pub fn execute_fee_list_update(
        &mut self,
        now: u64,
        token_type_index: u8,
        fee_list: FeeList,
    ) -> DisputeResult<()> {
        self.trade_params(token_type_index)?;

        self.fee_list_update.propose(
            FeeListUpdate {
                token_type_index,
                fee_list,
            },
            now,
            self.periods.update,
        );
        Ok(())
    }

    /// Applies the pending fee list.
    pub fn finalize_fee_list_update(&mut self, now: u64) -> DisputeResult<FeeListUpdate> {
        let update = self
            .fee_list_update
            .commit_if_due(now)
            .ok_or(DisputeError::OngoingUpdatePeriod)?;

        self.fee_lists
            .insert(update.token_type_index, update.fee_list.clone());

        Ok(update)
    }
}

/// The pending value of `change` if it is applicable at `now`, left in place.
fn due<T>(change: &PendingChange<T>, now: u64) -> DisputeResult<&T> {
    match change.pending() {
        Some((value, execute_after)) if execute_after <= now => Ok(value),
        _ => Err(DisputeError::OngoingUpdatePeriod),
    }
}

impl TokenAddresses for Parameters {
    fn token_address(&self, chain: NetworkCode, token_index: u8) -> Option<Address> {
        self.token_addresses.get(&chain)?.get(&token_index).copied()
    }

    fn pays_native(&self, chain: NetworkCode, token_index: u8) -> bool {
        token_index == NATIVE_TOKEN_INDEX && !self.native_is_not_eth.contains(&chain)
    }
}
