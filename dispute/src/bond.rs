//! The relayer's bond, per token.
//!
//! Withdrawals are timelocked: the requested amount leaves the bond at once,
//! so it can no longer back trades, and is paid out once the update period
//! has passed.

use std::collections::BTreeMap;

use ethereum_types::U256;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{DisputeError, DisputeResult};

/// A requested bond withdrawal.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BondWithdrawal {
    /// Requested amount.
    pub amount: U256,
    /// Time the withdrawal can be finalized.
    pub execute_after: u64,
}

/// Bond balances and pending withdrawals of the relayer.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BondManager {
    balances: BTreeMap<u8, U256>,
    withdrawals: BTreeMap<u8, BondWithdrawal>,
}

impl BondManager {
    /// Creates a manager without any bond.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bond held in `token_type_index`.
    pub fn balance(&self, token_type_index: u8) -> U256 {
        self.balances
            .get(&token_type_index)
            .copied()
            .unwrap_or_default()
    }

    /// The pending withdrawal of `token_type_index`.
    pub fn pending_withdrawal(&self, token_type_index: u8) -> Option<&BondWithdrawal> {
        self.withdrawals.get(&token_type_index)
    }

    /// Adds `amount` to the bond. `attached` is the native value sent along,
    /// which must cover the amount.
    pub fn deposit(&mut self, token_type_index: u8, amount: U256, attached: U256) -> DisputeResult<()> {
        if amount.is_zero() {
            return Err(DisputeError::ZeroAmount);
        }
        if attached < amount {
            return Err(DisputeError::InsufficientEthBalance);
        }

        let balance = self.balances.entry(token_type_index).or_default();
        *balance = balance.saturating_add(amount);

        info!("Bond of token {} is now {}", token_type_index, balance);
        Ok(())
    }

    /// Takes `amount` out of the bond and schedules its payout.
    ///
    /// A request while another is pending adds to it and restarts the delay.
    pub fn execute_withdraw_bond(
        &mut self,
        token_type_index: u8,
        amount: U256,
        now: u64,
        delay: u64,
    ) -> DisputeResult<BondWithdrawal> {
        let balance = self.balance(token_type_index);
        if amount.is_zero() {
            return Err(DisputeError::ZeroAmount);
        }
        if amount > balance {
            return Err(DisputeError::InsufficientBondBalance);
        }

        self.balances.insert(token_type_index, balance - amount);

        let requested = self
            .withdrawals
            .get(&token_type_index)
            .map_or(amount, |w| w.amount.saturating_add(amount));
        let withdrawal = BondWithdrawal {
            amount: requested,
            execute_after: now.saturating_add(delay),
        };
        self.withdrawals.insert(token_type_index, withdrawal);

        debug!(
            "Scheduled bond withdrawal of {} in token {} after {}",
            requested, token_type_index, withdrawal.execute_after
        );
        Ok(withdrawal)
    }

    /// Pays out the pending withdrawal of `token_type_index`, returning the
    /// amount to send to the relayer.
    pub fn finalize_withdraw_bond(&mut self, token_type_index: u8, now: u64) -> DisputeResult<U256> {
        match self.withdrawals.get(&token_type_index) {
            Some(w) if w.execute_after <= now => {
                let amount = w.amount;
                self.withdrawals.remove(&token_type_index);
                Ok(amount)
            }
            _ => Err(DisputeError::OngoingUpdatePeriod),
        }
    }

    /// Whether the bond covers `required`.
    pub fn covers(&self, token_type_index: u8, required: U256) -> bool {
        self.balance(token_type_index) >= required
    }

    /// Removes up to `amount` from the bond and returns what was removed.
    pub fn slash(&mut self, token_type_index: u8, amount: U256) -> U256 {
        let balance = self.balance(token_type_index);
        let slashed = amount.min(balance);

        self.balances.insert(token_type_index, balance - slashed);

        info!(
            "Slashed {} of bond in token {}, {} left",
            slashed,
            token_type_index,
            balance - slashed
        );
        slashed
    }
}
