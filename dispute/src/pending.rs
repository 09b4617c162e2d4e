//! Timelocked changes.

use serde::{Deserialize, Serialize};

/// A change proposed now and applicable once its delay has passed.
///
/// Proposing again replaces the pending value and restarts the delay.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange<T> {
    pending: Option<Pending<T>>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Pending<T> {
    value: T,
    execute_after: u64,
}

impl<T> Default for PendingChange<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> PendingChange<T> {
    /// Proposes `value`, applicable from `now + delay` on.
    pub fn propose(&mut self, value: T, now: u64, delay: u64) {
        self.pending = Some(Pending {
            value,
            execute_after: now.saturating_add(delay),
        });
    }

    /// The pending value and the time it becomes applicable.
    pub fn pending(&self) -> Option<(&T, u64)> {
        self.pending.as_ref().map(|p| (&p.value, p.execute_after))
    }

    /// Whether a change is pending.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes the pending value if it is applicable at `now`.
    ///
    /// Returns `None`, leaving any pending value in place, when nothing was
    /// proposed or the delay has not passed.
    pub fn commit_if_due(&mut self, now: u64) -> Option<T> {
        match &self.pending {
            Some(p) if p.execute_after <= now => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }

    /// Drops the pending value.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }
}
