//! The caller of a ledger operation.

use ethereum_types::{Address, U256};

/// Who calls, when, and with how much native value attached.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CallContext {
    /// Caller.
    pub sender: Address,
    /// Block timestamp of the call, in seconds.
    pub timestamp: u64,
    /// Native value attached to the call.
    pub value: U256,
}

impl CallContext {
    /// A call without attached value.
    pub fn new(sender: Address, timestamp: u64) -> Self {
        Self {
            sender,
            timestamp,
            value: U256::zero(),
        }
    }

    /// The same call with `value` attached.
    pub fn with_value(mut self, value: impl Into<U256>) -> Self {
        self.value = value.into();
        self
    }
}
