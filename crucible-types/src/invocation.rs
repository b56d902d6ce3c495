use serde::{Deserialize, Serialize};

use crate::primitives::{Address, Amount};

/// Transaction context for a single invocation.
///
/// Carries the caller-side facts the host needs to build the contract's
/// [`Account`](crate::account::Account) snapshot. Lives only for the duration
/// of one `init`/`invoke`/`query` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
    /// Address that submitted the transaction.
    pub sender: Address,
    /// Amount of the native asset attached to the call.
    pub amount: Amount,
}

impl TxInfo {
    /// Context for a plain call from `sender` with nothing attached.
    pub fn from_sender(sender: impl Into<Address>) -> Self {
        Self {
            sender: sender.into(),
            amount: 0,
        }
    }

    /// Attach an amount of the native asset (builder, consuming).
    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = amount;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let tx = TxInfo::from_sender("alice").with_amount(100);
        assert_eq!(tx.sender, "alice");
        assert_eq!(tx.amount, 100);
    }
}
