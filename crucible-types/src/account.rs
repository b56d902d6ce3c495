use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::primitives::{Address, Amount, AssetId};

/// Immutable account snapshot handed to a contract for one invocation.
///
/// The host builds a fresh snapshot for every entry-point call from the
/// ledger and the transaction that triggered the call; its values are fixed
/// for the duration of that call. The contract never owns or mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The contract's own address.
    pub address: Address,
    /// Address that submitted the transaction.
    pub sender: Address,
    /// Amount attached to the transaction.
    pub amount: Amount,
    /// Recipient named by the transaction (the contract address for
    /// contract calls).
    pub recipient: Address,
    /// The contract's ledger balances at the invocation's ordering point,
    /// keyed by asset id.
    pub balances: BTreeMap<AssetId, Amount>,
}

impl Account {
    /// Balance for one asset, zero if the account holds none of it.
    pub fn balance(&self, asset: AssetId) -> Amount {
        self.balances.get(&asset).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::NATIVE_ASSET;

    #[test]
    fn test_balance_lookup() {
        let mut balances = BTreeMap::new();
        balances.insert(NATIVE_ASSET, 500);
        let account = Account {
            address: "contract".to_string(),
            sender: "alice".to_string(),
            amount: 10,
            recipient: "contract".to_string(),
            balances,
        };
        assert_eq!(account.balance(NATIVE_ASSET), 500);
        assert_eq!(account.balance(7), 0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let account = Account {
            address: "c1".to_string(),
            sender: "alice".to_string(),
            amount: 0,
            recipient: "c1".to_string(),
            balances: BTreeMap::new(),
        };
        let encoded = serde_json::to_string(&account).unwrap();
        let decoded: Account = serde_json::from_str(&encoded).unwrap();
        assert_eq!(account, decoded);
    }
}
