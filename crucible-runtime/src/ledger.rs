//! Account balances and transfer application.
//!
//! Transfers queued during an invocation are applied here in one batch at
//! commit. The whole batch is validated against running balances before any
//! of it is applied, so a failing batch leaves the ledger untouched.

use std::collections::{BTreeMap, HashMap};

use crucible_types::primitives::{Address, Amount, AssetId};
use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// A transfer queued during an invocation, applied on commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    /// Sender address (the contract's own address).
    pub from: Address,
    /// Recipient address.
    pub to: Address,
    /// Asset being transferred.
    pub asset: AssetId,
    /// Amount to transfer.
    pub amount: Amount,
}

/// Ledger of account balances, keyed by address and asset.
#[derive(Debug, Default)]
pub struct Ledger {
    balances: HashMap<Address, BTreeMap<AssetId, Amount>>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `asset` to `address` (genesis funding, deposits).
    pub fn credit(&mut self, address: &str, asset: AssetId, amount: Amount) {
        let entry = self
            .balances
            .entry(address.to_string())
            .or_default()
            .entry(asset)
            .or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Balance of one asset for `address`, zero if the account is unknown.
    pub fn balance(&self, address: &str, asset: AssetId) -> Amount {
        self.balances
            .get(address)
            .and_then(|assets| assets.get(&asset))
            .copied()
            .unwrap_or(0)
    }

    /// Snapshot of all balances held by `address`.
    pub fn balances_of(&self, address: &str) -> BTreeMap<AssetId, Amount> {
        self.balances.get(address).cloned().unwrap_or_default()
    }

    /// Check that a batch of transfers could be applied against current
    /// balances without applying it.
    pub fn validate(&self, transfers: &[PendingTransfer]) -> Result<(), HostError> {
        self.settle(transfers).map(|_| ())
    }

    /// Apply a batch of transfers atomically.
    ///
    /// The whole batch is settled against running balances first; if any
    /// transfer would overdraw its sender or overflow its recipient,
    /// nothing is applied.
    pub fn apply(&mut self, transfers: &[PendingTransfer]) -> Result<(), HostError> {
        let settled = self.settle(transfers)?;
        for ((address, asset), amount) in settled {
            self.balances.entry(address).or_default().insert(asset, amount);
        }
        Ok(())
    }

    /// Run a batch against running balances and return the post-transfer
    /// balance of every touched account, failing on overdraw or overflow
    /// before anything is mutated.
    fn settle(
        &self,
        transfers: &[PendingTransfer],
    ) -> Result<HashMap<(Address, AssetId), Amount>, HostError> {
        let mut settled: HashMap<(Address, AssetId), Amount> = HashMap::new();
        for t in transfers {
            if t.amount <= 0 {
                return Err(HostError::InvalidAmount { amount: t.amount });
            }
            let from_key = (t.from.clone(), t.asset);
            let available = *settled
                .entry(from_key.clone())
                .or_insert_with(|| self.balance(&t.from, t.asset));
            if available < t.amount {
                return Err(HostError::InsufficientBalance {
                    address: t.from.clone(),
                    asset: t.asset,
                    needed: t.amount,
                    available,
                });
            }
            settled.insert(from_key, available - t.amount);

            let to_key = (t.to.clone(), t.asset);
            let held = *settled
                .entry(to_key.clone())
                .or_insert_with(|| self.balance(&t.to, t.asset));
            let credited = held
                .checked_add(t.amount)
                .ok_or_else(|| HostError::BalanceOverflow {
                    address: t.to.clone(),
                    asset: t.asset,
                })?;
            settled.insert(to_key, credited);
        }
        Ok(settled)
    }
}
