//! Buffered host session for a single invocation.
//!
//! [`InvocationHost`] implements [`ContractHost`] over a committed store
//! view. Writes and transfers accumulate in the session and are surfaced as
//! effects only when the engine decides to commit; discarding the session is
//! the rollback. Reads observe the session's own writes merged over the
//! committed state, so all reads within one invocation are mutually
//! consistent.

use std::collections::BTreeMap;
use std::time::Duration;

use crucible_storage::{BatchOp, KvPairs, KvStore};
use crucible_types::account::Account;
use crucible_types::primitives::{Amount, AssetId, BlockHeight, Value};

use crate::api::{ContractHost, MAX_KEY_LEN, MAX_PENDING_TRANSFERS, MAX_VALUE_LEN};
use crate::error::HostError;
use crate::ledger::PendingTransfer;

/// Committed state keys are namespaced per contract so scans never cross
/// contract boundaries: `state/<contract>/<key>`.
fn state_prefix(contract: &str) -> String {
    format!("state/{contract}/")
}

/// Host session for one `init`/`invoke`/`query` call.
pub struct InvocationHost<'a> {
    store: &'a dyn KvStore,
    /// Namespace prefix for this contract's committed keys, with trailing
    /// slash.
    prefix: String,
    account: Account,
    height: BlockHeight,
    read_only: bool,
    /// Buffered writes: `Some(bytes)` is a put, `None` a delete.
    writes: BTreeMap<String, Option<Vec<u8>>>,
    transfers: Vec<PendingTransfer>,
}

impl<'a> InvocationHost<'a> {
    /// Session for a state-mutating call (`init` or `invoke`).
    pub fn new(
        store: &'a dyn KvStore,
        contract: &str,
        account: Account,
        height: BlockHeight,
    ) -> Self {
        Self {
            store,
            prefix: state_prefix(contract),
            account,
            height,
            read_only: false,
            writes: BTreeMap::new(),
            transfers: Vec::new(),
        }
    }

    /// Session for a read-only call (`query`). Mutating operations fail
    /// with [`HostError::QueryMutation`].
    pub fn read_only(
        store: &'a dyn KvStore,
        contract: &str,
        account: Account,
        height: BlockHeight,
    ) -> Self {
        let mut session = Self::new(store, contract, account, height);
        session.read_only = true;
        session
    }

    /// Consume the session and return its effects: namespaced batch
    /// operations for the store and the queued transfers.
    pub fn into_effects(self) -> (Vec<BatchOp>, Vec<PendingTransfer>) {
        let prefix = self.prefix;
        let ops = self
            .writes
            .into_iter()
            .map(|(key, write)| match write {
                Some(value) => BatchOp::Put {
                    key: format!("{prefix}{key}"),
                    value,
                },
                None => BatchOp::Delete {
                    key: format!("{prefix}{key}"),
                },
            })
            .collect();
        (ops, self.transfers)
    }

    /// Whether the session buffered any state writes or transfers.
    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty() || !self.transfers.is_empty()
    }

    fn ns(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    fn check_key(&self, key: &str) -> Result<(), HostError> {
        if key.len() > MAX_KEY_LEN {
            return Err(HostError::KeyTooLarge {
                len: key.len(),
                max: MAX_KEY_LEN,
            });
        }
        Ok(())
    }

    /// Merge the session's buffered writes over a committed scan result.
    /// `committed` carries namespaced keys; `pred` selects which buffered
    /// keys fall inside the scanned window.
    fn merged_scan(
        &self,
        committed: KvPairs,
        pred: impl Fn(&str) -> bool,
    ) -> Result<Vec<(String, Value)>, HostError> {
        let strip = self.prefix.len();
        let mut merged: BTreeMap<String, Vec<u8>> = committed
            .into_iter()
            .map(|(k, v)| (k[strip..].to_string(), v))
            .collect();
        for (key, write) in &self.writes {
            if !pred(key.as_str()) {
                continue;
            }
            match write {
                Some(bytes) => {
                    merged.insert(key.clone(), bytes.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        let mut results = Vec::with_capacity(merged.len());
        for (key, bytes) in merged {
            let value = decode_value(&key, &bytes)?;
            results.push((key, value));
        }
        Ok(results)
    }
}

fn decode_value(key: &str, bytes: &[u8]) -> Result<Value, HostError> {
    serde_json::from_slice(bytes).map_err(|e| HostError::Serialization {
        reason: format!("invalid JSON at key '{key}': {e}"),
    })
}

impl ContractHost for InvocationHost<'_> {
    fn put_state(&mut self, key: &str, value: Value) -> Result<(), HostError> {
        if self.read_only {
            return Err(HostError::QueryMutation { op: "put_state" });
        }
        self.check_key(key)?;
        let bytes = serde_json::to_vec(&value).map_err(|e| HostError::Serialization {
            reason: format!("encoding value for key '{key}': {e}"),
        })?;
        if bytes.len() > MAX_VALUE_LEN {
            return Err(HostError::ValueTooLarge {
                len: bytes.len(),
                max: MAX_VALUE_LEN,
            });
        }
        self.writes.insert(key.to_string(), Some(bytes));
        Ok(())
    }

    fn get_state(&self, key: &str) -> Result<Option<Value>, HostError> {
        self.check_key(key)?;
        if let Some(write) = self.writes.get(key) {
            return match write {
                Some(bytes) => Ok(Some(decode_value(key, bytes)?)),
                None => Ok(None),
            };
        }
        match self.store.get(&self.ns(key))? {
            Some(bytes) => Ok(Some(decode_value(key, &bytes)?)),
            None => Ok(None),
        }
    }

    fn del_state(&mut self, key: &str) -> Result<(), HostError> {
        if self.read_only {
            return Err(HostError::QueryMutation { op: "del_state" });
        }
        self.check_key(key)?;
        self.writes.insert(key.to_string(), None);
        Ok(())
    }

    fn get_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, HostError> {
        self.check_key(prefix)?;
        let committed = self.store.prefix_scan(&self.ns(prefix))?;
        self.merged_scan(committed, |key| key.starts_with(prefix))
    }

    fn get_by_range(&self, start: &str, end: &str) -> Result<Vec<(String, Value)>, HostError> {
        self.check_key(start)?;
        self.check_key(end)?;
        let committed = self.store.range_scan(&self.ns(start), &self.ns(end))?;
        self.merged_scan(committed, |key| key >= start && key < end)
    }

    fn account(&self) -> Account {
        self.account.clone()
    }

    fn transfer(
        &mut self,
        recipient: &str,
        asset: AssetId,
        amount: Amount,
    ) -> Result<(), HostError> {
        if self.read_only {
            return Err(HostError::QueryMutation { op: "transfer" });
        }
        if amount <= 0 {
            return Err(HostError::InvalidAmount { amount });
        }
        if self.transfers.len() >= MAX_PENDING_TRANSFERS {
            return Err(HostError::TooManyTransfers {
                max: MAX_PENDING_TRANSFERS,
            });
        }
        let queued: Amount = self
            .transfers
            .iter()
            .filter(|t| t.asset == asset)
            .map(|t| t.amount)
            .sum();
        let available = self.account.balance(asset) - queued;
        if available < amount {
            return Err(HostError::InsufficientBalance {
                address: self.account.address.clone(),
                asset,
                needed: amount,
                available,
            });
        }
        self.transfers.push(PendingTransfer {
            from: self.account.address.clone(),
            to: recipient.to_string(),
            asset,
            amount,
        });
        Ok(())
    }

    fn sleep(&self, duration: Duration) {
        // The engine runs every invocation on its own blocking thread, so
        // this suspends only the calling invocation.
        std::thread::sleep(duration);
    }

    fn block_height(&self) -> BlockHeight {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_storage::MemoryStore;
    use crucible_types::primitives::NATIVE_ASSET;
    use serde_json::json;

    fn account_with(balance: Amount) -> Account {
        let mut balances = BTreeMap::new();
        balances.insert(NATIVE_ASSET, balance);
        Account {
            address: "c1".to_string(),
            sender: "alice".to_string(),
            amount: 0,
            recipient: "c1".to_string(),
            balances,
        }
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for key in ["key_1", "key_2", "key_3", "key_4", "key_11", "key_12", "key_13"] {
            store
                .put(&format!("state/c1/{key}"), &serde_json::to_vec(&json!(key)).unwrap())
                .unwrap();
        }
        store
    }

    #[test]
    fn test_put_get_overlay() {
        let store = MemoryStore::new();
        let mut host = InvocationHost::new(&store, "c1", account_with(0), 0);

        assert_eq!(host.get_state("greeting").unwrap(), None);
        host.put_state("greeting", json!("hello")).unwrap();
        assert_eq!(host.get_state("greeting").unwrap(), Some(json!("hello")));

        // Nothing reaches the store until the engine commits.
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_reads_through_to_committed() {
        let store = seeded_store();
        let host = InvocationHost::new(&store, "c1", account_with(0), 0);
        assert_eq!(host.get_state("key_2").unwrap(), Some(json!("key_2")));
    }

    #[test]
    fn test_del_shadows_committed() {
        let store = seeded_store();
        let mut host = InvocationHost::new(&store, "c1", account_with(0), 0);
        host.del_state("key_2").unwrap();
        assert_eq!(host.get_state("key_2").unwrap(), None);
        // Committed entry untouched.
        assert!(store.get("state/c1/key_2").unwrap().is_some());
    }

    #[test]
    fn test_prefix_scan_mixed_width_keys() {
        let store = seeded_store();
        let host = InvocationHost::new(&store, "c1", account_with(0), 0);
        let results = host.get_by_prefix("key_1").unwrap();
        let keys: Vec<&str> = results.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["key_1", "key_11", "key_12", "key_13"]);
    }

    #[test]
    fn test_range_scan_end_exclusive() {
        let store = MemoryStore::new();
        for key in ["key_1", "key_2", "key_3", "key_4"] {
            store
                .put(&format!("state/c1/{key}"), &serde_json::to_vec(&json!(1)).unwrap())
                .unwrap();
        }
        let host = InvocationHost::new(&store, "c1", account_with(0), 0);
        let results = host.get_by_range("key_1", "key_3").unwrap();
        let keys: Vec<&str> = results.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["key_1", "key_2"]);
    }

    #[test]
    fn test_scans_see_buffered_writes() {
        let store = seeded_store();
        let mut host = InvocationHost::new(&store, "c1", account_with(0), 0);
        host.put_state("key_15", json!("fresh")).unwrap();
        host.del_state("key_12").unwrap();

        let keys: Vec<String> = host
            .get_by_prefix("key_1")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["key_1", "key_11", "key_13", "key_15"]);
    }

    #[test]
    fn test_scans_stay_inside_namespace() {
        let store = seeded_store();
        // Same keys committed for a different contract.
        store
            .put("state/c2/key_1", &serde_json::to_vec(&json!("other")).unwrap())
            .unwrap();
        let host = InvocationHost::new(&store, "c1", account_with(0), 0);
        let results = host.get_by_prefix("key_1").unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|(_, v)| v != &json!("other")));
    }

    #[test]
    fn test_read_only_rejects_mutation() {
        let store = seeded_store();
        let mut host = InvocationHost::read_only(&store, "c1", account_with(100), 0);

        assert!(matches!(
            host.put_state("k", json!(1)),
            Err(HostError::QueryMutation { op: "put_state" })
        ));
        assert!(matches!(
            host.del_state("key_1"),
            Err(HostError::QueryMutation { op: "del_state" })
        ));
        assert!(matches!(
            host.transfer("bob", NATIVE_ASSET, 10),
            Err(HostError::QueryMutation { op: "transfer" })
        ));
        // Reads still work.
        assert_eq!(host.get_state("key_1").unwrap(), Some(json!("key_1")));
    }

    #[test]
    fn test_transfer_checks_running_balance() {
        let store = MemoryStore::new();
        let mut host = InvocationHost::new(&store, "c1", account_with(100), 0);

        host.transfer("bob", NATIVE_ASSET, 60).unwrap();
        // Only 40 left after the queued transfer.
        let err = host.transfer("carol", NATIVE_ASSET, 60).unwrap_err();
        assert!(matches!(
            err,
            HostError::InsufficientBalance { available: 40, .. }
        ));
        host.transfer("carol", NATIVE_ASSET, 40).unwrap();
    }

    #[test]
    fn test_transfer_rejects_nonpositive() {
        let store = MemoryStore::new();
        let mut host = InvocationHost::new(&store, "c1", account_with(100), 0);
        assert!(matches!(
            host.transfer("bob", NATIVE_ASSET, 0),
            Err(HostError::InvalidAmount { amount: 0 })
        ));
        assert!(host.transfer("bob", NATIVE_ASSET, -3).is_err());
    }

    #[test]
    fn test_key_too_large() {
        let store = MemoryStore::new();
        let mut host = InvocationHost::new(&store, "c1", account_with(0), 0);
        let big_key = "k".repeat(MAX_KEY_LEN + 1);
        assert!(matches!(
            host.put_state(&big_key, json!(1)),
            Err(HostError::KeyTooLarge { .. })
        ));
    }

    #[test]
    fn test_into_effects_namespaces_keys() {
        let store = MemoryStore::new();
        let mut host = InvocationHost::new(&store, "c1", account_with(0), 7);
        host.put_state("foo", json!(1)).unwrap();
        host.del_state("bar").unwrap();
        assert_eq!(host.block_height(), 7);

        let (ops, transfers) = host.into_effects();
        assert!(transfers.is_empty());
        assert_eq!(ops.len(), 2);
        match &ops[1] {
            BatchOp::Put { key, .. } => assert_eq!(key, "state/c1/foo"),
            other => panic!("unexpected op: {other:?}"),
        }
        match &ops[0] {
            BatchOp::Delete { key } => assert_eq!(key, "state/c1/bar"),
            other => panic!("unexpected op: {other:?}"),
        }
    }
}
