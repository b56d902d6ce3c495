//! The reference contract engine.
//!
//! Owns the committed state store, the ledger, and the deployed contract
//! instances. Drives the three lifecycle entry points, committing an
//! invocation's buffered effects atomically on success and discarding them
//! on failure. The engine is the only authority that commits or discards
//! writes; contracts never see each other's uncommitted state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crucible_storage::{BatchOp, BatchWriter, MemoryStore};
use crucible_types::account::Account;
use crucible_types::invocation::TxInfo;
use crucible_types::primitives::{Address, Amount, AssetId, BlockHeight, Value};

use crate::contract::Contract;
use crate::error::HostError;
use crate::ledger::{Ledger, PendingTransfer};
use crate::session::InvocationHost;

/// A deployed contract instance. The inner mutex serializes invocations on
/// one contract while letting different contracts run concurrently.
/// `active` flips to true only after `init` has committed; a slot that is
/// registered but not yet active is invisible to invoke and query.
struct ContractSlot {
    contract: Mutex<Box<dyn Contract>>,
    active: AtomicBool,
}

/// Contract engine: registry, committed state, ledger, block height.
pub struct ContractEngine {
    store: Arc<dyn BatchWriter>,
    ledger: Mutex<Ledger>,
    contracts: Mutex<HashMap<Address, Arc<ContractSlot>>>,
    height: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, HostError> {
    mutex.lock().map_err(|e| HostError::InvocationFailed {
        reason: format!("lock poisoned: {e}"),
    })
}

impl ContractEngine {
    /// Engine over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Engine over a caller-provided store.
    pub fn with_store(store: Arc<dyn BatchWriter>) -> Self {
        Self {
            store,
            ledger: Mutex::new(Ledger::new()),
            contracts: Mutex::new(HashMap::new()),
            height: AtomicU64::new(0),
        }
    }

    /// Credit `amount` of `asset` to an address (genesis funding, deposits).
    pub fn credit(&self, address: &str, asset: AssetId, amount: Amount) -> Result<(), HostError> {
        lock(&self.ledger)?.credit(address, asset, amount);
        Ok(())
    }

    /// Ledger balance of one asset for `address`.
    pub fn balance(&self, address: &str, asset: AssetId) -> Result<Amount, HostError> {
        Ok(lock(&self.ledger)?.balance(address, asset))
    }

    /// Current block height.
    pub fn block_height(&self) -> BlockHeight {
        self.height.load(Ordering::SeqCst)
    }

    /// Advance the block height by one and return the new height.
    pub fn advance_block(&self) -> BlockHeight {
        self.height.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Deploy a contract at `address` and run its `init` entry point.
    ///
    /// `init` runs exactly once per contract instance. If it returns
    /// `Ok(false)` or errors, the deployment is rejected: the contract is
    /// not activated and every seeded write is discarded.
    pub fn deploy(
        &self,
        address: &str,
        contract: Box<dyn Contract>,
        args: &[Value],
        tx: &TxInfo,
    ) -> Result<(), HostError> {
        // Reserve the address, then release the registry lock before `init`
        // runs so a slow init holds only this contract's lane.
        let slot = {
            let mut contracts = lock(&self.contracts)?;
            if contracts.contains_key(address) {
                return Err(HostError::AlreadyDeployed {
                    address: address.to_string(),
                });
            }
            let slot = Arc::new(ContractSlot {
                contract: Mutex::new(contract),
                active: AtomicBool::new(false),
            });
            contracts.insert(address.to_string(), slot.clone());
            slot
        };

        let outcome = self.run_init(&slot, address, args, tx);
        if outcome.is_err() {
            if let Ok(mut contracts) = self.contracts.lock() {
                contracts.remove(address);
            }
        }
        outcome
    }

    fn run_init(
        &self,
        slot: &ContractSlot,
        address: &str,
        args: &[Value],
        tx: &TxInfo,
    ) -> Result<(), HostError> {
        let mut contract = lock(&slot.contract)?;
        let account = self.snapshot_account(address, tx)?;
        let mut session =
            InvocationHost::new(self.store.as_ref(), address, account, self.block_height());
        match contract.init(&mut session, args) {
            Ok(true) => {
                let (ops, transfers) = session.into_effects();
                self.commit(ops, transfers)?;
                slot.active.store(true, Ordering::SeqCst);
                tracing::info!(contract = %address, "contract deployed");
                Ok(())
            }
            Ok(false) => {
                tracing::warn!(contract = %address, "deployment rejected by init");
                Err(HostError::DeploymentRejected {
                    reason: "init returned false".to_string(),
                })
            }
            Err(e) => {
                tracing::warn!(contract = %address, error = %e, "deployment faulted");
                Err(HostError::DeploymentRejected {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Run a state-mutating transaction against a deployed contract.
    ///
    /// On `Ok(true)` from the contract, buffered writes are committed as one
    /// atomic batch and queued transfers are applied to the ledger. On
    /// `Ok(false)` or an error, everything is discarded and the failure is
    /// surfaced as [`HostError::InvocationFailed`].
    pub fn invoke(
        &self,
        address: &str,
        func: &str,
        args: &[Value],
        tx: &TxInfo,
    ) -> Result<(), HostError> {
        let slot = self.slot(address)?;
        let mut contract = lock(&slot.contract)?;
        if !slot.active.load(Ordering::SeqCst) {
            return Err(HostError::ContractNotFound {
                address: address.to_string(),
            });
        }

        let account = self.snapshot_account(address, tx)?;
        let mut session =
            InvocationHost::new(self.store.as_ref(), address, account, self.block_height());
        match contract.invoke(&mut session, func, args) {
            Ok(true) => {
                let (ops, transfers) = session.into_effects();
                self.commit(ops, transfers)?;
                tracing::debug!(contract = %address, func, "invocation committed");
                Ok(())
            }
            Ok(false) => {
                tracing::debug!(contract = %address, func, "invocation rolled back");
                Err(HostError::InvocationFailed {
                    reason: format!("'{func}' returned false"),
                })
            }
            Err(e) => {
                tracing::warn!(contract = %address, func, error = %e, "invocation faulted");
                Err(HostError::InvocationFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Run a read-only request against a deployed contract.
    ///
    /// The session rejects every mutating operation; committed state is
    /// untouched regardless of what the contract attempts.
    pub fn query(&self, address: &str, args: &[Value], tx: &TxInfo) -> Result<Value, HostError> {
        let slot = self.slot(address)?;
        let contract = lock(&slot.contract)?;
        if !slot.active.load(Ordering::SeqCst) {
            return Err(HostError::ContractNotFound {
                address: address.to_string(),
            });
        }

        let account = self.snapshot_account(address, tx)?;
        let mut session =
            InvocationHost::read_only(self.store.as_ref(), address, account, self.block_height());
        contract
            .query(&mut session, args)
            .map_err(|e| HostError::InvocationFailed {
                reason: e.to_string(),
            })
    }

    /// Addresses of all deployed contracts.
    pub fn contracts(&self) -> Result<Vec<Address>, HostError> {
        Ok(lock(&self.contracts)?
            .iter()
            .filter(|(_, slot)| slot.active.load(Ordering::SeqCst))
            .map(|(address, _)| address.clone())
            .collect())
    }

    fn slot(&self, address: &str) -> Result<Arc<ContractSlot>, HostError> {
        lock(&self.contracts)?
            .get(address)
            .cloned()
            .ok_or_else(|| HostError::ContractNotFound {
                address: address.to_string(),
            })
    }

    fn snapshot_account(&self, contract: &str, tx: &TxInfo) -> Result<Account, HostError> {
        let ledger = lock(&self.ledger)?;
        Ok(Account {
            address: contract.to_string(),
            sender: tx.sender.clone(),
            amount: tx.amount,
            recipient: contract.to_string(),
            balances: ledger.balances_of(contract),
        })
    }

    /// Apply one invocation's effects. Transfers are re-validated under the
    /// ledger lock before the state batch is written, and the ledger moves
    /// only after the batch has landed, so a failure at either step leaves
    /// both the ledger and the store untouched.
    fn commit(
        &self,
        ops: Vec<BatchOp>,
        transfers: Vec<PendingTransfer>,
    ) -> Result<(), HostError> {
        let mut ledger = lock(&self.ledger)?;
        ledger.validate(&transfers)?;
        self.store.write_batch(ops)?;
        ledger.apply(&transfers)?;
        Ok(())
    }
}

impl Default for ContractEngine {
    fn default() -> Self {
        Self::new()
    }
}
