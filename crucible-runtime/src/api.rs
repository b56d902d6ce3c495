//! The capability interface contracts consume from their host.
//!
//! Contract code never touches the state store or the ledger directly; every
//! effect goes through [`ContractHost`]. The engine hands each invocation a
//! buffered implementation whose writes become visible only at commit.

use std::time::Duration;

use crucible_types::account::Account;
use crucible_types::primitives::{Amount, AssetId, BlockHeight, Value};

use crate::error::HostError;

/// Maximum state key length in bytes.
pub const MAX_KEY_LEN: usize = 1024;

/// Maximum serialized state value length in bytes.
pub const MAX_VALUE_LEN: usize = 65_536;

/// Maximum transfers a single invocation may queue.
pub const MAX_PENDING_TRANSFERS: usize = 256;

/// Host operations available to contract code during one invocation.
///
/// State reads observe the invocation's own buffered writes over the
/// committed store; nothing an invocation writes is visible to any other
/// invocation before commit. During a query every mutating operation fails
/// with [`HostError::QueryMutation`].
pub trait ContractHost {
    /// Store `value` under `key`, overwriting any prior value.
    fn put_state(&mut self, key: &str, value: Value) -> Result<(), HostError>;

    /// Value currently stored under `key`, or `None` if absent.
    fn get_state(&self, key: &str) -> Result<Option<Value>, HostError>;

    /// Remove `key` from the state. Removing an absent key is a no-op.
    fn del_state(&mut self, key: &str) -> Result<(), HostError>;

    /// All entries whose key starts with `prefix`, in lexicographic key
    /// order.
    fn get_by_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, HostError>;

    /// All entries with key in `[start, end)`, in lexicographic key order.
    fn get_by_range(&self, start: &str, end: &str) -> Result<Vec<(String, Value)>, HostError>;

    /// The account snapshot for this invocation. Fixed for the duration of
    /// the call.
    fn account(&self) -> Account;

    /// Queue a transfer of `amount` of `asset` from the contract's own
    /// address to `recipient`. Fails immediately if the contract balance,
    /// net of transfers already queued in this invocation, is insufficient.
    /// Applied to the ledger only when the invocation commits.
    fn transfer(&mut self, recipient: &str, asset: AssetId, amount: Amount)
        -> Result<(), HostError>;

    /// Suspend the calling invocation for `duration`. Other invocations keep
    /// running; no partial state becomes visible to them.
    fn sleep(&self, duration: Duration);

    /// Height of the block this invocation is ordered in.
    fn block_height(&self) -> BlockHeight;
}
