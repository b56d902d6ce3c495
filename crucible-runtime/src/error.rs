use crucible_types::primitives::{Amount, AssetId};
use thiserror::Error;

/// Errors that can occur in the contract host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Deployment rejected: {reason}")]
    DeploymentRejected { reason: String },

    #[error("Contract already deployed: {address}")]
    AlreadyDeployed { address: String },

    #[error("Contract not found: {address}")]
    ContractNotFound { address: String },

    #[error("Invocation failed: {reason}")]
    InvocationFailed { reason: String },

    #[error("Mutation attempted during query: {op}")]
    QueryMutation { op: &'static str },

    #[error("Insufficient balance: {address} holds {available} of asset {asset}, needs {needed}")]
    InsufficientBalance {
        address: String,
        asset: AssetId,
        needed: Amount,
        available: Amount,
    },

    #[error("Transfer amount must be positive, got {amount}")]
    InvalidAmount { amount: Amount },

    #[error("Balance overflow: crediting {address} with asset {asset} exceeds the representable amount")]
    BalanceOverflow { address: String, asset: AssetId },

    #[error("State key too large: {len} > {max}")]
    KeyTooLarge { len: usize, max: usize },

    #[error("State value too large: {len} > {max}")]
    ValueTooLarge { len: usize, max: usize },

    #[error("Too many pending transfers: limit is {max}")]
    TooManyTransfers { max: usize },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] crucible_storage::StorageError),
}
