//! The `Contract` trait and the error type contract code returns.
//!
//! A contract is a native Rust value exposing the three lifecycle entry
//! points the host invokes. All access to state, the ledger, and the
//! invocation context goes through the [`ContractHost`] the host passes in.

use crucible_types::primitives::Value;

use crate::api::ContractHost;
use crate::error::HostError;

/// The contract interface. Implement this trait to define a contract the
/// engine can deploy and drive.
pub trait Contract: Send {
    /// Called exactly once, when the contract is deployed, before any
    /// `invoke` or `query`. Seeds initial state.
    ///
    /// `Ok(true)` activates the contract and commits the seeded writes;
    /// `Ok(false)` or an error rejects the deployment and discards them.
    fn init(&mut self, host: &mut dyn ContractHost, args: &[Value]) -> Result<bool, ContractError>;

    /// Called once per state-mutating transaction.
    ///
    /// Must be deterministic given the same committed state, account
    /// snapshot, and arguments. `Ok(true)` commits the invocation's writes
    /// and queued transfers atomically; `Ok(false)` or an error rolls
    /// everything back.
    fn invoke(
        &mut self,
        host: &mut dyn ContractHost,
        func: &str,
        args: &[Value],
    ) -> Result<bool, ContractError>;

    /// Called once per read-only request. The returned value is surfaced to
    /// the caller; the host rejects any attempted mutation.
    fn query(&self, host: &mut dyn ContractHost, args: &[Value]) -> Result<Value, ContractError>;
}

/// Errors a contract can return from its entry points.
#[derive(Debug, PartialEq)]
pub enum ContractError {
    /// A custom error with a free-form message.
    Custom(String),
    /// The caller is not authorized to perform the action.
    Unauthorized,
    /// The input data could not be parsed or is invalid.
    InvalidInput(String),
    /// A requested resource was not found.
    NotFound(String),
    /// An arithmetic overflow occurred.
    Overflow,
    /// The account has insufficient funds for the operation.
    InsufficientFunds,
}

impl ContractError {
    /// Human-readable error message for this variant.
    pub fn message(&self) -> &str {
        match self {
            ContractError::Custom(msg) => msg,
            ContractError::Unauthorized => "unauthorized",
            ContractError::InvalidInput(msg) => msg,
            ContractError::NotFound(msg) => msg,
            ContractError::Overflow => "arithmetic overflow",
            ContractError::InsufficientFunds => "insufficient funds",
        }
    }

    /// Create a custom error with a message.
    pub fn custom(msg: impl Into<String>) -> Self {
        ContractError::Custom(msg.into())
    }

    /// Create a not-found error describing what was missing.
    pub fn not_found(what: impl Into<String>) -> Self {
        ContractError::NotFound(what.into())
    }

    /// Create an invalid-input error describing the problem.
    pub fn invalid_input(what: impl Into<String>) -> Self {
        ContractError::InvalidInput(what.into())
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<&str> for ContractError {
    fn from(msg: &str) -> Self {
        ContractError::Custom(String::from(msg))
    }
}

/// Host failures propagate out of contract code with `?`.
impl From<HostError> for ContractError {
    fn from(err: HostError) -> Self {
        ContractError::Custom(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(ContractError::Unauthorized.message(), "unauthorized");
        assert_eq!(ContractError::custom("boom").message(), "boom");
        assert_eq!(
            ContractError::not_found("balances").message(),
            "balances"
        );
    }

    #[test]
    fn test_from_host_error() {
        let err: ContractError = HostError::QueryMutation { op: "put_state" }.into();
        assert!(err.message().contains("put_state"));
    }
}
