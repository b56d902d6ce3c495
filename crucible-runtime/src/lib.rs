//! Crucible contract runtime.
//!
//! Hosts synchronous smart contracts over a key-value state store and an
//! asset ledger. Contracts implement the [`Contract`] trait and talk to the
//! host exclusively through [`ContractHost`]; the [`ContractEngine`] buffers
//! every invocation's effects and commits them atomically on success, or
//! discards them on any failure. [`EngineHandle`] wraps the engine for async
//! callers.

pub mod api;
pub mod contract;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod runner;
pub mod session;

pub use api::{ContractHost, MAX_KEY_LEN, MAX_PENDING_TRANSFERS, MAX_VALUE_LEN};
pub use contract::{Contract, ContractError};
pub use engine::ContractEngine;
pub use error::HostError;
pub use ledger::{Ledger, PendingTransfer};
pub use runner::EngineHandle;
pub use session::InvocationHost;
