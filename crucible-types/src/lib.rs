//! Shared type definitions for the Crucible contract host.
//!
//! Primitives (asset ids, amounts), the per-invocation [`Account`](account::Account)
//! snapshot, and the [`TxInfo`](invocation::TxInfo) that ties one entry-point
//! call together.

pub mod account;
pub mod invocation;
pub mod primitives;
