//! Sample contracts shipped with the runtime.

mod coin;

pub use coin::Coin;
