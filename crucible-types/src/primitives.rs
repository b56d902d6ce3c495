/// Account identifier. Addresses are opaque strings assigned by the ledger
/// (hex-encoded in practice).
pub type Address = String;

/// Asset identifier for ledger balances and transfers.
pub type AssetId = u32;

/// Amount of an asset. Signed so that balance arithmetic can detect
/// underflows before they are committed.
pub type Amount = i64;

/// Block height of the chain the host is running against.
pub type BlockHeight = u64;

/// The native asset id.
pub const NATIVE_ASSET: AssetId = 0;

/// A contract state value. Contracts exchange JSON with the host; the store
/// itself holds the serialized bytes.
pub type Value = serde_json::Value;
