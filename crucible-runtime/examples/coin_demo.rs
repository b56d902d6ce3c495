//! Interactive demo: run with `cargo run --example coin_demo -p crucible-runtime`
//!
//! Demonstrates the full Crucible flow:
//! 1. Deploy the coin contract
//! 2. Mint tokens to Alice and query balances
//! 3. Send tokens from Alice to Bob
//! 4. Roll back an overdrawn send
//! 5. Pay real ledger funds out of the contract account

use serde_json::json;
use tracing_subscriber::EnvFilter;

use crucible_runtime::contracts::Coin;
use crucible_runtime::{ContractEngine, EngineHandle, HostError};
use crucible_types::invocation::TxInfo;
use crucible_types::primitives::NATIVE_ASSET;

const COIN: &str = "coin-demo";

async fn balance_of(handle: &EngineHandle, who: &str) -> Result<i64, HostError> {
    let value = handle
        .query(COIN.into(), vec![json!(who)], TxInfo::from_sender(who))
        .await?;
    Ok(value.as_i64().unwrap_or(0))
}

#[tokio::main]
async fn main() -> Result<(), HostError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Crucible - Coin Contract Demo ===\n");

    // ── 1. Deploy the coin contract ──
    println!("[1] Deploying coin contract at '{COIN}'...");
    let handle = EngineHandle::new(ContractEngine::new());
    handle
        .deploy(
            COIN.into(),
            Box::new(Coin),
            vec![],
            TxInfo::from_sender("alice"),
        )
        .await?;
    println!("    deployed, minter is alice\n");

    // ── 2. Mint tokens to Alice ──
    println!("[2] Minting 1000 tokens to alice...");
    handle
        .invoke(
            COIN.into(),
            "mint".into(),
            vec![json!("alice"), json!(1000)],
            TxInfo::from_sender("alice"),
        )
        .await?;
    println!("    alice balance: {}\n", balance_of(&handle, "alice").await?);

    // ── 3. Send tokens from Alice to Bob ──
    println!("[3] Sending 400 tokens alice -> bob...");
    handle
        .invoke(
            COIN.into(),
            "send".into(),
            vec![json!("bob"), json!(400)],
            TxInfo::from_sender("alice"),
        )
        .await?;
    println!("    alice balance: {}", balance_of(&handle, "alice").await?);
    println!("    bob balance:   {}\n", balance_of(&handle, "bob").await?);

    // ── 4. Overdrawn send is rejected and rolled back ──
    println!("[4] Attempting to send 9999 tokens bob -> alice...");
    let err = handle
        .invoke(
            COIN.into(),
            "send".into(),
            vec![json!("alice"), json!(9999)],
            TxInfo::from_sender("bob"),
        )
        .await
        .expect_err("overdrawn send should fail");
    println!("    rejected: {err}");
    println!("    bob balance unchanged: {}\n", balance_of(&handle, "bob").await?);

    // ── 5. Pay ledger funds out of the contract account ──
    println!("[5] Funding contract with 500 ledger units and paying 200 to carol...");
    handle.engine().credit(COIN, NATIVE_ASSET, 500)?;
    handle
        .invoke(
            COIN.into(),
            "transfer".into(),
            vec![json!("carol"), json!(200), json!(NATIVE_ASSET)],
            TxInfo::from_sender("alice"),
        )
        .await?;
    println!(
        "    contract ledger balance: {}",
        handle.engine().balance(COIN, NATIVE_ASSET)?
    );
    println!(
        "    carol ledger balance:    {}",
        handle.engine().balance("carol", NATIVE_ASSET)?
    );

    println!("\n=== Demo complete ===");
    Ok(())
}
