//! A minimal token contract.
//!
//! Tracks per-address balances in contract state under a single `balances`
//! object, with mint authority pinned to the deploying sender. `send` moves
//! the contract's internal balances; `transfer` moves real ledger funds via
//! the host.

use serde_json::json;
use std::collections::BTreeMap;

use crucible_types::primitives::{Amount, AssetId, Value};

use crate::api::ContractHost;
use crate::contract::{Contract, ContractError};

const MINTER_KEY: &str = "minter";
const BALANCES_KEY: &str = "balances";

pub struct Coin;

impl Coin {
    fn load_balances(host: &dyn ContractHost) -> Result<BTreeMap<String, Amount>, ContractError> {
        match host.get_state(BALANCES_KEY)? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| ContractError::custom(format!("corrupt balances: {e}"))),
            None => Ok(BTreeMap::new()),
        }
    }

    fn store_balances(
        host: &mut dyn ContractHost,
        balances: &BTreeMap<String, Amount>,
    ) -> Result<(), ContractError> {
        let value = serde_json::to_value(balances)
            .map_err(|e| ContractError::custom(format!("encode balances: {e}")))?;
        host.put_state(BALANCES_KEY, value)?;
        Ok(())
    }

    fn minter(host: &dyn ContractHost) -> Result<String, ContractError> {
        let value = host
            .get_state(MINTER_KEY)?
            .ok_or(ContractError::not_found("minter not initialized"))?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or(ContractError::custom("corrupt minter record"))
    }

    fn parse_payment(args: &[Value]) -> Result<(String, Amount), ContractError> {
        let to = args
            .first()
            .and_then(Value::as_str)
            .ok_or(ContractError::invalid_input("recipient address required"))?;
        let amount = args
            .get(1)
            .and_then(Value::as_i64)
            .ok_or(ContractError::invalid_input("amount required"))?;
        if amount <= 0 {
            return Err(ContractError::invalid_input(format!(
                "amount must be positive, got {amount}"
            )));
        }
        Ok((to.to_string(), amount))
    }
}

impl Contract for Coin {
    fn init(&mut self, host: &mut dyn ContractHost, _args: &[Value]) -> Result<bool, ContractError> {
        host.put_state(MINTER_KEY, json!(host.account().sender))?;
        Self::store_balances(host, &BTreeMap::new())?;
        Ok(true)
    }

    fn invoke(
        &mut self,
        host: &mut dyn ContractHost,
        func: &str,
        args: &[Value],
    ) -> Result<bool, ContractError> {
        match func {
            // Mint new tokens into the internal balance table. Only the
            // deploying sender may mint.
            "mint" => {
                let (to, amount) = Self::parse_payment(args)?;
                if host.account().sender != Self::minter(host)? {
                    return Ok(false);
                }
                let mut balances = Self::load_balances(host)?;
                let entry = balances.entry(to).or_insert(0);
                *entry = entry
                    .checked_add(amount)
                    .ok_or(ContractError::Overflow)?;
                Self::store_balances(host, &balances)?;
                Ok(true)
            }
            // Move internal balance from the caller to a recipient.
            // Insufficient funds rejects the whole invocation.
            "send" => {
                let (to, amount) = Self::parse_payment(args)?;
                let sender = host.account().sender;
                let mut balances = Self::load_balances(host)?;
                let have = balances.get(&sender).copied().unwrap_or(0);
                if have < amount {
                    return Ok(false);
                }
                balances.insert(sender, have - amount);
                let entry = balances.entry(to).or_insert(0);
                *entry = entry
                    .checked_add(amount)
                    .ok_or(ContractError::Overflow)?;
                Self::store_balances(host, &balances)?;
                Ok(true)
            }
            // Pay real ledger funds out of the contract's own account.
            "transfer" => {
                let (to, amount) = Self::parse_payment(args)?;
                let asset = args
                    .get(2)
                    .and_then(Value::as_u64)
                    .ok_or(ContractError::invalid_input("asset id required"))?
                    as AssetId;
                host.transfer(&to, asset, amount)?;
                Ok(true)
            }
            other => Err(ContractError::invalid_input(format!(
                "unknown function '{other}'"
            ))),
        }
    }

    fn query(&self, host: &mut dyn ContractHost, args: &[Value]) -> Result<Value, ContractError> {
        let address = args
            .first()
            .and_then(Value::as_str)
            .ok_or(ContractError::invalid_input("address required"))?;
        let balances = Self::load_balances(host)?;
        Ok(json!(balances.get(address).copied().unwrap_or(0)))
    }
}
