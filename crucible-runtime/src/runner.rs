//! Async front door for the engine.
//!
//! Contract code is synchronous and may sleep, so every entry point runs on
//! a blocking thread via `spawn_blocking`. Invocations on the same contract
//! serialize on the contract's own lock; different contracts run in
//! parallel.

use std::sync::Arc;

use crucible_types::invocation::TxInfo;
use crucible_types::primitives::Value;

use crate::contract::Contract;
use crate::engine::ContractEngine;
use crate::error::HostError;

/// Cheaply cloneable async handle over a shared [`ContractEngine`].
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<ContractEngine>,
}

impl EngineHandle {
    pub fn new(engine: ContractEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// The underlying engine, for synchronous access.
    pub fn engine(&self) -> &ContractEngine {
        &self.engine
    }

    pub async fn deploy(
        &self,
        address: String,
        contract: Box<dyn Contract>,
        args: Vec<Value>,
        tx: TxInfo,
    ) -> Result<(), HostError> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.deploy(&address, contract, &args, &tx))
            .await
            .map_err(|e| HostError::InvocationFailed {
                reason: format!("deploy task panicked: {e}"),
            })?
    }

    pub async fn invoke(
        &self,
        address: String,
        func: String,
        args: Vec<Value>,
        tx: TxInfo,
    ) -> Result<(), HostError> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.invoke(&address, &func, &args, &tx))
            .await
            .map_err(|e| HostError::InvocationFailed {
                reason: format!("invoke task panicked: {e}"),
            })?
    }

    pub async fn query(
        &self,
        address: String,
        args: Vec<Value>,
        tx: TxInfo,
    ) -> Result<Value, HostError> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || engine.query(&address, &args, &tx))
            .await
            .map_err(|e| HostError::InvocationFailed {
                reason: format!("query task panicked: {e}"),
            })?
    }
}

impl From<ContractEngine> for EngineHandle {
    fn from(engine: ContractEngine) -> Self {
        Self::new(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ContractHost;
    use crate::contract::ContractError;
    use serde_json::json;
    use std::time::{Duration, Instant};

    /// Sleeps for the requested number of milliseconds, then records a mark.
    struct Sleeper;

    impl Contract for Sleeper {
        fn init(&mut self, _host: &mut dyn ContractHost, _args: &[Value]) -> Result<bool, ContractError> {
            Ok(true)
        }

        fn invoke(
            &mut self,
            host: &mut dyn ContractHost,
            _func: &str,
            args: &[Value],
        ) -> Result<bool, ContractError> {
            let millis = args[0].as_u64().ok_or(ContractError::invalid_input("millis"))?;
            host.sleep(Duration::from_millis(millis));
            host.put_state("slept", json!(millis))?;
            Ok(true)
        }

        fn query(&self, host: &mut dyn ContractHost, _args: &[Value]) -> Result<Value, ContractError> {
            Ok(host.get_state("slept")?.unwrap_or(Value::Null))
        }
    }

    /// Sleeps during init before activating.
    struct SlowInit;

    impl Contract for SlowInit {
        fn init(&mut self, host: &mut dyn ContractHost, _args: &[Value]) -> Result<bool, ContractError> {
            host.sleep(Duration::from_millis(400));
            host.put_state("ready", json!(true))?;
            Ok(true)
        }

        fn invoke(
            &mut self,
            host: &mut dyn ContractHost,
            _func: &str,
            _args: &[Value],
        ) -> Result<bool, ContractError> {
            host.put_state("poked", json!(true))?;
            Ok(true)
        }

        fn query(&self, host: &mut dyn ContractHost, _args: &[Value]) -> Result<Value, ContractError> {
            Ok(host.get_state("ready")?.unwrap_or(Value::Null))
        }
    }

    /// Writes a counter without sleeping.
    struct Counter;

    impl Contract for Counter {
        fn init(&mut self, host: &mut dyn ContractHost, _args: &[Value]) -> Result<bool, ContractError> {
            host.put_state("count", json!(0))?;
            Ok(true)
        }

        fn invoke(
            &mut self,
            host: &mut dyn ContractHost,
            _func: &str,
            _args: &[Value],
        ) -> Result<bool, ContractError> {
            let count = host
                .get_state("count")?
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            host.put_state("count", json!(count + 1))?;
            Ok(true)
        }

        fn query(&self, host: &mut dyn ContractHost, _args: &[Value]) -> Result<Value, ContractError> {
            Ok(host.get_state("count")?.unwrap_or(Value::Null))
        }
    }

    fn tx() -> TxInfo {
        TxInfo::from_sender("alice")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_slow_contract_does_not_block_others() {
        let handle = EngineHandle::new(ContractEngine::new());
        handle
            .deploy("sleeper".into(), Box::new(Sleeper), vec![], tx())
            .await
            .unwrap();
        handle
            .deploy("counter".into(), Box::new(Counter), vec![], tx())
            .await
            .unwrap();

        let slow_handle = handle.clone();
        let slow = tokio::spawn(async move {
            slow_handle
                .invoke("sleeper".into(), "nap".into(), vec![json!(300)], tx())
                .await
        });
        // Give the sleeper a head start so it holds its lock.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = Instant::now();
        handle
            .invoke("counter".into(), "bump".into(), vec![], tx())
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(
            elapsed < Duration::from_millis(200),
            "fast contract waited on slow contract: {elapsed:?}"
        );

        slow.await.unwrap().unwrap();
        let slept = handle.query("sleeper".into(), vec![], tx()).await.unwrap();
        assert_eq!(slept, json!(300));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_slow_init_does_not_block_other_contracts() {
        let handle = EngineHandle::new(ContractEngine::new());
        handle
            .deploy("counter".into(), Box::new(Counter), vec![], tx())
            .await
            .unwrap();

        let deploy_handle = handle.clone();
        let deploying = tokio::spawn(async move {
            deploy_handle
                .deploy("slow".into(), Box::new(SlowInit), vec![], tx())
                .await
        });
        // Give the deployment a head start into its sleep.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = Instant::now();
        handle
            .invoke("counter".into(), "bump".into(), vec![], tx())
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(
            elapsed < Duration::from_millis(200),
            "invocation waited on a sleeping init: {elapsed:?}"
        );

        // The slow contract is live once init finishes.
        deploying.await.unwrap().unwrap();
        let ready = handle.query("slow".into(), vec![], tx()).await.unwrap();
        assert_eq!(ready, json!(true));
        handle
            .invoke("slow".into(), "poke".into(), vec![], tx())
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_contract_invocations_serialize() {
        let handle = EngineHandle::new(ContractEngine::new());
        handle
            .deploy("counter".into(), Box::new(Counter), vec![], tx())
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let h = handle.clone();
            tasks.push(tokio::spawn(async move {
                h.invoke("counter".into(), "bump".into(), vec![], tx()).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // Every increment landed despite racing invocations.
        let count = handle.query("counter".into(), vec![], tx()).await.unwrap();
        assert_eq!(count, json!(8));
    }
}
