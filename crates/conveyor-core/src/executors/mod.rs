//! Step executors: pluggable units of work invoked by the engine.
//!
//! An executor is a pure function of its input: it classifies what happened
//! ([`StepOutcome`] or [`StepError`]) and never decides control flow; the
//! engine owns routing. Keeping the contract uniform means new steps slot
//! in without touching the engine.

pub mod notify;
pub mod payment;
pub mod persist;
pub mod report;
pub mod validate;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::execution::Execution;
use crate::domain::ids::ExecutionId;
use crate::domain::order::Order;
use crate::domain::outcome::{StepError, StepOutcome};

pub use self::notify::PublishNotification;
pub use self::payment::ProcessPayment;
pub use self::persist::PersistOrderResult;
pub use self::report::FailureReport;
pub use self::validate::ValidateOrder;

/// What a step gets to see: the order and the working document accumulated
/// by the steps before it.
#[derive(Debug, Clone)]
pub struct StepInput {
    pub execution_id: ExecutionId,
    pub order: Order,
    pub document: serde_json::Value,
}

impl StepInput {
    pub fn from_execution(execution: &Execution) -> Self {
        Self {
            execution_id: execution.execution_id,
            order: execution.order.clone(),
            document: execution.document.clone(),
        }
    }
}

/// Uniform executor contract: `(input) -> outcome`.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn run(&self, input: &StepInput) -> Result<StepOutcome, StepError>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("executor {0:?} is already registered")]
    Duplicate(String),
}

/// Registry of executors (name -> executor).
///
/// Design:
/// - Built during initialization (mutable), used during runtime
///   (immutable behind an `Arc`). No locks needed.
/// - Duplicate names are rejected at registration, not last-wins.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn StepExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        executor: Arc<dyn StepExecutor>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.executors.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.executors.insert(name, executor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StepExecutor>> {
        self.executors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }
}
