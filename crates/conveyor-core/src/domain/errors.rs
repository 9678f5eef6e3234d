//! Error types for the engine and the execution store.

use thiserror::Error;

use super::ids::{ExecutionId, OrderId};
use super::order::OrderStatus;

/// Errors from the execution record store.
///
/// `Conflict` is the interesting one: every write is a conditional update
/// keyed on the expected current state, so two concurrent advances of the
/// same execution cannot both win. The loser sees `Conflict` and stops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("execution not found: {0}")]
    NotFound(ExecutionId),

    #[error("an active execution already exists for order {0}")]
    DuplicateExecution(OrderId),

    #[error("conditional update lost for {execution_id}: expected state {expected:?}, found {actual:?}")]
    Conflict {
        execution_id: ExecutionId,
        expected: String,
        actual: String,
    },

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("result already written for execution {0}")]
    ResultAlreadyWritten(ExecutionId),
}

/// Errors surfaced by the workflow engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start()` was called for an order with a non-terminal execution in
    /// flight. Queue redelivery must not double-charge; the second call is
    /// rejected, not silently started.
    #[error("an active execution already exists for order {0}")]
    DuplicateExecution(OrderId),

    /// A business outcome had no entry in the state's routing table. This
    /// is a workflow configuration error and is never silently dropped.
    #[error("no route for outcome tag {tag:?} in state {state:?}")]
    UnroutedOutcome { state: String, tag: String },

    /// An executor failed fatally, or exhausted its retries in a state
    /// without a failure edge. The execution is marked failed with the raw
    /// error so engine bugs stay diagnosable instead of masquerading as
    /// business failures.
    #[error("fatal failure in state {state:?} after {attempts} attempt(s): {message}")]
    FatalStep {
        state: String,
        attempts: u32,
        message: String,
    },

    /// The order payload could not be serialized into a working document.
    /// Unreachable for well-formed orders; kept explicit so a malformed
    /// payload surfaces instead of starting an execution on an empty
    /// document.
    #[error("order payload could not be encoded: {0}")]
    InvalidOrder(String),

    #[error("unknown state: {0}")]
    UnknownState(String),

    #[error("no executor registered under {0:?}")]
    ExecutorNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
