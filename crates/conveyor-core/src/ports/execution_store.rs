//! ExecutionStore port: the single source of truth for execution state.
//!
//! Design principles:
//! - Every write is a conditional update keyed on the expected current
//!   state. The store is the linearization point: if two engine instances
//!   race to advance the same execution, exactly one write wins and the
//!   loser gets [`StoreError::Conflict`].
//! - `create` is the dedup gate: it atomically rejects a new execution for
//!   an order that already has a non-terminal execution in flight (queue
//!   redelivery must not double-charge). An order whose latest execution is
//!   terminal may be re-driven under a fresh execution ID.
//! - The record itself enforces the append-only history and write-once
//!   result invariants; see [`Execution`].

use async_trait::async_trait;

use crate::domain::execution::{Execution, ExecutionResult, HistoryEntry};
use crate::domain::ids::ExecutionId;
use crate::domain::order::OrderStatus;
use crate::domain::StoreError;

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a fresh execution, deduplicating on its order ID.
    async fn create(&self, execution: Execution) -> Result<(), StoreError>;

    /// Read-only snapshot; safe to call concurrently with an in-flight run.
    async fn load(&self, execution_id: ExecutionId) -> Result<Execution, StoreError>;

    /// Advance the order status (conditional on `expected_state`).
    async fn mark_status(
        &self,
        execution_id: ExecutionId,
        expected_state: &str,
        status: OrderStatus,
    ) -> Result<(), StoreError>;

    /// Record a completed step and transition to `next_state`
    /// (conditional on `expected_state`).
    async fn advance(
        &self,
        execution_id: ExecutionId,
        expected_state: &str,
        next_state: &str,
        entry: HistoryEntry,
        document: serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Record the final step and write the terminal result
    /// (conditional on `expected_state`; the result is write-once).
    async fn finish(
        &self,
        execution_id: ExecutionId,
        expected_state: &str,
        entry: HistoryEntry,
        document: serde_json::Value,
        result: ExecutionResult,
    ) -> Result<(), StoreError>;
}
