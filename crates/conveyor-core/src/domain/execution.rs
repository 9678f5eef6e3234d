//! Execution record: one workflow run for one order.
//!
//! Design:
//! - The record is the single source of truth for an execution. All state
//!   transitions happen through methods here so the invariants live in one
//!   place; the store only adds the conditional-update check around them.
//! - `history` is append-only: exactly one entry per state actually
//!   entered, ordered by completion time, never mutated after append.
//! - `result` is written at most once. A second write is rejected, not
//!   overwritten.
//! - `document` is the working document flowing through the steps. It
//!   starts as the order payload and each successful step merges its
//!   output into it (`validationResult`, `paymentResult`, ...), mirroring
//!   how the upstream event format accumulates fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::StoreError;
use super::ids::{ExecutionId, OrderId};
use super::order::{Order, OrderStatus};

/// What one state produced: the step output, or the error that ended it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StepRecord {
    Output(serde_json::Value),
    Error(serde_json::Value),
}

/// One audit-trail entry: a state that was entered, what it saw, and what
/// came out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub state: String,
    pub entered_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Executor invocations within this state (1 unless retried).
    pub attempts: u32,
    /// The working document as the state saw it.
    pub input: serde_json::Value,
    pub result: StepRecord,
}

/// Terminal payload, set exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionResult {
    Completed { payload: serde_json::Value },
    Failed { error: serde_json::Value },
}

impl ExecutionResult {
    /// The order status implied by this result.
    pub fn order_status(&self) -> OrderStatus {
        match self {
            ExecutionResult::Completed { .. } => OrderStatus::Completed,
            ExecutionResult::Failed { .. } => OrderStatus::Failed,
        }
    }
}

/// One workflow run for one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub execution_id: ExecutionId,
    pub order: Order,
    pub status: OrderStatus,
    pub current_state: String,
    pub document: serde_json::Value,
    pub history: Vec<HistoryEntry>,
    pub result: Option<ExecutionResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Execution {
    /// Create a fresh execution positioned at the workflow's start state.
    ///
    /// Errors only if the order cannot be serialized into the working
    /// document. The current `Order` shape cannot fail that way, but an
    /// execution must never start from a silently emptied document, so
    /// the error propagates rather than being swallowed.
    pub fn new(
        execution_id: ExecutionId,
        order: Order,
        start_state: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let document = serde_json::to_value(&order)?;
        Ok(Self {
            execution_id,
            order,
            status: OrderStatus::Pending,
            current_state: start_state.into(),
            document,
            history: Vec::new(),
            result: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order.order_id
    }

    /// Terminal executions have their result written; nothing moves after.
    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }

    /// Advance the order status along the DAG.
    pub fn mark_status(&mut self, status: OrderStatus, now: DateTime<Utc>) -> Result<(), StoreError> {
        if status == self.status {
            return Ok(());
        }
        if !self.status.can_transition_to(status) {
            return Err(StoreError::InvalidStatusTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    /// Record a completed step and move to the next state.
    pub fn advance(
        &mut self,
        next_state: impl Into<String>,
        entry: HistoryEntry,
        document: serde_json::Value,
    ) -> Result<(), StoreError> {
        if self.is_terminal() {
            return Err(StoreError::ResultAlreadyWritten(self.execution_id));
        }
        self.updated_at = entry.completed_at;
        self.history.push(entry);
        self.current_state = next_state.into();
        self.document = document;
        Ok(())
    }

    /// Record the final step and write the terminal result (at most once).
    ///
    /// The status is taken from the result, not routed through the DAG
    /// check: once a result exists the record must reflect it, whatever
    /// intermediate statuses were or were not marked along the way.
    pub fn finish(
        &mut self,
        entry: HistoryEntry,
        document: serde_json::Value,
        result: ExecutionResult,
    ) -> Result<(), StoreError> {
        if self.result.is_some() {
            return Err(StoreError::ResultAlreadyWritten(self.execution_id));
        }
        self.status = result.order_status();
        self.updated_at = entry.completed_at;
        self.history.push(entry);
        self.document = document;
        self.result = Some(result);
        Ok(())
    }
}
