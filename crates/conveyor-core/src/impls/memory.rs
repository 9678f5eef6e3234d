//! In-memory adapters for the store ports.
//!
//! These back the tests and the demo binary. They implement the same
//! conditional-update contract a real database adapter would, so code
//! exercised against them sees the same conflict behavior.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::execution::{Execution, ExecutionResult, HistoryEntry};
use crate::domain::ids::{ExecutionId, OrderId};
use crate::domain::order::OrderStatus;
use crate::domain::StoreError;
use crate::ports::{ExecutionStore, OrderStatusStore, UpdateError};

/// In-memory [`ExecutionStore`].
///
/// One lock guards both maps, so `create`'s dedup check and insert are
/// atomic, as are the conditional updates.
#[derive(Default)]
pub struct InMemoryExecutionStore {
    inner: Mutex<ExecutionStoreInner>,
}

#[derive(Default)]
struct ExecutionStoreInner {
    executions: HashMap<ExecutionId, Execution>,
    /// Latest execution per order; the dedup gate consults this.
    by_order: HashMap<OrderId, ExecutionId>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest execution recorded for an order, if any.
    pub async fn latest_for_order(&self, order_id: &OrderId) -> Option<Execution> {
        let inner = self.inner.lock().await;
        let execution_id = inner.by_order.get(order_id)?;
        inner.executions.get(execution_id).cloned()
    }
}

impl ExecutionStoreInner {
    fn get_mut(
        &mut self,
        execution_id: ExecutionId,
        expected_state: &str,
    ) -> Result<&mut Execution, StoreError> {
        let execution = self
            .executions
            .get_mut(&execution_id)
            .ok_or(StoreError::NotFound(execution_id))?;
        if execution.current_state != expected_state {
            return Err(StoreError::Conflict {
                execution_id,
                expected: expected_state.to_string(),
                actual: execution.current_state.clone(),
            });
        }
        Ok(execution)
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create(&self, execution: Execution) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let order_id = execution.order_id().clone();

        if let Some(existing_id) = inner.by_order.get(&order_id)
            && let Some(existing) = inner.executions.get(existing_id)
            && !existing.is_terminal()
        {
            return Err(StoreError::DuplicateExecution(order_id));
        }

        inner.by_order.insert(order_id, execution.execution_id);
        inner.executions.insert(execution.execution_id, execution);
        Ok(())
    }

    async fn load(&self, execution_id: ExecutionId) -> Result<Execution, StoreError> {
        self.inner
            .lock()
            .await
            .executions
            .get(&execution_id)
            .cloned()
            .ok_or(StoreError::NotFound(execution_id))
    }

    async fn mark_status(
        &self,
        execution_id: ExecutionId,
        expected_state: &str,
        status: OrderStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let execution = inner.get_mut(execution_id, expected_state)?;
        execution.mark_status(status, chrono::Utc::now())
    }

    async fn advance(
        &self,
        execution_id: ExecutionId,
        expected_state: &str,
        next_state: &str,
        entry: HistoryEntry,
        document: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let execution = inner.get_mut(execution_id, expected_state)?;
        execution.advance(next_state, entry, document)
    }

    async fn finish(
        &self,
        execution_id: ExecutionId,
        expected_state: &str,
        entry: HistoryEntry,
        document: serde_json::Value,
        result: ExecutionResult,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let execution = inner.get_mut(execution_id, expected_state)?;
        execution.finish(entry, document, result)
    }
}

/// In-memory [`OrderStatusStore`].
///
/// Rows absent from the table read as `PENDING`, matching a table where
/// the order-entry handler has already written the row. Errors can be
/// queued with [`inject_failure`](Self::inject_failure) to exercise the
/// retry paths.
#[derive(Default)]
pub struct InMemoryOrderStatusStore {
    rows: Mutex<HashMap<OrderId, OrderRow>>,
    injected: Mutex<VecDeque<UpdateError>>,
}

#[derive(Debug, Clone)]
struct OrderRow {
    status: OrderStatus,
    payload: serde_json::Value,
}

impl InMemoryOrderStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error to be returned by the next `conditional_update` call.
    pub async fn inject_failure(&self, err: UpdateError) {
        self.injected.lock().await.push_back(err);
    }

    pub async fn status_of(&self, order_id: &OrderId) -> Option<OrderStatus> {
        self.rows.lock().await.get(order_id).map(|row| row.status)
    }

    pub async fn payload_of(&self, order_id: &OrderId) -> Option<serde_json::Value> {
        self.rows
            .lock()
            .await
            .get(order_id)
            .map(|row| row.payload.clone())
    }
}

#[async_trait]
impl OrderStatusStore for InMemoryOrderStatusStore {
    async fn conditional_update(
        &self,
        order_id: &OrderId,
        expected: OrderStatus,
        target: OrderStatus,
        payload: &serde_json::Value,
    ) -> Result<(), UpdateError> {
        if let Some(err) = self.injected.lock().await.pop_front() {
            return Err(err);
        }

        let mut rows = self.rows.lock().await;
        let actual = rows
            .get(order_id)
            .map(|row| row.status)
            .unwrap_or(OrderStatus::Pending);
        if actual != expected {
            return Err(UpdateError::Conflict { actual });
        }
        rows.insert(
            order_id.clone(),
            OrderRow {
                status: target,
                payload: payload.clone(),
            },
        );
        Ok(())
    }
}
