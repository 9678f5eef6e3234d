//! PersistOrderResult: write the terminal status to the order table.
//!
//! One type covers both arms of the workflow: registered once targeting
//! `COMPLETED` and once targeting `FAILED`. The write is a conditional
//! update and must be safe to re-run: the engine retries this step after
//! transient store errors, so a conflict reporting the row already at the
//! target status means our earlier write landed and counts as success.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::order::OrderStatus;
use crate::domain::outcome::{StepError, StepOutcome};
use crate::ports::{Clock, OrderStatusStore, UpdateError};

use super::{StepExecutor, StepInput};

pub struct PersistOrderResult {
    store: Arc<dyn OrderStatusStore>,
    /// Status the order row is expected to still hold (the order-entry
    /// handler writes rows as `PENDING`; the workflow is the only writer
    /// after that).
    expected: OrderStatus,
    target: OrderStatus,
    clock: Arc<dyn Clock>,
}

impl PersistOrderResult {
    pub fn new(
        store: Arc<dyn OrderStatusStore>,
        expected: OrderStatus,
        target: OrderStatus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            expected,
            target,
            clock,
        }
    }
}

#[async_trait]
impl StepExecutor for PersistOrderResult {
    async fn run(&self, input: &StepInput) -> Result<StepOutcome, StepError> {
        let order_id = &input.order.order_id;
        // Denormalized copy of the outcome travels with the status row.
        let payload = input.document.clone();

        let persisted = serde_json::json!({
            "persistResult": {
                "status": self.target,
                "persistedAt": self.clock.now(),
            }
        });

        match self
            .store
            .conditional_update(order_id, self.expected, self.target, &payload)
            .await
        {
            Ok(()) => Ok(StepOutcome::success(persisted)),
            Err(UpdateError::Conflict { actual }) if actual == self.target => {
                // Our own earlier write; re-run after a transient error.
                tracing::debug!(
                    order_id = %order_id,
                    status = ?self.target,
                    "order already at target status, treating persist as done"
                );
                Ok(StepOutcome::success(persisted))
            }
            Err(UpdateError::Conflict { actual }) => Err(StepError::fatal(format!(
                "order {order_id} is {actual:?}, expected {:?}: refusing to overwrite",
                self.expected
            ))),
            Err(UpdateError::Throttled) => Err(StepError::transient("order store throttled")),
            Err(UpdateError::Unavailable(message)) => Err(StepError::transient(format!(
                "order store unavailable: {message}"
            ))),
        }
    }
}
