//! PublishNotification: fire-and-forget terminal-outcome notification.
//!
//! Strictly best-effort. The order reached its terminal business state
//! before this step runs, so a sink failure is logged at `warn!` and the
//! step still succeeds: it must never drag a completed order into the
//! failure path.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::order::OrderStatus;
use crate::domain::outcome::{StepError, StepOutcome};
use crate::ports::NotificationSink;

use super::{StepExecutor, StepInput};

pub struct PublishNotification {
    sink: Arc<dyn NotificationSink>,
    topic: String,
    status: OrderStatus,
}

impl PublishNotification {
    pub fn new(sink: Arc<dyn NotificationSink>, topic: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            sink,
            topic: topic.into(),
            status,
        }
    }
}

#[async_trait]
impl StepExecutor for PublishNotification {
    async fn run(&self, input: &StepInput) -> Result<StepOutcome, StepError> {
        let order = &input.order;
        let mut message = serde_json::json!({
            "orderId": order.order_id,
            "userId": order.user_id,
            "status": self.status,
        });
        if self.status == OrderStatus::Failed {
            let reason = input.document["failureReport"]["reason"]
                .as_str()
                .unwrap_or("unknown failure");
            message["reason"] = serde_json::Value::String(reason.to_string());
        }

        let delivered = match self.sink.publish(&self.topic, &message).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    order_id = %order.order_id,
                    topic = %self.topic,
                    error = %err,
                    "notification publish failed, continuing without it"
                );
                false
            }
        };

        Ok(StepOutcome::success(serde_json::json!({
            "notification": {
                "topic": self.topic,
                "delivered": delivered,
            }
        })))
    }
}
