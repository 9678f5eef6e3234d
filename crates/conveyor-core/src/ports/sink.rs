//! NotificationSink port: fire-and-forget terminal-outcome publishing.
//!
//! By the time a notification is published the order has already reached
//! its terminal business state, so publish failures are logged and never
//! escalated into failing the execution.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("publish to {topic:?} failed: {message}")]
pub struct PublishError {
    pub topic: String,
    pub message: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, topic: &str, message: &serde_json::Value) -> Result<(), PublishError>;
}
