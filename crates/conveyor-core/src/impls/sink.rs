//! Notification sink that records every published message.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{NotificationSink, PublishError};

/// Records every published message. For tests and the demo binary.
#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn publish(&self, topic: &str, message: &serde_json::Value) -> Result<(), PublishError> {
        self.published
            .lock()
            .await
            .push((topic.to_string(), message.clone()));
        Ok(())
    }
}
