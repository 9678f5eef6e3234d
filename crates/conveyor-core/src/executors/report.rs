//! FailureReport: lift a routed failure into a customer-facing report.
//!
//! Pure data transform, cannot fail. The engine stores the routed failure
//! under the document's `error` key; this step turns it into a
//! `failureReport` with a human-readable reason, which MarkOrderFailed
//! persists and NotifyFailure publishes. Customers see that reason,
//! never a stack trace or an infrastructure error.

use async_trait::async_trait;

use crate::domain::outcome::{StepError, StepOutcome};

use super::{StepExecutor, StepInput};

pub struct FailureReport;

impl FailureReport {
    fn reason(error: &serde_json::Value) -> String {
        let details = &error["details"];

        // Validation failures carry an error list; join it.
        if let Some(errors) = details["errors"].as_array() {
            let joined: Vec<&str> = errors.iter().filter_map(|e| e.as_str()).collect();
            if !joined.is_empty() {
                return joined.join("; ");
            }
        }
        // Payment failures carry a single reason.
        if let Some(reason) = details["reason"].as_str() {
            return reason.to_string();
        }
        // Exhausted-retry failures carry the last error message.
        if let Some(message) = details["message"].as_str() {
            return message.to_string();
        }
        "unknown failure".to_string()
    }
}

#[async_trait]
impl StepExecutor for FailureReport {
    async fn run(&self, input: &StepInput) -> Result<StepOutcome, StepError> {
        let error = input
            .document
            .get("error")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let source = error["tag"].as_str().unwrap_or("unknown").to_string();
        let reason = Self::reason(&error);

        Ok(StepOutcome::success(serde_json::json!({
            "failureReport": {
                "source": source,
                "reason": reason,
            }
        })))
    }
}
