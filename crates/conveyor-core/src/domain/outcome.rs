//! Step outcome model: the common result format for executor invocations.
//!
//! Executors classify, the engine routes. A step finishes in exactly one of
//! three ways:
//!
//! - [`StepOutcome::Success`]: forward progress; the payload is merged into
//!   the execution's working document.
//! - [`StepOutcome::Failure`]: a named business failure (`"validation"`,
//!   `"payment"`). Routed via the state's routing table, never retried:
//!   retrying a semantic rejection cannot change the result.
//! - [`StepError`]: an infrastructure error. `Transient` errors are retried
//!   per the state's policy; `Fatal` (and exhausted transients without a
//!   failure edge) propagate and mark the whole execution failed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved outcome tag for successful steps.
pub const SUCCESS_TAG: &str = "success";

/// Reserved outcome tag the engine assigns to a transient failure whose
/// retry budget is exhausted. States route it explicitly or not at all.
pub const ERROR_TAG: &str = "error";

/// Tagged result of one executor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepOutcome {
    /// The step made forward progress. `data` is an object merged into the
    /// execution's working document (e.g. `validationResult`,
    /// `paymentResult`).
    Success { data: serde_json::Value },

    /// A named business failure. The tag selects the route; `details`
    /// travel with the execution for failure reporting.
    Failure {
        tag: String,
        details: serde_json::Value,
    },
}

impl StepOutcome {
    pub fn success(data: serde_json::Value) -> Self {
        Self::Success { data }
    }

    pub fn failure(tag: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Failure {
            tag: tag.into(),
            details,
        }
    }

    /// The tag used for route resolution.
    pub fn tag(&self) -> &str {
        match self {
            StepOutcome::Success { .. } => SUCCESS_TAG,
            StepOutcome::Failure { tag, .. } => tag,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success { .. })
    }
}

/// Classification of an infrastructure error raised by an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Timeout, throttling, service unavailable: worth retrying.
    Transient,

    /// Anything else: retrying cannot help, surface it to an operator.
    Fatal,
}

/// An infrastructure error from a step executor.
///
/// Semantic rejections (invalid order, declined card) are NOT errors; they
/// are [`StepOutcome::Failure`] values. `StepError` is reserved for the
/// machinery around the step failing.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct StepError {
    pub class: ErrorClass,
    pub message: String,
}

impl StepError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Transient,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Fatal,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class == ErrorClass::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_uses_the_reserved_tag() {
        let o = StepOutcome::success(serde_json::json!({"x": 1}));
        assert_eq!(o.tag(), SUCCESS_TAG);
        assert!(o.is_success());
    }

    #[test]
    fn failure_carries_its_own_tag() {
        let o = StepOutcome::failure("validation", serde_json::json!({"errors": []}));
        assert_eq!(o.tag(), "validation");
        assert!(!o.is_success());
    }

    #[test]
    fn outcome_roundtrip_json() {
        let o = StepOutcome::failure("payment", serde_json::json!({"reason": "declined"}));

        let s = serde_json::to_string(&o).unwrap();
        let back: StepOutcome = serde_json::from_str(&s).unwrap();
        assert_eq!(back, o);

        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["kind"], "FAILURE");
        assert_eq!(v["tag"], "payment");
    }

    #[test]
    fn step_error_classification() {
        assert!(StepError::transient("timeout").is_transient());
        assert!(!StepError::fatal("bug").is_transient());
        assert_eq!(StepError::transient("timeout").to_string(), "timeout");
    }
}
