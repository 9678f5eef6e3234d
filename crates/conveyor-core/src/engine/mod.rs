//! Workflow engine: definitions, retry policies, and the driver loop.

pub mod definition;
mod engine;
pub mod retry;
pub mod workflow;

pub use self::definition::{BuildError, Route, StateDef, WorkflowDefinition};
pub use self::engine::WorkflowEngine;
pub use self::retry::RetryPolicy;
pub use self::workflow::{order_executors, order_workflow, OrderWorkflowDeps};
