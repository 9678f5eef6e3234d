//! Workflow definition: a static graph of named states.
//!
//! Each state declares its executor, its retry policy, a routing table
//! (outcome tag -> route) and optionally the order status it marks on
//! entry. The definition is plain data; the engine interprets it, which
//! keeps the workflow open for extension without touching the engine.
//!
//! Reserved tags: `"success"` (successful step) and `"error"` (transient
//! failure whose retry budget ran out). A state that declares no route for
//! `"error"` propagates such failures fatally.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::order::OrderStatus;
use crate::executors::ExecutorRegistry;

use super::retry::RetryPolicy;

/// Where an outcome tag sends the execution next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Transition to another state.
    To(String),

    /// Finish the execution with a `COMPLETED` result.
    TerminalSuccess,

    /// Finish the execution with a `FAILED` result (business failure,
    /// fully handled within the workflow).
    TerminalFailure,
}

/// One state of the workflow graph.
#[derive(Debug, Clone)]
pub struct StateDef {
    pub executor: String,
    pub retry: RetryPolicy,
    pub routes: HashMap<String, Route>,
    /// Order status the execution takes when this state is entered
    /// (intermediate statuses only; terminal statuses come from the
    /// execution result).
    pub marks_status: Option<OrderStatus>,
}

impl StateDef {
    pub fn new(executor: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            executor: executor.into(),
            retry,
            routes: HashMap::new(),
            marks_status: None,
        }
    }

    pub fn route(mut self, tag: impl Into<String>, route: Route) -> Self {
        self.routes.insert(tag.into(), route);
        self
    }

    pub fn marks(mut self, status: OrderStatus) -> Self {
        self.marks_status = Some(status);
        self
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("start state {0:?} is not defined")]
    MissingStartState(String),

    #[error("state {state:?} routes tag {tag:?} to undefined state {target:?}")]
    DanglingRoute {
        state: String,
        tag: String,
        target: String,
    },

    #[error("state {state:?} references unregistered executor {executor:?}")]
    MissingExecutor { state: String, executor: String },
}

/// A named, statically defined workflow graph.
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    name: String,
    start_state: String,
    states: HashMap<String, StateDef>,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>, start_state: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_state: start_state.into(),
            states: HashMap::new(),
        }
    }

    pub fn state(mut self, name: impl Into<String>, def: StateDef) -> Self {
        self.states.insert(name.into(), def);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_state(&self) -> &str {
        &self.start_state
    }

    pub fn get(&self, state: &str) -> Option<&StateDef> {
        self.states.get(state)
    }

    /// Fail-fast check run at engine construction: every route must point
    /// at a defined state and every executor must be registered. A
    /// misconfigured graph should refuse to start, not strand executions
    /// at runtime.
    pub fn validate(&self, registry: &ExecutorRegistry) -> Result<(), BuildError> {
        if !self.states.contains_key(&self.start_state) {
            return Err(BuildError::MissingStartState(self.start_state.clone()));
        }
        for (name, def) in &self.states {
            if !registry.contains(&def.executor) {
                return Err(BuildError::MissingExecutor {
                    state: name.clone(),
                    executor: def.executor.clone(),
                });
            }
            for (tag, route) in &def.routes {
                if let Route::To(target) = route
                    && !self.states.contains_key(target)
                {
                    return Err(BuildError::DanglingRoute {
                        state: name.clone(),
                        tag: tag.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
