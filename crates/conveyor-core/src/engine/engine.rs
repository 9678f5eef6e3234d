//! The workflow engine: drives executions through the state graph.
//!
//! Scheduling model:
//! - Each execution runs on its own spawned task, one state at a time;
//!   there are no parallel branches within an execution.
//! - Many executions run concurrently. The engine keeps no shared mutable
//!   state of its own: the execution store is the source of truth, and
//!   every transition is a conditional update against it. If two engine
//!   instances race on the same execution, exactly one write wins; the
//!   loser observes the conflict and stops.
//! - Between states the engine holds nothing but the execution ID, so a
//!   multi-second retry backoff costs a timer, not a worker.
//!
//! There is no cancellation API: once `start` succeeds the execution runs
//! to a terminal state (or to a fatal failure, which also terminates it).

use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::{EngineError, StoreError};
use crate::domain::execution::{Execution, ExecutionResult, HistoryEntry, StepRecord};
use crate::domain::ids::ExecutionId;
use crate::domain::order::Order;
use crate::domain::outcome::{ERROR_TAG, StepError, StepOutcome};
use crate::executors::{ExecutorRegistry, StepExecutor, StepInput};
use crate::ports::{Clock, ExecutionStore, IdGenerator};

use super::definition::{BuildError, Route, StateDef, WorkflowDefinition};

const TERMINAL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What one `step` call did to the execution.
enum Progress {
    /// Moved to the next state; keep going.
    Advanced,

    /// Reached a terminal state; done.
    Terminal,

    /// Lost a conditional update to a concurrent advance; the winner
    /// continues this execution, we stop.
    Lost,
}

pub struct WorkflowEngine {
    definition: WorkflowDefinition,
    executors: Arc<ExecutorRegistry>,
    store: Arc<dyn ExecutionStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl WorkflowEngine {
    /// Build an engine over a validated definition. Fails fast on a
    /// misconfigured graph instead of stranding executions at runtime.
    pub fn new(
        definition: WorkflowDefinition,
        executors: Arc<ExecutorRegistry>,
        store: Arc<dyn ExecutionStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Arc<Self>, BuildError> {
        definition.validate(&executors)?;
        Ok(Arc::new(Self {
            definition,
            executors,
            store,
            clock,
            ids,
        }))
    }

    /// Start a new execution for `order` and return its ID immediately.
    ///
    /// Deduplicates on the order ID: if a non-terminal execution already
    /// exists for this order (queue redelivery), the call is rejected with
    /// [`EngineError::DuplicateExecution`] rather than silently starting a
    /// second run; that is what prevents double charges. An order whose
    /// previous execution already finished may be re-driven; it gets a
    /// fresh execution ID.
    ///
    /// Business failures are never reported here: the caller learns the
    /// outcome from the execution record (and the notification sink).
    pub async fn start(self: &Arc<Self>, order: Order) -> Result<ExecutionId, EngineError> {
        let execution_id = self.ids.execution_id();
        let execution = Execution::new(
            execution_id,
            order,
            self.definition.start_state(),
            self.clock.now(),
        )
        .map_err(|err| EngineError::InvalidOrder(err.to_string()))?;
        let order_id = execution.order_id().clone();

        self.store.create(execution).await.map_err(|err| match err {
            StoreError::DuplicateExecution(order_id) => EngineError::DuplicateExecution(order_id),
            other => EngineError::Store(other),
        })?;

        tracing::info!(
            execution_id = %execution_id,
            order_id = %order_id,
            workflow = %self.definition.name(),
            "execution started"
        );

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run(execution_id).await;
        });

        Ok(execution_id)
    }

    /// Read-only snapshot of an execution; safe concurrently with the run.
    pub async fn get_status(&self, execution_id: ExecutionId) -> Result<Execution, EngineError> {
        Ok(self.store.load(execution_id).await?)
    }

    /// Poll until the execution reaches a terminal state and return it.
    pub async fn await_terminal(&self, execution_id: ExecutionId) -> Result<Execution, EngineError> {
        loop {
            let execution = self.store.load(execution_id).await?;
            if execution.is_terminal() {
                return Ok(execution);
            }
            tokio::time::sleep(TERMINAL_POLL_INTERVAL).await;
        }
    }

    /// Drive the execution until it terminates or this instance loses a
    /// conditional update.
    async fn run(&self, execution_id: ExecutionId) {
        loop {
            match self.step(execution_id).await {
                Ok(Progress::Advanced) => continue,
                Ok(Progress::Terminal) => break,
                Ok(Progress::Lost) => {
                    tracing::warn!(
                        execution_id = %execution_id,
                        "lost conditional update to a concurrent advance, yielding"
                    );
                    break;
                }
                Err(err) => {
                    // Fatal: configuration error or unclassified failure.
                    // Mark the execution failed with the raw error so it
                    // surfaces as an operational problem, not a silent drop.
                    tracing::error!(
                        execution_id = %execution_id,
                        error = %err,
                        "fatal workflow error, marking execution failed"
                    );
                    if let Err(store_err) = self.mark_fatal(execution_id, &err).await {
                        tracing::error!(
                            execution_id = %execution_id,
                            error = %store_err,
                            "could not record fatal outcome"
                        );
                    }
                    break;
                }
            }
        }
    }

    /// Execute the current state once (with retries) and apply its route.
    async fn step(&self, execution_id: ExecutionId) -> Result<Progress, EngineError> {
        let execution = self.store.load(execution_id).await?;
        if execution.is_terminal() {
            return Ok(Progress::Terminal);
        }

        let state_name = execution.current_state.clone();
        let state = self
            .definition
            .get(&state_name)
            .ok_or_else(|| EngineError::UnknownState(state_name.clone()))?;
        let executor = self
            .executors
            .get(&state.executor)
            .ok_or_else(|| EngineError::ExecutorNotFound(state.executor.clone()))?;

        // Declared status transition happens on entry, before the step
        // runs, so concurrent readers see e.g. VALIDATING while the
        // validation is in flight.
        if let Some(status) = state.marks_status {
            match self.store.mark_status(execution_id, &state_name, status).await {
                Ok(()) => {}
                Err(StoreError::Conflict { .. }) => return Ok(Progress::Lost),
                Err(err) => return Err(err.into()),
            }
        }

        let entered_at = self.clock.now();
        let input = StepInput::from_execution(&execution);
        tracing::info!(execution_id = %execution_id, state = %state_name, "entering state");

        let (attempts, result) = self
            .execute_with_retry(&state_name, state, executor.as_ref(), &input)
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                if !err.is_transient() || !state.routes.contains_key(ERROR_TAG) {
                    // Unclassified failure, or a state with no failure
                    // edge: propagate as fatal.
                    return Err(EngineError::FatalStep {
                        state: state_name,
                        attempts,
                        message: err.to_string(),
                    });
                }
                // Retry budget exhausted on a transient error: becomes a
                // routed failure on the state's declared failure edge.
                StepOutcome::failure(
                    ERROR_TAG,
                    serde_json::json!({ "message": err.to_string(), "attempts": attempts }),
                )
            }
        };

        let tag = outcome.tag().to_string();
        let route = state
            .routes
            .get(&tag)
            .cloned()
            .ok_or_else(|| EngineError::UnroutedOutcome {
                state: state_name.clone(),
                tag: tag.clone(),
            })?;

        let (document, record) = apply_outcome(&execution.document, &outcome);
        let entry = HistoryEntry {
            state: state_name.clone(),
            entered_at,
            completed_at: self.clock.now(),
            attempts,
            input: execution.document.clone(),
            result: record,
        };

        let applied = match &route {
            Route::To(next_state) => {
                self.store
                    .advance(execution_id, &state_name, next_state, entry, document)
                    .await
            }
            Route::TerminalSuccess => {
                let result = ExecutionResult::Completed {
                    payload: document.clone(),
                };
                self.store
                    .finish(execution_id, &state_name, entry, document, result)
                    .await
            }
            Route::TerminalFailure => {
                let result = ExecutionResult::Failed {
                    error: document.clone(),
                };
                self.store
                    .finish(execution_id, &state_name, entry, document, result)
                    .await
            }
        };

        match applied {
            Ok(()) => match route {
                Route::To(next_state) => {
                    tracing::info!(
                        execution_id = %execution_id,
                        from = %state_name,
                        to = %next_state,
                        tag = %tag,
                        "state transition"
                    );
                    Ok(Progress::Advanced)
                }
                Route::TerminalSuccess | Route::TerminalFailure => {
                    tracing::info!(
                        execution_id = %execution_id,
                        state = %state_name,
                        tag = %tag,
                        "execution reached a terminal state"
                    );
                    Ok(Progress::Terminal)
                }
            },
            Err(StoreError::Conflict { .. }) => Ok(Progress::Lost),
            Err(err) => Err(err.into()),
        }
    }

    /// Invoke the executor, retrying transient errors within the state's
    /// budget. Returns the number of attempts actually made.
    async fn execute_with_retry(
        &self,
        state_name: &str,
        state: &StateDef,
        executor: &dyn StepExecutor,
        input: &StepInput,
    ) -> (u32, Result<StepOutcome, StepError>) {
        let policy = &state.retry;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match executor.run(input).await {
                Ok(outcome) => return (attempts, Ok(outcome)),
                Err(err) if err.is_transient() && attempts < policy.max_attempts => {
                    let delay = policy.next_delay(attempts);
                    tracing::warn!(
                        execution_id = %input.execution_id,
                        state = %state_name,
                        attempt = attempts,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient step failure, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return (attempts, Err(err)),
            }
        }
    }

    /// Terminate an execution with the raw fatal error recorded.
    async fn mark_fatal(&self, execution_id: ExecutionId, err: &EngineError) -> Result<(), StoreError> {
        let execution = self.store.load(execution_id).await?;
        if execution.is_terminal() {
            return Ok(());
        }
        let now = self.clock.now();
        let error = serde_json::json!({ "fatal": err.to_string() });
        let entry = HistoryEntry {
            state: execution.current_state.clone(),
            entered_at: now,
            completed_at: now,
            attempts: 0,
            input: execution.document.clone(),
            result: StepRecord::Error(error.clone()),
        };
        self.store
            .finish(
                execution_id,
                &execution.current_state,
                entry,
                execution.document.clone(),
                ExecutionResult::Failed { error },
            )
            .await
    }
}

/// Fold a step outcome into the working document.
///
/// Success data merges shallowly (each step contributes its own top-level
/// keys, e.g. `validationResult`); a failure lands under the `error` key
/// so downstream failure-handling states can read it.
fn apply_outcome(
    document: &serde_json::Value,
    outcome: &StepOutcome,
) -> (serde_json::Value, StepRecord) {
    let mut document = document.clone();
    match outcome {
        StepOutcome::Success { data } => {
            if let (Some(doc), Some(add)) = (document.as_object_mut(), data.as_object()) {
                for (key, value) in add {
                    doc.insert(key.clone(), value.clone());
                }
            }
            (document, StepRecord::Output(data.clone()))
        }
        StepOutcome::Failure { tag, details } => {
            let error = serde_json::json!({ "tag": tag, "details": details });
            if let Some(doc) = document.as_object_mut() {
                doc.insert("error".to_string(), error.clone());
            }
            (document, StepRecord::Error(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Order, OrderStatus};
    use crate::engine::definition::{Route, StateDef};
    use crate::engine::retry::RetryPolicy;
    use crate::impls::InMemoryExecutionStore;
    use crate::ports::{SystemClock, UlidGenerator};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn order(id: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "orderId": id, "userId": "u1",
            "items": [{"productId": "p1", "quantity": 1, "price": 10.0}],
            "totalAmount": 10.0
        }))
        .unwrap()
    }

    /// Executor that fails transiently `failures` times, then succeeds.
    struct FlakyExecutor {
        remaining_failures: AtomicU32,
        calls: AtomicU32,
    }

    impl FlakyExecutor {
        fn new(failures: u32) -> Self {
            Self {
                remaining_failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl StepExecutor for FlakyExecutor {
        async fn run(&self, _input: &StepInput) -> Result<StepOutcome, StepError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.remaining_failures.load(Ordering::SeqCst);
            if left > 0 {
                self.remaining_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(StepError::transient(format!("flaky (left={left})")));
            }
            Ok(StepOutcome::success(serde_json::json!({"done": true})))
        }
    }

    struct FatalExecutor;

    #[async_trait]
    impl StepExecutor for FatalExecutor {
        async fn run(&self, _input: &StepInput) -> Result<StepOutcome, StepError> {
            Err(StepError::fatal("unclassified explosion"))
        }
    }

    struct OddTagExecutor;

    #[async_trait]
    impl StepExecutor for OddTagExecutor {
        async fn run(&self, _input: &StepInput) -> Result<StepOutcome, StepError> {
            Ok(StepOutcome::failure("mystery", serde_json::json!({})))
        }
    }

    fn engine_with(
        definition: WorkflowDefinition,
        registry: ExecutorRegistry,
    ) -> Arc<WorkflowEngine> {
        WorkflowEngine::new(
            definition,
            Arc::new(registry),
            Arc::new(InMemoryExecutionStore::new()),
            Arc::new(SystemClock),
            Arc::new(UlidGenerator::new(SystemClock)),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_within_budget() {
        let flaky = Arc::new(FlakyExecutor::new(2));
        let mut registry = ExecutorRegistry::new();
        registry.register("flaky", flaky.clone()).unwrap();

        let definition = WorkflowDefinition::new("wf", "Only").state(
            "Only",
            StateDef::new("flaky", RetryPolicy::new(3, Duration::from_secs(2), 2.0))
                .route("success", Route::TerminalSuccess),
        );

        let engine = engine_with(definition, registry);
        let id = engine.start(order("o1")).await.unwrap();
        let done = engine.await_terminal(id).await.unwrap();

        assert!(matches!(done.result, Some(ExecutionResult::Completed { .. })));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(done.history.len(), 1);
        assert_eq!(done.history[0].attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_take_the_declared_failure_edge() {
        let flaky = Arc::new(FlakyExecutor::new(10));
        let mut registry = ExecutorRegistry::new();
        registry.register("flaky", flaky.clone()).unwrap();

        let definition = WorkflowDefinition::new("wf", "Only").state(
            "Only",
            StateDef::new("flaky", RetryPolicy::new(2, Duration::from_secs(2), 2.0))
                .route("success", Route::TerminalSuccess)
                .route(ERROR_TAG, Route::TerminalFailure),
        );

        let engine = engine_with(definition, registry);
        let id = engine.start(order("o1")).await.unwrap();
        let done = engine.await_terminal(id).await.unwrap();

        assert!(matches!(done.result, Some(ExecutionResult::Failed { .. })));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        assert_eq!(done.document["error"]["tag"], ERROR_TAG);
        assert_eq!(done.document["error"]["details"]["attempts"], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_without_a_failure_edge_are_fatal() {
        let flaky = Arc::new(FlakyExecutor::new(10));
        let mut registry = ExecutorRegistry::new();
        registry.register("flaky", flaky).unwrap();

        let definition = WorkflowDefinition::new("wf", "Only").state(
            "Only",
            StateDef::new("flaky", RetryPolicy::new(2, Duration::from_secs(2), 2.0))
                .route("success", Route::TerminalSuccess),
        );

        let engine = engine_with(definition, registry);
        let id = engine.start(order("o1")).await.unwrap();
        let done = engine.await_terminal(id).await.unwrap();

        assert_eq!(done.status, OrderStatus::Failed);
        match done.result {
            Some(ExecutionResult::Failed { error }) => {
                let fatal = error["fatal"].as_str().unwrap();
                assert!(fatal.contains("fatal failure in state \"Only\""));
            }
            other => panic!("expected a fatal failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let mut registry = ExecutorRegistry::new();
        registry.register("fatal", Arc::new(FatalExecutor)).unwrap();

        let definition = WorkflowDefinition::new("wf", "Only").state(
            "Only",
            StateDef::new("fatal", RetryPolicy::new(3, Duration::from_secs(2), 2.0))
                .route("success", Route::TerminalSuccess)
                .route(ERROR_TAG, Route::TerminalFailure),
        );

        let engine = engine_with(definition, registry);
        let id = engine.start(order("o1")).await.unwrap();
        let done = engine.await_terminal(id).await.unwrap();

        // Fatal bypasses both the retry budget and the error edge.
        match done.result {
            Some(ExecutionResult::Failed { error }) => {
                assert!(error["fatal"].as_str().unwrap().contains("after 1 attempt(s)"));
                assert!(error["fatal"].as_str().unwrap().contains("unclassified explosion"));
            }
            other => panic!("expected a fatal failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unrouted_business_outcome_is_a_configuration_error() {
        let mut registry = ExecutorRegistry::new();
        registry.register("odd", Arc::new(OddTagExecutor)).unwrap();

        let definition = WorkflowDefinition::new("wf", "Only").state(
            "Only",
            StateDef::new("odd", RetryPolicy::none()).route("success", Route::TerminalSuccess),
        );

        let engine = engine_with(definition, registry);
        let id = engine.start(order("o1")).await.unwrap();
        let done = engine.await_terminal(id).await.unwrap();

        // Never silently dropped: the execution fails with the raw error.
        match done.result {
            Some(ExecutionResult::Failed { error }) => {
                let fatal = error["fatal"].as_str().unwrap();
                assert!(fatal.contains("no route for outcome tag \"mystery\""));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_start_is_rejected_while_in_flight() {
        // An executor that never finishes keeps the execution non-terminal.
        struct StuckExecutor;

        #[async_trait]
        impl StepExecutor for StuckExecutor {
            async fn run(&self, _input: &StepInput) -> Result<StepOutcome, StepError> {
                std::future::pending().await
            }
        }

        let mut registry = ExecutorRegistry::new();
        registry.register("stuck", Arc::new(StuckExecutor)).unwrap();

        let definition = WorkflowDefinition::new("wf", "Only").state(
            "Only",
            StateDef::new("stuck", RetryPolicy::none()).route("success", Route::TerminalSuccess),
        );

        let engine = engine_with(definition, registry);
        engine.start(order("o1")).await.unwrap();

        let err = engine.start(order("o1")).await.unwrap_err();
        assert!(matches!(err, EngineError::DuplicateExecution(id) if id.as_str() == "o1"));
    }

    #[tokio::test]
    async fn terminal_execution_may_be_redriven() {
        let mut registry = ExecutorRegistry::new();
        registry
            .register("flaky", Arc::new(FlakyExecutor::new(0)))
            .unwrap();

        let definition = WorkflowDefinition::new("wf", "Only").state(
            "Only",
            StateDef::new("flaky", RetryPolicy::none()).route("success", Route::TerminalSuccess),
        );

        let engine = engine_with(definition, registry);
        let first = engine.start(order("o1")).await.unwrap();
        engine.await_terminal(first).await.unwrap();

        let second = engine.start(order("o1")).await.unwrap();
        assert_ne!(first, second);
        engine.await_terminal(second).await.unwrap();
    }

    #[tokio::test]
    async fn get_status_is_stable_after_terminal() {
        let mut registry = ExecutorRegistry::new();
        registry
            .register("flaky", Arc::new(FlakyExecutor::new(0)))
            .unwrap();

        let definition = WorkflowDefinition::new("wf", "A")
            .state(
                "A",
                StateDef::new("flaky", RetryPolicy::none()).route("success", Route::To("B".into())),
            )
            .state(
                "B",
                StateDef::new("flaky", RetryPolicy::none()).route("success", Route::TerminalSuccess),
            );

        let engine = engine_with(definition, registry);
        let id = engine.start(order("o1")).await.unwrap();
        let done = engine.await_terminal(id).await.unwrap();

        assert_eq!(done.history.len(), 2);
        let again = engine.get_status(id).await.unwrap();
        assert_eq!(again.history.len(), 2);
        assert_eq!(
            done.history.iter().map(|e| e.state.as_str()).collect::<Vec<_>>(),
            again.history.iter().map(|e| e.state.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn apply_outcome_merges_success_and_files_errors() {
        let document = serde_json::json!({"orderId": "o1"});

        let (merged, record) = apply_outcome(
            &document,
            &StepOutcome::success(serde_json::json!({"paymentResult": {"transactionId": "t1"}})),
        );
        assert_eq!(merged["orderId"], "o1");
        assert_eq!(merged["paymentResult"]["transactionId"], "t1");
        assert!(matches!(record, StepRecord::Output(_)));

        let (with_error, record) = apply_outcome(
            &document,
            &StepOutcome::failure("validation", serde_json::json!({"errors": ["x"]})),
        );
        assert_eq!(with_error["error"]["tag"], "validation");
        assert!(matches!(record, StepRecord::Error(_)));
    }
}
