//! The order-processing workflow: the concrete graph wired over the ports.
//!
//! Pipeline: validate -> charge -> persist COMPLETED -> notify. Business
//! failures from validation or payment detour through a failure-report
//! state, persist FAILED, and notify, so every accepted order ends in
//! exactly one of the two terminal statuses with a notification either way.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::order::OrderStatus;
use crate::domain::outcome::{ERROR_TAG, SUCCESS_TAG};
use crate::executors::{
    ExecutorRegistry, FailureReport, PersistOrderResult, ProcessPayment, PublishNotification,
    RegistryError, ValidateOrder,
};
use crate::ports::{Clock, NotificationSink, OrderStatusStore, PaymentGateway, ProductCatalog};

use super::definition::{Route, StateDef, WorkflowDefinition};
use super::retry::RetryPolicy;

pub const WORKFLOW_NAME: &str = "order-processing";

// State names, as they appear in execution records.
pub const VALIDATE_ORDER: &str = "ValidateOrder";
pub const PROCESS_PAYMENT: &str = "ProcessPayment";
pub const UPDATE_ORDER_STATUS: &str = "UpdateOrderStatus";
pub const NOTIFY_COMPLETION: &str = "NotifyCompletion";
pub const HANDLE_VALIDATION_ERROR: &str = "HandleValidationError";
pub const HANDLE_PAYMENT_ERROR: &str = "HandlePaymentError";
pub const MARK_ORDER_FAILED: &str = "MarkOrderFailed";
pub const NOTIFY_FAILURE: &str = "NotifyFailure";

// Executor registry names.
const VALIDATE: &str = "validate";
const CHARGE: &str = "charge";
const PERSIST_SUCCESS: &str = "persist-success";
const PERSIST_FAILURE: &str = "persist-failure";
const REPORT_FAILURE: &str = "report-failure";
const NOTIFY_SUCCESS: &str = "notify-completion";
const NOTIFY_FAILED: &str = "notify-failure";

/// The collaborators the order workflow runs against.
pub struct OrderWorkflowDeps {
    pub catalog: Arc<dyn ProductCatalog>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub order_store: Arc<dyn OrderStatusStore>,
    pub sink: Arc<dyn NotificationSink>,
    pub clock: Arc<dyn Clock>,
    pub notification_topic: String,
}

/// Build the executor registry for [`order_workflow`].
pub fn order_executors(deps: &OrderWorkflowDeps) -> Result<ExecutorRegistry, RegistryError> {
    let mut registry = ExecutorRegistry::new();
    registry.register(
        VALIDATE,
        Arc::new(ValidateOrder::new(deps.catalog.clone(), deps.clock.clone())),
    )?;
    registry.register(CHARGE, Arc::new(ProcessPayment::new(deps.gateway.clone())))?;
    registry.register(
        PERSIST_SUCCESS,
        Arc::new(PersistOrderResult::new(
            deps.order_store.clone(),
            OrderStatus::Pending,
            OrderStatus::Completed,
            deps.clock.clone(),
        )),
    )?;
    registry.register(
        PERSIST_FAILURE,
        Arc::new(PersistOrderResult::new(
            deps.order_store.clone(),
            OrderStatus::Pending,
            OrderStatus::Failed,
            deps.clock.clone(),
        )),
    )?;
    registry.register(REPORT_FAILURE, Arc::new(FailureReport))?;
    registry.register(
        NOTIFY_SUCCESS,
        Arc::new(PublishNotification::new(
            deps.sink.clone(),
            deps.notification_topic.clone(),
            OrderStatus::Completed,
        )),
    )?;
    registry.register(
        NOTIFY_FAILED,
        Arc::new(PublishNotification::new(
            deps.sink.clone(),
            deps.notification_topic.clone(),
            OrderStatus::Failed,
        )),
    )?;
    Ok(registry)
}

/// The order-processing graph.
///
/// Retry budgets: validation and payment back off exponentially from 2s;
/// the persist states from 1s. Payment gets the tightest budget because a
/// transient retry there means asking the gateway again (the idempotency
/// key makes that safe, but not free). The persist states declare no
/// `"error"` edge: if the order table stays unreachable past the budget
/// the execution fails fatally, which is an operational page, not a
/// customer-facing outcome.
pub fn order_workflow() -> WorkflowDefinition {
    WorkflowDefinition::new(WORKFLOW_NAME, VALIDATE_ORDER)
        .state(
            VALIDATE_ORDER,
            StateDef::new(VALIDATE, RetryPolicy::new(3, Duration::from_secs(2), 2.0))
                .marks(OrderStatus::Validating)
                .route(SUCCESS_TAG, Route::To(PROCESS_PAYMENT.into()))
                .route("validation", Route::To(HANDLE_VALIDATION_ERROR.into()))
                .route(ERROR_TAG, Route::To(HANDLE_VALIDATION_ERROR.into())),
        )
        .state(
            PROCESS_PAYMENT,
            StateDef::new(CHARGE, RetryPolicy::new(2, Duration::from_secs(2), 2.0))
                .marks(OrderStatus::Paying)
                .route(SUCCESS_TAG, Route::To(UPDATE_ORDER_STATUS.into()))
                .route("payment", Route::To(HANDLE_PAYMENT_ERROR.into()))
                .route(ERROR_TAG, Route::To(HANDLE_PAYMENT_ERROR.into())),
        )
        .state(
            UPDATE_ORDER_STATUS,
            StateDef::new(PERSIST_SUCCESS, RetryPolicy::new(3, Duration::from_secs(1), 2.0))
                .route(SUCCESS_TAG, Route::To(NOTIFY_COMPLETION.into())),
        )
        .state(
            NOTIFY_COMPLETION,
            StateDef::new(NOTIFY_SUCCESS, RetryPolicy::none())
                .route(SUCCESS_TAG, Route::TerminalSuccess),
        )
        .state(
            HANDLE_VALIDATION_ERROR,
            StateDef::new(REPORT_FAILURE, RetryPolicy::none())
                .route(SUCCESS_TAG, Route::To(MARK_ORDER_FAILED.into())),
        )
        .state(
            HANDLE_PAYMENT_ERROR,
            StateDef::new(REPORT_FAILURE, RetryPolicy::none())
                .route(SUCCESS_TAG, Route::To(MARK_ORDER_FAILED.into())),
        )
        .state(
            MARK_ORDER_FAILED,
            StateDef::new(PERSIST_FAILURE, RetryPolicy::new(3, Duration::from_secs(1), 2.0))
                .route(SUCCESS_TAG, Route::To(NOTIFY_FAILURE.into())),
        )
        .state(
            NOTIFY_FAILURE,
            StateDef::new(NOTIFY_FAILED, RetryPolicy::none())
                .route(SUCCESS_TAG, Route::TerminalFailure),
        )
}
