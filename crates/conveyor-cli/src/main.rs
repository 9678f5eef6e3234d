//! Demo binary: runs the order workflow end to end against the in-memory
//! adapters and prints what happened to each order.
//!
//! Configuration via environment variables:
//! - `CONVEYOR_NOTIFY_TOPIC`: notification topic (default `order-notifications`)
//! - `CONVEYOR_DECLINE_RATE`: fraction of charges the mock gateway declines
//!   (default `0.0`)
//! - `RUST_LOG`: log filter (default `info`)

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use conveyor_core::domain::{EngineError, ExecutionResult, Order};
use conveyor_core::engine::{order_executors, order_workflow, OrderWorkflowDeps, WorkflowEngine};
use conveyor_core::impls::{
    InMemoryCatalog, InMemoryExecutionStore, InMemoryOrderStatusStore, MockPaymentGateway,
    RecordingSink,
};
use conveyor_core::ports::{Clock, Product, SystemClock, UlidGenerator};

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let topic = env_or("CONVEYOR_NOTIFY_TOPIC", "order-notifications");
    let decline_rate: f64 = env_or("CONVEYOR_DECLINE_RATE", "0.0").parse()?;
    tracing::info!(topic = %topic, decline_rate, "starting order workflow demo");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_product("laptop-15", Product { price: 1299.0, stock: 12 })
            .with_product("mouse-bt", Product { price: 39.5, stock: 200 })
            .with_product("usb-c-dock", Product { price: 129.0, stock: 0 }),
    );
    let gateway = Arc::new(MockPaymentGateway::new(clock.clone()).with_decline_rate(decline_rate));
    let order_store = Arc::new(InMemoryOrderStatusStore::new());
    let sink = Arc::new(RecordingSink::new());

    let deps = OrderWorkflowDeps {
        catalog,
        gateway,
        order_store: order_store.clone(),
        sink: sink.clone(),
        clock: clock.clone(),
        notification_topic: topic,
    };
    let registry = order_executors(&deps)?;
    let engine = WorkflowEngine::new(
        order_workflow(),
        Arc::new(registry),
        Arc::new(InMemoryExecutionStore::new()),
        clock.clone(),
        Arc::new(UlidGenerator::new(SystemClock)),
    )?;

    // A well-formed order, a redelivery of it, and two that must fail.
    let good: Order = serde_json::from_value(serde_json::json!({
        "orderId": "ord-1001",
        "userId": "user-42",
        "items": [
            {"productId": "laptop-15", "quantity": 1, "price": 1299.0},
            {"productId": "mouse-bt", "quantity": 2, "price": 39.5}
        ],
        "totalAmount": 1378.0
    }))?;
    let out_of_stock: Order = serde_json::from_value(serde_json::json!({
        "orderId": "ord-1002",
        "userId": "user-42",
        "items": [{"productId": "usb-c-dock", "quantity": 1, "price": 129.0}],
        "totalAmount": 129.0
    }))?;
    let unknown_product: Order = serde_json::from_value(serde_json::json!({
        "orderId": "ord-1003",
        "userId": "user-7",
        "items": [{"productId": "flux-capacitor", "quantity": 1, "price": 88.0}],
        "totalAmount": 88.0
    }))?;

    let first = engine.start(good.clone()).await?;

    // Redelivery of the same order while the first run is in flight.
    match engine.start(good).await {
        Ok(id) => println!("redelivery started a new execution: {id} (first run had already finished)"),
        Err(EngineError::DuplicateExecution(order_id)) => {
            println!("redelivery of {order_id} rejected: execution already in flight");
        }
        Err(err) => return Err(err.into()),
    }

    let mut execution_ids = vec![first];
    execution_ids.push(engine.start(out_of_stock).await?);
    execution_ids.push(engine.start(unknown_product).await?);

    for execution_id in execution_ids {
        let done = engine.await_terminal(execution_id).await?;
        let order_id = done.order_id().clone();
        match &done.result {
            Some(ExecutionResult::Completed { payload }) => {
                println!(
                    "{order_id}: COMPLETED (txn {})",
                    payload["paymentResult"]["transactionId"]
                );
            }
            Some(ExecutionResult::Failed { error }) => {
                println!(
                    "{order_id}: FAILED ({})",
                    error["failureReport"]["reason"]
                );
            }
            None => println!("{order_id}: still running"),
        }
        for entry in &done.history {
            println!("  {} (attempts: {})", entry.state, entry.attempts);
        }
        if let Some(status) = order_store.status_of(&order_id).await {
            println!("  order table: {status:?}");
        }
    }

    println!("notifications published:");
    for (topic, message) in sink.published().await {
        println!("  [{topic}] {message}");
    }

    Ok(())
}
