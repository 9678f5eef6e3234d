//! Order model: the unit of work flowing through the workflow.
//!
//! Field names serialize in camelCase to match the order-submission event
//! schema delivered by the order queue (`orderId`, `userId`, `items`,
//! `totalAmount`). The engine never recomputes `total_amount`; validation
//! may reject mismatches but the value itself is owned upstream.

use serde::{Deserialize, Serialize};

use super::ids::OrderId;

/// One line of an order. Immutable within the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: u32,
    pub price: f64,
}

/// An order submission as received from the order queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
}

/// Order status, mutated only by the engine.
///
/// Transitions form a DAG:
/// - `Pending -> Validating -> Paying -> Completed`
/// - `Failed` is reachable from any non-terminal status (business failure
///   edges from Validating/Paying, plus the fatal-error path).
///
/// No edge re-enters a status already exited within the same execution.
/// Serialized SCREAMING_SNAKE_CASE to match the upstream record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Validating,
    Paying,
    Completed,
    Failed,
}

impl OrderStatus {
    /// Is this a terminal status (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    /// Is `next` a legal transition from this status?
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        match (self, next) {
            (OrderStatus::Pending, OrderStatus::Validating) => true,
            (OrderStatus::Validating, OrderStatus::Paying) => true,
            (OrderStatus::Paying, OrderStatus::Completed) => true,
            (from, OrderStatus::Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}
