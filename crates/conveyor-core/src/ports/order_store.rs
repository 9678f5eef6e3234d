//! OrderStatusStore port: the denormalized order table.
//!
//! The upstream order-entry handler writes the order row with status
//! `PENDING`; the workflow's persist steps move it to a terminal status
//! with a conditional update so a retried write cannot clobber a
//! concurrent one.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ids::OrderId;
use crate::domain::order::OrderStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// The row was not in the expected prior status. Carries what was
    /// actually there so callers can recognize their own earlier write
    /// (idempotent retry) versus a genuine conflict.
    #[error("conditional update conflict: order is {actual:?}")]
    Conflict { actual: OrderStatus },

    /// Store throttling. Transient; retried per the state's policy.
    #[error("order store throttled")]
    Throttled,

    #[error("order store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait OrderStatusStore: Send + Sync {
    /// Set `order_id` to `target` iff it is currently `expected`, storing a
    /// denormalized copy of the outcome alongside.
    async fn conditional_update(
        &self,
        order_id: &OrderId,
        expected: OrderStatus,
        target: OrderStatus,
        payload: &serde_json::Value,
    ) -> Result<(), UpdateError>;
}
