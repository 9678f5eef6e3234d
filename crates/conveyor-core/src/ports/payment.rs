//! PaymentGateway port: the opaque payment collaborator.
//!
//! The engine treats payment as a black box; exactly-once charge semantics
//! are the gateway integration's responsibility, driven by the
//! caller-supplied idempotency key (the order ID).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ids::OrderId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub order_id: OrderId,
    pub user_id: String,
    pub amount: f64,
    /// Deduplication key for the gateway; equal to the order ID so a
    /// redelivered or retried charge collapses into one transaction.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub transaction_id: String,
    pub processed_at: DateTime<Utc>,
    pub amount: f64,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// Semantic rejection (insufficient funds, card declined). Never
    /// retried: the answer will not change.
    #[error("payment declined: {reason}")]
    Declined { reason: String },

    /// Transport-level trouble reaching the gateway. Transient.
    #[error("payment gateway transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError>;
}
