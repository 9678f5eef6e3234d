//! Mock payment gateway.
//!
//! Stands in for the real payment provider in tests and the demo binary.
//! Declines a configurable fraction of charges with a randomly chosen
//! reason; honors idempotency keys by replaying the receipt of a charge
//! it has already accepted.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::ports::{ChargeReceipt, ChargeRequest, Clock, PaymentError, PaymentGateway};

const PROVIDER: &str = "mock-payment-gateway";

const DECLINE_REASONS: &[&str] = &[
    "Insufficient funds",
    "Card declined",
    "Payment gateway timeout",
    "Invalid card details",
    "Bank authorization failed",
];

pub struct MockPaymentGateway {
    clock: Arc<dyn Clock>,
    /// Fraction of fresh charges declined, in `[0.0, 1.0]`.
    decline_rate: f64,
    /// Accepted charges by idempotency key; repeats replay the receipt.
    accepted: Mutex<HashMap<String, ChargeReceipt>>,
    seen: Mutex<Vec<ChargeRequest>>,
    /// Queued errors returned ahead of normal processing, in order.
    injected: Mutex<VecDeque<PaymentError>>,
}

impl MockPaymentGateway {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            decline_rate: 0.0,
            accepted: Mutex::new(HashMap::new()),
            seen: Mutex::new(Vec::new()),
            injected: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_decline_rate(mut self, rate: f64) -> Self {
        self.decline_rate = rate;
        self
    }

    /// Queue an error to be returned by the next `charge` call. The call
    /// still counts as an invocation.
    pub async fn inject_failure(&self, err: PaymentError) {
        self.injected.lock().await.push_back(err);
    }

    /// Every charge request observed, in order. For assertions.
    pub async fn charges(&self) -> Vec<ChargeRequest> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
        self.seen.lock().await.push(request.clone());

        if let Some(err) = self.injected.lock().await.pop_front() {
            return Err(err);
        }

        let mut accepted = self.accepted.lock().await;
        if let Some(receipt) = accepted.get(&request.idempotency_key) {
            return Ok(receipt.clone());
        }

        let declined = self.decline_rate > 0.0 && {
            let mut rng = rand::thread_rng();
            rng.gen_range(0.0..1.0) < self.decline_rate
        };
        if declined {
            let reason = {
                let mut rng = rand::thread_rng();
                DECLINE_REASONS[rng.gen_range(0..DECLINE_REASONS.len())]
            };
            return Err(PaymentError::Declined {
                reason: reason.to_string(),
            });
        }

        let receipt = ChargeReceipt {
            transaction_id: format!("txn-{}", Ulid::new().to_string().to_lowercase()),
            processed_at: self.clock.now(),
            amount: request.amount,
            provider: PROVIDER.to_string(),
        };
        accepted.insert(request.idempotency_key.clone(), receipt.clone());
        Ok(receipt)
    }
}
