//! ProcessPayment: charge the order amount through the payment gateway.
//!
//! The gateway is an opaque black box to the engine. This executor only
//! classifies its answers: a declined charge is a business failure
//! (`failure("payment", {reason})`, exactly one invocation, never
//! retried), a transport problem is transient. The idempotency key sent
//! with every charge is the order ID, so a retried transient charge
//! collapses into one transaction on the gateway side.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::outcome::{StepError, StepOutcome};
use crate::ports::{ChargeRequest, PaymentError, PaymentGateway};

use super::{StepExecutor, StepInput};

pub struct ProcessPayment {
    gateway: Arc<dyn PaymentGateway>,
}

impl ProcessPayment {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl StepExecutor for ProcessPayment {
    async fn run(&self, input: &StepInput) -> Result<StepOutcome, StepError> {
        let order = &input.order;
        let request = ChargeRequest {
            order_id: order.order_id.clone(),
            user_id: order.user_id.clone(),
            amount: order.total_amount,
            idempotency_key: order.order_id.to_string(),
        };

        match self.gateway.charge(&request).await {
            Ok(receipt) => Ok(StepOutcome::success(serde_json::json!({
                "paymentResult": {
                    "transactionId": receipt.transaction_id,
                    "processedAt": receipt.processed_at,
                    "amount": receipt.amount,
                    "provider": receipt.provider,
                }
            }))),
            Err(PaymentError::Declined { reason }) => Ok(StepOutcome::failure(
                "payment",
                serde_json::json!({ "reason": reason }),
            )),
            Err(PaymentError::Transport(message)) => Err(StepError::transient(format!(
                "payment gateway unreachable: {message}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Order;
    use crate::ports::ChargeReceipt;
    use chrono::Utc;
    use ulid::Ulid;

    struct ScriptedGateway {
        response: Result<ChargeReceipt, PaymentError>,
        seen: tokio::sync::Mutex<Vec<ChargeRequest>>,
    }

    impl ScriptedGateway {
        fn new(response: Result<ChargeReceipt, PaymentError>) -> Self {
            Self {
                response,
                seen: tokio::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
            self.seen.lock().await.push(request.clone());
            self.response.clone()
        }
    }

    fn input() -> StepInput {
        let order: Order = serde_json::from_value(serde_json::json!({
            "orderId": "o1", "userId": "u1",
            "items": [{"productId": "p1", "quantity": 1, "price": 10.0}],
            "totalAmount": 10.0
        }))
        .unwrap();
        let document = serde_json::to_value(&order).unwrap();
        StepInput {
            execution_id: crate::domain::ids::ExecutionId::from_ulid(Ulid::new()),
            order,
            document,
        }
    }

    #[tokio::test]
    async fn successful_charge_yields_payment_result() {
        let gateway = Arc::new(ScriptedGateway::new(Ok(ChargeReceipt {
            transaction_id: "txn-1".to_string(),
            processed_at: Utc::now(),
            amount: 10.0,
            provider: "mock-payment-gateway".to_string(),
        })));

        let outcome = ProcessPayment::new(gateway.clone()).run(&input()).await.unwrap();
        match outcome {
            StepOutcome::Success { data } => {
                assert_eq!(data["paymentResult"]["transactionId"], "txn-1");
                assert_eq!(data["paymentResult"]["amount"], 10.0);
            }
            _ => panic!("expected success"),
        }

        let seen = gateway.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].idempotency_key, "o1");
    }

    #[tokio::test]
    async fn declined_charge_is_a_payment_failure() {
        let gateway = Arc::new(ScriptedGateway::new(Err(PaymentError::Declined {
            reason: "declined".to_string(),
        })));

        let outcome = ProcessPayment::new(gateway).run(&input()).await.unwrap();
        match outcome {
            StepOutcome::Failure { tag, details } => {
                assert_eq!(tag, "payment");
                assert_eq!(details["reason"], "declined");
            }
            _ => panic!("expected a payment failure"),
        }
    }

    #[tokio::test]
    async fn transport_trouble_is_transient() {
        let gateway = Arc::new(ScriptedGateway::new(Err(PaymentError::Transport(
            "connection reset".to_string(),
        ))));

        let err = ProcessPayment::new(gateway).run(&input()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
