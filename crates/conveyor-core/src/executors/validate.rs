//! ValidateOrder: checks an order against required fields and the catalog.
//!
//! All findings (missing fields, unknown products, stock shortfalls,
//! price and total mismatches) accumulate into one error list and come
//! back as a single `failure("validation", {errors})`. They are not split
//! into separate tags on purpose: every validation failure routes
//! identically, so distinguishing them would only complicate the table.
//!
//! Only a catalog outage is an error (transient): the order itself may be
//! fine, so the lookup is worth retrying.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::outcome::{StepError, StepOutcome};
use crate::ports::{CatalogError, Clock, ProductCatalog};

use super::{StepExecutor, StepInput};

/// Monetary comparisons allow a one-cent float tolerance.
const PRICE_EPSILON: f64 = 0.01;

pub struct ValidateOrder {
    catalog: Arc<dyn ProductCatalog>,
    clock: Arc<dyn Clock>,
}

impl ValidateOrder {
    pub fn new(catalog: Arc<dyn ProductCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, clock }
    }
}

#[async_trait]
impl StepExecutor for ValidateOrder {
    async fn run(&self, input: &StepInput) -> Result<StepOutcome, StepError> {
        let order = &input.order;
        let mut errors: Vec<String> = Vec::new();

        if order.order_id.as_str().trim().is_empty() {
            errors.push("Missing required field: orderId".to_string());
        }
        if order.user_id.trim().is_empty() {
            errors.push("Missing required field: userId".to_string());
        }
        if order.items.is_empty() {
            errors.push("Order must contain at least one item (items empty)".to_string());
        }
        if order.total_amount <= 0.0 {
            errors.push("Total amount must be positive".to_string());
        }

        for (idx, item) in order.items.iter().enumerate() {
            let item_num = idx + 1;

            if item.product_id.trim().is_empty() {
                errors.push(format!("Item {item_num}: Missing productId"));
                continue;
            }
            if item.quantity == 0 {
                errors.push(format!("Item {item_num}: Quantity must be positive"));
                continue;
            }

            match self.catalog.get_product(&item.product_id).await {
                Ok(Some(product)) => {
                    if product.stock < item.quantity {
                        errors.push(format!(
                            "Item {item_num}: Insufficient stock for {} (requested: {}, available: {})",
                            item.product_id, item.quantity, product.stock
                        ));
                    }
                    if (product.price - item.price).abs() > PRICE_EPSILON {
                        errors.push(format!(
                            "Item {item_num}: Price mismatch for {} (expected: {:.2}, received: {:.2})",
                            item.product_id, product.price, item.price
                        ));
                    }
                }
                Ok(None) => {
                    errors.push(format!(
                        "Item {item_num}: Product {} not found",
                        item.product_id
                    ));
                }
                Err(CatalogError::Unavailable(message)) => {
                    return Err(StepError::transient(format!(
                        "product catalog unavailable: {message}"
                    )));
                }
            }
        }

        let calculated: f64 = order
            .items
            .iter()
            .map(|item| item.price * f64::from(item.quantity))
            .sum();
        if (calculated - order.total_amount).abs() > PRICE_EPSILON {
            errors.push(format!(
                "Total amount mismatch: expected {calculated:.2}, received {:.2}",
                order.total_amount
            ));
        }

        if errors.is_empty() {
            Ok(StepOutcome::success(serde_json::json!({
                "validationResult": {
                    "isValid": true,
                    "errors": [],
                    "validatedAt": self.clock.now(),
                }
            })))
        } else {
            Ok(StepOutcome::failure(
                "validation",
                serde_json::json!({ "errors": errors }),
            ))
        }
    }
}
