//! ProductCatalog port: price and stock lookups during validation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog view of a product, as needed by order validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub price: f64,
    pub stock: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog itself could not be reached. Transient: validation is
    /// retried, because the order may well be fine.
    #[error("product catalog unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// `Ok(None)` means the product does not exist, which is a validation
    /// finding, not an error.
    async fn get_product(&self, product_id: &str) -> Result<Option<Product>, CatalogError>;
}
