//! In-memory product catalog.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{CatalogError, Product, ProductCatalog};

/// Fixed catalog built up front. Outages can be queued with
/// [`inject_outage`](Self::inject_outage) to exercise the retry paths.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: HashMap<String, Product>,
    injected: Mutex<VecDeque<CatalogError>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product_id: impl Into<String>, product: Product) -> Self {
        self.products.insert(product_id.into(), product);
        self
    }

    /// Queue an error to be returned by the next `get_product` call.
    pub async fn inject_outage(&self, err: CatalogError) {
        self.injected.lock().await.push_back(err);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_product(&self, product_id: &str) -> Result<Option<Product>, CatalogError> {
        if let Some(err) = self.injected.lock().await.pop_front() {
            return Err(err);
        }
        Ok(self.products.get(product_id).copied())
    }
}
