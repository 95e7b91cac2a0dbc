use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use crate::db::ProductRepository;
use crate::error::{AppError, AppResult};
use crate::models::{NewProduct, Product};

/// Name written by [`ProductService::diagnostic_mutate_first`].
pub const DIAGNOSTIC_NAME: &str = "Apple";
/// Acknowledgement returned by [`ProductService::diagnostic_mutate_first`].
pub const DIAGNOSTIC_ACK: &str = "hello world";

/// Reads and writes products through a [`ProductRepository`].
///
/// Holds no state of its own, so clones share the same store handle.
#[derive(Clone)]
pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    /// All products in store order. An empty store yields an empty list.
    pub async fn list_all(&self) -> AppResult<Vec<Product>> {
        self.repo.list_all().await
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Product> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))
    }

    /// Validate a wire body and persist it as a new product.
    pub async fn create(&self, body: &Value) -> AppResult<Product> {
        let product = NewProduct::from_wire(body)?;
        self.repo.insert(&product, Utc::now()).await
    }

    /// Rename the first stored product to [`DIAGNOSTIC_NAME`].
    ///
    /// Not production behavior: kept only so `/hello/` keeps answering the
    /// way existing clients observe. Fails with `NotFound` on an empty store.
    pub async fn diagnostic_mutate_first(&self) -> AppResult<&'static str> {
        let mut product = self
            .repo
            .first()
            .await?
            .ok_or_else(|| AppError::NotFound("No products stored".to_string()))?;

        warn!(id = product.id, old_name = %product.name, "Diagnostic rename of first product");

        product.name = DIAGNOSTIC_NAME.to_string();
        self.repo.update(&product).await?;

        Ok(DIAGNOSTIC_ACK)
    }
}
