use async_trait::async_trait;
use uuid::Uuid;

use merx_core::Result;

use crate::product::Product;

/// Repository trait for product data access.
///
/// `reserve_stock` and `release_stock` are the only stock mutation paths;
/// implementations must make the read-modify-write atomic so concurrent
/// reservations cannot both pass a stale availability check.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: &Product) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Product>>;

    async fn find_by_sku(&self, business_id: Uuid, sku: &str) -> Result<Option<Product>>;

    async fn update(&self, product: &Product) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Product>>;

    /// Products at or below their reorder level.
    async fn low_stock(&self, business_id: Uuid) -> Result<Vec<Product>>;

    /// Case-insensitive match on name, category or SKU.
    async fn search(&self, business_id: Uuid, term: &str) -> Result<Vec<Product>>;

    /// Atomically decrement stock by `quantity`. Fails with
    /// `NotFound(Product)` when missing and `InsufficientStock` when the
    /// available quantity is lower than requested.
    async fn reserve_stock(&self, product_id: Uuid, quantity: i32) -> Result<()>;

    /// Atomically increment stock by `quantity`. No upper bound.
    async fn release_stock(&self, product_id: Uuid, quantity: i32) -> Result<()>;
}
