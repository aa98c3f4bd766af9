use std::sync::Arc;

use uuid::Uuid;

use merx_core::tenancy::TenantContext;
use merx_core::{EntityKind, Error, Result};

use crate::product::{Product, ProductDraft};
use crate::repository::ProductRepository;

/// Catalog service: product lifecycle plus the stock rules the order engine
/// relies on.
pub struct Catalog {
    products: Arc<dyn ProductRepository>,
}

impl Catalog {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub async fn create_product(&self, ctx: &TenantContext, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;
        self.ensure_sku_free(ctx, draft.sku.as_deref(), None).await?;

        let product = Product::new(ctx.business_id, draft);
        self.products.create(&product).await?;
        Ok(product)
    }

    pub async fn update_product(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        draft: ProductDraft,
    ) -> Result<Product> {
        draft.validate()?;
        let mut product = self.get_product(ctx, product_id).await?;
        self.ensure_sku_free(ctx, draft.sku.as_deref(), Some(product_id))
            .await?;

        product.apply(draft);
        self.products.update(&product).await?;
        Ok(product)
    }

    pub async fn get_product(&self, ctx: &TenantContext, product_id: Uuid) -> Result<Product> {
        let product = self
            .products
            .find(product_id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Product, product_id))?;
        ctx.ensure_owned(EntityKind::Product, product.business_id)?;
        Ok(product)
    }

    pub async fn delete_product(&self, ctx: &TenantContext, product_id: Uuid) -> Result<()> {
        self.get_product(ctx, product_id).await?;
        self.products.delete(product_id).await
    }

    pub async fn list_products(&self, ctx: &TenantContext) -> Result<Vec<Product>> {
        self.products.list_by_business(ctx.business_id).await
    }

    pub async fn search_products(&self, ctx: &TenantContext, term: &str) -> Result<Vec<Product>> {
        self.products.search(ctx.business_id, term).await
    }

    /// Products at or below their reorder level, for dashboards and alerts.
    pub async fn low_stock(&self, ctx: &TenantContext) -> Result<Vec<Product>> {
        self.products.low_stock(ctx.business_id).await
    }

    /// Decrement available stock. Immediate, not a temporary hold; reversed
    /// only by an explicit `release`.
    pub async fn reserve(&self, product_id: Uuid, quantity: i32) -> Result<()> {
        if quantity < 1 {
            return Err(Error::validation("quantity", "must be at least 1"));
        }
        self.products.reserve_stock(product_id, quantity).await
    }

    /// Return previously reserved stock, e.g. on order cancellation.
    pub async fn release(&self, product_id: Uuid, quantity: i32) -> Result<()> {
        if quantity < 1 {
            return Err(Error::validation("quantity", "must be at least 1"));
        }
        self.products.release_stock(product_id, quantity).await
    }

    async fn ensure_sku_free(
        &self,
        ctx: &TenantContext,
        sku: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<()> {
        let Some(sku) = sku else { return Ok(()) };
        if let Some(existing) = self.products.find_by_sku(ctx.business_id, sku).await? {
            if Some(existing.id) != exclude {
                return Err(Error::conflict(
                    "sku",
                    format!("product with SKU {} already exists", sku),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Minimal in-crate product store for exercising the catalog rules.
    #[derive(Default)]
    struct MemoryProducts {
        rows: Mutex<HashMap<Uuid, Product>>,
    }

    #[async_trait]
    impl ProductRepository for MemoryProducts {
        async fn create(&self, product: &Product) -> Result<()> {
            self.rows
                .lock()
                .unwrap()
                .insert(product.id, product.clone());
            Ok(())
        }

        async fn find(&self, id: Uuid) -> Result<Option<Product>> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn find_by_sku(&self, business_id: Uuid, sku: &str) -> Result<Option<Product>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|p| p.business_id == business_id && p.sku.as_deref() == Some(sku))
                .cloned())
        }

        async fn update(&self, product: &Product) -> Result<()> {
            self.rows
                .lock()
                .unwrap()
                .insert(product.id, product.clone());
            Ok(())
        }

        async fn delete(&self, id: Uuid) -> Result<()> {
            self.rows.lock().unwrap().remove(&id);
            Ok(())
        }

        async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Product>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.business_id == business_id)
                .cloned()
                .collect())
        }

        async fn low_stock(&self, business_id: Uuid) -> Result<Vec<Product>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.business_id == business_id && p.is_low_stock())
                .cloned()
                .collect())
        }

        async fn search(&self, business_id: Uuid, term: &str) -> Result<Vec<Product>> {
            let term = term.to_lowercase();
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.business_id == business_id)
                .filter(|p| {
                    p.name.to_lowercase().contains(&term)
                        || p.category
                            .as_deref()
                            .is_some_and(|c| c.to_lowercase().contains(&term))
                        || p.sku
                            .as_deref()
                            .is_some_and(|s| s.to_lowercase().contains(&term))
                })
                .cloned()
                .collect())
        }

        async fn reserve_stock(&self, product_id: Uuid, quantity: i32) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let product = rows
                .get_mut(&product_id)
                .ok_or_else(|| Error::not_found(EntityKind::Product, product_id))?;
            if product.stock_quantity < quantity {
                return Err(Error::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available: product.stock_quantity,
                });
            }
            product.stock_quantity -= quantity;
            Ok(())
        }

        async fn release_stock(&self, product_id: Uuid, quantity: i32) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let product = rows
                .get_mut(&product_id)
                .ok_or_else(|| Error::not_found(EntityKind::Product, product_id))?;
            product.stock_quantity += quantity;
            Ok(())
        }
    }

    fn catalog() -> (Catalog, TenantContext) {
        let repo = Arc::new(MemoryProducts::default());
        (Catalog::new(repo), TenantContext::new(Uuid::new_v4()))
    }

    fn draft(name: &str, sku: Option<&str>, stock: i32, reorder: i32) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            description: None,
            category: Some("general".to_string()),
            sku: sku.map(String::from),
            cost_price: dec!(300.00),
            selling_price: dec!(500.00),
            stock_quantity: stock,
            reorder_level: reorder,
            weight_kg: None,
            length_cm: None,
            width_cm: None,
            height_cm: None,
            is_fragile: false,
        }
    }

    #[tokio::test]
    async fn reserve_then_release_restores_quantity() {
        let (catalog, ctx) = catalog();
        let product = catalog
            .create_product(&ctx, draft("Beads", None, 10, 2))
            .await
            .unwrap();

        catalog.reserve(product.id, 4).await.unwrap();
        assert_eq!(
            catalog.get_product(&ctx, product.id).await.unwrap().stock_quantity,
            6
        );

        catalog.release(product.id, 4).await.unwrap();
        assert_eq!(
            catalog.get_product(&ctx, product.id).await.unwrap().stock_quantity,
            10
        );
    }

    #[tokio::test]
    async fn reserve_never_drives_stock_negative() {
        let (catalog, ctx) = catalog();
        let product = catalog
            .create_product(&ctx, draft("Mugs", None, 3, 1))
            .await
            .unwrap();

        let err = catalog.reserve(product.id, 5).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientStock {
                requested: 5,
                available: 3,
                ..
            }
        ));
        // The failed reservation must not have touched the quantity.
        assert_eq!(
            catalog.get_product(&ctx, product.id).await.unwrap().stock_quantity,
            3
        );
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_conflict() {
        let (catalog, ctx) = catalog();
        catalog
            .create_product(&ctx, draft("First", Some("SKU-1"), 5, 1))
            .await
            .unwrap();

        let err = catalog
            .create_product(&ctx, draft("Second", Some("SKU-1"), 5, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { field: "sku", .. }));
    }

    #[tokio::test]
    async fn renaming_to_taken_sku_is_a_conflict() {
        let (catalog, ctx) = catalog();
        catalog
            .create_product(&ctx, draft("First", Some("SKU-1"), 5, 1))
            .await
            .unwrap();
        let second = catalog
            .create_product(&ctx, draft("Second", Some("SKU-2"), 5, 1))
            .await
            .unwrap();

        let err = catalog
            .update_product(&ctx, second.id, draft("Second", Some("SKU-1"), 5, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { field: "sku", .. }));

        // Keeping its own SKU is fine.
        catalog
            .update_product(&ctx, second.id, draft("Second v2", Some("SKU-2"), 5, 1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn same_sku_in_another_business_is_allowed() {
        let repo = Arc::new(MemoryProducts::default());
        let catalog = Catalog::new(repo);
        let ctx_a = TenantContext::new(Uuid::new_v4());
        let ctx_b = TenantContext::new(Uuid::new_v4());

        catalog
            .create_product(&ctx_a, draft("A", Some("SHARED"), 5, 1))
            .await
            .unwrap();
        catalog
            .create_product(&ctx_b, draft("B", Some("SHARED"), 5, 1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn low_stock_uses_reorder_level_inclusive() {
        let (catalog, ctx) = catalog();
        catalog
            .create_product(&ctx, draft("At level", None, 2, 2))
            .await
            .unwrap();
        catalog
            .create_product(&ctx, draft("Above level", None, 9, 2))
            .await
            .unwrap();

        let low = catalog.low_stock(&ctx).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "At level");
    }

    #[tokio::test]
    async fn cross_tenant_product_access_is_forbidden() {
        let repo = Arc::new(MemoryProducts::default());
        let catalog = Catalog::new(repo);
        let ctx_a = TenantContext::new(Uuid::new_v4());
        let ctx_b = TenantContext::new(Uuid::new_v4());

        let product = catalog
            .create_product(&ctx_a, draft("Private", None, 5, 1))
            .await
            .unwrap();

        let err = catalog.get_product(&ctx_b, product.id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(EntityKind::Product)));
    }

    #[tokio::test]
    async fn invalid_prices_are_rejected() {
        let (catalog, ctx) = catalog();
        let mut bad = draft("Freebie", None, 5, 1);
        bad.selling_price = dec!(0);
        let err = catalog.create_product(&ctx, bad).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                field: "selling_price",
                ..
            }
        ));
    }
}
