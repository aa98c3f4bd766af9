use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use merx_catalog::{Product, ProductRepository};
use merx_core::{EntityKind, Error, Result};

use crate::database::map_db_err;

pub struct StoreProductRepository {
    pool: PgPool,
}

impl StoreProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    business_id: Uuid,
    name: String,
    description: Option<String>,
    category: Option<String>,
    sku: Option<String>,
    cost_price: Decimal,
    selling_price: Decimal,
    stock_quantity: i32,
    reorder_level: i32,
    weight_kg: Option<Decimal>,
    length_cm: Option<Decimal>,
    width_cm: Option<Decimal>,
    height_cm: Option<Decimal>,
    is_fragile: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            business_id: row.business_id,
            name: row.name,
            description: row.description,
            category: row.category,
            sku: row.sku,
            cost_price: row.cost_price,
            selling_price: row.selling_price,
            stock_quantity: row.stock_quantity,
            reorder_level: row.reorder_level,
            weight_kg: row.weight_kg,
            length_cm: row.length_cm,
            width_cm: row.width_cm,
            height_cm: row.height_cm,
            is_fragile: row.is_fragile,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, business_id, name, description, category, sku, cost_price, \
     selling_price, stock_quantity, reorder_level, weight_kg, length_cm, width_cm, height_cm, \
     is_fragile, created_at, updated_at";

#[async_trait]
impl ProductRepository for StoreProductRepository {
    async fn create(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, business_id, name, description, category, sku, cost_price,
                                  selling_price, stock_quantity, reorder_level, weight_kg,
                                  length_cm, width_cm, height_cm, is_fragile, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(product.id)
        .bind(product.business_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.sku)
        .bind(product.cost_price)
        .bind(product.selling_price)
        .bind(product.stock_quantity)
        .bind(product.reorder_level)
        .bind(product.weight_kg)
        .bind(product.length_cm)
        .bind(product.width_cm)
        .bind(product.height_cm)
        .bind(product.is_fragile)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.map(Product::from))
    }

    async fn find_by_sku(&self, business_id: Uuid, sku: &str) -> Result<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE business_id = $1 AND sku = $2",
            PRODUCT_COLUMNS
        ))
        .bind(business_id)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.map(Product::from))
    }

    async fn update(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, category = $4, sku = $5, cost_price = $6,
                selling_price = $7, stock_quantity = $8, reorder_level = $9, weight_kg = $10,
                length_cm = $11, width_cm = $12, height_cm = $13, is_fragile = $14,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.sku)
        .bind(product.cost_price)
        .bind(product.selling_price)
        .bind(product.stock_quantity)
        .bind(product.reorder_level)
        .bind(product.weight_kg)
        .bind(product.length_cm)
        .bind(product.width_cm)
        .bind(product.height_cm)
        .bind(product.is_fragile)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE business_id = $1 ORDER BY created_at DESC",
            PRODUCT_COLUMNS
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn low_stock(&self, business_id: Uuid) -> Result<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE business_id = $1 AND stock_quantity <= reorder_level \
             ORDER BY stock_quantity ASC",
            PRODUCT_COLUMNS
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn search(&self, business_id: Uuid, term: &str) -> Result<Vec<Product>> {
        let pattern = format!("%{}%", term);
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE business_id = $1 \
             AND (name ILIKE $2 OR category ILIKE $2 OR sku ILIKE $2) \
             ORDER BY name ASC",
            PRODUCT_COLUMNS
        ))
        .bind(business_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn reserve_stock(&self, product_id: Uuid, quantity: i32) -> Result<()> {
        // Conditional decrement; quantity can never go negative even under
        // concurrent reservations.
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $2, updated_at = NOW()
            WHERE id = $1 AND stock_quantity >= $2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing was updated: either the row is gone or stock was short.
        let available: Option<i32> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_err)?;
        match available {
            Some(available) => Err(Error::InsufficientStock {
                product_id,
                requested: quantity,
                available,
            }),
            None => Err(Error::not_found(EntityKind::Product, product_id)),
        }
    }

    async fn release_stock(&self, product_id: Uuid, quantity: i32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(EntityKind::Product, product_id));
        }
        Ok(())
    }
}
