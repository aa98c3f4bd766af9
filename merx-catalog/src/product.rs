use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use merx_core::{Error, Result};

/// A catalogued product owned by exactly one business.
///
/// `stock_quantity` never goes negative; every decrement goes through
/// `ProductRepository::reserve_stock` which checks availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Unique within the owning business when present.
    pub sku: Option<String>,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub stock_quantity: i32,
    pub reorder_level: i32,
    pub weight_kg: Option<Decimal>,
    pub length_cm: Option<Decimal>,
    pub width_cm: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub is_fragile: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub stock_quantity: i32,
    pub reorder_level: i32,
    pub weight_kg: Option<Decimal>,
    pub length_cm: Option<Decimal>,
    pub width_cm: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    #[serde(default)]
    pub is_fragile: bool,
}

impl ProductDraft {
    /// Reject malformed input before it touches persistent state.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "must not be empty"));
        }
        if self.cost_price <= Decimal::ZERO {
            return Err(Error::validation("cost_price", "must be positive"));
        }
        if self.selling_price <= Decimal::ZERO {
            return Err(Error::validation("selling_price", "must be positive"));
        }
        if self.stock_quantity < 0 {
            return Err(Error::validation("stock_quantity", "must not be negative"));
        }
        if self.reorder_level < 0 {
            return Err(Error::validation("reorder_level", "must not be negative"));
        }
        Ok(())
    }
}

impl Product {
    pub fn new(business_id: Uuid, draft: ProductDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            business_id,
            name: draft.name,
            description: draft.description,
            category: draft.category,
            sku: draft.sku,
            cost_price: draft.cost_price,
            selling_price: draft.selling_price,
            stock_quantity: draft.stock_quantity,
            reorder_level: draft.reorder_level,
            weight_kg: draft.weight_kg,
            length_cm: draft.length_cm,
            width_cm: draft.width_cm,
            height_cm: draft.height_cm,
            is_fragile: draft.is_fragile,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: ProductDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.category = draft.category;
        self.sku = draft.sku;
        self.cost_price = draft.cost_price;
        self.selling_price = draft.selling_price;
        self.stock_quantity = draft.stock_quantity;
        self.reorder_level = draft.reorder_level;
        self.weight_kg = draft.weight_kg;
        self.length_cm = draft.length_cm;
        self.width_cm = draft.width_cm;
        self.height_cm = draft.height_cm;
        self.is_fragile = draft.is_fragile;
        self.updated_at = Utc::now();
    }

    /// A product is low on stock when it has dropped to its reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }
}
