use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted after an order creation drops a product to or below its
/// reorder level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockEvent {
    pub business_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub stock_quantity: i32,
    pub reorder_level: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Emitted when an order is cancelled and its stock released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub business_id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Emitted after a payment row is recorded against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecordedEvent {
    pub business_id: Uuid,
    pub order_id: Uuid,
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}
