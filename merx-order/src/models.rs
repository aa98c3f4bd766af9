use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use merx_catalog::Product;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Processing,
    ReadyToShip,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::ReadyToShip => "READY_TO_SHIP",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PROCESSING" => Some(OrderStatus::Processing),
            "READY_TO_SHIP" => Some(OrderStatus::ReadyToShip),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order-level payment state, derived from the payment set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPaymentStatus {
    Pending,
    Partial,
    Paid,
    Refunded,
}

impl OrderPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPaymentStatus::Pending => "PENDING",
            OrderPaymentStatus::Partial => "PARTIAL",
            OrderPaymentStatus::Paid => "PAID",
            OrderPaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderPaymentStatus::Pending),
            "PARTIAL" => Some(OrderPaymentStatus::Partial),
            "PAID" => Some(OrderPaymentStatus::Paid),
            "REFUNDED" => Some(OrderPaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one payment row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    MobileMoney,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::MobileMoney => "MOBILE_MONEY",
            PaymentMethod::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(PaymentMethod::Cash),
            "CARD" => Some(PaymentMethod::Card),
            "BANK_TRANSFER" => Some(PaymentMethod::BankTransfer),
            "MOBILE_MONEY" => Some(PaymentMethod::MobileMoney),
            "OTHER" => Some(PaymentMethod::Other),
            _ => None,
        }
    }
}

/// Shipment lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Preparing,
    InTransit,
    Delivered,
    Delayed,
    Cancelled,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Preparing => "PREPARING",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Delayed => "DELAYED",
            ShipmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PREPARING" => Some(ShipmentStatus::Preparing),
            "IN_TRANSIT" => Some(ShipmentStatus::InTransit),
            "DELIVERED" => Some(ShipmentStatus::Delivered),
            "DELAYED" => Some(ShipmentStatus::Delayed),
            "CANCELLED" => Some(ShipmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Order-status side effect of entering this shipment status.
    pub fn order_effect(&self) -> Option<OrderStatus> {
        match self {
            ShipmentStatus::InTransit => Some(OrderStatus::Shipped),
            ShipmentStatus::Delivered => Some(OrderStatus::Delivered),
            ShipmentStatus::Cancelled => Some(OrderStatus::Cancelled),
            ShipmentStatus::Preparing | ShipmentStatus::Delayed => None,
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer order. Owns its items and at most one shipment, both
/// referenced by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub business_id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub order_source: Option<String>,
    pub notes: Option<String>,
    pub payment_status: OrderPaymentStatus,
    pub order_status: OrderStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order. Immutable once the order is created; `unit_price`
/// snapshots the catalog selling price at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn new(order_id: Uuid, product: &Product, quantity: i32) -> Self {
        let unit_price = product.selling_price;
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price,
            total_price: (unit_price * Decimal::from(quantity)).round_dp(2),
            created_at: Utc::now(),
        }
    }
}

/// A payment attempt recorded against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub reference: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_reference: Option<String>,
    pub processing_fee: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The single shipment of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub tracking_number: String,
    pub carrier_name: String,
    pub status: ShipmentStatus,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub shipping_cost: Option<Decimal>,
    pub sender_name: Option<String>,
    pub sender_address: Option<String>,
    pub sender_phone: Option<String>,
    pub receiver_name: String,
    pub receiver_address: String,
    pub receiver_phone: Option<String>,
    pub package_weight: Option<Decimal>,
    pub package_value: Option<Decimal>,
    pub package_description: Option<String>,
    pub is_fragile: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One requested order line. Pricing comes from the catalog, not the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub order_source: Option<String>,
    pub notes: Option<String>,
    /// Caller-declared initial payment intent; defaults to PENDING. The
    /// ledger overwrites this as payments are recorded.
    pub payment_status: Option<OrderPaymentStatus>,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub transaction_reference: Option<String>,
    pub processing_fee: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub order_id: Uuid,
    pub carrier_name: String,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub shipping_cost: Option<Decimal>,
    pub sender_name: Option<String>,
    pub sender_address: Option<String>,
    pub sender_phone: Option<String>,
    pub receiver_name: String,
    pub receiver_address: String,
    pub receiver_phone: Option<String>,
    pub package_weight: Option<Decimal>,
    pub package_value: Option<Decimal>,
    pub package_description: Option<String>,
    #[serde(default)]
    pub is_fragile: bool,
}
