use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use merx_core::Result;

use crate::models::{
    Order, OrderItem, OrderPaymentStatus, OrderStatus, Payment, PaymentStatus, Shipment,
    ShipmentStatus,
};

/// Repository trait for order data access.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist order and items as one atomic unit. Fails with
    /// `Conflict("order_number")` on a duplicate number.
    async fn create(&self, order: &Order, items: &[OrderItem]) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Order>>;

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>>;

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Order>>;

    async fn list_by_business_and_status(
        &self,
        business_id: Uuid,
        status: OrderStatus,
    ) -> Result<Vec<Order>>;

    async fn list_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<()>;

    async fn update_payment_status(&self, id: Uuid, status: OrderPaymentStatus) -> Result<()>;

    /// Delete the order and its items in one operation (explicit cascade).
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Repository trait for payment rows.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Persist a payment and the derived order payment status as one atomic
    /// unit. Fails with `Conflict("reference")` on a duplicate payment
    /// reference.
    async fn record(&self, payment: &Payment, order_status: OrderPaymentStatus) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Payment>>;

    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Payment>>;

    /// All payments across the tenant's orders.
    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Payment>>;

    /// Change a payment's status and apply the re-derived order payment
    /// status as one atomic unit.
    async fn transition(
        &self,
        id: Uuid,
        status: PaymentStatus,
        order_id: Uuid,
        order_status: OrderPaymentStatus,
    ) -> Result<()>;
}

/// Repository trait for shipments.
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// Persist a shipment and apply the order-status side effect as one
    /// atomic unit. Fails with `Conflict("shipment")` when the order already
    /// has one and `Conflict("tracking_number")` on a duplicate tracking
    /// number.
    async fn create(&self, shipment: &Shipment, order_status: OrderStatus) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Shipment>>;

    async fn find_by_order(&self, order_id: Uuid) -> Result<Option<Shipment>>;

    async fn find_by_tracking(&self, tracking_number: &str) -> Result<Option<Shipment>>;

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Shipment>>;

    async fn list_by_business_and_status(
        &self,
        business_id: Uuid,
        status: ShipmentStatus,
    ) -> Result<Vec<Shipment>>;

    /// Apply a shipment status change and its order-status side effect as
    /// one atomic unit.
    async fn transition(
        &self,
        id: Uuid,
        status: ShipmentStatus,
        actual_delivery: Option<DateTime<Utc>>,
        order_status: Option<OrderStatus>,
    ) -> Result<()>;
}
