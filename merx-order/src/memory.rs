use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use merx_catalog::{Product, ProductRepository};
use merx_core::notify::NotificationSink;
use merx_core::{EntityKind, Error, Result};

use crate::models::{
    Order, OrderItem, OrderPaymentStatus, OrderStatus, Payment, PaymentStatus, Shipment,
    ShipmentStatus,
};
use crate::repository::{OrderRepository, PaymentRepository, ShipmentRepository};

/// In-process backend for the fulfillment core. Backs the unit tests and
/// local tooling; production runs against the Postgres store.
///
/// All maps sit behind one mutex so multi-row operations (order + items,
/// shipment transition + order side effect) observe the same atomicity as a
/// database transaction.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    order_items: HashMap<Uuid, Vec<OrderItem>>,
    payments: HashMap<Uuid, Payment>,
    shipments: HashMap<Uuid, Shipment>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create(&self, product: &Product) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .products
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.inner.lock().unwrap().products.get(&id).cloned())
    }

    async fn find_by_sku(&self, business_id: Uuid, sku: &str) -> Result<Option<Product>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .products
            .values()
            .find(|p| p.business_id == business_id && p.sku.as_deref() == Some(sku))
            .cloned())
    }

    async fn update(&self, product: &Product) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .products
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.inner.lock().unwrap().products.remove(&id);
        Ok(())
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Product>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .products
            .values()
            .filter(|p| p.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn low_stock(&self, business_id: Uuid) -> Result<Vec<Product>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .products
            .values()
            .filter(|p| p.business_id == business_id && p.is_low_stock())
            .cloned()
            .collect())
    }

    async fn search(&self, business_id: Uuid, term: &str) -> Result<Vec<Product>> {
        let term = term.to_lowercase();
        Ok(self
            .inner
            .lock()
            .unwrap()
            .products
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
        let mut inner = self.inner.lock().unwrap();
        let product = inner
            .products
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
        let mut inner = self.inner.lock().unwrap();
        let product = inner
            .products
            .get_mut(&product_id)
            .ok_or_else(|| Error::not_found(EntityKind::Product, product_id))?;
        product.stock_quantity += quantity;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(Error::conflict(
                "order_number",
                format!("order number {} already exists", order.order_number),
            ));
        }
        inner.orders.insert(order.id, order.clone());
        inner.order_items.insert(order.id, items.to_vec());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.inner.lock().unwrap().orders.get(&id).cloned())
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .orders
            .values()
            .find(|o| o.order_number == order_number)
            .cloned())
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .inner
            .lock()
            .unwrap()
            .orders
            .values()
            .filter(|o| o.business_id == business_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_by_business_and_status(
        &self,
        business_id: Uuid,
        status: OrderStatus,
    ) -> Result<Vec<Order>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .orders
            .values()
            .filter(|o| o.business_id == business_id && o.order_status == status)
            .cloned()
            .collect())
    }

    async fn list_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .order_items
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let order = inner
            .orders
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Order, id))?;
        order.order_status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn update_payment_status(&self, id: Uuid, status: OrderPaymentStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let order = inner
            .orders
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(EntityKind::Order, id))?;
        order.payment_status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.orders.remove(&id);
        inner.order_items.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn record(&self, payment: &Payment, order_status: OrderPaymentStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .payments
            .values()
            .any(|p| p.reference == payment.reference)
        {
            return Err(Error::conflict(
                "reference",
                format!("payment reference {} already exists", payment.reference),
            ));
        }
        {
            let order = inner
                .orders
                .get_mut(&payment.order_id)
                .ok_or_else(|| Error::not_found(EntityKind::Order, payment.order_id))?;
            order.payment_status = order_status;
            order.updated_at = Utc::now();
        }
        inner.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Payment>> {
        Ok(self.inner.lock().unwrap().payments.get(&id).cloned())
    }

    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Payment>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .payments
            .values()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Payment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .payments
            .values()
            .filter(|p| {
                inner
                    .orders
                    .get(&p.order_id)
                    .is_some_and(|o| o.business_id == business_id)
            })
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        id: Uuid,
        status: PaymentStatus,
        order_id: Uuid,
        order_status: OrderPaymentStatus,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        {
            let payment = inner
                .payments
                .get_mut(&id)
                .ok_or_else(|| Error::not_found(EntityKind::Payment, id))?;
            payment.status = status;
        }
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| Error::not_found(EntityKind::Order, order_id))?;
        order.payment_status = order_status;
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ShipmentRepository for MemoryStore {
    async fn create(&self, shipment: &Shipment, order_status: OrderStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .shipments
            .values()
            .any(|s| s.order_id == shipment.order_id)
        {
            return Err(Error::conflict(
                "shipment",
                "shipment already exists for this order",
            ));
        }
        if inner
            .shipments
            .values()
            .any(|s| s.tracking_number == shipment.tracking_number)
        {
            return Err(Error::conflict(
                "tracking_number",
                format!("tracking number {} already exists", shipment.tracking_number),
            ));
        }
        {
            let order = inner
                .orders
                .get_mut(&shipment.order_id)
                .ok_or_else(|| Error::not_found(EntityKind::Order, shipment.order_id))?;
            order.order_status = order_status;
            order.updated_at = Utc::now();
        }
        inner.shipments.insert(shipment.id, shipment.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Shipment>> {
        Ok(self.inner.lock().unwrap().shipments.get(&id).cloned())
    }

    async fn find_by_order(&self, order_id: Uuid) -> Result<Option<Shipment>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .shipments
            .values()
            .find(|s| s.order_id == order_id)
            .cloned())
    }

    async fn find_by_tracking(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .shipments
            .values()
            .find(|s| s.tracking_number == tracking_number)
            .cloned())
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Shipment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .shipments
            .values()
            .filter(|s| {
                inner
                    .orders
                    .get(&s.order_id)
                    .is_some_and(|o| o.business_id == business_id)
            })
            .cloned()
            .collect())
    }

    async fn list_by_business_and_status(
        &self,
        business_id: Uuid,
        status: ShipmentStatus,
    ) -> Result<Vec<Shipment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .shipments
            .values()
            .filter(|s| s.status == status)
            .filter(|s| {
                inner
                    .orders
                    .get(&s.order_id)
                    .is_some_and(|o| o.business_id == business_id)
            })
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        id: Uuid,
        status: ShipmentStatus,
        actual_delivery: Option<DateTime<Utc>>,
        order_status: Option<OrderStatus>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let order_id = {
            let shipment = inner
                .shipments
                .get_mut(&id)
                .ok_or_else(|| Error::not_found(EntityKind::Shipment, id))?;
            shipment.status = status;
            if actual_delivery.is_some() {
                shipment.actual_delivery = actual_delivery;
            }
            shipment.updated_at = Utc::now();
            shipment.order_id
        };
        if let Some(order_status) = order_status {
            let order = inner
                .orders
                .get_mut(&order_id)
                .ok_or_else(|| Error::not_found(EntityKind::Order, order_id))?;
            order.order_status = order_status;
            order.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// Sink that records notifications in memory; tests assert against it.
#[derive(Default)]
pub struct MemorySink {
    pub sent: Mutex<Vec<(Uuid, String, String)>>,
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn notify(
        &self,
        business_id: Uuid,
        kind: &str,
        title: &str,
        _message: &str,
        _action_required: bool,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((business_id, kind.to_string(), title.to_string()));
        Ok(())
    }
}
