use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use merx_catalog::{Catalog, Product};
use merx_core::notify::NotificationSink;
use merx_core::tenancy::TenantContext;
use merx_core::{EntityKind, Error, Result};
use merx_shared::models::events::{LowStockEvent, OrderCancelledEvent};

use crate::models::{
    Order, OrderItem, OrderPaymentStatus, OrderRequest, OrderStatus,
};
use crate::refs;
use crate::repository::OrderRepository;

/// Turns an order request into a consistent set of mutations across
/// inventory, order totals and order status.
pub struct OrderEngine {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<Catalog>,
    notifier: Arc<dyn NotificationSink>,
    tax_rate: Decimal,
}

impl OrderEngine {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<Catalog>,
        notifier: Arc<dyn NotificationSink>,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            orders,
            catalog,
            notifier,
            tax_rate,
        }
    }

    /// Create an order: reserve stock line by line, compute totals from the
    /// catalog's selling prices, persist order and items atomically.
    /// Any failure after a partial reservation releases everything reserved
    /// so far.
    pub async fn create_order(&self, ctx: &TenantContext, req: OrderRequest) -> Result<Order> {
        if req.items.is_empty() {
            return Err(Error::validation(
                "items",
                "order must contain at least one line item",
            ));
        }

        let mut reserved: Vec<(Uuid, i32)> = Vec::new();
        let mut lines: Vec<(Product, i32)> = Vec::new();
        for line in &req.items {
            let result = self.reserve_line(ctx, line.product_id, line.quantity).await;
            match result {
                Ok(product) => {
                    reserved.push((product.id, line.quantity));
                    lines.push((product, line.quantity));
                }
                Err(err) => {
                    self.release_reserved(&reserved).await;
                    return Err(err);
                }
            }
        }

        let order_id = Uuid::new_v4();
        let mut subtotal = Decimal::ZERO;
        let mut items = Vec::with_capacity(lines.len());
        for (product, quantity) in &lines {
            let item = OrderItem::new(order_id, product, *quantity);
            subtotal += item.total_price;
            items.push(item);
        }
        let subtotal = subtotal.round_dp(2);
        let tax_amount = (subtotal * self.tax_rate).round_dp(2);
        let total_amount = subtotal + tax_amount;

        let now = Utc::now();
        let mut order = Order {
            id: order_id,
            business_id: ctx.business_id,
            order_number: refs::order_number(),
            customer_name: req.customer_name,
            customer_email: req.customer_email,
            customer_phone: req.customer_phone,
            shipping_address: req.shipping_address,
            order_source: req.order_source,
            notes: req.notes,
            payment_status: req.payment_status.unwrap_or(OrderPaymentStatus::Pending),
            order_status: OrderStatus::Processing,
            subtotal,
            tax_amount,
            total_amount,
            created_at: now,
            updated_at: now,
        };

        // The unique constraint is the arbiter of reference collisions;
        // one regeneration covers a same-second clash.
        match self.orders.create(&order, &items).await {
            Ok(()) => {}
            Err(Error::Conflict {
                field: "order_number",
                ..
            }) => {
                order.order_number = refs::order_number();
                if let Err(err) = self.orders.create(&order, &items).await {
                    self.release_reserved(&reserved).await;
                    return Err(err);
                }
            }
            Err(err) => {
                self.release_reserved(&reserved).await;
                return Err(err);
            }
        }

        self.emit_low_stock_alerts(ctx, &lines).await;

        Ok(order)
    }

    /// Direct, ownership-checked order status transition. Legality of
    /// shipment-driven transitions is enforced by the shipment tracker.
    pub async fn update_order_status(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order> {
        let mut order = self.get_order(ctx, order_id).await?;
        self.orders.update_order_status(order_id, status).await?;
        order.order_status = status;
        order.updated_at = Utc::now();
        Ok(order)
    }

    pub async fn update_payment_status(
        &self,
        ctx: &TenantContext,
        order_id: Uuid,
        status: OrderPaymentStatus,
    ) -> Result<Order> {
        let mut order = self.get_order(ctx, order_id).await?;
        self.orders.update_payment_status(order_id, status).await?;
        order.payment_status = status;
        order.updated_at = Utc::now();
        Ok(order)
    }

    /// Cancel an order, releasing the stock its items reserved. Cancelling
    /// an already-cancelled order is a no-op; a delivered order cannot be
    /// cancelled.
    pub async fn cancel_order(&self, ctx: &TenantContext, order_id: Uuid) -> Result<Order> {
        let mut order = self.get_order(ctx, order_id).await?;
        match order.order_status {
            OrderStatus::Cancelled => return Ok(order),
            OrderStatus::Delivered => {
                return Err(Error::InvalidTransition {
                    from: OrderStatus::Delivered.to_string(),
                    to: OrderStatus::Cancelled.to_string(),
                })
            }
            _ => {}
        }

        let items = self.orders.list_items(order_id).await?;
        for item in &items {
            if let Err(err) = self.catalog.release(item.product_id, item.quantity).await {
                // A missing product must not block the cancellation itself.
                tracing::warn!(
                    order_id = %order_id,
                    product_id = %item.product_id,
                    "failed to release stock on cancellation: {}",
                    err
                );
            }
        }

        self.orders
            .update_order_status(order_id, OrderStatus::Cancelled)
            .await?;
        order.order_status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();

        let event = OrderCancelledEvent {
            business_id: order.business_id,
            order_id: order.id,
            order_number: order.order_number.clone(),
            occurred_at: order.updated_at,
        };
        tracing::info!(event = ?event, "order cancelled");

        if let Err(err) = self
            .notifier
            .notify(
                ctx.business_id,
                "ORDER_CANCELLED",
                "Order cancelled",
                &format!("Order {} was cancelled and its stock released", order.order_number),
                false,
            )
            .await
        {
            tracing::warn!("notification sink failed: {}", err);
        }

        Ok(order)
    }

    /// Delete an order together with its items (explicit cascade).
    pub async fn delete_order(&self, ctx: &TenantContext, order_id: Uuid) -> Result<()> {
        self.get_order(ctx, order_id).await?;
        self.orders.delete(order_id).await
    }

    pub async fn get_order(&self, ctx: &TenantContext, order_id: Uuid) -> Result<Order> {
        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Order, order_id))?;
        ctx.ensure_owned(EntityKind::Order, order.business_id)?;
        Ok(order)
    }

    pub async fn get_order_by_number(
        &self,
        ctx: &TenantContext,
        order_number: &str,
    ) -> Result<Order> {
        let order = self
            .orders
            .find_by_number(order_number)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Order, order_number))?;
        ctx.ensure_owned(EntityKind::Order, order.business_id)?;
        Ok(order)
    }

    pub async fn list_orders(&self, ctx: &TenantContext) -> Result<Vec<Order>> {
        self.orders.list_by_business(ctx.business_id).await
    }

    pub async fn list_orders_by_status(
        &self,
        ctx: &TenantContext,
        status: OrderStatus,
    ) -> Result<Vec<Order>> {
        self.orders
            .list_by_business_and_status(ctx.business_id, status)
            .await
    }

    pub async fn list_items(&self, ctx: &TenantContext, order_id: Uuid) -> Result<Vec<OrderItem>> {
        self.get_order(ctx, order_id).await?;
        self.orders.list_items(order_id).await
    }

    async fn reserve_line(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Product> {
        if quantity < 1 {
            return Err(Error::validation("quantity", "must be at least 1"));
        }
        let product = self.catalog.get_product(ctx, product_id).await?;
        self.catalog.reserve(product.id, quantity).await?;
        Ok(product)
    }

    async fn release_reserved(&self, reserved: &[(Uuid, i32)]) {
        for (product_id, quantity) in reserved {
            if let Err(err) = self.catalog.release(*product_id, *quantity).await {
                tracing::error!(
                    product_id = %product_id,
                    "failed to roll back stock reservation: {}",
                    err
                );
            }
        }
    }

    /// Stock is re-read after the reservations have committed, so repeated
    /// lines for one product and concurrent orders are counted. At most one
    /// alert per product per order.
    async fn emit_low_stock_alerts(&self, ctx: &TenantContext, lines: &[(Product, i32)]) {
        let mut checked: Vec<Uuid> = Vec::new();
        for (line_product, _) in lines {
            if checked.contains(&line_product.id) {
                continue;
            }
            checked.push(line_product.id);

            let product = match self.catalog.get_product(ctx, line_product.id).await {
                Ok(product) => product,
                Err(err) => {
                    tracing::warn!(
                        product_id = %line_product.id,
                        "could not re-read stock for low-stock check: {}",
                        err
                    );
                    continue;
                }
            };
            if !product.is_low_stock() {
                continue;
            }

            let event = LowStockEvent {
                business_id: ctx.business_id,
                product_id: product.id,
                product_name: product.name.clone(),
                stock_quantity: product.stock_quantity,
                reorder_level: product.reorder_level,
                occurred_at: Utc::now(),
            };
            tracing::info!(event = ?event, "product low on stock");
            if let Err(err) = self
                .notifier
                .notify(
                    ctx.business_id,
                    "LOW_STOCK",
                    "Low stock",
                    &format!(
                        "{} is down to {} (reorder level {})",
                        product.name, product.stock_quantity, product.reorder_level
                    ),
                    true,
                )
                .await
            {
                tracing::warn!("notification sink failed: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySink, MemoryStore};
    use crate::models::OrderLineRequest;
    use merx_catalog::ProductDraft;
    use rust_decimal_macros::dec;

    struct Fixture {
        engine: OrderEngine,
        catalog: Arc<Catalog>,
        sink: Arc<MemorySink>,
        ctx: TenantContext,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let catalog = Arc::new(Catalog::new(store.clone()));
        let sink = Arc::new(MemorySink::default());
        let engine = OrderEngine::new(store, catalog.clone(), sink.clone(), dec!(0.075));
        Fixture {
            engine,
            catalog,
            sink,
            ctx: TenantContext::new(Uuid::new_v4()),
        }
    }

    fn product_draft(name: &str, price: Decimal, stock: i32, reorder: i32) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            description: None,
            category: None,
            sku: None,
            cost_price: price / dec!(2),
            selling_price: price,
            stock_quantity: stock,
            reorder_level: reorder,
            weight_kg: None,
            length_cm: None,
            width_cm: None,
            height_cm: None,
            is_fragile: false,
        }
    }

    fn request(items: Vec<OrderLineRequest>) -> OrderRequest {
        OrderRequest {
            customer_name: "Chinwe Okafor".to_string(),
            customer_email: Some("chinwe@example.com".to_string()),
            customer_phone: None,
            shipping_address: Some("12 Allen Avenue, Ikeja".to_string()),
            order_source: Some("WHATSAPP".to_string()),
            notes: None,
            payment_status: None,
            items,
        }
    }

    #[tokio::test]
    async fn totals_follow_the_documented_scenario() {
        // productA qty=2 @ 500.00, productB qty=1 @ 1000.00
        // -> subtotal 2000.00, tax 150.00, total 2150.00
        let f = fixture();
        let a = f
            .catalog
            .create_product(&f.ctx, product_draft("A", dec!(500.00), 10, 1))
            .await
            .unwrap();
        let b = f
            .catalog
            .create_product(&f.ctx, product_draft("B", dec!(1000.00), 10, 1))
            .await
            .unwrap();

        let order = f
            .engine
            .create_order(
                &f.ctx,
                request(vec![
                    OrderLineRequest {
                        product_id: a.id,
                        quantity: 2,
                    },
                    OrderLineRequest {
                        product_id: b.id,
                        quantity: 1,
                    },
                ]),
            )
            .await
            .unwrap();

        assert_eq!(order.subtotal, dec!(2000.00));
        assert_eq!(order.tax_amount, dec!(150.00));
        assert_eq!(order.total_amount, dec!(2150.00));
        assert_eq!(order.order_status, OrderStatus::Processing);
        assert_eq!(order.payment_status, OrderPaymentStatus::Pending);
        assert!(order.order_number.starts_with("ORD-"));

        // Stock decremented per line.
        assert_eq!(
            f.catalog.get_product(&f.ctx, a.id).await.unwrap().stock_quantity,
            8
        );
        assert_eq!(
            f.catalog.get_product(&f.ctx, b.id).await.unwrap().stock_quantity,
            9
        );

        let items = f.engine.list_items(&f.ctx, order.id).await.unwrap();
        assert_eq!(items.len(), 2);
        // Pricing is a catalog snapshot, not caller input.
        assert_eq!(items[0].unit_price, dec!(500.00));
        assert_eq!(items[0].total_price, dec!(1000.00));
    }

    #[tokio::test]
    async fn tax_is_rounded_to_two_fraction_digits() {
        let f = fixture();
        let p = f
            .catalog
            .create_product(&f.ctx, product_draft("Odd", dec!(33.33), 10, 0))
            .await
            .unwrap();

        let order = f
            .engine
            .create_order(
                &f.ctx,
                request(vec![OrderLineRequest {
                    product_id: p.id,
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();

        // 33.33 * 0.075 = 2.49975 -> 2.50
        assert_eq!(order.tax_amount, dec!(2.50));
        assert_eq!(order.total_amount, dec!(35.83));
    }

    #[tokio::test]
    async fn empty_order_is_rejected() {
        let f = fixture();
        let err = f.engine.create_order(&f.ctx, request(vec![])).await.unwrap_err();
        assert!(matches!(err, Error::Validation { field: "items", .. }));
    }

    #[tokio::test]
    async fn failed_line_rolls_back_earlier_reservations() {
        let f = fixture();
        let a = f
            .catalog
            .create_product(&f.ctx, product_draft("A", dec!(100.00), 10, 0))
            .await
            .unwrap();
        let b = f
            .catalog
            .create_product(&f.ctx, product_draft("B", dec!(100.00), 1, 0))
            .await
            .unwrap();

        let err = f
            .engine
            .create_order(
                &f.ctx,
                request(vec![
                    OrderLineRequest {
                        product_id: a.id,
                        quantity: 3,
                    },
                    OrderLineRequest {
                        product_id: b.id,
                        quantity: 5,
                    },
                ]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientStock { .. }));

        // A's reservation must have been released.
        assert_eq!(
            f.catalog.get_product(&f.ctx, a.id).await.unwrap().stock_quantity,
            10
        );
        assert_eq!(
            f.catalog.get_product(&f.ctx, b.id).await.unwrap().stock_quantity,
            1
        );
        assert!(f.engine.list_orders(&f.ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_product_rolls_back_and_reports_not_found() {
        let f = fixture();
        let a = f
            .catalog
            .create_product(&f.ctx, product_draft("A", dec!(100.00), 4, 0))
            .await
            .unwrap();

        let err = f
            .engine
            .create_order(
                &f.ctx,
                request(vec![
                    OrderLineRequest {
                        product_id: a.id,
                        quantity: 2,
                    },
                    OrderLineRequest {
                        product_id: Uuid::new_v4(),
                        quantity: 1,
                    },
                ]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(EntityKind::Product, _)));
        assert_eq!(
            f.catalog.get_product(&f.ctx, a.id).await.unwrap().stock_quantity,
            4
        );
    }

    #[tokio::test]
    async fn cancellation_restores_stock_exactly_once() {
        let f = fixture();
        let a = f
            .catalog
            .create_product(&f.ctx, product_draft("A", dec!(250.00), 6, 0))
            .await
            .unwrap();

        let order = f
            .engine
            .create_order(
                &f.ctx,
                request(vec![OrderLineRequest {
                    product_id: a.id,
                    quantity: 4,
                }]),
            )
            .await
            .unwrap();
        assert_eq!(
            f.catalog.get_product(&f.ctx, a.id).await.unwrap().stock_quantity,
            2
        );

        let cancelled = f.engine.cancel_order(&f.ctx, order.id).await.unwrap();
        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
        assert_eq!(
            f.catalog.get_product(&f.ctx, a.id).await.unwrap().stock_quantity,
            6
        );

        // Second cancellation is a no-op, not a second release.
        let again = f.engine.cancel_order(&f.ctx, order.id).await.unwrap();
        assert_eq!(again.order_status, OrderStatus::Cancelled);
        assert_eq!(
            f.catalog.get_product(&f.ctx, a.id).await.unwrap().stock_quantity,
            6
        );
    }

    #[tokio::test]
    async fn delivered_orders_cannot_be_cancelled() {
        let f = fixture();
        let a = f
            .catalog
            .create_product(&f.ctx, product_draft("A", dec!(250.00), 6, 0))
            .await
            .unwrap();
        let order = f
            .engine
            .create_order(
                &f.ctx,
                request(vec![OrderLineRequest {
                    product_id: a.id,
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();

        f.engine
            .update_order_status(&f.ctx, order.id, OrderStatus::Delivered)
            .await
            .unwrap();

        let err = f.engine.cancel_order(&f.ctx, order.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn cross_tenant_order_access_is_forbidden() {
        let f = fixture();
        let a = f
            .catalog
            .create_product(&f.ctx, product_draft("A", dec!(100.00), 5, 0))
            .await
            .unwrap();
        let order = f
            .engine
            .create_order(
                &f.ctx,
                request(vec![OrderLineRequest {
                    product_id: a.id,
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();

        let other = TenantContext::new(Uuid::new_v4());
        let err = f.engine.get_order(&other, order.id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(EntityKind::Order)));

        let err = f.engine.cancel_order(&other, order.id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(EntityKind::Order)));
    }

    #[tokio::test]
    async fn low_stock_alert_fires_when_reorder_level_is_reached() {
        let f = fixture();
        let a = f
            .catalog
            .create_product(&f.ctx, product_draft("A", dec!(100.00), 5, 3))
            .await
            .unwrap();

        f.engine
            .create_order(
                &f.ctx,
                request(vec![OrderLineRequest {
                    product_id: a.id,
                    quantity: 2,
                }]),
            )
            .await
            .unwrap();

        let sent = f.sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "LOW_STOCK");
    }

    #[tokio::test]
    async fn repeated_lines_for_one_product_alert_on_the_combined_draw() {
        let f = fixture();
        let a = f
            .catalog
            .create_product(&f.ctx, product_draft("A", dec!(100.00), 10, 7))
            .await
            .unwrap();

        // 10 - (2 + 2) = 6 <= 7: low only once both lines are counted,
        // and a single alert covers the product.
        f.engine
            .create_order(
                &f.ctx,
                request(vec![
                    OrderLineRequest {
                        product_id: a.id,
                        quantity: 2,
                    },
                    OrderLineRequest {
                        product_id: a.id,
                        quantity: 2,
                    },
                ]),
            )
            .await
            .unwrap();

        let sent = f.sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "LOW_STOCK");
    }

    #[tokio::test]
    async fn delete_order_removes_items_with_it() {
        let f = fixture();
        let a = f
            .catalog
            .create_product(&f.ctx, product_draft("A", dec!(100.00), 5, 0))
            .await
            .unwrap();
        let order = f
            .engine
            .create_order(
                &f.ctx,
                request(vec![OrderLineRequest {
                    product_id: a.id,
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();

        f.engine.delete_order(&f.ctx, order.id).await.unwrap();
        let err = f.engine.get_order(&f.ctx, order.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(EntityKind::Order, _)));
        let err = f.engine.list_items(&f.ctx, order.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(EntityKind::Order, _)));
    }

    #[tokio::test]
    async fn lookup_by_order_number_is_tenant_scoped() {
        let f = fixture();
        let a = f
            .catalog
            .create_product(&f.ctx, product_draft("A", dec!(100.00), 5, 0))
            .await
            .unwrap();
        let order = f
            .engine
            .create_order(
                &f.ctx,
                request(vec![OrderLineRequest {
                    product_id: a.id,
                    quantity: 1,
                }]),
            )
            .await
            .unwrap();

        let found = f
            .engine
            .get_order_by_number(&f.ctx, &order.order_number)
            .await
            .unwrap();
        assert_eq!(found.id, order.id);

        let other = TenantContext::new(Uuid::new_v4());
        let err = f
            .engine
            .get_order_by_number(&other, &order.order_number)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(EntityKind::Order)));
    }
}
