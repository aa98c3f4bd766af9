use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use merx_core::tenancy::TenantContext;
use merx_core::{EntityKind, Error, Result};

use crate::models::{Order, OrderStatus, Shipment, ShipmentRequest, ShipmentStatus};
use crate::refs;
use crate::repository::{OrderRepository, ShipmentRepository};

/// Manages the single shipment of each order and mirrors shipment
/// progress onto the order status.
pub struct ShipmentTracker {
    shipments: Arc<dyn ShipmentRepository>,
    orders: Arc<dyn OrderRepository>,
}

impl ShipmentTracker {
    pub fn new(shipments: Arc<dyn ShipmentRepository>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { shipments, orders }
    }

    /// Create the shipment for an order and move the order to
    /// READY_TO_SHIP, both as one atomic write. An order gets at most one
    /// shipment.
    pub async fn create_shipment(
        &self,
        ctx: &TenantContext,
        req: ShipmentRequest,
    ) -> Result<Shipment> {
        self.owned_order(ctx, req.order_id).await?;
        if self.shipments.find_by_order(req.order_id).await?.is_some() {
            return Err(Error::conflict(
                "shipment",
                "order already has a shipment",
            ));
        }
        if req.carrier_name.trim().is_empty() {
            return Err(Error::validation("carrier_name", "must not be empty"));
        }
        if req.receiver_name.trim().is_empty() {
            return Err(Error::validation("receiver_name", "must not be empty"));
        }

        let now = Utc::now();
        let mut shipment = Shipment {
            id: Uuid::new_v4(),
            order_id: req.order_id,
            tracking_number: refs::tracking_number(&req.carrier_name),
            carrier_name: req.carrier_name,
            status: ShipmentStatus::Preparing,
            estimated_delivery: req.estimated_delivery,
            actual_delivery: None,
            shipping_cost: req.shipping_cost,
            sender_name: req.sender_name,
            sender_address: req.sender_address,
            sender_phone: req.sender_phone,
            receiver_name: req.receiver_name,
            receiver_address: req.receiver_address,
            receiver_phone: req.receiver_phone,
            package_weight: req.package_weight,
            package_value: req.package_value,
            package_description: req.package_description,
            is_fragile: req.is_fragile,
            created_at: now,
            updated_at: now,
        };

        match self
            .shipments
            .create(&shipment, OrderStatus::ReadyToShip)
            .await
        {
            Ok(()) => {}
            Err(Error::Conflict {
                field: "tracking_number",
                ..
            }) => {
                shipment.tracking_number = refs::tracking_number(&shipment.carrier_name);
                self.shipments
                    .create(&shipment, OrderStatus::ReadyToShip)
                    .await?;
            }
            Err(err) => return Err(err),
        }
        Ok(shipment)
    }

    /// Move a shipment to a new status, applying the order-status side
    /// effect atomically. Entering DELIVERED stamps the actual delivery
    /// time once; repeating it leaves the original stamp in place.
    pub async fn update_status(
        &self,
        ctx: &TenantContext,
        shipment_id: Uuid,
        status: ShipmentStatus,
    ) -> Result<Shipment> {
        let mut shipment = self.get_shipment(ctx, shipment_id).await?;

        let actual_delivery = if status == ShipmentStatus::Delivered
            && shipment.actual_delivery.is_none()
        {
            Some(Utc::now())
        } else {
            None
        };

        self.shipments
            .transition(shipment_id, status, actual_delivery, status.order_effect())
            .await?;

        shipment.status = status;
        if actual_delivery.is_some() {
            shipment.actual_delivery = actual_delivery;
        }
        shipment.updated_at = Utc::now();
        Ok(shipment)
    }

    pub async fn get_shipment(&self, ctx: &TenantContext, shipment_id: Uuid) -> Result<Shipment> {
        let shipment = self
            .shipments
            .find(shipment_id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Shipment, shipment_id))?;
        self.owned_order(ctx, shipment.order_id).await?;
        Ok(shipment)
    }

    pub async fn get_by_order(&self, ctx: &TenantContext, order_id: Uuid) -> Result<Shipment> {
        self.owned_order(ctx, order_id).await?;
        self.shipments
            .find_by_order(order_id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Shipment, order_id))
    }

    pub async fn get_by_tracking(
        &self,
        ctx: &TenantContext,
        tracking_number: &str,
    ) -> Result<Shipment> {
        let shipment = self
            .shipments
            .find_by_tracking(tracking_number)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Shipment, tracking_number))?;
        self.owned_order(ctx, shipment.order_id).await?;
        Ok(shipment)
    }

    pub async fn list_by_business(&self, ctx: &TenantContext) -> Result<Vec<Shipment>> {
        self.shipments.list_by_business(ctx.business_id).await
    }

    pub async fn list_by_status(
        &self,
        ctx: &TenantContext,
        status: ShipmentStatus,
    ) -> Result<Vec<Shipment>> {
        self.shipments
            .list_by_business_and_status(ctx.business_id, status)
            .await
    }

    async fn owned_order(&self, ctx: &TenantContext, order_id: Uuid) -> Result<Order> {
        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Order, order_id))?;
        ctx.ensure_owned(EntityKind::Order, order.business_id)?;
        Ok(order)
    }
}
