use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use merx_core::{EntityKind, Error, Result};
use merx_order::models::{OrderStatus, Shipment, ShipmentStatus};
use merx_order::repository::ShipmentRepository;

use crate::database::{map_db_err, parse_status};

pub struct StoreShipmentRepository {
    pool: PgPool,
}

impl StoreShipmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ShipmentRow {
    id: Uuid,
    order_id: Uuid,
    tracking_number: String,
    carrier_name: String,
    status: String,
    estimated_delivery: Option<DateTime<Utc>>,
    actual_delivery: Option<DateTime<Utc>>,
    shipping_cost: Option<Decimal>,
    sender_name: Option<String>,
    sender_address: Option<String>,
    sender_phone: Option<String>,
    receiver_name: String,
    receiver_address: String,
    receiver_phone: Option<String>,
    package_weight: Option<Decimal>,
    package_value: Option<Decimal>,
    package_description: Option<String>,
    is_fragile: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShipmentRow {
    fn into_shipment(self) -> Result<Shipment> {
        Ok(Shipment {
            id: self.id,
            order_id: self.order_id,
            tracking_number: self.tracking_number,
            carrier_name: self.carrier_name,
            status: parse_status(&self.status, ShipmentStatus::parse)?,
            estimated_delivery: self.estimated_delivery,
            actual_delivery: self.actual_delivery,
            shipping_cost: self.shipping_cost,
            sender_name: self.sender_name,
            sender_address: self.sender_address,
            sender_phone: self.sender_phone,
            receiver_name: self.receiver_name,
            receiver_address: self.receiver_address,
            receiver_phone: self.receiver_phone,
            package_weight: self.package_weight,
            package_value: self.package_value,
            package_description: self.package_description,
            is_fragile: self.is_fragile,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SHIPMENT_COLUMNS: &str = "id, order_id, tracking_number, carrier_name, status, \
     estimated_delivery, actual_delivery, shipping_cost, sender_name, sender_address, \
     sender_phone, receiver_name, receiver_address, receiver_phone, package_weight, \
     package_value, package_description, is_fragile, created_at, updated_at";

#[async_trait]
impl ShipmentRepository for StoreShipmentRepository {
    async fn create(&self, shipment: &Shipment, order_status: OrderStatus) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        sqlx::query(
            r#"
            INSERT INTO shipments (id, order_id, tracking_number, carrier_name, status,
                                   estimated_delivery, actual_delivery, shipping_cost,
                                   sender_name, sender_address, sender_phone, receiver_name,
                                   receiver_address, receiver_phone, package_weight,
                                   package_value, package_description, is_fragile,
                                   created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20)
            "#,
        )
        .bind(shipment.id)
        .bind(shipment.order_id)
        .bind(&shipment.tracking_number)
        .bind(&shipment.carrier_name)
        .bind(shipment.status.as_str())
        .bind(shipment.estimated_delivery)
        .bind(shipment.actual_delivery)
        .bind(shipment.shipping_cost)
        .bind(&shipment.sender_name)
        .bind(&shipment.sender_address)
        .bind(&shipment.sender_phone)
        .bind(&shipment.receiver_name)
        .bind(&shipment.receiver_address)
        .bind(&shipment.receiver_phone)
        .bind(shipment.package_weight)
        .bind(shipment.package_value)
        .bind(&shipment.package_description)
        .bind(shipment.is_fragile)
        .bind(shipment.created_at)
        .bind(shipment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        sqlx::query("UPDATE orders SET order_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(shipment.order_id)
            .bind(order_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Shipment>> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM shipments WHERE id = $1",
            SHIPMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.map(ShipmentRow::into_shipment).transpose()
    }

    async fn find_by_order(&self, order_id: Uuid) -> Result<Option<Shipment>> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM shipments WHERE order_id = $1",
            SHIPMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.map(ShipmentRow::into_shipment).transpose()
    }

    async fn find_by_tracking(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM shipments WHERE tracking_number = $1",
            SHIPMENT_COLUMNS
        ))
        .bind(tracking_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.map(ShipmentRow::into_shipment).transpose()
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Shipment>> {
        let rows: Vec<ShipmentRow> = sqlx::query_as(
            "SELECT s.id, s.order_id, s.tracking_number, s.carrier_name, s.status, \
             s.estimated_delivery, s.actual_delivery, s.shipping_cost, s.sender_name, \
             s.sender_address, s.sender_phone, s.receiver_name, s.receiver_address, \
             s.receiver_phone, s.package_weight, s.package_value, s.package_description, \
             s.is_fragile, s.created_at, s.updated_at \
             FROM shipments s \
             JOIN orders o ON o.id = s.order_id \
             WHERE o.business_id = $1 ORDER BY s.created_at DESC",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.into_iter().map(ShipmentRow::into_shipment).collect()
    }

    async fn list_by_business_and_status(
        &self,
        business_id: Uuid,
        status: ShipmentStatus,
    ) -> Result<Vec<Shipment>> {
        let rows: Vec<ShipmentRow> = sqlx::query_as(
            "SELECT s.id, s.order_id, s.tracking_number, s.carrier_name, s.status, \
             s.estimated_delivery, s.actual_delivery, s.shipping_cost, s.sender_name, \
             s.sender_address, s.sender_phone, s.receiver_name, s.receiver_address, \
             s.receiver_phone, s.package_weight, s.package_value, s.package_description, \
             s.is_fragile, s.created_at, s.updated_at \
             FROM shipments s \
             JOIN orders o ON o.id = s.order_id \
             WHERE o.business_id = $1 AND s.status = $2 ORDER BY s.created_at DESC",
        )
        .bind(business_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.into_iter().map(ShipmentRow::into_shipment).collect()
    }

    async fn transition(
        &self,
        id: Uuid,
        status: ShipmentStatus,
        actual_delivery: Option<DateTime<Utc>>,
        order_status: Option<OrderStatus>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let order_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE shipments
            SET status = $2,
                actual_delivery = COALESCE(actual_delivery, $3),
                updated_at = NOW()
            WHERE id = $1
            RETURNING order_id
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(actual_delivery)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let order_id = order_id.ok_or_else(|| Error::not_found(EntityKind::Shipment, id))?;

        if let Some(order_status) = order_status {
            sqlx::query("UPDATE orders SET order_status = $2, updated_at = NOW() WHERE id = $1")
                .bind(order_id)
                .bind(order_status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
        }

        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }
}
