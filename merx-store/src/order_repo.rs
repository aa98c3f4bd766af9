use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use merx_core::Result;
use merx_order::models::{Order, OrderItem, OrderPaymentStatus, OrderStatus};
use merx_order::repository::OrderRepository;

use crate::database::{map_db_err, parse_status};

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    business_id: Uuid,
    order_number: String,
    customer_name: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    shipping_address: Option<String>,
    order_source: Option<String>,
    notes: Option<String>,
    payment_status: String,
    order_status: String,
    subtotal: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order> {
        Ok(Order {
            id: self.id,
            business_id: self.business_id,
            order_number: self.order_number,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            shipping_address: self.shipping_address,
            order_source: self.order_source,
            notes: self.notes,
            payment_status: parse_status(&self.payment_status, OrderPaymentStatus::parse)?,
            order_status: parse_status(&self.order_status, OrderStatus::parse)?,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total_amount: self.total_amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    created_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            created_at: row.created_at,
        }
    }
}

const ORDER_COLUMNS: &str = "id, business_id, order_number, customer_name, customer_email, \
     customer_phone, shipping_address, order_source, notes, payment_status, order_status, \
     subtotal, tax_amount, total_amount, created_at, updated_at";

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, business_id, order_number, customer_name, customer_email,
                                customer_phone, shipping_address, order_source, notes,
                                payment_status, order_status, subtotal, tax_amount, total_amount,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(order.id)
        .bind(order.business_id)
        .bind(&order.order_number)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(&order.shipping_address)
        .bind(&order.order_source)
        .bind(&order.notes)
        .bind(order.payment_status.as_str())
        .bind(order.order_status.as_str())
        .bind(order.subtotal)
        .bind(order.tax_amount)
        .bind(order.total_amount)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, product_name, quantity,
                                         unit_price, total_price, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total_price)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        }

        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_err)?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE order_number = $1",
            ORDER_COLUMNS
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE business_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }

    async fn list_by_business_and_status(
        &self,
        business_id: Uuid,
        status: OrderStatus,
    ) -> Result<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE business_id = $1 AND order_status = $2 \
             ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(business_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }

    async fn list_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT id, order_id, product_id, product_name, quantity, unit_price, total_price, \
             created_at FROM order_items WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<()> {
        sqlx::query("UPDATE orders SET order_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn update_payment_status(&self, id: Uuid, status: OrderPaymentStatus) -> Result<()> {
        sqlx::query("UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }
}
