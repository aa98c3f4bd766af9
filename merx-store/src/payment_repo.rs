use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use merx_core::{EntityKind, Error, Result};
use merx_order::models::{OrderPaymentStatus, Payment, PaymentMethod, PaymentStatus};
use merx_order::repository::PaymentRepository;

use crate::database::{map_db_err, parse_status};

pub struct StorePaymentRepository {
    pool: PgPool,
}

impl StorePaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    reference: String,
    amount: Decimal,
    method: String,
    status: String,
    transaction_reference: Option<String>,
    processing_fee: Option<Decimal>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment> {
        Ok(Payment {
            id: self.id,
            order_id: self.order_id,
            reference: self.reference,
            amount: self.amount,
            method: parse_status(&self.method, PaymentMethod::parse)?,
            status: parse_status(&self.status, PaymentStatus::parse)?,
            transaction_reference: self.transaction_reference,
            processing_fee: self.processing_fee,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, order_id, reference, amount, method, status, \
     transaction_reference, processing_fee, notes, created_at";

#[async_trait]
impl PaymentRepository for StorePaymentRepository {
    async fn record(&self, payment: &Payment, order_status: OrderPaymentStatus) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, reference, amount, method, status,
                                  transaction_reference, processing_fee, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(payment.id)
        .bind(payment.order_id)
        .bind(&payment.reference)
        .bind(payment.amount)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.transaction_reference)
        .bind(payment.processing_fee)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        sqlx::query("UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(payment.order_id)
            .bind(order_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE order_id = $1 ORDER BY created_at ASC",
            PAYMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            "SELECT p.id, p.order_id, p.reference, p.amount, p.method, p.status, \
             p.transaction_reference, p.processing_fee, p.notes, p.created_at \
             FROM payments p \
             JOIN orders o ON o.id = p.order_id \
             WHERE o.business_id = $1 ORDER BY p.created_at DESC",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn transition(
        &self,
        id: Uuid,
        status: PaymentStatus,
        order_id: Uuid,
        order_status: OrderPaymentStatus,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let updated: Option<Uuid> =
            sqlx::query_scalar("UPDATE payments SET status = $2 WHERE id = $1 RETURNING id")
                .bind(id)
                .bind(status.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_err)?;
        updated.ok_or_else(|| Error::not_found(EntityKind::Payment, id))?;

        sqlx::query("UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id)
            .bind(order_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }
}
