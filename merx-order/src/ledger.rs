use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use merx_core::tenancy::TenantContext;
use merx_core::{EntityKind, Error, Result};
use merx_shared::models::events::PaymentRecordedEvent;

use crate::models::{Order, OrderPaymentStatus, Payment, PaymentRequest, PaymentStatus};
use crate::refs;
use crate::repository::{OrderRepository, PaymentRepository};

/// Derive an order's payment state from its recorded payments.
///
/// Only COMPLETED payments count: an order with nothing but pending or
/// failed attempts is still PENDING, and any mix of completed and
/// not-completed rows is PARTIAL.
pub fn aggregate_payment_status(statuses: &[PaymentStatus]) -> OrderPaymentStatus {
    if statuses.is_empty() {
        return OrderPaymentStatus::Pending;
    }
    let completed = statuses
        .iter()
        .filter(|s| **s == PaymentStatus::Completed)
        .count();
    if completed == statuses.len() {
        OrderPaymentStatus::Paid
    } else if completed > 0 {
        OrderPaymentStatus::Partial
    } else {
        OrderPaymentStatus::Pending
    }
}

/// Records payments against orders and keeps the order-level payment
/// status in sync with the payment rows.
pub struct PaymentLedger {
    payments: Arc<dyn PaymentRepository>,
    orders: Arc<dyn OrderRepository>,
}

impl PaymentLedger {
    pub fn new(payments: Arc<dyn PaymentRepository>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { payments, orders }
    }

    /// Record a completed payment against an order. The payment row and the
    /// re-derived order payment status are written as one atomic unit.
    pub async fn process_payment(
        &self,
        ctx: &TenantContext,
        req: PaymentRequest,
    ) -> Result<Payment> {
        self.owned_order(ctx, req.order_id).await?;
        if req.amount <= Decimal::ZERO {
            return Err(Error::validation("amount", "must be greater than zero"));
        }

        let mut statuses: Vec<PaymentStatus> = self
            .payments
            .list_by_order(req.order_id)
            .await?
            .iter()
            .map(|p| p.status)
            .collect();
        statuses.push(PaymentStatus::Completed);
        let derived = aggregate_payment_status(&statuses);

        let mut payment = Payment {
            id: Uuid::new_v4(),
            order_id: req.order_id,
            reference: refs::payment_reference(),
            amount: req.amount.round_dp(2),
            method: req.method,
            status: PaymentStatus::Completed,
            transaction_reference: req.transaction_reference,
            processing_fee: req.processing_fee,
            notes: req.notes,
            created_at: Utc::now(),
        };

        match self.payments.record(&payment, derived).await {
            Ok(()) => {}
            Err(Error::Conflict {
                field: "reference", ..
            }) => {
                payment.reference = refs::payment_reference();
                self.payments.record(&payment, derived).await?;
            }
            Err(err) => return Err(err),
        }

        let event = PaymentRecordedEvent {
            business_id: ctx.business_id,
            order_id: payment.order_id,
            payment_id: payment.id,
            amount: payment.amount,
            occurred_at: payment.created_at,
        };
        tracing::info!(event = ?event, "payment recorded");

        Ok(payment)
    }

    /// Change a payment row's status (e.g. marking a transfer FAILED after
    /// the fact). The row and the re-derived order payment status are
    /// written as one atomic unit.
    pub async fn update_payment_status(
        &self,
        ctx: &TenantContext,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Payment> {
        let mut payment = self.get_payment(ctx, payment_id).await?;

        let statuses: Vec<PaymentStatus> = self
            .payments
            .list_by_order(payment.order_id)
            .await?
            .iter()
            .map(|p| if p.id == payment_id { status } else { p.status })
            .collect();

        self.payments
            .transition(
                payment_id,
                status,
                payment.order_id,
                aggregate_payment_status(&statuses),
            )
            .await?;
        payment.status = status;
        Ok(payment)
    }

    pub async fn get_payment(&self, ctx: &TenantContext, payment_id: Uuid) -> Result<Payment> {
        let payment = self
            .payments
            .find(payment_id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Payment, payment_id))?;
        // Ownership is carried by the parent order.
        self.owned_order(ctx, payment.order_id).await?;
        Ok(payment)
    }

    pub async fn list_by_order(&self, ctx: &TenantContext, order_id: Uuid) -> Result<Vec<Payment>> {
        self.owned_order(ctx, order_id).await?;
        self.payments.list_by_order(order_id).await
    }

    pub async fn list_by_business(&self, ctx: &TenantContext) -> Result<Vec<Payment>> {
        self.payments.list_by_business(ctx.business_id).await
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::models::{Order, OrderStatus, PaymentMethod};
    use rust_decimal_macros::dec;

    fn seed_order(ctx: &TenantContext, total: Decimal) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            business_id: ctx.business_id,
            order_number: refs::order_number(),
            customer_name: "Test Customer".to_string(),
            customer_email: None,
            customer_phone: None,
            shipping_address: None,
            order_source: None,
            notes: None,
            payment_status: OrderPaymentStatus::Pending,
            order_status: OrderStatus::Processing,
            subtotal: total,
            tax_amount: Decimal::ZERO,
            total_amount: total,
            created_at: now,
            updated_at: now,
        }
    }

    async fn fixture() -> (PaymentLedger, Arc<MemoryStore>, TenantContext, Order) {
        let store = MemoryStore::new();
        let ledger = PaymentLedger::new(store.clone(), store.clone());
        let ctx = TenantContext::new(Uuid::new_v4());
        let order = seed_order(&ctx, dec!(2150.00));
        OrderRepository::create(store.as_ref(), &order, &[])
            .await
            .unwrap();
        (ledger, store, ctx, order)
    }

    fn payment_request(order_id: Uuid, amount: Decimal) -> PaymentRequest {
        PaymentRequest {
            order_id,
            amount,
            method: PaymentMethod::BankTransfer,
            transaction_reference: None,
            processing_fee: None,
            notes: None,
        }
    }

    #[test]
    fn aggregation_covers_every_documented_case() {
        use OrderPaymentStatus::*;
        use PaymentStatus as P;

        assert_eq!(aggregate_payment_status(&[]), Pending);
        assert_eq!(aggregate_payment_status(&[P::Completed]), Paid);
        assert_eq!(
            aggregate_payment_status(&[P::Completed, P::Completed]),
            Paid
        );
        assert_eq!(aggregate_payment_status(&[P::Completed, P::Pending]), Partial);
        assert_eq!(aggregate_payment_status(&[P::Failed]), Pending);
        assert_eq!(aggregate_payment_status(&[P::Failed, P::Pending]), Pending);
        // Order of rows must not matter.
        assert_eq!(
            aggregate_payment_status(&[P::Pending, P::Completed]),
            aggregate_payment_status(&[P::Completed, P::Pending])
        );
    }

    #[tokio::test]
    async fn recording_a_payment_marks_the_order_paid() {
        let (ledger, store, ctx, order) = fixture().await;

        let payment = ledger
            .process_payment(&ctx, payment_request(order.id, dec!(2150.00)))
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.reference.starts_with("PAY-"));

        let stored = OrderRepository::find(store.as_ref(), order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, OrderPaymentStatus::Paid);
    }

    #[tokio::test]
    async fn failing_a_payment_downgrades_the_order() {
        let (ledger, store, ctx, order) = fixture().await;

        let paid = ledger
            .process_payment(&ctx, payment_request(order.id, dec!(1000.00)))
            .await
            .unwrap();
        ledger
            .process_payment(&ctx, payment_request(order.id, dec!(1150.00)))
            .await
            .unwrap();
        assert_eq!(
            OrderRepository::find(store.as_ref(), order.id)
                .await
                .unwrap()
                .unwrap()
                .payment_status,
            OrderPaymentStatus::Paid
        );

        ledger
            .update_payment_status(&ctx, paid.id, PaymentStatus::Failed)
            .await
            .unwrap();
        assert_eq!(
            OrderRepository::find(store.as_ref(), order.id)
                .await
                .unwrap()
                .unwrap()
                .payment_status,
            OrderPaymentStatus::Partial
        );
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let (ledger, _store, ctx, order) = fixture().await;

        let err = ledger
            .process_payment(&ctx, payment_request(order.id, dec!(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { field: "amount", .. }));

        let err = ledger
            .process_payment(&ctx, payment_request(order.id, dec!(-5.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { field: "amount", .. }));
    }

    #[tokio::test]
    async fn payments_are_tenant_scoped_through_their_order() {
        let (ledger, _store, ctx, order) = fixture().await;
        let payment = ledger
            .process_payment(&ctx, payment_request(order.id, dec!(100.00)))
            .await
            .unwrap();

        let other = TenantContext::new(Uuid::new_v4());
        let err = ledger
            .process_payment(&other, payment_request(order.id, dec!(100.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(EntityKind::Order)));

        let err = ledger.get_payment(&other, payment.id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(EntityKind::Order)));

        let err = ledger.list_by_order(&other, order.id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(EntityKind::Order)));
    }

    #[tokio::test]
    async fn unknown_order_is_reported_before_any_write() {
        let (ledger, store, ctx, _order) = fixture().await;

        let err = ledger
            .process_payment(&ctx, payment_request(Uuid::new_v4(), dec!(50.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(EntityKind::Order, _)));
        assert!(ledger.list_by_business(&ctx).await.unwrap().is_empty());
        let _ = store;
    }

    struct RejectingPayments {
        inner: Arc<MemoryStore>,
    }

    #[async_trait::async_trait]
    impl PaymentRepository for RejectingPayments {
        async fn record(&self, _payment: &Payment, _order_status: OrderPaymentStatus) -> Result<()> {
            Err(Error::Storage("connection reset".to_string()))
        }

        async fn find(&self, id: Uuid) -> Result<Option<Payment>> {
            PaymentRepository::find(self.inner.as_ref(), id).await
        }

        async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<Payment>> {
            PaymentRepository::list_by_order(self.inner.as_ref(), order_id).await
        }

        async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Payment>> {
            PaymentRepository::list_by_business(self.inner.as_ref(), business_id).await
        }

        async fn transition(
            &self,
            id: Uuid,
            status: PaymentStatus,
            order_id: Uuid,
            order_status: OrderPaymentStatus,
        ) -> Result<()> {
            PaymentRepository::transition(self.inner.as_ref(), id, status, order_id, order_status)
                .await
        }
    }

    #[tokio::test]
    async fn a_failed_write_leaves_no_partial_payment_state() {
        let store = MemoryStore::new();
        let ctx = TenantContext::new(Uuid::new_v4());
        let order = seed_order(&ctx, dec!(500.00));
        OrderRepository::create(store.as_ref(), &order, &[])
            .await
            .unwrap();

        let ledger = PaymentLedger::new(
            Arc::new(RejectingPayments {
                inner: store.clone(),
            }),
            store.clone(),
        );

        let err = ledger
            .process_payment(&ctx, payment_request(order.id, dec!(500.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        // The single write failed, so neither half of it is visible.
        let stored = OrderRepository::find(store.as_ref(), order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, OrderPaymentStatus::Pending);
        assert!(PaymentRepository::list_by_order(store.as_ref(), order.id)
            .await
            .unwrap()
            .is_empty());
    }
}
