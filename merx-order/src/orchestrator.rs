use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use merx_core::gateway::{GatewayAdapter, GatewayEvent, GatewayEventKind, GatewayIntent};
use merx_core::tenancy::TenantContext;
use merx_core::{Error, Result};

use crate::models::Order;
use crate::repository::OrderRepository;

/// Glue between orders and the external payment gateway: creates intents
/// for an order's outstanding total and decodes gateway callbacks.
///
/// Callback events are surfaced but not yet settled into the ledger;
/// recording the resulting payment row is left to the caller.
pub struct GatewayOrchestrator {
    gateway: Arc<dyn GatewayAdapter>,
    orders: Arc<dyn OrderRepository>,
    currency: String,
}

impl GatewayOrchestrator {
    pub fn new(
        gateway: Arc<dyn GatewayAdapter>,
        orders: Arc<dyn OrderRepository>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            orders,
            currency: currency.into(),
        }
    }

    /// Create a payment intent for the order's total amount.
    pub async fn create_intent(&self, ctx: &TenantContext, order_id: Uuid) -> Result<GatewayIntent> {
        let order = self.owned_order(ctx, order_id).await?;
        let metadata = json!({
            "order_id": order.id,
            "order_number": order.order_number,
            "business_id": order.business_id,
        });
        self.gateway
            .create_intent(order.id, order.total_amount, &self.currency, metadata)
            .await
    }

    pub async fn confirm(&self, intent_id: &str) -> Result<bool> {
        self.gateway.confirm(intent_id).await
    }

    /// Verify and decode a callback from the provider. Unrecognized event
    /// types come back as `Unrecognized` so the caller can acknowledge them
    /// without acting.
    pub async fn handle_callback(&self, payload: &str, signature: &str) -> Result<GatewayEvent> {
        let event = self.gateway.handle_callback(payload, signature).await?;
        match event.kind {
            GatewayEventKind::IntentSucceeded => {
                tracing::info!(intent_id = %event.intent_id, "gateway reported intent success")
            }
            GatewayEventKind::IntentFailed => {
                tracing::warn!(intent_id = %event.intent_id, "gateway reported intent failure")
            }
            GatewayEventKind::Unrecognized => {
                tracing::debug!(intent_id = %event.intent_id, "ignoring unrecognized gateway event")
            }
        }
        Ok(event)
    }

    async fn owned_order(&self, ctx: &TenantContext, order_id: Uuid) -> Result<Order> {
        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| Error::not_found(merx_core::EntityKind::Order, order_id))?;
        ctx.ensure_owned(merx_core::EntityKind::Order, order.business_id)?;
        Ok(order)
    }
}

/// Offline stand-in for the real provider. Signs nothing; callbacks are
/// accepted when the signature equals the mock secret.
pub struct MockGatewayAdapter {
    secret: String,
}

impl MockGatewayAdapter {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[derive(Deserialize)]
struct MockCallback {
    #[serde(rename = "type")]
    event_type: String,
    intent_id: String,
}

#[async_trait::async_trait]
impl GatewayAdapter for MockGatewayAdapter {
    async fn create_intent(
        &self,
        order_id: Uuid,
        amount: Decimal,
        currency: &str,
        _metadata: serde_json::Value,
    ) -> Result<GatewayIntent> {
        if amount <= Decimal::ZERO {
            return Err(Error::validation("amount", "must be greater than zero"));
        }
        let id = format!("mock_pi_{}", order_id.simple());
        Ok(GatewayIntent {
            client_secret: Some(format!("{}_secret", id)),
            id,
            order_id,
            amount,
            currency: currency.to_string(),
            created_at: Utc::now(),
        })
    }

    async fn confirm(&self, intent_id: &str) -> Result<bool> {
        Ok(intent_id.starts_with("mock_pi_"))
    }

    async fn handle_callback(&self, payload: &str, signature: &str) -> Result<GatewayEvent> {
        if signature != self.secret {
            return Err(Error::validation("signature", "callback signature mismatch"));
        }
        let callback: MockCallback = serde_json::from_str(payload)
            .map_err(|e| Error::validation("payload", format!("malformed callback: {}", e)))?;
        let kind = match callback.event_type.as_str() {
            "payment_intent.succeeded" => GatewayEventKind::IntentSucceeded,
            "payment_intent.payment_failed" => GatewayEventKind::IntentFailed,
            _ => GatewayEventKind::Unrecognized,
        };
        Ok(GatewayEvent {
            kind,
            intent_id: callback.intent_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::models::{OrderPaymentStatus, OrderStatus};
    use crate::refs;
    use rust_decimal_macros::dec;

    fn seed_order(ctx: &TenantContext) -> Order {
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
            subtotal: dec!(2000.00),
            tax_amount: dec!(150.00),
            total_amount: dec!(2150.00),
            created_at: now,
            updated_at: now,
        }
    }

    async fn fixture() -> (GatewayOrchestrator, TenantContext, Order) {
        let store = MemoryStore::new();
        let gateway = Arc::new(MockGatewayAdapter::new("whsec_test"));
        let orchestrator = GatewayOrchestrator::new(gateway, store.clone(), "NGN");
        let ctx = TenantContext::new(Uuid::new_v4());
        let order = seed_order(&ctx);
        OrderRepository::create(store.as_ref(), &order, &[])
            .await
            .unwrap();
        (orchestrator, ctx, order)
    }

    #[tokio::test]
    async fn intent_carries_the_order_total() {
        let (orchestrator, ctx, order) = fixture().await;

        let intent = orchestrator.create_intent(&ctx, order.id).await.unwrap();
        assert_eq!(intent.amount, dec!(2150.00));
        assert_eq!(intent.currency, "NGN");
        assert_eq!(intent.order_id, order.id);
        assert!(intent.id.starts_with("mock_pi_"));
        assert!(intent.client_secret.is_some());

        assert!(orchestrator.confirm(&intent.id).await.unwrap());
    }

    #[tokio::test]
    async fn intents_are_tenant_scoped() {
        let (orchestrator, _ctx, order) = fixture().await;
        let other = TenantContext::new(Uuid::new_v4());

        let err = orchestrator.create_intent(&other, order.id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Forbidden(merx_core::EntityKind::Order)
        ));
    }

    #[tokio::test]
    async fn callbacks_are_decoded_by_event_type() {
        let (orchestrator, _ctx, _order) = fixture().await;

        let payload = r#"{"type": "payment_intent.succeeded", "intent_id": "mock_pi_1"}"#;
        let event = orchestrator
            .handle_callback(payload, "whsec_test")
            .await
            .unwrap();
        assert_eq!(event.kind, GatewayEventKind::IntentSucceeded);
        assert_eq!(event.intent_id, "mock_pi_1");

        let payload = r#"{"type": "payment_intent.payment_failed", "intent_id": "mock_pi_2"}"#;
        let event = orchestrator
            .handle_callback(payload, "whsec_test")
            .await
            .unwrap();
        assert_eq!(event.kind, GatewayEventKind::IntentFailed);

        let payload = r#"{"type": "charge.refunded", "intent_id": "mock_pi_3"}"#;
        let event = orchestrator
            .handle_callback(payload, "whsec_test")
            .await
            .unwrap();
        assert_eq!(event.kind, GatewayEventKind::Unrecognized);
    }

    #[tokio::test]
    async fn bad_signatures_are_rejected() {
        let (orchestrator, _ctx, _order) = fixture().await;

        let payload = r#"{"type": "payment_intent.succeeded", "intent_id": "mock_pi_1"}"#;
        let err = orchestrator
            .handle_callback(payload, "wrong")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                field: "signature",
                ..
            }
        ));
    }
}
