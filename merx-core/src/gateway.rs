use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// A payment intent as reported by the external gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayIntent {
    /// Provider's id (e.g. pi_123).
    pub id: String,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub client_secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Events recognized from a gateway callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEventKind {
    IntentSucceeded,
    IntentFailed,
    Unrecognized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub kind: GatewayEventKind,
    pub intent_id: String,
}

/// Adapter over a third-party payment-intent API. The fulfillment core only
/// observes a confirm/fail signal; settlement wiring into the ledger is an
/// explicit integration gap.
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    /// Create a payment intent with the provider and return its client
    /// secret for the frontend to complete.
    async fn create_intent(
        &self,
        order_id: Uuid,
        amount: Decimal,
        currency: &str,
        metadata: serde_json::Value,
    ) -> Result<GatewayIntent>;

    /// Check whether an intent has settled on the provider side.
    async fn confirm(&self, intent_id: &str) -> Result<bool>;

    /// Validate and decode a signed callback payload.
    async fn handle_callback(&self, payload: &str, signature: &str) -> Result<GatewayEvent>;
}
