use std::sync::Arc;

use uuid::Uuid;

use merx_catalog::Catalog;
use merx_core::repository::{BusinessRepository, NotificationRepository};
use merx_core::tenancy::{Business, TenantContext};
use merx_core::{EntityKind, Error};
use merx_order::{GatewayOrchestrator, OrderEngine, PaymentLedger, ShipmentTracker};

use crate::error::AppError;
use crate::middleware::auth::MerchantClaims;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub engine: Arc<OrderEngine>,
    pub ledger: Arc<PaymentLedger>,
    pub tracker: Arc<ShipmentTracker>,
    pub orchestrator: Arc<GatewayOrchestrator>,
    pub businesses: Arc<dyn BusinessRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub auth: AuthConfig,
}

impl AppState {
    /// Resolve the caller's business from their JWT. Every tenant-scoped
    /// handler goes through here; a user without a business profile gets a
    /// 404 telling them to create one.
    pub async fn resolve_tenant(
        &self,
        claims: &MerchantClaims,
    ) -> Result<(TenantContext, Business), AppError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("malformed subject claim".to_string()))?;
        let business = self
            .businesses
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Business, user_id))?;
        Ok((TenantContext::new(business.id), business))
    }
}
