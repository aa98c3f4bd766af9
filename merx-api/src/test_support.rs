//! In-memory backends for handler tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use merx_catalog::Catalog;
use merx_core::notify::{LogSink, Notification};
use merx_core::repository::{BusinessRepository, NotificationRepository};
use merx_core::tenancy::Business;
use merx_core::{Error, Result};
use merx_order::memory::MemoryStore;
use merx_order::{
    GatewayOrchestrator, MockGatewayAdapter, OrderEngine, PaymentLedger, ShipmentTracker,
};

use crate::middleware::auth::MerchantClaims;
use crate::state::{AppState, AuthConfig};

#[derive(Default)]
pub struct MemoryBusinesses {
    inner: Mutex<HashMap<Uuid, Business>>,
}

#[async_trait]
impl BusinessRepository for MemoryBusinesses {
    async fn create(&self, business: &Business) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.values().any(|b| b.user_id == business.user_id) {
            return Err(Error::conflict("business", "user already owns a business"));
        }
        inner.insert(business.id, business.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Business>> {
        Ok(self.inner.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Business>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .find(|b| b.user_id == user_id)
            .cloned())
    }

    async fn update(&self, business: &Business) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .insert(business.id, business.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryNotifications {
    inner: Mutex<HashMap<Uuid, Notification>>,
}

#[async_trait]
impl NotificationRepository for MemoryNotifications {
    async fn create(&self, notification: &Notification) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Notification>> {
        Ok(self.inner.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|n| n.business_id == business_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_read(&self, id: Uuid) -> Result<()> {
        if let Some(notification) = self.inner.lock().unwrap().get_mut(&id) {
            notification.is_read = true;
        }
        Ok(())
    }

    async fn mark_all_read(&self, business_id: Uuid) -> Result<()> {
        for notification in self.inner.lock().unwrap().values_mut() {
            if notification.business_id == business_id {
                notification.is_read = true;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.inner.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn unread_count(&self, business_id: Uuid) -> Result<i64> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|n| n.business_id == business_id && !n.is_read)
            .count() as i64)
    }
}

/// Full application state over in-memory backends.
pub fn state() -> AppState {
    let store = MemoryStore::new();
    let catalog = Arc::new(Catalog::new(store.clone()));
    let engine = Arc::new(OrderEngine::new(
        store.clone(),
        catalog.clone(),
        Arc::new(LogSink),
        Decimal::new(75, 3),
    ));
    let ledger = Arc::new(PaymentLedger::new(store.clone(), store.clone()));
    let tracker = Arc::new(ShipmentTracker::new(store.clone(), store.clone()));
    let orchestrator = Arc::new(GatewayOrchestrator::new(
        Arc::new(MockGatewayAdapter::new("whsec_test")),
        store.clone(),
        "NGN",
    ));
    AppState {
        catalog,
        engine,
        ledger,
        tracker,
        orchestrator,
        businesses: Arc::new(MemoryBusinesses::default()),
        notifications: Arc::new(MemoryNotifications::default()),
        auth: AuthConfig {
            secret: "test-secret".to_string(),
            expiration: 3600,
        },
    }
}

pub fn claims(user_id: Uuid) -> MerchantClaims {
    MerchantClaims {
        sub: user_id.to_string(),
        email: "merchant@example.com".to_string(),
        exp: 2_000_000_000,
    }
}
