use async_trait::async_trait;
use uuid::Uuid;

use crate::notify::Notification;
use crate::tenancy::Business;
use crate::Result;

/// Repository trait for business profiles.
#[async_trait]
pub trait BusinessRepository: Send + Sync {
    /// Persist a new business. Fails with `Conflict("business")` when the
    /// user already owns one.
    async fn create(&self, business: &Business) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Business>>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Business>>;

    async fn update(&self, business: &Business) -> Result<()>;
}

/// Repository trait for persisted notifications.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Newest first.
    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Notification>>;

    async fn mark_read(&self, id: Uuid) -> Result<()>;

    async fn mark_all_read(&self, business_id: Uuid) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn unread_count(&self, business_id: Uuid) -> Result<i64>;
}
