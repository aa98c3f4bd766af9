use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// A persisted user-facing alert for one business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub business_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub action_required: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        business_id: Uuid,
        kind: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        action_required: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            business_id,
            kind: kind.into(),
            title: title.into(),
            message: message.into(),
            is_read: false,
            action_required,
            created_at: Utc::now(),
        }
    }
}

/// Fire-and-forget sink for user-facing alerts. Callers invoke it outside
/// the transactional critical section and must not fail on sink errors.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        business_id: Uuid,
        kind: &str,
        title: &str,
        message: &str,
        action_required: bool,
    ) -> Result<()>;
}

/// Sink that only writes to the log stream. Used where no store is wired,
/// e.g. unit tests and local tooling.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(
        &self,
        business_id: Uuid,
        kind: &str,
        title: &str,
        message: &str,
        action_required: bool,
    ) -> Result<()> {
        tracing::info!(
            %business_id,
            kind,
            title,
            action_required,
            "notification: {}",
            message
        );
        Ok(())
    }
}
