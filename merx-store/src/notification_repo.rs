use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use merx_core::notify::{Notification, NotificationSink};
use merx_core::repository::NotificationRepository;
use merx_core::Result;

use crate::database::map_db_err;

pub struct StoreNotificationRepository {
    pool: PgPool,
}

impl StoreNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    business_id: Uuid,
    kind: String,
    title: String,
    message: String,
    is_read: bool,
    action_required: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            business_id: row.business_id,
            kind: row.kind,
            title: row.title,
            message: row.message,
            is_read: row.is_read,
            action_required: row.action_required,
            created_at: row.created_at,
        }
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, business_id, kind, title, message, is_read, action_required, created_at";

#[async_trait]
impl NotificationRepository for StoreNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, business_id, kind, title, message, is_read,
                                       action_required, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id)
        .bind(notification.business_id)
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.is_read)
        .bind(notification.action_required)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Notification>> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.map(Notification::from))
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM notifications WHERE business_id = $1 ORDER BY created_at DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_read(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn mark_all_read(&self, business_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE business_id = $1")
            .bind(business_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn unread_count(&self, business_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE business_id = $1 AND is_read = FALSE",
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(count)
    }
}

/// Sink that persists alerts as notification rows. Runs outside the
/// callers' critical sections; they log and continue when it fails.
pub struct StoreSink {
    pool: PgPool,
}

impl StoreSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for StoreSink {
    async fn notify(
        &self,
        business_id: Uuid,
        kind: &str,
        title: &str,
        message: &str,
        action_required: bool,
    ) -> Result<()> {
        let notification = Notification::new(business_id, kind, title, message, action_required);
        StoreNotificationRepository::new(self.pool.clone())
            .create(&notification)
            .await
    }
}
