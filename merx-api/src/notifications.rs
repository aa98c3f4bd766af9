use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use merx_core::notify::Notification;
use merx_core::{EntityKind, Error};

use crate::error::AppError;
use crate::middleware::auth::MerchantClaims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/{id}/read", put(mark_read))
        .route("/api/notifications/read-all", put(mark_all_read))
        .route("/api/notifications/{id}", delete(delete_notification))
}

/// Notifications have no service layer of their own; the handler guards
/// ownership directly against the repository.
async fn owned(
    state: &AppState,
    claims: &MerchantClaims,
    id: Uuid,
) -> Result<Notification, AppError> {
    let (ctx, _) = state.resolve_tenant(claims).await?;
    let notification = state
        .notifications
        .find(id)
        .await?
        .ok_or_else(|| Error::not_found(EntityKind::Notification, id))?;
    ctx.ensure_owned(EntityKind::Notification, notification.business_id)?;
    Ok(notification)
}

/// GET /api/notifications
async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(
        state.notifications.list_by_business(ctx.business_id).await?,
    ))
}

/// GET /api/notifications/unread-count
async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let count = state.notifications.unread_count(ctx.business_id).await?;
    Ok(Json(json!({ "unread": count })))
}

/// PUT /api/notifications/{id}/read
async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    owned(&state, &claims, id).await?;
    state.notifications.mark_read(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/notifications/read-all
async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
) -> Result<StatusCode, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    state.notifications.mark_all_read(ctx.business_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/notifications/{id}
async fn delete_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    owned(&state, &claims, id).await?;
    state.notifications.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
