use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use merx_core::Error;
use merx_order::models::{Shipment, ShipmentRequest, ShipmentStatus};

use crate::error::AppError;
use crate::middleware::auth::MerchantClaims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/shipments", get(list_shipments).post(create_shipment))
        .route("/api/shipments/{id}", get(get_shipment))
        .route("/api/shipments/{id}/status", put(update_status))
        .route("/api/shipments/by-tracking/{number}", get(get_by_tracking))
        .route("/api/orders/{id}/shipment", get(get_for_order))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    status: String,
}

/// POST /api/shipments
async fn create_shipment(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Json(req): Json<ShipmentRequest>,
) -> Result<(StatusCode, Json<Shipment>), AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let shipment = state.tracker.create_shipment(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(shipment)))
}

/// GET /api/shipments?status=IN_TRANSIT
async fn list_shipments(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Shipment>>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let shipments = match query.status.as_deref() {
        Some(status) => {
            let status = ShipmentStatus::parse(status).ok_or_else(|| {
                Error::validation("status", format!("unknown shipment status: {}", status))
            })?;
            state.tracker.list_by_status(&ctx, status).await?
        }
        None => state.tracker.list_by_business(&ctx).await?,
    };
    Ok(Json(shipments))
}

/// GET /api/shipments/{id}
async fn get_shipment(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(shipment_id): Path<Uuid>,
) -> Result<Json<Shipment>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.tracker.get_shipment(&ctx, shipment_id).await?))
}

/// PUT /api/shipments/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(shipment_id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Shipment>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let status = ShipmentStatus::parse(&req.status).ok_or_else(|| {
        Error::validation("status", format!("unknown shipment status: {}", req.status))
    })?;
    Ok(Json(
        state.tracker.update_status(&ctx, shipment_id, status).await?,
    ))
}

/// GET /api/shipments/by-tracking/{number}
async fn get_by_tracking(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(number): Path<String>,
) -> Result<Json<Shipment>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.tracker.get_by_tracking(&ctx, &number).await?))
}

/// GET /api/orders/{id}/shipment
async fn get_for_order(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Shipment>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.tracker.get_by_order(&ctx, order_id).await?))
}
