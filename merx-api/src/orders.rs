use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use merx_core::Error;
use merx_order::models::{Order, OrderItem, OrderPaymentStatus, OrderRequest, OrderStatus};
use merx_shared::pii::Masked;

use crate::error::AppError;
use crate::middleware::auth::MerchantClaims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}", get(get_order).delete(delete_order))
        .route("/api/orders/{id}/items", get(list_items))
        .route("/api/orders/{id}/status", put(update_status))
        .route("/api/orders/{id}/payment-status", put(update_payment_status))
        .route("/api/orders/{id}/cancel", post(cancel_order))
        .route("/api/orders/by-number/{number}", get(get_by_number))
}

/// Wire shape of an order. Customer contact details are masked; the raw
/// values stay in the store for fulfillment.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Option<Masked<String>>,
    pub customer_phone: Option<Masked<String>>,
    pub shipping_address: Option<String>,
    pub order_source: Option<String>,
    pub notes: Option<String>,
    pub payment_status: OrderPaymentStatus,
    pub order_status: OrderStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            id: order.id,
            order_number: order.order_number,
            customer_name: order.customer_name,
            customer_email: order.customer_email.map(Masked),
            customer_phone: order.customer_phone.map(Masked),
            shipping_address: order.shipping_address,
            order_source: order.order_source,
            notes: order.notes,
            payment_status: order.payment_status,
            order_status: order.order_status,
            subtotal: order.subtotal,
            tax_amount: order.tax_amount,
            total_amount: order.total_amount,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    status: String,
}

fn parse_order_status(value: &str) -> Result<OrderStatus, AppError> {
    OrderStatus::parse(value)
        .ok_or_else(|| Error::validation("status", format!("unknown order status: {}", value)).into())
}

/// POST /api/orders
async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Json(req): Json<OrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let order = state.engine.create_order(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /api/orders?status=PROCESSING
async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let orders = match query.status.as_deref() {
        Some(status) => {
            let status = parse_order_status(status)?;
            state.engine.list_orders_by_status(&ctx, status).await?
        }
        None => state.engine.list_orders(&ctx).await?,
    };
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /api/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.engine.get_order(&ctx, order_id).await?.into()))
}

/// GET /api/orders/by-number/{number}
async fn get_by_number(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(number): Path<String>,
) -> Result<Json<OrderResponse>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(
        state.engine.get_order_by_number(&ctx, &number).await?.into(),
    ))
}

/// GET /api/orders/{id}/items
async fn list_items(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<OrderItem>>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.engine.list_items(&ctx, order_id).await?))
}

/// PUT /api/orders/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let status = parse_order_status(&req.status)?;
    Ok(Json(
        state
            .engine
            .update_order_status(&ctx, order_id, status)
            .await?
            .into(),
    ))
}

/// PUT /api/orders/{id}/payment-status
async fn update_payment_status(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let status = OrderPaymentStatus::parse(&req.status).ok_or_else(|| {
        Error::validation("status", format!("unknown payment status: {}", req.status))
    })?;
    Ok(Json(
        state
            .engine
            .update_payment_status(&ctx, order_id, status)
            .await?
            .into(),
    ))
}

/// POST /api/orders/{id}/cancel
async fn cancel_order(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.engine.cancel_order(&ctx, order_id).await?.into()))
}

/// DELETE /api/orders/{id}
async fn delete_order(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(order_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    state.engine.delete_order(&ctx, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
