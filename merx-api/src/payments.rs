use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use merx_core::gateway::GatewayIntent;
use merx_core::Error;
use merx_order::models::{Payment, PaymentRequest, PaymentStatus};

use crate::error::AppError;
use crate::middleware::auth::MerchantClaims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments", get(list_payments).post(record_payment))
        .route("/api/payments/{id}", get(get_payment))
        .route("/api/payments/{id}/status", put(update_status))
        .route("/api/orders/{id}/payments", get(list_for_order))
        .route("/api/orders/{id}/payment-intent", post(create_intent))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    order_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    status: String,
}

#[derive(Debug, Serialize)]
struct PaymentIntentResponse {
    intent_id: String,
    amount: rust_decimal::Decimal,
    currency: String,
    client_secret: Option<String>,
}

impl From<GatewayIntent> for PaymentIntentResponse {
    fn from(intent: GatewayIntent) -> Self {
        PaymentIntentResponse {
            intent_id: intent.id,
            amount: intent.amount,
            currency: intent.currency,
            client_secret: intent.client_secret,
        }
    }
}

/// POST /api/payments
async fn record_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Json(req): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let payment = state.ledger.process_payment(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /api/payments?order_id=...
async fn list_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let payments = match query.order_id {
        Some(order_id) => state.ledger.list_by_order(&ctx, order_id).await?,
        None => state.ledger.list_by_business(&ctx).await?,
    };
    Ok(Json(payments))
}

/// GET /api/payments/{id}
async fn get_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.ledger.get_payment(&ctx, payment_id).await?))
}

/// PUT /api/payments/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(payment_id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Payment>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let status = PaymentStatus::parse(&req.status).ok_or_else(|| {
        Error::validation("status", format!("unknown payment status: {}", req.status))
    })?;
    Ok(Json(
        state
            .ledger
            .update_payment_status(&ctx, payment_id, status)
            .await?,
    ))
}

/// GET /api/orders/{id}/payments
async fn list_for_order(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.ledger.list_by_order(&ctx, order_id).await?))
}

/// POST /api/orders/{id}/payment-intent
/// Initialize a gateway payment intent for the order's total.
async fn create_intent(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let intent = state.orchestrator.create_intent(&ctx, order_id).await?;
    Ok(Json(intent.into()))
}
