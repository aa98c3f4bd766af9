use axum::{extract::State, routing::get, Extension, Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;

use merx_order::models::{OrderPaymentStatus, OrderStatus};

use crate::error::AppError;
use crate::middleware::auth::MerchantClaims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(dashboard))
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    total_products: usize,
    low_stock_products: usize,
    total_orders: usize,
    processing_orders: usize,
    total_shipments: usize,
    /// Sum of total_amount over orders whose payment status is PAID.
    total_revenue: Decimal,
    unread_notifications: i64,
}

/// GET /api/dashboard
async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
) -> Result<Json<DashboardResponse>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;

    let products = state.catalog.list_products(&ctx).await?;
    let low_stock = products.iter().filter(|p| p.is_low_stock()).count();

    let orders = state.engine.list_orders(&ctx).await?;
    let processing = orders
        .iter()
        .filter(|o| o.order_status == OrderStatus::Processing)
        .count();
    let revenue: Decimal = orders
        .iter()
        .filter(|o| o.payment_status == OrderPaymentStatus::Paid)
        .map(|o| o.total_amount)
        .sum();

    let shipments = state.tracker.list_by_business(&ctx).await?;
    let unread = state.notifications.unread_count(ctx.business_id).await?;

    Ok(Json(DashboardResponse {
        total_products: products.len(),
        low_stock_products: low_stock,
        total_orders: orders.len(),
        processing_orders: processing,
        total_shipments: shipments.len(),
        total_revenue: revenue,
        unread_notifications: unread,
    }))
}
