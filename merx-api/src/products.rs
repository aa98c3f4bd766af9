use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use merx_catalog::{Product, ProductDraft};

use crate::error::AppError;
use crate::middleware::auth::MerchantClaims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/products/search", get(search_products))
        .route("/api/products/low-stock", get(low_stock))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
}

/// POST /api/products
async fn create_product(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    let product = state.catalog.create_product(&ctx, draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/products
async fn list_products(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
) -> Result<Json<Vec<Product>>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.catalog.list_products(&ctx).await?))
}

/// GET /api/products/{id}
async fn get_product(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.catalog.get_product(&ctx, product_id).await?))
}

/// PUT /api/products/{id}
async fn update_product(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(product_id): Path<Uuid>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(
        state.catalog.update_product(&ctx, product_id, draft).await?,
    ))
}

/// DELETE /api/products/{id}
async fn delete_product(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    state.catalog.delete_product(&ctx, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/products/search?q=term
async fn search_products(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.catalog.search_products(&ctx, &query.q).await?))
}

/// GET /api/products/low-stock
async fn low_stock(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
) -> Result<Json<Vec<Product>>, AppError> {
    let (ctx, _) = state.resolve_tenant(&claims).await?;
    Ok(Json(state.catalog.low_stock(&ctx).await?))
}
