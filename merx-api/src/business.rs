use axum::{extract::State, routing::get, Extension, Json, Router};

use merx_core::tenancy::{Business, BusinessDraft};
use merx_core::Error;

use crate::error::AppError;
use crate::middleware::auth::MerchantClaims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/business",
        get(get_business).post(create_business).put(update_business),
    )
}

/// POST /api/business
/// Create the caller's business profile. One per user.
async fn create_business(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Json(draft): Json<BusinessDraft>,
) -> Result<Json<Business>, AppError> {
    let user_id = uuid::Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("malformed subject claim".to_string()))?;

    if draft.name.trim().is_empty() {
        return Err(Error::validation("name", "must not be empty").into());
    }
    if state.businesses.find_by_user(user_id).await?.is_some() {
        return Err(Error::conflict("business", "user already owns a business").into());
    }

    let business = Business::new(user_id, draft);
    state.businesses.create(&business).await?;
    Ok(Json(business))
}

/// GET /api/business
async fn get_business(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
) -> Result<Json<Business>, AppError> {
    let (_, business) = state.resolve_tenant(&claims).await?;
    Ok(Json(business))
}

/// PUT /api/business
async fn update_business(
    State(state): State<AppState>,
    Extension(claims): Extension<MerchantClaims>,
    Json(draft): Json<BusinessDraft>,
) -> Result<Json<Business>, AppError> {
    let (_, mut business) = state.resolve_tenant(&claims).await?;
    if draft.name.trim().is_empty() {
        return Err(Error::validation("name", "must not be empty").into());
    }
    business.apply(draft);
    state.businesses.update(&business).await?;
    Ok(Json(business))
}
