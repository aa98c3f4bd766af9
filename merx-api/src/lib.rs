use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod business;
pub mod dashboard;
pub mod error;
pub mod middleware;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod shipments;
pub mod state;
pub mod webhooks;

#[cfg(test)]
mod test_support;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Everything tenant-scoped sits behind the merchant JWT; gateway
    // callbacks authenticate with their own signature instead.
    let protected = Router::new()
        .merge(business::routes())
        .merge(products::routes())
        .merge(orders::routes())
        .merge(payments::routes())
        .merge(shipments::routes())
        .merge(notifications::routes())
        .merge(dashboard::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::merchant_auth_middleware,
        ));

    Router::new()
        .merge(protected)
        .merge(webhooks::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
