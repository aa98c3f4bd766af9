use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};

use merx_core::gateway::GatewayEventKind;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/webhooks/gateway", post(handle_gateway_callback))
}

/// POST /api/webhooks/gateway
/// Receive payment-intent updates from the gateway. Events are verified
/// and logged; settlement into the ledger is a manual step for now, so
/// every recognized event is acknowledged with 200.
async fn handle_gateway_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let signature = headers
        .get("X-Gateway-Signature")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    match state.orchestrator.handle_callback(&body, signature).await {
        Ok(event) => {
            if event.kind == GatewayEventKind::Unrecognized {
                tracing::debug!(intent_id = %event.intent_id, "acknowledged unhandled gateway event");
            }
            StatusCode::OK
        }
        Err(err) => {
            tracing::warn!("rejected gateway callback: {}", err);
            StatusCode::BAD_REQUEST
        }
    }
}
