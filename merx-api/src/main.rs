use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use merx_api::{app, state::{AppState, AuthConfig}};
use merx_catalog::Catalog;
use merx_order::{GatewayOrchestrator, MockGatewayAdapter, OrderEngine, PaymentLedger, ShipmentTracker};
use merx_store::{
    DbClient, StoreBusinessRepository, StoreNotificationRepository, StoreOrderRepository,
    StorePaymentRepository, StoreProductRepository, StoreShipmentRepository, StoreSink,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merx_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = merx_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Merx API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");
    let pool = db.pool.clone();

    let products = Arc::new(StoreProductRepository::new(pool.clone()));
    let orders = Arc::new(StoreOrderRepository::new(pool.clone()));
    let payments = Arc::new(StorePaymentRepository::new(pool.clone()));
    let shipments = Arc::new(StoreShipmentRepository::new(pool.clone()));
    let businesses = Arc::new(StoreBusinessRepository::new(pool.clone()));
    let notifications = Arc::new(StoreNotificationRepository::new(pool.clone()));
    let sink = Arc::new(StoreSink::new(pool.clone()));

    let catalog = Arc::new(Catalog::new(products));
    let engine = Arc::new(OrderEngine::new(
        orders.clone(),
        catalog.clone(),
        sink,
        config.business_rules.tax_rate,
    ));
    let ledger = Arc::new(PaymentLedger::new(payments, orders.clone()));
    let tracker = Arc::new(ShipmentTracker::new(shipments, orders.clone()));
    let gateway = Arc::new(MockGatewayAdapter::new(config.gateway.callback_secret.clone()));
    let orchestrator = Arc::new(GatewayOrchestrator::new(
        gateway,
        orders,
        config.business_rules.currency.clone(),
    ));

    let app_state = AppState {
        catalog,
        engine,
        ledger,
        tracker,
        orchestrator,
        businesses,
        notifications,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
