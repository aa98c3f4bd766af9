pub mod engine;
pub mod ledger;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod refs;
pub mod repository;
pub mod shipment;

pub use engine::OrderEngine;
pub use ledger::PaymentLedger;
pub use models::{
    Order, OrderItem, OrderPaymentStatus, OrderStatus, Payment, PaymentMethod, PaymentStatus,
    Shipment, ShipmentStatus,
};
pub use orchestrator::{GatewayOrchestrator, MockGatewayAdapter};
pub use shipment::ShipmentTracker;
