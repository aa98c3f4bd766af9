pub mod app_config;
pub mod business_repo;
pub mod database;
pub mod notification_repo;
pub mod order_repo;
pub mod payment_repo;
pub mod product_repo;
pub mod shipment_repo;

pub use app_config::Config;
pub use business_repo::StoreBusinessRepository;
pub use database::DbClient;
pub use notification_repo::{StoreNotificationRepository, StoreSink};
pub use order_repo::StoreOrderRepository;
pub use payment_repo::StorePaymentRepository;
pub use product_repo::StoreProductRepository;
pub use shipment_repo::StoreShipmentRepository;
