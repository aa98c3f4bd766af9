pub mod product;
pub mod repository;
pub mod stock;

pub use product::{Product, ProductDraft};
pub use repository::ProductRepository;
pub use stock::Catalog;
