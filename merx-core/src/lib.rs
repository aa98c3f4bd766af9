pub mod gateway;
pub mod notify;
pub mod repository;
pub mod tenancy;

use std::fmt;
use uuid::Uuid;

/// Entity kinds referenced by error values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Business,
    Product,
    Order,
    OrderItem,
    Payment,
    Shipment,
    Notification,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Business => "business",
            EntityKind::Product => "product",
            EntityKind::Order => "order",
            EntityKind::OrderItem => "order item",
            EntityKind::Payment => "payment",
            EntityKind::Shipment => "shipment",
            EntityKind::Notification => "notification",
        };
        write!(f, "{}", name)
    }
}

/// Domain errors shared by every service and repository in the workspace.
/// Storage failures are folded into `Storage` so internal detail never
/// reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} not found: {1}")]
    NotFound(EntityKind, String),

    #[error("{0} belongs to another business")]
    Forbidden(EntityKind),

    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("conflict on {field}: {message}")]
    Conflict {
        field: &'static str,
        message: String,
    },

    #[error("validation failed for {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: String,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    pub fn not_found(kind: EntityKind, key: impl fmt::Display) -> Self {
        Error::NotFound(kind, key.to_string())
    }

    pub fn conflict(field: &'static str, message: impl Into<String>) -> Self {
        Error::Conflict {
            field,
            message: message.into(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
