use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use merx_core::Error;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Fold a database error into the domain error type. Unique violations map
/// to `Conflict` with the field derived from the constraint name; anything
/// else becomes `Storage` so driver detail never reaches API callers.
pub(crate) fn map_db_err(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or_default();
            let field = if constraint.contains("order_number") {
                "order_number"
            } else if constraint.contains("tracking_number") {
                "tracking_number"
            } else if constraint.contains("shipments_order_id") {
                "shipment"
            } else if constraint.contains("reference") {
                "reference"
            } else if constraint.contains("sku") {
                "sku"
            } else if constraint.contains("businesses_user_id") {
                "business"
            } else {
                "unique"
            };
            return Error::conflict(field, db.message().to_string());
        }
    }
    Error::Storage(err.to_string())
}

/// Status columns are stored as text; an unparseable value means the row
/// was written by something newer than this binary.
pub(crate) fn parse_status<T>(value: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T, Error> {
    parse(value).ok_or_else(|| Error::Storage(format!("unknown status value: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_a_storage_error() {
        use merx_order::OrderStatus;
        let err = parse_status("SIDEWAYS", OrderStatus::parse).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(
            parse_status("SHIPPED", OrderStatus::parse).unwrap(),
            OrderStatus::Shipped
        );
    }
}
