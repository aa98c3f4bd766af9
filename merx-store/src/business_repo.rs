use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use merx_core::repository::BusinessRepository;
use merx_core::tenancy::Business;
use merx_core::Result;

use crate::database::map_db_err;

pub struct StoreBusinessRepository {
    pool: PgPool,
}

impl StoreBusinessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BusinessRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    registration_number: Option<String>,
    tax_id: Option<String>,
    industry: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Business {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            registration_number: row.registration_number,
            tax_id: row.tax_id,
            industry: row.industry,
            address: row.address,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
            phone: row.phone,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const BUSINESS_COLUMNS: &str = "id, user_id, name, registration_number, tax_id, industry, \
     address, city, state, postal_code, country, phone, email, created_at, updated_at";

#[async_trait]
impl BusinessRepository for StoreBusinessRepository {
    async fn create(&self, business: &Business) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO businesses (id, user_id, name, registration_number, tax_id, industry,
                                    address, city, state, postal_code, country, phone, email,
                                    created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(business.id)
        .bind(business.user_id)
        .bind(&business.name)
        .bind(&business.registration_number)
        .bind(&business.tax_id)
        .bind(&business.industry)
        .bind(&business.address)
        .bind(&business.city)
        .bind(&business.state)
        .bind(&business.postal_code)
        .bind(&business.country)
        .bind(&business.phone)
        .bind(&business.email)
        .bind(business.created_at)
        .bind(business.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Business>> {
        let row: Option<BusinessRow> = sqlx::query_as(&format!(
            "SELECT {} FROM businesses WHERE id = $1",
            BUSINESS_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.map(Business::from))
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Business>> {
        let row: Option<BusinessRow> = sqlx::query_as(&format!(
            "SELECT {} FROM businesses WHERE user_id = $1",
            BUSINESS_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.map(Business::from))
    }

    async fn update(&self, business: &Business) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE businesses
            SET name = $2, registration_number = $3, tax_id = $4, industry = $5,
                address = $6, city = $7, state = $8, postal_code = $9, country = $10,
                phone = $11, email = $12, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(business.id)
        .bind(&business.name)
        .bind(&business.registration_number)
        .bind(&business.tax_id)
        .bind(&business.industry)
        .bind(&business.address)
        .bind(&business.city)
        .bind(&business.state)
        .bind(&business.postal_code)
        .bind(&business.country)
        .bind(&business.phone)
        .bind(&business.email)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }
}
