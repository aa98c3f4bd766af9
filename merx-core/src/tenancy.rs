use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EntityKind, Error, Result};

/// The merchant account that owns products, orders, payments, shipments and
/// notifications. Exactly one per authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub registration_number: Option<String>,
    pub tax_id: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating a business profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessDraft {
    pub name: String,
    pub registration_number: Option<String>,
    pub tax_id: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Business {
    pub fn new(user_id: Uuid, draft: BusinessDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: draft.name,
            registration_number: draft.registration_number,
            tax_id: draft.tax_id,
            industry: draft.industry,
            address: draft.address,
            city: draft.city,
            state: draft.state,
            postal_code: draft.postal_code,
            country: draft.country,
            phone: draft.phone,
            email: draft.email,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: BusinessDraft) {
        self.name = draft.name;
        self.registration_number = draft.registration_number;
        self.tax_id = draft.tax_id;
        self.industry = draft.industry;
        self.address = draft.address;
        self.city = draft.city;
        self.state = draft.state;
        self.postal_code = draft.postal_code;
        self.country = draft.country;
        self.phone = draft.phone;
        self.email = draft.email;
        self.updated_at = Utc::now();
    }
}

/// The resolved tenant for a single request. Threaded explicitly through
/// every core call; never read from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub business_id: Uuid,
}

impl TenantContext {
    pub fn new(business_id: Uuid) -> Self {
        Self { business_id }
    }

    /// Verify that an entity scoped to `owner` belongs to this tenant.
    /// A mismatch is a cross-tenant access attempt, not a missing row.
    pub fn ensure_owned(&self, kind: EntityKind, owner: Uuid) -> Result<()> {
        if owner == self.business_id {
            Ok(())
        } else {
            Err(Error::Forbidden(kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> BusinessDraft {
        BusinessDraft {
            name: name.to_string(),
            registration_number: None,
            tax_id: None,
            industry: None,
            address: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
            phone: None,
            email: None,
        }
    }

    #[test]
    fn guard_accepts_own_entity() {
        let business = Business::new(Uuid::new_v4(), draft("Ada Stores"));
        let ctx = TenantContext::new(business.id);
        assert!(ctx.ensure_owned(EntityKind::Order, business.id).is_ok());
    }

    #[test]
    fn guard_rejects_foreign_entity() {
        let ctx = TenantContext::new(Uuid::new_v4());
        let err = ctx
            .ensure_owned(EntityKind::Product, Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(EntityKind::Product)));
    }
}
