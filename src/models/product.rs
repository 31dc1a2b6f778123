use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::Entity;

/// A tenant-owned catalog item. `tenant_id` is stamped by the unit of work
/// on insert; it is never set by request payloads and never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: String, description: Option<String>, price_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            name,
            description,
            price_cents,
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Product {
    const TABLE: &'static str = "products";

    fn id(&self) -> Uuid {
        self.id
    }
}
