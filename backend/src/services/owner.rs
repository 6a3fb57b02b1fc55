//! Owner ledger service
//!
//! The master registry of owners, keyed by national id and reused across
//! lots. Lookups are exact matches on normalized digits; the typing-driven
//! sequencing lives with the caller (see `shared::lookup`).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{normalize_national_id, Owner, OwnerAddress};

/// Service for the master owner registry
#[derive(Clone)]
pub struct OwnerService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OwnerRow {
    pub id: Uuid,
    pub full_name: String,
    pub national_id: String,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub landmarks: Option<String>,
    pub delivery_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OwnerRow> for Owner {
    fn from(row: OwnerRow) -> Self {
        Owner {
            id: row.id,
            full_name: row.full_name,
            national_id: row.national_id,
            phone: row.phone,
            address: OwnerAddress {
                province: row.province,
                city: row.city,
                neighborhood: row.neighborhood,
                street: row.street,
                house_number: row.house_number,
                landmarks: row.landmarks,
            },
            delivery_count: row.delivery_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) const OWNER_COLUMNS: &str = "id, full_name, national_id, phone, province, city, neighborhood, street, house_number, landmarks, delivery_count, created_at, updated_at";

impl OwnerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Exact lookup by national id, on normalized digits
    pub async fn find_by_national_id(&self, national_id: &str) -> AppResult<Owner> {
        let digits = normalize_national_id(national_id);
        if digits.is_empty() {
            return Err(AppError::ValidationError(
                "National id must contain digits".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, OwnerRow>(&format!(
            "SELECT {} FROM owners WHERE national_id = $1",
            OWNER_COLUMNS
        ))
        .bind(&digits)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Owner".to_string()))?;

        Ok(row.into())
    }

    /// List every master owner record
    pub async fn list_masters(&self) -> AppResult<Vec<Owner>> {
        let rows = sqlx::query_as::<_, OwnerRow>(&format!(
            "SELECT {} FROM owners ORDER BY full_name",
            OWNER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Owner::from).collect())
    }
}
