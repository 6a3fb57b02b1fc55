//! Organization registry service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    ContactInfo, FieldViolation, OrgLocation, Organization, OrganizationType,
};

/// Service for managing cooperative member organizations
#[derive(Clone)]
pub struct OrganizationService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    org_type: String,
    tax_id: String,
    email: Option<String>,
    phone: Option<String>,
    province: String,
    canton: String,
    city: Option<String>,
    geocode: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = AppError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        let org_type = OrganizationType::from_str(&row.org_type).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "unknown organization type in database: {}",
                row.org_type
            ))
        })?;
        Ok(Organization {
            id: row.id,
            name: row.name,
            org_type,
            tax_id: row.tax_id,
            contact: ContactInfo {
                email: row.email,
                phone: row.phone,
            },
            location: OrgLocation {
                province: row.province,
                canton: row.canton,
                city: row.city,
                geocode: row.geocode,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for registering an organization
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationInput {
    pub name: String,
    pub org_type: OrganizationType,
    pub tax_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub province: String,
    pub canton: String,
    pub city: Option<String>,
    pub geocode: Option<String>,
}

const SELECT_COLUMNS: &str = "id, name, org_type, tax_id, email, phone, province, canton, city, geocode, created_at, updated_at";

impl OrganizationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a new organization
    pub async fn create_organization(
        &self,
        input: CreateOrganizationInput,
    ) -> AppResult<Organization> {
        let mut violations = Vec::new();
        if input.name.trim().is_empty() {
            violations.push(FieldViolation::new(
                "name",
                "Organization name is required",
                "El nombre de la organización es obligatorio",
            ));
        }
        if input.tax_id.trim().is_empty() {
            violations.push(FieldViolation::new(
                "taxId",
                "Tax id is required",
                "El RUC es obligatorio",
            ));
        }
        if input.province.trim().is_empty() {
            violations.push(FieldViolation::new(
                "province",
                "Province is required",
                "La provincia es obligatoria",
            ));
        }
        if let Some(email) = &input.email {
            if !validator::validate_email(email.as_str()) {
                violations.push(FieldViolation::new(
                    "email",
                    "Email address is not valid",
                    "El correo electrónico no es válido",
                ));
            }
        }
        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM organizations WHERE tax_id = $1",
        )
        .bind(input.tax_id.trim())
        .fetch_one(&self.db)
        .await?;
        if existing > 0 {
            return Err(AppError::DuplicateEntry("taxId".to_string()));
        }

        let row = sqlx::query_as::<_, OrganizationRow>(&format!(
            r#"
            INSERT INTO organizations (name, org_type, tax_id, email, phone, province, canton, city, geocode)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(input.org_type.as_str())
        .bind(input.tax_id.trim())
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.province.trim())
        .bind(input.canton.trim())
        .bind(&input.city)
        .bind(&input.geocode)
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    /// List all organizations
    pub async fn list_organizations(&self) -> AppResult<Vec<Organization>> {
        let rows = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {} FROM organizations ORDER BY name",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Organization::try_from).collect()
    }

    /// Get one organization
    pub async fn get_organization(&self, id: Uuid) -> AppResult<Organization> {
        let row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {} FROM organizations WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization".to_string()))?;

        row.try_into()
    }
}
