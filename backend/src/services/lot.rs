//! Lot registry service: creation with owner resolution, edits, and queries

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::owner::OwnerRow;
use shared::{
    normalize_national_id, quintals_to_kg, validate_lot_draft, EntryView, Lot, LotDraft,
    LotState, NewOwnerData, OwnerAddress, OwnerEntryDraft, OwnerSource, Sample,
};

/// Lot service for intake lot registration and lifecycle queries
#[derive(Clone)]
pub struct LotService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LotRow {
    id: Uuid,
    code: String,
    organization_id: Uuid,
    harvest_date: NaiveDate,
    delivery_date: DateTime<Utc>,
    declared_quintals: Decimal,
    initial_weight_kg: Decimal,
    final_weight_kg: Option<Decimal>,
    state: String,
    weight_observations: Option<String>,
    observations: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LotRow> for Lot {
    type Error = AppError;

    fn try_from(row: LotRow) -> Result<Self, Self::Error> {
        let state = LotState::from_str(&row.state).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "unknown lot state in database: {}",
                row.state
            ))
        })?;
        Ok(Lot {
            id: row.id,
            code: row.code,
            organization_id: row.organization_id,
            harvest_date: row.harvest_date,
            delivery_date: row.delivery_date,
            declared_quintals: row.declared_quintals,
            initial_weight_kg: row.initial_weight_kg,
            final_weight_kg: row.final_weight_kg,
            state,
            weight_observations: row.weight_observations,
            observations: row.observations,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) const LOT_COLUMNS: &str = "id, code, organization_id, harvest_date, delivery_date, declared_quintals, initial_weight_kg, final_weight_kg, state, weight_observations, observations, created_at, updated_at";

/// One owner line in the lot creation payload: either a master reference or
/// inline new-owner fields
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerEntryPayload {
    pub quintals_delivered: Decimal,
    pub owner_master_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub landmarks: Option<String>,
}

impl OwnerEntryPayload {
    /// Resolve the master/new duality once, at lot-creation time. When a
    /// master reference is present the remaining fields are ignored.
    fn into_draft(self) -> OwnerEntryDraft {
        let source = match self.owner_master_id {
            Some(owner_id) => OwnerSource::Existing { owner_id },
            None => OwnerSource::New(NewOwnerData {
                full_name: self.full_name.unwrap_or_default(),
                national_id: self.national_id.unwrap_or_default(),
                phone: self.phone,
                address: OwnerAddress {
                    province: self.province,
                    city: self.city,
                    neighborhood: self.neighborhood,
                    street: self.street,
                    house_number: self.house_number,
                    landmarks: self.landmarks,
                },
            }),
        };
        OwnerEntryDraft {
            quintals_delivered: self.quintals_delivered,
            source,
        }
    }
}

/// Lot creation payload (`create-with-owners`)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLotInput {
    pub lot_number: String,
    pub organization: Option<Uuid>,
    pub total_quintals: Decimal,
    pub harvest_date: Option<NaiveDate>,
    #[serde(rename = "deliveryDateISO")]
    pub delivery_date_iso: Option<DateTime<Utc>>,
    pub initial_weight_kg: Option<Decimal>,
    pub weight_observations: Option<String>,
    pub observations: Option<String>,
    pub owners: Vec<OwnerEntryPayload>,
}

/// Input for editing a lot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLotInput {
    pub harvest_date: Option<NaiveDate>,
    pub declared_quintals: Option<Decimal>,
    pub weight_observations: Option<String>,
    pub observations: Option<String>,
    /// Administrator override; the only way a lot state may regress
    pub state: Option<String>,
}

/// Filter for lot listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotFilter {
    pub state: Option<String>,
    pub organization: Option<Uuid>,
}

/// A lot together with its resolved owner entries
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotWithOwners {
    #[serde(flatten)]
    pub lot: Lot,
    pub owners: Vec<EntryView>,
}

/// Full lot detail including sampling history
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotDetail {
    #[serde(flatten)]
    pub lot: Lot,
    pub owners: Vec<EntryView>,
    pub samples: Vec<Sample>,
}

impl LotService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a lot together with its owner entries.
    ///
    /// Validation is exhaustive before any mutation. Each entry without a
    /// master reference is matched against the ledger by national id; on a
    /// match the master record wins, otherwise a new master is created.
    pub async fn create_lot(&self, input: CreateLotInput) -> AppResult<LotWithOwners> {
        let draft = LotDraft {
            code: input.lot_number.trim().to_string(),
            organization_id: input.organization,
            harvest_date: input.harvest_date,
            delivery_date: input.delivery_date_iso,
            declared_quintals: input.total_quintals,
            initial_weight_kg: input.initial_weight_kg,
            weight_observations: input.weight_observations,
            observations: input.observations,
            owners: input.owners.into_iter().map(|o| o.into_draft()).collect(),
        };

        let violations = validate_lot_draft(&draft);
        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }
        let (organization_id, harvest_date) = match (draft.organization_id, draft.harvest_date) {
            (Some(org), Some(date)) => (org, date),
            _ => return Err(AppError::ValidationError(
                "Organization and harvest date are required".to_string(),
            )),
        };

        // Lot codes are unique across the registry
        let duplicate =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lots WHERE code = $1")
                .bind(&draft.code)
                .fetch_one(&self.db)
                .await?;
        if duplicate > 0 {
            return Err(AppError::DuplicateEntry("lotNumber".to_string()));
        }

        let org_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM organizations WHERE id = $1")
                .bind(organization_id)
                .fetch_one(&self.db)
                .await?;
        if org_exists == 0 {
            return Err(AppError::NotFound("Organization".to_string()));
        }

        let initial_weight_kg = draft
            .initial_weight_kg
            .unwrap_or_else(|| quintals_to_kg(draft.declared_quintals));
        let delivery_date = draft.delivery_date.unwrap_or_else(Utc::now);

        let mut tx = self.db.begin().await?;

        let lot_row = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            INSERT INTO lots (code, organization_id, harvest_date, delivery_date,
                              declared_quintals, initial_weight_kg, state,
                              weight_observations, observations)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(&draft.code)
        .bind(organization_id)
        .bind(harvest_date)
        .bind(delivery_date)
        .bind(draft.declared_quintals)
        .bind(initial_weight_kg)
        .bind(&draft.weight_observations)
        .bind(&draft.observations)
        .fetch_one(&mut *tx)
        .await?;

        let mut owners = Vec::with_capacity(draft.owners.len());
        for entry in &draft.owners {
            let owner = self.resolve_owner(&mut tx, &entry.source).await?;

            sqlx::query(
                "UPDATE owners SET delivery_count = delivery_count + 1, updated_at = now() WHERE id = $1",
            )
            .bind(owner.id)
            .execute(&mut *tx)
            .await?;

            let entry_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO owner_entries (lot_id, owner_id, quintals_delivered)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(lot_row.id)
            .bind(owner.id)
            .bind(entry.quintals_delivered)
            .fetch_one(&mut *tx)
            .await?;

            owners.push(EntryView {
                entry_id,
                owner_id: owner.id,
                full_name: owner.full_name,
                national_id: owner.national_id,
                quintals_delivered: entry.quintals_delivered,
            });
        }

        tx.commit().await?;

        tracing::info!(lot_code = %draft.code, owner_count = owners.len(), "lot registered");

        Ok(LotWithOwners {
            lot: lot_row.try_into()?,
            owners,
        })
    }

    /// Resolve an entry's owner inside the creation transaction
    async fn resolve_owner(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        source: &OwnerSource,
    ) -> AppResult<ResolvedOwner> {
        match source {
            OwnerSource::Existing { owner_id } => {
                let row = sqlx::query_as::<_, (Uuid, String, String)>(
                    "SELECT id, full_name, national_id FROM owners WHERE id = $1",
                )
                .bind(owner_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Owner".to_string()))?;
                Ok(ResolvedOwner {
                    id: row.0,
                    full_name: row.1,
                    national_id: row.2,
                })
            }
            OwnerSource::New(data) => {
                let digits = normalize_national_id(&data.national_id);
                // Ledger match by national id wins over the submitted fields
                let existing = sqlx::query_as::<_, (Uuid, String, String)>(
                    "SELECT id, full_name, national_id FROM owners WHERE national_id = $1",
                )
                .bind(&digits)
                .fetch_optional(&mut **tx)
                .await?;

                if let Some(row) = existing {
                    return Ok(ResolvedOwner {
                        id: row.0,
                        full_name: row.1,
                        national_id: row.2,
                    });
                }

                let id = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    INSERT INTO owners (full_name, national_id, phone, province, city,
                                        neighborhood, street, house_number, landmarks)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    RETURNING id
                    "#,
                )
                .bind(data.full_name.trim())
                .bind(&digits)
                .bind(&data.phone)
                .bind(&data.address.province)
                .bind(&data.address.city)
                .bind(&data.address.neighborhood)
                .bind(&data.address.street)
                .bind(&data.address.house_number)
                .bind(&data.address.landmarks)
                .fetch_one(&mut **tx)
                .await?;

                Ok(ResolvedOwner {
                    id,
                    full_name: data.full_name.trim().to_string(),
                    national_id: digits,
                })
            }
        }
    }

    /// Edit a lot. Finalized lots reject every edit; quantity fields are
    /// frozen once sampling has started.
    pub async fn edit_lot(&self, lot_id: Uuid, input: UpdateLotInput) -> AppResult<Lot> {
        let lot = fetch_lot(&self.db, lot_id).await?;

        if lot.state == LotState::Finalized {
            return Err(AppError::InvalidState(
                "a finalized lot cannot be edited".to_string(),
            ));
        }
        if input.declared_quintals.is_some() && lot.state != LotState::Pending {
            return Err(AppError::InvalidState(format!(
                "declared quintals are frozen once sampling has started (state: {})",
                lot.state
            )));
        }
        if let Some(q) = input.declared_quintals {
            if q <= Decimal::ZERO {
                return Err(AppError::ValidationError(
                    "Declared quintals must be greater than zero".to_string(),
                ));
            }
        }

        let state = match &input.state {
            Some(s) => LotState::from_str(s)
                .ok_or_else(|| {
                    AppError::ValidationError(format!("Unknown lot state: {}", s))
                })?
                .as_str()
                .to_string(),
            None => lot.state.as_str().to_string(),
        };

        let declared = input.declared_quintals.unwrap_or(lot.declared_quintals);
        let initial_weight = match input.declared_quintals {
            Some(q) => quintals_to_kg(q),
            None => lot.initial_weight_kg,
        };

        let row = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            UPDATE lots
            SET harvest_date = $1, declared_quintals = $2, initial_weight_kg = $3,
                weight_observations = $4, observations = $5, state = $6, updated_at = now()
            WHERE id = $7
            RETURNING {}
            "#,
            LOT_COLUMNS
        ))
        .bind(input.harvest_date.unwrap_or(lot.harvest_date))
        .bind(declared)
        .bind(initial_weight)
        .bind(input.weight_observations.or(lot.weight_observations))
        .bind(input.observations.or(lot.observations))
        .bind(&state)
        .bind(lot_id)
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    /// Get one lot with its owner entries and sampling history
    pub async fn get_lot(&self, lot_id: Uuid) -> AppResult<LotDetail> {
        let lot = fetch_lot(&self.db, lot_id).await?;
        let owners = fetch_entry_views(&self.db, lot_id).await?;
        let samples = crate::services::sample::fetch_samples(&self.db, lot_id).await?;
        Ok(LotDetail {
            lot,
            owners,
            samples,
        })
    }

    /// List lots, optionally filtered by state and organization
    pub async fn list_lots(&self, filter: LotFilter) -> AppResult<Vec<Lot>> {
        if let Some(ref s) = filter.state {
            if LotState::from_str(s).is_none() {
                return Err(AppError::ValidationError(format!(
                    "Unknown lot state: {}",
                    s
                )));
            }
        }

        let rows = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            SELECT {}
            FROM lots
            WHERE ($1::varchar IS NULL OR state = $1)
              AND ($2::uuid IS NULL OR organization_id = $2)
            ORDER BY created_at DESC
            "#,
            LOT_COLUMNS
        ))
        .bind(&filter.state)
        .bind(filter.organization)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Lot::try_from).collect()
    }

    /// Full owner record behind an entry, for owner-detail views
    pub async fn get_entry_owner(&self, entry_id: Uuid) -> AppResult<shared::Owner> {
        let row = sqlx::query_as::<_, OwnerRow>(
            r#"
            SELECT o.id, o.full_name, o.national_id, o.phone, o.province, o.city,
                   o.neighborhood, o.street, o.house_number, o.landmarks,
                   o.delivery_count, o.created_at, o.updated_at
            FROM owners o
            JOIN owner_entries e ON e.owner_id = o.id
            WHERE e.id = $1
            "#,
        )
        .bind(entry_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Owner entry".to_string()))?;

        Ok(row.into())
    }
}

struct ResolvedOwner {
    id: Uuid,
    full_name: String,
    national_id: String,
}

/// Load one lot
pub(crate) async fn fetch_lot(db: &PgPool, lot_id: Uuid) -> AppResult<Lot> {
    let row = sqlx::query_as::<_, LotRow>(&format!(
        "SELECT {} FROM lots WHERE id = $1",
        LOT_COLUMNS
    ))
    .bind(lot_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

    row.try_into()
}

/// Load a lot's entries joined with their master owners, in creation order
pub(crate) async fn fetch_entry_views(db: &PgPool, lot_id: Uuid) -> AppResult<Vec<EntryView>> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, String, String, Decimal)>(
        r#"
        SELECT e.id, o.id, o.full_name, o.national_id, e.quintals_delivered
        FROM owner_entries e
        JOIN owners o ON o.id = e.owner_id
        WHERE e.lot_id = $1
        ORDER BY e.created_at
        "#,
    )
    .bind(lot_id)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| EntryView {
            entry_id: r.0,
            owner_id: r.1,
            full_name: r.2,
            national_id: r.3,
            quintals_delivered: r.4,
        })
        .collect())
}

/// Apply exactly one state transition, guarded against concurrent stage
/// submissions: the update only lands if the lot is still in `from`.
pub(crate) async fn transition_lot(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
    from: LotState,
    to: LotState,
) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE lots SET state = $1, updated_at = now() WHERE id = $2 AND state = $3",
    )
    .bind(to.as_str())
    .bind(lot_id)
    .bind(from.as_str())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() != 1 {
        return Err(AppError::Conflict {
            resource: "lot".to_string(),
            message: "The lot state changed while this request was in flight".to_string(),
            message_es: "El estado del lote cambió mientras se procesaba la solicitud".to_string(),
        });
    }
    Ok(())
}
