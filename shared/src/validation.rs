//! Validation utilities for the Cooperative Coffee QC Platform
//!
//! Includes Ecuador-specific validations for cédula and phone formats.
//! Lot-input validation collects every violation instead of failing fast, so
//! the operator sees the full form summary at once.

use rust_decimal::Decimal;

use crate::error::FieldViolation;
use crate::models::{LotDraft, OwnerSource};

// ============================================================================
// National id helpers
// ============================================================================

/// Normalize a national id to its digits only
pub fn normalize_national_id(id: &str) -> String {
    id.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validate an Ecuadorian cédula (10 digits, province code, mod-10 checksum)
pub fn validate_cedula(id: &str) -> Result<(), &'static str> {
    let digits = normalize_national_id(id);
    if digits.len() != 10 {
        return Err("Cédula must be 10 digits");
    }

    let nums: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    let province = nums[0] * 10 + nums[1];
    if province == 0 || province > 24 {
        return Err("Invalid province code in cédula");
    }
    if nums[2] >= 6 {
        return Err("Invalid third digit in cédula");
    }

    // Modulo-10 checksum: odd positions doubled, carries folded
    let mut sum = 0;
    for (i, &d) in nums.iter().take(9).enumerate() {
        let mut product = if i % 2 == 0 { d * 2 } else { d };
        if product > 9 {
            product -= 9;
        }
        sum += product;
    }
    let check = (10 - sum % 10) % 10;
    if check != nums[9] {
        return Err("Invalid cédula checksum");
    }

    Ok(())
}

/// Validate an Ecuadorian phone number
/// Accepts: 0991234567, 099-123-4567, +593991234567
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let digits = normalize_national_id(phone);

    // National format: 9 or 10 digits starting with 0
    if (digits.len() == 9 || digits.len() == 10) && digits.starts_with('0') {
        return Ok(());
    }
    // International format with country code 593
    if digits.len() == 12 && digits.starts_with("593") {
        return Ok(());
    }

    Err("Invalid Ecuadorian phone number format")
}

/// Ecuadorian provinces
pub const PROVINCES: &[&str] = &[
    "Azuay",
    "Bolívar",
    "Cañar",
    "Carchi",
    "Chimborazo",
    "Cotopaxi",
    "El Oro",
    "Esmeraldas",
    "Galápagos",
    "Guayas",
    "Imbabura",
    "Loja",
    "Los Ríos",
    "Manabí",
    "Morona Santiago",
    "Napo",
    "Orellana",
    "Pastaza",
    "Pichincha",
    "Santa Elena",
    "Santo Domingo de los Tsáchilas",
    "Sucumbíos",
    "Tungurahua",
    "Zamora Chinchipe",
];

/// Validate a province name
pub fn validate_province(province: &str) -> Result<(), &'static str> {
    let lower = province.to_lowercase();
    if PROVINCES.iter().any(|p| p.to_lowercase() == lower) {
        Ok(())
    } else {
        Err("Province is not a recognized Ecuadorian province")
    }
}

// ============================================================================
// Lot input validation
// ============================================================================

/// Validate a lot draft, collecting every violation
pub fn validate_lot_draft(draft: &LotDraft) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    if draft.code.trim().is_empty() {
        violations.push(FieldViolation::new(
            "lotNumber",
            "Lot code is required",
            "El código del lote es obligatorio",
        ));
    }
    if draft.organization_id.is_none() {
        violations.push(FieldViolation::new(
            "organization",
            "Organization is required",
            "La organización es obligatoria",
        ));
    }
    if draft.harvest_date.is_none() {
        violations.push(FieldViolation::new(
            "harvestDate",
            "Harvest date is required",
            "La fecha de cosecha es obligatoria",
        ));
    }
    if draft.declared_quintals <= Decimal::ZERO {
        violations.push(FieldViolation::new(
            "totalQuintals",
            "Declared quintals must be greater than zero",
            "Los quintales declarados deben ser mayores a cero",
        ));
    }
    if let Some(weight) = draft.initial_weight_kg {
        if weight <= Decimal::ZERO {
            violations.push(FieldViolation::new(
                "initialWeightKg",
                "Initial weight override must be greater than zero",
                "El peso inicial debe ser mayor a cero",
            ));
        }
    }

    if draft.owners.is_empty() {
        violations.push(FieldViolation::new(
            "owners",
            "At least one owner entry is required",
            "Se requiere al menos un propietario",
        ));
    }

    let mut entries_total = Decimal::ZERO;
    for (i, entry) in draft.owners.iter().enumerate() {
        let field = |name: &str| format!("owners[{}].{}", i, name);

        if entry.quintals_delivered <= Decimal::ZERO {
            violations.push(FieldViolation::new(
                &field("quintalsDelivered"),
                "Delivered quintals must be greater than zero",
                "Los quintales entregados deben ser mayores a cero",
            ));
        }
        entries_total += entry.quintals_delivered;

        if let OwnerSource::New(data) = &entry.source {
            if data.full_name.trim().is_empty() {
                violations.push(FieldViolation::new(
                    &field("fullName"),
                    "Owner name is required",
                    "El nombre del propietario es obligatorio",
                ));
            }
            if normalize_national_id(&data.national_id).is_empty() {
                violations.push(FieldViolation::new(
                    &field("nationalId"),
                    "Owner national id is required",
                    "La cédula del propietario es obligatoria",
                ));
            }
        }
    }

    // Entry quintals must partition the declared total exactly, so the
    // separation report buckets always sum to the lot total
    if !draft.owners.is_empty()
        && draft.declared_quintals > Decimal::ZERO
        && entries_total != draft.declared_quintals
    {
        violations.push(FieldViolation::new(
            "owners",
            "Owner entry quintals must sum to the declared lot total",
            "Los quintales de los propietarios deben sumar el total declarado",
        ));
    }

    violations
}
