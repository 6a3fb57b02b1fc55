//! Common types used across the platform

use rust_decimal::Decimal;

/// Fixed conversion constant: one quintal of parchment coffee weighs 46 kg
pub const KG_PER_QUINTAL: u32 = 46;

/// Convert declared quintals to the auto-computed initial weight in kg
pub fn quintals_to_kg(quintals: Decimal) -> Decimal {
    (quintals * Decimal::from(KG_PER_QUINTAL)).round_dp(2)
}
