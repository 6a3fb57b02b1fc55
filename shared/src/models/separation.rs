//! Separation plan and report models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::owner::EntryView;

/// Clean/contaminated split for a lot, derived on demand from sample and
/// entry state; never the primary source of truth
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeparationPlan {
    pub lot_id: Uuid,
    pub contaminated_quintals: Decimal,
    pub clean_quintals: Decimal,
    pub contaminated_owners: Vec<EntryView>,
    /// Stored accounting percentages, normalized so the pair sums to <= 100
    pub pct_contaminated: Decimal,
    pub pct_clean: Decimal,
}

impl SeparationPlan {
    /// Percentages rounded to one decimal, for display only
    pub fn display_percentages(&self) -> (Decimal, Decimal) {
        (
            self.pct_contaminated.round_dp(1),
            self.pct_clean.round_dp(1),
        )
    }
}

/// Partition of a lot's owner entries by their latest sample state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeparationReport {
    pub lot_id: Uuid,
    pub totals: ReportTotals,
    pub recommendation: Recommendation,
    pub approved_owners: Vec<EntryView>,
    pub contaminated_owners: Vec<EntryView>,
    pub pending_owners: Vec<EntryView>,
}

/// Quintal totals per bucket; the three buckets sum exactly to the lot total
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub approved_quintals: Decimal,
    pub contaminated_quintals: Decimal,
    pub pending_quintals: Decimal,
    pub total_lot: Decimal,
}

/// Operator-facing recommendation derived from the partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    FullApproval,
    PartialSeparation,
    FullRejection,
    AwaitingAnalysis,
}
