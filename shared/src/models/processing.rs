//! Post-processing pipeline models: cleaning, color separation, reception

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Impurity-removal record for a lot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningRecord {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub method: CleaningMethod,
    pub responsible: String,
    pub impurity_weight_kg: Decimal,
    pub weight_before_kg: Decimal,
    pub weight_after_kg: Decimal,
    pub duration_minutes: Option<i32>,
    pub impurities_found: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Cleaning methods used at the plant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleaningMethod {
    Manual,
    Mechanical,
    Densimetric,
    Custom(String),
}

impl std::fmt::Display for CleaningMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleaningMethod::Manual => write!(f, "Manual"),
            CleaningMethod::Mechanical => write!(f, "Mechanical"),
            CleaningMethod::Densimetric => write!(f, "Densimetric"),
            CleaningMethod::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Weight and percentage for one color bucket (manual entry)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorBucket {
    pub weight_kg: Decimal,
    pub pct: Decimal,
}

/// Per-color classification of the cleaned lot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorBuckets {
    pub green: ColorBucket,
    pub yellow: ColorBucket,
    pub red: ColorBucket,
    pub black: ColorBucket,
    pub mixed: ColorBucket,
}

impl ColorBuckets {
    pub fn total_weight_kg(&self) -> Decimal {
        self.green.weight_kg
            + self.yellow.weight_kg
            + self.red.weight_kg
            + self.black.weight_kg
            + self.mixed.weight_kg
    }
}

/// Color separation record for a lot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSeparationRecord {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub responsible: String,
    pub separation_date: NaiveDate,
    pub overall_quality: String,
    pub buckets: ColorBuckets,
    /// Set when bucket weights disagree with the lot weight beyond tolerance
    pub consistency_warning: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Final grading at reception; terminal stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReception {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub responsible: String,
    pub reception_date: NaiveDate,
    pub final_grade: FinalGrade,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Final quality grade assigned at reception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalGrade {
    A,
    B,
    C,
    D,
}

impl FinalGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalGrade::A => "A",
            FinalGrade::B => "B",
            FinalGrade::C => "C",
            FinalGrade::D => "D",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "A" => Some(FinalGrade::A),
            "B" => Some(FinalGrade::B),
            "C" => Some(FinalGrade::C),
            "D" => Some(FinalGrade::D),
            _ => None,
        }
    }
}

impl std::fmt::Display for FinalGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
