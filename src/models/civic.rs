// Data models for the administrative hierarchy and ward candidates
//
// Province -> District -> Municipality -> Ward -> Candidate

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Province {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct District {
    pub id: i64,
    pub name: String,
    pub province_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Municipality {
    pub id: i64,
    pub name: String,
    pub district_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ward {
    pub id: i64,
    pub ward_no: i64,
    pub municipality_id: i64,
    pub info: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MunicipalityKind {
    Rural,
    Urban,
    SubMetropolitan,
    Metropolitan,
}

impl MunicipalityKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            MunicipalityKind::Rural => "rural",
            MunicipalityKind::Urban => "urban",
            MunicipalityKind::SubMetropolitan => "sub_metropolitan",
            MunicipalityKind::Metropolitan => "metropolitan",
        }
    }

    /// Parse the suffix used in the national dataset, e.g. "Rural Municipality"
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "rural municipality" | "rural" => Some(MunicipalityKind::Rural),
            "municipality" | "urban" | "urban municipality" => Some(MunicipalityKind::Urban),
            "sub-metropolitan city" | "sub_metropolitan" | "submetropolitan" => {
                Some(MunicipalityKind::SubMetropolitan)
            }
            "metropolitan city" | "metropolitan" => Some(MunicipalityKind::Metropolitan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(format!("Unknown gender: {}", s)),
        }
    }
}

// ==============================================================================
// Candidates
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    pub gender: String,
    pub post: String,
    pub email: String,
    pub bio: Option<String>,
    pub ward_id: i64,
    pub created_at: i64,
}

/// Registration request; the ward is addressed by municipality name and number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub name: String,
    pub gender: Gender,
    pub post: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    pub municipality: String,
    pub ward: i64,
}

/// Every field narrows the search; names compare case-insensitively
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFilter {
    pub province: Option<String>,
    pub district: Option<String>,
    pub municipality: Option<String>,
    pub ward_no: Option<i64>,
}

/// Listing response for the location finder: matches plus the next level of choices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateListing {
    pub candidates: Vec<Candidate>,
    pub districts: Vec<District>,
    pub municipalities: Vec<Municipality>,
    pub wards: Vec<Ward>,
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
