// Hierarchy data loader - seeds provinces, districts, municipalities and wards
// from the national ward dataset (a JSON array of entries)

use crate::core::civic_store::CivicStore;
use crate::models::civic::{MunicipalityKind, StoreResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

static MUNICIPALITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)\s+(Rural Municipality|Municipality|Sub-Metropolitan City|Metropolitan City)$")
        .expect("municipality pattern is valid")
});

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Dataset file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed dataset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] crate::models::civic::StoreError),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// One municipality with its wards, as published in the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub state: String,
    pub district: String,
    pub municipality: String,
    #[serde(default)]
    pub wards: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub entries: usize,
    pub skipped: usize,
    pub provinces: usize,
    pub districts: usize,
    pub municipalities: usize,
    pub wards: usize,
}

/// Split "Dharan Sub-Metropolitan City" into ("dharan", SubMetropolitan)
pub fn parse_municipality(label: &str) -> Option<(String, MunicipalityKind)> {
    let captures = MUNICIPALITY_PATTERN.captures(label.trim())?;
    let name = captures.get(1)?.as_str().trim().to_lowercase();
    let kind = MunicipalityKind::from_label(captures.get(2)?.as_str())?;

    if name.is_empty() {
        return None;
    }
    Some((name, kind))
}

pub fn read_dataset(path: &Path) -> LoadResult<Vec<DatasetEntry>> {
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Get-or-create every unit in the dataset; safe to run repeatedly
pub async fn load_entries(store: &CivicStore, entries: &[DatasetEntry]) -> StoreResult<LoadSummary> {
    let mut summary = LoadSummary {
        entries: entries.len(),
        ..Default::default()
    };
    let mut provinces = std::collections::HashSet::new();
    let mut districts = std::collections::HashSet::new();

    for entry in entries {
        let Some((name, kind)) = parse_municipality(&entry.municipality) else {
            warn!(
                "Skipping unrecognised municipality '{}' in {}",
                entry.municipality, entry.district
            );
            summary.skipped += 1;
            continue;
        };

        let province = store.get_or_create_province(&entry.state).await?;
        let district = store.get_or_create_district(&entry.district, province.id).await?;
        let municipality = store
            .get_or_create_municipality(&name, district.id, kind)
            .await?;

        provinces.insert(province.id);
        districts.insert(district.id);
        summary.municipalities += 1;

        for ward_no in &entry.wards {
            store.get_or_create_ward(*ward_no, municipality.id).await?;
            summary.wards += 1;
        }
    }

    summary.provinces = provinces.len();
    summary.districts = districts.len();

    info!(
        "Loaded {} entries ({} skipped): {} provinces, {} districts, {} municipalities, {} wards",
        summary.entries,
        summary.skipped,
        summary.provinces,
        summary.districts,
        summary.municipalities,
        summary.wards
    );

    Ok(summary)
}

pub async fn load_file(store: &CivicStore, path: &Path) -> LoadResult<LoadSummary> {
    let entries = read_dataset(path)?;
    Ok(load_entries(store, &entries).await?)
}
