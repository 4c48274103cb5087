// Civic hierarchy store - provinces, districts, municipalities, wards and the
// candidates registered against each ward

use crate::core::database::Database;
use crate::models::civic::{
    Candidate, CandidateFilter, CandidateListing, District, Municipality, MunicipalityKind,
    NewCandidate, Province, StoreError, StoreResult, Ward,
};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CivicStore {
    db: Database,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl CivicStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // ==========================================================================
    // Hierarchy
    // ==========================================================================

    pub async fn get_or_create_province(&self, name: &str) -> StoreResult<Province> {
        let name = normalize(name);

        sqlx::query("INSERT OR IGNORE INTO provinces (name) VALUES (?)")
            .bind(&name)
            .execute(self.db.pool())
            .await?;

        let province = sqlx::query_as::<_, Province>("SELECT id, name FROM provinces WHERE name = ?")
            .bind(&name)
            .fetch_one(self.db.pool())
            .await?;

        Ok(province)
    }

    pub async fn get_or_create_district(&self, name: &str, province_id: i64) -> StoreResult<District> {
        let name = normalize(name);

        sqlx::query("INSERT OR IGNORE INTO districts (name, province_id) VALUES (?, ?)")
            .bind(&name)
            .bind(province_id)
            .execute(self.db.pool())
            .await?;

        let district = sqlx::query_as::<_, District>(
            "SELECT id, name, province_id FROM districts WHERE name = ? AND province_id = ?",
        )
        .bind(&name)
        .bind(province_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(district)
    }

    /// The kind of an existing municipality is left untouched
    pub async fn get_or_create_municipality(
        &self,
        name: &str,
        district_id: i64,
        kind: MunicipalityKind,
    ) -> StoreResult<Municipality> {
        let name = normalize(name);

        sqlx::query(
            "INSERT OR IGNORE INTO municipalities (name, district_id, kind) VALUES (?, ?, ?)",
        )
        .bind(&name)
        .bind(district_id)
        .bind(kind.to_db_string())
        .execute(self.db.pool())
        .await?;

        let municipality = sqlx::query_as::<_, Municipality>(
            "SELECT id, name, district_id, kind FROM municipalities WHERE name = ? AND district_id = ?",
        )
        .bind(&name)
        .bind(district_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(municipality)
    }

    pub async fn get_or_create_ward(&self, ward_no: i64, municipality_id: i64) -> StoreResult<Ward> {
        if ward_no <= 0 {
            return Err(StoreError::Invalid(format!("Ward number must be positive, got {}", ward_no)));
        }

        sqlx::query("INSERT OR IGNORE INTO wards (ward_no, municipality_id) VALUES (?, ?)")
            .bind(ward_no)
            .bind(municipality_id)
            .execute(self.db.pool())
            .await?;

        let ward = sqlx::query_as::<_, Ward>(
            "SELECT id, ward_no, municipality_id, info FROM wards WHERE ward_no = ? AND municipality_id = ?",
        )
        .bind(ward_no)
        .bind(municipality_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(ward)
    }

    pub async fn list_provinces(&self) -> StoreResult<Vec<Province>> {
        let provinces = sqlx::query_as::<_, Province>("SELECT id, name FROM provinces ORDER BY name")
            .fetch_all(self.db.pool())
            .await?;
        Ok(provinces)
    }

    pub async fn list_districts(&self, province_id: i64) -> StoreResult<Vec<District>> {
        let districts = sqlx::query_as::<_, District>(
            "SELECT id, name, province_id FROM districts WHERE province_id = ? ORDER BY name",
        )
        .bind(province_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(districts)
    }

    pub async fn list_municipalities(&self, district_id: i64) -> StoreResult<Vec<Municipality>> {
        let municipalities = sqlx::query_as::<_, Municipality>(
            "SELECT id, name, district_id, kind FROM municipalities WHERE district_id = ? ORDER BY name",
        )
        .bind(district_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(municipalities)
    }

    pub async fn list_wards(&self, municipality_id: i64) -> StoreResult<Vec<Ward>> {
        let wards = sqlx::query_as::<_, Ward>(
            "SELECT id, ward_no, municipality_id, info FROM wards WHERE municipality_id = ? ORDER BY ward_no",
        )
        .bind(municipality_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(wards)
    }

    /// Remove every candidate and hierarchy unit
    pub async fn reset(&self) -> StoreResult<()> {
        let mut tx = self.db.pool().begin().await?;
        for table in ["candidates", "wards", "municipalities", "districts", "provinces"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!("Civic data reset");
        Ok(())
    }

    async fn require_exists(&self, table: &str, label: &str, id: i64) -> StoreResult<()> {
        let found: Option<(i64,)> = sqlx::query_as(&format!("SELECT id FROM {} WHERE id = ?", table))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        found
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", label, id)))
    }

    pub async fn require_province(&self, id: i64) -> StoreResult<()> {
        self.require_exists("provinces", "Province", id).await
    }

    pub async fn require_district(&self, id: i64) -> StoreResult<()> {
        self.require_exists("districts", "District", id).await
    }

    pub async fn require_municipality(&self, id: i64) -> StoreResult<()> {
        self.require_exists("municipalities", "Municipality", id).await
    }

    pub async fn require_ward(&self, id: i64) -> StoreResult<()> {
        self.require_exists("wards", "Ward", id).await
    }

    // ==========================================================================
    // Candidates
    // ==========================================================================

    fn check_candidate(candidate: &NewCandidate) -> StoreResult<()> {
        if candidate.name.trim().is_empty() {
            return Err(StoreError::Invalid("Candidate name cannot be empty".to_string()));
        }
        if candidate.post.trim().is_empty() {
            return Err(StoreError::Invalid("Post cannot be empty".to_string()));
        }
        let email = candidate.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::Invalid(format!("Invalid email: {}", candidate.email)));
        }
        Ok(())
    }

    /// Resolve a ward by municipality name (case-insensitive) and ward number
    pub async fn find_ward(&self, municipality: &str, ward_no: i64) -> StoreResult<Ward> {
        let name = normalize(municipality);

        let matches: Vec<(i64,)> = sqlx::query_as("SELECT id FROM municipalities WHERE name = ?")
            .bind(&name)
            .fetch_all(self.db.pool())
            .await?;

        let municipality_id = match matches.as_slice() {
            [] => return Err(StoreError::NotFound(format!("Municipality '{}'", name))),
            [(id,)] => *id,
            _ => {
                return Err(StoreError::Invalid(format!(
                    "Municipality name '{}' is ambiguous across districts",
                    name
                )))
            }
        };

        sqlx::query_as::<_, Ward>(
            "SELECT id, ward_no, municipality_id, info FROM wards WHERE ward_no = ? AND municipality_id = ?",
        )
        .bind(ward_no)
        .bind(municipality_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Ward {} of '{}'", ward_no, name)))
    }

    pub async fn create_candidate(&self, candidate: NewCandidate) -> StoreResult<Candidate> {
        Self::check_candidate(&candidate)?;
        let ward = self.find_ward(&candidate.municipality, candidate.ward).await?;
        let created_at = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO candidates (name, gender, post, email, bio, ward_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(candidate.name.trim())
        .bind(candidate.gender.to_db_string())
        .bind(candidate.post.trim())
        .bind(candidate.email.trim())
        .bind(&candidate.bio)
        .bind(ward.id)
        .bind(created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(format!(
                    "Post '{}' is already taken in ward {}",
                    candidate.post.trim(),
                    ward.ward_no
                ))
            }
            other => StoreError::Database(other),
        })?;

        let id = result.last_insert_rowid();
        info!("Registered candidate {} for ward {}", id, ward.id);

        self.get_candidate(id).await
    }

    pub async fn get_candidate(&self, id: i64) -> StoreResult<Candidate> {
        sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Candidate {}", id)))
    }

    pub async fn delete_candidate(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM candidates WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Candidate {}", id)));
        }

        info!("Deleted candidate {}", id);
        Ok(())
    }

    pub async fn candidates_in_ward(&self, ward_id: i64) -> StoreResult<Vec<Candidate>> {
        self.require_ward(ward_id).await?;

        let candidates = sqlx::query_as::<_, Candidate>(
            "SELECT * FROM candidates WHERE ward_id = ? ORDER BY post, name",
        )
        .bind(ward_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(candidates)
    }

    pub async fn search_candidates(&self, filter: &CandidateFilter) -> StoreResult<Vec<Candidate>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT c.* FROM candidates c
             JOIN wards w ON w.id = c.ward_id
             JOIN municipalities m ON m.id = w.municipality_id
             JOIN districts d ON d.id = m.district_id
             JOIN provinces p ON p.id = d.province_id
             WHERE 1 = 1",
        );

        if let Some(province) = &filter.province {
            query.push(" AND p.name = ").push_bind(normalize(province));
        }
        if let Some(district) = &filter.district {
            query.push(" AND d.name = ").push_bind(normalize(district));
        }
        if let Some(municipality) = &filter.municipality {
            query.push(" AND m.name = ").push_bind(normalize(municipality));
        }
        if let Some(ward_no) = filter.ward_no {
            query.push(" AND w.ward_no = ").push_bind(ward_no);
        }
        query.push(" ORDER BY p.name, d.name, m.name, w.ward_no, c.post, c.name");

        let candidates = query
            .build_query_as::<Candidate>()
            .fetch_all(self.db.pool())
            .await?;

        debug!("Candidate search {:?} matched {}", filter, candidates.len());
        Ok(candidates)
    }

    /// Matching candidates plus the options for the next level of the finder
    pub async fn candidate_listing(&self, filter: &CandidateFilter) -> StoreResult<CandidateListing> {
        let mut listing = CandidateListing {
            candidates: self.search_candidates(filter).await?,
            ..Default::default()
        };

        let province_id = match &filter.province {
            Some(name) => self.lookup_id("SELECT id FROM provinces WHERE name = ?", name, None).await?,
            None => None,
        };
        let district_id = match (&filter.district, province_id) {
            (Some(name), Some(parent)) => {
                self.lookup_id(
                    "SELECT id FROM districts WHERE name = ? AND province_id = ?",
                    name,
                    Some(parent),
                )
                .await?
            }
            _ => None,
        };
        let municipality_id = match (&filter.municipality, district_id) {
            (Some(name), Some(parent)) => {
                self.lookup_id(
                    "SELECT id FROM municipalities WHERE name = ? AND district_id = ?",
                    name,
                    Some(parent),
                )
                .await?
            }
            _ => None,
        };

        if let Some(id) = province_id {
            listing.districts = self.list_districts(id).await?;
        }
        if let Some(id) = district_id {
            listing.municipalities = self.list_municipalities(id).await?;
        }
        if let Some(id) = municipality_id {
            listing.wards = self.list_wards(id).await?;
        }

        Ok(listing)
    }

    async fn lookup_id(&self, sql: &str, name: &str, parent: Option<i64>) -> StoreResult<Option<i64>> {
        let mut query = sqlx::query_as::<_, (i64,)>(sql).bind(normalize(name));
        if let Some(parent) = parent {
            query = query.bind(parent);
        }
        Ok(query.fetch_optional(self.db.pool()).await?.map(|(id,)| id))
    }
}
