use crate::models::civic::StoreResult;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tracing::info;

#[derive(Debug, Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `url` and run migrations
    pub async fn init(url: &str) -> StoreResult<Self> {
        if let Some(path) = url.strip_prefix("sqlite://") {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
                }
            }
        }

        if !Sqlite::database_exists(url).await? {
            info!("Creating database at {}", url);
            Sqlite::create_database(url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Single-connection in-memory database, migrated
    pub async fn in_memory() -> StoreResult<Self> {
        // One connection only: every new connection would see an empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Get the pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> Database {
        Database::in_memory()
            .await
            .expect("Failed to create in-memory database")
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let db = setup_test_db().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .expect("Failed to list tables");

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        for table in ["candidates", "districts", "municipalities", "provinces", "wards"] {
            assert!(names.contains(&table), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = setup_test_db().await;
        db.run_migrations().await.expect("Second migration run failed");
    }

    #[tokio::test]
    async fn test_init_creates_file_database() {
        let mut path = std::env::temp_dir();
        path.push(format!("civic_test_db_{}", uuid::Uuid::new_v4()));
        path.push("civic.db");
        let url = format!("sqlite://{}", path.display());

        let db = Database::init(&url).await.expect("Failed to init database");
        assert!(path.exists());
        db.pool().close().await;

        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[tokio::test]
    async fn test_unique_province_name() {
        let db = setup_test_db().await;

        sqlx::query("INSERT INTO provinces (name) VALUES ('koshi')")
            .execute(db.pool())
            .await
            .expect("First insert failed");

        let duplicate = sqlx::query("INSERT INTO provinces (name) VALUES ('koshi')")
            .execute(db.pool())
            .await;
        assert!(duplicate.is_err());
    }
}
