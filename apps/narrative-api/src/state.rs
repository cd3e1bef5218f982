//! Application state for the narrative API

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use narrative_engine::{EngineConfig, NarrativeService};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::store::{SqliteConfigStore, SqliteTemplateCache};

pub struct AppState {
    pub service: NarrativeService,
}

impl AppState {
    /// State backed by SQLite at `database_url`, or the default data directory
    pub async fn new(database_url: Option<String>, config: EngineConfig) -> Result<Self> {
        let db_path = database_url.unwrap_or_else(default_database_url);

        tracing::info!("Connecting to database: {}", db_path);
        let pool = connect(&db_path).await?;

        let service = NarrativeService::new(
            Arc::new(SqliteConfigStore::new(pool.clone())),
            Arc::new(SqliteTemplateCache::new(pool)),
            config,
        );

        Ok(Self { service })
    }

    /// State over in-memory storage, nothing persisted
    pub fn in_memory(config: EngineConfig) -> Self {
        Self {
            service: NarrativeService::in_memory(config),
        }
    }
}

fn default_database_url() -> String {
    let dir = data_dir().join("narrative-api");
    std::fs::create_dir_all(&dir).ok();
    database_url_in(&dir)
}

fn database_url_in(dir: &Path) -> String {
    format!("sqlite:{}?mode=rwc", dir.join("narrative.db").display())
}

/// Platform data directory, or the working directory when none is known
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let base = std::env::var_os("APPDATA").map(PathBuf::from);

    #[cfg(target_os = "macos")]
    let base = std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join("Library/Application Support"));

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let base = std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share")));

    base.unwrap_or_else(|| PathBuf::from("."))
}

/// Open a pool and bring the schema up to date
pub async fn connect(db_path: &str) -> Result<SqlitePool> {
    // Each connection to an in-memory database sees its own empty database
    let pool = if db_path.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(db_path)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_path)
            .await?
    };

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS configurations (
            id TEXT PRIMARY KEY,
            version INTEGER NOT NULL UNIQUE,
            definition_json TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 0,
            created_by TEXT,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one active configuration
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_configurations_single_active
        ON configurations(is_active) WHERE is_active = 1
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS narrative_templates (
            id TEXT PRIMARY KEY,
            fingerprint TEXT NOT NULL UNIQUE,
            sections_json TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_points_into_directory() {
        let url = database_url_in(Path::new("/var/lib/narrative-api"));
        assert_eq!(url, "sqlite:/var/lib/narrative-api/narrative.db?mode=rwc");
    }

    #[tokio::test]
    async fn test_connect_creates_schema() {
        let pool = connect("sqlite::memory:").await.unwrap();
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(tables, vec!["configurations", "narrative_templates"]);
    }
}
