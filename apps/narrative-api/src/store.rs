//! SQLite-backed configuration store and template cache
//!
//! Configurations live in the `configurations` table; a partial unique index
//! on `is_active` lets the database itself refuse a second active row.
//! Narrative templates live in `narrative_templates`, unique per fingerprint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use narrative_engine::store::{bootstrap_definition, BOOTSTRAP_AUTHOR, BOOTSTRAP_NOTES};
use narrative_engine::{ConfigStore, EngineError, EngineResult, TemplateCache};
use shared_types::{
    Configuration, ConfigurationSummary, FormDefinition, NarrativeTemplate, SectionTemplates,
};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

const CONFIGURATION_COLUMNS: &str =
    "id, version, definition_json, is_active, created_by, notes, created_at";

/// Busy or locked database; another writer holds the lock
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";

/// Map a database failure into the engine's error space
///
/// Unique violations and lock contention mean a concurrent writer won the
/// race; those become retryable conflicts.
fn store_error(err: sqlx::Error) -> EngineError {
    if let sqlx::Error::Database(db) = &err {
        let contended = matches!(db.code().as_deref(), Some(SQLITE_BUSY) | Some(SQLITE_LOCKED));
        if db.is_unique_violation() || contended {
            return EngineError::Conflict(db.message().to_string());
        }
    }
    EngineError::Store(err.to_string())
}

fn parse_timestamp(raw: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::Store(format!("Invalid timestamp '{}': {}", raw, e)))
}

fn parse_id(raw: &str) -> EngineResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| EngineError::Store(format!("Invalid id '{}': {}", raw, e)))
}

fn configuration_from_row(row: &SqliteRow) -> EngineResult<Configuration> {
    let summary = summary_from_row(row)?;
    let definition_json: String = row.try_get("definition_json").map_err(store_error)?;
    let definition: FormDefinition = serde_json::from_str(&definition_json)?;

    Ok(Configuration {
        id: summary.id,
        version: summary.version,
        definition,
        is_active: summary.is_active,
        created_by: summary.created_by,
        notes: summary.notes,
        created_at: summary.created_at,
    })
}

fn summary_from_row(row: &SqliteRow) -> EngineResult<ConfigurationSummary> {
    let id: String = row.try_get("id").map_err(store_error)?;
    let version: i64 = row.try_get("version").map_err(store_error)?;
    let is_active: bool = row.try_get("is_active").map_err(store_error)?;
    let created_at: String = row.try_get("created_at").map_err(store_error)?;

    Ok(ConfigurationSummary {
        id: parse_id(&id)?,
        version: u32::try_from(version)
            .map_err(|_| EngineError::Store(format!("Version out of range: {}", version)))?,
        is_active,
        created_by: row.try_get("created_by").map_err(store_error)?,
        notes: row.try_get("notes").map_err(store_error)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

pub struct SqliteConfigStore {
    pool: SqlitePool,
}

impl SqliteConfigStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_active(&self) -> EngineResult<Option<Configuration>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM configurations WHERE is_active = 1",
            CONFIGURATION_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.as_ref().map(configuration_from_row).transpose()
    }

    /// Insert version 1 unless some configuration already exists
    async fn bootstrap(&self) -> EngineResult<()> {
        let definition = bootstrap_definition()?;
        let record = Configuration::new_active(
            1,
            definition,
            Some(BOOTSTRAP_AUTHOR.to_string()),
            Some(BOOTSTRAP_NOTES.to_string()),
        );
        let definition_json = serde_json::to_string(&record.definition)?;

        let result = sqlx::query(
            r#"
            INSERT INTO configurations (id, version, definition_json, is_active, created_by, notes, created_at)
            SELECT ?, ?, ?, 1, ?, ?, ?
            WHERE NOT EXISTS (SELECT 1 FROM configurations)
            "#,
        )
        .bind(record.id.to_string())
        .bind(i64::from(record.version))
        .bind(&definition_json)
        .bind(&record.created_by)
        .bind(&record.notes)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result.map_err(store_error) {
            Ok(done) if done.rows_affected() > 0 => {
                tracing::info!("Bootstrapped default configuration as version 1");
                Ok(())
            }
            Ok(_) => Ok(()),
            // Another request bootstrapped first
            Err(EngineError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn get_active(&self) -> EngineResult<Configuration> {
        if let Some(config) = self.fetch_active().await? {
            return Ok(config);
        }

        self.bootstrap().await?;

        self.fetch_active().await?.ok_or_else(|| {
            EngineError::MissingConfiguration(
                "configurations exist but none is active".to_string(),
            )
        })
    }

    async fn publish(
        &self,
        definition: FormDefinition,
        author_id: Option<String>,
        notes: Option<String>,
    ) -> EngineResult<Configuration> {
        let definition_json = serde_json::to_string(&definition)?;
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // Take the write lock before reading the version counter
        sqlx::query("UPDATE configurations SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        let next: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) + 1 FROM configurations")
                .fetch_one(&mut *tx)
                .await
                .map_err(store_error)?;
        let version = u32::try_from(next)
            .map_err(|_| EngineError::Store(format!("Version out of range: {}", next)))?;

        let record = Configuration::new_active(version, definition, author_id, notes);

        sqlx::query(
            r#"
            INSERT INTO configurations (id, version, definition_json, is_active, created_by, notes, created_at)
            VALUES (?, ?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(next)
        .bind(&definition_json)
        .bind(&record.created_by)
        .bind(&record.notes)
        .bind(record.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        let active: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM configurations WHERE is_active = 1")
                .fetch_one(&mut *tx)
                .await
                .map_err(store_error)?;

        if active != 1 {
            tx.rollback().await.map_err(store_error)?;
            return Err(EngineError::Conflict(format!(
                "{} active configurations after publish",
                active
            )));
        }

        tx.commit().await.map_err(store_error)?;

        tracing::info!(
            version = record.version,
            author = record.created_by.as_deref().unwrap_or("-"),
            "Published configuration"
        );
        Ok(record)
    }

    async fn history(&self) -> EngineResult<Vec<ConfigurationSummary>> {
        let rows = sqlx::query(
            "SELECT id, version, is_active, created_by, notes, created_at \
             FROM configurations ORDER BY version DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.iter().map(summary_from_row).collect()
    }

    async fn get_version(&self, version: u32) -> EngineResult<Option<Configuration>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM configurations WHERE version = ?",
            CONFIGURATION_COLUMNS
        ))
        .bind(i64::from(version))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.as_ref().map(configuration_from_row).transpose()
    }
}

pub struct SqliteTemplateCache {
    pool: SqlitePool,
}

impl SqliteTemplateCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn template_from_row(row: &SqliteRow) -> EngineResult<NarrativeTemplate> {
    let id: String = row.try_get("id").map_err(store_error)?;
    let sections_json: String = row.try_get("sections_json").map_err(store_error)?;
    let created_at: String = row.try_get("created_at").map_err(store_error)?;
    let sections: SectionTemplates = serde_json::from_str(&sections_json)?;

    Ok(NarrativeTemplate {
        id: parse_id(&id)?,
        structural_fingerprint: row.try_get("fingerprint").map_err(store_error)?,
        sections,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait]
impl TemplateCache for SqliteTemplateCache {
    async fn get(&self, fingerprint: &str) -> EngineResult<Option<NarrativeTemplate>> {
        let row = sqlx::query(
            "SELECT id, fingerprint, sections_json, created_at \
             FROM narrative_templates WHERE fingerprint = ?",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.as_ref().map(template_from_row).transpose()
    }

    async fn insert_if_absent(
        &self,
        fingerprint: &str,
        sections: SectionTemplates,
    ) -> EngineResult<NarrativeTemplate> {
        let candidate = NarrativeTemplate::new(fingerprint, sections);
        let sections_json = serde_json::to_string(&candidate.sections)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO narrative_templates (id, fingerprint, sections_json, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(fingerprint) DO NOTHING
            "#,
        )
        .bind(candidate.id.to_string())
        .bind(fingerprint)
        .bind(&sections_json)
        .bind(candidate.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_error)?
        .rows_affected();

        if inserted > 0 {
            tracing::debug!(fingerprint, "Stored narrative template");
            return Ok(candidate);
        }

        self.get(fingerprint).await?.ok_or_else(|| {
            EngineError::Store(format!(
                "Template for {} vanished after a conflicting insert",
                fingerprint
            ))
        })
    }

    async fn invalidate_all(&self) -> EngineResult<u64> {
        let done = sqlx::query("DELETE FROM narrative_templates")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(done.rows_affected())
    }

    async fn len(&self) -> EngineResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM narrative_templates")
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::connect;
    use narrative_engine::{EngineConfig, NarrativeService};
    use shared_types::{Element, ElementType, Page, SectionName};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Arc;

    const WRITERS: usize = 16;

    async fn pool() -> SqlitePool {
        connect("sqlite::memory:").await.unwrap()
    }

    /// Database file removed on drop, for tests that need several connections
    struct TempDatabase {
        path: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!("narrative-{}.db", Uuid::new_v4()));
            Self { path }
        }

        fn url(&self) -> String {
            format!("sqlite:{}?mode=rwc", self.path.display())
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm", "-journal"] {
                let mut file = self.path.clone().into_os_string();
                file.push(suffix);
                std::fs::remove_file(file).ok();
            }
        }
    }

    fn definition(title: &str) -> FormDefinition {
        FormDefinition {
            title: Some(title.to_string()),
            description: None,
            pages: vec![Page::new(
                "about-you",
                "About You",
                vec![Element::new(ElementType::Text, "applicantName", "Your Full Name")],
            )],
        }
    }

    fn sections(marker: &str) -> SectionTemplates {
        SectionName::ALL
            .into_iter()
            .map(|name| (name, format!("{} {{{{applicantName}}}}", marker)))
            .collect()
    }

    #[tokio::test]
    async fn test_first_read_bootstraps_version_one() {
        let store = SqliteConfigStore::new(pool().await);

        let active = store.get_active().await.unwrap();
        assert_eq!(active.version, 1);
        assert!(active.is_active);
        assert_eq!(active.created_by.as_deref(), Some(BOOTSTRAP_AUTHOR));

        let again = store.get_active().await.unwrap();
        assert_eq!(again.id, active.id);
        assert_eq!(store.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_moves_the_active_flag() {
        let store = SqliteConfigStore::new(pool().await);
        store.get_active().await.unwrap();

        let published = store
            .publish(definition("Second"), Some("admin".into()), Some("edit".into()))
            .await
            .unwrap();
        assert_eq!(published.version, 2);

        let active = store.get_active().await.unwrap();
        assert_eq!(active.id, published.id);
        assert_eq!(active.definition, definition("Second"));

        let history = store.history().await.unwrap();
        let versions: Vec<u32> = history.iter().map(|c| c.version).collect();
        assert_eq!(versions, vec![2, 1]);
        assert_eq!(history.iter().filter(|c| c.is_active).count(), 1);
    }

    #[tokio::test]
    async fn test_get_version_reads_inactive_records() {
        let store = SqliteConfigStore::new(pool().await);
        let first = store.get_active().await.unwrap();
        store.publish(definition("Second"), None, None).await.unwrap();

        let old = store.get_version(1).await.unwrap().unwrap();
        assert_eq!(old.id, first.id);
        assert!(!old.is_active);
        assert!(store.get_version(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_index_rejects_second_active_row() {
        let pool = pool().await;
        let store = SqliteConfigStore::new(pool.clone());
        store.get_active().await.unwrap();

        let err = sqlx::query(
            "INSERT INTO configurations (id, version, definition_json, is_active, created_at) \
             VALUES ('x', 99, '{}', 1, '2024-01-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await
        .map_err(store_error)
        .unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_publishes_across_connections() {
        let db = TempDatabase::new();
        let pool = connect(&db.url()).await.unwrap();
        let service = Arc::new(NarrativeService::new(
            Arc::new(SqliteConfigStore::new(pool.clone())),
            Arc::new(SqliteTemplateCache::new(pool.clone())),
            EngineConfig::default(),
        ));

        let handles: Vec<_> = (0..WRITERS)
            .map(|n| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .publish(definition(&format!("Revision {}", n)), None, None)
                        .await
                })
            })
            .collect();

        let mut versions = HashSet::new();
        for handle in handles {
            let config = handle.await.unwrap().unwrap();
            versions.insert(config.version);
        }
        assert_eq!(versions.len(), WRITERS);

        let history = service.history().await.unwrap();
        let active: Vec<_> = history.iter().filter(|c| c.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].version as usize, WRITERS);
        assert_eq!(history[0].version, active[0].version);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_reads_bootstrap_once_across_connections() {
        let db = TempDatabase::new();
        let store = Arc::new(SqliteConfigStore::new(connect(&db.url()).await.unwrap()));

        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get_active().await })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap().id);
        }

        assert_eq!(ids.len(), 1);
        assert_eq!(store.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_template_insert_keeps_first_writer() {
        let cache = SqliteTemplateCache::new(pool().await);

        let first = cache.insert_if_absent("fp", sections("first")).await.unwrap();
        let second = cache.insert_if_absent("fp", sections("second")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.sections, sections("first"));
        assert_eq!(cache.len().await.unwrap(), 1);
        assert_eq!(cache.get("fp").await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_invalidate_all_empties_the_cache() {
        let cache = SqliteTemplateCache::new(pool().await);
        cache.insert_if_absent("a", sections("a")).await.unwrap();
        cache.insert_if_absent("b", sections("b")).await.unwrap();

        assert_eq!(cache.invalidate_all().await.unwrap(), 2);
        assert_eq!(cache.len().await.unwrap(), 0);
        assert!(cache.get("a").await.unwrap().is_none());
    }
}
