use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::models::records::{FeedbackRecord, UsageRecord, UsageSummary};

/// Feedback and usage persistence. Each operation opens its own connection,
/// so the store is `Send + Sync` without any locking of its own.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn new(app_name: &str) -> Result<Self, AppError> {
        let db_path = default_sqlite_path(app_name)?;
        Self::open_at(db_path)
    }

    pub fn open_at(db_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let db_path = expand_tilde(db_path.into());
        init_db(&db_path)?;
        Ok(Self { db_path })
    }

    pub fn feedback_insert(&self, record: &FeedbackRecord) -> Result<(), AppError> {
        let payload = serde_json::to_string(record)?;
        let conn = self.open()?;
        conn.execute(
            r#"
            INSERT INTO feedback(id, message_id, rating, data_json, created_at)
            VALUES(?1, ?2, ?3, ?4, ?5);
            "#,
            params![
                record.id,
                record.message_id,
                record.rating.as_str(),
                payload,
                record.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Newest first.
    pub fn feedback_list(&self, limit: usize) -> Result<Vec<FeedbackRecord>, AppError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT data_json FROM feedback ORDER BY created_at DESC, rowid DESC LIMIT ?1;",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| row.get::<_, String>(0))?;
        let mut items = Vec::new();
        for row in rows {
            let json = row?;
            items.push(serde_json::from_str(&json)?);
        }
        Ok(items)
    }

    pub fn usage_insert(&self, record: &UsageRecord) -> Result<(), AppError> {
        let payload = serde_json::to_string(record)?;
        let conn = self.open()?;
        conn.execute(
            r#"
            INSERT INTO usage_log(id, source, model, input_tokens, output_tokens, estimated_usd, data_json, created_at)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);
            "#,
            params![
                record.id,
                record.source.as_str(),
                record.model,
                record.input_tokens,
                record.output_tokens,
                record.estimated_usd,
                payload,
                record.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn usage_summary(&self) -> Result<UsageSummary, AppError> {
        let conn = self.open()?;
        let summary = conn.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(input_tokens), 0),
                   COALESCE(SUM(output_tokens), 0),
                   COALESCE(SUM(estimated_usd), 0.0)
            FROM usage_log;
            "#,
            [],
            |row| {
                Ok(UsageSummary {
                    turns: row.get::<_, i64>(0)?.max(0) as u64,
                    input_tokens: row.get::<_, i64>(1)?.max(0) as u64,
                    output_tokens: row.get::<_, i64>(2)?.max(0) as u64,
                    estimated_usd: row.get(3)?,
                })
            },
        )?;
        Ok(summary)
    }

    fn open(&self) -> Result<Connection, AppError> {
        Ok(Connection::open(&self.db_path)?)
    }
}

fn init_db(db_path: &Path) -> Result<(), AppError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Store(e.to_string()))?;
        }
    }

    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);
        INSERT INTO schema_version(version)
        SELECT 1
        WHERE NOT EXISTS (SELECT 1 FROM schema_version);

        CREATE TABLE IF NOT EXISTS feedback (
            id TEXT PRIMARY KEY,
            message_id TEXT NOT NULL,
            rating TEXT NOT NULL,
            data_json TEXT NOT NULL,
            created_at TEXT
        );

        CREATE TABLE IF NOT EXISTS usage_log (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            model TEXT NOT NULL,
            input_tokens INTEGER NOT NULL,
            output_tokens INTEGER NOT NULL,
            estimated_usd REAL NOT NULL,
            data_json TEXT NOT NULL,
            created_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_feedback_message ON feedback (message_id);
        CREATE INDEX IF NOT EXISTS idx_usage_created ON usage_log (created_at);
        "#,
    )?;

    Ok(())
}

pub fn default_sqlite_path(app_name: &str) -> Result<PathBuf, AppError> {
    if let Ok(override_path) = std::env::var("STORE_SQLITE_PATH") {
        let mut path = expand_tilde(PathBuf::from(override_path));
        if path.is_relative() {
            path = std::env::current_dir()
                .map_err(|e| AppError::Store(e.to_string()))?
                .join(path);
        }
        return Ok(path);
    }

    let home = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));

    #[cfg(target_os = "macos")]
    {
        Ok(home
            .join("Library")
            .join("Application Support")
            .join(app_name)
            .join("care.db"))
    }

    #[cfg(target_os = "windows")]
    {
        let base = std::env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join("AppData").join("Local"));
        Ok(base.join(app_name).join("care.db"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let base = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local").join("share"));
        Ok(base.join(app_name).join("care.db"))
    }
}

fn expand_tilde(path: PathBuf) -> PathBuf {
    let s = path.to_string_lossy().to_string();
    let home = || PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    if s == "~" {
        return home();
    }
    if let Some(rest) = s.strip_prefix("~/") {
        return home().join(rest);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("care.db");
        SqliteStore::open_at(&path).unwrap();
        let store = SqliteStore::open_at(&path).unwrap();
        assert_eq!(store.usage_summary().unwrap(), UsageSummary::default());
    }

    #[test]
    fn tilde_expands_to_home() {
        let expanded = expand_tilde(PathBuf::from("~/care.db"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert_eq!(expand_tilde(PathBuf::from("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
    }
}
